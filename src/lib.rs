#![warn(missing_docs)]

//! # `sat-reductions`
//!
//! Reductions of two combinatorial problems to Boolean satisfiability: placing n queens on an n×n board,
//! and finding the largest [clique](https://en.wikipedia.org/wiki/Clique_(graph_theory)) of a graph.
//!
//! Build an instance with [`reduce_n_queens`] or [`reduce_clique`] (or the [`QueensBoard`] and [`CliqueProblem`]
//! types they wrap), render it as DIMACS text with its [`Display`](std::fmt::Display) impl, and hand it to an
//! [`Oracle`]: either an external solver executable through [`ExternalOracle`], or [`VarisatOracle`] in-process.
//! [`MaxCliqueSearch`] drives an oracle through increasing clique sizes until the answer turns unsatisfiable.
//!
//! # Internals
//! Every clause an encoder emits belongs to a [`ClauseFamily`] and is appended in groups, one group per row,
//! column, diagonal, clique position, node, or non-adjacent node pair.
//! The clause count written to the DIMACS header is always the length of the realized clause list.
//!
//! ## N-Queens
//! Square `(row, col)` of an n×n board is variable `row * n + col + 1`.
//! 1. Each row and each column holds exactly one queen: one clause listing its squares,
//!    and one clause `-a -b` for every pair of its squares.
//! 2. Each diagonal, in both directions, holds at most one queen: only the pairwise clauses.
//!
//! ## k-clique
//! For a graph on m nodes, indexed in ascending order, node `i` filling clique position `p` (1 to k) is
//! variable `i * k + p`.
//! 1. Each position is filled by exactly one node.
//! 2. No node fills two positions.
//! 3. Two nodes without an edge between them never fill two positions at once.
//!
//! The search relies on monotonicity: a k-clique contains a (k-1)-clique, so the first unsatisfiable k
//! is one past the maximum.
//!
//! # Logging
//! Progress is reported through [`tracing`]. Encoders log each clause at `TRACE` level,
//! which is only useful for small instances.

pub use buffer::{ClauseFamily, ClauseGroup, CnfInstance};
pub use clique::{reduce_clique, CliqueProblem};
pub use dimacs::{parse_dimacs, parse_verdict};
pub use error::{Error, Result};
pub use graph::{Graph, GraphBuilder, NodeId};
pub use oracle::{ExternalOracle, Model, Oracle, OracleConfig, VarisatOracle, Verdict};
pub use queens::{reduce_n_queens, Diagonal, Placement, QueensBoard, Square};
pub use search::{find_max_clique, CliqueReport, MaxCliqueSearch, SearchStrategy};

pub(crate) mod buffer;
pub mod clique;
pub mod dimacs;
pub(crate) mod error;
pub mod graph;
pub(crate) mod logic;
pub mod oracle;
pub mod queens;
pub mod search;
