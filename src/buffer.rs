use std::ops::Range;

use strum::Display;
use tracing::{debug, trace};
use varisat::Lit;

/// The constraint a clause was emitted for.
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq, Hash)]
#[strum(serialize_all = "kebab-case")]
pub enum ClauseFamily {
    /// Exactly one queen in a row.
    RowExactlyOne,
    /// Exactly one queen in a column.
    ColumnExactlyOne,
    /// At most one queen on a diagonal running top-left to bottom-right.
    FallingDiagonal,
    /// At most one queen on a diagonal running bottom-left to top-right.
    RisingDiagonal,
    /// Exactly one node fills a clique position.
    PositionExactlyOne,
    /// A node fills at most one clique position.
    NodeAtMostOnce,
    /// Two non-adjacent nodes never share the clique.
    NonAdjacency,
}

/// A run of consecutive clauses emitted for one row, column, diagonal, position, node or node pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClauseGroup {
    /// What the clauses of this group assert.
    pub family: ClauseFamily,
    /// Indices of the group's clauses within [`CnfInstance::clauses`].
    pub range: Range<usize>,
}

impl ClauseGroup {
    /// Number of clauses in this group.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Whether this group produced no clauses, e.g. a diagonal of length 1.
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Append-only accumulation of clauses over a fixed number of variables.
///
/// Encoders push clauses group by group and then [`finish`](Self::finish) into a [`CnfInstance`].
pub(crate) struct ClauseBuffer {
    var_count: usize,
    clauses: Vec<Vec<Lit>>,
    groups: Vec<ClauseGroup>,
}

impl ClauseBuffer {
    pub(crate) fn new(var_count: usize) -> Self {
        Self {
            var_count,
            clauses: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Append `clauses` as one group of `family`.
    pub(crate) fn push_group(&mut self, family: ClauseFamily, clauses: impl IntoIterator<Item = Vec<Lit>>) {
        let start = self.clauses.len();
        for clause in clauses {
            debug_assert!(!clause.is_empty(), "empty clause in {family}");
            debug_assert!(clause.iter().all(|lit| lit.var().index() < self.var_count), "literal out of range in {family}");
            trace!(%family, clause = ?clause.iter().map(|lit| lit.to_dimacs()).collect::<Vec<_>>(), "adding clause");
            self.clauses.push(clause);
        }

        let group = ClauseGroup { family, range: start..self.clauses.len() };
        debug!(%family, clauses = group.len(), "clause group done");
        self.groups.push(group);
    }

    pub(crate) fn finish(self) -> CnfInstance {
        CnfInstance {
            var_count: self.var_count,
            clauses: self.clauses,
            groups: self.groups,
        }
    }
}

/// A formula in conjunctive normal form together with its declared variable count.
///
/// The clause count is always that of the realized clause list; it is never tracked separately.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CnfInstance {
    var_count: usize,
    clauses: Vec<Vec<Lit>>,
    groups: Vec<ClauseGroup>,
}

impl CnfInstance {
    pub(crate) fn from_clauses(var_count: usize, clauses: Vec<Vec<Lit>>) -> Self {
        Self {
            var_count,
            clauses,
            groups: Vec::new(),
        }
    }

    /// Number of variables declared in the header; every literal refers to a variable in `1..=var_count`.
    pub fn var_count(&self) -> usize {
        self.var_count
    }

    /// Number of clauses.
    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    /// The clauses in emission order.
    pub fn clauses(&self) -> impl Iterator<Item = &[Lit]> {
        self.clauses.iter().map(Vec::as_slice)
    }

    /// The clauses of one group.
    pub fn group_clauses(&self, group: &ClauseGroup) -> &[Vec<Lit>] {
        &self.clauses[group.range.clone()]
    }

    /// The groups clauses were emitted in. Empty for instances parsed from text.
    pub fn groups(&self) -> &[ClauseGroup] {
        &self.groups
    }

    /// Groups belonging to `family`, in emission order.
    pub fn groups_of(&self, family: ClauseFamily) -> impl Iterator<Item = &ClauseGroup> {
        self.groups.iter().filter(move |group| group.family == family)
    }

    /// Total number of clauses emitted for `family`.
    pub fn family_len(&self, family: ClauseFamily) -> usize {
        self.groups_of(family).map(ClauseGroup::len).sum()
    }
}
