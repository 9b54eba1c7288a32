use std::time::Instant;

use strum::{Display, EnumString};
use tracing::{debug, info};

use crate::clique::CliqueProblem;
use crate::error::{Error, Result};
use crate::graph::{Graph, NodeId};
use crate::oracle::{Oracle, Verdict};

/// How the clique size is searched for.
#[derive(Copy, Clone, Debug, Default, Display, EnumString, Eq, PartialEq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum SearchStrategy {
    /// Probe k = 2, 3, ... and stop at the first unsatisfiable k.
    #[default]
    Linear,
    /// Bisect `[1, m]`; a k-clique contains a (k-1)-clique, so satisfiability is monotone in k.
    Binary,
}

/// Outcome of a maximum clique search.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CliqueReport {
    /// Size of the largest clique; 0 only for a graph without nodes.
    pub size: usize,
    /// A clique of that size, in ascending order.
    pub members: Vec<NodeId>,
    /// Number of times the oracle was invoked.
    pub probes: usize,
}

/// Finds the size of the largest clique of a graph using only an [`Oracle`] to answer "is there a k-clique?".
///
/// Every probe encodes and solves from scratch; nothing but k carries over between probes.
pub struct MaxCliqueSearch<'a, O: Oracle + ?Sized> {
    graph: &'a Graph,
    oracle: &'a O,
    strategy: SearchStrategy,
    probes: usize,
}

impl<'a, O: Oracle + ?Sized> MaxCliqueSearch<'a, O> {
    /// A linear search over `graph`.
    pub fn new(graph: &'a Graph, oracle: &'a O) -> Self {
        Self { graph, oracle, strategy: SearchStrategy::default(), probes: 0 }
    }

    /// Search with `strategy` instead.
    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// A k-clique, or `None` if there is none.
    ///
    /// k above the node count is answered without the oracle.
    fn probe(&mut self, k: usize) -> Result<Option<Vec<NodeId>>> {
        if k > self.graph.node_count() {
            debug!(k, "more positions than nodes, skipping the oracle");
            return Ok(None);
        }

        let problem = CliqueProblem::new(self.graph, k)?;
        let instance = problem.encode();
        let started = Instant::now();
        self.probes += 1;

        let members = match self.oracle.solve(&instance)? {
            Verdict::Satisfiable(model) => Some(problem.decode(&model)?),
            Verdict::Unsatisfiable => None,
            Verdict::Inconclusive => return Err(Error::OracleTimeout(started.elapsed())),
        };
        debug!(k, satisfiable = members.is_some(), elapsed = ?started.elapsed(), "probe done");

        Ok(members)
    }

    /// Run the search.
    pub fn run(mut self) -> Result<CliqueReport> {
        let graph = self.graph;
        let (size, members) = match graph.nodes() {
            [] => (0, Vec::new()),
            [only] => (1, vec![*only]),
            [first, ..] => {
                let single = vec![*first];
                match self.strategy {
                    SearchStrategy::Linear => self.linear(single)?,
                    SearchStrategy::Binary => self.binary(single)?,
                }
            }
        };

        info!(size, probes = self.probes, strategy = %self.strategy, "maximum clique found");
        Ok(CliqueReport { size, members, probes: self.probes })
    }

    fn linear(&mut self, single: Vec<NodeId>) -> Result<(usize, Vec<NodeId>)> {
        let mut best = single;
        let mut k = 2;
        while let Some(members) = self.probe(k)? {
            best = members;
            k += 1;
        }
        Ok((k - 1, best))
    }

    fn binary(&mut self, single: Vec<NodeId>) -> Result<(usize, Vec<NodeId>)> {
        // satisfiable at `low`, unsatisfiable at `high`
        let (mut low, mut high) = (1, self.graph.node_count() + 1);
        let mut best = single;
        while high - low > 1 {
            let k = low + (high - low) / 2;
            match self.probe(k)? {
                Some(members) => {
                    low = k;
                    best = members;
                }
                None => high = k,
            }
        }
        Ok((low, best))
    }
}

/// Size of the largest clique of `graph`, by linear probing.
pub fn find_max_clique(graph: &Graph, oracle: &impl Oracle) -> Result<usize> {
    Ok(MaxCliqueSearch::new(graph, oracle).run()?.size)
}
