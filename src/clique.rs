use std::num::NonZero;

use itertools::Itertools;
use tracing::info;
use unordered_pair::UnorderedPair;
use varisat::Var;

use crate::buffer::{ClauseBuffer, ClauseFamily, CnfInstance};
use crate::error::{Error, Result};
use crate::graph::{Graph, NodeId};
use crate::logic::{at_most_one, exactly_one};
use crate::oracle::Model;

/// "`graph` has a clique of exactly `k` nodes", with its variable numbering:
/// the node at index `i` filling slot `s` (`0 <= s < k`) is variable `i * k + s + 1`.
///
/// Slot `s` corresponds to clique position `s + 1`.
#[derive(Copy, Clone, Debug)]
pub struct CliqueProblem<'a> {
    graph: &'a Graph,
    k: NonZero<usize>,
}

impl<'a> CliqueProblem<'a> {
    /// Rejects `k = 0` and graphs without nodes.
    /// `k` may exceed the node count, in which case the encoding is unsatisfiable.
    pub fn new(graph: &'a Graph, k: usize) -> Result<Self> {
        let Some(k) = NonZero::new(k) else {
            return Err(Error::invalid("clique size must be at least 1"));
        };
        if graph.node_count() == 0 {
            return Err(Error::invalid("graph has no nodes"));
        }

        Ok(Self { graph, k })
    }

    /// The clique size asked for.
    pub fn k(&self) -> usize {
        self.k.get()
    }

    /// Number of variables of the encoding, m·k.
    pub fn var_count(&self) -> usize {
        self.graph.node_count() * self.k()
    }

    /// The variable asserting that the node at `node_index` fills `slot`.
    #[inline]
    pub fn var(&self, node_index: usize, slot: usize) -> Var {
        debug_assert!(node_index < self.graph.node_count() && slot < self.k());
        Var::from_index(node_index * self.k() + slot)
    }

    /// Inverse of [`Self::var`] as `(node_index, slot)`.
    #[inline]
    pub fn slot_of(&self, var: Var) -> Option<(usize, usize)> {
        (var.index() < self.var_count()).then(|| (var.index() / self.k(), var.index() % self.k()))
    }

    /// Number of clauses the non-adjacency family will contain, |non-edges|·k·(k-1).
    pub fn non_adjacency_len(&self) -> usize {
        self.graph.non_adjacent_pairs().count() * self.k() * (self.k() - 1)
    }

    /// Encode the problem.
    ///
    /// # Logical setup
    /// Every slot S is filled by exactly one node.
    /// No node fills two slots, so the k slots name k distinct nodes.
    ///
    /// If nodes I and J share no edge, I filling some slot S and J filling some other slot T are never both true.
    /// Together these leave only assignments where the k nodes are pairwise adjacent.
    pub fn encode(&self) -> CnfInstance {
        info!(nodes = self.graph.node_count(), k = self.k(), "reducing k-clique to SAT");

        let nodes = 0..self.graph.node_count();
        let slots = 0..self.k();
        let mut buffer = ClauseBuffer::new(self.var_count());

        for slot in slots.clone() {
            let vars = nodes.clone().map(|node| self.var(node, slot)).collect_vec();
            buffer.push_group(ClauseFamily::PositionExactlyOne, exactly_one(&vars));
        }

        for node in nodes {
            let vars = slots.clone().map(|slot| self.var(node, slot)).collect_vec();
            buffer.push_group(ClauseFamily::NodeAtMostOnce, at_most_one(&vars));
        }

        for UnorderedPair(i, j) in self.graph.non_adjacent_pairs() {
            buffer.push_group(ClauseFamily::NonAdjacency, slots.clone()
                .permutations(2)
                .map(|pair| vec![self.var(i, pair[0]).negative(), self.var(j, pair[1]).negative()])
                .collect_vec());
        }

        buffer.finish()
    }

    /// The clique members a satisfying `model` of [`Self::encode`] names, in ascending order.
    ///
    /// Fails with [`Error::MalformedOracleOutput`] if the model does not fill every slot with exactly one node
    /// or the nodes it names do not form a clique.
    pub fn decode(&self, model: &Model) -> Result<Vec<NodeId>> {
        let mut filled: Vec<Vec<usize>> = vec![Vec::new(); self.k()];
        for (node, slot) in model.true_vars().filter_map(|var| self.slot_of(var)) {
            filled[slot].push(node);
        }

        let mut members = Vec::with_capacity(self.k());
        for (slot, nodes) in filled.iter().enumerate() {
            match nodes.as_slice() {
                [node] => members.push(self.graph.node(*node).ok_or_else(|| Error::malformed("node index out of range"))?),
                _ => return Err(Error::malformed(format!("clique position {} is filled by {} nodes", slot + 1, nodes.len()))),
            }
        }

        members.sort_unstable();
        if !self.graph.is_clique(&members) {
            return Err(Error::malformed(format!("model names {members:?}, which is not a clique")));
        }

        Ok(members)
    }
}

/// Build the instance asking whether `graph` has a clique of `k` nodes.
pub fn reduce_clique(graph: &Graph, k: usize) -> Result<CnfInstance> {
    Ok(CliqueProblem::new(graph, k)?.encode())
}
