use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use itertools::Itertools;
use petgraph::graphmap::UnGraphMap;
use tracing::debug;
use unordered_pair::UnorderedPair;

use crate::error::{Error, Result};

/// Identifier of a node as it appears in an edge list.
pub type NodeId = i64;

/// An undirected graph, immutable once built.
///
/// Nodes are indexed `0..m` in ascending order of their [`NodeId`]; encoders number variables by this index.
#[derive(Clone, Debug)]
pub struct Graph {
    inner: UnGraphMap<NodeId, ()>,
    nodes: Vec<NodeId>,
}

impl Graph {
    /// Read an edge list: one edge per line, two whitespace-separated integers.
    ///
    /// Blank lines are skipped; duplicate edges are tolerated.
    pub fn parse(reader: impl BufRead) -> Result<Self> {
        let mut builder = GraphBuilder::default();

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let ends = line.split_whitespace()
                .map(|token| token.parse::<NodeId>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::invalid(format!("line {}: {e}: {line:?}", number + 1)))?;

            match ends.as_slice() {
                [a, b] => builder.add_edge(*a, *b),
                _ => return Err(Error::invalid(format!("line {}: expected two node ids, found {line:?}", number + 1))),
            };
        }

        Ok(builder.build())
    }

    /// The graph spanned by `edges`.
    pub fn from_edges(edges: impl IntoIterator<Item = (NodeId, NodeId)>) -> Self {
        let mut builder = GraphBuilder::default();
        for (a, b) in edges {
            builder.add_edge(a, b);
        }
        builder.build()
    }

    /// Read the edge list at `path`; see [`Self::parse`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let graph = Self::parse(BufReader::new(File::open(path.as_ref())?))?;
        debug!(path = %path.as_ref().display(), nodes = graph.node_count(), edges = graph.edge_count(), "parsed graph");
        Ok(graph)
    }

    /// Number of nodes, m.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Nodes in index order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// The node at `index`.
    pub fn node(&self, index: usize) -> Option<NodeId> {
        self.nodes.get(index).copied()
    }

    /// Whether an edge joins `a` and `b`. A node is never adjacent to itself.
    pub fn adjacent(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.inner.contains_edge(a, b)
    }

    /// Every unordered pair of node indices not joined by an edge.
    pub fn non_adjacent_pairs(&self) -> impl Iterator<Item = UnorderedPair<usize>> + '_ {
        (0..self.node_count())
            .tuple_combinations()
            .filter(|(i, j)| !self.adjacent(self.nodes[*i], self.nodes[*j]))
            .map(UnorderedPair::from)
    }

    /// Whether `nodes` are pairwise distinct and pairwise adjacent.
    pub fn is_clique(&self, nodes: &[NodeId]) -> bool {
        nodes.iter().all(|node| self.inner.contains_node(*node))
            && nodes.iter().tuple_combinations().all(|(a, b)| self.adjacent(*a, *b))
    }
}

/// Accumulates nodes and edges before freezing them into a [`Graph`].
#[derive(Clone, Debug, Default)]
pub struct GraphBuilder {
    inner: UnGraphMap<NodeId, ()>,
}

impl GraphBuilder {
    /// Add an isolated node, or do nothing if `node` is already present.
    pub fn add_node(&mut self, node: NodeId) -> &mut Self {
        self.inner.add_node(node);
        self
    }

    /// Add the undirected edge `a`-`b`. A self-loop only registers the node.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> &mut Self {
        if a == b {
            self.inner.add_node(a);
        } else {
            self.inner.add_edge(a, b, ());
        }
        self
    }

    /// Freeze the current state into a [`Graph`].
    pub fn build(&self) -> Graph {
        Graph {
            inner: self.inner.clone(),
            nodes: self.inner.nodes().sorted().collect_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use unordered_pair::UnorderedPair;

    use super::{Graph, GraphBuilder};

    #[test]
    fn parse_edge_list() {
        let graph = Graph::parse("3 1\n1 2\n\n2 1\n4 4\n".as_bytes()).unwrap();

        assert_eq!(graph.nodes(), &[1, 2, 3, 4]);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.adjacent(2, 1));
        assert!(graph.adjacent(1, 3));
        assert!(!graph.adjacent(4, 4));
        assert!(!graph.adjacent(2, 3));
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        assert!(Graph::parse("1 2\n3\n".as_bytes()).is_err());
        assert!(Graph::parse("1 2 3\n".as_bytes()).is_err());
        assert!(Graph::parse("a b\n".as_bytes()).is_err());
    }

    #[test]
    fn non_adjacent_pairs_of_a_path() {
        let graph = Graph::from_edges([(1, 2), (2, 3), (3, 4)]);
        let pairs = graph.non_adjacent_pairs().collect::<Vec<_>>();

        assert_eq!(pairs.len(), 3);
        assert!(pairs.contains(&UnorderedPair(0, 2)));
        assert!(pairs.contains(&UnorderedPair(0, 3)));
        assert!(pairs.contains(&UnorderedPair(1, 3)));
    }

    #[test]
    fn cliques() {
        let graph = GraphBuilder::default()
            .add_edge(1, 2)
            .add_edge(2, 3)
            .add_edge(1, 3)
            .add_node(9)
            .build();

        assert!(graph.is_clique(&[1, 2, 3]));
        assert!(graph.is_clique(&[9]));
        assert!(!graph.is_clique(&[1, 9]));
        assert!(!graph.is_clique(&[1, 1]));
        assert!(!graph.is_clique(&[5]));
    }
}
