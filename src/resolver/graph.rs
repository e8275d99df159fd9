//! The graph of units reached during resolution.
//!
//! An edge `a -> b` means a requirement of `a` was satisfied by `b`. The graph
//! answers "why is this unit included" after the fact.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::core::{Unit, Version};

/// Identity of a unit within one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitKey {
    pub id: String,
    pub version: Version,
}

impl UnitKey {
    pub fn of(unit: &Unit) -> Self {
        UnitKey {
            id: unit.id().to_string(),
            version: unit.version().clone(),
        }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

/// A resolved unit and the repository it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub key: UnitKey,
    pub repository: String,
}

/// One hop of an explanation chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainStep {
    pub unit: UnitKey,
    /// The requirement of the previous step that pulled this unit in.
    pub via: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ResolutionGraph {
    graph: DiGraph<GraphNode, String>,
    nodes: HashMap<UnitKey, NodeIndex>,
    roots: Vec<NodeIndex>,
}

impl ResolutionGraph {
    pub fn new() -> Self {
        ResolutionGraph::default()
    }

    /// Add a unit; returns the existing node if already present.
    pub fn add_unit(&mut self, key: UnitKey, repository: &str) -> NodeIndex {
        if let Some(&node) = self.nodes.get(&key) {
            return node;
        }
        let node = self.graph.add_node(GraphNode {
            key: key.clone(),
            repository: repository.to_string(),
        });
        self.nodes.insert(key, node);
        node
    }

    /// Record that `node` was requested directly.
    pub fn mark_root(&mut self, node: NodeIndex) {
        if !self.roots.contains(&node) {
            self.roots.push(node);
        }
    }

    /// Add a requirement edge, once per (from, to) pair.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, requirement: impl Into<String>) {
        if from != to && !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, requirement.into());
        }
    }

    pub fn node(&self, key: &UnitKey) -> Option<NodeIndex> {
        self.nodes.get(key).copied()
    }

    pub fn get(&self, node: NodeIndex) -> &GraphNode {
        &self.graph[node]
    }

    pub fn roots(&self) -> impl Iterator<Item = &GraphNode> {
        self.roots.iter().map(|&n| &self.graph[n])
    }

    /// Units in the order they were reached.
    pub fn units(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    /// Direct dependencies of a unit.
    pub fn dependencies(&self, key: &UnitKey) -> Vec<&GraphNode> {
        self.neighbors(key, Direction::Outgoing)
    }

    /// Units that depend on the given unit.
    pub fn dependents(&self, key: &UnitKey) -> Vec<&GraphNode> {
        self.neighbors(key, Direction::Incoming)
    }

    fn neighbors(&self, key: &UnitKey, direction: Direction) -> Vec<&GraphNode> {
        match self.nodes.get(key) {
            Some(&node) => self
                .graph
                .neighbors_directed(node, direction)
                .map(|n| &self.graph[n])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Shortest chain from a root to any version of unit `id`.
    pub fn explain(&self, id: &str) -> Option<Vec<ExplainStep>> {
        let mut parent: HashMap<NodeIndex, (NodeIndex, String)> = HashMap::new();
        let mut queue: VecDeque<NodeIndex> = self.roots.iter().copied().collect();
        let mut seen: Vec<NodeIndex> = self.roots.clone();

        while let Some(node) = queue.pop_front() {
            if self.graph[node].key.id == id {
                return Some(self.chain(node, &parent));
            }
            for edge in self.graph.edges(node) {
                let next = edge.target();
                if !seen.contains(&next) {
                    seen.push(next);
                    parent.insert(next, (node, edge.weight().clone()));
                    queue.push_back(next);
                }
            }
        }
        None
    }

    fn chain(&self, end: NodeIndex, parent: &HashMap<NodeIndex, (NodeIndex, String)>) -> Vec<ExplainStep> {
        let mut steps = Vec::new();
        let mut current = end;
        loop {
            let via = parent.get(&current).map(|(_, req)| req.clone());
            steps.push(ExplainStep {
                unit: self.graph[current].key.clone(),
                via,
            });
            match parent.get(&current) {
                Some((prev, _)) => current = *prev,
                None => break,
            }
        }
        steps.reverse();
        steps
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}
