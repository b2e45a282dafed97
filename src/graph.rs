//! Authorization edges and the accumulated edge set.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Owner,
    Authority,
    Ward,
    Bud,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Authority => "authority",
            Self::Ward => "ward",
            Self::Bud => "bud",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `source` holds `kind` control over `destination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthorizationEdge {
    pub source: Address,
    pub destination: Address,
    pub kind: EdgeKind,
}

/// Edge set in discovery order. Duplicates collapse on the full
/// `(source, destination, kind)` tuple only, so one holder can appear under
/// several kinds for the same contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<AuthorizationEdge>", into = "Vec<AuthorizationEdge>")]
pub struct Graph {
    edges: Vec<AuthorizationEdge>,
    index: HashSet<AuthorizationEdge>,
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for Graph {}

impl From<Vec<AuthorizationEdge>> for Graph {
    fn from(edges: Vec<AuthorizationEdge>) -> Self {
        let mut graph = Self::default();
        for edge in edges {
            graph.insert(edge);
        }
        graph
    }
}

impl From<Graph> for Vec<AuthorizationEdge> {
    fn from(graph: Graph) -> Self {
        graph.edges
    }
}

impl Graph {
    /// Returns false when the exact edge was already present.
    pub fn insert(&mut self, edge: AuthorizationEdge) -> bool {
        if !self.index.insert(edge) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn contains(&self, edge: &AuthorizationEdge) -> bool {
        self.index.contains(edge)
    }

    pub fn edges(&self) -> &[AuthorizationEdge] {
        &self.edges
    }

    /// Edges pointing at `destination`: who controls it.
    pub fn controllers_of(&self, destination: Address) -> impl Iterator<Item = &AuthorizationEdge> {
        self.edges.iter().filter(move |e| e.destination == destination)
    }

    /// Edges leaving `source`: what it controls.
    pub fn controlled_by(&self, source: Address) -> impl Iterator<Item = &AuthorizationEdge> {
        self.edges.iter().filter(move |e| e.source == source)
    }

    pub fn merge(&mut self, other: &Graph) {
        for edge in other.edges() {
            self.insert(*edge);
        }
    }

    pub fn named(&self, registry: &Registry) -> Vec<NamedEdge> {
        self.edges
            .iter()
            .map(|edge| NamedEdge {
                source: registry.display(&edge.source),
                source_address: edge.source,
                destination: registry.display(&edge.destination),
                destination_address: edge.destination,
                kind: edge.kind,
            })
            .collect()
    }
}

/// Published form of an edge, readable without the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEdge {
    pub source: String,
    pub source_address: Address,
    pub destination: String,
    pub destination_address: Address,
    pub kind: EdgeKind,
}
