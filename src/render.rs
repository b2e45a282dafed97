//! Text trees over a finished graph.
//!
//! The ancestor path is threaded through the recursion: a child already on
//! the path is skipped, which stops genuine control cycles while still
//! showing a shared dependency once under every distinct parent.

use alloy::primitives::Address;
use std::fmt::Write;

use crate::address::checksum;
use crate::graph::{AuthorizationEdge, Graph};
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Who controls the root.
    Controllers,
    /// What the root controls.
    Permissions,
}

const INDENT: &str = "    ";

pub fn label(registry: &Registry, address: &Address) -> String {
    match registry.name_of(address) {
        Some(name) => format!("{name} ({})", checksum(address)),
        None => checksum(address),
    }
}

pub fn render(
    graph: &Graph,
    registry: &Registry,
    root: Address,
    direction: Direction,
    max_depth: Option<usize>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", label(registry, &root));
    let mut path = vec![root];
    render_level(graph, registry, direction, max_depth, &mut path, &mut out);
    out
}

/// Render several roots one after another, separated by a blank line.
pub fn render_all<I>(
    graph: &Graph,
    registry: &Registry,
    roots: I,
    direction: Direction,
    max_depth: Option<usize>,
) -> String
where
    I: IntoIterator<Item = Address>,
{
    roots
        .into_iter()
        .map(|root| render(graph, registry, root, direction, max_depth))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_level(
    graph: &Graph,
    registry: &Registry,
    direction: Direction,
    max_depth: Option<usize>,
    path: &mut Vec<Address>,
    out: &mut String,
) {
    let depth = path.len();
    if max_depth.is_some_and(|max| depth > max) {
        return;
    }
    let Some(current) = path.last().copied() else {
        return;
    };

    let edges: Vec<&AuthorizationEdge> = match direction {
        Direction::Controllers => graph.controllers_of(current).collect(),
        Direction::Permissions => graph.controlled_by(current).collect(),
    };

    for edge in edges {
        let next = match direction {
            Direction::Controllers => edge.source,
            Direction::Permissions => edge.destination,
        };
        if path.contains(&next) {
            continue;
        }
        let relation = match direction {
            Direction::Controllers => format!("{}:", edge.kind),
            Direction::Permissions => format!("{} of", edge.kind),
        };
        let _ = writeln!(
            out,
            "{}{} {}",
            INDENT.repeat(depth),
            relation,
            label(registry, &next)
        );
        path.push(next);
        render_level(graph, registry, direction, max_depth, path, out);
        path.pop();
    }
}
