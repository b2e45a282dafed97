//! Breadth-first discovery of the authority graph.
//!
//! Each round expands every address discovered by the previous round. The
//! visited set is owned by the builder, so consecutive `build` calls on the
//! same builder share it and never re-expand a contract.

use alloy::primitives::Address;
use std::collections::BTreeSet;

use crate::chain::ChainClient;
use crate::error::Result;
use crate::graph::{AuthorizationEdge, EdgeKind, Graph};
use crate::history::HistoryClient;
use crate::prober::{Authorities, AuthorityProber};

pub struct GraphBuilder<C: ?Sized, H: ?Sized> {
    prober: AuthorityProber<C, H>,
    visited: BTreeSet<Address>,
}

/// `(holder, kind)` pairs in the order edges are recorded.
fn controllers(found: &Authorities) -> Vec<(Address, EdgeKind)> {
    let mut out = Vec::with_capacity(2 + found.wards.len() + found.buds.len());
    if let Some(owner) = found.owner {
        out.push((owner, EdgeKind::Owner));
    }
    if let Some(authority) = found.authority {
        out.push((authority, EdgeKind::Authority));
    }
    out.extend(found.wards.iter().map(|w| (*w, EdgeKind::Ward)));
    out.extend(found.buds.iter().map(|b| (*b, EdgeKind::Bud)));
    out
}

impl<C, H> GraphBuilder<C, H>
where
    C: ChainClient + ?Sized,
    H: HistoryClient + ?Sized,
{
    pub fn new(prober: AuthorityProber<C, H>) -> Self {
        Self {
            prober,
            visited: BTreeSet::new(),
        }
    }

    pub fn visited(&self) -> &BTreeSet<Address> {
        &self.visited
    }

    pub async fn build(&mut self, roots: &BTreeSet<Address>) -> Result<Graph> {
        let mut graph = Graph::default();
        let mut pending: BTreeSet<Address> = roots.clone();
        let mut round = 0usize;

        while !pending.is_empty() {
            let current: BTreeSet<Address> = std::mem::take(&mut pending)
                .into_iter()
                .filter(|a| !self.visited.contains(a))
                .collect();
            if current.is_empty() {
                break;
            }
            self.visited.extend(current.iter().copied());
            round += 1;
            tracing::info!(
                "[CRAWL] Round {}: expanding {} address(es), {} visited, {} edges",
                round,
                current.len(),
                self.visited.len(),
                graph.len()
            );

            self.prefetch(&current).await?;

            for (idx, address) in current.iter().enumerate() {
                let found = self.prober.probe(*address).await?;
                for (source, kind) in controllers(&found) {
                    graph.insert(AuthorizationEdge {
                        source,
                        destination: *address,
                        kind,
                    });
                    pending.insert(source);
                }
                tracing::info!(
                    "[CRAWL] Round {}: {:.1}% ({}/{})",
                    round,
                    (idx + 1) as f64 * 100.0 / current.len() as f64,
                    idx + 1,
                    current.len()
                );
            }

            pending.retain(|a| !self.visited.contains(a));
        }

        tracing::info!(
            "[CRAWL] Done after {} round(s): {} edges over {} visited address(es)",
            round,
            graph.len(),
            self.visited.len()
        );
        Ok(graph)
    }

    /// Build once per root and union the results.
    pub async fn build_each<I>(&mut self, roots: I) -> Result<Graph>
    where
        I: IntoIterator<Item = Address>,
    {
        let mut merged = Graph::default();
        for root in roots {
            let graph = self.build(&BTreeSet::from([root])).await?;
            merged.merge(&graph);
        }
        Ok(merged)
    }

    /// One batched signal fetch for the round so per-address probes hit the memo.
    async fn prefetch(&mut self, current: &BTreeSet<Address>) -> Result<()> {
        let signals = self.prober.signals_mut();
        let missing: BTreeSet<Address> = current
            .iter()
            .filter(|a| !signals.is_memoized(a))
            .copied()
            .collect();
        if missing.len() > 1 {
            signals.fetch(&missing).await?;
        }
        Ok(())
    }
}
