//! One audit run: registry, crawl (or cached graph), render, diff.

use alloy::primitives::Address;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::builder::GraphBuilder;
use crate::cache::{CacheTiers, DiskCache};
use crate::chain::ChainClient;
use crate::error::{InputError, Result};
use crate::graph::Graph;
use crate::history::HistoryClient;
use crate::prober::AuthorityProber;
use crate::registry::{self, Registry};
use crate::render::{render, render_all, Direction};
use crate::signals::SignalFetcher;
use crate::snapshot::{DiffReport, Namespace, SnapshotStore};
use crate::utils::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditMode {
    Full,
    Oracles,
    Contract(String),
    Permissions(String),
}

impl AuditMode {
    /// Build a mode from its CLI name and optional target token.
    pub fn from_parts(mode: &str, target: Option<String>) -> Result<Self> {
        let needs_target = |name: &'static str| {
            target
                .clone()
                .filter(|t| !t.trim().is_empty())
                .ok_or(InputError::MissingTarget(name))
        };
        Ok(match mode {
            "full" => Self::Full,
            "oracles" => Self::Oracles,
            "contract" => Self::Contract(needs_target("contract")?),
            "permissions" => Self::Permissions(needs_target("permissions")?),
            other => return Err(InputError::UnknownMode(other.to_string()).into()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct AuditRequest {
    pub mode: AuditMode,
    pub max_depth: Option<usize>,
    pub tiers: CacheTiers,
}

#[derive(Debug, Clone)]
pub struct AuditSettings {
    pub chainlog: Address,
    pub deployment_block: u64,
    pub log_batch_blocks: u64,
    pub cache_dir: PathBuf,
    pub graph_dir: PathBuf,
}

impl From<&Config> for AuditSettings {
    fn from(config: &Config) -> Self {
        Self {
            chainlog: config.chainlog_address,
            deployment_block: config.deployment_block,
            log_batch_blocks: config.log_batch_blocks,
            cache_dir: config.cache_dir.clone(),
            graph_dir: config.graph_dir.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub namespace: Namespace,
    pub tree: String,
    pub diff: DiffReport,
    pub edge_count: usize,
}

pub struct Auditor<C: ?Sized, H: ?Sized> {
    chain: Arc<C>,
    history: Arc<H>,
    settings: AuditSettings,
    cache: DiskCache,
}

impl<C, H> Auditor<C, H>
where
    C: ChainClient + ?Sized,
    H: HistoryClient + ?Sized,
{
    pub fn new(chain: Arc<C>, history: Arc<H>, settings: AuditSettings) -> Self {
        let cache = DiskCache::new(settings.cache_dir.clone());
        Self {
            chain,
            history,
            settings,
            cache,
        }
    }

    pub async fn run(&self, request: &AuditRequest) -> Result<AuditOutcome> {
        let registry = registry::load(
            &*self.chain,
            self.settings.chainlog,
            &self.cache,
            request.tiers.chainlog,
        )
        .await?;

        // Resolve before crawling so bad input fails fast.
        let (namespace, tree, graph) = match &request.mode {
            AuditMode::Full => {
                let roots: Vec<Address> = registry.addresses().copied().collect();
                let graph = self.graph_for("full", &roots, &registry, request.tiers).await?;
                let tree = render_all(&graph, &registry, roots, Direction::Controllers, request.max_depth);
                (Namespace::Full, tree, graph)
            }
            AuditMode::Oracles => {
                let roots = registry.oracles();
                let graph = self.graph_for("oracles", &roots, &registry, request.tiers).await?;
                let tree = render_all(&graph, &registry, roots, Direction::Controllers, request.max_depth);
                (Namespace::Oracles, tree, graph)
            }
            AuditMode::Contract(token) => {
                let target = registry.resolve(token)?;
                let name = format!("contract-{target:#x}");
                let graph = self.graph_for(&name, &[target], &registry, request.tiers).await?;
                let tree = render(&graph, &registry, target, Direction::Controllers, request.max_depth);
                (Namespace::Contract(target), tree, graph)
            }
            AuditMode::Permissions(token) => {
                let target = registry.resolve(token)?;
                let roots: Vec<Address> = registry.addresses().copied().collect();
                let graph = self.graph_for("full", &roots, &registry, request.tiers).await?;
                let tree = render(&graph, &registry, target, Direction::Permissions, request.max_depth);
                (Namespace::Permissions(target), tree, graph)
            }
        };

        let snapshots = SnapshotStore::new(DiskCache::new(self.settings.cache_dir.join("snapshots")));
        let diff = snapshots.diff(&tree, namespace)?;
        Ok(AuditOutcome {
            namespace,
            tree,
            diff,
            edge_count: graph.len(),
        })
    }

    /// Cached graph when the graph tier is trusted, otherwise a fresh crawl
    /// persisted in compact and named form.
    async fn graph_for(
        &self,
        name: &str,
        roots: &[Address],
        registry: &Registry,
        tiers: CacheTiers,
    ) -> Result<Graph> {
        let compact_name = format!("graph/{name}.json");
        if tiers.graph {
            if let Some(graph) = self.cache.load::<Graph>(&compact_name)? {
                tracing::info!("[CRAWL] Using cached graph `{}` ({} edges)", name, graph.len());
                return Ok(graph);
            }
        }

        let signals = SignalFetcher::new(
            self.chain.clone(),
            self.cache.clone(),
            tiers.signals,
            self.settings.deployment_block,
            self.settings.log_batch_blocks,
        );
        let prober = AuthorityProber::new(self.chain.clone(), self.history.clone(), signals);
        let mut builder = GraphBuilder::new(prober);
        // All roots form the first frontier so their signals come in one batch.
        let unique: BTreeSet<Address> = roots.iter().copied().collect();
        let graph = builder.build(&unique).await?;

        self.cache.store(&compact_name, &graph)?;
        DiskCache::new(self.settings.graph_dir.clone())
            .store(&format!("{name}.json"), &graph.named(registry))?;
        Ok(graph)
    }
}
