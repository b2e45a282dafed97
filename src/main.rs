//! Audit entry point: crawl the authority graph behind the chain-log (or a
//! single contract), print the tree and what changed since the last run.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use ward_audit::audit::{AuditMode, AuditRequest, AuditSettings, Auditor};
use ward_audit::cache::CacheTiers;
use ward_audit::chain::RpcChain;
use ward_audit::history::{ExplorerClient, HistoryClient, NoHistory};
use ward_audit::utils::config::Config;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Every chain-log contract.
    Full,
    /// Price-feed (PIP_*) contracts only.
    Oracles,
    /// Who controls the target.
    Contract,
    /// What the target controls.
    Permissions,
}

impl ModeArg {
    fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Oracles => "oracles",
            Self::Contract => "contract",
            Self::Permissions => "permissions",
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "ward-audit", version, about = "Audit on-chain admin control (owner, authority, wards, buds)")]
struct Cli {
    #[arg(long, value_enum, default_value_t = ModeArg::Full)]
    mode: ModeArg,

    /// Address or chain-log name (contract / permissions modes).
    #[arg(long)]
    target: Option<String>,

    /// Maximum render depth.
    #[arg(long)]
    depth: Option<usize>,

    /// Cache tiers to trust instead of refreshing: chainlog,signals,graph.
    #[arg(long, value_parser = CacheTiers::parse_list, default_value = "")]
    cached: CacheTiers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mode = AuditMode::from_parts(cli.mode.as_str(), cli.target)?;
    let config = Config::load().context("loading configuration")?;

    let chain = Arc::new(RpcChain::connect(&config.eth_rpc_url)?);
    let history: Arc<dyn HistoryClient> = if config.history_disabled {
        tracing::warn!("[HISTORY] Deployer lookup disabled; wards come from signals only");
        Arc::new(NoHistory)
    } else {
        Arc::new(ExplorerClient::new(
            &config.explorer_api_url,
            &config.explorer_api_key,
            config.history_page_size,
        )?)
    };

    let auditor = Auditor::new(chain, history, AuditSettings::from(&config));
    let request = AuditRequest {
        mode,
        max_depth: cli.depth,
        tiers: cli.cached,
    };
    let outcome = auditor.run(&request).await?;

    println!("{}", outcome.tree);
    println!("--- {} ({} edges) ---", outcome.namespace, outcome.edge_count);
    print!("{}", outcome.diff.report);
    if !outcome.diff.report.ends_with('\n') {
        println!();
    }
    Ok(())
}
