//! Republishes persisted named graphs over HTTP: `GET /<name>` -> `<GRAPH_DIR>/<name>.json`.

use anyhow::{Context, Result};
use ward_audit::publish::router;
use ward_audit::utils::config::{graph_dir_from_env, serve_port_from_env};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let graph_dir = graph_dir_from_env();
    let port = serve_port_from_env()?;
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("bind port {port}"))?;
    tracing::info!(
        "[SERVE] Listening on {} (serving {})",
        port,
        graph_dir.display()
    );
    axum::serve(listener, router(graph_dir))
        .await
        .context("graph server stopped")?;
    Ok(())
}
