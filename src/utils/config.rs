use crate::error::{ConfigError, Result};
use alloy::primitives::{address, Address};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Mainnet chain-log directory.
pub const DEFAULT_CHAINLOG_ADDRESS: Address = address!("da0ab1e0017debcd72be8599041a2aa3ba7e740f");
/// Height at which the chain-log was deployed; nothing older is relevant.
pub const DEFAULT_DEPLOYMENT_BLOCK: u64 = 8_928_152;
pub const DEFAULT_LOG_BATCH_BLOCKS: u64 = 1_000_000;
pub const DEFAULT_HISTORY_PAGE_SIZE: u64 = 1_000;
pub const DEFAULT_EXPLORER_API_URL: &str = "https://api.etherscan.io/api";
pub const DEFAULT_SERVE_PORT: u16 = 5783;

#[derive(Debug, Clone)]
pub struct Config {
    pub eth_rpc_url: String,
    pub explorer_api_url: String,
    pub explorer_api_key: String,
    pub history_disabled: bool,
    pub chainlog_address: Address,
    pub deployment_block: u64,
    pub log_batch_blocks: u64,
    pub history_page_size: u64,
    pub cache_dir: PathBuf,
    pub graph_dir: PathBuf,
}

/// Accept only absolute http(s) endpoints.
fn require_http_endpoint(var: &str, raw: &str) -> Result<()> {
    let url = reqwest::Url::parse(raw.trim())
        .map_err(|e| ConfigError::Invalid(format!("{var}: `{raw}` is not a URL ({e})")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(format!(
            "{var}: expected an http or https endpoint, got {}://",
            url.scheme()
        ))
        .into());
    }
    Ok(())
}

pub(crate) fn parse_bool_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            let value = raw.trim().replace('_', "").parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!("{name} must be a valid u64, got `{raw}`"))
            })?;
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be non-zero")).into());
            }
            Ok(value)
        }
        _ => Ok(default),
    }
}

fn env_dir(name: &str, default: &str) -> PathBuf {
    env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Directory the publisher serves named graphs from.
pub fn graph_dir_from_env() -> PathBuf {
    env_dir("GRAPH_DIR", "graph")
}

pub fn serve_port_from_env() -> Result<u16> {
    match env::var("SERVE_PORT") {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse::<u16>().map_err(|_| {
            ConfigError::Invalid(format!("SERVE_PORT must be a valid port, got `{raw}`")).into()
        }),
        _ => Ok(DEFAULT_SERVE_PORT),
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let eth_rpc_url = env::var("ETH_RPC_URL")
            .map_err(|_| ConfigError::Missing("please specify ETH_RPC_URL".to_string()))?;
        require_http_endpoint("ETH_RPC_URL", &eth_rpc_url)?;

        let explorer_api_url =
            env::var("EXPLORER_API_URL").unwrap_or_else(|_| DEFAULT_EXPLORER_API_URL.to_string());
        require_http_endpoint("EXPLORER_API_URL", &explorer_api_url)?;

        let history_disabled = env::var("HISTORY_DISABLED")
            .ok()
            .and_then(|raw| parse_bool_flag(&raw))
            .unwrap_or(false);
        let explorer_api_key = env::var("ETHERSCAN_API_KEY")
            .map(|v| v.trim().to_string())
            .unwrap_or_default();
        if explorer_api_key.is_empty() && !history_disabled {
            return Err(ConfigError::Missing(
                "ETHERSCAN_API_KEY must be set (or HISTORY_DISABLED=true to skip deployer lookup)"
                    .to_string(),
            )
            .into());
        }

        let chainlog_address = match env::var("CHAINLOG_ADDRESS") {
            Ok(raw) if !raw.trim().is_empty() => Address::from_str(raw.trim()).map_err(|e| {
                ConfigError::Invalid(format!("CHAINLOG_ADDRESS `{raw}` is not an address: {e}"))
            })?,
            _ => DEFAULT_CHAINLOG_ADDRESS,
        };

        Ok(Self {
            eth_rpc_url,
            explorer_api_url,
            explorer_api_key,
            history_disabled,
            chainlog_address,
            deployment_block: env_u64("DEPLOYMENT_BLOCK", DEFAULT_DEPLOYMENT_BLOCK)?,
            log_batch_blocks: env_u64("LOG_BATCH_BLOCKS", DEFAULT_LOG_BATCH_BLOCKS)?,
            history_page_size: env_u64("HISTORY_PAGE_SIZE", DEFAULT_HISTORY_PAGE_SIZE)?,
            cache_dir: env_dir("CACHE_DIR", "cache"),
            graph_dir: graph_dir_from_env(),
        })
    }
}
