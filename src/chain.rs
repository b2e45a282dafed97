//! Read-only chain access.
//!
//! Every contract read returns a [`CallOutcome`] so callers branch on an
//! explicit tag: a revert means the contract lacks the accessor, anything
//! else that fails means the transport broke.

use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{Filter, TransactionInput, TransactionRequest};
use alloy::transports::http::Http;
use alloy::transports::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AuditError, ConfigError, Result};

pub type HttpProvider = RootProvider<Http<reqwest::Client>>;

/// One historical signal as emitted on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub address: Address,
    pub topics: Vec<B256>,
    pub block_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Present(Bytes),
    /// The call reverted: the contract does not expose this capability.
    Absent,
    TransportFailure(String),
}

impl CallOutcome {
    /// Collapse into the crawl's error model: revert is `None`, transport is fatal.
    pub fn into_result(self) -> Result<Option<Bytes>> {
        match self {
            Self::Present(data) => Ok(Some(data)),
            Self::Absent => Ok(None),
            Self::TransportFailure(message) => Err(AuditError::transport(message)),
        }
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// `eth_call` against the latest block.
    async fn call(&self, to: Address, calldata: Bytes) -> CallOutcome;

    /// Logs emitted by any of `addresses` whose first topic is any of `topic0s`.
    async fn logs(
        &self,
        addresses: &[Address],
        topic0s: &[B256],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogRecord>>;

    async fn head(&self) -> Result<u64>;
}

pub struct RpcChain {
    provider: HttpProvider,
}

impl RpcChain {
    pub fn connect(rpc_url: &str) -> Result<Self> {
        let parsed = rpc_url.trim().parse::<reqwest::Url>().map_err(|e| {
            ConfigError::Invalid(format!("invalid RPC url `{rpc_url}`: {e}"))
        })?;
        Ok(Self {
            provider: ProviderBuilder::new().on_http(parsed),
        })
    }
}

#[async_trait]
impl ChainClient for RpcChain {
    async fn call(&self, to: Address, calldata: Bytes) -> CallOutcome {
        let tx = TransactionRequest::default()
            .to(to)
            .input(TransactionInput::new(calldata));
        match self.provider.call(&tx).await {
            Ok(data) => CallOutcome::Present(data),
            Err(err) => classify_call_error(&err),
        }
    }

    async fn logs(
        &self,
        addresses: &[Address],
        topic0s: &[B256],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogRecord>> {
        let filter = Filter::new()
            .address(addresses.to_vec())
            .event_signature(topic0s.to_vec())
            .from_block(from_block)
            .to_block(to_block);
        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|e| AuditError::transport(format!("eth_getLogs [{from_block}..={to_block}]: {e}")))?;
        Ok(logs
            .into_iter()
            .map(|log| LogRecord {
                address: log.address(),
                topics: log.topics().to_vec(),
                block_number: log.block_number.unwrap_or_default(),
            })
            .collect())
    }

    async fn head(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| AuditError::transport(format!("eth_blockNumber: {e}")))
    }
}

fn classify_call_error(err: &TransportError) -> CallOutcome {
    if let Some(payload) = err.as_error_resp() {
        if payload.code == 3 || is_revert_message(&payload.message) {
            return CallOutcome::Absent;
        }
    }
    let message = err.to_string();
    if is_revert_message(&message) {
        CallOutcome::Absent
    } else {
        CallOutcome::TransportFailure(message)
    }
}

/// Node error texts that mean the callee rejected the call, not the transport.
pub fn is_revert_message(message: &str) -> bool {
    let msg = message.to_ascii_lowercase();
    ["execution reverted", "revert", "invalid opcode", "invalid jump"]
        .iter()
        .any(|needle| msg.contains(needle))
}
