//! Deployer discovery through an Etherscan-compatible account history API.

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{AuditError, Result};

const NO_TRANSACTIONS: &str = "No transactions found";
const HISTORY_ACTIONS: [&str; 2] = ["txlist", "txlistinternal"];
const HTTP_TIMEOUT_SECS: u64 = 30;
/// The explorer rejects any page with `page * offset` above this.
const RESULT_WINDOW: u64 = 10_000;

#[async_trait]
pub trait HistoryClient: Send + Sync {
    /// Distinct senders of the transactions that created `address`.
    async fn deployers(&self, address: Address) -> Result<BTreeSet<Address>>;
}

/// Stand-in used when deployer lookup is switched off.
pub struct NoHistory;

#[async_trait]
impl HistoryClient for NoHistory {
    async fn deployers(&self, _address: Address) -> Result<BTreeSet<Address>> {
        Ok(BTreeSet::new())
    }
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    message: String,
    result: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExplorerTx {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default, rename = "contractAddress")]
    pub contract_address: String,
}

impl ExplorerTx {
    /// Creation of `target` itself, not of some other contract the queried
    /// account deployed.
    fn creates(&self, target: Address) -> bool {
        let created = self.contract_address.trim();
        if !created.is_empty() {
            return Address::from_str(created).is_ok_and(|a| a == target);
        }
        self.to.trim().is_empty() || self.kind.trim().to_ascii_lowercase().starts_with("create")
    }
}

/// Decode one page; an explicit empty history is `Ok(vec![])`.
fn parse_page(action: &str, address: Address, body: ExplorerResponse) -> Result<Vec<ExplorerTx>> {
    if body.status == "1" {
        return serde_json::from_value::<Vec<ExplorerTx>>(body.result).map_err(|e| {
            AuditError::history(format!("{action} for {address:#x}: malformed result: {e}"))
        });
    }
    if body.message.starts_with(NO_TRANSACTIONS) {
        return Ok(Vec::new());
    }
    let detail = match &body.result {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Err(AuditError::history(format!(
        "{action} for {address:#x}: {} ({detail})",
        body.message
    )))
}

pub fn creation_senders<'a, I>(target: Address, txs: I) -> BTreeSet<Address>
where
    I: IntoIterator<Item = &'a ExplorerTx>,
{
    txs.into_iter()
        .filter(|tx| tx.creates(target))
        .filter_map(|tx| Address::from_str(tx.from.trim()).ok())
        .filter(|a| !a.is_zero())
        .collect()
}

pub struct ExplorerClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    page_size: u64,
    result_window: u64,
    memo: Mutex<HashMap<Address, BTreeSet<Address>>>,
}

impl ExplorerClient {
    pub fn new(base_url: &str, api_key: &str, page_size: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AuditError::history(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim().to_string(),
            api_key: api_key.to_string(),
            page_size: page_size.max(1),
            result_window: RESULT_WINDOW,
            memo: Mutex::new(HashMap::new()),
        })
    }

    fn memo_get(&self, address: &Address) -> Option<BTreeSet<Address>> {
        let guard = self.memo.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.get(address).cloned()
    }

    fn memo_put(&self, address: Address, deployers: BTreeSet<Address>) {
        let mut guard = self.memo.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.insert(address, deployers);
    }

    async fn fetch_page(&self, action: &str, address: Address, page: u64) -> Result<Vec<ExplorerTx>> {
        let address_param = format!("{address:#x}");
        let page_param = page.to_string();
        let offset_param = self.page_size.to_string();
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("module", "account"),
                ("action", action),
                ("address", address_param.as_str()),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("page", page_param.as_str()),
                ("offset", offset_param.as_str()),
                ("sort", "asc"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuditError::history(format!("{action} for {address_param}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AuditError::history(format!(
                "{action} for {address_param}: HTTP {status}"
            )));
        }
        let body = resp
            .json::<ExplorerResponse>()
            .await
            .map_err(|e| AuditError::history(format!("{action} for {address_param}: {e}")))?;
        parse_page(action, address, body)
    }

    /// Results are ascending, so a creation sits on the earliest pages.
    /// Paging stops at the first page that yields a creator, at a short page,
    /// or at the last page inside the explorer's result window.
    async fn creators(&self, action: &str, address: Address) -> Result<BTreeSet<Address>> {
        let mut page = 1u64;
        loop {
            let batch = self.fetch_page(action, address, page).await?;
            let found = creation_senders(address, &batch);
            if !found.is_empty() || (batch.len() as u64) < self.page_size {
                return Ok(found);
            }
            if (page + 1).saturating_mul(self.page_size) > self.result_window {
                tracing::warn!(
                    "[HISTORY] {} for {:#x}: no creation within the first {} rows; giving up",
                    action,
                    address,
                    page * self.page_size
                );
                return Ok(found);
            }
            page += 1;
        }
    }
}

#[async_trait]
impl HistoryClient for ExplorerClient {
    async fn deployers(&self, address: Address) -> Result<BTreeSet<Address>> {
        if let Some(known) = self.memo_get(&address) {
            return Ok(known);
        }
        let mut deployers = BTreeSet::new();
        for action in HISTORY_ACTIONS {
            deployers.extend(self.creators(action, address).await?);
        }
        tracing::debug!(
            "[HISTORY] {:#x}: {} deployer candidate(s)",
            address,
            deployers.len()
        );
        self.memo_put(address, deployers.clone());
        Ok(deployers)
    }
}
