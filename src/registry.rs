//! Address <-> name directory backed by the on-chain chain-log.
//!
//! Only used for display and for resolving symbolic names given on the
//! command line. Never consulted for graph structure.

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::address::{address_from_word, checksum, looks_like_address, parse_address};
use crate::cache::DiskCache;
use crate::chain::ChainClient;
use crate::error::{AuditError, InputError, Result};

pub const CHAINLOG_CACHE_NAME: &str = "chainlog.json";
/// Prefix of the price-feed entries that make up the oracle set.
pub const ORACLE_PREFIX: &str = "PIP_";

alloy::sol! {
    function count() external view returns (uint256);
    function get(uint256 index) external view returns (bytes32, address);
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    names: BTreeMap<Address, String>,
}

impl Registry {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Address, String)>,
    {
        let mut names = BTreeMap::new();
        for (address, name) in entries {
            // First name wins; the directory may alias one contract twice.
            names.entry(address).or_insert(name);
        }
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name_of(&self, address: &Address) -> Option<&str> {
        self.names.get(address).map(String::as_str)
    }

    /// `NAME` when known, otherwise the checksummed address.
    pub fn display(&self, address: &Address) -> String {
        match self.name_of(address) {
            Some(name) => name.to_string(),
            None => checksum(address),
        }
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.names.keys()
    }

    pub fn oracles(&self) -> Vec<Address> {
        self.names
            .iter()
            .filter(|(_, name)| name.starts_with(ORACLE_PREFIX))
            .map(|(address, _)| *address)
            .collect()
    }

    /// Accept an address literal or a directory name.
    pub fn resolve(&self, token: &str) -> Result<Address> {
        let token = token.trim();
        if looks_like_address(token) {
            return parse_address(token);
        }
        self.names
            .iter()
            .find(|(_, name)| name.as_str() == token)
            .map(|(address, _)| *address)
            .ok_or_else(|| InputError::UnknownName(token.to_string()).into())
    }
}

/// Load the directory, from cache when trusted, otherwise by enumerating
/// `get(i)` for every index below `count()`.
pub async fn load<C: ChainClient + ?Sized>(
    chain: &C,
    chainlog: Address,
    cache: &DiskCache,
    use_cache: bool,
) -> Result<Registry> {
    if use_cache {
        if let Some(registry) = cache.load::<Registry>(CHAINLOG_CACHE_NAME)? {
            tracing::info!("[REGISTRY] Loaded {} entries from cache", registry.len());
            return Ok(registry);
        }
        tracing::info!("[REGISTRY] No cached chain-log; enumerating on chain");
    }

    let raw_count = chain
        .call(chainlog, countCall {}.abi_encode().into())
        .await
        .into_result()?
        .ok_or_else(|| missing_directory(chainlog, "count()"))?;
    let total = decode_count(&raw_count).ok_or_else(|| missing_directory(chainlog, "count()"))?;

    let mut entries = Vec::with_capacity(total as usize);
    for index in 0..total {
        let calldata = getCall {
            index: U256::from(index),
        }
        .abi_encode();
        let raw = chain
            .call(chainlog, calldata.into())
            .await
            .into_result()?
            .ok_or_else(|| missing_directory(chainlog, "get(uint256)"))?;
        let Some((name, address)) = decode_entry(&raw) else {
            tracing::warn!("[REGISTRY] Undecodable entry at index {}; skipping", index);
            continue;
        };
        entries.push((address, name));
        tracing::info!(
            "[REGISTRY] {:.1}% ({}/{})",
            (index + 1) as f64 * 100.0 / total as f64,
            index + 1,
            total
        );
    }

    let registry = Registry::from_entries(entries);
    cache.store(CHAINLOG_CACHE_NAME, &registry)?;
    tracing::info!("[REGISTRY] Cached {} entries", registry.len());
    Ok(registry)
}

fn missing_directory(chainlog: Address, accessor: &str) -> AuditError {
    AuditError::transport(format!(
        "chain-log {} returned no data for {accessor}",
        checksum(&chainlog)
    ))
}

fn decode_count(data: &[u8]) -> Option<u64> {
    let word = data.get(..32)?;
    u64::try_from(U256::from_be_slice(word)).ok()
}

fn decode_entry(data: &[u8]) -> Option<(String, Address)> {
    let key = data.get(..32)?;
    let address = address_from_word(data.get(32..64)?)?;
    Some((decode_key(key)?, address))
}

/// bytes32 keys are right-padded ASCII.
pub fn decode_key(word: &[u8]) -> Option<String> {
    let end = word.iter().position(|b| *b == 0).unwrap_or(word.len());
    let name = std::str::from_utf8(&word[..end]).ok()?;
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}
