//! Historical grant signals: `rely`/`kiss` note logs and `Rely`/`Kiss` events.
//!
//! Fetches run once per distinct address set. Results are persisted under a
//! content hash of the sorted set and memoized per emitting address so later
//! single-address lookups in the same run never hit the chain again.

use alloy::primitives::{keccak256, Address, B256};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, OnceLock};

use crate::address::address_from_topic;
use crate::cache::DiskCache;
use crate::chain::{ChainClient, LogRecord};
use crate::error::Result;

const RELY_CALL: &str = "rely(address)";
const KISS_CALL: &str = "kiss(address)";
const RELY_EVENT: &str = "Rely(address)";
const KISS_EVENT: &str = "Kiss(address)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// A ward grant.
    Rely,
    /// A bud (whitelist) grant.
    Kiss,
}

/// Note-style logs carry the 4-byte selector left aligned in topic0.
pub fn legacy_call_topic(signature: &str) -> B256 {
    let mut word = [0u8; 32];
    word[..4].copy_from_slice(&keccak256(signature)[..4]);
    B256::from(word)
}

pub fn event_topic(signature: &str) -> B256 {
    keccak256(signature)
}

struct GrantTopics {
    rely_call: B256,
    kiss_call: B256,
    rely_event: B256,
    kiss_event: B256,
}

fn grant_topics() -> &'static GrantTopics {
    static TOPICS: OnceLock<GrantTopics> = OnceLock::new();
    TOPICS.get_or_init(|| GrantTopics {
        rely_call: legacy_call_topic(RELY_CALL),
        kiss_call: legacy_call_topic(KISS_CALL),
        rely_event: event_topic(RELY_EVENT),
        kiss_event: event_topic(KISS_EVENT),
    })
}

/// topic0 predicate for the single combined filter.
pub fn recognized_topic0s() -> Vec<B256> {
    let t = grant_topics();
    vec![t.rely_call, t.kiss_call, t.rely_event, t.kiss_event]
}

/// Kind of grant and the granted address, if `log` is a recognized signal.
pub fn classify(log: &LogRecord) -> Option<(SignalKind, Address)> {
    let t = grant_topics();
    let topic0 = log.topics.first()?;
    let (kind, arg_index) = if *topic0 == t.rely_call {
        (SignalKind::Rely, 2)
    } else if *topic0 == t.kiss_call {
        (SignalKind::Kiss, 2)
    } else if *topic0 == t.rely_event {
        (SignalKind::Rely, 1)
    } else if *topic0 == t.kiss_event {
        (SignalKind::Kiss, 1)
    } else {
        return None;
    };
    let granted = address_from_topic(log.topics.get(arg_index)?)?;
    if granted.is_zero() {
        return None;
    }
    Some((kind, granted))
}

/// Stable cache key for an address set; independent of iteration order.
pub fn signal_cache_key(addresses: &BTreeSet<Address>) -> String {
    let joined = addresses
        .iter()
        .map(|a| format!("{a:#x}"))
        .collect::<Vec<_>>()
        .join(",");
    hex::encode(keccak256(joined.as_bytes()))
}

pub struct SignalFetcher<C: ?Sized> {
    chain: Arc<C>,
    cache: DiskCache,
    trust_disk: bool,
    from_block: u64,
    batch_blocks: u64,
    memo: HashMap<Address, Vec<LogRecord>>,
}

impl<C: ChainClient + ?Sized> SignalFetcher<C> {
    pub fn new(
        chain: Arc<C>,
        cache: DiskCache,
        trust_disk: bool,
        from_block: u64,
        batch_blocks: u64,
    ) -> Self {
        Self {
            chain,
            cache,
            trust_disk,
            from_block,
            batch_blocks: batch_blocks.max(1),
            memo: HashMap::new(),
        }
    }

    pub fn is_memoized(&self, address: &Address) -> bool {
        self.memo.contains_key(address)
    }

    /// Signals emitted by every address in `addresses`, in chain order.
    pub async fn fetch(&mut self, addresses: &BTreeSet<Address>) -> Result<Vec<LogRecord>> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }
        if addresses.iter().all(|a| self.memo.contains_key(a)) {
            return Ok(self.from_memo(addresses));
        }

        let name = format!("logs/{}.json", signal_cache_key(addresses));
        if self.trust_disk {
            if let Some(logs) = self.cache.load::<Vec<LogRecord>>(&name)? {
                tracing::debug!(
                    "[SIGNALS] Cache hit for {} address(es): {} logs",
                    addresses.len(),
                    logs.len()
                );
                self.memoize(addresses, &logs);
                return Ok(logs);
            }
        }

        let logs = self.fetch_from_chain(addresses).await?;
        self.cache.store(&name, &logs)?;
        self.memoize(addresses, &logs);
        Ok(logs)
    }

    /// Signals for a single contract, memo first.
    pub async fn fetch_one(&mut self, address: Address) -> Result<Vec<LogRecord>> {
        self.fetch(&BTreeSet::from([address])).await
    }

    async fn fetch_from_chain(&self, addresses: &BTreeSet<Address>) -> Result<Vec<LogRecord>> {
        let head = self.chain.head().await?;
        if self.from_block > head {
            return Ok(Vec::new());
        }
        let targets: Vec<Address> = addresses.iter().copied().collect();
        let topics = recognized_topic0s();
        let total_blocks = head - self.from_block + 1;

        let mut logs = Vec::new();
        let mut start = self.from_block;
        while start <= head {
            let end = start.saturating_add(self.batch_blocks - 1).min(head);
            let batch = self.chain.logs(&targets, &topics, start, end).await?;
            logs.extend(batch);
            tracing::info!(
                "[SIGNALS] {} address(es): {:.1}% (blocks {}..={}, {} logs so far)",
                targets.len(),
                (end - self.from_block + 1) as f64 * 100.0 / total_blocks as f64,
                start,
                end,
                logs.len()
            );
            if end == head {
                break;
            }
            start = end + 1;
        }
        Ok(logs)
    }

    fn memoize(&mut self, addresses: &BTreeSet<Address>, logs: &[LogRecord]) {
        for address in addresses {
            self.memo.entry(*address).or_default();
        }
        let mut fresh: HashMap<Address, Vec<LogRecord>> = HashMap::new();
        for log in logs {
            if addresses.contains(&log.address) {
                fresh.entry(log.address).or_default().push(log.clone());
            }
        }
        for (address, records) in fresh {
            self.memo.insert(address, records);
        }
    }

    fn from_memo(&self, addresses: &BTreeSet<Address>) -> Vec<LogRecord> {
        let mut merged: Vec<LogRecord> = addresses
            .iter()
            .filter_map(|a| self.memo.get(a))
            .flatten()
            .cloned()
            .collect();
        merged.sort_by_key(|log| log.block_number);
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(address: Address) -> B256 {
        address.into_word()
    }

    #[test]
    fn test_legacy_topic_is_left_aligned_selector() {
        let topic = legacy_call_topic("rely(address)");
        assert_eq!(&topic[..4], &[0x65, 0xfa, 0xe3, 0x5e]);
        assert!(topic[4..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_classify_reads_argument_position_per_kind() {
        let sender = Address::from([0x01; 20]);
        let granted = Address::from([0x02; 20]);
        let note = LogRecord {
            address: Address::from([0xCC; 20]),
            topics: vec![legacy_call_topic(KISS_CALL), padded(sender), padded(granted)],
            block_number: 10,
        };
        assert_eq!(classify(&note), Some((SignalKind::Kiss, granted)));

        let event = LogRecord {
            address: Address::from([0xCC; 20]),
            topics: vec![event_topic(RELY_EVENT), padded(granted)],
            block_number: 11,
        };
        assert_eq!(classify(&event), Some((SignalKind::Rely, granted)));
    }

    #[test]
    fn test_classify_ignores_unknown_and_truncated() {
        let unknown = LogRecord {
            address: Address::ZERO,
            topics: vec![event_topic("Transfer(address,address,uint256)")],
            block_number: 1,
        };
        assert_eq!(classify(&unknown), None);
        let truncated = LogRecord {
            address: Address::ZERO,
            topics: vec![legacy_call_topic(RELY_CALL), padded(Address::from([1; 20]))],
            block_number: 1,
        };
        assert_eq!(classify(&truncated), None);
    }

    #[test]
    fn test_cache_key_ignores_order() {
        let x = Address::from([0x0A; 20]);
        let y = Address::from([0x0B; 20]);
        let xy: BTreeSet<Address> = [x, y].into_iter().collect();
        let yx: BTreeSet<Address> = [y, x].into_iter().collect();
        assert_eq!(signal_cache_key(&xy), signal_cache_key(&yx));
        assert_ne!(signal_cache_key(&xy), signal_cache_key(&BTreeSet::from([x])));
    }
}
