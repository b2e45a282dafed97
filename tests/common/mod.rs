#![allow(dead_code)]

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use ward_audit::chain::{CallOutcome, ChainClient, LogRecord};
use ward_audit::error::{AuditError, Result};
use ward_audit::history::HistoryClient;
use ward_audit::signals::{event_topic, legacy_call_topic};

pub fn addr(b: u8) -> Address {
    Address::from([b; 20])
}

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature);
    [hash[0], hash[1], hash[2], hash[3]]
}

pub fn calldata(signature: &str, args: &[B256]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    for arg in args {
        out.extend_from_slice(arg.as_slice());
    }
    out
}

pub fn word_u64(value: u64) -> Vec<u8> {
    U256::from(value).to_be_bytes::<32>().to_vec()
}

pub fn word_addr(value: Address) -> Vec<u8> {
    value.into_word().to_vec()
}

/// In-memory chain: unknown calls revert, logs are filtered like a node would.
#[derive(Default)]
pub struct MockChain {
    pub head: u64,
    slots: HashMap<(Address, Vec<u8>), CallOutcome>,
    logs: Vec<LogRecord>,
    fail_logs: bool,
    pub log_queries: Mutex<Vec<(Vec<Address>, u64, u64)>>,
    pub calls: Mutex<Vec<(Address, Vec<u8>)>>,
}

impl MockChain {
    pub fn new(head: u64) -> Self {
        Self {
            head,
            ..Self::default()
        }
    }

    pub fn set_call(&mut self, to: Address, data: Vec<u8>, outcome: CallOutcome) {
        self.slots.insert((to, data), outcome);
    }

    pub fn set_owner(&mut self, contract: Address, owner: Address) {
        self.set_call(
            contract,
            calldata("owner()", &[]),
            CallOutcome::Present(word_addr(owner).into()),
        );
    }

    pub fn set_authority(&mut self, contract: Address, authority: Address) {
        self.set_call(
            contract,
            calldata("authority()", &[]),
            CallOutcome::Present(word_addr(authority).into()),
        );
    }

    pub fn set_ward(&mut self, contract: Address, usr: Address, active: bool) {
        self.set_call(
            contract,
            calldata("wards(address)", &[usr.into_word()]),
            CallOutcome::Present(word_u64(active as u64).into()),
        );
    }

    pub fn set_bud(&mut self, contract: Address, usr: Address, active: bool) {
        self.set_call(
            contract,
            calldata("bud(address)", &[usr.into_word()]),
            CallOutcome::Present(word_u64(active as u64).into()),
        );
    }

    /// Contract with a wards mapping that answers `0` for everyone not set.
    pub fn set_ward_default_zero(&mut self, contract: Address, candidates: &[Address]) {
        for usr in candidates {
            self.slots
                .entry((contract, calldata("wards(address)", &[usr.into_word()])))
                .or_insert_with(|| CallOutcome::Present(word_u64(0).into()));
        }
    }

    pub fn rely_event(&mut self, contract: Address, usr: Address, block: u64) {
        self.logs.push(LogRecord {
            address: contract,
            topics: vec![event_topic("Rely(address)"), usr.into_word()],
            block_number: block,
        });
    }

    pub fn rely_note(&mut self, contract: Address, sender: Address, usr: Address, block: u64) {
        self.logs.push(LogRecord {
            address: contract,
            topics: vec![
                legacy_call_topic("rely(address)"),
                sender.into_word(),
                usr.into_word(),
            ],
            block_number: block,
        });
    }

    pub fn kiss_event(&mut self, contract: Address, usr: Address, block: u64) {
        self.logs.push(LogRecord {
            address: contract,
            topics: vec![event_topic("Kiss(address)"), usr.into_word()],
            block_number: block,
        });
    }

    pub fn set_registry(&mut self, chainlog: Address, entries: &[(&str, Address)]) {
        self.set_call(
            chainlog,
            calldata("count()", &[]),
            CallOutcome::Present(word_u64(entries.len() as u64).into()),
        );
        for (idx, (name, address)) in entries.iter().enumerate() {
            let mut key = [0u8; 32];
            key[..name.len()].copy_from_slice(name.as_bytes());
            let mut ret = key.to_vec();
            ret.extend(word_addr(*address));
            self.set_call(
                chainlog,
                calldata("get(uint256)", &[B256::from(U256::from(idx as u64))]),
                CallOutcome::Present(ret.into()),
            );
        }
    }

    pub fn fail_logs(&mut self) {
        self.fail_logs = true;
    }

    pub fn log_query_count(&self) -> usize {
        self.log_queries.lock().unwrap().len()
    }

    pub fn calls_to(&self, to: Address) -> usize {
        self.calls.lock().unwrap().iter().filter(|(a, _)| *a == to).count()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn call(&self, to: Address, calldata: Bytes) -> CallOutcome {
        self.calls.lock().unwrap().push((to, calldata.to_vec()));
        self.slots
            .get(&(to, calldata.to_vec()))
            .cloned()
            .unwrap_or(CallOutcome::Absent)
    }

    async fn logs(
        &self,
        addresses: &[Address],
        topic0s: &[B256],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogRecord>> {
        self.log_queries
            .lock()
            .unwrap()
            .push((addresses.to_vec(), from_block, to_block));
        if self.fail_logs {
            return Err(AuditError::transport("connection reset by peer"));
        }
        Ok(self
            .logs
            .iter()
            .filter(|log| addresses.contains(&log.address))
            .filter(|log| log.topics.first().is_some_and(|t| topic0s.contains(t)))
            .filter(|log| (from_block..=to_block).contains(&log.block_number))
            .cloned()
            .collect())
    }

    async fn head(&self) -> Result<u64> {
        Ok(self.head)
    }
}

#[derive(Default)]
pub struct MockHistory {
    deployers: HashMap<Address, BTreeSet<Address>>,
    failing: BTreeSet<Address>,
    pub requests: Mutex<Vec<Address>>,
}

impl MockHistory {
    pub fn deployed_by(mut self, contract: Address, deployer: Address) -> Self {
        self.deployers.entry(contract).or_default().insert(deployer);
        self
    }

    pub fn failing_for(mut self, contract: Address) -> Self {
        self.failing.insert(contract);
        self
    }
}

#[async_trait]
impl HistoryClient for MockHistory {
    async fn deployers(&self, address: Address) -> Result<BTreeSet<Address>> {
        self.requests.lock().unwrap().push(address);
        if self.failing.contains(&address) {
            return Err(AuditError::history("NOTOK (Invalid API Key)"));
        }
        Ok(self.deployers.get(&address).cloned().unwrap_or_default())
    }
}
