//! Current-state authority probing for a single contract.
//!
//! Owner and authority are read directly. Wards and buds are proposed from
//! history (deployers, `rely`/`kiss` signals) and kept only if the contract's
//! own mapping still confirms them.

use alloy::primitives::Address;
use alloy::sol_types::SolCall;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::address::{address_from_word, flag_from_word};
use crate::chain::ChainClient;
use crate::error::Result;
use crate::history::HistoryClient;
use crate::signals::{classify, SignalFetcher, SignalKind};

alloy::sol! {
    function owner() external view returns (address);
    function authority() external view returns (address);
    function wards(address usr) external view returns (uint256);
    function bud(address usr) external view returns (uint256);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authorities {
    pub owner: Option<Address>,
    pub authority: Option<Address>,
    pub wards: BTreeSet<Address>,
    pub buds: BTreeSet<Address>,
}

impl Authorities {
    pub fn is_empty(&self) -> bool {
        self.owner.is_none() && self.authority.is_none() && self.wards.is_empty() && self.buds.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Mapping {
    Wards,
    Buds,
}

impl Mapping {
    fn label(self) -> &'static str {
        match self {
            Self::Wards => "wards",
            Self::Buds => "bud",
        }
    }

    fn calldata(self, usr: Address) -> Vec<u8> {
        match self {
            Self::Wards => wardsCall { usr }.abi_encode(),
            Self::Buds => budCall { usr }.abi_encode(),
        }
    }
}

pub struct AuthorityProber<C: ?Sized, H: ?Sized> {
    chain: Arc<C>,
    history: Arc<H>,
    signals: SignalFetcher<C>,
}

impl<C, H> AuthorityProber<C, H>
where
    C: ChainClient + ?Sized,
    H: HistoryClient + ?Sized,
{
    pub fn new(chain: Arc<C>, history: Arc<H>, signals: SignalFetcher<C>) -> Self {
        Self {
            chain,
            history,
            signals,
        }
    }

    pub fn signals_mut(&mut self) -> &mut SignalFetcher<C> {
        &mut self.signals
    }

    pub async fn probe(&mut self, address: Address) -> Result<Authorities> {
        let owner = self.read_slot(address, ownerCall {}.abi_encode()).await?;
        let authority = self.read_slot(address, authorityCall {}.abi_encode()).await?;

        let mut relied = Vec::new();
        let mut kissed = Vec::new();
        for log in self.signals.fetch_one(address).await? {
            if log.address != address {
                continue;
            }
            match classify(&log) {
                Some((SignalKind::Rely, granted)) => relied.push(granted),
                Some((SignalKind::Kiss, granted)) => kissed.push(granted),
                None => {}
            }
        }

        let mut ward_candidates: Vec<Address> =
            self.history.deployers(address).await?.into_iter().collect();
        ward_candidates.extend(relied);

        let wards = self.confirm(address, Mapping::Wards, ward_candidates).await?;
        let buds = self.confirm(address, Mapping::Buds, kissed).await?;

        tracing::debug!(
            "[PROBE] {:#x}: owner={:?} authority={:?} wards={} buds={}",
            address,
            owner,
            authority,
            wards.len(),
            buds.len()
        );
        Ok(Authorities {
            owner,
            authority,
            wards,
            buds,
        })
    }

    /// Single-address accessor; revert, empty return and zero are all absent.
    async fn read_slot(&self, address: Address, calldata: Vec<u8>) -> Result<Option<Address>> {
        let raw = self.chain.call(address, calldata.into()).await.into_result()?;
        Ok(raw
            .as_deref()
            .and_then(|data| address_from_word(data))
            .filter(|value| !value.is_zero()))
    }

    async fn confirm(
        &self,
        address: Address,
        mapping: Mapping,
        candidates: Vec<Address>,
    ) -> Result<BTreeSet<Address>> {
        let mut seen = BTreeSet::new();
        let ordered: Vec<Address> = candidates.into_iter().filter(|c| seen.insert(*c)).collect();

        let mut confirmed = BTreeSet::new();
        for (idx, candidate) in ordered.iter().enumerate() {
            let raw = self
                .chain
                .call(address, mapping.calldata(*candidate).into())
                .await
                .into_result()?;
            match raw.as_deref().and_then(|data| flag_from_word(data)) {
                Some(true) => {
                    confirmed.insert(*candidate);
                }
                Some(false) => {}
                None if idx == 0 => {
                    tracing::debug!(
                        "[PROBE] {:#x} has no {} mapping; skipping {} candidate(s)",
                        address,
                        mapping.label(),
                        ordered.len()
                    );
                    return Ok(BTreeSet::new());
                }
                None => {}
            }
            tracing::debug!(
                "[PROBE] {:#x} {}: checked {}/{}",
                address,
                mapping.label(),
                idx + 1,
                ordered.len()
            );
        }
        Ok(confirmed)
    }
}
