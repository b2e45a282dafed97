mod common;

use common::{addr, MockChain};
use ward_audit::cache::DiskCache;
use ward_audit::registry::{self, CHAINLOG_CACHE_NAME};

const CHAINLOG: u8 = 0xCC;

fn directory() -> MockChain {
    let mut chain = MockChain::new(100);
    chain.set_registry(
        addr(CHAINLOG),
        &[
            ("MCD_VAT", addr(0x01)),
            ("PIP_ETH", addr(0x05)),
            ("PIP_WBTC", addr(0x06)),
        ],
    );
    chain
}

#[tokio::test]
async fn enumerates_every_index_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let chain = directory();
    let cache = DiskCache::new(dir.path());

    let registry = registry::load(&chain, addr(CHAINLOG), &cache, false).await.unwrap();
    assert_eq!(registry.len(), 3);
    assert_eq!(registry.name_of(&addr(0x05)), Some("PIP_ETH"));
    assert_eq!(registry.oracles(), vec![addr(0x05), addr(0x06)]);
    // count() plus one get(i) per entry.
    assert_eq!(chain.calls_to(addr(CHAINLOG)), 4);
    assert!(dir.path().join(CHAINLOG_CACHE_NAME).exists());
}

#[tokio::test]
async fn trusted_cache_skips_the_chain() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskCache::new(dir.path());
    let first = registry::load(&directory(), addr(CHAINLOG), &cache, false).await.unwrap();

    let empty_chain = MockChain::new(100);
    let second = registry::load(&empty_chain, addr(CHAINLOG), &cache, true).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(empty_chain.calls_to(addr(CHAINLOG)), 0);
}

#[tokio::test]
async fn untrusted_cache_is_refreshed() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskCache::new(dir.path());
    registry::load(&directory(), addr(CHAINLOG), &cache, false).await.unwrap();

    let mut grown = MockChain::new(100);
    grown.set_registry(addr(CHAINLOG), &[("MCD_VAT", addr(0x01)), ("MCD_JUG", addr(0x07))]);
    let refreshed = registry::load(&grown, addr(CHAINLOG), &cache, false).await.unwrap();
    assert_eq!(refreshed.len(), 2);
    assert_eq!(refreshed.name_of(&addr(0x07)), Some("MCD_JUG"));
}

#[tokio::test]
async fn corrupt_cache_is_reported_not_repaired() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(CHAINLOG_CACHE_NAME), "{ not json").unwrap();
    let cache = DiskCache::new(dir.path());

    let err = registry::load(&directory(), addr(CHAINLOG), &cache, true).await.unwrap_err();
    assert!(matches!(err, ward_audit::error::AuditError::CacheCorruption { .. }));
    let untouched = std::fs::read_to_string(dir.path().join(CHAINLOG_CACHE_NAME)).unwrap();
    assert_eq!(untouched, "{ not json");
}

#[tokio::test]
async fn missing_directory_contract_is_a_transport_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = registry::load(&MockChain::new(100), addr(CHAINLOG), &DiskCache::new(dir.path()), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ward_audit::error::AuditError::Transport(_)));
}

#[tokio::test]
async fn unknown_name_is_rejected_as_input() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry::load(&directory(), addr(CHAINLOG), &DiskCache::new(dir.path()), false)
        .await
        .unwrap();
    let err = registry.resolve("MCD_NOPE").unwrap_err();
    assert!(err.is_user_input());
    assert_eq!(registry.resolve("MCD_VAT").unwrap(), addr(0x01));
}
