//! Address parsing and the 32-byte word helpers shared by the probers.

use alloy::primitives::{Address, B256};
use std::str::FromStr;

use crate::error::{InputError, Result};

/// Parse a hex address in any letter case.
pub fn parse_address(raw: &str) -> Result<Address> {
    let trimmed = raw.trim();
    let hex = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X"));
    match hex {
        Some(body) if body.len() == 40 => {
            Address::from_str(body).map_err(|e| malformed(trimmed, e.to_string()))
        }
        Some(body) => Err(malformed(
            trimmed,
            format!("expected 40 hex digits, got {}", body.len()),
        )),
        None => Err(malformed(trimmed, "missing 0x prefix".to_string())),
    }
}

/// True when `raw` looks like an address literal rather than a symbolic name.
pub fn looks_like_address(raw: &str) -> bool {
    let raw = raw.trim();
    raw.len() == 42 && (raw.starts_with("0x") || raw.starts_with("0X"))
}

pub fn checksum(address: &Address) -> String {
    address.to_checksum(None)
}

/// Recover a zero-padded address argument from a log topic.
pub fn address_from_topic(topic: &B256) -> Option<Address> {
    if topic[..12].iter().any(|b| *b != 0) {
        return None;
    }
    Some(Address::from_slice(&topic[12..]))
}

/// Read the first ABI word of a call result as an address. Short payloads
/// carry no value and yield `None`.
pub fn address_from_word(data: &[u8]) -> Option<Address> {
    let word = data.get(..32)?;
    Some(Address::from_slice(&word[12..32]))
}

/// Read the first ABI word as a boolean-ish flag (non-zero is set).
pub fn flag_from_word(data: &[u8]) -> Option<bool> {
    let word = data.get(..32)?;
    Some(word.iter().any(|b| *b != 0))
}

fn malformed(raw: &str, reason: String) -> crate::error::AuditError {
    InputError::MalformedAddress {
        raw: raw.to_string(),
        reason,
    }
    .into()
}
