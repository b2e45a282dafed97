//! Rendered-tree snapshots and change detection between runs.
//!
//! Each namespace keeps a `latest.txt` plus one timestamped copy per run
//! that changed something.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use similar::{ChangeTag as SimilarTag, TextDiff};
use std::fmt;

use crate::cache::DiskCache;
use crate::error::Result;

const LATEST: &str = "latest.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Full,
    Oracles,
    Contract(Address),
    Permissions(Address),
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Oracles => f.write_str("oracles"),
            Self::Contract(a) => write!(f, "contract-{a:#x}"),
            Self::Permissions(a) => write!(f, "permissions-{a:#x}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTag {
    Unchanged,
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSegment {
    pub tag: ChangeTag,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffReport {
    pub changed: bool,
    pub segments: Vec<DiffSegment>,
    pub report: String,
}

/// Character-level partition of `old` -> `new`, adjacent runs coalesced.
pub fn diff_texts(old: &str, new: &str) -> Vec<DiffSegment> {
    let diff = TextDiff::from_chars(old, new);
    let mut segments: Vec<DiffSegment> = Vec::new();
    for change in diff.iter_all_changes() {
        let tag = match change.tag() {
            SimilarTag::Equal => ChangeTag::Unchanged,
            SimilarTag::Insert => ChangeTag::Added,
            SimilarTag::Delete => ChangeTag::Removed,
        };
        match segments.last_mut() {
            Some(last) if last.tag == tag => last.text.push_str(change.value()),
            _ => segments.push(DiffSegment {
                tag,
                text: change.value().to_string(),
            }),
        }
    }
    segments
}

/// Word-diff style rendering: `[-removed-]` and `{+added+}`.
pub fn format_segments(segments: &[DiffSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment.tag {
            ChangeTag::Unchanged => out.push_str(&segment.text),
            ChangeTag::Removed => {
                out.push_str("[-");
                out.push_str(&segment.text);
                out.push_str("-]");
            }
            ChangeTag::Added => {
                out.push_str("{+");
                out.push_str(&segment.text);
                out.push_str("+}");
            }
        }
    }
    out
}

pub struct SnapshotStore {
    cache: DiskCache,
}

impl SnapshotStore {
    pub fn new(cache: DiskCache) -> Self {
        Self { cache }
    }

    pub fn latest(&self, namespace: Namespace) -> Result<Option<String>> {
        self.cache.load_text(&format!("{namespace}/{LATEST}"))
    }

    pub fn persist(&self, namespace: Namespace, snapshot: &Snapshot) -> Result<()> {
        let stamp = snapshot.created_at.format("%Y%m%dT%H%M%S%.3fZ");
        self.cache
            .store_text(&format!("{namespace}/{stamp}.txt"), &snapshot.text)?;
        self.cache
            .store_text(&format!("{namespace}/{LATEST}"), &snapshot.text)
    }

    pub fn diff(&self, new_text: &str, namespace: Namespace) -> Result<DiffReport> {
        self.diff_at(new_text, namespace, Utc::now())
    }

    pub fn diff_at(
        &self,
        new_text: &str,
        namespace: Namespace,
        now: DateTime<Utc>,
    ) -> Result<DiffReport> {
        let previous = self.latest(namespace)?.unwrap_or_default();
        if previous == new_text {
            tracing::info!("[DIFF] {}: no changes since last run", namespace);
            return Ok(DiffReport {
                changed: false,
                segments: Vec::new(),
                report: format!("no changes in {namespace} since last run\n"),
            });
        }

        self.persist(
            namespace,
            &Snapshot {
                text: new_text.to_string(),
                created_at: now,
            },
        )?;
        let segments = diff_texts(&previous, new_text);
        let added = segments.iter().filter(|s| s.tag == ChangeTag::Added).count();
        let removed = segments.iter().filter(|s| s.tag == ChangeTag::Removed).count();
        tracing::info!(
            "[DIFF] {}: {} added / {} removed segment(s)",
            namespace,
            added,
            removed
        );
        let report = format_segments(&segments);
        Ok(DiffReport {
            changed: true,
            segments,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_partition_distinguishes_removed_and_added() {
        let segments = diff_texts("A\nB", "A\nC");
        assert_eq!(
            segments,
            vec![
                DiffSegment {
                    tag: ChangeTag::Unchanged,
                    text: "A\n".into()
                },
                DiffSegment {
                    tag: ChangeTag::Removed,
                    text: "B".into()
                },
                DiffSegment {
                    tag: ChangeTag::Added,
                    text: "C".into()
                },
            ]
        );
        assert_eq!(format_segments(&segments), "A\n[-B-]{+C+}");
    }

    #[test]
    fn test_store_detects_change_then_stability() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(DiskCache::new(dir.path()));
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let first = store.diff_at("A\nB", Namespace::Full, t0).unwrap();
        assert!(first.changed);
        assert_eq!(store.latest(Namespace::Full).unwrap().as_deref(), Some("A\nB"));

        let second = store.diff_at("A\nC", Namespace::Full, t1).unwrap();
        assert!(second.changed);
        assert!(second.report.contains("[-B-]"));
        assert!(second.report.contains("{+C+}"));

        let third = store.diff_at("A\nC", Namespace::Full, t1).unwrap();
        assert!(!third.changed);

        let kept = std::fs::read_dir(dir.path().join("full")).unwrap().count();
        assert_eq!(kept, 3, "two timestamped snapshots plus latest");
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(DiskCache::new(dir.path()));
        store.diff("X", Namespace::Oracles).unwrap();
        assert!(store.latest(Namespace::Full).unwrap().is_none());
        let ns = Namespace::Contract(Address::from([0xAB; 20]));
        assert!(ns.to_string().starts_with("contract-0xabab"));
    }
}
