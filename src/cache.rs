//! On-disk JSON cache shared by the registry, signal, graph and snapshot tiers.
//!
//! A missing file is a miss. A file that exists but does not parse is
//! reported as corruption and never repaired or discarded.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{AuditError, Result};

/// Which persisted tiers the operator trusts instead of refreshing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheTiers {
    pub chainlog: bool,
    pub signals: bool,
    pub graph: bool,
}

impl CacheTiers {
    /// Parse a comma separated tier list such as `chainlog,signals`.
    pub fn parse_list(raw: &str) -> std::result::Result<Self, String> {
        let mut tiers = Self::default();
        for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match item.to_ascii_lowercase().as_str() {
                "chainlog" => tiers.chainlog = true,
                "signals" | "logs" => tiers.signals = true,
                "graph" => tiers.graph = true,
                other => return Err(format!("unknown cache tier `{other}`")),
            }
        }
        Ok(tiers)
    }
}

#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.path_of(name);
        let Some(raw) = read_optional(&path)? else {
            return Ok(None);
        };
        serde_json::from_str::<T>(&raw)
            .map(Some)
            .map_err(|e| AuditError::CacheCorruption {
                path,
                reason: e.to_string(),
            })
    }

    pub fn store<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.path_of(name);
        let raw = serde_json::to_string_pretty(value).map_err(|e| AuditError::CacheCorruption {
            path: path.clone(),
            reason: format!("serialize: {e}"),
        })?;
        write_file(&path, &raw)
    }

    pub fn load_text(&self, name: &str) -> Result<Option<String>> {
        read_optional(&self.path_of(name))
    }

    pub fn store_text(&self, name: &str, text: &str) -> Result<()> {
        write_file(&self.path_of(name), text)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(AuditError::CacheIo {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub(crate) fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| AuditError::CacheIo {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, contents).map_err(|source| AuditError::CacheIo {
        path: path.to_path_buf(),
        source,
    })
}
