use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuditError>;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("input error: {0}")]
    Input(#[from] InputError),
    #[error("chain transport failure: {0}")]
    Transport(String),
    #[error("history api failure: {0}")]
    History(String),
    #[error("cache file `{}` is corrupt: {reason}", path.display())]
    CacheCorruption { path: PathBuf, reason: String },
    #[error("cache io on `{}`: {source}", path.display())]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Bad operator input. Never retried; the run ends with the message.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("no registry entry named `{0}`")]
    UnknownName(String),
    #[error("malformed address `{raw}`: {reason}")]
    MalformedAddress { raw: String, reason: String },
    #[error("mode `{0}` requires a target")]
    MissingTarget(&'static str),
    #[error("unknown mode `{0}` (expected full, oracles, contract or permissions)")]
    UnknownMode(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl AuditError {
    pub fn transport(message: impl AsRef<str>) -> Self {
        Self::Transport(crate::utils::error::compact_error_message(
            message.as_ref(),
            TRANSPORT_ERR_MAX_LEN,
        ))
    }

    pub fn history(message: impl AsRef<str>) -> Self {
        Self::History(crate::utils::error::compact_error_message(
            message.as_ref(),
            TRANSPORT_ERR_MAX_LEN,
        ))
    }

    /// True when the failure came from operator input rather than the crawl.
    pub fn is_user_input(&self) -> bool {
        matches!(self, Self::Input(_))
    }
}

const TRANSPORT_ERR_MAX_LEN: usize = 260;
