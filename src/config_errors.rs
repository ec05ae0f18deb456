//! # Configuration Error Types Module
//!
//! Error types produced by the credential gate and the runtime settings loader.
//! Every variant is fatal at startup and names the offending item.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::CredentialKey;

/// Why a required credential failed the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingReason {
    /// Key absent from the document and from the environment
    Absent,
    /// Key present but empty or whitespace-only
    Empty,
    /// Key names a credentials file that does not exist on disk
    FileNotFound(PathBuf),
}

/// A single credential that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingCredential {
    pub key: CredentialKey,
    pub reason: MissingReason,
}

impl fmt::Display for MissingCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            MissingReason::Absent => write!(f, "{} (not set)", self.key),
            MissingReason::Empty => write!(f, "{} (empty)", self.key),
            MissingReason::FileNotFound(path) => {
                write!(f, "{} (file not found: {})", self.key, path.display())
            }
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {} (copy the example configuration into place first)", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("failed to read configuration file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration file {}: {reason}", path.display())]
    ConfigMalformed { path: PathBuf, reason: String },

    #[error("missing required credentials: {}", format_missing(.0))]
    MissingCredential(Vec<MissingCredential>),

    #[error("unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("invalid value for {name}: {value:?}")]
    InvalidSetting { name: String, value: String },
}

impl ConfigError {
    /// Keys reported by a `MissingCredential` error, in validation order
    pub fn missing_keys(&self) -> Vec<CredentialKey> {
        match self {
            ConfigError::MissingCredential(missing) => missing.iter().map(|m| m.key).collect(),
            _ => Vec::new(),
        }
    }
}

fn format_missing(missing: &[MissingCredential]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
