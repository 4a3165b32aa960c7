//! On-disk ledger format.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current document version written by [`super::Ledger::persist`].
pub const LEDGER_VERSION: u32 = 1;

/// Errors that can occur reading or writing the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to read ledger {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write ledger {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ledger {path} is not valid: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Versioned ledger document.
///
/// ```json
/// { "version": 1, "updated_at": "2024-05-01T10:00:00Z", "ids": ["123", "456"] }
/// ```
///
/// Unknown fields are ignored on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDocument {
    pub version: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ids: Vec<String>,
}

/// Everything `load` accepts: the current document or a bare array of ids.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum StoredLedger {
    Document(LedgerDocument),
    Legacy(Vec<LegacyId>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum LegacyId {
    Text(String),
    Number(u64),
}

impl LegacyId {
    pub(super) fn into_string(self) -> String {
        match self {
            LegacyId::Text(s) => s,
            LegacyId::Number(n) => n.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_tolerates_unknown_fields() {
        let json = r#"{"version": 1, "ids": ["1", "2"], "written_by": "future"}"#;
        let parsed: StoredLedger = serde_json::from_str(json).unwrap();
        match parsed {
            StoredLedger::Document(doc) => {
                assert_eq!(doc.ids, vec!["1", "2"]);
                assert!(doc.updated_at.is_none());
            }
            StoredLedger::Legacy(_) => panic!("expected document"),
        }
    }

    #[test]
    fn test_legacy_array_accepts_numbers_and_strings() {
        let parsed: StoredLedger = serde_json::from_str(r#"["10", 20]"#).unwrap();
        match parsed {
            StoredLedger::Legacy(ids) => {
                let ids: Vec<String> = ids.into_iter().map(LegacyId::into_string).collect();
                assert_eq!(ids, vec!["10", "20"]);
            }
            StoredLedger::Document(_) => panic!("expected legacy array"),
        }
    }
}
