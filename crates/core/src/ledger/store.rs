//! Ledger loading and persistence.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::candidate::parse_release_reference;
use crate::release::Candidate;

use super::types::{LedgerDocument, LedgerError, LegacyId, StoredLedger, LEDGER_VERSION};

/// Persisted set of processed release ids.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    ids: BTreeSet<String>,
}

impl Ledger {
    /// Creates an empty in-memory ledger bound to `path` without touching disk.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ids: BTreeSet::new(),
        }
    }

    /// Loads the ledger at `path`.
    ///
    /// A missing or unreadable file yields an empty ledger which is persisted
    /// straight away so the next run finds a valid document.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        match Self::read(&path).await {
            Ok(ids) => {
                info!("Loaded {} processed ids from {}", ids.len(), path.display());
                Self { path, ids }
            }
            Err(e) => {
                match &e {
                    LedgerError::Read { source, .. }
                        if source.kind() == std::io::ErrorKind::NotFound =>
                    {
                        warn!("No ledger at {}, starting empty", path.display());
                    }
                    _ => warn!("Starting with an empty ledger: {}", e),
                }

                let ledger = Self::empty(path);
                if let Err(e) = ledger.persist().await {
                    error!("Failed to initialise ledger: {}", e);
                }
                ledger
            }
        }
    }

    async fn read(path: &Path) -> Result<BTreeSet<String>, LedgerError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LedgerError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let stored: StoredLedger =
            serde_json::from_str(&raw).map_err(|e| LedgerError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let ids = match stored {
            StoredLedger::Document(doc) => {
                if doc.version > LEDGER_VERSION {
                    warn!(
                        "Ledger {} has version {}, newer than {}; reading ids anyway",
                        path.display(),
                        doc.version,
                        LEDGER_VERSION
                    );
                }
                doc.ids.into_iter().collect()
            }
            StoredLedger::Legacy(ids) => {
                debug!("Upgrading legacy ledger layout at {}", path.display());
                ids.into_iter().map(LegacyId::into_string).collect()
            }
        };

        Ok(ids)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Adds an id in memory. Returns `false` if it was already present.
    pub fn add(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn ids(&self) -> &BTreeSet<String> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Writes the ledger through a sibling temp file and an atomic rename.
    pub async fn persist(&self) -> Result<(), LedgerError> {
        let doc = LedgerDocument {
            version: LEDGER_VERSION,
            updated_at: Some(Utc::now()),
            ids: self.ids.iter().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&doc)?;

        let write_err = |source| LedgerError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp = self.temp_path();
        if let Err(e) = Self::write_synced(&tmp, json.as_bytes()).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }

        debug!("Persisted {} ids to {}", self.ids.len(), self.path.display());
        Ok(())
    }

    /// Writes `bytes` to `path` and flushes them to disk.
    async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await
    }

    /// Adds `id` and persists, retrying the write once.
    ///
    /// A write that still fails is logged and the id stays in memory, so the
    /// next successful persist carries it. Returns `true` if the id is on disk.
    pub async fn record(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        self.add(id.clone());

        match self.persist().await {
            Ok(()) => true,
            Err(first) => {
                warn!("Ledger write for {} failed, retrying: {}", id, first);
                match self.persist().await {
                    Ok(()) => true,
                    Err(e) => {
                        error!(
                            "Could not persist ledger entry {} to {}: {}",
                            id,
                            self.path.display(),
                            e
                        );
                        false
                    }
                }
            }
        }
    }

    /// Marks references as processed without transcoding them.
    ///
    /// Malformed references are logged and skipped. Returns the candidates
    /// that were recorded.
    pub async fn mark_processed(
        &mut self,
        references: &[String],
    ) -> Result<Vec<Candidate>, LedgerError> {
        let mut marked = Vec::new();

        for reference in references {
            match parse_release_reference(reference) {
                Ok(candidate) => {
                    if self.add(candidate.ledger_id()) {
                        info!("Marked {} as processed", candidate);
                    }
                    marked.push(candidate);
                }
                Err(e) => warn!("Not marking reference: {}", e),
            }
        }

        self.persist().await?;
        Ok(marked)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_created_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("ledger.json");

        let ledger = Ledger::load(&path).await;
        assert!(ledger.is_empty());
        assert!(path.exists());

        let raw = std::fs::read_to_string(&path).unwrap();
        let doc: LedgerDocument = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc.version, LEDGER_VERSION);
        assert!(doc.ids.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_resets_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "{not json").unwrap();

        let ledger = Ledger::load(&path).await;
        assert!(ledger.is_empty());

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<LedgerDocument>(&raw).is_ok());
    }

    #[tokio::test]
    async fn test_legacy_array_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"["100", 200]"#).unwrap();

        let ledger = Ledger::load(&path).await;
        assert!(ledger.contains("100"));
        assert!(ledger.contains("200"));
        assert_eq!(ledger.len(), 2);
    }

    #[tokio::test]
    async fn test_record_round_trips_sorted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");

        let mut ledger = Ledger::load(&path).await;
        assert!(ledger.record("30").await);
        assert!(ledger.record("10").await);
        assert!(!ledger.add("10"));

        let raw = std::fs::read_to_string(&path).unwrap();
        let doc: LedgerDocument = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc.ids, vec!["10", "30"]);
        assert!(doc.updated_at.is_some());
        assert!(!dir.path().join("ledger.json.tmp").exists());

        let reloaded = Ledger::load(&path).await;
        assert_eq!(reloaded.ids(), ledger.ids());
    }

    #[tokio::test]
    async fn test_record_keeps_id_when_write_fails() {
        let dir = TempDir::new().unwrap();
        // A directory at the target path makes the rename fail.
        let path = dir.path().join("ledger.json");
        std::fs::create_dir(&path).unwrap();

        let mut ledger = Ledger::empty(&path);
        assert!(!ledger.record("7").await);
        assert!(ledger.contains("7"));
    }

    #[tokio::test]
    async fn test_persist_overwrites_stale_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        let tmp = dir.path().join("ledger.json.tmp");
        std::fs::write(&tmp, "x".repeat(4096)).unwrap();

        let mut ledger = Ledger::empty(&path);
        ledger.add("5");
        ledger.persist().await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let doc: LedgerDocument = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc.ids, vec!["5"]);
        assert!(!tmp.exists());
    }

    #[tokio::test]
    async fn test_failed_temp_write_keeps_previous_ledger() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");

        let mut ledger = Ledger::load(&path).await;
        assert!(ledger.record("1").await);

        // A directory at the temp path makes creating the temp file fail.
        std::fs::create_dir(dir.path().join("ledger.json.tmp")).unwrap();
        ledger.add("2");
        assert!(ledger.persist().await.is_err());

        let reloaded = Ledger::load(&path).await;
        assert!(reloaded.contains("1"));
        assert!(!reloaded.contains("2"));
    }

    #[tokio::test]
    async fn test_mark_processed_skips_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");

        let mut ledger = Ledger::load(&path).await;
        let marked = ledger
            .mark_processed(&[
                "https://example.org/torrents.php?id=1&torrentid=11".to_string(),
                "nonsense".to_string(),
                "torrents.php?id=2&amp;torrentid=22".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(marked, vec![Candidate::new(1, 11), Candidate::new(2, 22)]);
        let reloaded = Ledger::load(&path).await;
        assert!(reloaded.contains("11"));
        assert!(reloaded.contains("22"));
        assert_eq!(reloaded.len(), 2);
    }
}
