//! Mock tracker for testing.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::candidate::SelectionMode;
use crate::format::FormatKey;
use crate::release::{Candidate, MediaType, ReleaseGroup, Torrent};
use crate::tracker::{Credentials, Session, TrackerApi, TrackerError, UploadRequest};

/// First torrent id handed out to uploads.
const UPLOAD_ID_BASE: u64 = 90_000;

/// A recorded upload for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub group_id: u64,
    pub source_torrent_id: u64,
    pub format: FormatKey,
    pub package: PathBuf,
    pub description: Vec<String>,
}

/// Mock implementation of the TrackerApi trait.
///
/// Groups are served from memory. Relabels and uploads are applied to the
/// stored groups, so a later fetch sees them the way the real tracker would.
///
/// # Example
///
/// ```rust,ignore
/// let tracker = MockTracker::new();
/// tracker.set_listed(vec![Candidate::new(1, 10)]).await;
/// tracker.set_next_error(TrackerError::Timeout).await;
/// ```
#[derive(Debug, Default)]
pub struct MockTracker {
    listed: Arc<RwLock<Vec<Candidate>>>,
    list_calls: Arc<RwLock<usize>>,
    groups: Arc<RwLock<HashMap<u64, ReleaseGroup>>>,
    fetch_calls: Arc<RwLock<Vec<u64>>>,
    marked: Arc<RwLock<Vec<u64>>>,
    uploads: Arc<RwLock<Vec<RecordedUpload>>>,
    logins: Arc<RwLock<usize>>,
    /// If set, the next request fails with this error.
    next_error: Arc<RwLock<Option<TrackerError>>>,
}

impl MockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidates returned by discovery.
    pub async fn set_listed(&self, candidates: Vec<Candidate>) {
        *self.listed.write().await = candidates;
    }

    pub async fn list_calls(&self) -> usize {
        *self.list_calls.read().await
    }

    pub async fn add_group(&self, group: ReleaseGroup) {
        self.groups.write().await.insert(group.id, group);
    }

    /// Current state of a stored group.
    pub async fn group(&self, group_id: u64) -> Option<ReleaseGroup> {
        self.groups.read().await.get(&group_id).cloned()
    }

    /// Group ids fetched so far, in order.
    pub async fn fetch_calls(&self) -> Vec<u64> {
        self.fetch_calls.read().await.clone()
    }

    /// Torrent ids relabelled as 24-bit.
    pub async fn marked(&self) -> Vec<u64> {
        self.marked.read().await.clone()
    }

    pub async fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.read().await.clone()
    }

    pub async fn login_count(&self) -> usize {
        *self.logins.read().await
    }

    /// Configure the next request to fail with the given error.
    pub async fn set_next_error(&self, error: TrackerError) {
        *self.next_error.write().await = Some(error);
    }

    async fn take_error(&self) -> Result<(), TrackerError> {
        match self.next_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TrackerApi for MockTracker {
    fn name(&self) -> &str {
        "mock"
    }

    async fn authenticate(
        &self,
        _credentials: &Credentials,
        _totp: Option<&str>,
    ) -> Result<Session, TrackerError> {
        self.take_error().await?;
        *self.logins.write().await += 1;
        Ok(Session {
            user_id: 1,
            authkey: "authkey".to_string(),
            passkey: "passkey".to_string(),
        })
    }

    async fn list_candidates(
        &self,
        _mode: SelectionMode,
        _media: &BTreeSet<MediaType>,
        skip: &BTreeSet<String>,
    ) -> Result<Vec<Candidate>, TrackerError> {
        self.take_error().await?;
        *self.list_calls.write().await += 1;
        Ok(self
            .listed
            .read()
            .await
            .iter()
            .filter(|c| !skip.contains(&c.ledger_id()))
            .copied()
            .collect())
    }

    async fn fetch_group(&self, group_id: u64) -> Result<ReleaseGroup, TrackerError> {
        self.take_error().await?;
        self.fetch_calls.write().await.push(group_id);
        self.group(group_id)
            .await
            .ok_or_else(|| TrackerError::NotFound(format!("group {}", group_id)))
    }

    async fn mark_twenty_four_bit(&self, torrent: &Torrent) -> Result<(), TrackerError> {
        self.take_error().await?;
        self.marked.write().await.push(torrent.id);
        for group in self.groups.write().await.values_mut() {
            for stored in group.torrents.iter_mut().filter(|t| t.id == torrent.id) {
                stored.encoding = "24bit Lossless".to_string();
            }
        }
        Ok(())
    }

    async fn upload(&self, request: &UploadRequest) -> Result<(), TrackerError> {
        self.take_error().await?;

        let mut uploads = self.uploads.write().await;
        let mut torrent = request.source.clone();
        torrent.id = UPLOAD_ID_BASE + uploads.len() as u64;
        torrent.format = request.format.format.to_string();
        torrent.encoding = request.format.encoding.to_string();
        if let Some(group) = self.groups.write().await.get_mut(&request.group_id) {
            group.torrents.push(torrent);
        }

        uploads.push(RecordedUpload {
            group_id: request.group_id,
            source_torrent_id: request.source.id,
            format: request.format.key,
            package: request.package.clone(),
            description: request.description.clone(),
        });
        Ok(())
    }

    fn permalink(&self, torrent: &Torrent) -> String {
        format!("https://tracker.example/torrents.php?torrentid={}", torrent.id)
    }

    async fn passkey(&self) -> Result<String, TrackerError> {
        self.take_error().await?;
        Ok("passkey".to_string())
    }
}
