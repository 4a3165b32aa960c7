//! Types for tracker operations.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::candidate::SelectionMode;
use crate::format::FormatSpec;
use crate::release::{Candidate, MediaType, ReleaseGroup, Torrent};

/// Errors that can occur talking to the tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrackerError {
    pub(crate) fn from_request(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TrackerError::Timeout
        } else if e.is_connect() {
            TrackerError::ConnectionFailed(e.to_string())
        } else {
            TrackerError::ApiError(e.to_string())
        }
    }
}

/// Login credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated tracker session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: u64,
    pub authkey: String,
    pub passkey: String,
}

/// A packaged transcode ready to upload into an existing group.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub group_id: u64,
    /// The torrent the transcode was made from; its edition fields are reused.
    pub source: Torrent,
    /// The `.torrent` file produced by the packager.
    pub package: PathBuf,
    pub format: &'static FormatSpec,
    /// Description lines, joined with newlines on submission.
    pub description: Vec<String>,
}

/// Gazelle-style tracker.
#[async_trait]
pub trait TrackerApi: Send + Sync {
    /// Returns the tracker name for logging.
    fn name(&self) -> &str;

    /// Opens a session. Must be called before any other request.
    async fn authenticate(
        &self,
        credentials: &Credentials,
        totp: Option<&str>,
    ) -> Result<Session, TrackerError>;

    /// Lists transcode candidates for a discovery mode, omitting ids in `skip`.
    async fn list_candidates(
        &self,
        mode: SelectionMode,
        media: &BTreeSet<MediaType>,
        skip: &BTreeSet<String>,
    ) -> Result<Vec<Candidate>, TrackerError>;

    /// Fetches a release group with all its torrents.
    async fn fetch_group(&self, group_id: u64) -> Result<ReleaseGroup, TrackerError>;

    /// Relabels a torrent's encoding as `24bit Lossless`.
    async fn mark_twenty_four_bit(&self, torrent: &Torrent) -> Result<(), TrackerError>;

    /// Uploads a packaged transcode.
    async fn upload(&self, request: &UploadRequest) -> Result<(), TrackerError>;

    /// Stable link to a torrent, used in upload descriptions.
    fn permalink(&self, torrent: &Torrent) -> String;

    /// Personal announce key of the current session.
    async fn passkey(&self) -> Result<String, TrackerError>;
}
