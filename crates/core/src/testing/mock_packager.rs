//! Mock packager for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::packager::{PackageRequest, Packager, PackagerError};

/// A recorded packaging call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPackage {
    pub source: PathBuf,
    pub announce_url: String,
    pub source_flag: Option<String>,
    pub output: PathBuf,
}

/// Writes a small placeholder `.torrent` instead of hashing anything.
#[derive(Debug, Default)]
pub struct MockPackager {
    packaged: Arc<RwLock<Vec<RecordedPackage>>>,
    next_error: Arc<RwLock<Option<PackagerError>>>,
}

impl MockPackager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful packaging calls so far.
    pub async fn packaged(&self) -> Vec<RecordedPackage> {
        self.packaged.read().await.clone()
    }

    pub async fn source_flags(&self) -> Vec<Option<String>> {
        self.packaged
            .read()
            .await
            .iter()
            .map(|p| p.source_flag.clone())
            .collect()
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: PackagerError) {
        *self.next_error.write().await = Some(error);
    }

    /// Configure the next call to fail.
    pub async fn fail_next(&self) {
        self.set_next_error(PackagerError::Failed {
            path: PathBuf::from("mock"),
            reason: "mock packaging failure".to_string(),
        })
        .await;
    }
}

#[async_trait]
impl Packager for MockPackager {
    fn name(&self) -> &str {
        "mock"
    }

    async fn package(&self, request: &PackageRequest<'_>) -> Result<PathBuf, PackagerError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let output = request.torrent_path();
        let announce_url = request.announce_url();
        let body = format!("d8:announce{}:{}e", announce_url.len(), announce_url);
        tokio::fs::write(&output, body).await?;

        self.packaged.write().await.push(RecordedPackage {
            source: request.source.to_path_buf(),
            announce_url,
            source_flag: request.source_flag.map(str::to_string),
            output: output.clone(),
        });
        Ok(output)
    }
}
