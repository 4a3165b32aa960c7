//! Mock tag checker for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::tagcheck::{TagCheck, TagCheckError, TagChecker};

/// Passes every file unless a failure message is set.
#[derive(Debug, Default)]
pub struct MockTagChecker {
    failure: Arc<RwLock<Option<String>>>,
    checked: Arc<RwLock<Vec<PathBuf>>>,
}

impl MockTagChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every following check fails with `message`, or passes again with `None`.
    pub async fn set_failure(&self, message: Option<String>) {
        *self.failure.write().await = message;
    }

    /// Files checked so far, in order.
    pub async fn checked(&self) -> Vec<PathBuf> {
        self.checked.read().await.clone()
    }
}

#[async_trait]
impl TagChecker for MockTagChecker {
    async fn validate(
        &self,
        path: &Path,
        _relax_track_number: bool,
    ) -> Result<TagCheck, TagCheckError> {
        self.checked.write().await.push(path.to_path_buf());
        Ok(match self.failure.read().await.as_ref() {
            Some(message) => TagCheck::fail(message.clone()),
            None => TagCheck::pass(),
        })
    }
}
