//! Torrent packaging.
//!
//! A `Packager` turns a transcode directory into a `.torrent` file bound to
//! the user's personal announce URL.

mod mktorrent;

pub use mktorrent::MktorrentPackager;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while packaging.
#[derive(Debug, Error)]
pub enum PackagerError {
    #[error("mktorrent not found at path: {path}")]
    ToolNotFound { path: PathBuf },

    #[error("Packaging {path} failed: {reason}")]
    Failed { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything needed to build one package.
#[derive(Debug, Clone)]
pub struct PackageRequest<'a> {
    /// Directory to package.
    pub source: &'a Path,
    /// Directory the `.torrent` file is written into.
    pub work_dir: &'a Path,
    /// Announce URL prefix; the passkey and `/announce` are appended.
    pub announce: &'a str,
    pub passkey: &'a str,
    /// Optional source flag embedded in the info dict.
    pub source_flag: Option<&'a str>,
}

impl PackageRequest<'_> {
    /// `<announce><passkey>/announce`
    pub fn announce_url(&self) -> String {
        format!("{}{}/announce", self.announce, self.passkey)
    }

    /// `<work_dir>/<basename(source)>.torrent`
    pub fn torrent_path(&self) -> PathBuf {
        let name = self
            .source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "release".to_string());
        self.work_dir.join(format!("{}.torrent", name))
    }
}

/// Builds torrent files.
#[async_trait]
pub trait Packager: Send + Sync {
    fn name(&self) -> &str;

    /// Writes the package and returns its path.
    async fn package(&self, request: &PackageRequest<'_>) -> Result<PathBuf, PackagerError>;
}
