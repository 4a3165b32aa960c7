//! Types for candidate resolution.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::release::{Candidate, MediaType};
use crate::tracker::TrackerError;

/// Errors that can occur while resolving candidates.
#[derive(Debug, Error)]
pub enum CandidateError {
    /// Unrecognized selection mode string.
    #[error("invalid candidate mode: {0}")]
    InvalidMode(String),

    /// A release reference could not be parsed into group and torrent ids.
    #[error("malformed release reference: {0}")]
    MalformedUrl(String),

    /// The reference file could not be read.
    #[error("failed to read reference file {path}: {source}")]
    ReferenceFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tracker could not enumerate candidates.
    #[error("tracker error: {0}")]
    Tracker(#[from] TrackerError),
}

/// Tracker-side discovery modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Torrents the user has snatched.
    Snatched,
    /// Torrents the user has uploaded.
    Uploaded,
    /// Snatched and uploaded.
    Both,
    /// Torrents the user is seeding that the tracker lists as needing transcodes.
    Seeding,
    /// Everything above.
    All,
    /// No discovery at all.
    None,
}

impl SelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::Snatched => "snatched",
            SelectionMode::Uploaded => "uploaded",
            SelectionMode::Both => "both",
            SelectionMode::Seeding => "seeding",
            SelectionMode::All => "all",
            SelectionMode::None => "none",
        }
    }

    pub fn includes_snatched(&self) -> bool {
        matches!(self, Self::Snatched | Self::Both | Self::All)
    }

    pub fn includes_uploaded(&self) -> bool {
        matches!(self, Self::Uploaded | Self::Both | Self::All)
    }

    pub fn includes_seeding(&self) -> bool {
        matches!(self, Self::Seeding | Self::All)
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionMode {
    type Err = CandidateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snatched" => Ok(Self::Snatched),
            "uploaded" => Ok(Self::Uploaded),
            "both" => Ok(Self::Both),
            "seeding" => Ok(Self::Seeding),
            "all" => Ok(Self::All),
            "none" => Ok(Self::None),
            _ => Err(CandidateError::InvalidMode(s.to_string())),
        }
    }
}

/// How the set of releases to consider is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Release references given on the command line.
    Explicit(Vec<String>),
    /// A file with one release reference per line.
    File(PathBuf),
    /// Ask the tracker.
    Mode(SelectionMode),
}

/// Resolved candidates plus the media filter that still applies to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateBatch {
    pub candidates: Vec<Candidate>,
    /// `None` when every lossless media type is eligible.
    pub media_filter: Option<BTreeSet<MediaType>>,
}

impl CandidateBatch {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether a torrent with this media label passes the filter.
    pub fn accepts_media(&self, media: &str) -> bool {
        match &self.media_filter {
            None => true,
            Some(filter) => MediaType::from_str(media)
                .map(|m| filter.contains(&m))
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("snatched".parse::<SelectionMode>().unwrap(), SelectionMode::Snatched);
        assert_eq!("ALL".parse::<SelectionMode>().unwrap(), SelectionMode::All);
        assert_eq!(" none ".parse::<SelectionMode>().unwrap(), SelectionMode::None);
        assert!(matches!(
            "bogus".parse::<SelectionMode>(),
            Err(CandidateError::InvalidMode(_))
        ));
    }

    #[test]
    fn test_mode_coverage() {
        assert!(SelectionMode::Both.includes_snatched());
        assert!(SelectionMode::Both.includes_uploaded());
        assert!(!SelectionMode::Both.includes_seeding());
        assert!(SelectionMode::All.includes_seeding());
        assert!(!SelectionMode::None.includes_snatched());
    }

    #[test]
    fn test_batch_media_filter() {
        let open = CandidateBatch::default();
        assert!(open.accepts_media("Cassette"));

        let filtered = CandidateBatch {
            candidates: vec![],
            media_filter: Some([MediaType::Cd].into_iter().collect()),
        };
        assert!(filtered.accepts_media("CD"));
        assert!(!filtered.accepts_media("Vinyl"));
        assert!(!filtered.accepts_media("Cassette"));
    }

    #[test]
    fn test_error_display() {
        let err = CandidateError::MalformedUrl("https://example/".to_string());
        assert_eq!(err.to_string(), "malformed release reference: https://example/");
    }
}
