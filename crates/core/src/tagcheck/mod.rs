//! Tag validation for source tracks.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::encoder::{probe_track, EncoderError, TrackInfo};

/// Tags every source track must carry.
pub const REQUIRED_TAGS: [&str; 4] = ["artist", "album", "title", "tracknumber"];

/// Errors that prevent a tag check from running at all.
#[derive(Debug, Error)]
pub enum TagCheckError {
    #[error("Failed to read tags from {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

/// Result of checking one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCheck {
    pub ok: bool,
    pub message: String,
}

impl TagCheck {
    pub fn pass() -> Self {
        Self {
            ok: true,
            message: String::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Validates the tags of an audio file.
#[async_trait]
pub trait TagChecker: Send + Sync {
    /// With `relax_track_number`, forms like `3/12` or `A1` are accepted.
    async fn validate(
        &self,
        path: &Path,
        relax_track_number: bool,
    ) -> Result<TagCheck, TagCheckError>;
}

/// Checks the tags of an already probed track.
pub fn check_track_tags(track: &TrackInfo, relax_track_number: bool) -> TagCheck {
    let missing: Vec<&str> = REQUIRED_TAGS
        .iter()
        .copied()
        .filter(|tag| track.tag(tag).is_none())
        .collect();

    if !missing.is_empty() {
        return TagCheck::fail(format!(
            "{} is missing tags: {}",
            track.path.display(),
            missing.join(", ")
        ));
    }

    if !relax_track_number {
        let number = track.tag("tracknumber").unwrap_or_default();
        let plain = number.parse::<u32>().is_ok_and(|n| n > 0);
        if !plain {
            return TagCheck::fail(format!(
                "{} has a non-numeric track number '{}'",
                track.path.display(),
                number
            ));
        }
    }

    TagCheck::pass()
}

/// Tag checker reading tags through ffprobe.
pub struct FfprobeTagChecker {
    ffprobe: PathBuf,
}

impl FfprobeTagChecker {
    pub fn new(ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }
}

#[async_trait]
impl TagChecker for FfprobeTagChecker {
    async fn validate(
        &self,
        path: &Path,
        relax_track_number: bool,
    ) -> Result<TagCheck, TagCheckError> {
        let track = probe_track(&self.ffprobe, path)
            .await
            .map_err(|e: EncoderError| TagCheckError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(check_track_tags(&track, relax_track_number))
    }
}
