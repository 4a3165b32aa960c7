//! Error types for the encoder module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while inspecting or transcoding a release.
#[derive(Debug, Error)]
pub enum EncoderError {
    /// An external tool could not be started.
    #[error("{tool} not found at path: {path}")]
    ToolNotFound { tool: String, path: PathBuf },

    /// The source directory does not exist.
    #[error("Source directory not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// The source directory holds no FLAC files.
    #[error("No FLAC files found in {path}")]
    NoTracks { path: PathBuf },

    /// A track has more than two channels; downmixing is not supported.
    #[error("{path} has {channels} channels, only mono and stereo are supported")]
    Multichannel { path: PathBuf, channels: u32 },

    /// A track needs resampling but its rate is not a 44.1 or 48 kHz multiple.
    #[error("{path} has sample rate {rate} Hz which cannot be resampled")]
    UnknownSampleRate { path: PathBuf, rate: u32 },

    /// Failed to probe a track.
    #[error("Failed to probe {path}: {reason}")]
    ProbeFailed { path: PathBuf, reason: String },

    /// A process in the transcode pipeline failed.
    #[error("Transcode of {path} failed: {reason}")]
    TranscodeFailed {
        path: PathBuf,
        reason: String,
        stderr: Option<String>,
    },

    /// I/O error during transcoding.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EncoderError {
    pub fn probe_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn transcode_failed(
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
        stderr: Option<String>,
    ) -> Self {
        Self::TranscodeFailed {
            path: path.into(),
            reason: reason.into(),
            stderr,
        }
    }

    /// Maps a spawn failure, recognising a missing binary.
    pub(crate) fn spawn_failed(tool: &str, path: &std::path::Path, e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Self::ToolNotFound {
                tool: tool.to_string(),
                path: path.to_path_buf(),
            }
        } else {
            Self::Io(e)
        }
    }
}
