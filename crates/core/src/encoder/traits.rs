//! Trait definitions for the encoder module.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::format::FormatSpec;

use super::error::EncoderError;
use super::types::{SourceInfo, TranscodeRequest};

/// Turns a FLAC release directory into another format.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Returns the name of this encoder implementation.
    fn name(&self) -> &str;

    /// Summarises the audio properties of every FLAC under `source_dir`.
    async fn inspect(&self, source_dir: &Path) -> Result<SourceInfo, EncoderError>;

    /// Transcodes a release and returns the directory holding the result.
    ///
    /// A FLAC target that needs no resampling returns the source directory
    /// itself. On failure nothing created by this call is left behind.
    async fn transcode_release(&self, request: &TranscodeRequest)
        -> Result<PathBuf, EncoderError>;

    /// The command pipeline for one track, one entry per process, for display.
    fn describe_command(
        &self,
        spec: &FormatSpec,
        resample_rate: Option<u32>,
        input: &str,
        output: &str,
    ) -> Vec<String>;
}
