//! Mock encoder for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::encoder::{describe_pipeline, Encoder, EncoderError, SourceInfo, TranscodeRequest};
use crate::format::{FormatKey, FormatSpec};

/// Mock implementation of the Encoder trait.
///
/// Inspection reports a configurable [`SourceInfo`]. Transcoding creates the
/// target directory with one placeholder file per track instead of running
/// any tools.
#[derive(Debug)]
pub struct MockEncoder {
    source_info: Arc<RwLock<SourceInfo>>,
    inspect_calls: Arc<RwLock<usize>>,
    transcodes: Arc<RwLock<Vec<TranscodeRequest>>>,
    failing: Arc<RwLock<HashSet<FormatKey>>>,
}

impl Default for MockEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEncoder {
    /// A mock reporting a single 16-bit stereo 44.1kHz track.
    pub fn new() -> Self {
        Self {
            source_info: Arc::new(RwLock::new(SourceInfo {
                tracks: 1,
                max_channels: 2,
                max_bit_depth: 16,
                max_sample_rate: 44_100,
            })),
            inspect_calls: Arc::new(RwLock::new(0)),
            transcodes: Arc::new(RwLock::new(Vec::new())),
            failing: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub async fn set_source_info(&self, info: SourceInfo) {
        *self.source_info.write().await = info;
    }

    pub async fn inspect_calls(&self) -> usize {
        *self.inspect_calls.read().await
    }

    /// Every transcode into `format` fails from now on.
    pub async fn fail_format(&self, format: FormatKey) {
        self.failing.write().await.insert(format);
    }

    /// Formats transcoded so far, in call order, including failed attempts.
    pub async fn transcode_calls(&self) -> Vec<FormatKey> {
        self.transcodes
            .read()
            .await
            .iter()
            .map(|r| r.spec.key)
            .collect()
    }
}

#[async_trait]
impl Encoder for MockEncoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn inspect(&self, source_dir: &Path) -> Result<SourceInfo, EncoderError> {
        *self.inspect_calls.write().await += 1;
        if !source_dir.exists() {
            return Err(EncoderError::SourceNotFound {
                path: source_dir.to_path_buf(),
            });
        }
        Ok(*self.source_info.read().await)
    }

    async fn transcode_release(
        &self,
        request: &TranscodeRequest,
    ) -> Result<PathBuf, EncoderError> {
        self.transcodes.write().await.push(request.clone());

        let target = request.output_dir.join(&request.dir_name);
        if self.failing.read().await.contains(&request.spec.key) {
            return Err(EncoderError::transcode_failed(
                &target,
                format!("mock failure for {}", request.spec.name),
                None,
            ));
        }

        let info = *self.source_info.read().await;
        if request.spec.key == FormatKey::Flac && !info.needs_resample() {
            return Ok(request.source_dir.clone());
        }

        tokio::fs::create_dir_all(&target).await?;
        for track in 1..=info.tracks.max(1) {
            let name = format!("{:02}{}", track, request.spec.extension);
            tokio::fs::write(target.join(name), b"audio").await?;
        }
        Ok(target)
    }

    fn describe_command(
        &self,
        spec: &FormatSpec,
        resample_rate: Option<u32>,
        input: &str,
        output: &str,
    ) -> Vec<String> {
        describe_pipeline(spec, resample_rate, input, output)
    }
}
