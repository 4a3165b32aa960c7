//! Process-pipeline encoder.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use tokio::process::{Child, Command};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::ToolsConfig;
use crate::format::{EncoderKind, FormatSpec};

use super::commands::{describe_pipeline, pipeline_commands, resample_target, shell_join};
use super::error::EncoderError;
use super::files::{find_files, AUXILIARY_EXTENSIONS};
use super::probe::probe_track;
use super::traits::Encoder;
use super::types::{SourceInfo, TrackInfo, TranscodeRequest};

static UNSAFE_FILE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\?<>\\*\|"]"#).expect("valid regex"));

/// Encoder that pipes `flac`/`sox` decoders into `lame`/`flac` encoders.
pub struct PipelineEncoder {
    tools: ToolsConfig,
}

impl PipelineEncoder {
    pub fn new(tools: ToolsConfig) -> Self {
        Self { tools }
    }

    /// Probes every FLAC under `source_dir`.
    async fn inspect_tracks(&self, source_dir: &Path) -> Result<Vec<TrackInfo>, EncoderError> {
        if !source_dir.is_dir() {
            return Err(EncoderError::SourceNotFound {
                path: source_dir.to_path_buf(),
            });
        }

        let files = find_files(source_dir, &["flac"]).await?;
        if files.is_empty() {
            return Err(EncoderError::NoTracks {
                path: source_dir.to_path_buf(),
            });
        }

        let mut tracks = Vec::with_capacity(files.len());
        for file in files {
            tracks.push(probe_track(&self.tools.ffprobe, &file).await?);
        }
        Ok(tracks)
    }

    /// Rejects tracks the pipeline cannot handle before anything is written.
    fn check_tracks(tracks: &[TrackInfo]) -> Result<(), EncoderError> {
        for track in tracks {
            if track.channels > 2 {
                return Err(EncoderError::Multichannel {
                    path: track.path.clone(),
                    channels: track.channels,
                });
            }
            if track.needs_resample() && resample_target(track.sample_rate).is_none() {
                return Err(EncoderError::UnknownSampleRate {
                    path: track.path.clone(),
                    rate: track.sample_rate,
                });
            }
        }
        Ok(())
    }

    /// Output path for a track, mirroring its position under the source.
    fn output_path(
        source_dir: &Path,
        transcode_dir: &Path,
        track: &Path,
        spec: &FormatSpec,
    ) -> PathBuf {
        let relative_dir = track
            .parent()
            .and_then(|p| p.strip_prefix(source_dir).ok())
            .unwrap_or_else(|| Path::new(""));

        let stem = track
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        let name = format!("{}{}", UNSAFE_FILE_CHARS.replace_all(&stem, "_"), spec.extension);

        transcode_dir.join(relative_dir).join(name)
    }

    /// Whether every track already has its encoded counterpart in `dir`.
    fn is_complete(request: &TranscodeRequest, tracks: &[TrackInfo], dir: &Path) -> bool {
        tracks.iter().all(|track| {
            Self::output_path(&request.source_dir, dir, &track.path, request.spec).is_file()
        })
    }

    async fn transcode_track(
        &self,
        track: &TrackInfo,
        output: &Path,
        spec: &FormatSpec,
    ) -> Result<(), EncoderError> {
        let resample_rate = if track.needs_resample() {
            resample_target(track.sample_rate)
        } else {
            None
        };

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let commands = pipeline_commands(
            &self.tools,
            spec,
            resample_rate,
            &track.path,
            output,
            &track.tags,
        );
        debug!(
            "Running {}",
            commands
                .iter()
                .map(|c| shell_join(c))
                .collect::<Vec<_>>()
                .join(" | ")
        );

        run_pipeline(&track.path, &commands).await
    }

    async fn copy_auxiliary_files(
        source_dir: &Path,
        transcode_dir: &Path,
    ) -> Result<(), EncoderError> {
        for file in find_files(source_dir, &AUXILIARY_EXTENSIONS).await? {
            let Ok(relative) = file.strip_prefix(source_dir) else {
                continue;
            };
            let target = transcode_dir.join(relative);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(&file, &target).await?;
            debug!("Copied {}", relative.display());
        }
        Ok(())
    }

    async fn encode_into(
        &self,
        request: &TranscodeRequest,
        tracks: &[TrackInfo],
        transcode_dir: &Path,
    ) -> Result<(), EncoderError> {
        let semaphore = Arc::new(Semaphore::new(request.max_workers.max(1)));

        let jobs = tracks.iter().map(|track| {
            let semaphore = Arc::clone(&semaphore);
            let output = Self::output_path(&request.source_dir, transcode_dir, &track.path, request.spec);
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| EncoderError::transcode_failed(&track.path, e.to_string(), None))?;
                self.transcode_track(track, &output, request.spec).await?;
                info!("Processed {}", track.path.display());
                Ok::<(), EncoderError>(())
            }
        });

        // Every job runs to completion before the first error is reported.
        join_all(jobs).await.into_iter().collect::<Result<Vec<_>, _>>()?;

        Self::copy_auxiliary_files(&request.source_dir, transcode_dir).await
    }
}

/// Spawns the commands as one pipeline and checks every exit status.
async fn run_pipeline(track: &Path, commands: &[Vec<String>]) -> Result<(), EncoderError> {
    let mut children: Vec<(String, Child)> = Vec::with_capacity(commands.len());
    let mut upstream: Option<Stdio> = None;

    for (index, argv) in commands.iter().enumerate() {
        let Some((program, args)) = argv.split_first() else {
            continue;
        };
        let is_last = index + 1 == commands.len();

        let mut child = Command::new(program)
            .args(args)
            .stdin(upstream.take().unwrap_or_else(Stdio::null))
            .stdout(if is_last { Stdio::null() } else { Stdio::piped() })
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EncoderError::spawn_failed(program, Path::new(program), e))?;

        if !is_last {
            let stdout = child.stdout.take().ok_or_else(|| {
                EncoderError::transcode_failed(track, "pipe to next process unavailable", None)
            })?;
            upstream = Some(stdout.try_into()?);
        }
        children.push((program.clone(), child));
    }

    let outputs = join_all(
        children
            .into_iter()
            .map(|(program, child)| async move { (program, child.wait_with_output().await) }),
    )
    .await;

    // The earliest failing process is usually the cause. A broken pipe only
    // means a later process exited first.
    let mut broken_pipe = None;
    for (program, output) in outputs {
        let output = output?;
        if output.status.success() {
            continue;
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if is_broken_pipe(output.status) {
            broken_pipe.get_or_insert(program);
            continue;
        }
        return Err(EncoderError::transcode_failed(
            track,
            format!("{} exited with {:?}", program, output.status.code()),
            (!stderr.is_empty()).then_some(stderr),
        ));
    }

    match broken_pipe {
        Some(program) => Err(EncoderError::transcode_failed(
            track,
            format!("{} received SIGPIPE", program),
            None,
        )),
        None => Ok(()),
    }
}

#[cfg(unix)]
fn is_broken_pipe(status: ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal() == Some(13)
}

#[cfg(not(unix))]
fn is_broken_pipe(_status: ExitStatus) -> bool {
    false
}

#[async_trait]
impl Encoder for PipelineEncoder {
    fn name(&self) -> &str {
        "pipeline"
    }

    async fn inspect(&self, source_dir: &Path) -> Result<SourceInfo, EncoderError> {
        let tracks = self.inspect_tracks(source_dir).await?;
        Ok(SourceInfo::from_tracks(&tracks))
    }

    async fn transcode_release(
        &self,
        request: &TranscodeRequest,
    ) -> Result<PathBuf, EncoderError> {
        let tracks = self.inspect_tracks(&request.source_dir).await?;
        Self::check_tracks(&tracks)?;

        let info = SourceInfo::from_tracks(&tracks);
        if request.spec.encoder == EncoderKind::Flac && !info.needs_resample() {
            info!(
                "{} source needs no encode, using {}",
                request.spec,
                request.source_dir.display()
            );
            return Ok(request.source_dir.clone());
        }

        let transcode_dir = request.output_dir.join(&request.dir_name);
        if transcode_dir.exists() {
            if Self::is_complete(request, &tracks, &transcode_dir) {
                warn!(
                    "Transcode directory {} already exists, reusing it",
                    transcode_dir.display()
                );
                return Ok(transcode_dir);
            }
            warn!(
                "Transcode directory {} is incomplete, encoding again",
                transcode_dir.display()
            );
            tokio::fs::remove_dir_all(&transcode_dir).await?;
        }

        // Tracks land in a hidden staging directory that is renamed into
        // place only once every track is encoded.
        tokio::fs::create_dir_all(&request.output_dir).await?;
        let staging = tempfile::Builder::new()
            .prefix(".partial-")
            .tempdir_in(&request.output_dir)?;
        info!(
            "Transcoding {} tracks to {} in {}",
            tracks.len(),
            request.spec,
            transcode_dir.display()
        );

        self.encode_into(request, &tracks, staging.path()).await?;
        tokio::fs::rename(staging.path(), &transcode_dir).await?;
        Ok(transcode_dir)
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
