//! Transcode orchestrator implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, error, info, warn};

use crate::candidate::CandidateBatch;
use crate::encoder::{find_files, resample_target, Encoder, SourceInfo, TranscodeRequest};
use crate::format::{FormatKey, FormatSpec};
use crate::gap::missing_formats;
use crate::ledger::Ledger;
use crate::locator::{Confirmer, LocateError, ReleaseLocator};
use crate::packager::{PackageRequest, Packager};
use crate::release::{transcode_dir_name, Candidate, ReleaseGroup, Torrent};
use crate::tagcheck::TagChecker;
use crate::tracker::{TrackerApi, UploadRequest};

use super::config::OrchestratorConfig;
use super::types::{CandidateOutcome, FormatOutcome, JobFailure, JobStage, RunReport, SkipReason};

const ATTRIBUTION: &str = concat!("Made with morebetter ", env!("CARGO_PKG_VERSION"));

/// Drives candidates through locate, validate and the per-format jobs.
pub struct TranscodeOrchestrator {
    config: OrchestratorConfig,
    tracker: Arc<dyn TrackerApi>,
    encoder: Arc<dyn Encoder>,
    packager: Arc<dyn Packager>,
    tag_checker: Arc<dyn TagChecker>,
    confirmer: Arc<dyn Confirmer>,
}

impl TranscodeOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        tracker: Arc<dyn TrackerApi>,
        encoder: Arc<dyn Encoder>,
        packager: Arc<dyn Packager>,
        tag_checker: Arc<dyn TagChecker>,
        confirmer: Arc<dyn Confirmer>,
    ) -> Self {
        Self {
            config,
            tracker,
            encoder,
            packager,
            tag_checker,
            confirmer,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Processes every candidate in order, recording each completed one in
    /// `ledger` before moving on.
    pub async fn run(&self, batch: &CandidateBatch, ledger: &mut Ledger) -> RunReport {
        let mut report = RunReport::default();
        let total = batch.len();

        for (index, candidate) in batch.candidates.iter().enumerate() {
            info!("[{}/{}] Processing {}", index + 1, total, candidate);

            let outcome = self.process_candidate(*candidate, batch).await;
            match &outcome {
                CandidateOutcome::Completed { .. } => {
                    ledger.record(candidate.ledger_id()).await;
                }
                CandidateOutcome::Skipped { reason, .. } => {
                    warn!("Skipping {}: {}", candidate, reason);
                }
            }
            report.push(outcome);
        }

        info!("Run finished: {}", report);
        for (candidate, reason) in report.skipped() {
            debug!("  skipped {} ({})", candidate, reason.label());
        }
        report
    }

    /// Runs one candidate. Only early abandonment yields `Skipped`.
    pub async fn process_candidate(
        &self,
        candidate: Candidate,
        batch: &CandidateBatch,
    ) -> CandidateOutcome {
        let skipped = |reason: SkipReason| CandidateOutcome::Skipped { candidate, reason };

        let (mut group, mut torrent) = match self.fetch_release(candidate).await {
            Ok(found) => found,
            Err(reason) => return skipped(reason),
        };

        if !batch.accepts_media(&torrent.media) {
            return skipped(SkipReason::MediaFiltered(torrent.media.clone()));
        }

        let locator = ReleaseLocator::new(
            &self.config.source_dirs,
            self.encoder.as_ref(),
            self.tracker.as_ref(),
            self.confirmer.as_ref(),
        )
        .with_twenty_four_bit(
            self.config.twenty_four_bit,
            self.config.check_twenty_four_bit,
        );

        let source = match locator.locate(&group, &torrent).await {
            Ok(source) => source,
            Err(e) => return skipped(Self::locate_skip_reason(e)),
        };

        if source.relabelled {
            info!("Re-fetching group {} after relabel", candidate.group_id);
            match self.fetch_release(candidate).await {
                Ok(found) => (group, torrent) = found,
                Err(reason) => return skipped(reason),
            }
        }

        if !source.path.is_dir() {
            return skipped(SkipReason::SourceNotFound);
        }

        if let Err(message) = self.validate_tags(&source.path).await {
            return skipped(SkipReason::TagValidation(message));
        }

        let needed = missing_formats(&group, &torrent, &self.config.supported);
        if needed.is_empty() {
            info!("Nothing to do for {}", candidate);
        } else {
            info!(
                "Formats needed for {}: {}",
                candidate,
                needed.iter().map(|s| s.name).collect::<Vec<_>>().join(", ")
            );
        }

        let passkey = if needed.is_empty() {
            String::new()
        } else {
            match self.tracker.passkey().await {
                Ok(passkey) => passkey,
                Err(e) => {
                    let failed = needed
                        .iter()
                        .map(|spec| JobFailure::new(spec.key, JobStage::Package, &e))
                        .collect();
                    error!("No passkey for {}: {}", candidate, e);
                    return CandidateOutcome::Completed {
                        candidate,
                        produced: Vec::new(),
                        failed,
                    };
                }
            }
        };

        let mut produced = Vec::new();
        let mut failed = Vec::new();
        for spec in needed {
            match self
                .produce_format(&group, &torrent, &source.path, &source.info, spec, &passkey)
                .await
            {
                Ok(outcome) => {
                    info!("{} done for {}", spec.name, candidate);
                    produced.push(outcome);
                    if self.config.single_format {
                        debug!("Single format mode, stopping after {}", spec.name);
                        break;
                    }
                }
                Err(failure) => {
                    error!("{} for {}", failure, candidate);
                    failed.push(failure);
                }
            }
        }

        CandidateOutcome::Completed {
            candidate,
            produced,
            failed,
        }
    }

    async fn fetch_release(
        &self,
        candidate: Candidate,
    ) -> Result<(ReleaseGroup, Torrent), SkipReason> {
        let group = self
            .tracker
            .fetch_group(candidate.group_id)
            .await
            .map_err(|e| SkipReason::GroupFetch(e.to_string()))?;
        let torrent = group
            .torrent(candidate.torrent_id)
            .cloned()
            .ok_or(SkipReason::TorrentMissing)?;
        Ok((group, torrent))
    }

    fn locate_skip_reason(error: LocateError) -> SkipReason {
        match error {
            LocateError::SourceNotFound { .. } => SkipReason::SourceNotFound,
            LocateError::Multichannel { .. } => SkipReason::Multichannel,
            LocateError::TwentyFourBitEdit { .. } => SkipReason::TwentyFourBitEdit(error.to_string()),
            LocateError::Inspect(_) | LocateError::Io(_) => SkipReason::Unreadable(error.to_string()),
        }
    }

    /// Checks every source FLAC, returning the first problem found.
    async fn validate_tags(&self, source: &Path) -> Result<(), String> {
        let files = find_files(source, &["flac"])
            .await
            .map_err(|e| format!("cannot list {}: {}", source.display(), e))?;

        for file in files {
            let check = self
                .tag_checker
                .validate(&file, true)
                .await
                .map_err(|e| e.to_string())?;
            if !check.ok {
                return Err(check.message);
            }
        }
        Ok(())
    }

    /// Encode, package, upload and deliver one format.
    async fn produce_format(
        &self,
        group: &ReleaseGroup,
        torrent: &Torrent,
        source: &Path,
        info: &SourceInfo,
        spec: &'static FormatSpec,
        passkey: &str,
    ) -> Result<FormatOutcome, JobFailure> {
        let key = spec.key;

        let output_dir = self.config.output_dirs.get(&key).ok_or_else(|| {
            JobFailure::new(key, JobStage::Encode, "no output directory configured")
        })?;

        let transcode_dir = self
            .encoder
            .transcode_release(&TranscodeRequest {
                source_dir: source.to_path_buf(),
                output_dir: output_dir.clone(),
                spec,
                dir_name: transcode_dir_name(group, torrent, spec),
                max_workers: self.config.max_workers,
            })
            .await
            .map_err(|e| JobFailure::new(key, JobStage::Encode, e))?;

        // Removed on every exit path when dropped.
        let workspace = match &self.config.temp_dir {
            Some(dir) => TempDir::new_in(dir),
            None => TempDir::new(),
        }
        .map_err(|e| JobFailure::new(key, JobStage::Package, e))?;

        let package = self
            .packager
            .package(&PackageRequest {
                source: &transcode_dir,
                work_dir: workspace.path(),
                announce: &self.config.announce_url,
                passkey,
                source_flag: self.config.source_flag.as_deref(),
            })
            .await
            .map_err(|e| JobFailure::new(key, JobStage::Package, e))?;

        if self.config.upload {
            self.tracker
                .upload(&UploadRequest {
                    group_id: group.id,
                    source: torrent.clone(),
                    package: package.clone(),
                    format: spec,
                    description: self.description(torrent, info, spec),
                })
                .await
                .map_err(|e| JobFailure::new(key, JobStage::Upload, e))?;
        } else {
            debug!("Uploads disabled, not uploading {}", package.display());
        }

        let delivered = self
            .deliver(key, &package)
            .await
            .map_err(|e| JobFailure::new(key, JobStage::Deliver, e))?;

        Ok(FormatOutcome {
            format: key,
            transcode_dir,
            package: delivered,
            uploaded: self.config.upload,
        })
    }

    /// Copies the package into the format's watch directory.
    async fn deliver(&self, key: FormatKey, package: &Path) -> std::io::Result<PathBuf> {
        let watch_dir = self.config.torrent_dirs.get(&key).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no torrent directory for {}", key),
            )
        })?;
        tokio::fs::create_dir_all(watch_dir).await?;

        let name = package.file_name().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "package has no file name")
        })?;
        let target = watch_dir.join(name);
        tokio::fs::copy(package, &target).await?;
        debug!("Copied package to {}", target.display());
        Ok(target)
    }

    /// Upload description: source permalink, encode pipeline and attribution.
    fn description(&self, torrent: &Torrent, info: &SourceInfo, spec: &FormatSpec) -> Vec<String> {
        let resample_rate = if info.needs_resample() {
            resample_target(info.max_sample_rate)
        } else {
            None
        };
        let commands = self.encoder.describe_command(
            spec,
            resample_rate,
            "input.flac",
            &format!("output{}", spec.extension),
        );

        vec![
            format!(
                "Transcode of [url]{}[/url]",
                self.tracker.permalink(torrent)
            ),
            String::new(),
            format!("Transcode process: [code]{}[/code]", commands.join(" | ")),
            String::new(),
            ATTRIBUTION.to_string(),
        ]
    }
}
