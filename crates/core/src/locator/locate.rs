//! Locating and vetting a release's source files.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::TwentyFourBitBehaviour;
use crate::encoder::{Encoder, EncoderError, SourceInfo};
use crate::release::{flat_source_dir_name, ReleaseGroup, Torrent};
use crate::tracker::{TrackerApi, TrackerError};

use super::confirm::Confirmer;

/// Errors that abandon a candidate before any format is attempted.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("no local copy of torrent {torrent_id} under any source directory")]
    SourceNotFound { torrent_id: u64 },

    #[error("{path} is multichannel ({channels} channels), not transcoding")]
    Multichannel { path: PathBuf, channels: u32 },

    #[error("failed to relabel torrent {torrent_id} as 24-bit: {source}")]
    TwentyFourBitEdit {
        torrent_id: u64,
        #[source]
        source: TrackerError,
    },

    #[error("failed to inspect source: {0}")]
    Inspect(#[from] EncoderError),

    #[error("I/O error preparing source: {0}")]
    Io(#[from] std::io::Error),
}

/// A release found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedSource {
    /// Directory holding the FLAC files.
    pub path: PathBuf,
    pub info: SourceInfo,
    /// The torrent was relabelled `24bit Lossless` on the tracker, so the
    /// caller should re-fetch its group.
    pub relabelled: bool,
}

/// Resolves torrents to directories under the configured source roots.
pub struct ReleaseLocator<'a> {
    source_dirs: &'a [PathBuf],
    encoder: &'a dyn Encoder,
    tracker: &'a dyn TrackerApi,
    confirmer: &'a dyn Confirmer,
    twenty_four_bit: TwentyFourBitBehaviour,
    check_twenty_four_bit: bool,
}

impl<'a> ReleaseLocator<'a> {
    pub fn new(
        source_dirs: &'a [PathBuf],
        encoder: &'a dyn Encoder,
        tracker: &'a dyn TrackerApi,
        confirmer: &'a dyn Confirmer,
    ) -> Self {
        Self {
            source_dirs,
            encoder,
            tracker,
            confirmer,
            twenty_four_bit: TwentyFourBitBehaviour::default(),
            check_twenty_four_bit: true,
        }
    }

    pub fn with_twenty_four_bit(mut self, behaviour: TwentyFourBitBehaviour, check: bool) -> Self {
        self.twenty_four_bit = behaviour;
        self.check_twenty_four_bit = check;
        self
    }

    /// Finds, inspects and vets the source of `torrent`.
    pub async fn locate(
        &self,
        group: &ReleaseGroup,
        torrent: &Torrent,
    ) -> Result<LocatedSource, LocateError> {
        let path = self
            .find_source(group, torrent)
            .await?
            .ok_or(LocateError::SourceNotFound {
                torrent_id: torrent.id,
            })?;
        debug!("Source for torrent {} is {}", torrent.id, path.display());

        let info = self.encoder.inspect(&path).await?;
        if info.is_multichannel() {
            return Err(LocateError::Multichannel {
                path,
                channels: info.max_channels,
            });
        }

        let relabelled = self.check_bit_depth(torrent, &path, &info).await?;

        Ok(LocatedSource {
            path,
            info,
            relabelled,
        })
    }

    async fn find_source(
        &self,
        group: &ReleaseGroup,
        torrent: &Torrent,
    ) -> Result<Option<PathBuf>, LocateError> {
        if let Some(relative) = torrent.explicit_path() {
            return Ok(self
                .source_dirs
                .iter()
                .map(|root| root.join(relative))
                .find(|candidate| candidate.exists()));
        }

        // Single-file torrent: the file sits directly in a source root.
        let Some(file_name) = torrent.listed_files().into_iter().next() else {
            return Ok(None);
        };

        for root in self.source_dirs {
            let file = root.join(&file_name);
            if file.is_file() {
                return self.wrap_flat_file(group, root, &file).await.map(Some);
            }
        }
        Ok(None)
    }

    /// Copies a lone file into its own directory so it can be treated like
    /// any other release.
    async fn wrap_flat_file(
        &self,
        group: &ReleaseGroup,
        root: &Path,
        file: &Path,
    ) -> Result<PathBuf, LocateError> {
        let dir = root.join(flat_source_dir_name(group));
        tokio::fs::create_dir_all(&dir).await?;

        let Some(name) = file.file_name() else {
            return Err(LocateError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} has no file name", file.display()),
            )));
        };
        let target = dir.join(name);
        if !target.exists() {
            tokio::fs::copy(file, &target).await?;
            info!("Copied flat release {} into {}", file.display(), dir.display());
        }
        Ok(dir)
    }

    /// Applies the configured behaviour when a `Lossless` torrent is 24-bit.
    async fn check_bit_depth(
        &self,
        torrent: &Torrent,
        path: &Path,
        info: &SourceInfo,
    ) -> Result<bool, LocateError> {
        let mislabelled = self.check_twenty_four_bit
            && torrent.encoding.trim().eq_ignore_ascii_case("Lossless")
            && info.is_24bit();
        if !mislabelled {
            return Ok(false);
        }

        warn!(
            "Torrent {} is labelled Lossless but {} is {}-bit",
            torrent.id,
            path.display(),
            info.max_bit_depth
        );

        let correct = match self.twenty_four_bit {
            TwentyFourBitBehaviour::Ignore => false,
            TwentyFourBitBehaviour::AutoCorrect => true,
            TwentyFourBitBehaviour::Confirm => {
                self.confirmer
                    .confirm(&format!(
                        "Relabel torrent {} ({}) as 24bit Lossless?",
                        torrent.id,
                        path.display()
                    ))
                    .await
            }
        };
        if !correct {
            return Ok(false);
        }

        self.tracker
            .mark_twenty_four_bit(torrent)
            .await
            .map_err(|source| LocateError::TwentyFourBitEdit {
                torrent_id: torrent.id,
                source,
            })?;
        Ok(true)
    }
}
