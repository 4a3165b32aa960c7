//! Candidate source implementation.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info, warn};

use crate::release::{Candidate, MediaType};
use crate::tracker::TrackerApi;

use super::reference::{parse_release_reference, read_reference_file};
use super::types::{CandidateBatch, CandidateError, Selection, SelectionMode};

/// Resolves a [`Selection`] into candidates.
pub struct CandidateSource<'a> {
    tracker: &'a dyn TrackerApi,
    media: BTreeSet<MediaType>,
}

impl<'a> CandidateSource<'a> {
    /// Creates a source that discovers through `tracker`, restricted to `media`.
    pub fn new(tracker: &'a dyn TrackerApi, media: BTreeSet<MediaType>) -> Self {
        Self { tracker, media }
    }

    /// Resolves the selection, dropping ids in `skip` for discovery modes.
    pub async fn resolve(
        &self,
        selection: &Selection,
        skip: &BTreeSet<String>,
    ) -> Result<CandidateBatch, CandidateError> {
        match selection {
            Selection::Explicit(references) => Ok(Self::from_references(references)),
            Selection::File(path) => {
                let references = read_reference_file(path).await?;
                info!(
                    "Read {} release references from {}",
                    references.len(),
                    path.display()
                );
                Ok(Self::from_references(&references))
            }
            Selection::Mode(mode) => self.discover(*mode, skip).await,
        }
    }

    /// Explicit references: every lossless media type is eligible.
    fn from_references(references: &[String]) -> CandidateBatch {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for reference in references {
            match parse_release_reference(reference) {
                Ok(candidate) => {
                    if seen.insert(candidate.torrent_id) {
                        candidates.push(candidate);
                    }
                }
                Err(e) => warn!("Skipping reference: {}", e),
            }
        }

        CandidateBatch {
            candidates,
            media_filter: None,
        }
    }

    async fn discover(
        &self,
        mode: SelectionMode,
        skip: &BTreeSet<String>,
    ) -> Result<CandidateBatch, CandidateError> {
        if mode == SelectionMode::None {
            debug!("Candidate mode is 'none', not querying the tracker");
            return Ok(CandidateBatch {
                candidates: Vec::new(),
                media_filter: Some(self.media.clone()),
            });
        }

        info!("Discovering {} candidates via {}", mode, self.tracker.name());
        let listed = self
            .tracker
            .list_candidates(mode, &self.media, skip)
            .await?;
        let total = listed.len();

        let mut seen = HashSet::new();
        let candidates: Vec<Candidate> = listed
            .into_iter()
            .filter(|c| !skip.contains(&c.ledger_id()))
            .filter(|c| seen.insert(c.torrent_id))
            .collect();

        info!(
            "Found {} new candidates ({} listed, {} already processed or duplicate)",
            candidates.len(),
            total,
            total - candidates.len()
        );

        Ok(CandidateBatch {
            candidates,
            media_filter: Some(self.media.clone()),
        })
    }
}
