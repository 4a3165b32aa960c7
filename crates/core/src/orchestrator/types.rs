//! Types for the transcode orchestrator.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::format::FormatKey;
use crate::release::Candidate;

/// Per-format pipeline stage, used to report where a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Encode,
    Package,
    Upload,
    Deliver,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobStage::Encode => "encode",
            JobStage::Package => "package",
            JobStage::Upload => "upload",
            JobStage::Deliver => "deliver",
        })
    }
}

/// A format that could not be produced. Never aborts sibling formats.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{format} failed at {stage}: {message}")]
pub struct JobFailure {
    pub format: FormatKey,
    pub stage: JobStage,
    pub message: String,
}

impl JobFailure {
    pub fn new(format: FormatKey, stage: JobStage, error: impl fmt::Display) -> Self {
        Self {
            format,
            stage,
            message: error.to_string(),
        }
    }
}

/// A format that made it all the way through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOutcome {
    pub format: FormatKey,
    /// Directory holding the encoded release.
    pub transcode_dir: PathBuf,
    /// Package copy in the watch directory.
    pub package: PathBuf,
    pub uploaded: bool,
}

/// Why a candidate was abandoned before its format loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    GroupFetch(String),
    TorrentMissing,
    MediaFiltered(String),
    SourceNotFound,
    Multichannel,
    Unreadable(String),
    TwentyFourBitEdit(String),
    TagValidation(String),
}

impl SkipReason {
    /// Short label for summaries.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::GroupFetch(_) => "group fetch failed",
            SkipReason::TorrentMissing => "torrent missing from group",
            SkipReason::MediaFiltered(_) => "media filtered",
            SkipReason::SourceNotFound => "source not found",
            SkipReason::Multichannel => "multichannel",
            SkipReason::Unreadable(_) => "source unreadable",
            SkipReason::TwentyFourBitEdit(_) => "24-bit edit failed",
            SkipReason::TagValidation(_) => "bad tags",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::GroupFetch(detail)
            | SkipReason::MediaFiltered(detail)
            | SkipReason::Unreadable(detail)
            | SkipReason::TwentyFourBitEdit(detail)
            | SkipReason::TagValidation(detail) => write!(f, "{}: {}", self.label(), detail),
            _ => f.write_str(self.label()),
        }
    }
}

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    /// The format loop ran; the candidate is recorded in the ledger.
    Completed {
        candidate: Candidate,
        produced: Vec<FormatOutcome>,
        failed: Vec<JobFailure>,
    },
    /// Abandoned early; not recorded, so a later run retries it.
    Skipped {
        candidate: Candidate,
        reason: SkipReason,
    },
}

impl CandidateOutcome {
    pub fn candidate(&self) -> Candidate {
        match self {
            CandidateOutcome::Completed { candidate, .. }
            | CandidateOutcome::Skipped { candidate, .. } => *candidate,
        }
    }
}

/// Summary of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: Vec<CandidateOutcome>,
}

impl RunReport {
    pub fn push(&mut self, outcome: CandidateOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn processed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, CandidateOutcome::Completed { .. }))
            .count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = (Candidate, &SkipReason)> {
        self.outcomes.iter().filter_map(|o| match o {
            CandidateOutcome::Skipped { candidate, reason } => Some((*candidate, reason)),
            CandidateOutcome::Completed { .. } => None,
        })
    }

    pub fn formats_produced(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                CandidateOutcome::Completed { produced, .. } => produced.len(),
                CandidateOutcome::Skipped { .. } => 0,
            })
            .sum()
    }

    pub fn formats_failed(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                CandidateOutcome::Completed { failed, .. } => failed.len(),
                CandidateOutcome::Skipped { .. } => 0,
            })
            .sum()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} candidates processed, {} skipped, {} formats produced, {} formats failed",
            self.processed(),
            self.skipped().count(),
            self.formats_produced(),
            self.formats_failed()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_report_counts() {
        let mut report = RunReport::default();
        report.push(CandidateOutcome::Completed {
            candidate: Candidate::new(1, 10),
            produced: vec![FormatOutcome {
                format: FormatKey::Mp3_320,
                transcode_dir: PathBuf::from("/out/a"),
                package: PathBuf::from("/watch/a.torrent"),
                uploaded: true,
            }],
            failed: vec![JobFailure::new(FormatKey::V0, JobStage::Encode, "lame crashed")],
        });
        report.push(CandidateOutcome::Skipped {
            candidate: Candidate::new(2, 20),
            reason: SkipReason::SourceNotFound,
        });

        assert_eq!(report.processed(), 1);
        assert_eq!(report.skipped().count(), 1);
        assert_eq!(report.formats_produced(), 1);
        assert_eq!(report.formats_failed(), 1);
        assert_eq!(
            report.to_string(),
            "1 candidates processed, 1 skipped, 1 formats produced, 1 formats failed"
        );
    }

    #[test]
    fn test_failure_display() {
        let failure = JobFailure::new(FormatKey::V0, JobStage::Upload, "HTTP 500");
        assert_eq!(failure.to_string(), "V0 failed at upload: HTTP 500");
        assert_eq!(
            SkipReason::TagValidation("missing artist".to_string()).to_string(),
            "bad tags: missing artist"
        );
    }
}
