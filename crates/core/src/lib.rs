pub mod candidate;
pub mod config;
pub mod encoder;
pub mod format;
pub mod gap;
pub mod ledger;
pub mod locator;
pub mod orchestrator;
pub mod packager;
pub mod release;
pub mod tagcheck;
pub mod testing;
pub mod tracker;

pub use candidate::{CandidateBatch, CandidateError, CandidateSource, Selection, SelectionMode};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use encoder::{Encoder, EncoderError, PipelineEncoder};
pub use format::{FormatKey, FormatSpec};
pub use gap::missing_formats;
pub use ledger::{Ledger, LedgerError};
pub use locator::{Confirmer, LocateError, ReleaseLocator, StdinConfirmer};
pub use orchestrator::{OrchestratorConfig, RunReport, TranscodeOrchestrator};
pub use packager::{MktorrentPackager, Packager, PackagerError};
pub use release::{Candidate, MediaType, ReleaseGroup, Torrent};
pub use tagcheck::{FfprobeTagChecker, TagChecker};
pub use tracker::{Credentials, GazelleClient, TrackerApi, TrackerError};
