//! Orchestrator configuration.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::{Config, ConfigError, TwentyFourBitBehaviour};
use crate::format::FormatKey;
use crate::gap::normalize_supported;

/// Resolved settings for one run.
///
/// Built once from the loaded [`Config`] plus command line overrides; every
/// per-format directory is resolved up front.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub source_dirs: Vec<PathBuf>,
    /// Formats to produce, in priority order.
    pub supported: Vec<FormatKey>,
    pub output_dirs: HashMap<FormatKey, PathBuf>,
    pub torrent_dirs: HashMap<FormatKey, PathBuf>,
    pub announce_url: String,
    pub source_flag: Option<String>,
    /// Parent for packaging workspaces; the system temp dir when unset.
    pub temp_dir: Option<PathBuf>,
    pub max_workers: usize,
    /// Stop after the first format that completes.
    pub single_format: bool,
    pub upload: bool,
    pub twenty_four_bit: TwentyFourBitBehaviour,
    pub check_twenty_four_bit: bool,
}

impl OrchestratorConfig {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let supported = normalize_supported(&config.formats.supported);

        let mut output_dirs = HashMap::new();
        let mut torrent_dirs = HashMap::new();
        for key in &supported {
            let output = config.output_dir_for(*key).ok_or_else(|| {
                ConfigError::ValidationError(format!("no output directory for {}", key))
            })?;
            let torrents = config.torrent_dir_for(*key).ok_or_else(|| {
                ConfigError::ValidationError(format!("no torrent directory for {}", key))
            })?;
            output_dirs.insert(*key, output);
            torrent_dirs.insert(*key, torrents);
        }

        Ok(Self {
            source_dirs: config.paths.source_dirs.clone(),
            supported,
            output_dirs,
            torrent_dirs,
            announce_url: config.tracker.announce_url.clone(),
            source_flag: config
                .tracker
                .source_flag
                .clone()
                .filter(|f| !f.trim().is_empty()),
            temp_dir: config.paths.temp_dir.clone(),
            max_workers: config.worker_count(),
            single_format: false,
            upload: config.transcode.upload,
            twenty_four_bit: config.transcode.twenty_four_bit,
            check_twenty_four_bit: true,
        })
    }
}
