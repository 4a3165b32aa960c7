use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::str::FromStr;

use crate::candidate::SelectionMode;
use crate::format::FormatKey;
use crate::release::MediaType;

use super::ConfigError;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub paths: PathsConfig,
    #[serde(default)]
    pub formats: FormatsConfig,
    #[serde(default)]
    pub candidates: CandidatesConfig,
    #[serde(default)]
    pub transcode: TranscodeConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Candidate mode as configured.
    pub fn selection_mode(&self) -> Result<SelectionMode, ConfigError> {
        SelectionMode::from_str(&self.candidates.mode)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Media types eligible for discovered candidates.
    pub fn media_filter(&self) -> Result<BTreeSet<MediaType>, ConfigError> {
        if self.candidates.media.is_empty() {
            return Ok(MediaType::all());
        }
        self.candidates
            .media
            .iter()
            .map(|m| MediaType::from_str(m).map_err(ConfigError::ValidationError))
            .collect()
    }

    /// Directory transcodes of `key` are written into.
    ///
    /// Per-format override, then the default output dir, then the first source root.
    pub fn output_dir_for(&self, key: FormatKey) -> Option<PathBuf> {
        self.formats
            .overrides
            .get(&key)
            .and_then(|o| o.output_dir.clone())
            .or_else(|| self.paths.output_dir.clone())
            .or_else(|| self.paths.source_dirs.first().cloned())
    }

    /// Watch directory packaged torrents of `key` are copied into.
    pub fn torrent_dir_for(&self, key: FormatKey) -> Option<PathBuf> {
        self.formats
            .overrides
            .get(&key)
            .and_then(|o| o.torrent_dir.clone())
            .or_else(|| self.paths.torrent_dir.clone())
            .or_else(|| self.paths.source_dirs.first().cloned())
    }

    /// Per-track encode workers: configured value, else cores minus one.
    pub fn worker_count(&self) -> usize {
        self.transcode
            .max_workers
            .unwrap_or_else(|| num_cpus::get().saturating_sub(1))
            .max(1)
    }
}

/// Tracker account and endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub username: String,
    pub password: String,
    /// Announce prefix; the passkey and `/announce` are appended.
    pub announce_url: String,
    /// Source flag embedded into packaged torrents (e.g. "OPS").
    #[serde(default)]
    pub source_flag: Option<String>,
    /// Minimum spacing between tracker requests.
    #[serde(default = "default_request_interval")]
    pub request_interval_ms: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://orpheus.network/".to_string()
}

fn default_request_interval() -> u64 {
    2000
}

fn default_timeout() -> u64 {
    30
}

/// Filesystem locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Roots searched in order for release sources.
    pub source_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub torrent_dir: Option<PathBuf>,
    #[serde(default = "default_ledger_path")]
    pub ledger: PathBuf,
    /// Parent for per-job packaging workspaces; system temp dir when unset.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("morebetter-ledger.json")
}

/// Per-format directory overrides
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct FormatOverride {
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub torrent_dir: Option<PathBuf>,
}

/// Output formats
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormatsConfig {
    /// Desired formats in priority order.
    #[serde(default = "default_supported")]
    pub supported: Vec<String>,
    #[serde(default)]
    pub overrides: HashMap<FormatKey, FormatOverride>,
}

impl Default for FormatsConfig {
    fn default() -> Self {
        Self {
            supported: default_supported(),
            overrides: HashMap::new(),
        }
    }
}

fn default_supported() -> Vec<String> {
    vec!["flac".to_string(), "v0".to_string(), "320".to_string()]
}

/// Candidate discovery
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CandidatesConfig {
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Eligible media; empty means every lossless media type.
    #[serde(default)]
    pub media: Vec<String>,
}

impl Default for CandidatesConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            media: Vec::new(),
        }
    }
}

fn default_mode() -> String {
    "snatched".to_string()
}

/// What to do when a release labelled "Lossless" turns out to be 24-bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TwentyFourBitBehaviour {
    /// Log and carry on.
    #[default]
    Ignore,
    /// Ask before relabelling.
    Confirm,
    /// Relabel without asking.
    AutoCorrect,
}

/// Transcode behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    #[serde(default)]
    pub max_workers: Option<usize>,
    #[serde(default)]
    pub twenty_four_bit: TwentyFourBitBehaviour,
    #[serde(default = "default_upload")]
    pub upload: bool,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            twenty_four_bit: TwentyFourBitBehaviour::default(),
            upload: default_upload(),
        }
    }
}

fn default_upload() -> bool {
    true
}

/// External binaries
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default = "default_flac")]
    pub flac: PathBuf,
    #[serde(default = "default_sox")]
    pub sox: PathBuf,
    #[serde(default = "default_lame")]
    pub lame: PathBuf,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: PathBuf,
    #[serde(default = "default_mktorrent")]
    pub mktorrent: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            flac: default_flac(),
            sox: default_sox(),
            lame: default_lame(),
            ffprobe: default_ffprobe(),
            mktorrent: default_mktorrent(),
        }
    }
}

fn default_flac() -> PathBuf {
    PathBuf::from("flac")
}

fn default_sox() -> PathBuf {
    PathBuf::from("sox")
}

fn default_lame() -> PathBuf {
    PathBuf::from("lame")
}

fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_mktorrent() -> PathBuf {
    PathBuf::from("mktorrent")
}

/// Config with secrets redacted, safe to log
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub endpoint: String,
    pub username: String,
    pub password_configured: bool,
    pub source_flag: Option<String>,
    pub paths: PathsConfig,
    pub formats: FormatsConfig,
    pub candidates: CandidatesConfig,
    pub transcode: TranscodeConfig,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            endpoint: config.tracker.endpoint.clone(),
            username: config.tracker.username.clone(),
            password_configured: !config.tracker.password.is_empty(),
            source_flag: config.tracker.source_flag.clone(),
            paths: config.paths.clone(),
            formats: config.formats.clone(),
            candidates: config.candidates.clone(),
            transcode: config.transcode.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[tracker]
username = "user"
password = "hunter2"
announce_url = "https://home.opsfet.ch/"

[paths]
source_dirs = ["/music/flac", "/music/more"]
"#;

    #[test]
    fn test_deserialize_minimal_uses_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.tracker.endpoint, "https://orpheus.network/");
        assert_eq!(config.tracker.request_interval_ms, 2000);
        assert_eq!(config.formats.supported, vec!["flac", "v0", "320"]);
        assert_eq!(config.candidates.mode, "snatched");
        assert!(config.candidates.media.is_empty());
        assert!(config.transcode.upload);
        assert_eq!(
            config.transcode.twenty_four_bit,
            TwentyFourBitBehaviour::Ignore
        );
        assert_eq!(config.paths.ledger, PathBuf::from("morebetter-ledger.json"));
        assert_eq!(config.tools.mktorrent, PathBuf::from("mktorrent"));
    }

    #[test]
    fn test_deserialize_missing_tracker_fails() {
        let toml = r#"
[paths]
source_dirs = ["/music"]
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_format_overrides_take_precedence() {
        let toml = format!(
            "{}{}",
            MINIMAL,
            r#"
output_dir = "/out"
torrent_dir = "/watch"

[formats.overrides.V0]
output_dir = "/out/v0"

[formats.overrides.320]
torrent_dir = "/watch/320"
"#
        );
        let config: Config = toml::from_str(&toml).unwrap();

        assert_eq!(
            config.output_dir_for(FormatKey::V0),
            Some(PathBuf::from("/out/v0"))
        );
        assert_eq!(
            config.torrent_dir_for(FormatKey::V0),
            Some(PathBuf::from("/watch"))
        );
        assert_eq!(
            config.output_dir_for(FormatKey::Mp3_320),
            Some(PathBuf::from("/out"))
        );
        assert_eq!(
            config.torrent_dir_for(FormatKey::Mp3_320),
            Some(PathBuf::from("/watch/320"))
        );
    }

    #[test]
    fn test_dirs_fall_back_to_first_source_root() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(
            config.output_dir_for(FormatKey::Flac),
            Some(PathBuf::from("/music/flac"))
        );
        assert_eq!(
            config.torrent_dir_for(FormatKey::Flac),
            Some(PathBuf::from("/music/flac"))
        );
    }

    #[test]
    fn test_twenty_four_bit_behaviour_names() {
        let toml = format!("{}\n[transcode]\ntwenty_four_bit = \"auto_correct\"\n", MINIMAL);
        let config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(
            config.transcode.twenty_four_bit,
            TwentyFourBitBehaviour::AutoCorrect
        );
    }

    #[test]
    fn test_worker_count_is_at_least_one() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.transcode.max_workers = Some(0);
        assert_eq!(config.worker_count(), 1);
        config.transcode.max_workers = Some(6);
        assert_eq!(config.worker_count(), 6);
        config.transcode.max_workers = None;
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_media_filter() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.media_filter().unwrap(), MediaType::all());

        config.candidates.media = vec!["cd".to_string(), "WEB".to_string()];
        let media = config.media_filter().unwrap();
        assert_eq!(media.len(), 2);
        assert!(media.contains(&MediaType::Web));

        config.candidates.media = vec!["cassette".to_string()];
        assert!(config.media_filter().is_err());
    }

    #[test]
    fn test_sanitized_config_hides_password() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.password_configured);
        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
