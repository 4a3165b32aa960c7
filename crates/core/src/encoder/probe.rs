//! ffprobe-based track inspection.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use super::error::EncoderError;
use super::types::TrackInfo;

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: String,
    sample_rate: Option<String>,
    channels: Option<u32>,
    bits_per_raw_sample: Option<String>,
    bits_per_sample: Option<u32>,
    sample_fmt: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl ProbeStream {
    /// FLAC reports its depth in `bits_per_raw_sample`; fall back to the
    /// decoded sample format when that is missing.
    fn bit_depth(&self) -> Option<u32> {
        self.bits_per_raw_sample
            .as_deref()
            .and_then(|b| b.parse::<u32>().ok())
            .filter(|&b| b > 0)
            .or(self.bits_per_sample.filter(|&b| b > 0))
            .or_else(|| match self.sample_fmt.as_deref()? {
                "u8" | "u8p" => Some(8),
                "s16" | "s16p" => Some(16),
                "s32" | "s32p" | "flt" | "fltp" => Some(32),
                "dbl" | "dblp" => Some(64),
                _ => None,
            })
    }
}

/// Parses ffprobe JSON output for a single audio file.
pub fn parse_probe_output(path: &Path, output: &str) -> Result<TrackInfo, EncoderError> {
    let probe: ProbeOutput = serde_json::from_str(output)
        .map_err(|e| EncoderError::probe_failed(path, format!("bad ffprobe output: {}", e)))?;

    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "audio")
        .ok_or_else(|| EncoderError::probe_failed(path, "no audio stream"))?;

    let sample_rate = stream
        .sample_rate
        .as_deref()
        .and_then(|r| r.parse::<u32>().ok())
        .ok_or_else(|| EncoderError::probe_failed(path, "missing sample rate"))?;

    let bits_per_sample = stream
        .bit_depth()
        .ok_or_else(|| EncoderError::probe_failed(path, "missing bit depth"))?;

    // Vorbis comments land in the format tags; stream tags win on conflict.
    let mut tags = BTreeMap::new();
    let format_tags = probe.format.iter().flat_map(|f| f.tags.iter());
    for (key, value) in format_tags.chain(stream.tags.iter()) {
        tags.insert(key.to_ascii_lowercase(), value.clone());
    }

    Ok(TrackInfo {
        path: path.to_path_buf(),
        sample_rate,
        bits_per_sample,
        channels: stream.channels.unwrap_or(0),
        tags,
    })
}

/// Runs ffprobe on one file.
pub async fn probe_track(ffprobe: &Path, path: &Path) -> Result<TrackInfo, EncoderError> {
    debug!("Probing {}", path.display());

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| EncoderError::spawn_failed("ffprobe", ffprobe, e))?;

    if !output.status.success() {
        return Err(EncoderError::probe_failed(
            path,
            format!(
                "ffprobe exited with {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }

    parse_probe_output(path, &String::from_utf8_lossy(&output.stdout))
}
