//! Types for the encoder module.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::format::FormatSpec;

/// Audio properties of one FLAC file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub bits_per_sample: u32,
    pub channels: u32,
    /// Metadata tags with lowercased keys.
    pub tags: BTreeMap<String, String>,
}

impl TrackInfo {
    /// Tracks above 48 kHz or 16 bit are resampled to CD-style 16 bit.
    pub fn needs_resample(&self) -> bool {
        self.sample_rate > 48_000 || self.bits_per_sample > 16
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Aggregate view over every track of a release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceInfo {
    pub tracks: usize,
    pub max_channels: u32,
    pub max_bit_depth: u32,
    pub max_sample_rate: u32,
}

impl SourceInfo {
    pub fn from_tracks(tracks: &[TrackInfo]) -> Self {
        tracks.iter().fold(
            SourceInfo {
                tracks: tracks.len(),
                ..Default::default()
            },
            |acc, t| SourceInfo {
                max_channels: acc.max_channels.max(t.channels),
                max_bit_depth: acc.max_bit_depth.max(t.bits_per_sample),
                max_sample_rate: acc.max_sample_rate.max(t.sample_rate),
                ..acc
            },
        )
    }

    pub fn is_multichannel(&self) -> bool {
        self.max_channels > 2
    }

    pub fn is_24bit(&self) -> bool {
        self.max_bit_depth > 16
    }

    pub fn needs_resample(&self) -> bool {
        self.is_24bit() || self.max_sample_rate > 48_000
    }
}

/// One release transcode.
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    /// Directory holding the FLAC source.
    pub source_dir: PathBuf,
    /// Parent directory the transcode directory is created in.
    pub output_dir: PathBuf,
    pub spec: &'static FormatSpec,
    /// Name of the transcode directory under `output_dir`.
    pub dir_name: String,
    /// Maximum concurrent track pipelines.
    pub max_workers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(rate: u32, bits: u32, channels: u32) -> TrackInfo {
        TrackInfo {
            path: PathBuf::from("a.flac"),
            sample_rate: rate,
            bits_per_sample: bits,
            channels,
            tags: BTreeMap::new(),
        }
    }

    #[test]
    fn test_track_needs_resample() {
        assert!(!track(44_100, 16, 2).needs_resample());
        assert!(!track(48_000, 16, 2).needs_resample());
        assert!(track(96_000, 16, 2).needs_resample());
        assert!(track(44_100, 24, 2).needs_resample());
    }

    #[test]
    fn test_source_info_aggregates_maxima() {
        let info = SourceInfo::from_tracks(&[track(44_100, 16, 2), track(96_000, 24, 1)]);
        assert_eq!(info.tracks, 2);
        assert_eq!(info.max_channels, 2);
        assert_eq!(info.max_bit_depth, 24);
        assert_eq!(info.max_sample_rate, 96_000);
        assert!(info.is_24bit());
        assert!(!info.is_multichannel());
        assert!(info.needs_resample());
    }

    #[test]
    fn test_tag_lookup_ignores_blank_values() {
        let mut t = track(44_100, 16, 2);
        t.tags.insert("artist".to_string(), "  ".to_string());
        t.tags.insert("title".to_string(), "Song".to_string());
        assert_eq!(t.tag("artist"), None);
        assert_eq!(t.tag("title"), Some("Song"));
    }
}
