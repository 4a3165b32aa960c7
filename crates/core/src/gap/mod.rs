//! Format gap analysis.
//!
//! A format gap is a configured (format, encoding) pair that no torrent in the
//! source's release edition already provides, and that the source is allowed to
//! produce.

use std::collections::HashSet;
use std::str::FromStr;

use tracing::warn;

use crate::format::{allowed_transcodes, FormatKey, FormatSpec};
use crate::release::{ReleaseGroup, Torrent};

/// Cleans the configured format list: trims, drops empties, unknowns and duplicates.
pub fn normalize_supported<S: AsRef<str>>(supported: &[S]) -> Vec<FormatKey> {
    let mut seen = HashSet::new();
    supported
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| match FormatKey::from_str(s) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!("Ignoring configured format: {}", e);
                None
            }
        })
        .filter(|key| seen.insert(*key))
        .collect()
}

/// Formats to produce for `torrent`, in the order of `supported`.
pub fn missing_formats<S: AsRef<str>>(
    group: &ReleaseGroup,
    torrent: &Torrent,
    supported: &[S],
) -> Vec<&'static FormatSpec> {
    let present: Vec<(&str, &str)> = group
        .edition_of(torrent)
        .map(|t| (t.format.as_str(), t.encoding.as_str()))
        .collect();

    let allowed = allowed_transcodes(&torrent.encoding, &torrent.remaster_title);

    normalize_supported(supported)
        .into_iter()
        .map(FormatKey::spec)
        .filter(|spec| !present.iter().any(|(f, e)| spec.matches(f, e)))
        .filter(|spec| allowed.contains(&spec.key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{FLAC, MP3_320, MP3_V0};
    use crate::testing::fixtures;

    #[test]
    fn test_flac_and_320_present_yields_v0() {
        let group = fixtures::release_group(
            1,
            vec![
                fixtures::torrent(10, "CD", "FLAC", "Lossless"),
                fixtures::torrent(11, "CD", "MP3", "320"),
            ],
        );
        let source = group.torrent(10).unwrap();

        let missing = missing_formats(&group, source, &["flac", "v0", "320"]);
        assert_eq!(missing, vec![&MP3_V0]);
    }

    #[test]
    fn test_order_follows_configuration() {
        let group = fixtures::release_group(1, vec![fixtures::torrent(10, "CD", "FLAC", "24bit Lossless")]);
        let source = group.torrent(10).unwrap();

        let missing = missing_formats(&group, source, &["320", "v0", "flac"]);
        assert_eq!(missing, vec![&MP3_320, &MP3_V0, &FLAC]);
    }

    #[test]
    fn test_other_editions_do_not_count() {
        let mut remaster = fixtures::torrent(11, "CD", "MP3", "V0 (VBR)");
        remaster.remaster_title = "Remaster".to_string();
        let group = fixtures::release_group(
            1,
            vec![
                fixtures::torrent(10, "CD", "FLAC", "Lossless"),
                remaster,
                fixtures::torrent(12, "Vinyl", "MP3", "320"),
            ],
        );
        let source = group.torrent(10).unwrap();

        let missing = missing_formats(&group, source, &["v0", "320"]);
        assert_eq!(missing, vec![&MP3_V0, &MP3_320]);
    }

    #[test]
    fn test_duplicates_empties_and_unknowns_removed() {
        let group = fixtures::release_group(1, vec![fixtures::torrent(10, "WEB", "FLAC", "Lossless")]);
        let source = group.torrent(10).unwrap();

        let missing = missing_formats(&group, source, &["", "v0", "V0", " ", "aac", "320"]);
        assert_eq!(missing, vec![&MP3_V0, &MP3_320]);
    }

    #[test]
    fn test_lossy_source_needs_nothing() {
        let group = fixtures::release_group(1, vec![fixtures::torrent(10, "CD", "MP3", "320")]);
        let source = group.torrent(10).unwrap();
        assert!(missing_formats(&group, source, &["v0", "v2"]).is_empty());
    }

    #[test]
    fn test_pre_emphasis_needs_nothing() {
        let mut source = fixtures::torrent(10, "CD", "FLAC", "Lossless");
        source.remaster_title = "Pre-Emphasis".to_string();
        let group = fixtures::release_group(1, vec![source]);
        let source = group.torrent(10).unwrap();
        assert!(missing_formats(&group, source, &["v0"]).is_empty());
    }

    #[test]
    fn test_never_returns_present_pair() {
        let group = fixtures::release_group(
            1,
            vec![
                fixtures::torrent(10, "CD", "FLAC", "Lossless"),
                fixtures::torrent(11, "CD", "MP3", "V0 (VBR)"),
                fixtures::torrent(12, "CD", "MP3", "V2 (VBR)"),
                fixtures::torrent(13, "CD", "MP3", "320"),
            ],
        );
        let source = group.torrent(10).unwrap();
        assert!(missing_formats(&group, source, &["flac", "v0", "v2", "320"]).is_empty());
    }
}
