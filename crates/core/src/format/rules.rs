//! Which formats a source torrent may legally produce.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::{FormatKey, ALL_FORMATS};

static PRE_EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)pre[- ]?emphasi(s(ed)?|zed)").expect("valid regex"));

/// Encodings accepted as a transcode source.
const LOSSLESS_ENCODINGS: [&str; 2] = ["Lossless", "24bit Lossless"];

pub fn is_lossless_encoding(encoding: &str) -> bool {
    LOSSLESS_ENCODINGS
        .iter()
        .any(|e| e.eq_ignore_ascii_case(encoding.trim()))
}

pub fn is_pre_emphasised(remaster_title: &str) -> bool {
    PRE_EMPHASIS.is_match(remaster_title)
}

/// Returns the formats a source with this encoding and remaster title may produce.
///
/// Lossy sources produce nothing, and neither do pre-emphasised masters since
/// de-emphasis is not something the encoders apply.
pub fn allowed_transcodes(encoding: &str, remaster_title: &str) -> Vec<FormatKey> {
    if !is_lossless_encoding(encoding) || is_pre_emphasised(remaster_title) {
        return Vec::new();
    }
    ALL_FORMATS.iter().map(|spec| spec.key).collect()
}
