//! Directory naming for sources and transcodes.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::format::FormatSpec;

use super::types::{Artist, ReleaseGroup, Torrent};

static UNSAFE_PATH_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\?<>\\*\|":/]"#).expect("valid regex"));

const MAX_ARTIST_LEN: usize = 50;
const MAX_NAME_CHARS: usize = 100;

/// Decodes HTML entities the tracker leaves in names.
pub fn unescape_html(input: &str) -> String {
    html_escape::decode_html_entities(input).into_owned()
}

/// Replaces characters that are unsafe in file names with `_`.
pub fn sanitize_component(name: &str) -> String {
    UNSAFE_PATH_CHARS.replace_all(name, "_").into_owned()
}

/// Primary artist string for a group: composers, else DJs, else artists.
pub fn formatted_artists(group: &ReleaseGroup) -> String {
    let credits = &group.credits;
    let primary: Vec<&Artist> = [&credits.composers, &credits.dj, &credits.artists]
        .into_iter()
        .find(|list| !list.is_empty())
        .map(|list| list.iter().collect())
        .unwrap_or_default();

    let names: Vec<String> = primary.iter().map(|a| unescape_html(&a.name)).collect();
    match names.as_slice() {
        [] => "Unknown".to_string(),
        [one] => one.clone(),
        [a, b] => format!("{} & {}", a, b),
        [init @ .., last] => {
            let joined = format!("{}, & {}", init.join(", "), last);
            if joined.chars().count() > MAX_ARTIST_LEN {
                "Various Artists".to_string()
            } else {
                joined
            }
        }
    }
}

/// Media and remaster summary, e.g. `{CD ~ Deluxe 2011}` or `{WEB}`.
pub fn media_info(torrent: &Torrent) -> String {
    let title = torrent.remaster_title.trim();
    if title.is_empty() {
        format!("{{{}}}", torrent.media)
    } else {
        let year = torrent
            .remaster_year
            .map(|y| y.to_string())
            .unwrap_or_default();
        format!("{{{} ~ {} {}}}", torrent.media, title, year)
            .replace(" }", "}")
    }
}

/// Directory name for a transcode of `torrent` into `spec`.
pub fn transcode_dir_name(group: &ReleaseGroup, torrent: &Torrent, spec: &FormatSpec) -> String {
    let name = unescape_html(&group.name);
    let short_name: String = name.chars().take(MAX_NAME_CHARS).collect();
    let raw = format!(
        "{} - {} - {} {} [{}]",
        formatted_artists(group),
        group.year,
        short_name,
        media_info(torrent),
        spec.name
    );
    sanitize_component(&raw)
}

/// Directory a single flat-file release is copied into before processing.
pub fn flat_source_dir_name(group: &ReleaseGroup) -> String {
    sanitize_component(&format!("{} ({}) [FLAC]", unescape_html(&group.name), group.year))
}
