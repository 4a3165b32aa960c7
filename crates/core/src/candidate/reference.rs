//! Release reference parsing.

use std::path::Path;

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::release::Candidate;

use super::types::CandidateError;

static RELEASE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"torrents\.php\?(?:id|groupId)=(\d+)(?:&amp;|&)torrentid=(\d+)")
        .expect("valid regex")
});

/// Parses a release permalink such as
/// `https://orpheus.network/torrents.php?id=123&torrentid=456#torrent456`.
/// Percent-encoded references are decoded first.
pub fn parse_release_reference(reference: &str) -> Result<Candidate, CandidateError> {
    let decoded = urlencoding::decode(reference.trim())
        .map_err(|_| CandidateError::MalformedUrl(reference.to_string()))?;
    let caps = RELEASE_REFERENCE
        .captures(&decoded)
        .ok_or_else(|| CandidateError::MalformedUrl(reference.to_string()))?;

    let group_id = caps[1]
        .parse()
        .map_err(|_| CandidateError::MalformedUrl(reference.to_string()))?;
    let torrent_id = caps[2]
        .parse()
        .map_err(|_| CandidateError::MalformedUrl(reference.to_string()))?;

    Ok(Candidate::new(group_id, torrent_id))
}

/// Reads references from a file, one per line. Blank lines and `#` comments are skipped.
pub async fn read_reference_file(path: &Path) -> Result<Vec<String>, CandidateError> {
    let content =
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CandidateError::ReferenceFile {
                path: path.to_path_buf(),
                source,
            })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_permalink() {
        let c = parse_release_reference(
            "https://orpheus.network/torrents.php?id=123&torrentid=456#torrent456",
        )
        .unwrap();
        assert_eq!(c, Candidate::new(123, 456));
    }

    #[test]
    fn test_parse_html_escaped_and_group_id_variants() {
        assert_eq!(
            parse_release_reference("torrents.php?id=1&amp;torrentid=2").unwrap(),
            Candidate::new(1, 2)
        );
        assert_eq!(
            parse_release_reference("/torrents.php?groupId=7&torrentid=8#8").unwrap(),
            Candidate::new(7, 8)
        );
    }

    #[test]
    fn test_parse_percent_encoded() {
        assert_eq!(
            parse_release_reference("torrents.php%3Fid%3D3%26torrentid%3D4").unwrap(),
            Candidate::new(3, 4)
        );
    }

    #[test]
    fn test_parse_malformed() {
        for bad in [
            "",
            "https://orpheus.network/torrents.php?id=123",
            "torrents.php?torrentid=5",
            "not a url",
        ] {
            assert!(
                matches!(parse_release_reference(bad), Err(CandidateError::MalformedUrl(_))),
                "{}",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_read_reference_file_skips_comments() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "# backlog\n\ntorrents.php?id=1&torrentid=2\n  torrents.php?id=3&torrentid=4  \n"
        )
        .unwrap();

        let refs = read_reference_file(file.path()).await.unwrap();
        assert_eq!(
            refs,
            vec!["torrents.php?id=1&torrentid=2", "torrents.php?id=3&torrentid=4"]
        );
    }

    #[tokio::test]
    async fn test_read_reference_file_missing() {
        let result = read_reference_file(Path::new("/nonexistent/refs.txt")).await;
        assert!(matches!(result, Err(CandidateError::ReferenceFile { .. })));
    }
}
