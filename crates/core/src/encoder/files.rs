//! Release directory walking.

use std::path::{Path, PathBuf};

/// Non-audio files copied alongside a transcode.
pub const AUXILIARY_EXTENSIONS: [&str; 11] = [
    "cue", "gif", "jpeg", "jpg", "log", "md5", "nfo", "pdf", "png", "sfv", "txt",
];

/// Finds files under `root` whose extension is in `extensions`, ignoring case.
///
/// Dotfiles are skipped. Results are sorted so track order is stable.
pub async fn find_files(root: &Path, extensions: &[&str]) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;

            if file_type.is_dir() {
                pending.push(path);
                continue;
            }

            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            let wanted = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));

            if wanted && !hidden {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_find_files_recurses_and_filters() {
        let dir = TempDir::new().unwrap();
        let disc2 = dir.path().join("CD2");
        std::fs::create_dir(&disc2).unwrap();
        std::fs::write(dir.path().join("01.flac"), b"").unwrap();
        std::fs::write(dir.path().join("cover.JPG"), b"").unwrap();
        std::fs::write(dir.path().join(".hidden.flac"), b"").unwrap();
        std::fs::write(disc2.join("01.FLAC"), b"").unwrap();
        std::fs::write(disc2.join("notes.doc"), b"").unwrap();

        let flacs = find_files(dir.path(), &["flac"]).await.unwrap();
        assert_eq!(flacs, vec![dir.path().join("01.flac"), disc2.join("01.FLAC")]);

        let aux = find_files(dir.path(), &AUXILIARY_EXTENSIONS).await.unwrap();
        assert_eq!(aux, vec![dir.path().join("cover.JPG")]);
    }

    #[tokio::test]
    async fn test_find_files_missing_root_errors() {
        let dir = TempDir::new().unwrap();
        assert!(find_files(&dir.path().join("missing"), &["flac"]).await.is_err());
    }
}
