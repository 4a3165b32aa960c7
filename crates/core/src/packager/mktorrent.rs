//! mktorrent-based packager.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::{PackageRequest, Packager, PackagerError};

/// Runs `mktorrent -p [-s flag] -a <announce> -o <file> <source>`.
pub struct MktorrentPackager {
    binary: PathBuf,
}

impl MktorrentPackager {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn args(request: &PackageRequest<'_>, output: &std::path::Path) -> Vec<String> {
        let mut args = vec!["-p".to_string()];
        if let Some(flag) = request.source_flag.filter(|f| !f.is_empty()) {
            args.push("-s".to_string());
            args.push(flag.to_string());
        }
        args.extend([
            "-a".to_string(),
            request.announce_url(),
            "-o".to_string(),
            output.to_string_lossy().to_string(),
            request.source.to_string_lossy().to_string(),
        ]);
        args
    }
}

#[async_trait]
impl Packager for MktorrentPackager {
    fn name(&self) -> &str {
        "mktorrent"
    }

    async fn package(&self, request: &PackageRequest<'_>) -> Result<PathBuf, PackagerError> {
        let output = request.torrent_path();
        tokio::fs::create_dir_all(request.work_dir).await?;

        // mktorrent refuses to overwrite.
        if output.exists() {
            tokio::fs::remove_file(&output).await?;
        }

        let args = Self::args(request, &output);
        debug!("Running mktorrent {}", args.join(" "));

        let result = Command::new(&self.binary)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PackagerError::ToolNotFound {
                        path: self.binary.clone(),
                    }
                } else {
                    PackagerError::Io(e)
                }
            })?;

        if !result.status.success() {
            let mut reason = String::from_utf8_lossy(&result.stderr).trim().to_string();
            if reason.is_empty() {
                reason = String::from_utf8_lossy(&result.stdout).trim().to_string();
            }
            return Err(PackagerError::Failed {
                path: request.source.to_path_buf(),
                reason,
            });
        }

        info!("Created {}", output.display());
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn request<'a>(flag: Option<&'a str>) -> PackageRequest<'a> {
        PackageRequest {
            source: Path::new("/out/Artist - 2001 - Album {CD} [MP3 V0]"),
            work_dir: Path::new("/tmp/work"),
            announce: "https://home.example/",
            passkey: "abc123",
            source_flag: flag,
        }
    }

    #[test]
    fn test_torrent_path() {
        assert_eq!(
            request(None).torrent_path(),
            PathBuf::from("/tmp/work/Artist - 2001 - Album {CD} [MP3 V0].torrent")
        );
    }

    #[test]
    fn test_args_without_source_flag() {
        let req = request(None);
        let args = MktorrentPackager::args(&req, &req.torrent_path());
        assert_eq!(args[0], "-p");
        assert_eq!(args[1], "-a");
        assert_eq!(args[2], "https://home.example/abc123/announce");
        assert_eq!(args[3], "-o");
        assert_eq!(args.last().unwrap(), "/out/Artist - 2001 - Album {CD} [MP3 V0]");
    }

    #[test]
    fn test_args_with_source_flag() {
        let req = request(Some("OPS"));
        let args = MktorrentPackager::args(&req, &req.torrent_path());
        assert_eq!(&args[..3], &["-p", "-s", "OPS"]);
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let dir = tempfile::TempDir::new().unwrap();
        let packager = MktorrentPackager::new("/nonexistent/mktorrent");
        let req = PackageRequest {
            source: dir.path(),
            work_dir: dir.path(),
            announce: "https://home.example/",
            passkey: "k",
            source_flag: None,
        };
        let err = packager.package(&req).await.unwrap_err();
        assert!(matches!(err, PackagerError::ToolNotFound { .. }));
    }
}
