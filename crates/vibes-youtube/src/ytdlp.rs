//! yt-dlp subprocess wrapper.
//!
//! Two extraction modes back the scraper: a cheap flat dump of the whole
//! playlist (`--flat-playlist -J`) and a full per-video JSON dump (`-J`).
//! Both are metadata-only; nothing is ever downloaded.

use std::path::PathBuf;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::{BackendError, BackendResult};

/// Flat-extraction result for one playlist.
#[derive(Debug, Clone, Deserialize)]
pub struct FlatPlaylist {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub playlist_count: Option<i64>,
    #[serde(default)]
    pub thumbnails: Vec<FlatThumbnail>,
    #[serde(default)]
    pub entries: Vec<FlatEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlatThumbnail {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub width: Option<i64>,
}

/// One skeleton entry from flat extraction.
#[derive(Debug, Clone, Deserialize)]
pub struct FlatEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub view_count: Option<i64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Full per-video extraction result.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub view_count: Option<i64>,
    #[serde(default)]
    pub like_count: Option<i64>,
    #[serde(default)]
    pub comment_count: Option<i64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl FlatPlaylist {
    /// Widest thumbnail available, the same pick a channel header would use.
    pub fn best_thumbnail(&self) -> String {
        self.thumbnails
            .iter()
            .max_by_key(|t| t.width.unwrap_or(0))
            .and_then(|t| t.url.clone())
            .unwrap_or_default()
    }
}

/// Handle for invoking the yt-dlp binary.
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    cookies_file: Option<PathBuf>,
}

impl YtDlp {
    /// Locate yt-dlp on PATH.
    pub fn new(cookies_file: Option<PathBuf>) -> BackendResult<Self> {
        let binary = which::which("yt-dlp")
            .map_err(|_| BackendError::other("yt-dlp binary not found on PATH"))?;
        if let Some(cookies) = &cookies_file {
            if cookies.exists() {
                debug!(cookies = %cookies.display(), "Using cookies file for yt-dlp");
            } else {
                tracing::warn!(
                    cookies = %cookies.display(),
                    "Cookies file not found; YouTube may block requests"
                );
            }
        }
        Ok(Self {
            binary,
            cookies_file,
        })
    }

    /// Construct with an explicit binary path (tests use stub scripts).
    pub fn with_binary(binary: PathBuf, cookies_file: Option<PathBuf>) -> Self {
        Self {
            binary,
            cookies_file,
        }
    }

    /// Fast whole-playlist skeleton extraction.
    pub async fn flat_playlist(&self, url: &str, user_agent: &str) -> BackendResult<FlatPlaylist> {
        let stdout = self.run(&["--flat-playlist"], url, user_agent).await?;
        serde_json::from_str(&stdout)
            .map_err(|e| BackendError::other(format!("unparseable flat playlist dump: {e}")))
    }

    /// Full metadata for a single video.
    pub async fn video_info(&self, url: &str, user_agent: &str) -> BackendResult<VideoInfo> {
        let stdout = self.run(&[], url, user_agent).await?;
        serde_json::from_str(&stdout)
            .map_err(|e| BackendError::other(format!("unparseable video dump: {e}")))
    }

    async fn run(&self, extra: &[&str], url: &str, user_agent: &str) -> BackendResult<String> {
        let mut cmd = Command::new(&self.binary);
        cmd.args([
            "-J",
            "--no-warnings",
            "--skip-download",
            "--no-cache-dir",
            "--user-agent",
            user_agent,
        ]);
        cmd.args(extra);
        if let Some(cookies) = self.cookies_file.as_ref().filter(|p| p.exists()) {
            cmd.arg("--cookies").arg(cookies);
        }
        cmd.arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(url, "Running yt-dlp extraction");
        let output = cmd
            .output()
            .await
            .map_err(|e| BackendError::other(format!("failed to spawn yt-dlp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail = stderr.lines().last().unwrap_or("unknown error");
            return Err(BackendError::other(format!("yt-dlp failed: {tail}")));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    /// Write an executable stub that prints `body` and exits with `code`.
    fn stub_binary(dir: &tempfile::TempDir, body: &str, code: i32) -> PathBuf {
        let path = dir.path().join("yt-dlp-stub");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "#!/bin/sh").unwrap();
        if code == 0 {
            writeln!(f, "cat <<'JSON'\n{body}\nJSON").unwrap();
        } else {
            writeln!(f, "echo \"{body}\" >&2\nexit {code}").unwrap();
        }
        drop(f);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn flat_playlist_parses_entries_and_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let body = serde_json::json!({
            "title": "My List",
            "uploader": "Chan",
            "playlist_count": 2,
            "thumbnails": [
                {"url": "small.jpg", "width": 120},
                {"url": "big.jpg", "width": 640}
            ],
            "entries": [
                {"id": "v1", "title": "One", "url": "https://www.youtube.com/watch?v=v1",
                 "view_count": 10, "duration": 60.0},
                {"id": "v2", "title": "Two", "view_count": null, "duration": null}
            ]
        })
        .to_string();
        let ytdlp = YtDlp::with_binary(stub_binary(&dir, &body, 0), None);

        let flat = ytdlp.flat_playlist("https://example", "UA").await.unwrap();
        assert_eq!(flat.title.as_deref(), Some("My List"));
        assert_eq!(flat.entries.len(), 2);
        assert_eq!(flat.best_thumbnail(), "big.jpg");
        assert_eq!(flat.entries[1].view_count, None);
    }

    #[tokio::test]
    async fn failure_surfaces_stderr_tail() {
        let dir = tempfile::tempdir().unwrap();
        let ytdlp = YtDlp::with_binary(
            stub_binary(&dir, "ERROR: Sign in to confirm you're not a bot", 1),
            None,
        );
        let err = ytdlp.video_info("https://example", "UA").await.unwrap_err();
        assert!(err.to_string().contains("Sign in to confirm"));
    }

    #[tokio::test]
    async fn garbage_stdout_is_a_backend_error() {
        let dir = tempfile::tempdir().unwrap();
        let ytdlp = YtDlp::with_binary(stub_binary(&dir, "<html>consent page</html>", 0), None);
        let err = ytdlp.flat_playlist("https://example", "UA").await.unwrap_err();
        assert!(matches!(err, BackendError::Other(_)));
    }
}
