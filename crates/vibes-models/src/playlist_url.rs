//! Playlist URL normalization and dashboard fingerprints.
//!
//! Two playlist URLs are considered the same playlist when their normalized
//! forms match: the host is canonicalized to `www.youtube.com`, the URL is
//! lower-cased, and every query parameter other than `list` is dropped.
//! The dashboard id is the first 16 hex chars of SHA-256 over that form,
//! which makes the public dashboard path a stable function of the playlist.

use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

/// Hosts accepted as YouTube playlist URLs.
const ALLOWED_DOMAINS: [&str; 4] = [
    "www.youtube.com",
    "youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];

/// Length of the hex dashboard id derived from a normalized URL.
pub const FINGERPRINT_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidUrl {
    #[error("invalid YouTube URL: domain is not a recognized youtube.com domain")]
    BadDomain,

    #[error("invalid YouTube URL: not a playlist URL")]
    NotPlaylist,

    #[error("invalid YouTube URL: missing playlist id")]
    MissingListParam,

    #[error("invalid YouTube URL: empty playlist id")]
    EmptyListParam,

    #[error("invalid URL format: {0}")]
    Malformed(String),
}

/// A playlist URL in canonical form.
///
/// Obtainable only through [`normalize`], so any value of this type is known
/// to point at `/playlist` on a recognized domain with a non-empty `list` id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Reconstruct from a string already stored in canonical form.
    ///
    /// Used when reading back rows whose `playlist_url` column was written
    /// from a `NormalizedUrl`; does not re-validate.
    pub fn from_stored(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl std::fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate and canonicalize a playlist URL.
///
/// Rejects URLs whose host is not a recognized YouTube domain, whose path is
/// not `/playlist`, or whose `list` parameter is missing or empty. Index and
/// timestamp parameters are dropped; the playlist id is lower-cased so that
/// URLs differing only in case fingerprint identically.
pub fn normalize(raw: &str) -> Result<NormalizedUrl, InvalidUrl> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|e| InvalidUrl::Malformed(e.to_string()))?;

    let host = parsed
        .host_str()
        .ok_or(InvalidUrl::BadDomain)?
        .to_ascii_lowercase();
    if !ALLOWED_DOMAINS.contains(&host.as_str()) {
        return Err(InvalidUrl::BadDomain);
    }

    if !parsed.path().eq_ignore_ascii_case("/playlist") {
        return Err(InvalidUrl::NotPlaylist);
    }

    let list = parsed
        .query_pairs()
        .find(|(k, _)| k == "list")
        .map(|(_, v)| v.into_owned())
        .ok_or(InvalidUrl::MissingListParam)?;
    if list.is_empty() {
        return Err(InvalidUrl::EmptyListParam);
    }

    Ok(NormalizedUrl(format!(
        "https://www.youtube.com/playlist?list={}",
        list.to_ascii_lowercase()
    )))
}

/// Extract the raw `list=` value from a playlist URL without canonicalizing.
pub fn extract_playlist_id(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == "list")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Derive the 16-char hex dashboard id from a normalized URL.
pub fn fingerprint(url: &NormalizedUrl) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());
    digest
        .iter()
        .take(FINGERPRINT_LEN / 2)
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_index_and_time_params() {
        let base = normalize("https://www.youtube.com/playlist?list=PL_ABC").unwrap();
        let with_index =
            normalize("https://www.youtube.com/playlist?list=PL_ABC&index=3").unwrap();
        let with_time = normalize("https://www.youtube.com/playlist?list=PL_ABC&t=42").unwrap();

        assert_eq!(base, with_index);
        assert_eq!(base, with_time);
    }

    #[test]
    fn normalize_is_case_insensitive() {
        let lower = normalize("https://www.youtube.com/playlist?list=pl_abc").unwrap();
        let upper = normalize("https://WWW.YOUTUBE.COM/PLAYLIST?list=PL_ABC").unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn normalize_canonicalizes_host() {
        let www = normalize("https://www.youtube.com/playlist?list=PL_X").unwrap();
        let mobile = normalize("https://m.youtube.com/playlist?list=PL_X").unwrap();
        let music = normalize("https://music.youtube.com/playlist?list=PL_X").unwrap();
        assert_eq!(www, mobile);
        assert_eq!(www, music);
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize("https://m.youtube.com/playlist?list=PL_ABC&index=9").unwrap();
        let twice = normalize(once.as_str()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_rejects_bad_inputs() {
        assert_eq!(
            normalize("https://example.com/playlist?list=PL_X"),
            Err(InvalidUrl::BadDomain)
        );
        assert_eq!(
            normalize("https://www.youtube.com/watch?v=abc"),
            Err(InvalidUrl::NotPlaylist)
        );
        assert_eq!(
            normalize("https://www.youtube.com/playlist"),
            Err(InvalidUrl::MissingListParam)
        );
        assert_eq!(
            normalize("https://www.youtube.com/playlist?list="),
            Err(InvalidUrl::EmptyListParam)
        );
        assert!(matches!(
            normalize("not a url"),
            Err(InvalidUrl::Malformed(_))
        ));
    }

    #[test]
    fn fingerprint_is_stable_across_equivalent_urls() {
        let a = normalize("https://www.youtube.com/playlist?list=PL_ABC&index=3").unwrap();
        let b = normalize("https://m.youtube.com/playlist?list=pl_abc&t=10").unwrap();
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).len(), FINGERPRINT_LEN);
        assert!(fingerprint(&a).chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_differs_for_different_playlists() {
        let a = normalize("https://www.youtube.com/playlist?list=PL_ONE").unwrap();
        let b = normalize("https://www.youtube.com/playlist?list=PL_TWO").unwrap();
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn extract_playlist_id_preserves_case() {
        assert_eq!(
            extract_playlist_id("https://www.youtube.com/playlist?list=PLabCD&index=1"),
            Some("PLabCD".to_string())
        );
        assert_eq!(extract_playlist_id("https://www.youtube.com/playlist"), None);
    }
}
