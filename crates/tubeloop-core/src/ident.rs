//! Video identifier resolution.
//!
//! Parses free-form user input (a bare identifier or one of several provider
//! URL shapes) into the canonical 11-character video identifier. Resolution
//! is a pure function: no I/O, no side effects.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Length of a canonical video identifier.
pub const VIDEO_ID_LENGTH: usize = 11;

/// Canonical watch URL: `youtube.com/watch?...v=<id>`.
static WATCH_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/watch\?.*v=([A-Za-z0-9_-]{11})")
        .expect("valid regex")
});

/// Embed-path URL: `youtube.com/embed/<id>`.
static EMBED_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/embed/([A-Za-z0-9_-]{11})")
        .expect("valid regex")
});

/// Short-link URL: `youtu.be/<id>`.
static SHORT_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?youtu\.be/([A-Za-z0-9_-]{11})").expect("valid regex")
});

/// A canonical video identifier.
///
/// Identifiers produced by [`resolve`] are guaranteed to be 11 characters
/// from `[A-Za-z0-9_-]`. Identifiers restored from storage or imported
/// documents are wrapped via [`VideoId::from_raw`] and trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Wrap a raw identifier without validation.
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve free-form input into a canonical video identifier.
///
/// Accepted shapes, in precedence order:
/// 1. A bare 11-character identifier from `[A-Za-z0-9_-]`
/// 2. A watch URL: `https://www.youtube.com/watch?v=<id>` (extra query
///    parameters before or after `v=` are tolerated)
/// 3. An embed URL: `https://www.youtube.com/embed/<id>`
/// 4. A short URL: `https://youtu.be/<id>`
///
/// Scheme and `www.` prefix are optional for the URL shapes. Returns `None`
/// when nothing matches.
#[must_use]
pub fn resolve(input: &str) -> Option<VideoId> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    // Bare-ID fast path.
    if input.len() == VIDEO_ID_LENGTH && input.chars().all(is_id_char) {
        return Some(VideoId(input.to_string()));
    }

    for pattern in [&*WATCH_URL_RE, &*EMBED_URL_RE, &*SHORT_URL_RE] {
        if let Some(caps) = pattern.captures(input)
            && let Some(id) = caps.get(1)
        {
            return Some(VideoId(id.as_str().to_string()));
        }
    }

    None
}

/// Check whether a character belongs to the identifier alphabet.
const fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn test_resolve_bare_id() {
        assert_eq!(resolve(ID).unwrap().as_str(), ID);
        assert_eq!(resolve("a_b-C0d1E2f").unwrap().as_str(), "a_b-C0d1E2f");
    }

    #[test]
    fn test_resolve_trims_whitespace() {
        assert_eq!(resolve("  dQw4w9WgXcQ\n").unwrap().as_str(), ID);
    }

    #[test]
    fn test_resolve_watch_url() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "http://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?v=dQw4w9WgXcQ",
            "www.youtube.com/watch?v=dQw4w9WgXcQ",
            "youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=shared&v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
        ] {
            assert_eq!(resolve(url).unwrap().as_str(), ID, "url: {url}");
        }
    }

    #[test]
    fn test_resolve_embed_url() {
        for url in [
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "youtube.com/embed/dQw4w9WgXcQ?autoplay=1",
        ] {
            assert_eq!(resolve(url).unwrap().as_str(), ID, "url: {url}");
        }
    }

    #[test]
    fn test_resolve_short_url() {
        for url in [
            "https://youtu.be/dQw4w9WgXcQ",
            "youtu.be/dQw4w9WgXcQ",
            "https://www.youtu.be/dQw4w9WgXcQ?t=10",
        ] {
            assert_eq!(resolve(url).unwrap().as_str(), ID, "url: {url}");
        }
    }

    #[test]
    fn test_all_shapes_extract_the_same_id() {
        let shapes = [
            ID.to_string(),
            format!("https://www.youtube.com/watch?v={ID}"),
            format!("https://www.youtube.com/embed/{ID}"),
            format!("https://youtu.be/{ID}"),
        ];
        for shape in shapes {
            assert_eq!(resolve(&shape).unwrap().as_str(), ID, "shape: {shape}");
        }
    }

    #[test]
    fn test_resolve_rejects_wrong_length() {
        assert!(resolve("dQw4w9WgXc").is_none()); // 10 chars
        assert!(resolve("dQw4w9WgXcQQ").is_none()); // 12 chars
        assert!(resolve("").is_none());
        assert!(resolve("   ").is_none());
    }

    #[test]
    fn test_resolve_rejects_invalid_characters() {
        assert!(resolve("dQw4w9WgXc!").is_none());
        assert!(resolve("dQw4w9 gXcQ").is_none());
    }

    #[test]
    fn test_resolve_rejects_unrelated_urls() {
        assert!(resolve("https://example.com/watch?v=dQw4w9WgXcQ").is_none());
        assert!(resolve("https://vimeo.com/123456789").is_none());
        assert!(resolve("https://www.youtube.com/playlist?list=PLabcdef").is_none());
    }

    #[test]
    fn test_resolve_requires_full_token_after_prefix() {
        // Too-short token after the matched prefix.
        assert!(resolve("https://youtu.be/short").is_none());
        assert!(resolve("https://www.youtube.com/embed/").is_none());
    }

    #[test]
    fn test_video_id_roundtrips_through_serde() {
        let id = VideoId::from_raw(ID);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{ID}\""));
        let back: VideoId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
