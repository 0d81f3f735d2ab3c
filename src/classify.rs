//! Input classification
//!
//! Turns the raw text a client submits into a [`Classification`]: either a free
//! text search or one of the recognised URL shapes. Classification is a pure
//! function; nothing is fetched here.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use utoipa::ToSchema;

/// Playlist prefix the remote service uses for generated mixes
pub const DYNAMIC_COLLECTION_PREFIX: &str = "RD";

/// Kind of content an input refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Free-text query resolved to its first hit
    Search,
    /// Regular watch link or short link
    Video,
    /// Short-form video
    Short,
    /// Track on the music service
    Music,
    /// Enumerable playlist
    Playlist,
}

impl ContentKind {
    /// Whether the content expands into several items
    pub fn is_collection(&self) -> bool {
        matches!(self, ContentKind::Playlist)
    }
}

/// Result of classifying one input
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    /// What the input refers to
    pub kind: ContentKind,
    /// Video id, playlist id, or the query text for searches
    pub identifier: String,
    /// Argument handed to the fetcher
    pub target: String,
}

impl Classification {
    /// Number of items known without asking the remote service (0 = must be queried)
    pub fn known_total(&self) -> u32 {
        if self.kind.is_collection() { 0 } else { 1 }
    }
}

/// Which capture group of a pattern carries the identifier
#[derive(Clone, Copy)]
enum Shape {
    PlaylistContext,
    MusicTrack,
    MusicPlaylist,
    Watch,
    ShortLink,
    Shorts,
    PlaylistPage,
}

impl Shape {
    fn kind(self) -> ContentKind {
        match self {
            Shape::PlaylistContext | Shape::MusicPlaylist | Shape::PlaylistPage => {
                ContentKind::Playlist
            }
            Shape::MusicTrack => ContentKind::Music,
            Shape::Watch | Shape::ShortLink => ContentKind::Video,
            Shape::Shorts => ContentKind::Short,
        }
    }
}

// Order matters: a watch link carrying a playlist is treated as the playlist.
const PATTERNS: &[(&str, Shape)] = &[
    (
        r"^https?://(?:(?:www|m|music)\.)?youtube\.com/watch\?(?:\S*&)?list=([A-Za-z0-9_-]+)",
        Shape::PlaylistContext,
    ),
    (
        r"^https?://music\.youtube\.com/watch\?(?:\S*&)?v=([A-Za-z0-9_-]{11})",
        Shape::MusicTrack,
    ),
    (
        r"^https?://music\.youtube\.com/playlist\?(?:\S*&)?list=([A-Za-z0-9_-]+)",
        Shape::MusicPlaylist,
    ),
    (
        r"^https?://(?:(?:www|m)\.)?youtube\.com/watch\?(?:\S*&)?v=([A-Za-z0-9_-]{11})",
        Shape::Watch,
    ),
    (r"^https?://youtu\.be/([A-Za-z0-9_-]{11})", Shape::ShortLink),
    (
        r"^https?://(?:(?:www|m)\.)?youtube\.com/shorts/([A-Za-z0-9_-]{11})",
        Shape::Shorts,
    ),
    (
        r"^https?://(?:(?:www|m)\.)?youtube\.com/playlist\?(?:\S*&)?list=([A-Za-z0-9_-]+)",
        Shape::PlaylistPage,
    ),
];

fn patterns() -> &'static [(Regex, Shape)] {
    static COMPILED: OnceLock<Vec<(Regex, Shape)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|(pattern, shape)| match Regex::new(pattern) {
                Ok(re) => Some((re, *shape)),
                Err(e) => {
                    tracing::error!(pattern, error = %e, "invalid classification pattern");
                    None
                }
            })
            .collect()
    })
}

/// Whether the input starts with an http(s) scheme
pub fn has_url_scheme(input: &str) -> bool {
    let lower = input.get(..8).unwrap_or(input).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Classify a raw submission
///
/// # Errors
///
/// - [`Error::InvalidInput`] for empty input or URLs of an unknown shape
/// - [`Error::UnsupportedDynamicCollection`] for generated mixes
pub fn classify(input: &str) -> Result<Classification> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::InvalidInput("input is empty".into()));
    }

    if !has_url_scheme(input) {
        return Ok(Classification {
            kind: ContentKind::Search,
            identifier: input.to_string(),
            target: format!("ytsearch1:{input}"),
        });
    }

    let (shape, identifier) = patterns()
        .iter()
        .find_map(|(re, shape)| {
            re.captures(input)
                .and_then(|caps| caps.get(1))
                .map(|m| (*shape, m.as_str().to_string()))
        })
        .ok_or_else(|| Error::InvalidInput(format!("unrecognised URL: {input}")))?;

    let kind = shape.kind();
    if kind.is_collection() && identifier.starts_with(DYNAMIC_COLLECTION_PREFIX) {
        return Err(Error::UnsupportedDynamicCollection {
            list_id: identifier,
        });
    }

    let target = match shape {
        Shape::PlaylistContext | Shape::PlaylistPage | Shape::MusicPlaylist => {
            format!("https://www.youtube.com/playlist?list={identifier}")
        }
        Shape::MusicTrack => format!("https://music.youtube.com/watch?v={identifier}"),
        Shape::Watch | Shape::ShortLink | Shape::Shorts => {
            format!("https://www.youtube.com/watch?v={identifier}")
        }
    };

    Ok(Classification {
        kind,
        identifier,
        target,
    })
}

/// Validate a bare video identifier as used in batch submissions
pub fn is_video_id(id: &str) -> bool {
    id.len() == 11
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pattern_compiles() {
        assert_eq!(patterns().len(), PATTERNS.len());
    }

    #[test]
    fn text_without_scheme_is_a_single_item_search() {
        for input in ["daft punk one more time", "www.youtube.com/watch?v=x", "ftp://x"] {
            let c = classify(input).unwrap();
            assert_eq!(c.kind, ContentKind::Search, "{input}");
            assert_eq!(c.known_total(), 1);
            assert_eq!(c.identifier, input);
            assert_eq!(c.target, format!("ytsearch1:{input}"));
        }
    }

    #[test]
    fn search_input_is_trimmed() {
        let c = classify("   lofi beats  ").unwrap();
        assert_eq!(c.identifier, "lofi beats");
    }

    #[test]
    fn empty_input_is_invalid() {
        assert!(matches!(classify(""), Err(Error::InvalidInput(_))));
        assert!(matches!(classify("   \n"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn watch_link_is_a_video() {
        let c = classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(c.kind, ContentKind::Video);
        assert_eq!(c.identifier, "dQw4w9WgXcQ");
        assert_eq!(c.target, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn watch_link_with_leading_params_is_a_video() {
        let c = classify("https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42").unwrap();
        assert_eq!(c.kind, ContentKind::Video);
        assert_eq!(c.identifier, "dQw4w9WgXcQ");
    }

    #[test]
    fn short_link_and_shorts_are_single_items() {
        let c = classify("https://youtu.be/dQw4w9WgXcQ?si=abc").unwrap();
        assert_eq!(c.kind, ContentKind::Video);
        assert_eq!(c.identifier, "dQw4w9WgXcQ");

        let c = classify("https://www.youtube.com/shorts/abcdefghijk").unwrap();
        assert_eq!(c.kind, ContentKind::Short);
        assert_eq!(c.known_total(), 1);
        assert_eq!(c.target, "https://www.youtube.com/watch?v=abcdefghijk");
    }

    #[test]
    fn playlist_page_is_a_collection_with_unknown_total() {
        let c = classify("https://www.youtube.com/playlist?list=PL1234567890abcdef").unwrap();
        assert_eq!(c.kind, ContentKind::Playlist);
        assert_eq!(c.identifier, "PL1234567890abcdef");
        assert_eq!(c.known_total(), 0);
        assert_eq!(
            c.target,
            "https://www.youtube.com/playlist?list=PL1234567890abcdef"
        );
    }

    #[test]
    fn watch_link_with_list_context_is_the_playlist() {
        let c = classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLabcdef&index=3")
            .unwrap();
        assert_eq!(c.kind, ContentKind::Playlist);
        assert_eq!(c.identifier, "PLabcdef");
    }

    #[test]
    fn music_service_variants() {
        let c = classify("https://music.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(c.kind, ContentKind::Music);
        assert_eq!(c.target, "https://music.youtube.com/watch?v=dQw4w9WgXcQ");

        let c = classify("https://music.youtube.com/playlist?list=OLAK5uy_abc").unwrap();
        assert_eq!(c.kind, ContentKind::Playlist);
        assert_eq!(c.identifier, "OLAK5uy_abc");
    }

    #[test]
    fn generated_mix_is_rejected_in_every_shape() {
        for url in [
            "https://www.youtube.com/playlist?list=RDdQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=RDdQw4w9WgXcQ&start_radio=1",
            "https://music.youtube.com/playlist?list=RDCLAK5uy_xyz",
        ] {
            match classify(url) {
                Err(Error::UnsupportedDynamicCollection { list_id }) => {
                    assert!(list_id.starts_with("RD"), "{url}")
                }
                other => panic!("expected dynamic collection rejection for {url}, got {other:?}"),
            }
        }
    }

    #[test]
    fn list_id_merely_containing_rd_is_accepted() {
        let c = classify("https://www.youtube.com/playlist?list=PLRDxyz").unwrap();
        assert_eq!(c.kind, ContentKind::Playlist);
    }

    #[test]
    fn unknown_urls_are_invalid() {
        for url in [
            "https://vimeo.com/12345",
            "https://www.youtube.com/channel/UC123",
            "https://www.youtube.com/watch?v=short",
            "https://evil.example/?u=https://youtu.be/dQw4w9WgXcQ",
        ] {
            assert!(
                matches!(classify(url), Err(Error::InvalidInput(_))),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn scheme_detection_is_case_insensitive() {
        assert!(has_url_scheme("HTTPS://youtu.be/dQw4w9WgXcQ"));
        assert!(!has_url_scheme("http:/oops"));
        assert!(!has_url_scheme("h"));
    }

    #[test]
    fn video_id_validation() {
        assert!(is_video_id("dQw4w9WgXcQ"));
        assert!(is_video_id("-_abcdefghi"));
        assert!(!is_video_id("dQw4w9WgXc"));
        assert!(!is_video_id("dQw4w9WgXc!"));
        assert!(!is_video_id(""));
    }
}
