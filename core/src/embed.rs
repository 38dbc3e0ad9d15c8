//! Resolves a song's url into something a front-end can render: an embedded video player,
//! an embedded streaming player, or, when the link is not recognized, the plain link.
//!
//! Resolution is pure and total, it never touches the network and never fails.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

static VIDEO_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([a-zA-Z0-9_-]{11})")
        .expect("the video url pattern is valid")
});

static STREAMING_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"open\.spotify\.com/(track|album|playlist)/([a-zA-Z0-9]+)")
        .expect("the streaming url pattern is valid")
});

/// The kind of resource a streaming link points at.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Deserialize, Serialize, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StreamingKind {
    Track,
    Album,
    Playlist,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum EmbedDescriptor {
    /// A video that can be embedded by its 11 character id.
    Video { id: String },
    /// A track, album, or playlist on the streaming service.
    Streaming { kind: StreamingKind, id: String },
    /// Anything else, rendered as an external link.
    Link { url: String },
}

impl EmbedDescriptor {
    /// The url of the embeddable player, if there is one.
    #[must_use]
    pub fn player_url(&self) -> Option<String> {
        match self {
            Self::Video { id } => Some(format!("https://www.youtube.com/embed/{id}")),
            Self::Streaming { kind, id } => Some(format!("https://open.spotify.com/embed/{kind}/{id}")),
            Self::Link { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_embeddable(&self) -> bool {
        !matches!(self, Self::Link { .. })
    }
}

/// Resolve a song url into an [`EmbedDescriptor`].
///
/// The first matching rule wins:
/// 1. video links (`watch?v=`, short links, `/embed/`) with an 11 character id
/// 2. streaming links to a track, album, or playlist
/// 3. the url itself, untouched
#[must_use]
pub fn resolve(url: &str) -> EmbedDescriptor {
    if let Some(id) = VIDEO_PATTERN.captures(url).and_then(|c| c.get(1)) {
        return EmbedDescriptor::Video {
            id: id.as_str().to_owned(),
        };
    }

    if let Some(captures) = STREAMING_PATTERN.captures(url) {
        // the pattern only admits the three known kinds
        if let (Some(kind), Some(id)) = (
            captures.get(1).and_then(|k| k.as_str().parse().ok()),
            captures.get(2),
        ) {
            return EmbedDescriptor::Streaming {
                kind,
                id: id.as_str().to_owned(),
            };
        }
    }

    EmbedDescriptor::Link {
        url: url.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::watch("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "dQw4w9WgXcQ")]
    #[case::watch_with_params("https://youtube.com/watch?v=dQw4w9WgXcQ&t=42s", "dQw4w9WgXcQ")]
    #[case::short("https://youtu.be/dQw4w9WgXcQ", "dQw4w9WgXcQ")]
    #[case::short_with_query("https://youtu.be/a-b_c1234XY?si=abc", "a-b_c1234XY")]
    #[case::embed("https://www.youtube.com/embed/dQw4w9WgXcQ", "dQw4w9WgXcQ")]
    #[case::no_scheme("youtu.be/0123456789_", "0123456789_")]
    fn test_video_links(#[case] url: &str, #[case] id: &str) {
        assert_eq!(resolve(url), EmbedDescriptor::Video { id: id.to_owned() });
    }

    #[rstest]
    #[case("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC", StreamingKind::Track, "4uLU6hMCjMI75M1A2tKUQC")]
    #[case("https://open.spotify.com/album/1DFixLWuPkv3KT3TnV35m3?si=x", StreamingKind::Album, "1DFixLWuPkv3KT3TnV35m3")]
    #[case("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M", StreamingKind::Playlist, "37i9dQZF1DXcBWIGoYBM5M")]
    fn test_streaming_links(#[case] url: &str, #[case] kind: StreamingKind, #[case] id: &str) {
        assert_eq!(
            resolve(url),
            EmbedDescriptor::Streaming {
                kind,
                id: id.to_owned()
            }
        );
    }

    #[rstest]
    #[case::other_site("https://soundcloud.com/artist/track")]
    #[case::short_id("https://youtu.be/short")]
    #[case::bad_id_chars("https://www.youtube.com/watch?v=dQw4w9W!XcQ")]
    #[case::streaming_unknown_kind("https://open.spotify.com/artist/0OdUWJ0sBjDrqHygGUXeCF")]
    #[case::empty("")]
    #[case::not_a_url("just some text")]
    fn test_fallback_keeps_url(#[case] url: &str) {
        assert_eq!(
            resolve(url),
            EmbedDescriptor::Link {
                url: url.to_owned()
            }
        );
    }

    #[test]
    fn test_video_takes_precedence() {
        // a streaming url that happens to carry a video link in its query
        let url = "https://open.spotify.com/track/abc?ref=youtu.be/dQw4w9WgXcQ";
        assert_eq!(
            resolve(url),
            EmbedDescriptor::Video {
                id: "dQw4w9WgXcQ".into()
            }
        );
    }

    #[rstest]
    #[case(EmbedDescriptor::Video { id: "dQw4w9WgXcQ".into() }, Some("https://www.youtube.com/embed/dQw4w9WgXcQ"))]
    #[case(EmbedDescriptor::Streaming { kind: StreamingKind::Album, id: "abc".into() }, Some("https://open.spotify.com/embed/album/abc"))]
    #[case(EmbedDescriptor::Link { url: "https://example.com".into() }, None)]
    fn test_player_url(#[case] descriptor: EmbedDescriptor, #[case] expected: Option<&str>) {
        assert_eq!(descriptor.player_url().as_deref(), expected);
    }
}
