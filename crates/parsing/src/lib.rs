//! YouTube link recognition.
//!
//! Pure text scanning, no I/O. Recognizes both the short `youtu.be/<id>`
//! and the long `youtube.com/watch?v=<id>` URL forms, case-insensitively.

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https://(www\.)?youtu(\.be/|be\.com/watch\?v=)(\S+)")
        .expect("video URL pattern is valid")
});

/// A recognized video link: the URL as it appeared plus the extracted id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRef {
    pub url: String,
    pub video_id: String,
}

/// Scan `text` for YouTube video links, in order of appearance.
///
/// Returns an empty vec when nothing matches; never fails.
pub fn extract_links(text: &str) -> Vec<VideoRef> {
    VIDEO_URL
        .captures_iter(text)
        .filter_map(|caps| {
            let url = caps.get(0)?.as_str().to_string();
            let video_id = caps.get(3)?.as_str().to_string();
            Some(VideoRef { url, video_id })
        })
        .collect()
}

/// Extract the video id from a single URL.
///
/// `None` when the URL is not a recognized YouTube link. Used standalone by
/// the direct-add command, so a non-match is a value, not an error.
pub fn video_id_from_url(url: &str) -> Option<String> {
    VIDEO_URL
        .captures(url)
        .and_then(|caps| caps.get(3))
        .map(|m| m.as_str().to_string())
}
