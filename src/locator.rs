#![forbid(unsafe_code)]

//! YouTube URL validation. Runs before any network or disk I/O.

use url::Url;

/// Hosts that carry the video id in the `v` query parameter.
const QUERY_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "gaming.youtube.com",
];

/// Path prefixes on youtube.com that carry the id as the next segment.
const PATH_PREFIXES: &[&str] = &["embed", "v", "shorts", "live"];

const VIDEO_ID_LEN: usize = 11;

/// Returns the 11-character video id when `locator` is a recognizable YouTube
/// watch, short, embed, or `youtu.be` URL.
fn video_id(locator: &str) -> Option<String> {
    let url = Url::parse(locator.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();

    let candidate = if host == "youtu.be" {
        url.path_segments()?.next().map(str::to_string)
    } else if QUERY_HOSTS.contains(&host.as_str()) {
        let from_query = url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned());
        match from_query {
            Some(id) => Some(id),
            None => {
                let mut segments = url.path_segments()?;
                let prefix = segments.next()?;
                if PATH_PREFIXES.contains(&prefix) {
                    segments.next().map(str::to_string)
                } else {
                    None
                }
            }
        }
    } else {
        None
    };

    let candidate = candidate?;
    is_video_id(&candidate).then_some(candidate)
}

/// Cheap check used by the queue before a job reaches the resolver.
pub fn is_valid(locator: &str) -> bool {
    video_id(locator).is_some()
}

fn is_video_id(value: &str) -> bool {
    value.len() == VIDEO_ID_LEN
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}
