#![forbid(unsafe_code)]

//! Job shape shared by the WebSocket submission surface and the queue.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channel::ConnectionId;

pub const DEFAULT_QUALITY: &str = "highest";

/// Opaque job identifier handed back in `downloadQueued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Requested output. Audio jobs go through the conversion stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Audio,
    Muxed,
}

impl TargetFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mp3" | "audio" => Some(Self::Audio),
            "mp4" | "video" => Some(Self::Muxed),
            _ => None,
        }
    }

    /// File extension of the finished artifact.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Audio => "mp3",
            Self::Muxed => "mp4",
        }
    }

    pub fn needs_transcode(self) -> bool {
        matches!(self, Self::Audio)
    }
}

/// Body of a `startDownload` message and of the stub HTTP route.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    #[serde(default)]
    pub video_url: String,
    pub format: String,
    #[serde(default)]
    pub quality: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub locator: String,
    pub format: TargetFormat,
    pub quality: String,
    pub connection: ConnectionId,
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    pub fn new(
        locator: impl Into<String>,
        format: TargetFormat,
        quality: Option<String>,
        connection: ConnectionId,
    ) -> Self {
        let quality = quality
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_QUALITY.to_string());
        Self {
            id: JobId::new(),
            locator: locator.into(),
            format,
            quality,
            connection,
            submitted_at: Utc::now(),
        }
    }

    /// Builds a job from a wire request, rejecting unknown formats.
    pub fn from_request(request: DownloadRequest, connection: ConnectionId) -> Option<Self> {
        let format = TargetFormat::parse(&request.format)?;
        Some(Self::new(
            request.video_url,
            format,
            request.quality,
            connection,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_format_parses_aliases() {
        assert_eq!(TargetFormat::parse("MP3"), Some(TargetFormat::Audio));
        assert_eq!(TargetFormat::parse(" audio "), Some(TargetFormat::Audio));
        assert_eq!(TargetFormat::parse("mp4"), Some(TargetFormat::Muxed));
        assert_eq!(TargetFormat::parse("video"), Some(TargetFormat::Muxed));
        assert_eq!(TargetFormat::parse("flac"), None);
    }

    #[test]
    fn job_defaults_blank_quality() {
        let job = Job::new("url", TargetFormat::Muxed, Some("  ".into()), ConnectionId::from_raw(1));
        assert_eq!(job.quality, DEFAULT_QUALITY);
        let job = Job::new("url", TargetFormat::Muxed, Some("720p".into()), ConnectionId::from_raw(1));
        assert_eq!(job.quality, "720p");
    }

    #[test]
    fn from_request_rejects_unknown_format() {
        let request: DownloadRequest = serde_json::from_str(
            r#"{"videoUrl":"https://youtu.be/dQw4w9WgXcQ","format":"ogg"}"#,
        )
        .unwrap();
        assert!(Job::from_request(request, ConnectionId::from_raw(7)).is_none());
    }

    #[test]
    fn job_ids_are_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }
}
