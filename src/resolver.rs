#![forbid(unsafe_code)]

//! Media resolution: turns a YouTube URL into metadata and a byte stream for
//! one rendition.
//!
//! The [`MediaResolver`] trait is the seam the orchestrator depends on. The
//! production implementation asks `yt-dlp` for the video's JSON description,
//! picks a format, and streams the format URL over HTTP.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::ResolveError;

pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Subset of yt-dlp's `--dump-single-json` output the pipeline needs.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaInfo {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub fulltitle: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub formats: Vec<MediaFormat>,
}

impl MediaInfo {
    /// Human title, falling back to the video id.
    pub fn display_title(&self) -> &str {
        non_blank(self.fulltitle.as_deref())
            .or_else(|| non_blank(self.title.as_deref()))
            .unwrap_or(&self.id)
    }
}

fn non_blank(title: Option<&str>) -> Option<&str> {
    title.filter(|title| !title.trim().is_empty())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaFormat {
    pub format_id: String,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub abr: Option<f64>,
    #[serde(default)]
    pub tbr: Option<f64>,
    #[serde(default)]
    pub height: Option<i64>,
    #[serde(default)]
    pub http_headers: HashMap<String, String>,
}

impl MediaFormat {
    fn has_audio(&self) -> bool {
        codec_present(self.acodec.as_deref())
    }

    fn has_video(&self) -> bool {
        codec_present(self.vcodec.as_deref())
    }

    fn audio_rate(&self) -> f64 {
        self.abr.or(self.tbr).unwrap_or(0.0)
    }
}

fn codec_present(codec: Option<&str>) -> bool {
    codec.is_some_and(|codec| !codec.is_empty() && codec != "none")
}

/// Which stream to fetch for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendition {
    /// Best audio track; converted afterwards.
    HighestAudio,
    /// Audio and video in one stream. `quality` is `highest`, `lowest`, a
    /// height label such as `720p`, or a raw format id.
    Muxed { quality: String },
}

impl Rendition {
    fn label(&self) -> String {
        match self {
            Self::HighestAudio => "audio".to_string(),
            Self::Muxed { quality } => format!("{quality} audio+video"),
        }
    }
}

/// Open handle on the remote bytes.
pub struct SourceStream {
    /// Expected size, when the server announced one.
    pub total_bytes: Option<u64>,
    /// Container extension reported for the selected format.
    pub extension: String,
    pub body: ByteStream,
}

#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn fetch_info(&self, locator: &str) -> Result<MediaInfo, ResolveError>;

    async fn open_stream(
        &self,
        info: &MediaInfo,
        rendition: &Rendition,
    ) -> Result<SourceStream, ResolveError>;
}

/// Picks the format matching `rendition`. Only formats with a direct URL are
/// candidates.
pub fn select_format<'a>(
    formats: &'a [MediaFormat],
    rendition: &Rendition,
) -> Option<&'a MediaFormat> {
    let usable = || formats.iter().filter(|format| format.url.is_some());
    match rendition {
        Rendition::HighestAudio => {
            let best_audio_only = usable()
                .filter(|format| format.has_audio() && !format.has_video())
                .max_by(|a, b| a.audio_rate().total_cmp(&b.audio_rate()));
            best_audio_only.or_else(|| {
                usable()
                    .filter(|format| format.has_audio())
                    .max_by(|a, b| a.audio_rate().total_cmp(&b.audio_rate()))
            })
        }
        Rendition::Muxed { quality } => {
            let muxed = || usable().filter(|format| format.has_audio() && format.has_video());
            let by_size = |a: &&MediaFormat, b: &&MediaFormat| {
                a.height
                    .unwrap_or(0)
                    .cmp(&b.height.unwrap_or(0))
                    .then(a.tbr.unwrap_or(0.0).total_cmp(&b.tbr.unwrap_or(0.0)))
            };
            let quality = quality.trim().to_ascii_lowercase();
            match quality.as_str() {
                "" | "highest" | "highestvideo" => muxed().max_by(by_size),
                "lowest" | "lowestvideo" => muxed().min_by(by_size),
                label => {
                    let height = label
                        .strip_suffix('p')
                        .and_then(|value| value.parse::<i64>().ok());
                    muxed()
                        .filter(|format| match height {
                            Some(height) => format.height == Some(height),
                            None => format.format_id.eq_ignore_ascii_case(label),
                        })
                        .max_by(by_size)
                }
            }
        }
    }
}

/// Resolver backed by the `yt-dlp` executable and a plain HTTP client.
pub struct YtDlpResolver {
    program: PathBuf,
    cookies: Option<PathBuf>,
    client: reqwest::Client,
}

impl YtDlpResolver {
    pub fn new(program: impl Into<PathBuf>, cookies: Option<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cookies,
            client: reqwest::Client::new(),
        }
    }

    fn command(&self, locator: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("--dump-single-json")
            .arg("--skip-download")
            .arg("--no-warnings")
            .arg("--no-progress")
            .arg("--no-playlist");
        if let Some(cookies) = self.cookies.as_ref().filter(|path| path.exists()) {
            command.arg("--cookies").arg(cookies);
        }
        command
            .arg(locator)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl MediaResolver for YtDlpResolver {
    async fn fetch_info(&self, locator: &str) -> Result<MediaInfo, ResolveError> {
        let output = self
            .command(locator)
            .output()
            .await
            .map_err(|source| ResolveError::Launch {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ResolveError::CommandFailed {
                locator: locator.to_string(),
                status: output.status,
                stderr: last_line(&String::from_utf8_lossy(&output.stderr)),
            });
        }

        let info: MediaInfo = serde_json::from_slice(&output.stdout)?;
        debug!(video = %info.id, formats = info.formats.len(), "resolved metadata");
        Ok(info)
    }

    async fn open_stream(
        &self,
        info: &MediaInfo,
        rendition: &Rendition,
    ) -> Result<SourceStream, ResolveError> {
        let format =
            select_format(&info.formats, rendition).ok_or_else(|| ResolveError::NoRendition {
                rendition: rendition.label(),
            })?;
        let Some(url) = format.url.as_deref() else {
            return Err(ResolveError::NoRendition {
                rendition: rendition.label(),
            });
        };
        debug!(video = %info.id, format = %format.format_id, "opening media stream");

        let response = self
            .client
            .get(url)
            .headers(header_map(&format.http_headers))
            .send()
            .await?
            .error_for_status()?;
        let total_bytes = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(io::Error::other))
            .boxed();

        Ok(SourceStream {
            total_bytes,
            extension: format.ext.clone().unwrap_or_else(|| "bin".to_string()),
            body,
        })
    }
}

fn header_map(headers: &HashMap<String, String>) -> HeaderMap {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
            let value = HeaderValue::from_str(value).ok()?;
            Some((name, value))
        })
        .collect()
}

fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("no error output")
        .to_string()
}
