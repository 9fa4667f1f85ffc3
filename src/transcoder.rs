#![forbid(unsafe_code)]

//! Audio conversion stage.
//!
//! [`FfmpegTranscoder`] probes the input duration with `ffprobe`, runs
//! `ffmpeg -progress pipe:1`, and turns the reported output timestamp into a
//! 0-100 percentage.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::TranscodeError;

/// Keep this many trailing stderr lines for error messages.
const STDERR_TAIL_LINES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    Mp3,
}

impl AudioCodec {
    fn muxer(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
        }
    }

    fn encoder(self) -> &'static str {
        match self {
            Self::Mp3 => "libmp3lame",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranscodeRequest<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub codec: AudioCodec,
    pub bitrate_kbps: u32,
}

/// Receives stage-local progress in percent.
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(
        &self,
        request: TranscodeRequest<'_>,
        on_progress: ProgressFn<'_>,
    ) -> Result<(), TranscodeError>;
}

/// One parsed line of ffmpeg's `-progress` key/value output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressLine {
    /// Encoded output position in seconds.
    OutTime(f64),
    End,
}

/// Parses `out_time_us=`, `out_time_ms=` (also microseconds in ffmpeg) and
/// `progress=end`. Everything else is ignored.
pub fn parse_progress_line(line: &str) -> Option<ProgressLine> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" | "out_time_ms" => {
            let micros = value.trim().parse::<i64>().ok()?;
            (micros >= 0).then(|| ProgressLine::OutTime(micros as f64 / 1_000_000.0))
        }
        "progress" if value.trim() == "end" => Some(ProgressLine::End),
        _ => None,
    }
}

/// Percentage of `duration` covered by `position`, capped at 100.
pub fn percent_of(position: f64, duration: f64) -> Option<f64> {
    (duration > 0.0).then(|| (position / duration * 100.0).clamp(0.0, 100.0))
}

pub struct FfmpegTranscoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Input duration in seconds. Missing duration only disables intermediate
    /// progress, so ffprobe failures are logged and swallowed.
    async fn probe_duration(&self, input: &Path) -> Option<f64> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(input)
            .stdin(Stdio::null())
            .output()
            .await;
        match output {
            Ok(output) if output.status.success() => {
                let raw = String::from_utf8_lossy(&output.stdout);
                raw.trim().parse::<f64>().ok().filter(|value| *value > 0.0)
            }
            Ok(output) => {
                warn!(status = %output.status, "ffprobe could not read duration");
                None
            }
            Err(err) => {
                warn!("could not launch ffprobe: {err}");
                None
            }
        }
    }

    fn build_args(request: &TranscodeRequest<'_>) -> Vec<String> {
        vec![
            "-y".into(),
            "-hide_banner".into(),
            "-nostats".into(),
            "-loglevel".into(),
            "error".into(),
            "-progress".into(),
            "pipe:1".into(),
            "-i".into(),
            request.input.to_string_lossy().into_owned(),
            "-vn".into(),
            "-c:a".into(),
            request.codec.encoder().into(),
            "-b:a".into(),
            format!("{}k", request.bitrate_kbps),
            "-f".into(),
            request.codec.muxer().into(),
            request.output.to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        request: TranscodeRequest<'_>,
        on_progress: ProgressFn<'_>,
    ) -> Result<(), TranscodeError> {
        let duration = self.probe_duration(request.input).await;
        let args = Self::build_args(&request);
        debug!(?args, "launching ffmpeg");

        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TranscodeError::Launch {
                program: self.ffmpeg.display().to_string(),
                source,
            })?;

        let mut stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut raw = String::new();
            if let Some(stderr) = stderr.as_mut() {
                if let Err(err) = stderr.read_to_string(&mut raw).await {
                    debug!("could not read ffmpeg stderr: {err}");
                }
            }
            raw
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                match parse_progress_line(&line) {
                    Some(ProgressLine::OutTime(position)) => {
                        if let Some(percent) = duration.and_then(|total| percent_of(position, total))
                        {
                            on_progress(percent);
                        }
                    }
                    Some(ProgressLine::End) => on_progress(100.0),
                    None => {}
                }
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();
        if status.success() {
            Ok(())
        } else {
            Err(TranscodeError::Failed {
                status,
                stderr: tail(&stderr, STDERR_TAIL_LINES),
            })
        }
    }
}

fn tail(text: &str, lines: usize) -> String {
    let kept: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let start = kept.len().saturating_sub(lines);
    kept[start..].join("\n")
}
