#![forbid(unsafe_code)]

//! Runs one download job from URL to finished artifact.
//!
//! The phases are strictly ordered: validate, resolve metadata, transfer the
//! bytes, and for audio jobs convert them. Every phase reports into the same
//! 0-100 scale through a [`ProgressReporter`], and every exit path ends in
//! exactly one terminal event.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::channel::ChannelRegistry;
use crate::error::{JobError, TransferError};
use crate::job::{Job, TargetFormat};
use crate::locator;
use crate::progress::{
    Band, METADATA_PROGRESS, ProgressReporter, ServerMessage, TRANSCODE_BASE, TRANSFER_BASE,
    transcode_progress, transfer_progress,
};
use crate::queue::JobProcessor;
use crate::resolver::{MediaResolver, Rendition, SourceStream};
use crate::store::{ArtifactStore, artifact_name, remove_quietly};
use crate::transcoder::{AudioCodec, TranscodeRequest, Transcoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Validating,
    Resolving,
    Transferring,
    Transcoding,
    Completed,
    Failed,
}

/// A finished file in the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub path: PathBuf,
}

pub struct Orchestrator {
    resolver: Arc<dyn MediaResolver>,
    transcoder: Arc<dyn Transcoder>,
    store: ArtifactStore,
    channels: ChannelRegistry,
    audio_bitrate_kbps: u32,
}

impl Orchestrator {
    pub fn new(
        resolver: Arc<dyn MediaResolver>,
        transcoder: Arc<dyn Transcoder>,
        store: ArtifactStore,
        channels: ChannelRegistry,
        audio_bitrate_kbps: u32,
    ) -> Self {
        Self {
            resolver,
            transcoder,
            store,
            channels,
            audio_bitrate_kbps,
        }
    }

    /// Runs `job` and emits its terminal event. Never fails.
    pub async fn execute(&self, job: Job) {
        let waited = Utc::now() - job.submitted_at;
        info!(
            job = %job.id,
            connection = %job.connection,
            format = ?job.format,
            waited_ms = waited.num_milliseconds(),
            "starting download"
        );
        if !self.channels.is_connected(job.connection) {
            debug!(job = %job.id, "owner disconnected; events will be dropped");
        }

        let reporter = ProgressReporter::new(job.id, job.connection, self.channels.clone());
        match self.run(&job, &reporter).await {
            Ok(artifact) => {
                enter(&job, JobPhase::Completed);
                info!(job = %job.id, file = %artifact.filename, "download complete");
                reporter.complete(&artifact.filename, &artifact.path);
            }
            Err(err) => {
                enter(&job, JobPhase::Failed);
                warn!(job = %job.id, "download failed: {err}");
                reporter.error(&err.to_string());
            }
        }
    }

    async fn run(&self, job: &Job, reporter: &ProgressReporter) -> Result<Artifact, JobError> {
        enter(job, JobPhase::Validating);
        if !locator::is_valid(&job.locator) {
            return Err(JobError::InvalidLocator);
        }

        enter(job, JobPhase::Resolving);
        self.store.prepare().await?;
        reporter.progress(METADATA_PROGRESS, "Fetching video information...");
        let info = self.resolver.fetch_info(&job.locator).await?;
        let filename = artifact_name(info.display_title(), &info.id, job.format);
        let output = self.store.output_path(&filename);
        let rendition = match job.format {
            TargetFormat::Audio => Rendition::HighestAudio,
            TargetFormat::Muxed => Rendition::Muxed {
                quality: job.quality.clone(),
            },
        };
        let source = self.resolver.open_stream(&info, &rendition).await?;
        reporter.progress(TRANSFER_BASE, "Starting download...");

        // Final bytes land in the work directory and only reach the output
        // directory once complete, so a failed job never touches an earlier
        // artifact of the same name.
        let staging = self.store.staging_path(job.id);
        enter(job, JobPhase::Transferring);
        if !job.format.needs_transcode() {
            transfer(source, &staging, Band::FINAL, "Downloading video...", reporter).await?;
            self.finish(&staging, &output).await?;
            return Ok(Artifact {
                filename,
                path: output,
            });
        }

        let raw = self.store.intermediate_path(job.id, &source.extension);
        transfer(
            source,
            &raw,
            Band::BEFORE_TRANSCODE,
            "Downloading audio...",
            reporter,
        )
        .await?;

        enter(job, JobPhase::Transcoding);
        reporter.progress(TRANSCODE_BASE, "Converting to MP3...");
        let on_progress =
            |percent: f64| reporter.progress(transcode_progress(percent), "Converting...");
        let request = TranscodeRequest {
            input: &raw,
            output: &staging,
            codec: AudioCodec::Mp3,
            bitrate_kbps: self.audio_bitrate_kbps,
        };
        let converted = self.transcoder.transcode(request, &on_progress).await;
        remove_quietly(&raw).await;
        if let Err(err) = converted {
            remove_quietly(&staging).await;
            return Err(err.into());
        }
        self.finish(&staging, &output).await?;

        Ok(Artifact {
            filename,
            path: output,
        })
    }

    async fn finish(&self, staging: &Path, output: &Path) -> Result<(), JobError> {
        if let Err(err) = self.store.promote(staging, output).await {
            remove_quietly(staging).await;
            return Err(err.into());
        }
        Ok(())
    }
}

#[async_trait]
impl JobProcessor for Orchestrator {
    fn queued(&self, job: &Job, position: usize) {
        self.channels.send(
            job.connection,
            ServerMessage::DownloadQueued {
                id: job.id,
                position,
            },
        );
    }

    async fn process(&self, job: Job) {
        self.execute(job).await;
    }
}

fn enter(job: &Job, phase: JobPhase) {
    info!(job = %job.id, ?phase, "phase");
}

/// Streams `source` into `path`, removing the partial file on any failure.
/// `path` is always a work-directory file.
async fn transfer(
    mut source: SourceStream,
    path: &Path,
    band: Band,
    status: &str,
    reporter: &ProgressReporter,
) -> Result<u64, TransferError> {
    let written = write_stream(&mut source, path, band, status, reporter).await;
    if written.is_err() {
        remove_quietly(path).await;
    }
    written
}

async fn write_stream(
    source: &mut SourceStream,
    path: &Path,
    band: Band,
    status: &str,
    reporter: &ProgressReporter,
) -> Result<u64, TransferError> {
    let write_error = |source| TransferError::Write {
        path: path.display().to_string(),
        source,
    };
    let mut file = File::create(path).await.map_err(write_error)?;
    let mut received = 0u64;
    while let Some(chunk) = source.body.next().await {
        let chunk = chunk.map_err(TransferError::Stream)?;
        file.write_all(&chunk).await.map_err(write_error)?;
        received += chunk.len() as u64;
        if let Some(progress) = transfer_progress(received, source.total_bytes, band) {
            reporter.progress(progress, status);
        }
    }
    file.flush().await.map_err(write_error)?;
    debug!(path = %path.display(), bytes = received, "transfer finished");
    Ok(received)
}
