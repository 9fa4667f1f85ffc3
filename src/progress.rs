#![forbid(unsafe_code)]

//! Wire events pushed to clients and the progress banding used by the
//! orchestrator.
//!
//! A job maps onto one 0-100 scale even though the transfer and the
//! conversion report progress independently. Each stage owns a band and the
//! mapping functions below translate a stage-local fraction into that band.

use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

use crate::channel::{ChannelRegistry, ConnectionId};
use crate::job::{DownloadRequest, JobId};

pub const METADATA_PROGRESS: u8 = 10;
pub const TRANSFER_BASE: u8 = 20;
pub const TRANSCODE_BASE: u8 = 70;
pub const TRANSCODE_SPAN: u8 = 25;

/// Portion of the scale reserved for the byte transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub base: u8,
    pub span: u8,
}

impl Band {
    /// Transfer followed by a conversion: 20-70.
    pub const BEFORE_TRANSCODE: Band = Band {
        base: TRANSFER_BASE,
        span: TRANSCODE_BASE - TRANSFER_BASE,
    };

    /// Transfer is the last stage: 20-95.
    pub const FINAL: Band = Band {
        base: TRANSFER_BASE,
        span: TRANSCODE_BASE + TRANSCODE_SPAN - TRANSFER_BASE,
    };
}

/// `round(received / total * span) + base`, `None` while the size is unknown.
///
/// Rounds half away from zero once, on the scaled stage value.
pub fn transfer_progress(received: u64, total: Option<u64>, band: Band) -> Option<u8> {
    let total = total.filter(|total| *total > 0)?;
    let fraction = (received.min(total) as f64) / (total as f64);
    let scaled = (fraction * f64::from(band.span)).round() as u8;
    Some(band.base + scaled)
}

/// `round(percent * 0.25) + 70`, clamped to the 70-95 band.
pub fn transcode_progress(percent: f64) -> u8 {
    let percent = if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let scaled = (percent * f64::from(TRANSCODE_SPAN) / 100.0).round() as u8;
    TRANSCODE_BASE + scaled
}

/// Messages sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    DownloadQueued {
        id: JobId,
        position: usize,
    },
    DownloadProgress {
        id: JobId,
        progress: u8,
        status: String,
    },
    DownloadComplete {
        id: JobId,
        filename: String,
        path: String,
    },
    DownloadError {
        id: JobId,
        error: String,
    },
    RequestRejected {
        error: String,
    },
}

impl ServerMessage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::DownloadComplete { .. } | Self::DownloadError { .. }
        )
    }
}

/// Messages a client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    StartDownload(DownloadRequest),
}

/// Emits one job's events to whichever channel its owner currently has.
///
/// Progress values never go backwards: anything below the last emitted value
/// is raised to it.
pub struct ProgressReporter {
    id: JobId,
    connection: ConnectionId,
    channels: ChannelRegistry,
    last: AtomicU8,
}

impl ProgressReporter {
    pub fn new(id: JobId, connection: ConnectionId, channels: ChannelRegistry) -> Self {
        Self {
            id,
            connection,
            channels,
            last: AtomicU8::new(0),
        }
    }

    pub fn progress(&self, progress: u8, status: &str) {
        let progress = progress.min(100);
        let previous = self.last.fetch_max(progress, Ordering::Relaxed);
        self.channels.send(
            self.connection,
            ServerMessage::DownloadProgress {
                id: self.id,
                progress: progress.max(previous),
                status: status.to_string(),
            },
        );
    }

    pub fn complete(&self, filename: &str, path: &Path) {
        self.channels.send(
            self.connection,
            ServerMessage::DownloadComplete {
                id: self.id,
                filename: filename.to_string(),
                path: path.to_string_lossy().into_owned(),
            },
        );
    }

    pub fn error(&self, message: &str) {
        self.channels.send(
            self.connection,
            ServerMessage::DownloadError {
                id: self.id,
                error: message.to_string(),
            },
        );
    }
}
