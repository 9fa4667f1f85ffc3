#![forbid(unsafe_code)]

//! Error taxonomy for the download pipeline.
//!
//! Every variant of [`JobError`] ends up as a single `downloadError` event;
//! nothing here is allowed to escape the orchestrator.

use std::{io, process::ExitStatus};

use thiserror::Error;

/// Failure of a single queued job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid YouTube URL")]
    InvalidLocator,

    #[error(transparent)]
    Resolution(#[from] ResolveError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Metadata or stream lookup failed upstream.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("could not launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("metadata lookup failed for {locator} ({status}): {stderr}")]
    CommandFailed {
        locator: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("could not parse video metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("no {rendition} rendition available for this video")]
    NoRendition { rendition: String },

    #[error("media request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Unavailable(String),
}

/// Network or disk failure while streaming the source.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("download interrupted: {0}")]
    Stream(#[source] io::Error),

    #[error("could not write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// The conversion stage failed.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("could not launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("conversion failed ({status}): {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("conversion I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Local storage layout failure outside of any single transfer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not create directory {path}: {source}")]
    Prepare {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("could not move finished file into {path}: {source}")]
    Promote {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Retrieval of a finished artifact failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("could not open {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}
