#![forbid(unsafe_code)]

//! Serial download queue that fetches YouTube media, optionally converts it to
//! MP3, and reports progress to the submitting WebSocket client.

pub mod channel;
pub mod config;
pub mod error;
pub mod job;
pub mod locator;
pub mod orchestrator;
pub mod progress;
pub mod queue;
pub mod resolver;
pub mod store;
pub mod transcoder;
