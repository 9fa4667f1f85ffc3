#![forbid(unsafe_code)]

//! FIFO download queue with a single dispatch loop.
//!
//! `submit` appends and returns immediately; the dispatch loop pops one job at
//! a time and awaits it to completion before touching the next. The
//! `Idle`/`Draining` flag is what keeps two loops from ever running at once.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::job::Job;

/// Runs one job to its terminal state. Implementations must not fail: every
/// error is reported through the job's own channel.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    /// Called synchronously inside `submit`, before the dispatch loop can see
    /// the job.
    fn queued(&self, _job: &Job, _position: usize) {}

    async fn process(&self, job: Job);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchState {
    Idle,
    Draining,
}

struct QueueState {
    pending: VecDeque<Job>,
    dispatch: DispatchState,
}

struct QueueInner {
    state: Mutex<QueueState>,
    processor: Arc<dyn JobProcessor>,
}

#[derive(Clone)]
pub struct DownloadQueue {
    inner: Arc<QueueInner>,
}

impl DownloadQueue {
    pub fn new(processor: Arc<dyn JobProcessor>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    dispatch: DispatchState::Idle,
                }),
                processor,
            }),
        }
    }

    /// Appends `job` and kicks the dispatch loop. Returns the 1-based queue
    /// position at submission time.
    pub fn submit(&self, job: Job) -> usize {
        let mut state = self.inner.state.lock();
        state.pending.push_back(job);
        let position = state.pending.len();
        if let Some(job) = state.pending.back() {
            info!(job = %job.id, position, "download queued");
            self.inner.processor.queued(job, position);
        }
        drop(state);

        let queue = self.clone();
        tokio::spawn(async move { queue.drain().await });
        position
    }

    /// Processes queued jobs until the queue is empty. A no-op when another
    /// call is already draining.
    pub async fn drain(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.dispatch == DispatchState::Draining {
                return;
            }
            state.dispatch = DispatchState::Draining;
        }
        debug!("dispatch loop started");

        loop {
            let next = {
                let mut state = self.inner.state.lock();
                let next = state.pending.pop_front();
                if next.is_none() {
                    state.dispatch = DispatchState::Idle;
                }
                next
            };
            let Some(job) = next else {
                break;
            };
            self.inner.processor.process(job).await;
        }
        debug!("dispatch loop idle");
    }

    /// Jobs waiting to start. The running job is not counted.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    pub fn is_draining(&self) -> bool {
        self.inner.state.lock().dispatch == DispatchState::Draining
    }
}
