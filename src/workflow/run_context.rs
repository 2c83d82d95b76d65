//! Per-run context
//!
//! Everything one document run shares between its chunk tasks: completion
//! counter, last reported progress, first error and cancellation. Nothing here
//! is global, so several runs can proceed side by side.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::PipelineError;
use crate::infrastructure::JobStore;

/// Receives aggregate progress percentages
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, progress: u8);
}

/// Writes progress to the job record
pub struct JobProgressSink {
    store: Arc<JobStore>,
    job_id: String,
}

impl JobProgressSink {
    pub fn new(store: Arc<JobStore>, job_id: impl Into<String>) -> Self {
        Self {
            store,
            job_id: job_id.into(),
        }
    }
}

#[async_trait]
impl ProgressSink for JobProgressSink {
    async fn report(&self, progress: u8) {
        // progress is advisory; a failed write must not fail the chunk
        if let Err(e) = self.store.report_progress(&self.job_id, progress).await {
            warn!("[job {}] progress write failed: {}", self.job_id, e);
        }
    }
}

/// `round(100 * completed / total)`, capped at 99
///
/// 100 is reserved for the completed job.
pub fn chunk_progress(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let rounded = (completed * 200 + total) / (total * 2);
    rounded.min(99) as u8
}

#[derive(Default)]
struct RunState {
    completed: usize,
    last_reported: u8,
    first_error: Option<PipelineError>,
}

pub struct RunContext {
    job_id: String,
    total_chunks: usize,
    state: Mutex<RunState>,
    sink: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
}

impl RunContext {
    pub fn new(
        job_id: impl Into<String>,
        total_chunks: usize,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            total_chunks,
            state: Mutex::new(RunState::default()),
            sink,
            cancel,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn total_chunks(&self) -> usize {
        self.total_chunks
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// True once the run failed or was cancelled
    pub fn is_halted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Count one finished chunk and report progress if it went up
    ///
    /// Reports are emitted while holding the state lock, so the sink sees a
    /// strictly increasing sequence. Returns the reported value, if any.
    pub async fn record_completion(&self) -> Option<u8> {
        let mut state = self.state.lock().await;
        if self.is_halted() {
            return None;
        }

        state.completed += 1;
        let progress = chunk_progress(state.completed, self.total_chunks);
        if progress <= state.last_reported {
            return None;
        }

        state.last_reported = progress;
        self.sink.report(progress).await;
        Some(progress)
    }

    /// Record a failure and halt the run; only the first error is kept
    pub async fn fail(&self, error: PipelineError) {
        let mut state = self.state.lock().await;
        if state.first_error.is_none() {
            state.first_error = Some(error);
        }
        self.cancel.cancel();
    }

    pub async fn take_error(&self) -> Option<PipelineError> {
        self.state.lock().await.first_error.take()
    }

    pub async fn completed(&self) -> usize {
        self.state.lock().await.completed
    }
}

impl Display for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[job {}]", self.job_id)
    }
}
