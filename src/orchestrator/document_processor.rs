//! Single document processor - orchestration layer
//!
//! Runs one job from its stored document to a terminal record:
//!
//! 1. claim the job (`processing`, progress 0)
//! 2. read the document from blob storage
//! 3. extract pages and chunk them
//! 4. summarize chunks with bounded concurrency, writing progress
//! 5. aggregate into a document summary
//! 6. store results, summary and 100% in one update
//!
//! Any error after the claim ends the job `failed` with that error's message.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, PipelineError, StoreError};
use crate::infrastructure::{extract_pages, BlobStore, JobStore, ObjectLocation};
use crate::models::{DocumentSummary, JobStatus, JobUpdate, ProcessedChunk};
use crate::orchestrator::chunk_processor::ChunkProcessor;
use crate::services::{aggregate, Chunker, Summarizer};
use crate::workflow::{JobProgressSink, RunContext};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub job_id: String,
    pub status: JobStatus,
    pub chunks: usize,
    /// Message of the error that failed the run
    pub error: Option<String>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

pub struct DocumentPipeline {
    store: Arc<JobStore>,
    blobs: Arc<dyn BlobStore>,
    summarizer: Arc<dyn Summarizer>,
    chunker: Chunker,
    chunk_processor: ChunkProcessor,
    job_timeout: Duration,
}

impl DocumentPipeline {
    pub fn new(
        config: &Config,
        store: Arc<JobStore>,
        blobs: Arc<dyn BlobStore>,
        summarizer: Arc<dyn Summarizer>,
    ) -> AppResult<Self> {
        let chunker = Chunker::new(config.chunker_config()?);
        let chunk_processor = ChunkProcessor::new(
            summarizer.clone(),
            config.max_concurrent_chunks,
            config.chunk_timeout(),
        );

        Ok(Self {
            store,
            blobs,
            summarizer,
            chunker,
            chunk_processor,
            job_timeout: config.job_timeout(),
        })
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Process the document at `location` for job `job_id`
    ///
    /// Errors only when the job cannot be claimed: unknown id, or a run for it
    /// is already in progress (that run is left untouched). Every later
    /// failure is recorded on the job and reported in the outcome.
    pub async fn process_document(
        &self,
        job_id: &str,
        location: &str,
        cancel: CancellationToken,
    ) -> AppResult<JobOutcome> {
        let record = self.store.begin_processing(job_id).await?;
        log_document_start(job_id, &record.filename, location);

        let run_cancel = cancel.child_token();
        let result = match tokio::time::timeout(
            self.job_timeout,
            self.run(job_id, location, run_cancel.clone()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                run_cancel.cancel();
                Err(PipelineError::TimedOut {
                    job_id: job_id.to_string(),
                    budget: self.job_timeout,
                }
                .into())
            }
        };

        match result {
            Ok(chunks) => {
                info!("[job {}] ✅ completed with {} chunks", job_id, chunks);
                Ok(JobOutcome {
                    job_id: job_id.to_string(),
                    status: JobStatus::Completed,
                    chunks,
                    error: None,
                })
            }
            Err(err) => self.record_failure(job_id, err).await,
        }
    }

    /// Steps 2-6; returns the number of processed chunks
    async fn run(&self, job_id: &str, location: &str, cancel: CancellationToken) -> AppResult<usize> {
        let location: ObjectLocation = location.parse()?;
        let bytes = self.blobs.read(&location.key).await?;
        info!("[job {}] 📄 read {} bytes from {}", job_id, bytes.len(), location);

        let pages = extract_pages(&location.key, bytes).await?;
        let chunks = self.chunker.chunk(&pages)?;
        info!(
            "[job {}] ✂️ {} pages → {} chunks",
            job_id,
            pages.len(),
            chunks.len()
        );

        if cancel.is_cancelled() {
            return Err(cancelled(job_id));
        }

        let sink = Arc::new(JobProgressSink::new(self.store.clone(), job_id));
        let ctx = Arc::new(RunContext::new(job_id, chunks.len(), sink, cancel.child_token()));
        let processed = self.chunk_processor.process_chunks(chunks, ctx).await?;

        let summary = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(job_id)),
            summary = aggregate(self.summarizer.as_ref(), &processed) => summary?,
        };

        let count = processed.len();
        self.complete(job_id, processed, summary).await?;
        Ok(count)
    }

    async fn complete(
        &self,
        job_id: &str,
        processed: Vec<ProcessedChunk>,
        summary: DocumentSummary,
    ) -> AppResult<()> {
        self.store
            .update(job_id, JobUpdate::completed(processed, summary))
            .await?;
        Ok(())
    }

    async fn record_failure(&self, job_id: &str, err: AppError) -> AppResult<JobOutcome> {
        let message = err.to_string();
        if err.is_cancelled() {
            warn!("[job {}] ⚠️ {}", job_id, message);
        } else {
            error!("[job {}] ❌ processing failed: {}", job_id, message);
        }

        match self.store.update(job_id, JobUpdate::failed(&message)).await {
            Ok(_) => {}
            // deleted while running: nothing left to mark
            Err(StoreError::NotFound { .. }) => {
                info!("[job {}] record removed during the run", job_id);
            }
            Err(store_err) => {
                error!(
                    "[job {}] could not record failure: {}",
                    job_id, store_err
                );
                return Err(store_err.into());
            }
        }

        Ok(JobOutcome {
            job_id: job_id.to_string(),
            status: JobStatus::Failed,
            chunks: 0,
            error: Some(message),
        })
    }
}

fn cancelled(job_id: &str) -> AppError {
    PipelineError::Cancelled {
        job_id: job_id.to_string(),
    }
    .into()
}

fn log_document_start(job_id: &str, filename: &str, location: &str) {
    info!("[job {}] 🚀 processing started", job_id);
    info!("[job {}] file: {}", job_id, filename);
    info!("[job {}] location: {}", job_id, location);
}
