//! In-process job runner - orchestration layer
//!
//! Stands in for a task queue: each submitted job runs on its own tokio task
//! with a cancellation token kept in a registry until the run ends.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{AppError, AppResult, StoreError};
use crate::infrastructure::JobStore;
use crate::models::{DocumentSummary, JobMetadata, JobRecord, JobStatus};
use crate::orchestrator::document_processor::{DocumentPipeline, JobOutcome};

pub struct JobRunner {
    pipeline: Arc<DocumentPipeline>,
    active: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl JobRunner {
    pub fn new(pipeline: Arc<DocumentPipeline>) -> Self {
        Self {
            pipeline,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn store(&self) -> &Arc<JobStore> {
        self.pipeline.store()
    }

    /// Register a new `queued` job with a fresh id
    pub async fn create_job(&self, metadata: JobMetadata) -> AppResult<JobRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        Ok(self.store().create(&id, metadata).await?)
    }

    /// Start processing `job_id` in the background
    ///
    /// Rejected with `AlreadyProcessing` while a run for the job is active.
    pub async fn submit(&self, job_id: &str) -> AppResult<JoinHandle<AppResult<JobOutcome>>> {
        let record = self.store().get(job_id).await?;
        if record.status == JobStatus::Processing {
            return Err(AppError::already_processing(job_id));
        }

        let cancel = CancellationToken::new();
        {
            let mut active = lock(&self.active);
            if active.contains_key(job_id) {
                return Err(AppError::already_processing(job_id));
            }
            active.insert(job_id.to_string(), cancel.clone());
        }

        info!("[job {}] 📨 submitted", job_id);

        let pipeline = self.pipeline.clone();
        let active = self.active.clone();
        let job_id = job_id.to_string();
        let location = record.location;
        Ok(tokio::spawn(async move {
            let outcome = pipeline
                .process_document(&job_id, &location, cancel)
                .await;
            lock(&active).remove(&job_id);
            outcome
        }))
    }

    /// Stop an active run; returns false when the job is not running here
    pub fn cancel(&self, job_id: &str) -> bool {
        match lock(&self.active).get(job_id) {
            Some(token) => {
                warn!("[job {}] cancellation requested", job_id);
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel any active run, then remove the record
    pub async fn delete(&self, job_id: &str) -> AppResult<JobRecord> {
        self.cancel(job_id);
        let record = self.store().delete(job_id).await?;
        info!("[job {}] 🗑️ deleted", job_id);
        Ok(record)
    }

    /// Current record; never an error for an existing job, even a failed one
    pub async fn status(&self, job_id: &str) -> AppResult<JobRecord> {
        Ok(self.store().get(job_id).await?)
    }

    /// Final summary of a completed job
    pub async fn document_summary(&self, job_id: &str) -> AppResult<DocumentSummary> {
        let record = self.store().get(job_id).await?;
        match (record.status, record.final_summary) {
            (JobStatus::Completed, Some(summary)) => Ok(summary),
            (status, _) => Err(StoreError::NotCompleted {
                id: job_id.to_string(),
                status: status.to_string(),
            }
            .into()),
        }
    }

    pub async fn list(&self) -> Vec<JobRecord> {
        self.store().list().await
    }

    /// Ids of jobs with a run in progress
    pub fn active_jobs(&self) -> Vec<String> {
        lock(&self.active).keys().cloned().collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // the registry holds plain data, so a poisoned lock is still usable
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::infrastructure::{BlobStore, MemoryBlobStore};
    use crate::orchestrator::chunk_processor::tests::ScriptedSummarizer;
    use std::time::Duration;

    async fn runner_with(delay: Duration) -> (JobRunner, String) {
        let store = Arc::new(JobStore::in_memory());
        let blobs = Arc::new(MemoryBlobStore::new("bucket"));
        let text = "Some words about lakes. ".repeat(60);
        let location = blobs
            .write("uploads/a/doc.txt", text.into_bytes(), "text/plain")
            .await
            .unwrap();

        let config = Config {
            chunk_size: 300,
            chunk_overlap: 30,
            ..Config::default()
        };
        let pipeline = DocumentPipeline::new(
            &config,
            store,
            blobs,
            Arc::new(ScriptedSummarizer::with_delay(delay)),
        )
        .unwrap();
        let runner = JobRunner::new(Arc::new(pipeline));
        let record = runner
            .create_job(JobMetadata {
                key: "uploads/a/doc.txt".to_string(),
                filename: "doc.txt".to_string(),
                location,
            })
            .await
            .unwrap();
        (runner, record.id)
    }

    #[tokio::test]
    async fn test_submit_runs_to_completion() {
        let (runner, id) = runner_with(Duration::from_millis(1)).await;

        assert!(matches!(
            runner.document_summary(&id).await,
            Err(AppError::Store(StoreError::NotCompleted { .. }))
        ));

        let outcome = runner.submit(&id).await.unwrap().await.unwrap().unwrap();

        assert!(outcome.is_success());
        assert_eq!(runner.status(&id).await.unwrap().progress, 100);
        assert!(runner.document_summary(&id).await.is_ok());
        assert!(runner.active_jobs().is_empty());
    }

    #[tokio::test]
    async fn test_double_submit_is_rejected() {
        let (runner, id) = runner_with(Duration::from_millis(50)).await;

        let handle = runner.submit(&id).await.unwrap();
        let second = runner.submit(&id).await;

        assert!(matches!(
            second,
            Err(AppError::Store(StoreError::AlreadyProcessing { .. }))
        ));
        assert!(handle.await.unwrap().unwrap().is_success());
    }

    #[tokio::test]
    async fn test_cancel_marks_job_failed() {
        let (runner, id) = runner_with(Duration::from_millis(100)).await;

        let handle = runner.submit(&id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(runner.cancel(&id));

        let outcome = handle.await.unwrap().unwrap();
        let record = runner.status(&id).await.unwrap();

        assert_eq!(outcome.status, JobStatus::Failed);
        assert_eq!(record.status, JobStatus::Failed);
        assert!(record.final_summary.is_none());
        assert!(!runner.cancel(&id));
    }

    #[tokio::test]
    async fn test_delete_while_running_removes_record() {
        let (runner, id) = runner_with(Duration::from_millis(100)).await;

        let handle = runner.submit(&id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        runner.delete(&id).await.unwrap();

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.status, JobStatus::Failed);
        assert!(matches!(
            runner.status(&id).await,
            Err(AppError::Store(StoreError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let (runner, _) = runner_with(Duration::ZERO).await;
        assert!(matches!(
            runner.submit("nope").await,
            Err(AppError::Store(StoreError::NotFound { .. }))
        ));
        assert!(runner.delete("nope").await.is_err());
    }
}
