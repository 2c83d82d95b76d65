//! Batch document processor - orchestration layer
//!
//! Entry point of the binary. Scans the input folder, uploads every document
//! to blob storage, creates a job per document and runs the jobs with a
//! bounded number of documents in flight. Does not look inside documents;
//! everything per document is delegated to the job runner.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::{content_type_for, BlobStore, JobStore, LocalBlobStore};
use crate::models::JobMetadata;
use crate::orchestrator::document_processor::{DocumentPipeline, JobOutcome};
use crate::orchestrator::job_runner::JobRunner;
use crate::services::{LlmService, Summarizer};
use crate::utils::logging;

/// Application main structure
pub struct App {
    config: Config,
    blobs: Arc<dyn BlobStore>,
    runner: Arc<JobRunner>,
}

impl App {
    /// Build the app with the local blob store, the durable job store and the LLM summarizer
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(&config);

        let store = JobStore::open(&config.db_dir)
            .await
            .with_context(|| format!("failed to open job store at {}", config.db_dir))?;
        let blobs = Arc::new(LocalBlobStore::new(
            &config.storage_root,
            &config.storage_bucket,
        ));
        let summarizer = Arc::new(LlmService::new(&config));

        Self::with_components(config, Arc::new(store), blobs, summarizer)
    }

    /// Build the app around caller-provided collaborators
    pub fn with_components(
        config: Config,
        store: Arc<JobStore>,
        blobs: Arc<dyn BlobStore>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<Self> {
        let pipeline = DocumentPipeline::new(&config, store, blobs.clone(), summarizer)
            .context("invalid pipeline configuration")?;

        Ok(Self {
            config,
            blobs,
            runner: Arc::new(JobRunner::new(Arc::new(pipeline))),
        })
    }

    pub fn runner(&self) -> &Arc<JobRunner> {
        &self.runner
    }

    /// Run every document in the input folder
    pub async fn run(&self) -> Result<ProcessingStats> {
        let documents = self.load_documents().await?;

        if documents.is_empty() {
            warn!("⚠️ no documents found in {}, nothing to do", self.config.input_folder);
            return Ok(ProcessingStats::default());
        }

        logging::log_documents_loaded(documents.len(), self.config.max_concurrent_documents);

        let stats = self.process_all_documents(documents).await;

        logging::print_final_stats(
            stats.success,
            stats.failed,
            stats.total,
            &self.config.output_log_file,
        );

        Ok(stats)
    }

    /// Files directly inside the input folder, sorted by name
    async fn load_documents(&self) -> Result<Vec<PathBuf>> {
        info!("📁 scanning {} for documents...", self.config.input_folder);

        let mut entries = tokio::fs::read_dir(&self.config.input_folder)
            .await
            .with_context(|| format!("cannot read input folder {}", self.config.input_folder))?;

        let mut documents = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_hidden = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with('.'));
            if entry.file_type().await?.is_file() && !is_hidden {
                documents.push(path);
            }
        }
        documents.sort();
        Ok(documents)
    }

    async fn process_all_documents(&self, documents: Vec<PathBuf>) -> ProcessingStats {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_documents.max(1)));
        let total = documents.len();

        let tasks = documents.into_iter().enumerate().map(|(i, path)| {
            let semaphore = semaphore.clone();
            async move {
                let document_index = i + 1;
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => self.process_one(&path, document_index).await,
                    Err(e) => Err(e.into()),
                };
                (document_index, path, result)
            }
        });

        let mut stats = ProcessingStats {
            total,
            ..Default::default()
        };
        for (document_index, path, result) in join_all(tasks).await {
            let line = match result {
                Ok(outcome) if outcome.is_success() => {
                    stats.success += 1;
                    format!("OK      {} job={} chunks={}", path.display(), outcome.job_id, outcome.chunks)
                }
                Ok(outcome) => {
                    stats.failed += 1;
                    format!(
                        "FAILED  {} job={} error={}",
                        path.display(),
                        outcome.job_id,
                        outcome.error.unwrap_or_default()
                    )
                }
                Err(e) => {
                    error!("[document {}] ❌ {:#}", document_index, e);
                    stats.failed += 1;
                    format!("FAILED  {} error={:#}", path.display(), e)
                }
            };
            if let Err(e) = logging::append_log_line(&self.config.output_log_file, &line) {
                warn!("could not write run log: {}", e);
            }
        }

        stats
    }

    /// Upload, register and run one document
    async fn process_one(&self, path: &Path, document_index: usize) -> Result<JobOutcome> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .context("document path has no file name")?;
        info!("[document {}] 📤 uploading {}", document_index, filename);

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?;
        let key = format!("uploads/{}/{}", uuid::Uuid::new_v4(), filename);
        let location = self
            .blobs
            .write(&key, bytes, content_type_for(&key))
            .await?;

        let record = self
            .runner
            .create_job(JobMetadata {
                key,
                filename,
                location,
            })
            .await?;

        let outcome = self.runner.submit(&record.id).await?.await??;
        Ok(outcome)
    }
}

/// Run statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
}
