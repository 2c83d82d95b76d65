use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::chunk::ProcessedChunk;
use super::summary::DocumentSummary;

/// Lifecycle state of a document job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed or failed
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Upload metadata recorded when a job is created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    /// Storage key of the uploaded document
    pub key: String,
    /// Original file name
    pub filename: String,
    /// Opaque storage locator handed to the pipeline
    pub location: String,
}

/// Durable state of one document job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub location: String,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<ProcessedChunk>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_summary: Option<DocumentSummary>,
    #[serde(default)]
    pub key_terms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// A freshly submitted job: queued, no progress
    pub fn new(id: impl Into<String>, metadata: JobMetadata) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            key: metadata.key,
            filename: metadata.filename,
            location: metadata.location,
            status: JobStatus::Queued,
            progress: 0,
            chunks: None,
            final_summary: None,
            key_terms: Vec::new(),
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of processed chunks, 0 before the chunk phase completes
    pub fn chunk_count(&self) -> usize {
        self.chunks.as_ref().map_or(0, Vec::len)
    }

    /// Checks `completed ⇒ progress == 100 ∧ final_summary`
    pub(crate) fn violates_completion_invariant(&self) -> bool {
        self.status == JobStatus::Completed
            && (self.progress != 100 || self.final_summary.is_none())
    }
}

/// Partial update applied atomically by the job store
///
/// Fields left as `None` are untouched.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub chunks: Option<Vec<ProcessedChunk>>,
    pub final_summary: Option<DocumentSummary>,
    pub key_terms: Option<Vec<String>>,
    pub error_message: Option<String>,
}

impl JobUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress.min(100));
        self
    }

    pub fn chunks(mut self, chunks: Vec<ProcessedChunk>) -> Self {
        self.chunks = Some(chunks);
        self
    }

    pub fn final_summary(mut self, summary: DocumentSummary) -> Self {
        self.key_terms = Some(summary.primary_topics.clone());
        self.final_summary = Some(summary);
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Terminal success: results, summary, status and 100% in one write
    pub fn completed(chunks: Vec<ProcessedChunk>, summary: DocumentSummary) -> Self {
        Self::new()
            .status(JobStatus::Completed)
            .progress(100)
            .chunks(chunks)
            .final_summary(summary)
    }

    /// Terminal failure; progress is left at its last observed value
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new().status(JobStatus::Failed).error_message(message)
    }

    pub(crate) fn apply_to(self, record: &mut JobRecord, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(progress) = self.progress {
            record.progress = progress;
        }
        if let Some(chunks) = self.chunks {
            record.chunks = Some(chunks);
        }
        if let Some(summary) = self.final_summary {
            record.final_summary = Some(summary);
        }
        if let Some(key_terms) = self.key_terms {
            record.key_terms = key_terms;
        }
        if let Some(message) = self.error_message {
            record.error_message = Some(message);
        }
        record.updated_at = now;
    }
}
