use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Job record store error
    #[error("job store error: {0}")]
    Store(#[from] StoreError),
    /// Blob storage error
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    /// Page extraction error
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),
    /// Summarization collaborator error
    #[error("summarizer error: {0}")]
    Summarizer(#[from] SummarizerError),
    /// Pipeline run error
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Window size must be positive
    #[error("window_size must be a positive integer (got {window_size})")]
    InvalidWindowSize { window_size: usize },
    /// Overlap must be smaller than the window
    #[error("overlap ({overlap}) must be less than window_size ({window_size})")]
    InvalidOverlap { overlap: usize, window_size: usize },
    /// Concurrency limit must be positive
    #[error("{name} must be at least 1")]
    InvalidConcurrency { name: &'static str },
    /// Environment variable could not be parsed
    #[error("environment variable {var_name}: value '{value}' is not a valid {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// Config file could not be read
    #[error("failed to read config file {}: {source}", path.display())]
    FileReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Config file is not valid TOML
    #[error("failed to parse config file {}: {source}", path.display())]
    TomlParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Job record store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with this id
    #[error("job {id} not found")]
    NotFound { id: String },
    /// A record with this id already exists
    #[error("job {id} already exists")]
    Duplicate { id: String },
    /// A run for this id is in progress
    #[error("job {id} is already processing")]
    AlreadyProcessing { id: String },
    /// The job has no final result yet
    #[error("job {id} is not yet fully processed (status: {status})")]
    NotCompleted { id: String, status: String },
    /// The update would leave the record in an invalid state
    #[error("rejected update to job {id}: {reason}")]
    InvalidUpdate { id: String, reason: String },
    /// Durable write or read failed
    #[error("failed to persist job record at {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A persisted record could not be decoded
    #[error("corrupt job record at {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Blob storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Location string is not `scheme://bucket/key`
    #[error("invalid object location: {location}")]
    InvalidLocation { location: String },
    /// No object stored under this key
    #[error("object not found: {key}")]
    ObjectNotFound { key: String },
    /// Backend I/O failure
    #[error("storage I/O failed for {key}: {source}")]
    Io {
        key: String,
        source: std::io::Error,
    },
}

/// Page extraction errors
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The bytes are not a readable PDF
    #[error("failed to parse PDF: {source}")]
    PdfParseFailed { source: lopdf::Error },
    /// The extraction task itself failed
    #[error("extraction task failed: {message}")]
    TaskFailed { message: String },
}

/// Failure signals of the summarization collaborator
#[derive(Debug, Clone, Error)]
pub enum SummarizerError {
    /// May succeed on retry
    #[error("transient summarizer failure: {message}")]
    Transient { message: String },
    /// Will not succeed on retry
    #[error("permanent summarizer failure: {message}")]
    Permanent { message: String },
}

impl SummarizerError {
    pub fn transient(message: impl Into<String>) -> Self {
        SummarizerError::Transient {
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        SummarizerError::Permanent {
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, SummarizerError::Transient { .. })
    }
}

/// Errors raised while a document run is in progress
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A chunk's summarization call failed
    #[error("chunk {index} (pages {start_page}-{end_page}) failed: {source}")]
    ChunkFailed {
        index: usize,
        start_page: u32,
        end_page: u32,
        source: SummarizerError,
    },
    /// The document-level summarization call failed
    #[error("final aggregation failed: {source}")]
    AggregationFailed { source: SummarizerError },
    /// The run was stopped from outside
    #[error("job {job_id} was cancelled")]
    Cancelled { job_id: String },
    /// The run exceeded its wall-clock budget
    #[error("job {job_id} exceeded its time budget of {}s", budget.as_secs())]
    TimedOut { job_id: String, budget: Duration },
    /// A spawned chunk task panicked or was aborted
    #[error("chunk task {index} did not finish: {message}")]
    TaskJoin { index: usize, message: String },
}

// ========== Convenience constructors ==========

impl AppError {
    /// Job already has a run in progress
    pub fn already_processing(id: impl Into<String>) -> Self {
        AppError::Store(StoreError::AlreadyProcessing { id: id.into() })
    }

    /// True when the job was stopped from outside rather than failing on its own
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Pipeline(PipelineError::Cancelled { .. }))
    }

    /// True for errors a caller could reasonably retry
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Summarizer(e) => e.is_transient(),
            AppError::Pipeline(PipelineError::ChunkFailed { source, .. })
            | AppError::Pipeline(PipelineError::AggregationFailed { source }) => {
                source.is_transient()
            }
            AppError::Pipeline(PipelineError::TimedOut { .. }) => true,
            AppError::Storage(StorageError::Io { .. }) => true,
            _ => false,
        }
    }
}

// ========== Result alias ==========

/// Application result type
pub type AppResult<T> = Result<T, AppError>;
