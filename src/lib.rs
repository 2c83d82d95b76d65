//! # Doc Digest
//!
//! Summarizes long documents: pages are split into overlapping, page-labelled
//! chunks, each chunk is summarized with bounded parallelism, and the chunk
//! summaries are merged into one document summary. Job state and progress are
//! tracked in a job record store as the pipeline runs.
//!
//! ## Architecture
//!
//! ### ① Infrastructure
//! - `infrastructure/` - owns storage and parsing, exposes capabilities only
//! - `BlobStore` - document bytes (local filesystem or in-memory)
//! - `JobStore` - job records with per-record locking and atomic persistence
//! - `PageExtractor` - PDF (lopdf) and form-feed separated text
//!
//! ### ② Services
//! - `services/` - single-item capabilities
//! - `Chunker` - page-aware windowed chunking (text-splitter)
//! - `Summarizer` / `LlmService` - chunk and document summaries
//! - `aggregator` - topic ranking and the final document summary
//!
//! ### ③ Workflow
//! - `workflow/` - what happens to one chunk
//! - `RunContext` - per-run progress counter, first error, cancellation
//! - `ChunkFlow` - summarize → attach → count
//!
//! ### ④ Orchestration
//! - `orchestrator/chunk_processor` - bounded concurrent fan-out over chunks
//! - `orchestrator/document_processor` - one document from storage to final record
//! - `orchestrator/job_runner` - background runs, idempotency, cancellation
//! - `orchestrator/batch_processor` - every document in the input folder

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{BlobStore, JobStore, LocalBlobStore, MemoryBlobStore, ObjectLocation};
pub use models::{Chunk, DocumentSummary, JobRecord, JobStatus, Page, ProcessedChunk};
pub use orchestrator::{App, DocumentPipeline, JobOutcome, JobRunner};
pub use services::{Chunker, ChunkerConfig, LlmService, Summarizer};
pub use workflow::RunContext;
