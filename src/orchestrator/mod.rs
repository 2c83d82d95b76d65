//! Orchestration layer
//!
//! Scheduling and bookkeeping. No summarization logic lives here.
//!
//! ```text
//! batch_processor   (every document in the input folder)
//!     ↓
//! job_runner        (one background task per job, cancellation)
//!     ↓
//! document_processor (one document: read → pages → chunks → summary)
//!     ↓
//! chunk_processor   (bounded fan-out over the chunks)
//!     ↓
//! workflow::ChunkFlow (one chunk)
//!     ↓
//! services → infrastructure
//! ```

pub mod batch_processor;
pub mod chunk_processor;
pub mod document_processor;
pub mod job_runner;

pub use batch_processor::{App, ProcessingStats};
pub use chunk_processor::ChunkProcessor;
pub use document_processor::{DocumentPipeline, JobOutcome};
pub use job_runner::JobRunner;
