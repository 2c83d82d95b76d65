//! Workflow layer
//!
//! Defines what happening to one chunk means, plus the context a document run
//! shares across its chunks.

pub mod chunk_flow;
pub mod run_context;

pub use chunk_flow::ChunkFlow;
pub use run_context::{chunk_progress, JobProgressSink, ProgressSink, RunContext};
