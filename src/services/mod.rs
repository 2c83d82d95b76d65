//! Capability layer
//!
//! Each service handles a single item (one page set, one chunk, one document)
//! and knows nothing about jobs or scheduling.

pub mod aggregator;
pub mod chunker;
pub mod llm_service;
pub mod prompts;
pub mod summarizer;

pub use aggregator::{aggregate, rank_topics};
pub use chunker::{Chunker, ChunkerConfig};
pub use llm_service::LlmService;
pub use summarizer::Summarizer;
