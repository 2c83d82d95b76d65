//! Summarization capability
//!
//! The pipeline treats the summarizer as an opaque collaborator: it may be
//! slow, and it fails with either a transient or a permanent signal.

use async_trait::async_trait;

use crate::error::SummarizerError;
use crate::models::{ChunkSummary, DocumentSummary};

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Structured analysis of one chunk of text covering `start_page..=end_page`
    async fn summarize_chunk(
        &self,
        start_page: u32,
        end_page: u32,
        text: &str,
    ) -> Result<ChunkSummary, SummarizerError>;

    /// Document-level synthesis from the ordered chunk summaries
    ///
    /// `ranked_topics` is the locally computed topic ranking, most frequent first.
    async fn summarize_document(
        &self,
        chunk_summaries: &[ChunkSummary],
        ranked_topics: &[String],
    ) -> Result<DocumentSummary, SummarizerError>;
}
