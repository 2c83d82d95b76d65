//! Processing flow for a single chunk
//!
//! summarize (bounded by a timeout) → attach summary → count completion

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{PipelineError, SummarizerError};
use crate::models::{Chunk, ProcessedChunk};
use crate::services::Summarizer;
use crate::utils::logging::truncate_text;
use crate::workflow::RunContext;

/// Runs one chunk through the summarizer
///
/// Created once per document run and shared by all chunk tasks.
#[derive(Clone)]
pub struct ChunkFlow {
    summarizer: Arc<dyn Summarizer>,
    timeout: Duration,
}

impl ChunkFlow {
    pub fn new(summarizer: Arc<dyn Summarizer>, timeout: Duration) -> Self {
        Self {
            summarizer,
            timeout,
        }
    }

    /// Summarize chunk `index` and report the completion to the run
    ///
    /// A timeout counts as a transient summarizer failure.
    pub async fn process(
        &self,
        ctx: &RunContext,
        index: usize,
        chunk: Chunk,
    ) -> Result<ProcessedChunk, PipelineError> {
        debug!(
            "{} chunk {} (pages {}-{}): {}",
            ctx,
            index,
            chunk.start_page,
            chunk.end_page,
            truncate_text(&chunk.content, 60)
        );

        let call = self
            .summarizer
            .summarize_chunk(chunk.start_page, chunk.end_page, &chunk.content);
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SummarizerError::transient(format!(
                "no answer within {}s",
                self.timeout.as_secs()
            ))),
        };

        match result {
            Ok(summary) => {
                let progress = ctx.record_completion().await;
                info!(
                    "{} ✓ chunk {}/{} done (pages {}-{}){}",
                    ctx,
                    index + 1,
                    ctx.total_chunks(),
                    chunk.start_page,
                    chunk.end_page,
                    progress.map(|p| format!(", progress {p}%")).unwrap_or_default()
                );
                Ok(ProcessedChunk::new(chunk, summary))
            }
            Err(source) => {
                warn!(
                    "{} ❌ chunk {} (pages {}-{}) failed: {}",
                    ctx,
                    index + 1,
                    chunk.start_page,
                    chunk.end_page,
                    source
                );
                Err(PipelineError::ChunkFailed {
                    index,
                    start_page: chunk.start_page,
                    end_page: chunk.end_page,
                    source,
                })
            }
        }
    }
}
