//! Bounded concurrent chunk processor - orchestration layer
//!
//! Fans a document's chunks out to the summarizer with at most `N` calls in
//! flight and fans the results back in, in input order.
//!
//! Failure policy: the first failing chunk records its error in the run
//! context and halts scheduling. Chunks already in flight are drained and
//! their results discarded. Cancellation behaves the same way.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::error::PipelineError;
use crate::models::{Chunk, ProcessedChunk};
use crate::services::Summarizer;
use crate::workflow::{ChunkFlow, RunContext};

pub struct ChunkProcessor {
    flow: ChunkFlow,
    max_concurrent: usize,
}

impl ChunkProcessor {
    pub fn new(
        summarizer: Arc<dyn Summarizer>,
        max_concurrent: usize,
        chunk_timeout: Duration,
    ) -> Self {
        Self {
            flow: ChunkFlow::new(summarizer, chunk_timeout),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Summarize every chunk; output order equals input order
    pub async fn process_chunks(
        &self,
        chunks: Vec<Chunk>,
        ctx: Arc<RunContext>,
    ) -> Result<Vec<ProcessedChunk>, PipelineError> {
        let total = chunks.len();
        info!(
            "{} 📦 summarizing {} chunks, up to {} at a time",
            ctx, total, self.max_concurrent
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();
        let mut task_index = HashMap::new();

        for (index, chunk) in chunks.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = ctx.cancellation().cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            if ctx.is_halted() {
                break;
            }

            let flow = self.flow.clone();
            let task_ctx = ctx.clone();
            let handle = tasks.spawn(async move {
                let _permit = permit;
                match flow.process(&task_ctx, index, chunk).await {
                    Ok(processed) => (index, Some(processed)),
                    Err(e) => {
                        task_ctx.fail(e).await;
                        (index, None)
                    }
                }
            });
            task_index.insert(handle.id(), index);
        }

        if ctx.is_halted() {
            debug!("{} scheduling stopped, draining {} in-flight chunks", ctx, tasks.len());
        }

        let mut results: Vec<Option<ProcessedChunk>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, (index, processed))) => results[index] = processed,
                Err(e) => {
                    let index = task_index.get(&e.id()).copied().unwrap_or_default();
                    error!("{} chunk task {} did not finish: {}", ctx, index + 1, e);
                    ctx.fail(PipelineError::TaskJoin {
                        index,
                        message: e.to_string(),
                    })
                    .await;
                }
            }
        }

        if let Some(err) = ctx.take_error().await {
            return Err(err);
        }
        if ctx.is_halted() {
            return Err(PipelineError::Cancelled {
                job_id: ctx.job_id().to_string(),
            });
        }

        results
            .into_iter()
            .enumerate()
            .map(|(index, processed)| {
                processed.ok_or_else(|| PipelineError::TaskJoin {
                    index,
                    message: "chunk produced no result".to_string(),
                })
            })
            .collect()
    }
}
