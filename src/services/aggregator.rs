//! Final aggregation: chunk summaries → one document summary

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::error::PipelineError;
use crate::models::{ChunkSummary, DocumentSummary, ProcessedChunk};
use crate::services::summarizer::Summarizer;

/// Topics kept from the local ranking when the summarizer names none
pub const FALLBACK_TOPIC_LIMIT: usize = 10;

/// Rank chunk topics by how many chunks mention them
///
/// Case-insensitive; the first spelling seen is kept. Ties go to the topic
/// that appeared first.
pub fn rank_topics(chunks: &[ProcessedChunk]) -> Vec<String> {
    // normalized → (display spelling, chunk count, first appearance)
    let mut counts: HashMap<String, (String, usize, usize)> = HashMap::new();
    let mut order = 0usize;

    for chunk in chunks {
        let mut seen_in_chunk = HashSet::new();
        for topic in &chunk.summary.topics {
            let trimmed = topic.trim();
            if trimmed.is_empty() {
                continue;
            }
            let normalized = trimmed.to_lowercase();
            if !seen_in_chunk.insert(normalized.clone()) {
                continue;
            }
            let entry = counts.entry(normalized).or_insert_with(|| {
                order += 1;
                (trimmed.to_string(), 0, order)
            });
            entry.1 += 1;
        }
    }

    let mut ranked: Vec<(String, usize, usize)> = counts.into_values().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked.into_iter().map(|(topic, _, _)| topic).collect()
}

/// Drop blanks and case-insensitive repeats, keeping order
fn dedup_topics(topics: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    topics
        .into_iter()
        .map(|topic| topic.trim().to_string())
        .filter(|topic| !topic.is_empty() && seen.insert(topic.to_lowercase()))
        .collect()
}

/// One summarizer call over all chunk summaries
///
/// A failure of that call fails the aggregation; nothing partial is returned.
pub async fn aggregate(
    summarizer: &dyn Summarizer,
    chunks: &[ProcessedChunk],
) -> Result<DocumentSummary, PipelineError> {
    let ranked = rank_topics(chunks);
    let summaries: Vec<ChunkSummary> = chunks.iter().map(|c| c.summary.clone()).collect();

    debug!(
        "aggregating {} chunk summaries, {} distinct topics",
        summaries.len(),
        ranked.len()
    );

    let result = summarizer
        .summarize_document(&summaries, &ranked)
        .await
        .map_err(|source| PipelineError::AggregationFailed { source })?;

    let mut primary_topics = dedup_topics(result.primary_topics);
    if primary_topics.is_empty() {
        primary_topics = ranked.into_iter().take(FALLBACK_TOPIC_LIMIT).collect();
    }

    info!("🧩 document summary ready, {} primary topics", primary_topics.len());

    Ok(DocumentSummary {
        document_summary: result.document_summary,
        primary_topics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SummarizerError;
    use crate::models::Chunk;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn processed(topics: &[&str]) -> ProcessedChunk {
        ProcessedChunk::new(
            Chunk {
                content: "text".to_string(),
                start_page: 1,
                end_page: 1,
                total_pages: 1,
            },
            ChunkSummary {
                summary: format!("about {}", topics.join(" and ")),
                topics: topics.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            },
        )
    }

    struct FixedDocumentSummarizer {
        result: Result<DocumentSummary, SummarizerError>,
        calls: AtomicUsize,
        seen_topics: Mutex<Vec<String>>,
    }

    impl FixedDocumentSummarizer {
        fn new(result: Result<DocumentSummary, SummarizerError>) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
                seen_topics: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Summarizer for FixedDocumentSummarizer {
        async fn summarize_chunk(
            &self,
            _start_page: u32,
            _end_page: u32,
            _text: &str,
        ) -> Result<ChunkSummary, SummarizerError> {
            Err(SummarizerError::permanent("not used"))
        }

        async fn summarize_document(
            &self,
            _chunk_summaries: &[ChunkSummary],
            ranked_topics: &[String],
        ) -> Result<DocumentSummary, SummarizerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_topics.lock().unwrap() = ranked_topics.to_vec();
            self.result.clone()
        }
    }

    #[test]
    fn test_rank_topics_by_chunk_frequency() {
        let chunks = vec![
            processed(&["Floods", "policy"]),
            processed(&["floods", "Rivers", "floods"]),
            processed(&["rivers", "FLOODS"]),
            processed(&["budget"]),
        ];

        assert_eq!(
            rank_topics(&chunks),
            vec!["Floods", "Rivers", "policy", "budget"]
        );
    }

    #[tokio::test]
    async fn test_summarizer_topics_win_and_are_deduplicated() {
        let summarizer = FixedDocumentSummarizer::new(Ok(DocumentSummary {
            document_summary: "Overview".to_string(),
            primary_topics: vec!["Policy".into(), "policy".into(), " ".into(), "Rivers".into()],
        }));
        let chunks = vec![processed(&["rivers"]), processed(&["rivers", "policy"])];

        let summary = aggregate(&summarizer, &chunks).await.unwrap();

        assert_eq!(summary.primary_topics, vec!["Policy", "Rivers"]);
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *summarizer.seen_topics.lock().unwrap(),
            vec!["rivers".to_string(), "policy".to_string()]
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_local_ranking() {
        let summarizer = FixedDocumentSummarizer::new(Ok(DocumentSummary {
            document_summary: "Overview".to_string(),
            primary_topics: Vec::new(),
        }));
        let topics: Vec<String> = (0..15).map(|i| format!("topic-{i}")).collect();
        let refs: Vec<&str> = topics.iter().map(String::as_str).collect();

        let summary = aggregate(&summarizer, &[processed(&refs)]).await.unwrap();

        assert_eq!(summary.primary_topics.len(), FALLBACK_TOPIC_LIMIT);
        assert_eq!(summary.primary_topics[0], "topic-0");
    }

    #[tokio::test]
    async fn test_failure_propagates_without_partial_result() {
        let summarizer =
            FixedDocumentSummarizer::new(Err(SummarizerError::transient("rate limited")));

        let err = aggregate(&summarizer, &[processed(&["a"])]).await.unwrap_err();

        assert!(matches!(err, PipelineError::AggregationFailed { .. }));
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_chunks_still_calls_summarizer() {
        let summarizer = FixedDocumentSummarizer::new(Ok(DocumentSummary {
            document_summary: "Empty document.".to_string(),
            primary_topics: Vec::new(),
        }));

        let summary = aggregate(&summarizer, &[]).await.unwrap();

        assert_eq!(summary.document_summary, "Empty document.");
        assert!(summary.primary_topics.is_empty());
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
    }
}
