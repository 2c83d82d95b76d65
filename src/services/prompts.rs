//! Prompt text for the LLM summarizer

use crate::models::ChunkSummary;

pub const CHUNK_SYSTEM_PROMPT: &str = r#"You analyse one chunk of a longer document and return structured metadata used for retrieval, knowledge graph building and a later document-level summary.

Respond with a single JSON object and nothing else:

{
  "summary": "<1-2 factual sentences about this chunk>",
  "topics": ["<high-level theme>"],
  "entities": ["<person, organisation, place, date>"],
  "concepts": ["<abstract or domain concept>"],
  "relationships": [{"subject": "<string>", "relation": "<string>", "object": "<string>"}],
  "use_cases": ["<scenario where this chunk helps>"],
  "search_queries": ["<query that should retrieve this chunk>"],
  "graph_edges": [{"from": "<node>", "to": "<node>", "type": "<edge type>"}]
}

Rules:
- Output valid JSON only, no Markdown and no commentary.
- Use only information present in the text.
- Keep relationships and graph edges consistent and free of duplicates."#;

pub const DOCUMENT_SYSTEM_PROMPT: &str = r#"You combine per-chunk summaries of one document into a document-level synthesis.

Respond with a single JSON object and nothing else:

{
  "document_summary": "<a concise narrative of the whole document>",
  "primary_topics": ["<most prominent topic first>"]
}

Rules:
- Output valid JSON only, no Markdown and no commentary.
- Base the summary only on the chunk summaries provided.
- Rank primary_topics by prominence; the provided topic ranking is a hint."#;

pub fn chunk_user_message(start_page: u32, end_page: u32, text: &str) -> String {
    format!("Document chunk from pages {start_page} to {end_page}:\n{text}")
}

pub fn document_user_message(chunk_summaries: &[ChunkSummary], ranked_topics: &[String]) -> String {
    let mut message = String::from("Chunk summaries in document order:\n");
    if chunk_summaries.is_empty() {
        message.push_str("(the document contained no text)\n");
    }
    for (i, chunk) in chunk_summaries.iter().enumerate() {
        message.push_str(&format!("{}. {}\n", i + 1, chunk.summary));
    }

    if !ranked_topics.is_empty() {
        message.push_str("\nTopics by number of chunks mentioning them:\n");
        message.push_str(&ranked_topics.join(", "));
        message.push('\n');
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_message_lists_summaries_in_order() {
        let chunks = vec![
            ChunkSummary {
                summary: "Intro to rivers.".to_string(),
                ..Default::default()
            },
            ChunkSummary {
                summary: "Flood policy.".to_string(),
                ..Default::default()
            },
        ];

        let message = document_user_message(&chunks, &["rivers".to_string()]);

        let intro = message.find("1. Intro to rivers.").unwrap();
        let policy = message.find("2. Flood policy.").unwrap();
        assert!(intro < policy);
        assert!(message.contains("rivers\n"));
    }

    #[test]
    fn test_chunk_message_names_pages() {
        assert!(chunk_user_message(3, 4, "body").starts_with("Document chunk from pages 3 to 4:"));
    }
}
