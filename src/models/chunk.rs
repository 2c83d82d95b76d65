use serde::{Deserialize, Serialize};

use super::summary::ChunkSummary;

/// A bounded slice of the document text plus the pages it was drawn from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub start_page: u32,
    pub end_page: u32,
    pub total_pages: u32,
}

impl Chunk {
    /// Page numbers covered by this chunk, inclusive
    pub fn pages(&self) -> std::ops::RangeInclusive<u32> {
        self.start_page..=self.end_page
    }
}

/// A chunk together with its summary
///
/// Serialized flat, so a stored record reads `{content, start_page, ..., summary}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub summary: ChunkSummary,
}

impl ProcessedChunk {
    pub fn new(chunk: Chunk, summary: ChunkSummary) -> Self {
        Self { chunk, summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processed_chunk_serializes_flat() {
        let processed = ProcessedChunk::new(
            Chunk {
                content: "text".to_string(),
                start_page: 2,
                end_page: 3,
                total_pages: 9,
            },
            ChunkSummary {
                summary: "short".to_string(),
                ..Default::default()
            },
        );

        let value = serde_json::to_value(&processed).unwrap();
        assert_eq!(value["start_page"], 2);
        assert_eq!(value["end_page"], 3);
        assert_eq!(value["summary"]["summary"], "short");

        let back: ProcessedChunk = serde_json::from_value(value).unwrap();
        assert_eq!(back, processed);
    }
}
