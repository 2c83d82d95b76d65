use serde::{Deserialize, Serialize};

/// Semantic triple extracted from a chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

/// Edge between two concepts or entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub edge_type: String,
}

/// Structured analysis of a single chunk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub summary: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub use_cases: Vec<String>,
    #[serde(default)]
    pub search_queries: Vec<String>,
    #[serde(default)]
    pub graph_edges: Vec<GraphEdge>,
}

/// Document-level synthesis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_summary: String,
    /// Ranked, most prominent first
    #[serde(default)]
    pub primary_topics: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_summary_defaults_missing_lists() {
        let parsed: ChunkSummary = serde_json::from_str(
            r#"{"summary": "About floods.", "graph_edges": [{"from": "a", "to": "b", "type": "causes"}]}"#,
        )
        .unwrap();

        assert_eq!(parsed.summary, "About floods.");
        assert!(parsed.topics.is_empty());
        assert_eq!(parsed.graph_edges[0].edge_type, "causes");
    }
}
