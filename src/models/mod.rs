pub mod chunk;
pub mod job;
pub mod page;
pub mod summary;

pub use chunk::{Chunk, ProcessedChunk};
pub use job::{JobMetadata, JobRecord, JobStatus, JobUpdate};
pub use page::Page;
pub use summary::{ChunkSummary, DocumentSummary, GraphEdge, Relationship};
