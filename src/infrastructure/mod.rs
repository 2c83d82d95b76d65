//! Infrastructure layer
//!
//! Owns storage and document parsing. Exposes capabilities only, no flow.

pub mod blob_store;
pub mod extractor;
pub mod job_store;

pub use blob_store::{content_type_for, BlobStore, LocalBlobStore, MemoryBlobStore, ObjectLocation};
pub use extractor::{extract_pages, extractor_for, PageExtractor, PdfPageExtractor, TextPageExtractor};
pub use job_store::JobStore;
