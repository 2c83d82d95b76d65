//! Page-aware windowed chunker
//!
//! Pages are joined into one buffer of `[Page n]` sections. The buffer is
//! split into overlapping windows by `text-splitter`, and every window is
//! labelled with the range of pages it touches. Window positions come from the
//! splitter's own byte offsets, converted to char offsets.

use std::ops::RangeInclusive;

use text_splitter::{ChunkConfig, TextSplitter};
use tracing::debug;

use crate::error::ConfigError;
use crate::models::{Chunk, Page};

/// Validated window parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    window_size: usize,
    overlap: usize,
}

impl ChunkerConfig {
    /// Fails unless `window_size > 0` and `overlap < window_size`
    pub fn new(window_size: usize, overlap: usize) -> Result<Self, ConfigError> {
        if window_size == 0 {
            return Err(ConfigError::InvalidWindowSize { window_size });
        }
        if overlap >= window_size {
            return Err(ConfigError::InvalidOverlap {
                overlap,
                window_size,
            });
        }
        Ok(Self {
            window_size,
            overlap,
        })
    }
}

/// Inclusive character span of one page inside the joined buffer
#[derive(Debug, Clone, Copy)]
struct PageSpan {
    start: usize,
    end: usize,
    number: u32,
}

impl PageSpan {
    fn intersects(&self, window: &RangeInclusive<usize>) -> bool {
        !(self.end < *window.start() || self.start > *window.end())
    }
}

/// Splits extracted pages into overlapping, page-labelled chunks
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn chunk(&self, pages: &[Page]) -> Result<Vec<Chunk>, ConfigError> {
        let Some(first) = pages.first() else {
            return Ok(Vec::new());
        };
        let total_pages = first.total_pages;

        let (buffer, spans) = build_buffer(pages);

        let splitter_config = ChunkConfig::new(self.config.window_size)
            .with_overlap(self.config.overlap)
            .map_err(|_| ConfigError::InvalidOverlap {
                overlap: self.config.overlap,
                window_size: self.config.window_size,
            })?
            .with_trim(true);
        let splitter = TextSplitter::new(splitter_config);

        let mut chunks = Vec::new();
        // (byte, char) position of the previous window start, for incremental conversion
        let mut last_offset = (0usize, 0usize);

        for (byte_offset, window) in splitter.chunk_indices(&buffer) {
            let len = window.chars().count();
            if len == 0 {
                continue;
            }

            let (last_byte, last_char) = last_offset;
            let start = last_char + buffer[last_byte..byte_offset].chars().count();
            last_offset = (byte_offset, start);
            let range = start..=start + len - 1;

            let contributing = spans
                .iter()
                .filter(|span| span.intersects(&range))
                .map(|span| span.number);
            let Some((start_page, end_page)) = contributing.fold(None, |acc, n| match acc {
                None => Some((n, n)),
                Some((lo, hi)) => Some((u32::min(lo, n), u32::max(hi, n))),
            }) else {
                debug!("dropping window at {:?} with no contributing pages", range);
                continue;
            };

            let content = window.trim();
            if content.is_empty() {
                continue;
            }

            chunks.push(Chunk {
                content: content.to_string(),
                start_page,
                end_page,
                total_pages,
            });
        }

        debug!(
            "chunked {} pages into {} chunks (window {}, overlap {})",
            pages.len(),
            chunks.len(),
            self.config.window_size,
            self.config.overlap
        );

        Ok(chunks)
    }
}

/// Joins page sections and records each section's inclusive char span
fn build_buffer(pages: &[Page]) -> (String, Vec<PageSpan>) {
    let mut buffer = String::new();
    let mut spans = Vec::with_capacity(pages.len());
    let mut position = 0usize;

    for page in pages {
        let section = page.marked_text();
        let len = section.chars().count();
        spans.push(PageSpan {
            start: position,
            end: position + len - 1,
            number: page.number,
        });
        position += len;
        buffer.push_str(&section);
    }

    (buffer, spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages_of(texts: &[String]) -> Vec<Page> {
        let total = texts.len() as u32;
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| Page::new(i as u32 + 1, text.clone(), total))
            .collect()
    }

    fn words(count: usize, word: &str) -> String {
        vec![word; count].join(" ")
    }

    fn covered_pages(chunks: &[Chunk]) -> Vec<u32> {
        let mut pages: Vec<u32> = chunks.iter().flat_map(|c| c.pages()).collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }

    #[test]
    fn test_config_validation() {
        assert!(matches!(
            ChunkerConfig::new(0, 0),
            Err(ConfigError::InvalidWindowSize { .. })
        ));
        assert!(matches!(
            ChunkerConfig::new(100, 100),
            Err(ConfigError::InvalidOverlap { .. })
        ));
        assert!(ChunkerConfig::new(100, 99).is_ok());
    }

    #[test]
    fn test_empty_page_set() {
        let chunker = Chunker::new(ChunkerConfig::new(100, 10).unwrap());
        assert!(chunker.chunk(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_single_short_page_is_one_chunk() {
        let chunker = Chunker::new(ChunkerConfig::new(1000, 100).unwrap());
        let pages = pages_of(&["A short page of text.".to_string()]);

        let chunks = chunker.chunk(&pages).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_page, 1);
        assert_eq!(chunks[0].end_page, 1);
        assert_eq!(chunks[0].total_pages, 1);
        assert!(chunks[0].content.starts_with("[Page 1]"));
    }

    #[test]
    fn test_two_pages_window_100_overlap_10() {
        // sections of 90 and 100 characters
        let pages = pages_of(&["a".repeat(80), "b".repeat(90)]);

        let chunks = Chunker::new(ChunkerConfig::new(100, 10).unwrap())
            .chunk(&pages)
            .unwrap();

        assert!(!chunks.is_empty());
        assert_eq!(covered_pages(&chunks), vec![1, 2]);
        for chunk in &chunks {
            assert!(chunk.start_page <= chunk.end_page);
            assert!(chunk.content.chars().count() <= 100);
            assert_eq!(chunk.total_pages, 2);
        }
    }

    #[test]
    fn test_exact_mapping_labels_pages_precisely() {
        let pages = pages_of(&[
            words(30, "alpha"),
            words(30, "bravo"),
            words(30, "delta"),
        ]);
        let config = ChunkerConfig::new(120, 20).unwrap();

        let chunks = Chunker::new(config).chunk(&pages).unwrap();

        for chunk in &chunks {
            if chunk.content.contains("alpha") {
                assert_eq!(chunk.start_page, 1, "{:?}", chunk);
            }
            if chunk.content.contains("delta") {
                assert_eq!(chunk.end_page, 3, "{:?}", chunk);
            }
            if !chunk.content.contains("alpha") && !chunk.content.contains("[Page 1]") {
                assert!(chunk.start_page >= 2, "{:?}", chunk);
            }
        }
        assert_eq!(covered_pages(&chunks), vec![1, 2, 3]);
    }

    #[test]
    fn test_coverage_and_non_empty_spans_across_parameters() {
        let pages = pages_of(&[
            words(40, "first"),
            "x".repeat(5),
            words(25, "third page words"),
            String::new(),
            words(60, "fifth"),
        ]);

        for (window, overlap) in [(50, 0), (50, 49), (80, 10), (200, 50), (5000, 100)] {
            let config = ChunkerConfig::new(window, overlap).unwrap();
            let chunks = Chunker::new(config).chunk(&pages).unwrap();

            assert!(!chunks.is_empty());
            for chunk in &chunks {
                assert!(chunk.start_page >= 1 && chunk.end_page <= 5);
                assert!(chunk.start_page <= chunk.end_page);
                assert!(!chunk.content.trim().is_empty());
            }
            assert_eq!(
                covered_pages(&chunks),
                vec![1, 2, 3, 4, 5],
                "window {window}, overlap {overlap}"
            );
        }
    }

    #[test]
    fn test_many_short_line_pages_stay_labelled() {
        // trimmed windows end well short of the window size here
        let pages: Vec<Page> = (1..=40)
            .map(|n| {
                let lines: Vec<String> = (1..=8).map(|l| format!("page {n} line {l}")).collect();
                Page::new(n, lines.join("\n"), 40)
            })
            .collect();
        let config = ChunkerConfig::new(300, 100).unwrap();

        let chunks = Chunker::new(config).chunk(&pages).unwrap();

        assert_eq!(covered_pages(&chunks), (1..=40).collect::<Vec<u32>>());
        assert_eq!(chunks.last().map(|c| c.end_page), Some(40));
        for chunk in &chunks {
            // every page marker inside a chunk lies within its label
            for n in 1..=40u32 {
                if chunk.content.contains(&format!("[Page {n}]")) {
                    assert!(chunk.pages().contains(&n), "page {n} outside {:?}", chunk.pages());
                }
            }
        }
    }

    #[test]
    fn test_multibyte_text_uses_char_offsets() {
        let pages = pages_of(&["é".repeat(60), "ü".repeat(60)]);
        let config = ChunkerConfig::new(50, 5).unwrap();

        let chunks = Chunker::new(config).chunk(&pages).unwrap();

        assert_eq!(covered_pages(&chunks), vec![1, 2]);
        assert!(chunks.iter().any(|c| c.content.contains('é') && c.start_page == 1));
        assert!(chunks
            .iter()
            .filter(|c| c.content.contains('ü') && !c.content.contains('é'))
            .all(|c| c.start_page == 2));
    }
}
