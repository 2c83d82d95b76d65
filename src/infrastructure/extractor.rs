//! Page extraction: raw document bytes → ordered pages

use std::path::Path;

use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::models::Page;

/// Page separator recognised in plain-text documents
pub const FORM_FEED: char = '\x0c';

/// Turns document bytes into ordered, 1-numbered pages
pub trait PageExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<Page>, ExtractError>;
}

/// PDF pages via lopdf, one record per page
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfPageExtractor;

impl PageExtractor for PdfPageExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<Page>, ExtractError> {
        let doc = lopdf::Document::load_mem(bytes)
            .map_err(|source| ExtractError::PdfParseFailed { source })?;

        let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        page_numbers.sort_unstable();
        let total_pages = page_numbers.len() as u32;

        let pages = page_numbers
            .iter()
            .map(|&number| {
                let text = doc.extract_text(&[number]).unwrap_or_else(|e| {
                    warn!("⚠️ could not extract text of page {}: {}", number, e);
                    String::new()
                });
                Page::new(number, text.trim(), total_pages)
            })
            .collect::<Vec<_>>();

        debug!("extracted {} PDF pages", pages.len());
        Ok(pages)
    }
}

/// Plain text; pages are separated by form feeds
#[derive(Debug, Default, Clone, Copy)]
pub struct TextPageExtractor;

impl PageExtractor for TextPageExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<Page>, ExtractError> {
        let text = String::from_utf8_lossy(bytes);
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let sections: Vec<&str> = text.split(FORM_FEED).collect();
        let total_pages = sections.len() as u32;

        Ok(sections
            .into_iter()
            .enumerate()
            .map(|(i, section)| Page::new(i as u32 + 1, section.trim(), total_pages))
            .collect())
    }
}

/// Picks an extractor from the object key's extension
pub fn extractor_for(key: &str) -> Box<dyn PageExtractor> {
    let is_pdf = Path::new(key)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        Box::new(PdfPageExtractor)
    } else {
        Box::new(TextPageExtractor)
    }
}

/// Runs extraction on the blocking pool; PDF parsing is CPU bound
pub async fn extract_pages(key: &str, bytes: Vec<u8>) -> Result<Vec<Page>, ExtractError> {
    let extractor = extractor_for(key);
    tokio::task::spawn_blocking(move || extractor.extract(&bytes))
        .await
        .map_err(|e| ExtractError::TaskFailed {
            message: e.to_string(),
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object, Stream};

    fn create_pdf(page_texts: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.4");

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut page_ids = Vec::new();
        for text in page_texts {
            let content = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", text);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            });
            page_ids.push(page_id);
        }

        let kids: Vec<Object> = page_ids.iter().map(|&id| id.into()).collect();
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(page_texts.len() as i64),
        });
        for page_id in &page_ids {
            if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(*page_id) {
                dict.set("Parent", pages_id);
            }
        }
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_pdf_pages_are_numbered_in_order() {
        let bytes = create_pdf(&["First page", "Second page", "Third page"]);

        let pages = PdfPageExtractor.extract(&bytes).unwrap();

        assert_eq!(pages.len(), 3);
        assert_eq!(
            pages.iter().map(|p| p.number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(pages.iter().all(|p| p.total_pages == 3));
    }

    #[test]
    fn test_invalid_pdf_is_rejected() {
        assert!(matches!(
            PdfPageExtractor.extract(b"this is not a pdf"),
            Err(ExtractError::PdfParseFailed { .. })
        ));
    }

    #[test]
    fn test_text_pages_split_on_form_feed() {
        let pages = TextPageExtractor
            .extract(b"page one\n\x0c page two \x0cpage three")
            .unwrap();

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1].text, "page two");
        assert_eq!(pages[2].number, 3);
        assert_eq!(pages[0].total_pages, 3);
    }

    #[test]
    fn test_text_without_form_feed_is_one_page() {
        let pages = TextPageExtractor.extract(b"just text").unwrap();
        assert_eq!(pages.len(), 1);
        assert!(TextPageExtractor.extract(b"  \n ").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extract_pages_dispatches_on_extension() {
        let pdf = create_pdf(&["Only page"]);
        let pages = extract_pages("uploads/x/Report.PDF", pdf).await.unwrap();
        assert_eq!(pages.len(), 1);

        let pages = extract_pages("notes.txt", b"a\x0cb".to_vec()).await.unwrap();
        assert_eq!(pages.len(), 2);
    }
}
