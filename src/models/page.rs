use serde::{Deserialize, Serialize};

/// One extracted page of a source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number
    pub number: u32,
    pub text: String,
    pub total_pages: u32,
}

impl Page {
    pub fn new(number: u32, text: impl Into<String>, total_pages: u32) -> Self {
        Self {
            number,
            text: text.into(),
            total_pages,
        }
    }

    /// Text as it appears in the chunker's concatenated buffer
    pub fn marked_text(&self) -> String {
        format!("[Page {}]\n{}\n", self.number, self.text)
    }
}
