//! Contract of the remote rich-text document store, plus a local simulation.

pub mod memory;

use serde::{Deserialize, Serialize};

use crate::editing::{EditOperation, ParagraphStyle};

pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    DocumentNotFound(String),
    #[error("operation {position} ({op}) has invalid range {start}..{end} for body length {len}")]
    InvalidRange {
        position: usize,
        op: &'static str,
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("document store request failed: {0}")]
    Remote(String),
}

/// Remote document store. Calls are blocking request/response.
pub trait DocumentStore {
    /// Apply `operations` in array order as one request
    fn apply_batch(
        &mut self,
        document_id: &str,
        operations: &[EditOperation],
    ) -> Result<(), StoreError>;

    /// Fetch the live content list of the document body
    fn get_document(&self, document_id: &str) -> Result<DocumentContent, StoreError>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &mut S {
    fn apply_batch(
        &mut self,
        document_id: &str,
        operations: &[EditOperation],
    ) -> Result<(), StoreError> {
        (**self).apply_batch(document_id, operations)
    }

    fn get_document(&self, document_id: &str) -> Result<DocumentContent, StoreError> {
        (**self).get_document(document_id)
    }
}

/// Body content of a document, in document order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentContent {
    pub content: Vec<StructuralElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StructuralElement {
    Paragraph(Paragraph),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    pub start_index: usize,
    pub end_index: usize,
    pub style: ParagraphStyle,
    /// Nesting level when the paragraph is part of a bullet list
    pub bullet: Option<usize>,
    pub elements: Vec<ParagraphElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParagraphElement {
    TextRun {
        start_index: usize,
        end_index: usize,
        content: String,
        link: Option<String>,
    },
    InlineImage {
        start_index: usize,
        uri: String,
    },
}

impl DocumentContent {
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.content.iter().map(|element| match element {
            StructuralElement::Paragraph(paragraph) => paragraph,
        })
    }

    /// Start offset of the first paragraph whose leading text run contains
    /// `needle`. Paragraphs that open with an image are never matched.
    pub fn find_paragraph_start(&self, needle: &str) -> Option<usize> {
        self.paragraphs()
            .find(|paragraph| match paragraph.elements.first() {
                Some(ParagraphElement::TextRun { content, .. }) => content.contains(needle),
                _ => false,
            })
            .map(|paragraph| paragraph.start_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(start: usize, first: ParagraphElement) -> StructuralElement {
        StructuralElement::Paragraph(Paragraph {
            start_index: start,
            end_index: start + 10,
            style: ParagraphStyle::NormalText,
            bullet: None,
            elements: vec![first],
        })
    }

    fn run(start: usize, content: &str) -> ParagraphElement {
        ParagraphElement::TextRun {
            start_index: start,
            end_index: start + content.len(),
            content: content.to_string(),
            link: None,
        }
    }

    #[test]
    fn test_find_paragraph_start_matches_first_run_substring() {
        let doc = DocumentContent {
            content: vec![
                paragraph(1, run(1, "Title\n")),
                paragraph(11, run(11, "xx ANCHOR yy\n")),
                paragraph(21, run(21, "ANCHOR again\n")),
            ],
        };

        assert_eq!(doc.find_paragraph_start("ANCHOR"), Some(11));
    }

    #[test]
    fn test_find_paragraph_start_skips_image_led_paragraphs() {
        let doc = DocumentContent {
            content: vec![paragraph(
                1,
                ParagraphElement::InlineImage {
                    start_index: 1,
                    uri: "ANCHOR".to_string(),
                },
            )],
        };

        assert_eq!(doc.find_paragraph_start("ANCHOR"), None);
    }
}
