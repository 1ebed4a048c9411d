use crate::editing::cursor::{self, Indent};
use crate::editing::{Batch, EditOperation, ImageCategory, ParagraphStyle, stream_len};
use crate::pacing::{Delays, Pacer};
use crate::store::{DocumentContent, DocumentStore, ParagraphElement, StoreError};

/// Cursor used when the anchor cannot be found: the first index of the body
pub const DOCUMENT_START: usize = 1;

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// Batch contents are in an unknown applied/unapplied state
    #[error("document store rejected the batch: {0}")]
    Store(#[from] StoreError),
}

/// The mutable state of one generation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositorState {
    /// Next insertion point in the live document
    pub cursor: usize,
    pub pending: Batch,
}

/// Builds edit batches against a document whose length changes under it.
///
/// The cursor is advanced locally after every insertion. It is only re-read
/// from the live document through the anchor, which happens before writing a
/// section and after every bullet list, because bullet creation changes
/// offsets in ways that cannot be computed locally.
pub struct Compositor<S, P> {
    store: S,
    pacer: P,
    document_id: String,
    anchor: String,
    delays: Delays,
    state: CompositorState,
}

impl<S: DocumentStore, P: Pacer> Compositor<S, P> {
    pub fn new(store: S, pacer: P, document_id: &str, anchor: &str, delays: Delays) -> Self {
        Self {
            store,
            pacer,
            document_id: document_id.to_string(),
            anchor: anchor.to_string(),
            delays,
            state: CompositorState::default(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.state.cursor
    }

    pub fn state(&self) -> &CompositorState {
        &self.state
    }

    pub fn anchor(&self) -> &str {
        &self.anchor
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Append a styled paragraph at the cursor
    pub fn write(&mut self, text: &str, style: ParagraphStyle, indent: Indent) -> usize {
        self.state.cursor = cursor::insert_text(
            &mut self.state.pending,
            self.state.cursor,
            text,
            style,
            indent,
        );
        self.state.cursor
    }

    /// Append image `serial_index` of a run of `total_count`
    pub fn image(
        &mut self,
        uri: &str,
        serial_index: usize,
        total_count: usize,
        category: ImageCategory,
    ) -> usize {
        self.state.cursor = cursor::insert_image(
            &mut self.state.pending,
            self.state.cursor,
            uri,
            serial_index,
            total_count,
            category,
        );
        self.state.cursor
    }

    pub fn link(&mut self, start_index: usize, end_index: usize, url: &str) {
        cursor::insert_link(&mut self.state.pending, start_index, end_index, url);
    }

    /// Queue a `{{placeholder}}` replacement
    pub fn replace_placeholder(&mut self, placeholder: &str, replacement: &str) {
        self.state.pending.push(EditOperation::ReplaceAllText {
            placeholder: placeholder.to_string(),
            replacement: replacement.to_string(),
        });
    }

    /// Send the pending batch as one request, pause, and start a new batch.
    /// An empty batch makes no request and does not pause.
    pub fn flush(&mut self) -> Result<(), ComposeError> {
        if self.state.pending.is_empty() {
            return Ok(());
        }

        let delay = if self.state.pending.contains_images() {
            self.delays.image
        } else {
            self.delays.request
        };
        let ops = self.state.pending.take();
        log::debug!("Flushing {} operations to {}", ops.len(), self.document_id);

        self.store.apply_batch(&self.document_id, &ops)?;
        self.pacer.pause(delay);
        Ok(())
    }

    /// Flush, then read the live document once
    pub fn read(&mut self) -> Result<DocumentContent, ComposeError> {
        self.flush()?;
        let document = self.store.get_document(&self.document_id)?;
        self.pacer.pause(self.delays.request);
        Ok(document)
    }

    /// Flush, then find the start of the first paragraph whose leading text
    /// run contains `needle`
    pub fn locate(&mut self, needle: &str) -> Result<Option<usize>, ComposeError> {
        Ok(self.read()?.find_paragraph_start(needle))
    }

    /// Re-read the cursor from the anchor in the live document.
    ///
    /// A missing anchor is logged and degrades the cursor to the start of the
    /// document; the run carries on.
    pub fn resync(&mut self) -> Result<usize, ComposeError> {
        let anchor = self.anchor.clone();
        self.state.cursor = match self.locate(&anchor)? {
            Some(index) => {
                log::debug!("Anchor found at {index}");
                index
            }
            None => {
                log::error!(
                    "Anchor text \"{anchor}\" not found in document {}; add it to the template. \
                     Continuing from the start of the document",
                    self.document_id
                );
                DOCUMENT_START
            }
        };
        Ok(self.state.cursor)
    }

    /// Turn `[start_index, end_index)` into a bullet list and resync, since
    /// the store may add or remove invisible characters while doing so.
    /// An empty range is left alone.
    pub fn bullet(&mut self, start_index: usize, end_index: usize) -> Result<usize, ComposeError> {
        if start_index >= end_index {
            log::debug!("Empty bullet range at {start_index}; skipped");
            return Ok(self.state.cursor);
        }
        self.state.pending.push(EditOperation::CreateBulletRange {
            start_index,
            end_index,
        });
        self.resync()
    }

    /// Delete the first occurrence of `text` that opens a paragraph's leading run
    pub fn delete_text(&mut self, text: &str) -> Result<bool, ComposeError> {
        let document = self.read()?;
        let Some(paragraph_start) = document.find_paragraph_start(text) else {
            log::warn!("Text \"{text}\" not found; nothing deleted");
            return Ok(false);
        };

        let start_index = document
            .paragraphs()
            .find(|paragraph| paragraph.start_index == paragraph_start)
            .and_then(|paragraph| paragraph.elements.first())
            .and_then(|element| match element {
                ParagraphElement::TextRun {
                    start_index,
                    content,
                    ..
                } => content
                    .find(text)
                    .map(|byte| start_index + stream_len(&content[..byte])),
                _ => None,
            })
            .unwrap_or(paragraph_start);

        self.state.pending.push(EditOperation::DeleteRange {
            start_index,
            end_index: start_index + stream_len(text),
        });
        Ok(true)
    }
}
