use std::cell::Cell;

use crate::editing::{EditOperation, ParagraphStyle};
use crate::store::{
    DocumentContent, DocumentStore, Paragraph, ParagraphElement, StoreError, StructuralElement,
};

const NEWLINE: u16 = b'\n' as u16;
const TAB: u16 = b'\t' as u16;

/// Rendered in text runs for store-injected bullet markers
const MARKER_CHAR: char = '\u{200B}';

/// Rendered in plain text for inline images
pub const IMAGE_CHAR: char = '\u{FFFC}';

#[derive(Debug, Clone, PartialEq)]
enum UnitKind {
    Text(u16),
    Image(String),
    /// Invisible structural unit the store adds on bullet creation
    Marker,
}

/// One content-stream unit. Paragraph properties are only meaningful on the
/// terminating newline of a paragraph.
#[derive(Debug, Clone, PartialEq)]
struct Unit {
    kind: UnitKind,
    link: Option<String>,
    style: ParagraphStyle,
    bullet: Option<usize>,
}

impl Unit {
    fn new(kind: UnitKind) -> Self {
        Self {
            kind,
            link: None,
            style: ParagraphStyle::NormalText,
            bullet: None,
        }
    }

    fn is_newline(&self) -> bool {
        self.kind == UnitKind::Text(NEWLINE)
    }
}

/// In-process stand-in for the remote document store.
///
/// Body indices start at 1 and the body always ends with a paragraph
/// terminator. Bullet creation folds leading tabs into a nesting level and can
/// inject `bullet_markers` invisible units per paragraph, so offsets after a
/// bullet operation are not locally predictable, just like the real store.
#[derive(Debug)]
pub struct MemoryStore {
    document_id: String,
    units: Vec<Unit>,
    bullet_markers: usize,
    fail_on_apply: Option<usize>,
    applied: Vec<Vec<EditOperation>>,
    apply_calls: usize,
    get_calls: Cell<usize>,
}

impl MemoryStore {
    pub fn from_template(document_id: &str, template: &str) -> Self {
        let mut units: Vec<Unit> = template
            .encode_utf16()
            .map(|unit| Unit::new(UnitKind::Text(unit)))
            .collect();
        if !units.last().is_some_and(Unit::is_newline) {
            units.push(Unit::new(UnitKind::Text(NEWLINE)));
        }

        Self {
            document_id: document_id.to_string(),
            units,
            bullet_markers: 0,
            fail_on_apply: None,
            applied: Vec::new(),
            apply_calls: 0,
            get_calls: Cell::new(0),
        }
    }

    /// Inject `count` invisible units at the start of every bulleted paragraph
    pub fn with_bullet_markers(mut self, count: usize) -> Self {
        self.bullet_markers = count;
        self
    }

    /// Make the `call`-th apply request (0-based) fail before touching the body
    pub fn failing_on_apply(mut self, call: usize) -> Self {
        self.fail_on_apply = Some(call);
        self
    }

    pub fn applied_batches(&self) -> &[Vec<EditOperation>] {
        &self.applied
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.get()
    }

    /// Index one past the final terminator
    pub fn end_index(&self) -> usize {
        self.units.len() + 1
    }

    /// Body text as a reader sees it; images render as U+FFFC, markers vanish
    pub fn visible_text(&self) -> String {
        let mut out = String::new();
        let mut pending: Vec<u16> = Vec::new();
        for unit in &self.units {
            match &unit.kind {
                UnitKind::Text(code) => pending.push(*code),
                UnitKind::Image(_) => {
                    out.push_str(&String::from_utf16_lossy(&pending));
                    pending.clear();
                    out.push(IMAGE_CHAR);
                }
                UnitKind::Marker => {}
            }
        }
        out.push_str(&String::from_utf16_lossy(&pending));
        out
    }

    fn check_document(&self, document_id: &str) -> Result<(), StoreError> {
        if document_id == self.document_id {
            Ok(())
        } else {
            Err(StoreError::DocumentNotFound(document_id.to_string()))
        }
    }

    /// Paragraphs as `[start, end)` positions in `units`, terminator included
    fn paragraph_spans(&self) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        let mut start = 0;
        for (position, unit) in self.units.iter().enumerate() {
            if unit.is_newline() {
                spans.push((start, position + 1));
                start = position + 1;
            }
        }
        spans
    }

    fn overlapping_spans(&self, start: usize, end: usize) -> Vec<(usize, usize)> {
        self.paragraph_spans()
            .into_iter()
            .filter(|&(ps, pe)| ps < end.max(start + 1) && start < pe)
            .collect()
    }

    fn terminator_at_or_after(&self, position: usize) -> Option<&Unit> {
        self.units[position..].iter().find(|unit| unit.is_newline())
    }

    fn apply_one(&mut self, position: usize, op: &EditOperation) -> Result<(), StoreError> {
        let len = self.units.len();
        let invalid = |op: &'static str, start: usize, end: usize| StoreError::InvalidRange {
            position,
            op,
            start,
            end,
            len: len + 1,
        };

        match op {
            EditOperation::InsertText { index, text } => {
                if *index < 1 || *index > len {
                    return Err(invalid("insert_text", *index, *index));
                }
                let at = index - 1;
                let (style, bullet) = self
                    .terminator_at_or_after(at)
                    .map(|unit| (unit.style, unit.bullet))
                    .unwrap_or_default();
                let inserted: Vec<Unit> = text
                    .encode_utf16()
                    .map(|code| Unit {
                        style,
                        bullet,
                        ..Unit::new(UnitKind::Text(code))
                    })
                    .collect();
                self.units.splice(at..at, inserted);
            }
            EditOperation::InsertImage { index, uri, .. } => {
                if *index < 1 || *index > len {
                    return Err(invalid("insert_image", *index, *index));
                }
                self.units
                    .insert(index - 1, Unit::new(UnitKind::Image(uri.clone())));
            }
            EditOperation::SetParagraphStyle {
                start_index,
                end_index,
                style,
            } => {
                let (start, end) =
                    self.checked_range("set_paragraph_style", position, *start_index, *end_index)?;
                for (_, pe) in self.overlapping_spans(start, end) {
                    self.units[pe - 1].style = *style;
                }
            }
            EditOperation::CreateBulletRange {
                start_index,
                end_index,
            } => {
                let (start, end) =
                    self.checked_range("create_bullet_range", position, *start_index, *end_index)?;
                for (ps, pe) in self.overlapping_spans(start, end).into_iter().rev() {
                    let tabs = self.units[ps..pe]
                        .iter()
                        .take_while(|unit| unit.kind == UnitKind::Text(TAB))
                        .count();
                    self.units[pe - 1].bullet = Some(tabs);
                    let markers = (0..self.bullet_markers).map(|_| Unit::new(UnitKind::Marker));
                    self.units.splice(ps..ps + tabs, markers);
                }
            }
            EditOperation::SetLink {
                start_index,
                end_index,
                url,
            } => {
                let (start, end) =
                    self.checked_range("set_link", position, *start_index, *end_index)?;
                for unit in &mut self.units[start..end] {
                    unit.link = Some(url.clone());
                }
            }
            EditOperation::DeleteRange {
                start_index,
                end_index,
            } => {
                // the final terminator can never be deleted
                if *start_index < 1 || start_index > end_index || *end_index > len {
                    return Err(invalid("delete_range", *start_index, *end_index));
                }
                self.units.drain(start_index - 1..end_index - 1);
            }
            EditOperation::ReplaceAllText {
                placeholder,
                replacement,
            } => self.replace_all(&format!("{{{{{placeholder}}}}}"), replacement),
        }
        Ok(())
    }

    fn checked_range(
        &self,
        op: &'static str,
        position: usize,
        start_index: usize,
        end_index: usize,
    ) -> Result<(usize, usize), StoreError> {
        let len = self.units.len();
        if start_index < 1 || start_index > end_index || end_index > len + 1 {
            return Err(StoreError::InvalidRange {
                position,
                op,
                start: start_index,
                end: end_index,
                len: len + 1,
            });
        }
        Ok((start_index - 1, end_index - 1))
    }

    fn replace_all(&mut self, needle: &str, replacement: &str) {
        let needle: Vec<UnitKind> = needle.encode_utf16().map(UnitKind::Text).collect();
        if needle.is_empty() {
            return;
        }
        let mut position = 0;
        while position + needle.len() <= self.units.len() {
            let matches = self.units[position..position + needle.len()]
                .iter()
                .zip(&needle)
                .all(|(unit, kind)| &unit.kind == kind);
            if matches {
                let inserted: Vec<Unit> = replacement
                    .encode_utf16()
                    .map(|code| Unit::new(UnitKind::Text(code)))
                    .collect();
                let step = inserted.len();
                self.units.splice(position..position + needle.len(), inserted);
                position += step;
            } else {
                position += 1;
            }
        }
    }

    fn paragraph_elements(&self, start: usize, end: usize) -> Vec<ParagraphElement> {
        let mut elements = Vec::new();
        let mut run_start = start;
        let mut run: Vec<u16> = Vec::new();
        let mut run_link: Option<String> = None;

        let flush_run = |elements: &mut Vec<ParagraphElement>,
                         run: &mut Vec<u16>,
                         run_start: usize,
                         run_end: usize,
                         link: &Option<String>| {
            if run_end > run_start {
                elements.push(ParagraphElement::TextRun {
                    start_index: run_start + 1,
                    end_index: run_end + 1,
                    content: String::from_utf16_lossy(run),
                    link: link.clone(),
                });
            }
            run.clear();
        };

        for position in start..end {
            let unit = &self.units[position];
            match &unit.kind {
                UnitKind::Image(uri) => {
                    flush_run(&mut elements, &mut run, run_start, position, &run_link);
                    elements.push(ParagraphElement::InlineImage {
                        start_index: position + 1,
                        uri: uri.clone(),
                    });
                    run_start = position + 1;
                    run_link = None;
                }
                UnitKind::Text(_) | UnitKind::Marker => {
                    if position > run_start && unit.link != run_link {
                        flush_run(&mut elements, &mut run, run_start, position, &run_link);
                        run_start = position;
                    }
                    if position == run_start {
                        run_link = unit.link.clone();
                    }
                    match unit.kind {
                        UnitKind::Text(code) => run.push(code),
                        _ => run.extend(MARKER_CHAR.encode_utf16(&mut [0; 2]).iter()),
                    }
                }
            }
        }
        flush_run(&mut elements, &mut run, run_start, end, &run_link);
        elements
    }
}

impl DocumentStore for MemoryStore {
    fn apply_batch(
        &mut self,
        document_id: &str,
        operations: &[EditOperation],
    ) -> Result<(), StoreError> {
        self.check_document(document_id)?;
        let call = self.apply_calls;
        self.apply_calls += 1;
        if self.fail_on_apply == Some(call) {
            return Err(StoreError::Remote(format!(
                "simulated failure on request {call}"
            )));
        }

        for (position, op) in operations.iter().enumerate() {
            self.apply_one(position, op)?;
        }
        self.applied.push(operations.to_vec());
        Ok(())
    }

    fn get_document(&self, document_id: &str) -> Result<DocumentContent, StoreError> {
        self.check_document(document_id)?;
        self.get_calls.set(self.get_calls.get() + 1);

        let content = self
            .paragraph_spans()
            .into_iter()
            .map(|(start, end)| {
                let terminator = &self.units[end - 1];
                StructuralElement::Paragraph(Paragraph {
                    start_index: start + 1,
                    end_index: end + 1,
                    style: terminator.style,
                    bullet: terminator.bullet,
                    elements: self.paragraph_elements(start, end),
                })
            })
            .collect();
        Ok(DocumentContent { content })
    }
}
