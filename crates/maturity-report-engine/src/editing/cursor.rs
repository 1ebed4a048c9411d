//! Offset arithmetic for appending content at a locally tracked cursor.
//!
//! Every function here is pure with respect to the remote document: it pushes
//! operations onto a [`Batch`] and returns the cursor that the *next* insertion
//! must use once the batch has been applied in order.

use crate::editing::{Batch, EditOperation, ImageCategory, ParagraphStyle, stream_len};

pub const LINE_TERMINATOR: &str = "\n";

/// Padding after the last image of a run, so the following text wraps
pub const LAST_IMAGE_PADDING: &str = " ";

/// Padding between images of the same run
pub const IMAGE_GAP_PADDING: &str = "          ";

/// Paragraph indentation. Only `Nested` changes the inserted text: it becomes a
/// leading tab, which bullet creation later turns into a nesting level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Indent {
    #[default]
    None,
    Item,
    Nested,
}

/// Insert `text` as its own paragraph at `cursor` and style it.
///
/// Empty text is a no-op returning `cursor` unchanged, so optional fields never
/// perturb the layout.
pub fn insert_text(
    batch: &mut Batch,
    cursor: usize,
    text: &str,
    style: ParagraphStyle,
    indent: Indent,
) -> usize {
    if text.is_empty() {
        return cursor;
    }

    let mut paragraph = String::with_capacity(text.len() + 2);
    if indent == Indent::Nested {
        paragraph.push('\t');
    }
    paragraph.push_str(text);
    paragraph.push_str(LINE_TERMINATOR);

    let length = stream_len(&paragraph);
    batch.push(EditOperation::InsertText {
        index: cursor,
        text: paragraph,
    });
    batch.push(EditOperation::SetParagraphStyle {
        start_index: cursor,
        end_index: cursor + length,
        style,
    });
    cursor + length
}

/// Insert one image of a run of `total_count` images.
///
/// Images after the first sit on the same line as the previous one: the
/// terminator that the previous padding paragraph left behind is absorbed by
/// stepping back over it before inserting.
pub fn insert_image(
    batch: &mut Batch,
    cursor: usize,
    uri: &str,
    serial_index: usize,
    total_count: usize,
    category: ImageCategory,
) -> usize {
    let index = if serial_index != 0 {
        cursor.saturating_sub(stream_len(LINE_TERMINATOR))
    } else {
        cursor
    };

    batch.push(EditOperation::InsertImage {
        index,
        uri: uri.to_string(),
        height_pt: category.height_pt(),
        category,
    });

    // an inline image occupies a single unit
    let padding = if serial_index + 1 == total_count {
        LAST_IMAGE_PADDING
    } else {
        IMAGE_GAP_PADDING
    };
    insert_text(
        batch,
        index + 1,
        padding,
        ParagraphStyle::NormalText,
        Indent::None,
    )
}

/// Attach a hyperlink to `[start_index, end_index)`. Never moves the cursor.
pub fn insert_link(batch: &mut Batch, start_index: usize, end_index: usize, url: &str) {
    batch.push(EditOperation::SetLink {
        start_index,
        end_index,
        url: url.to_string(),
    });
}
