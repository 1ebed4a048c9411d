//! # Document edit compositor
//!
//! Edits against the remote document are expressed as [`EditOperation`]s,
//! accumulated into a [`Batch`] and applied by the store in array order.
//!
//! - **`ops`**: the operation variants and their wire form
//! - **`batch`**: pending operations since the last flush
//! - **`cursor`**: pure offset arithmetic for text, images and links
//! - **`compositor`**: owns cursor and batch; flushes, resynchronizes against
//!   the anchor paragraph, and builds bullet lists
//!
//! All offsets are measured in content-stream units: UTF-16 code units, with an
//! inline image occupying exactly one unit. Local length computation and the
//! store must agree on this or indices drift silently.

pub mod batch;
pub mod compositor;
pub mod cursor;
pub mod ops;

pub use batch::Batch;
pub use compositor::{ComposeError, Compositor, CompositorState, DOCUMENT_START};
pub use cursor::Indent;
pub use ops::{EditOperation, ImageCategory, ParagraphStyle};

/// Length of `text` in content-stream units
pub fn stream_len(text: &str) -> usize {
    text.encode_utf16().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_len_counts_utf16_units() {
        assert_eq!(stream_len(""), 0);
        assert_eq!(stream_len("abc\n"), 4);
        assert_eq!(stream_len("成熟度"), 3);
        assert_eq!(stream_len("☁️"), 2);
        assert_eq!(stream_len("🦀"), 2);
    }
}
