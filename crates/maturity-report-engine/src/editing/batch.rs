use crate::editing::EditOperation;

/// Ordered operations accumulated since the last flush
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    ops: Vec<EditOperation>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: EditOperation) {
        self.ops.push(op);
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn operations(&self) -> &[EditOperation] {
        &self.ops
    }

    pub fn contains_images(&self) -> bool {
        self.ops.iter().any(EditOperation::is_image)
    }

    /// Hand the pending operations over and leave the batch empty
    pub fn take(&mut self) -> Vec<EditOperation> {
        std::mem::take(&mut self.ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::ImageCategory;

    #[test]
    fn test_take_clears_batch() {
        let mut batch = Batch::new();
        batch.push(EditOperation::InsertText {
            index: 1,
            text: "a\n".to_string(),
        });

        let ops = batch.take();

        assert_eq!(ops.len(), 1);
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }

    #[test]
    fn test_contains_images() {
        let mut batch = Batch::new();
        assert!(!batch.contains_images());

        batch.push(EditOperation::InsertImage {
            index: 1,
            uri: "https://charts/a.png".to_string(),
            height_pt: 140,
            category: ImageCategory::Gauge,
        });
        assert!(batch.contains_images());
    }
}
