use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Named paragraph styles understood by the document store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParagraphStyle {
    #[default]
    #[serde(rename = "NORMAL_TEXT")]
    NormalText,
    #[serde(rename = "HEADING_1")]
    Heading1,
    #[serde(rename = "HEADING_2")]
    Heading2,
    #[serde(rename = "HEADING_3")]
    Heading3,
    #[serde(rename = "HEADING_4")]
    Heading4,
    #[serde(rename = "HEADING_5")]
    Heading5,
    #[serde(rename = "HEADING_6")]
    Heading6,
}

impl ParagraphStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParagraphStyle::NormalText => "NORMAL_TEXT",
            ParagraphStyle::Heading1 => "HEADING_1",
            ParagraphStyle::Heading2 => "HEADING_2",
            ParagraphStyle::Heading3 => "HEADING_3",
            ParagraphStyle::Heading4 => "HEADING_4",
            ParagraphStyle::Heading5 => "HEADING_5",
            ParagraphStyle::Heading6 => "HEADING_6",
        }
    }
}

/// Chart categories, each rendered at a fixed display height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageCategory {
    #[default]
    Gauge,
    Radial,
    Total,
}

impl ImageCategory {
    /// Display height in points
    pub fn height_pt(&self) -> u32 {
        match self {
            ImageCategory::Gauge | ImageCategory::Radial => 140,
            ImageCategory::Total => 200,
        }
    }
}

/// One structural edit against the remote document.
///
/// Indices are content-stream offsets (see [`crate::editing::stream_len`]) in the
/// coordinate space of the document after every earlier operation of the same
/// batch has been applied. Operations are applied in array order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOperation {
    InsertText {
        index: usize,
        text: String,
    },
    SetParagraphStyle {
        start_index: usize,
        end_index: usize,
        style: ParagraphStyle,
    },
    CreateBulletRange {
        start_index: usize,
        end_index: usize,
    },
    SetLink {
        start_index: usize,
        end_index: usize,
        url: String,
    },
    InsertImage {
        index: usize,
        uri: String,
        height_pt: u32,
        category: ImageCategory,
    },
    DeleteRange {
        start_index: usize,
        end_index: usize,
    },
    /// Replaces every `{{placeholder}}` in the document
    ReplaceAllText {
        placeholder: String,
        replacement: String,
    },
}

impl EditOperation {
    /// Whether the store processes this operation asynchronously and needs the
    /// longer settle delay after the batch is applied
    pub fn is_image(&self) -> bool {
        matches!(self, EditOperation::InsertImage { .. })
    }

    /// Wire form expected by the document store's batch-update endpoint
    pub fn to_request(&self) -> Value {
        match self {
            EditOperation::InsertText { index, text } => json!({
                "insertText": {
                    "location": { "index": index },
                    "text": text,
                }
            }),
            EditOperation::SetParagraphStyle {
                start_index,
                end_index,
                style,
            } => json!({
                "updateParagraphStyle": {
                    "range": { "startIndex": start_index, "endIndex": end_index },
                    "paragraphStyle": { "namedStyleType": style.as_str() },
                    "fields": "namedStyleType",
                }
            }),
            EditOperation::CreateBulletRange {
                start_index,
                end_index,
            } => json!({
                "createParagraphBullets": {
                    "range": { "startIndex": start_index, "endIndex": end_index },
                    "bulletPreset": "BULLET_DISC_CIRCLE_SQUARE",
                }
            }),
            EditOperation::SetLink {
                start_index,
                end_index,
                url,
            } => json!({
                "updateTextStyle": {
                    "range": { "startIndex": start_index, "endIndex": end_index },
                    "textStyle": { "link": { "url": url } },
                    "fields": "link",
                }
            }),
            EditOperation::InsertImage {
                index,
                uri,
                height_pt,
                ..
            } => json!({
                "insertInlineImage": {
                    "location": { "index": index },
                    "uri": uri,
                    "objectSize": {
                        "height": { "magnitude": height_pt, "unit": "PT" },
                    },
                }
            }),
            EditOperation::DeleteRange {
                start_index,
                end_index,
            } => json!({
                "deleteContentRange": {
                    "range": { "startIndex": start_index, "endIndex": end_index },
                }
            }),
            EditOperation::ReplaceAllText {
                placeholder,
                replacement,
            } => json!({
                "replaceAllText": {
                    "containsText": {
                        "text": format!("{{{{{placeholder}}}}}"),
                        "matchCase": true,
                    },
                    "replaceText": replacement,
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_image_heights() {
        assert_eq!(ImageCategory::Gauge.height_pt(), 140);
        assert_eq!(ImageCategory::Radial.height_pt(), 140);
        assert_eq!(ImageCategory::Total.height_pt(), 200);
    }

    #[test]
    fn test_paragraph_style_serializes_to_named_style() {
        let json = serde_json::to_string(&ParagraphStyle::Heading3).unwrap();
        assert_eq!(json, "\"HEADING_3\"");
        assert_eq!(ParagraphStyle::Heading3.as_str(), "HEADING_3");
    }

    #[test]
    fn test_insert_text_request_shape() {
        let op = EditOperation::InsertText {
            index: 12,
            text: "Hello\n".to_string(),
        };

        assert_eq!(
            op.to_request(),
            json!({ "insertText": { "location": { "index": 12 }, "text": "Hello\n" } })
        );
    }

    #[test]
    fn test_replace_all_text_wraps_placeholder_in_braces() {
        let op = EditOperation::ReplaceAllText {
            placeholder: "REPORT_DATE".to_string(),
            replacement: "2024-05-01".to_string(),
        };

        let request = op.to_request();
        assert_eq!(
            request["replaceAllText"]["containsText"]["text"],
            json!("{{REPORT_DATE}}")
        );
        assert_eq!(request["replaceAllText"]["replaceText"], json!("2024-05-01"));
    }

    #[test]
    fn test_link_request_only_touches_link_field() {
        let op = EditOperation::SetLink {
            start_index: 5,
            end_index: 9,
            url: "https://example.com/bp".to_string(),
        };

        let request = op.to_request();
        assert_eq!(request["updateTextStyle"]["fields"], json!("link"));
        assert_eq!(
            request["updateTextStyle"]["textStyle"]["link"]["url"],
            json!("https://example.com/bp")
        );
        assert!(!op.is_image());
    }

    #[test]
    fn test_image_request_carries_height() {
        let op = EditOperation::InsertImage {
            index: 3,
            uri: "https://charts/total.png".to_string(),
            height_pt: ImageCategory::Total.height_pt(),
            category: ImageCategory::Total,
        };

        let request = op.to_request();
        assert_eq!(
            request["insertInlineImage"]["objectSize"]["height"]["magnitude"],
            json!(200)
        );
        assert!(op.is_image());
    }
}
