use serde::{Deserialize, Serialize};

/// One image inside an image group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDescriptor {
    pub media_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
}

impl ImageDescriptor {
    pub fn new(media_id: impl Into<String>) -> Self {
        Self {
            media_id: media_id.into(),
            url: None,
            format: None,
            width: None,
            height: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "blockType")]
pub enum ContentBlock {
    #[serde(rename = "Text", rename_all = "camelCase")]
    Text { html_content: String },
    #[serde(rename = "image")]
    ImageGroup { images: Vec<ImageDescriptor> },
}

/// Decoded post body in the shape the publishing API takes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDocument {
    pub blocks: Vec<ContentBlock>,
}

impl ContentDocument {
    pub fn new(blocks: Vec<ContentBlock>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn to_json(&self) -> String {
        // Only strings, integers and sequences; serialization cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| String::from(r#"{"blocks":[]}"#))
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}
