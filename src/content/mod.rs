//! Turns the editor's serialized HTML back into typed content blocks.
//!
//! Only the fragment's top-level nodes are inspected. A `p` becomes a text
//! block carrying its direct text; a `div` is an image group whose children
//! each wrap one image element. Anything else is skipped.

mod block;
pub mod dom;

pub use block::{ContentBlock, ContentDocument, ImageDescriptor};

use crate::config::DEFAULT_CDN_PREFIX;
use dom::{Element, Node};

/// Decode with the default CDN prefix
pub fn decode(fragment: &str) -> Vec<ContentBlock> {
    decode_with_prefix(fragment, DEFAULT_CDN_PREFIX)
}

pub fn decode_with_prefix(fragment: &str, cdn_prefix: &str) -> Vec<ContentBlock> {
    let fragment = dom::parse_fragment(fragment);
    fragment
        .children
        .iter()
        .filter_map(Node::as_element)
        .filter_map(|element| decode_block(element, cdn_prefix))
        .collect()
}

pub fn decode_document(fragment: &str, cdn_prefix: &str) -> ContentDocument {
    ContentDocument::new(decode_with_prefix(fragment, cdn_prefix))
}

fn decode_block(element: &Element, cdn_prefix: &str) -> Option<ContentBlock> {
    match element.name.as_str() {
        "p" => text_block(element),
        "div" => image_group(element, cdn_prefix),
        _ => None,
    }
}

fn text_block(element: &Element) -> Option<ContentBlock> {
    let text = element.direct_text().unwrap_or_default();
    if text.is_empty() {
        return None;
    }
    Some(ContentBlock::Text {
        html_content: text.to_string(),
    })
}

fn image_group(element: &Element, cdn_prefix: &str) -> Option<ContentBlock> {
    let images: Vec<ImageDescriptor> = element
        .child_elements()
        .filter_map(|container| container.children.last())
        .filter_map(Node::as_element)
        .filter_map(|image| image_descriptor(image, cdn_prefix))
        .collect();

    if images.is_empty() {
        None
    } else {
        Some(ContentBlock::ImageGroup { images })
    }
}

fn image_descriptor(image: &Element, cdn_prefix: &str) -> Option<ImageDescriptor> {
    let mut descriptor = ImageDescriptor::new(image.attribute("localidentifier")?);
    for (name, value) in &image.attributes {
        match name.as_str() {
            "index" => descriptor.url = Some(format!("{cdn_prefix}{value}")),
            "mime" => {
                let format = value.rsplit('/').next().unwrap_or(value);
                descriptor.format = Some(format.to_string());
            }
            "originalwidth" => descriptor.width = leading_integer(value),
            "originalheight" => descriptor.height = leading_integer(value),
            _ => {}
        }
    }
    Some(descriptor)
}

/// Integer at the start of `value`, ignoring leading whitespace and anything
/// after the digits. `"120px"` gives 120, `"px"` gives nothing. Runs too long
/// for an `i64` saturate.
fn leading_integer(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let digits_start = usize::from(value.starts_with(['+', '-']));
    let digits_len = value[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    let saturated = if value.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    };
    Some(value[..digits_start + digits_len].parse().unwrap_or(saturated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_integer_follows_lenient_parsing() {
        assert_eq!(leading_integer("100"), Some(100));
        assert_eq!(leading_integer("  42px"), Some(42));
        assert_eq!(leading_integer("-7"), Some(-7));
        assert_eq!(leading_integer("+8.5"), Some(8));
        assert_eq!(leading_integer("px"), None);
        assert_eq!(leading_integer(""), None);
        assert_eq!(leading_integer("-"), None);
    }

    #[test]
    fn oversized_integers_saturate() {
        assert_eq!(leading_integer("99999999999999999999"), Some(i64::MAX));
        assert_eq!(leading_integer("-99999999999999999999px"), Some(i64::MIN));
    }

    #[test]
    fn mime_without_slash_is_kept_whole() {
        let blocks = decode(r#"<div><span><img localidentifier="1" mime="png"></span></div>"#);
        let ContentBlock::ImageGroup { images } = &blocks[0] else {
            panic!("expected image group");
        };
        assert_eq!(images[0].format.as_deref(), Some("png"));
    }

    #[test]
    fn custom_prefix_builds_url() {
        let blocks = decode_with_prefix(
            r#"<div><span><img localidentifier="1" index="abc.jpg"></span></div>"#,
            "https://img.example.com/",
        );
        let ContentBlock::ImageGroup { images } = &blocks[0] else {
            panic!("expected image group");
        };
        assert_eq!(images[0].url.as_deref(), Some("https://img.example.com/abc.jpg"));
    }

    #[test]
    fn top_level_text_and_other_tags_are_skipped() {
        let blocks = decode("loose text<h1>Heading</h1><p>kept</p>");
        assert_eq!(
            blocks,
            vec![ContentBlock::Text {
                html_content: "kept".to_string()
            }]
        );
    }
}
