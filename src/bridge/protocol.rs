use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::action::Action;

/// Function the editor page exposes for host instructions
pub const BRIDGE_ENTRY_POINT: &str = "zss_editor.dispatch";

/// Appended to every injected script so evaluation reports success
pub const EVAL_SUFFIX: &str = ";true;";

/// Data attached to an instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Free text, escaped before it is placed into the script
    Text(String),
    Number(Number),
    Bool(bool),
    /// Structured data, written as compact JSON
    Record(Value),
}

impl Payload {
    pub fn text(value: impl Into<String>) -> Self {
        Payload::Text(value.into())
    }

    pub fn record(value: Value) -> Self {
        Payload::Record(value)
    }

    pub fn integer(value: i64) -> Self {
        Payload::Number(value.into())
    }

    /// Non-finite values have no JSON form and are sent as `null`
    pub fn float(value: f64) -> Self {
        match Number::from_f64(value) {
            Some(number) => Payload::Number(number),
            None => Payload::Record(Value::Null),
        }
    }

    fn write_data(&self, out: &mut String) {
        match self {
            Payload::Text(text) => {
                out.push('"');
                escape_json_string(text, out);
                out.push('"');
            }
            Payload::Number(number) => out.push_str(&number.to_string()),
            Payload::Bool(flag) => out.push_str(if *flag { "true" } else { "false" }),
            Payload::Record(value) => out.push_str(&value.to_string()),
        }
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Payload::Bool(value)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Record(value)
    }
}

/// Escape `input` so it can sit between double quotes in the renderer's
/// script and survive a JSON parse unchanged.
pub fn escape_json_string(input: &str, out: &mut String) {
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '/' => out.push_str("\\/"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{2028}' || c == '\u{2029}' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
}

/// An encoded host-to-renderer instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    action: Action,
    script: String,
}

impl Instruction {
    pub fn action(&self) -> Action {
        self.action
    }

    /// Full statement, without the evaluation suffix
    pub fn as_script(&self) -> &str {
        &self.script
    }

    /// The `{type, data}` object literal passed to the entry point
    pub fn message_literal(&self) -> &str {
        let start = BRIDGE_ENTRY_POINT.len() + 1;
        &self.script[start..self.script.len() - 1]
    }

    pub fn into_script(self) -> String {
        self.script
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.script)
    }
}

/// Build the statement that hands `action` and its payload to the renderer.
///
/// `data` is left out entirely when there is no payload.
pub fn encode(action: Action, payload: Option<&Payload>) -> Instruction {
    let mut script = String::with_capacity(BRIDGE_ENTRY_POINT.len() + 48);
    script.push_str(BRIDGE_ENTRY_POINT);
    script.push_str("({\"type\":\"");
    script.push_str(action.wire_name());
    script.push('"');
    if let Some(payload) = payload {
        script.push_str(",\"data\":");
        payload.write_data(&mut script);
    }
    script.push_str("})");
    Instruction { action, script }
}

/// Kinds of events the renderer posts back to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    #[serde(rename = "ZSS_INITIALIZED")]
    Initialized,
    #[serde(rename = "TITLE_HTML_RESPONSE")]
    TitleHtmlResponse,
    #[serde(rename = "TITLE_TEXT_RESPONSE")]
    TitleTextResponse,
    #[serde(rename = "CONTENT_HTML_RESPONSE")]
    ContentHtmlResponse,
    #[serde(rename = "SELECTED_TEXT_RESPONSE")]
    SelectedTextResponse,
    #[serde(rename = "LINK_TOUCHED")]
    LinkTouched,
    #[serde(rename = "LOG")]
    Log,
    #[serde(rename = "SCROLL")]
    Scroll,
    #[serde(rename = "TITLE_FOCUSED")]
    TitleFocused,
    #[serde(rename = "CONTENT_FOCUSED")]
    ContentFocused,
    #[serde(rename = "SELECTION_CHANGE")]
    SelectionChange,
    #[serde(rename = "CONTENT_CHANGE")]
    ContentChange,
    #[serde(rename = "SELECTED_TEXT_CHANGED")]
    SelectedTextChanged,
    #[serde(rename = "INSERTED_IMAGE")]
    InsertedImage,
    #[serde(rename = "ADD_IMAGE_BUTTON_ONPRESS")]
    AddImageButtonPressed,
    /// Anything this host does not understand
    #[serde(other)]
    Unknown,
}

/// Event posted by the renderer. `data` is whatever the page sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub data: Value,
    /// Echo of the id carried by a query instruction, when the page supports it
    #[serde(rename = "requestId", default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

impl InboundMessage {
    pub fn new(kind: MessageKind, data: Value) -> Self {
        Self {
            kind,
            data,
            request_id: None,
        }
    }
}

/// Parse a raw renderer event. Anything that is not a well-formed message
/// yields `None`; the renderer is not trusted to send valid payloads.
pub fn parse_inbound(raw: &str) -> Option<InboundMessage> {
    serde_json::from_str(raw).ok()
}
