use std::sync::Arc;

use rtebridge::bridge::Editor;
use rtebridge::config::EditorConfig;
use serde_json::Value;
use tokio::sync::mpsc;

/// Helper to create an editor attached to an in-memory renderer queue
pub fn attached_editor(config: EditorConfig) -> (Editor, mpsc::UnboundedReceiver<String>) {
    let editor = Editor::new(config);
    let (tx, rx) = mpsc::unbounded_channel();
    editor.attach(Arc::new(tx));
    (editor, rx)
}

/// Helper config with a short query timeout
pub fn config_with_timeout(query_timeout_ms: u64) -> EditorConfig {
    EditorConfig {
        query_timeout_ms,
        ..EditorConfig::default()
    }
}

/// Everything sent to the renderer so far
pub fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
    let mut sent = Vec::new();
    while let Ok(script) = rx.try_recv() {
        sent.push(script);
    }
    sent
}

/// The `{type, data}` message literal inside an instruction script
pub fn message_of(script: &str) -> Value {
    let literal = script
        .strip_prefix("zss_editor.dispatch(")
        .and_then(|rest| rest.strip_suffix(");true;"))
        .unwrap_or_else(|| panic!("not a bridge instruction: {script}"));
    serde_json::from_str(literal).unwrap()
}

/// Wire names of everything sent so far, in order
pub fn sent_types(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
    drain(rx)
        .iter()
        .map(|script| message_of(script)["type"].as_str().unwrap().to_string())
        .collect()
}

/// Raw renderer event as it arrives over the bridge
pub fn renderer_message(kind: &str, data: Value) -> String {
    serde_json::json!({ "type": kind, "data": data }).to_string()
}

/// Wait until `count` queries are registered with the editor
pub async fn wait_for_pending(editor: &Editor, count: usize) {
    while editor.pending_queries() < count {
        tokio::task::yield_now().await;
    }
}
