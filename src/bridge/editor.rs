use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value, json};

use super::action::Action;
use super::channel::{OutboundChannel, RendererSink};
use super::error::BridgeError;
use super::link::LinkDialog;
use super::listeners::{Listener, ListenerRegistry, SubscriptionId};
use super::pending::{PendingTable, QueryKind, RequestId};
use super::protocol::{InboundMessage, MessageKind, Payload, parse_inbound};
use crate::config::EditorConfig;
use crate::content::{self, ContentDocument};
use crate::layout::{self, CalibratedSize};

type Callback = Arc<dyn Fn() + Send + Sync>;
type ScrollHandler = Arc<dyn Fn(f64) + Send + Sync>;

/// Which recurring event a subscription belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    SelectionChange,
    ContentChange,
    SelectedTextChange,
}

/// Handle returned by listener registration; pass it to
/// [`Editor::unsubscribe`] to stop receiving events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    topic: Topic,
    id: SubscriptionId,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

#[derive(Default)]
struct Handlers {
    title_focus: Option<Callback>,
    content_focus: Option<Callback>,
    ready: Option<Callback>,
    scroll: Option<ScrollHandler>,
    add_image: Option<Callback>,
}

#[derive(Default)]
struct EditorState {
    pending: PendingTable,
    selection: ListenerRegistry<[String]>,
    content_change: ListenerRegistry<str>,
    selected_text: ListenerRegistry<str>,
    handlers: Handlers,
    link_dialog: LinkDialog,
    keyboard_height: f64,
    initialized: bool,
}

struct Inner {
    config: EditorConfig,
    channel: Mutex<OutboundChannel>,
    state: Mutex<EditorState>,
}

/// Host-side handle on one embedded editor.
///
/// Cheap to clone; every clone talks to the same renderer. Internal locks are
/// never held while user callbacks run or across an `.await`.
#[derive(Clone)]
pub struct Editor {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                channel: Mutex::new(OutboundChannel::new()),
                state: Mutex::new(EditorState::default()),
            }),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.inner.config
    }

    fn state(&self) -> MutexGuard<'_, EditorState> {
        lock(&self.inner.state)
    }

    fn send(&self, action: Action, payload: Option<Payload>) -> bool {
        lock(&self.inner.channel).send(action, payload.as_ref())
    }

    /// Send any action that takes no payload
    pub fn send_action(&self, action: Action) {
        self.send(action, None);
    }

    // --- lifecycle ---

    /// Connect a renderer. A fresh renderer has not initialized yet.
    pub fn attach(&self, sink: Arc<dyn RendererSink>) {
        lock(&self.inner.channel).attach(sink);
        self.state().initialized = false;
        tracing::debug!("renderer attached");
    }

    /// Disconnect the renderer and cancel queries that can no longer be answered
    pub fn detach(&self) {
        let was_attached = lock(&self.inner.channel).detach();
        let cancelled = self.state().pending.cancel_all();
        if was_attached {
            tracing::debug!(cancelled, "renderer detached");
        }
    }

    /// Detach only while `sink` is still the attached renderer. A renderer
    /// that was already replaced leaves the editor and its queries alone.
    pub fn detach_sink(&self, sink: &Arc<dyn RendererSink>) -> bool {
        let detached = {
            let mut channel = lock(&self.inner.channel);
            channel.is_attached_to(sink) && channel.detach()
        };
        if detached {
            let cancelled = self.state().pending.cancel_all();
            tracing::debug!(cancelled, "renderer detached");
        }
        detached
    }

    pub fn is_attached(&self) -> bool {
        lock(&self.inner.channel).is_attached()
    }

    /// The editor page finished loading: size it, start the editor script and
    /// tell it which platform it runs on.
    pub fn on_load(&self) {
        let keyboard_height = {
            let mut state = self.state();
            state.initialized = false;
            state.keyboard_height
        };
        self.set_editor_height(self.available_height(keyboard_height));
        self.send(Action::Init, None);
        self.send(
            Action::SetPlatform,
            Some(Payload::text(self.inner.config.platform.as_str())),
        );
        if let Some(height) = self.inner.config.footer_height {
            self.set_footer_height(height);
        }
    }

    // --- inbound routing ---

    /// Handle one raw event posted by the renderer.
    ///
    /// Unparseable input is dropped without error.
    pub fn on_message(&self, raw: &str) {
        match parse_inbound(raw) {
            Some(message) => self.dispatch(message),
            None => tracing::trace!(bytes = raw.len(), "dropping malformed renderer message"),
        }
    }

    pub fn dispatch(&self, message: InboundMessage) {
        let InboundMessage {
            kind,
            data,
            request_id,
        } = message;

        match kind {
            MessageKind::TitleHtmlResponse
            | MessageKind::TitleTextResponse
            | MessageKind::ContentHtmlResponse
            | MessageKind::SelectedTextResponse => {
                if let Some(query) = QueryKind::for_response(kind) {
                    let resolved = self.state().pending.resolve(query, request_id, data);
                    if resolved.is_none() {
                        tracing::debug!(%query, ?request_id, "dropping orphaned response");
                    }
                }
            }
            MessageKind::Initialized => self.run_initialization(),
            MessageKind::LinkTouched => {
                self.prepare_insert();
                let title = data.get("title").and_then(Value::as_str).unwrap_or_default();
                let url = data.get("url").and_then(Value::as_str).unwrap_or_default();
                self.show_link_dialog(title, url);
            }
            MessageKind::Scroll => {
                let handler = self.state().handlers.scroll.clone();
                match (handler, data.as_f64()) {
                    (Some(handler), Some(offset)) => handler(offset),
                    (_, None) => tracing::trace!("scroll message without numeric offset"),
                    (None, _) => {}
                }
            }
            MessageKind::TitleFocused => {
                let handler = self.state().handlers.title_focus.clone();
                if let Some(handler) = handler {
                    handler();
                }
            }
            MessageKind::ContentFocused => {
                let handler = self.state().handlers.content_focus.clone();
                if let Some(handler) = handler {
                    handler();
                }
            }
            MessageKind::SelectionChange => {
                let Some(items) = data.get("items").and_then(Value::as_array) else {
                    tracing::trace!("selection change without items");
                    return;
                };
                let items: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect();
                let listeners = self.state().selection.snapshot();
                for listener in listeners {
                    listener(&items);
                }
            }
            MessageKind::ContentChange => {
                let Some(content) = data.get("content").and_then(Value::as_str) else {
                    tracing::trace!("content change without content");
                    return;
                };
                let listeners = self.state().content_change.snapshot();
                for listener in listeners {
                    listener(content);
                }
            }
            MessageKind::SelectedTextChanged => {
                let Some(text) = data.as_str() else {
                    tracing::trace!("selected text change without text");
                    return;
                };
                let listeners = self.state().selected_text.snapshot();
                for listener in listeners {
                    listener(text);
                }
            }
            MessageKind::InsertedImage => self.update_grid_view(),
            MessageKind::AddImageButtonPressed => {
                let handler = self.state().handlers.add_image.clone();
                if let Some(handler) = handler {
                    handler();
                }
            }
            MessageKind::Log => tracing::debug!(target: "renderer", message = %data),
            MessageKind::Unknown => tracing::trace!("ignoring unknown renderer message"),
        }
    }

    fn run_initialization(&self) {
        {
            let mut state = self.state();
            if state.initialized {
                tracing::debug!("renderer reported initialization twice, ignoring");
                return;
            }
            state.initialized = true;
        }

        let config = &self.inner.config;
        if let Some(css) = &config.custom_css {
            self.set_custom_css(css);
        }
        self.send(
            Action::SetTitlePlaceholder,
            config.title_placeholder.clone().map(Payload::Text),
        );
        self.send(
            Action::SetContentPlaceholder,
            config.content_placeholder.clone().map(Payload::Text),
        );
        self.set_title_html(&config.initial_title_html);
        self.set_content_html(&config.initial_content_html);
        if config.hidden_title {
            self.hide_title();
        }
        if config.enable_on_change {
            self.enable_on_change();
        }

        let ready = self.state().handlers.ready.clone();
        if let Some(ready) = ready {
            ready();
        }
        tracing::debug!("editor initialized");
    }

    // --- registration ---

    /// Receive the active formatting items whenever the selection moves
    pub fn register_toolbar<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[String]) + Send + Sync + 'static,
    {
        let listener: Listener<[String]> = Arc::new(listener);
        let id = self.state().selection.add(listener);
        Subscription {
            topic: Topic::SelectionChange,
            id,
        }
    }

    pub fn register_content_change_listener<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let listener: Listener<str> = Arc::new(listener);
        let id = self.state().content_change.add(listener);
        Subscription {
            topic: Topic::ContentChange,
            id,
        }
    }

    pub fn add_selected_text_change_listener<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let listener: Listener<str> = Arc::new(listener);
        let id = self.state().selected_text.add(listener);
        Subscription {
            topic: Topic::SelectedTextChange,
            id,
        }
    }

    /// Returns whether the subscription was still registered
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut state = self.state();
        match subscription.topic {
            Topic::SelectionChange => state.selection.remove(subscription.id),
            Topic::ContentChange => state.content_change.remove(subscription.id),
            Topic::SelectedTextChange => state.selected_text.remove(subscription.id),
        }
    }

    pub fn listener_count(&self, topic: Topic) -> usize {
        let state = self.state();
        match topic {
            Topic::SelectionChange => state.selection.len(),
            Topic::ContentChange => state.content_change.len(),
            Topic::SelectedTextChange => state.selected_text.len(),
        }
    }

    pub fn set_title_focus_handler<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.state().handlers.title_focus = Some(Arc::new(handler));
        self.send(Action::SetTitleFocusHandler, None);
    }

    pub fn set_content_focus_handler<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.state().handlers.content_focus = Some(Arc::new(handler));
        self.send(Action::SetContentFocusHandler, None);
    }

    /// Called once the renderer finished its initialization sequence
    pub fn set_ready_callback<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.state().handlers.ready = Some(Arc::new(callback));
    }

    /// Receives vertical offsets the page asks the embedding view to scroll to
    pub fn set_scroll_handler<F>(&self, handler: F)
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.state().handlers.scroll = Some(Arc::new(handler));
    }

    pub fn set_add_image_handler<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.state().handlers.add_image = Some(Arc::new(handler));
    }

    // --- title and content ---

    pub fn focus_title(&self) {
        self.send(Action::FocusTitle, None);
    }

    pub fn focus_content(&self) {
        self.send(Action::FocusContent, None);
    }

    pub fn blur_title_editor(&self) {
        self.send(Action::BlurTitleEditor, None);
    }

    pub fn blur_content_editor(&self) {
        self.send(Action::BlurContentEditor, None);
    }

    pub fn hide_title(&self) {
        self.send(Action::HideTitle, None);
    }

    pub fn show_title(&self) {
        self.send(Action::ShowTitle, None);
    }

    pub fn toggle_title(&self) {
        self.send(Action::ToggleTitle, None);
    }

    pub fn set_title_html(&self, html: &str) {
        self.send(Action::SetTitleHtml, Some(Payload::text(html)));
    }

    pub fn set_content_html(&self, html: &str) {
        self.send(Action::SetContentHtml, Some(Payload::text(html)));
    }

    pub fn enable_on_change(&self) {
        self.send(Action::EnableOnChange, None);
    }

    pub fn set_title_placeholder(&self, placeholder: &str) {
        self.send(Action::SetTitlePlaceholder, Some(Payload::text(placeholder)));
    }

    pub fn set_content_placeholder(&self, placeholder: &str) {
        self.send(Action::SetContentPlaceholder, Some(Payload::text(placeholder)));
    }

    pub fn set_custom_css(&self, css: &str) {
        self.send(Action::SetCustomCss, Some(Payload::text(css)));
    }

    pub fn prepare_insert(&self) {
        self.send(Action::PrepareInsert, None);
    }

    pub fn restore_selection(&self) {
        self.send(Action::RestoreSelection, None);
    }

    // --- formatting ---

    pub fn set_bold(&self) {
        self.send(Action::SetBold, None);
    }

    pub fn set_italic(&self) {
        self.send(Action::SetItalic, None);
    }

    pub fn set_underline(&self) {
        self.send(Action::SetUnderline, None);
    }

    pub fn set_strikethrough(&self) {
        self.send(Action::SetStrikethrough, None);
    }

    pub fn set_subscript(&self) {
        self.send(Action::SetSubscript, None);
    }

    pub fn set_superscript(&self) {
        self.send(Action::SetSuperscript, None);
    }

    /// `level` outside 1..=6 is ignored
    pub fn heading(&self, level: u8) {
        let action = match level {
            1 => Action::Heading1,
            2 => Action::Heading2,
            3 => Action::Heading3,
            4 => Action::Heading4,
            5 => Action::Heading5,
            6 => Action::Heading6,
            _ => {
                tracing::debug!(level, "ignoring unsupported heading level");
                return;
            }
        };
        self.send(action, None);
    }

    pub fn set_paragraph(&self) {
        self.send(Action::SetParagraph, None);
    }

    pub fn remove_format(&self) {
        self.send(Action::RemoveFormat, None);
    }

    pub fn align_left(&self) {
        self.send(Action::AlignLeft, None);
    }

    pub fn align_center(&self) {
        self.send(Action::AlignCenter, None);
    }

    pub fn align_right(&self) {
        self.send(Action::AlignRight, None);
    }

    pub fn align_full(&self) {
        self.send(Action::AlignFull, None);
    }

    pub fn insert_bullets_list(&self) {
        self.send(Action::InsertBulletsList, None);
    }

    pub fn insert_ordered_list(&self) {
        self.send(Action::InsertOrderedList, None);
    }

    pub fn set_indent(&self) {
        self.send(Action::SetIndent, None);
    }

    pub fn set_outdent(&self) {
        self.send(Action::SetOutdent, None);
    }

    pub fn set_hr(&self) {
        self.send(Action::SetHr, None);
    }

    pub fn set_text_color(&self, color: &str) {
        self.send(Action::SetTextColor, Some(Payload::text(color)));
    }

    pub fn set_background_color(&self, color: &str) {
        self.send(Action::SetBackgroundColor, Some(Payload::text(color)));
    }

    // --- links ---

    pub fn insert_link(&self, url: &str, title: &str) {
        self.send(
            Action::InsertLink,
            Some(Payload::record(json!({ "url": url, "title": title }))),
        );
    }

    pub fn update_link(&self, url: &str, title: &str) {
        self.send(
            Action::UpdateLink,
            Some(Payload::record(json!({ "url": url, "title": title }))),
        );
    }

    pub fn show_link_dialog(&self, title: &str, url: &str) {
        self.state().link_dialog.show(title, url);
    }

    pub fn link_dialog(&self) -> LinkDialog {
        self.state().link_dialog.clone()
    }

    pub fn set_link_title(&self, title: &str) {
        self.state().link_dialog.set_title(title);
    }

    pub fn set_link_url(&self, url: &str) {
        self.state().link_dialog.set_url(url);
    }

    /// Send insert or update for the dialog's fields and close it.
    ///
    /// Returns `false` (and keeps the dialog open) when a field is empty.
    pub fn submit_link(&self) -> bool {
        let submission = {
            let mut state = self.state();
            let submission = state.link_dialog.submission();
            if submission.is_some() {
                state.link_dialog.hide();
            }
            submission
        };
        match submission {
            Some((action, payload)) => {
                self.send(action, Some(Payload::record(payload)));
                true
            }
            None => false,
        }
    }

    pub fn dismiss_link_dialog(&self) {
        self.state().link_dialog.hide();
    }

    // --- images ---

    pub fn calibrated_size(&self) -> CalibratedSize {
        layout::calibrated_size(self.inner.config.grid_width)
    }

    /// Insert an image at the saved caret position
    pub fn insert_image(&self, attributes: Value, close_image_data: Value, show_video_thumbnail: bool) {
        self.prepare_insert();
        self.send(
            Action::InsertImage,
            Some(Payload::record(json!({
                "attributes": attributes,
                "closeImageData": close_image_data,
                "showVideoThumbnail": show_video_thumbnail,
            }))),
        );
    }

    /// Insert an image into the grid group, sized to the calibrated cell
    pub fn insert_image_into_grid(&self, mut attributes: Map<String, Value>, close_image_data: Value) {
        let size = self.calibrated_size();
        attributes.insert("calibratedWidth".to_string(), json!(size.calibrated_width));
        attributes.insert("calibratedHeight".to_string(), json!(size.calibrated_height));
        self.prepare_insert();
        self.send(
            Action::InsertImageIntoGrid,
            Some(Payload::record(json!({
                "attributes": attributes,
                "closeImageData": close_image_data,
            }))),
        );
    }

    pub fn create_grid_image_group(&self) {
        let size = self.calibrated_size();
        self.prepare_insert();
        self.send(
            Action::CreateGridImageGroup,
            Some(Payload::record(json!({
                "attributes": {
                    "width": size.calibrated_width,
                    "height": size.calibrated_height,
                    "groupId": "0",
                }
            }))),
        );
    }

    /// Push the current cell size so the page can relayout the grid
    pub fn update_grid_view(&self) {
        let size = self.calibrated_size();
        self.send(
            Action::UpdateGridView,
            Some(Payload::record(json!({
                "calibratedWidth": size.calibrated_width,
                "calibratedHeight": size.calibrated_height,
            }))),
        );
    }

    pub fn update_image_with_url(&self, url: &str, media_id: &str, local_id: &str) {
        self.send(
            Action::UpdateImageWithUrl,
            Some(Payload::record(json!({
                "url": url,
                "mediaId": media_id,
                "localId": local_id,
            }))),
        );
    }

    pub fn remove_image_with_id(&self, image_id: &str) {
        self.send(Action::RemoveImageWithId, Some(Payload::text(image_id)));
    }

    pub fn remove_dim_filter(&self, index: &str) {
        self.send(Action::RemoveDimFilter, Some(Payload::text(index)));
    }

    // --- sizing ---

    pub fn set_editor_height(&self, height: f64) {
        self.send(Action::SetEditorHeight, Some(Payload::float(height)));
    }

    pub fn set_footer_height(&self, height: f64) {
        self.send(Action::SetFooterHeight, Some(Payload::float(height)));
    }

    pub fn set_platform(&self) {
        self.send(
            Action::SetPlatform,
            Some(Payload::text(self.inner.config.platform.as_str())),
        );
    }

    /// Remember the keyboard height; it is applied the next time the page loads
    pub fn keyboard_shown(&self, height: f64) {
        self.state().keyboard_height = height;
    }

    pub fn keyboard_hidden(&self) {
        self.state().keyboard_height = 0.0;
    }

    pub fn keyboard_height(&self) -> f64 {
        self.state().keyboard_height
    }

    fn available_height(&self, keyboard_height: f64) -> f64 {
        let layout = &self.inner.config.layout;
        layout::editor_available_height(
            layout.window_height,
            keyboard_height,
            layout.content_inset,
            layout.margin,
        )
    }

    // --- queries ---

    pub async fn get_title_html(&self) -> Result<String, BridgeError> {
        self.query(QueryKind::TitleHtml).await
    }

    pub async fn get_title_text(&self) -> Result<String, BridgeError> {
        self.query(QueryKind::TitleText).await
    }

    pub async fn get_content_html(&self) -> Result<String, BridgeError> {
        self.query(QueryKind::ContentHtml).await
    }

    pub async fn get_selected_text(&self) -> Result<String, BridgeError> {
        self.query(QueryKind::SelectedText).await
    }

    /// Ask the renderer for a value and wait for the matching response.
    ///
    /// Fails with `Timeout` if nothing arrives within the configured query
    /// timeout, and with `Cancelled` if the renderer is detached first.
    pub async fn query(&self, kind: QueryKind) -> Result<String, BridgeError> {
        // Registered under the channel lock: a concurrent detach either runs
        // first or cancels this entry
        let (id, receiver) = {
            let mut channel = lock(&self.inner.channel);
            if !channel.is_attached() {
                return Err(BridgeError::Detached);
            }
            let (id, receiver) = self.state().pending.register(kind);
            let payload = Payload::record(json!({ "requestId": id.get() }));
            channel.send(kind.action(), Some(&payload));
            (id, receiver)
        };
        let _entry = PendingEntry { editor: self, id };

        let after = self.inner.config.query_timeout();
        let outcome = tokio::time::timeout(after, receiver).await;
        match outcome {
            Ok(Ok(data)) => response_text(kind, data),
            Ok(Err(_)) => Err(BridgeError::Cancelled { kind }),
            Err(_) => {
                tracing::warn!(%kind, timeout_ms = after.as_millis() as u64, "query timed out");
                Err(BridgeError::Timeout { kind, after })
            }
        }
    }

    /// Settle every in-flight query with `Cancelled`
    pub fn cancel_queries(&self) -> usize {
        self.state().pending.cancel_all()
    }

    pub fn pending_queries(&self) -> usize {
        self.state().pending.len()
    }

    // --- export ---

    /// Fetch the content HTML and decode it into blocks
    pub async fn get_html(&self) -> Result<ContentDocument, BridgeError> {
        let html = self.get_content_html().await?;
        tracing::debug!(bytes = html.len(), "decoding content html");
        Ok(content::decode_document(&html, &self.inner.config.cdn_prefix))
    }

    /// Content as the `{"blocks": [...]}` JSON the publishing API expects
    pub async fn export_json(&self) -> Result<String, BridgeError> {
        Ok(self.get_html().await?.to_json())
    }
}

/// Drops a query's table entry once its caller stops waiting, however that
/// happens
struct PendingEntry<'a> {
    editor: &'a Editor,
    id: RequestId,
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        self.editor.state().pending.remove(self.id);
    }
}

fn response_text(kind: QueryKind, data: Value) -> Result<String, BridgeError> {
    match data {
        Value::String(text) => Ok(text),
        Value::Null => Ok(String::new()),
        _ => Err(BridgeError::UnexpectedResponse { kind }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    fn attached(config: EditorConfig) -> (Editor, mpsc::UnboundedReceiver<String>) {
        let editor = Editor::new(config);
        let (tx, rx) = mpsc::unbounded_channel();
        editor.attach(Arc::new(tx));
        (editor, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(script) = rx.try_recv() {
            out.push(script);
        }
        out
    }

    #[tokio::test]
    async fn detach_sink_leaves_replacement_renderer_attached() {
        let (old_tx, _old_rx) = mpsc::unbounded_channel::<String>();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel::<String>();
        let old: Arc<dyn RendererSink> = Arc::new(old_tx);
        let editor = Editor::new(EditorConfig::default());
        editor.attach(old.clone());
        editor.attach(Arc::new(new_tx));

        let query = tokio::spawn({
            let editor = editor.clone();
            async move { editor.get_title_text().await }
        });
        while editor.pending_queries() == 0 {
            tokio::task::yield_now().await;
        }

        assert!(!editor.detach_sink(&old));
        assert!(editor.is_attached());
        assert_eq!(editor.pending_queries(), 1);

        editor.on_message(r#"{"type":"TITLE_TEXT_RESPONSE","data":"still here"}"#);
        assert_eq!(query.await.unwrap().unwrap(), "still here");
        assert_eq!(drain(&mut new_rx).len(), 1);
    }

    #[tokio::test]
    async fn detach_sink_detaches_current_renderer() {
        let (tx, _rx) = mpsc::unbounded_channel::<String>();
        let sink: Arc<dyn RendererSink> = Arc::new(tx);
        let editor = Editor::new(EditorConfig::default());
        editor.attach(sink.clone());

        assert!(editor.detach_sink(&sink));
        assert!(!editor.is_attached());
        assert!(!editor.detach_sink(&sink));
    }

    #[test]
    fn commands_are_dropped_while_detached() {
        let editor = Editor::new(EditorConfig::default());
        editor.set_bold();
        editor.set_content_html("<p>x</p>");
        assert!(!editor.is_attached());
    }

    #[test]
    fn heading_levels_map_to_actions() {
        let (editor, mut rx) = attached(EditorConfig::default());
        editor.heading(2);
        editor.heading(7);
        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains(r#""type":"h2""#));
    }

    #[test]
    fn response_text_accepts_strings_and_null() {
        assert_eq!(
            response_text(QueryKind::TitleText, json!("abc")),
            Ok("abc".to_string())
        );
        assert_eq!(response_text(QueryKind::TitleText, Value::Null), Ok(String::new()));
        assert_eq!(
            response_text(QueryKind::TitleText, json!({"x": 1})),
            Err(BridgeError::UnexpectedResponse {
                kind: QueryKind::TitleText
            })
        );
    }

    #[test]
    fn insert_image_prepares_before_inserting() {
        let (editor, mut rx) = attached(EditorConfig::default());
        editor.insert_image(json!({"localId": "a1"}), json!({"src": "x.png"}), false);
        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("PREPARE_INSERT"));
        assert!(sent[1].contains("INST_IMAGE"));
        assert!(sent[1].contains(r#""showVideoThumbnail":false"#));
    }

    #[test]
    fn grid_insert_merges_calibrated_size() {
        let config = EditorConfig {
            grid_width: 90.0,
            ..EditorConfig::default()
        };
        let (editor, mut rx) = attached(config);
        let mut attributes = Map::new();
        attributes.insert("localId".to_string(), json!("a1"));
        editor.insert_image_into_grid(attributes, Value::Null);

        let sent = drain(&mut rx);
        let literal = sent[1]
            .trim_start_matches("zss_editor.dispatch(")
            .trim_end_matches(");true;");
        let message: Value = serde_json::from_str(literal).unwrap();
        assert_eq!(message["type"], "INST_IMAGE_INTO_GRID");
        assert_eq!(message["data"]["attributes"]["localId"], "a1");
        assert_eq!(message["data"]["attributes"]["calibratedWidth"], 90.0);
        assert_eq!(message["data"]["attributes"]["calibratedHeight"], 90.0);
    }

    #[test]
    fn keyboard_height_feeds_editor_height_on_load() {
        let (editor, mut rx) = attached(EditorConfig::default());
        editor.keyboard_shown(240.0);
        editor.on_load();
        let sent = drain(&mut rx);
        assert!(sent[0].contains(r#""type":"SET_EDITOR_HEIGHT","data":200.0"#));
        assert!(sent[1].contains("ZSS_INIT"));
        assert!(sent[2].contains(r#""type":"SET_PLATFORM","data":"ios""#));
        assert_eq!(sent.len(), 3);

        editor.keyboard_hidden();
        assert_eq!(editor.keyboard_height(), 0.0);
    }

    #[test]
    fn unsubscribed_listener_stops_receiving() {
        let (editor, _rx) = attached(EditorConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let subscription = editor.register_content_change_listener(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        editor.on_message(r#"{"type":"CONTENT_CHANGE","data":{"content":"a"}}"#);
        assert!(editor.unsubscribe(&subscription));
        assert!(!editor.unsubscribe(&subscription));
        editor.on_message(r#"{"type":"CONTENT_CHANGE","data":{"content":"b"}}"#);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(subscription.topic(), Topic::ContentChange);
    }

    #[test]
    fn listener_may_call_back_into_editor() {
        let (editor, mut rx) = attached(EditorConfig::default());
        let inner = editor.clone();
        editor.register_toolbar(move |_items| {
            inner.restore_selection();
        });

        editor.on_message(r#"{"type":"SELECTION_CHANGE","data":{"items":["bold"]}}"#);
        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("RESTORE_SELECTION"));
    }
}
