use serde_json::{Value, json};

use super::action::Action;

/// Fields behind the insert/edit link dialog.
///
/// Drawing the dialog is up to the host; the bridge only keeps its state so a
/// touched link can pre-fill it and a submit can pick the right command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkDialog {
    pub visible: bool,
    /// URL of the link being edited; empty when inserting a new one
    pub initial_url: String,
    pub title: String,
    pub url: String,
}

impl LinkDialog {
    pub fn show(&mut self, title: impl Into<String>, url: impl Into<String>) {
        let url = url.into();
        self.initial_url = url.clone();
        self.title = title.into();
        self.url = url;
        self.visible = true;
    }

    pub fn hide(&mut self) {
        *self = Self::default();
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn is_new(&self) -> bool {
        self.initial_url.is_empty()
    }

    pub fn can_submit(&self) -> bool {
        self.visible && !self.title.trim().is_empty() && !self.url.trim().is_empty()
    }

    /// Command and payload a submit should send, if the fields allow it
    pub fn submission(&self) -> Option<(Action, Value)> {
        if !self.can_submit() {
            return None;
        }
        let action = if self.is_new() {
            Action::InsertLink
        } else {
            Action::UpdateLink
        };
        Some((action, json!({ "url": self.url, "title": self.title })))
    }
}
