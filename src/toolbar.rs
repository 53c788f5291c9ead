//! Toolbar state bound to an [`Editor`].
//!
//! Drawing buttons is the host's job. The toolbar tracks which formatting the
//! caret currently sits in and turns button presses into editor commands.

use std::sync::{Arc, Mutex, PoisonError};

use crate::bridge::{Action, BridgeError, Editor, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolbarButton {
    /// Sends a payload-less formatting action
    Format(Action),
    InsertLink,
    InsertImage,
    TakePhoto,
    TakeVideo,
    HashTag,
}

impl ToolbarButton {
    pub const DEFAULT: [ToolbarButton; 6] = [
        ToolbarButton::InsertImage,
        ToolbarButton::Format(Action::SetBold),
        ToolbarButton::Format(Action::SetItalic),
        ToolbarButton::Format(Action::InsertBulletsList),
        ToolbarButton::Format(Action::InsertOrderedList),
        ToolbarButton::InsertLink,
    ];

    /// `None` unless `action` is a formatting action
    pub fn format(action: Action) -> Option<Self> {
        action.is_formatting().then_some(ToolbarButton::Format(action))
    }

    /// Name matched against selection-change items
    pub fn key(self) -> &'static str {
        match self {
            ToolbarButton::Format(action) => action.wire_name(),
            ToolbarButton::InsertLink => Action::InsertLink.wire_name(),
            ToolbarButton::InsertImage => Action::InsertImage.wire_name(),
            ToolbarButton::TakePhoto => "TAKE_PHOTO",
            ToolbarButton::TakeVideo => "TAKE_VIDEO",
            ToolbarButton::HashTag => "HASH_TAG",
        }
    }
}

/// What a press did, or what the host should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolbarOutcome {
    Sent(Action),
    /// The link dialog is open, pre-filled with the selected text
    LinkDialogOpened { selected_text: String },
    PickImage,
    TakePhoto,
    TakeVideo,
    HashTag,
}

pub struct Toolbar {
    editor: Editor,
    buttons: Vec<ToolbarButton>,
    selected: Arc<Mutex<Vec<String>>>,
    subscription: Subscription,
}

impl Toolbar {
    /// Bind the default buttons to `editor`
    pub fn attach(editor: Option<&Editor>) -> Result<Self, BridgeError> {
        Self::with_buttons(editor, ToolbarButton::DEFAULT.to_vec())
    }

    pub fn with_buttons(
        editor: Option<&Editor>,
        buttons: Vec<ToolbarButton>,
    ) -> Result<Self, BridgeError> {
        let editor = editor.ok_or(BridgeError::ToolbarWithoutEditor)?.clone();

        let selected = Arc::new(Mutex::new(Vec::new()));
        let subscription = editor.register_toolbar({
            let selected = Arc::clone(&selected);
            move |items: &[String]| {
                let mut selected = selected.lock().unwrap_or_else(PoisonError::into_inner);
                *selected = items.to_vec();
            }
        });

        Ok(Self {
            editor,
            buttons,
            selected,
            subscription,
        })
    }

    pub fn buttons(&self) -> &[ToolbarButton] {
        &self.buttons
    }

    pub fn selected_items(&self) -> Vec<String> {
        self.selected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Each configured button and whether the selection has it active
    pub fn rows(&self) -> Vec<(ToolbarButton, bool)> {
        let selected = self.selected.lock().unwrap_or_else(PoisonError::into_inner);
        self.buttons
            .iter()
            .map(|&button| {
                let active = selected.iter().any(|item| item == button.key());
                (button, active)
            })
            .collect()
    }

    pub async fn press(&self, button: ToolbarButton) -> Result<ToolbarOutcome, BridgeError> {
        tracing::debug!(button = button.key(), "toolbar press");
        let outcome = match button {
            ToolbarButton::Format(action) => {
                self.editor.send_action(action);
                ToolbarOutcome::Sent(action)
            }
            ToolbarButton::InsertLink => {
                self.editor.prepare_insert();
                let selected_text = self.editor.get_selected_text().await?;
                self.editor.show_link_dialog(&selected_text, "");
                ToolbarOutcome::LinkDialogOpened { selected_text }
            }
            ToolbarButton::InsertImage => {
                self.editor.prepare_insert();
                ToolbarOutcome::PickImage
            }
            ToolbarButton::TakePhoto => {
                self.editor.prepare_insert();
                ToolbarOutcome::TakePhoto
            }
            ToolbarButton::TakeVideo => {
                self.editor.prepare_insert();
                ToolbarOutcome::TakeVideo
            }
            ToolbarButton::HashTag => ToolbarOutcome::HashTag,
        };
        Ok(outcome)
    }

    /// Drop the placeholders of images whose upload failed
    pub fn remove_failed_uploads<I, S>(&self, image_ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut removed = 0;
        for id in image_ids {
            self.editor
                .remove_image_with_id(&format!("closeButton{}", id.as_ref()));
            removed += 1;
        }
        if removed > 0 {
            tracing::warn!(count = removed, "removed images that failed to upload");
        }
        removed
    }
}

impl Drop for Toolbar {
    fn drop(&mut self) {
        self.editor.unsubscribe(&self.subscription);
    }
}
