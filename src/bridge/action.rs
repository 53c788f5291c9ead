// Command vocabulary understood by the renderer.
// Wire names match the constants the editor page switches on.

use std::fmt;
use std::str::FromStr;

macro_rules! actions {
    ($($(#[$meta:meta])* $variant:ident => $wire:literal,)+) => {
        /// Every instruction kind the host can send to the renderer
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Action {
            $($(#[$meta])* $variant,)+
        }

        impl Action {
            /// All actions, in declaration order
            pub const ALL: &'static [Action] = &[$(Action::$variant,)+];

            /// Name the renderer dispatches on
            pub fn wire_name(self) -> &'static str {
                match self {
                    $(Action::$variant => $wire,)+
                }
            }
        }
    };
}

actions! {
    Init => "ZSS_INIT",
    SetPlatform => "SET_PLATFORM",
    SetEditorHeight => "SET_EDITOR_HEIGHT",
    SetFooterHeight => "SET_FOOTER_HEIGHT",
    EnableOnChange => "ENABLE_ON_CHANGE",

    SetTitleHtml => "SET_TITLE_HTML",
    SetContentHtml => "SET_CONTENT_HTML",
    GetTitleHtml => "GET_TITLE_HTML",
    GetTitleText => "GET_TITLE_TEXT",
    GetContentHtml => "GET_CONTENT_HTML",
    GetSelectedText => "GET_SELECTED_TEXT",

    ToggleTitle => "TOGGLE_TITLE",
    HideTitle => "HIDE_TITLE",
    ShowTitle => "SHOW_TITLE",
    FocusTitle => "FOCUS_TITLE",
    FocusContent => "FOCUS_CONTENT",
    BlurTitleEditor => "BLUR_TITLE_EDITOR",
    BlurContentEditor => "BLUR_CONTENT_EDITOR",
    SetTitleFocusHandler => "SET_TITLE_FOCUS_HANDLER",
    SetContentFocusHandler => "SET_CONTENT_FOCUS_HANDLER",

    SetBold => "bold",
    SetItalic => "italic",
    SetUnderline => "underline",
    SetStrikethrough => "strikeThrough",
    SetSubscript => "subscript",
    SetSuperscript => "superscript",
    Heading1 => "h1",
    Heading2 => "h2",
    Heading3 => "h3",
    Heading4 => "h4",
    Heading5 => "h5",
    Heading6 => "h6",
    SetParagraph => "SET_PARAGRAPH",
    RemoveFormat => "REMOVE_FORMAT",
    AlignLeft => "justifyLeft",
    AlignCenter => "justifyCenter",
    AlignRight => "justifyRight",
    AlignFull => "justifyFull",
    InsertBulletsList => "unorderedList",
    InsertOrderedList => "orderedList",
    SetIndent => "indent",
    SetOutdent => "outdent",
    SetHr => "horizontalRule",
    SetTextColor => "SET_TEXT_COLOR",
    SetBackgroundColor => "SET_BACKGROUND_COLOR",

    InsertLink => "INST_LINK",
    UpdateLink => "UPDATE_LINK",

    InsertImage => "INST_IMAGE",
    InsertImageIntoGrid => "INST_IMAGE_INTO_GRID",
    CreateGridImageGroup => "CREATE_GRID_IMAGE_GROUP",
    UpdateGridView => "UPDATE_GRID_VIEW",
    UpdateImageWithUrl => "UPDATE_IMAGE_WITH_URL",
    RemoveImageWithId => "REMOVE_IMAGE_WITH_ID",
    RemoveDimFilter => "REMOVE_DIM_FILTER",

    SetTitlePlaceholder => "SET_TITLE_PLACEHOLDER",
    SetContentPlaceholder => "SET_CONTENT_PLACEHOLDER",
    SetCustomCss => "SET_CUSTOM_CSS",
    PrepareInsert => "PREPARE_INSERT",
    RestoreSelection => "RESTORE_SELECTION",
}

impl Action {
    /// Payload-less styling commands a toolbar button may send directly.
    ///
    /// These are also the names the renderer reports back in selection-change
    /// `items`, which is how a toolbar knows which buttons to highlight.
    pub fn is_formatting(self) -> bool {
        matches!(
            self,
            Action::SetBold
                | Action::SetItalic
                | Action::SetUnderline
                | Action::SetStrikethrough
                | Action::SetSubscript
                | Action::SetSuperscript
                | Action::Heading1
                | Action::Heading2
                | Action::Heading3
                | Action::Heading4
                | Action::Heading5
                | Action::Heading6
                | Action::SetParagraph
                | Action::RemoveFormat
                | Action::AlignLeft
                | Action::AlignCenter
                | Action::AlignRight
                | Action::AlignFull
                | Action::InsertBulletsList
                | Action::InsertOrderedList
                | Action::SetIndent
                | Action::SetOutdent
                | Action::SetHr
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Returned when text does not name a known action
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .iter()
            .copied()
            .find(|action| action.wire_name() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn wire_names_are_unique() {
        let names: HashSet<&str> = Action::ALL.iter().map(|a| a.wire_name()).collect();
        assert_eq!(names.len(), Action::ALL.len());
    }

    #[test]
    fn wire_names_need_no_escaping() {
        for action in Action::ALL {
            let name = action.wire_name();
            assert!(!name.is_empty());
            assert!(
                name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
                "unexpected character in {name}"
            );
        }
    }

    #[test]
    fn parses_wire_name_back_to_action() {
        assert_eq!("bold".parse::<Action>(), Ok(Action::SetBold));
        assert_eq!("GET_CONTENT_HTML".parse::<Action>(), Ok(Action::GetContentHtml));
        assert_eq!("justifyFull".parse::<Action>(), Ok(Action::AlignFull));
    }

    #[test]
    fn rejects_unknown_action_name() {
        let err = "makeItPretty".parse::<Action>().unwrap_err();
        assert_eq!(err, UnknownAction("makeItPretty".to_string()));
        assert_eq!(err.to_string(), "unknown action: makeItPretty");
    }

    #[test]
    fn formatting_set_excludes_stateful_commands() {
        assert!(Action::SetBold.is_formatting());
        assert!(Action::Heading6.is_formatting());
        assert!(Action::SetHr.is_formatting());
        assert!(!Action::InsertLink.is_formatting());
        assert!(!Action::GetContentHtml.is_formatting());
        assert!(!Action::SetTextColor.is_formatting());
        assert_eq!(Action::ALL.iter().filter(|a| a.is_formatting()).count(), 23);
    }
}
