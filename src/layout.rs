// Sizing numbers the editor page needs from the host

use serde::{Deserialize, Serialize};

/// Slack subtracted from the editor height so the caret stays visible
/// above the keyboard
pub const EXTRA_EDITOR_PADDING: f64 = 200.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Insets {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub bottom: f64,
}

impl Insets {
    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// Cell size the image grid lays out inserted images with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibratedSize {
    pub calibrated_width: f64,
    pub calibrated_height: f64,
}

/// Grid cells are square and as wide as the host says a cell is
pub fn calibrated_size(grid_width: f64) -> CalibratedSize {
    CalibratedSize {
        calibrated_width: grid_width,
        calibrated_height: grid_width,
    }
}

/// Height left for the editor once the keyboard and surrounding chrome are
/// taken out of the window
pub fn editor_available_height(
    window_height: f64,
    keyboard_height: f64,
    content_inset: Insets,
    margin: Insets,
) -> f64 {
    let spacing = margin.vertical() + content_inset.vertical();
    window_height - keyboard_height - spacing - EXTRA_EDITOR_PADDING
}
