// Library exports for rtebridge
// The `rteb` binary and the test suite build on these

pub mod bridge;
pub mod config;
pub mod content;
pub mod layout;
pub mod toolbar;
pub mod transport;

pub use bridge::{BridgeError, Editor};
pub use config::EditorConfig;
pub use content::{ContentBlock, ContentDocument, ImageDescriptor};
