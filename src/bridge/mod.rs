//! Host side of the command/response bridge to the editor page.
//!
//! Commands go out as script instructions over an ordered [`OutboundChannel`];
//! events come back as JSON messages that [`Editor::on_message`] routes to
//! pending queries, listeners or handlers.

pub mod action;
pub mod channel;
pub mod editor;
pub mod error;
pub mod link;
pub mod listeners;
pub mod pending;
pub mod protocol;

pub use action::Action;
pub use channel::{FnSink, OutboundChannel, RendererSink};
pub use editor::{Editor, Subscription, Topic};
pub use error::BridgeError;
pub use link::LinkDialog;
pub use pending::QueryKind;
pub use protocol::{InboundMessage, Instruction, MessageKind, Payload, encode, parse_inbound};
