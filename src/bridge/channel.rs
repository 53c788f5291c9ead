use std::sync::Arc;

use tokio::sync::mpsc;

use super::action::Action;
use super::protocol::{EVAL_SUFFIX, Payload, encode};

/// Something that can evaluate a script inside the renderer.
///
/// Delivery is fire-and-forget. Implementations must not call back into the
/// editor that owns them.
pub trait RendererSink: Send + Sync {
    fn inject(&self, script: &str);
}

impl RendererSink for mpsc::UnboundedSender<String> {
    fn inject(&self, script: &str) {
        if self.send(script.to_string()).is_err() {
            tracing::debug!("renderer queue closed, instruction dropped");
        }
    }
}

/// Adapts a closure into a sink
pub struct FnSink<F>(pub F);

impl<F> RendererSink for FnSink<F>
where
    F: Fn(&str) + Send + Sync,
{
    fn inject(&self, script: &str) {
        (self.0)(script)
    }
}

/// Ordered, one-way path from the host to the renderer
#[derive(Default)]
pub struct OutboundChannel {
    sink: Option<Arc<dyn RendererSink>>,
    delivered: u64,
}

impl OutboundChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, sink: Arc<dyn RendererSink>) {
        self.sink = Some(sink);
    }

    /// Returns whether a renderer was attached
    pub fn detach(&mut self) -> bool {
        self.sink.take().is_some()
    }

    pub fn is_attached(&self) -> bool {
        self.sink.is_some()
    }

    /// Whether `sink` is the renderer currently attached
    pub fn is_attached_to(&self, sink: &Arc<dyn RendererSink>) -> bool {
        self.sink
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, sink))
    }

    /// Number of instructions handed to a sink so far
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Encode and deliver one instruction.
    ///
    /// Without an attached renderer nothing is encoded and `false` is returned.
    pub fn send(&mut self, action: Action, payload: Option<&Payload>) -> bool {
        let Some(sink) = &self.sink else {
            tracing::trace!(%action, "no renderer attached, dropping instruction");
            return false;
        };

        let mut script = encode(action, payload).into_script();
        script.push_str(EVAL_SUFFIX);
        tracing::trace!(%action, bytes = script.len(), "injecting instruction");
        sink.inject(&script);
        self.delivered += 1;
        true
    }
}
