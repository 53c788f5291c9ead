use std::time::Duration;

use thiserror::Error;

use super::pending::QueryKind;

/// Failures surfaced by the host-side bridge
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("{kind} query timed out after {}ms", .after.as_millis())]
    Timeout { kind: QueryKind, after: Duration },

    #[error("{kind} query was cancelled before the renderer answered")]
    Cancelled { kind: QueryKind },

    #[error("no renderer is attached")]
    Detached,

    #[error("{kind} response did not carry text")]
    UnexpectedResponse { kind: QueryKind },

    #[error("toolbar has no editor")]
    ToolbarWithoutEditor,
}
