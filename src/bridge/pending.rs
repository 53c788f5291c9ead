use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::oneshot;

use super::action::Action;
use super::protocol::MessageKind;

/// The four "read current state" queries the renderer answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    TitleHtml,
    TitleText,
    ContentHtml,
    SelectedText,
}

impl QueryKind {
    pub const ALL: [QueryKind; 4] = [
        QueryKind::TitleHtml,
        QueryKind::TitleText,
        QueryKind::ContentHtml,
        QueryKind::SelectedText,
    ];

    /// Instruction that asks the renderer for this value
    pub fn action(self) -> Action {
        match self {
            QueryKind::TitleHtml => Action::GetTitleHtml,
            QueryKind::TitleText => Action::GetTitleText,
            QueryKind::ContentHtml => Action::GetContentHtml,
            QueryKind::SelectedText => Action::GetSelectedText,
        }
    }

    /// Message kind the renderer answers with
    pub fn response_kind(self) -> MessageKind {
        match self {
            QueryKind::TitleHtml => MessageKind::TitleHtmlResponse,
            QueryKind::TitleText => MessageKind::TitleTextResponse,
            QueryKind::ContentHtml => MessageKind::ContentHtmlResponse,
            QueryKind::SelectedText => MessageKind::SelectedTextResponse,
        }
    }

    /// Inverse of [`QueryKind::response_kind`]
    pub fn for_response(kind: MessageKind) -> Option<Self> {
        QueryKind::ALL
            .into_iter()
            .find(|query| query.response_kind() == kind)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueryKind::TitleHtml => "title html",
            QueryKind::TitleText => "title text",
            QueryKind::ContentHtml => "content html",
            QueryKind::SelectedText => "selected text",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlation id carried by a query instruction and echoed in its response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(self) -> u64 {
        self.0
    }
}

struct PendingRequest {
    kind: QueryKind,
    responder: oneshot::Sender<Value>,
    issued_at: Instant,
}

/// Queries waiting for the renderer to answer.
///
/// Ids increase monotonically, so map order is issue order.
#[derive(Default)]
pub struct PendingTable {
    next_id: u64,
    entries: BTreeMap<RequestId, PendingRequest>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a query; the receiver settles when it is resolved
    pub fn register(&mut self, kind: QueryKind) -> (RequestId, oneshot::Receiver<Value>) {
        self.next_id += 1;
        let id = RequestId(self.next_id);
        let (responder, receiver) = oneshot::channel();
        self.entries.insert(
            id,
            PendingRequest {
                kind,
                responder,
                issued_at: Instant::now(),
            },
        );
        (id, receiver)
    }

    /// Settle the request a response belongs to.
    ///
    /// With an id, only that request (of the same kind) matches. Without one,
    /// the oldest outstanding request of `kind` is settled. Requests whose
    /// caller already went away are discarded first. Returns the settled id,
    /// or `None` for an orphaned response.
    pub fn resolve(
        &mut self,
        kind: QueryKind,
        request_id: Option<u64>,
        data: Value,
    ) -> Option<RequestId> {
        self.entries.retain(|_, request| !request.responder.is_closed());

        let id = match request_id {
            Some(raw) => {
                let id = RequestId(raw);
                match self.entries.get(&id) {
                    Some(request) if request.kind == kind => id,
                    _ => return None,
                }
            }
            None => self
                .entries
                .iter()
                .find(|(_, request)| request.kind == kind)
                .map(|(id, _)| *id)?,
        };

        let request = self.entries.remove(&id)?;
        tracing::trace!(
            id = id.get(),
            %kind,
            waited_ms = request.issued_at.elapsed().as_millis() as u64,
            "query resolved"
        );
        // The caller may have stopped waiting in the meantime
        let _ = request.responder.send(data);
        Some(id)
    }

    /// Forget a request without settling it
    pub fn remove(&mut self, id: RequestId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Drop every outstanding request; their callers see a closed channel
    pub fn cancel_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn outstanding(&self, kind: QueryKind) -> usize {
        self.entries
            .values()
            .filter(|request| request.kind == kind)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
