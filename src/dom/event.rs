//! Events, listeners and listener cancellation handles.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::node::NodeId;

/// An event dispatched at a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event type, e.g. "click".
    pub name: String,
    /// The node the event was dispatched at.
    pub target: NodeId,
    /// Free-form payload.
    pub detail: serde_json::Value,
}

impl Event {
    /// Create an event with a null payload.
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
            detail: serde_json::Value::Null,
        }
    }

    /// Attach a payload (builder).
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }
}

/// Shared event listener callback.
pub type EventCallback = Rc<dyn Fn(&Event)>;

/// Cancellation handle shared by a group of listeners.
///
/// Aborting the handle detaches every listener that was registered with it.
/// Clones share the same flag.
#[derive(Clone, Default)]
pub struct ListenerHandle {
    aborted: Rc<Cell<bool>>,
}

impl ListenerHandle {
    /// Create a live handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every listener registered with this handle.
    pub fn abort(&self) {
        self.aborted.set(true);
    }

    /// Whether [`abort`](Self::abort) has been called.
    pub fn is_aborted(&self) -> bool {
        self.aborted.get()
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

/// A registered listener.
#[derive(Clone)]
pub(crate) struct Listener {
    pub(crate) event: String,
    pub(crate) callback: EventCallback,
    pub(crate) handle: Option<ListenerHandle>,
}

impl Listener {
    pub(crate) fn is_live(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| !h.is_aborted())
    }
}
