//! Lifecycle states and notifications.
//!
//! Every controlled node moves through
//! `Constructed → Connected → AwaitingSettle → Settled → Initialized ⇄ Updating`
//! and ends in `Disconnected`. `Stalled` is entered instead of `Settled` when
//! settle detection gives up.
//!
//! Each transition and each observed change is announced as a
//! [`LifecycleEvent`] to the observers registered with
//! [`Runtime::observe`](crate::runtime::Runtime::observe).

use std::rc::Rc;

use crate::dom::node::NodeId;

// ---------------------------------------------------------------------------
// LifecycleState
// ---------------------------------------------------------------------------

/// Per-node lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Controller created, not yet attached.
    Constructed,
    /// Attached to the tree; attach hooks running.
    Connected,
    /// Waiting for the host to finish constructing the node.
    AwaitingSettle,
    /// Structurally settled; no update pass has run yet.
    Settled,
    /// At least one update pass ran; idle.
    Initialized,
    /// An update pass is running.
    Updating,
    /// Settle detection exceeded its retry cap.
    Stalled,
    /// Detached from the tree. Terminal.
    Disconnected,
}

impl LifecycleState {
    /// Whether the node has been confirmed structurally complete.
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            LifecycleState::Settled | LifecycleState::Initialized | LifecycleState::Updating
        )
    }

    /// Whether the first update pass has marked the node initialized.
    pub fn is_initialized(self) -> bool {
        matches!(self, LifecycleState::Initialized | LifecycleState::Updating)
    }

    /// Whether the node is still attached.
    pub fn is_connected(self) -> bool {
        !matches!(
            self,
            LifecycleState::Constructed | LifecycleState::Disconnected
        )
    }
}

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// Notifications emitted by a node's controller, in the order they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// The node was attached and its attach hook ran.
    Attached,
    /// The node settled and now observes its children.
    Settled,
    /// Settle detection gave up after `attempts` re-checks.
    SettleTimedOut { attempts: u32 },
    /// An observed attribute changed after the node settled.
    AttributeChanged {
        name: String,
        previous: Option<String>,
        current: Option<String>,
    },
    /// Direct children were added or removed.
    ChildrenChanged {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// A store of an ancestor provider this node subscribes to changed.
    ProviderChanged { scope: String, property: String },
    /// The node's own store changed.
    StoreChanged { property: String },
    /// An update pass completed.
    Updated,
    /// The node was detached.
    Detached,
}

/// Callback registered for one node's lifecycle events.
pub type LifecycleObserver = Rc<dyn Fn(NodeId, &LifecycleEvent)>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settled_states() {
        assert!(!LifecycleState::Connected.is_settled());
        assert!(!LifecycleState::AwaitingSettle.is_settled());
        assert!(!LifecycleState::Stalled.is_settled());
        assert!(LifecycleState::Settled.is_settled());
        assert!(LifecycleState::Initialized.is_settled());
        assert!(LifecycleState::Updating.is_settled());
        assert!(!LifecycleState::Disconnected.is_settled());
    }

    #[test]
    fn initialized_states() {
        assert!(!LifecycleState::Settled.is_initialized());
        assert!(LifecycleState::Initialized.is_initialized());
        assert!(LifecycleState::Updating.is_initialized());
    }

    #[test]
    fn connected_states() {
        assert!(!LifecycleState::Constructed.is_connected());
        assert!(LifecycleState::Connected.is_connected());
        assert!(LifecycleState::Stalled.is_connected());
        assert!(!LifecycleState::Disconnected.is_connected());
    }
}
