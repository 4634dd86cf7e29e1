//! Tree operations: insert, remove, siblings, attributes, listeners.

use std::collections::VecDeque;

use slotmap::{SecondaryMap, SlotMap};

use super::event::{Event, EventCallback, Listener, ListenerHandle};
use super::mutation::Mutation;
use super::node::{NodeData, NodeId};

/// Empty slice constant for returning when a node has no children.
const EMPTY_CHILDREN: &[NodeId] = &[];

/// The host render tree, backed by a slotmap arena.
///
/// All nodes live in a single `SlotMap`. Parent/child relationships are stored
/// in secondary maps so that node removal is O(subtree size) and lookup is O(1).
///
/// Mutating methods (`insert_child`, `remove`, `set_attribute`, ...) append
/// [`Mutation`] records. Direct access through [`get_mut`](Dom::get_mut) is not
/// observed.
pub struct Dom {
    pub(crate) nodes: SlotMap<NodeId, NodeData>,
    children: SecondaryMap<NodeId, Vec<NodeId>>,
    parent: SecondaryMap<NodeId, NodeId>,
    listeners: SecondaryMap<NodeId, Vec<Listener>>,
    root: Option<NodeId>,
    mutations: Vec<Mutation>,
    loading: bool,
}

impl Dom {
    /// Create an empty, fully loaded DOM.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            children: SecondaryMap::new(),
            parent: SecondaryMap::new(),
            listeners: SecondaryMap::new(),
            root: None,
            mutations: Vec::new(),
            loading: false,
        }
    }

    /// Create an empty DOM that is still loading.
    ///
    /// While loading, the last child at each level may still receive siblings,
    /// so nodes on that path are not considered settled until a sibling shows
    /// up or [`finish_loading`](Dom::finish_loading) is called.
    pub fn streaming() -> Self {
        Self {
            loading: true,
            ..Self::new()
        }
    }

    // ── Structure ────────────────────────────────────────────────────

    /// Insert a root-level node (no parent).
    ///
    /// If no root has been set yet, this node becomes the root.
    pub fn insert(&mut self, data: NodeData) -> NodeId {
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        if self.root.is_none() {
            self.root = Some(id);
        }
        id
    }

    /// Append a node as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics (debug) if `parent` does not exist in the tree.
    pub fn insert_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        debug_assert!(
            self.nodes.contains_key(parent),
            "parent node does not exist"
        );
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        self.parent.insert(id, parent);
        if let Some(kids) = self.children.get_mut(parent) {
            kids.push(id);
        }
        self.record_child_list(parent, vec![id], Vec::new());
        id
    }

    /// Remove a node and all its descendants recursively.
    ///
    /// Records a child-list change on the parent and a `Detached` record for
    /// every removed node, parents before children. Returns the `NodeData` for
    /// the removed node, or `None` if it didn't exist.
    pub fn remove(&mut self, id: NodeId) -> Option<NodeData> {
        if !self.nodes.contains_key(id) {
            return None;
        }

        // Detach from parent's children list.
        if let Some(parent_id) = self.parent.remove(id) {
            if let Some(siblings) = self.children.get_mut(parent_id) {
                siblings.retain(|&child| child != id);
            }
            self.record_child_list(parent_id, Vec::new(), vec![id]);
        }

        // Clear root if we're removing it.
        if self.root == Some(id) {
            self.root = None;
        }

        // Collect all descendants (BFS) to remove them.
        let mut to_remove = VecDeque::new();
        to_remove.push_back(id);
        let mut removed_root_data = None;

        while let Some(current) = to_remove.pop_front() {
            // Queue children before removing.
            if let Some(kids) = self.children.remove(current) {
                to_remove.extend(kids);
            }
            self.parent.remove(current);
            self.listeners.remove(current);
            let data = self.nodes.remove(current);
            self.mutations.push(Mutation::Detached { node: current });
            if current == id {
                removed_root_data = data;
            }
        }

        removed_root_data
    }

    /// Get the parent of a node, if it has one.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(id).copied()
    }

    /// Get the children of a node. Returns an empty slice if the node has no children
    /// or does not exist.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// The sibling immediately after `id`, if any.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|&s| s == id)?;
        siblings.get(pos + 1).copied()
    }

    /// Immutable access to a node's data.
    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    /// Mutable access to a node's data. Changes made here are not recorded.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id)
    }

    /// The current root node, if set.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of nodes in the DOM.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the DOM is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the DOM contains a node with the given id.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    // ── Attributes and content ───────────────────────────────────────

    /// Read an attribute.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes.get(id)?.attribute(name)
    }

    /// Set an attribute. Records a mutation if the value changed.
    ///
    /// Returns `false` if the node does not exist.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> bool {
        let Some(data) = self.nodes.get_mut(id) else {
            return false;
        };
        let value = value.into();
        let previous = data.set_attribute(name.to_owned(), value.clone());
        if previous.as_deref() != Some(value.as_str()) {
            self.mutations.push(Mutation::Attribute {
                node: id,
                name: name.to_owned(),
                previous,
                current: Some(value),
            });
        }
        true
    }

    /// Remove an attribute. Records a mutation if it was present.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let previous = self.nodes.get_mut(id)?.remove_attribute(name)?;
        self.mutations.push(Mutation::Attribute {
            node: id,
            name: name.to_owned(),
            previous: Some(previous.clone()),
            current: None,
        });
        Some(previous)
    }

    /// Text content of a node (empty if it does not exist).
    pub fn text(&self, id: NodeId) -> &str {
        self.nodes.get(id).map_or("", |d| d.text.as_str())
    }

    /// Replace the text content of a node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(data) = self.nodes.get_mut(id) {
            data.text = text.into();
        }
    }

    // ── Listeners ────────────────────────────────────────────────────

    /// Register an event listener on `id`.
    ///
    /// With a handle, the listener stays attached until the handle is aborted.
    pub fn add_listener(
        &mut self,
        id: NodeId,
        event: impl Into<String>,
        callback: EventCallback,
        handle: Option<ListenerHandle>,
    ) {
        if !self.nodes.contains_key(id) {
            return;
        }
        let listeners = self.listeners.entry(id).map(|e| e.or_default());
        if let Some(listeners) = listeners {
            listeners.retain(Listener::is_live);
            listeners.push(Listener {
                event: event.into(),
                callback,
                handle,
            });
        }
    }

    /// Number of live listeners for `event` on `id`.
    pub fn listener_count(&self, id: NodeId, event: &str) -> usize {
        self.listeners.get(id).map_or(0, |listeners| {
            listeners
                .iter()
                .filter(|l| l.event == event && l.is_live())
                .count()
        })
    }

    /// Invoke every live listener registered for `event.name` on its target.
    ///
    /// Returns the number of listeners called.
    pub fn dispatch(&self, event: &Event) -> usize {
        let callbacks: Vec<EventCallback> = self
            .listeners
            .get(event.target)
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|l| l.event == event.name && l.is_live())
                    .map(|l| l.callback.clone())
                    .collect()
            })
            .unwrap_or_default();
        for callback in &callbacks {
            callback(event);
        }
        callbacks.len()
    }

    // ── Mutation records and loading state ───────────────────────────

    /// Drain all pending mutation records.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }

    /// Whether there are undelivered mutation records.
    pub fn has_mutations(&self) -> bool {
        !self.mutations.is_empty()
    }

    /// Whether the document is still being streamed in.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Mark the document as fully loaded. Records [`Mutation::Loaded`] once.
    pub fn finish_loading(&mut self) {
        if self.loading {
            self.loading = false;
            self.mutations.push(Mutation::Loaded);
        }
    }

    fn record_child_list(&mut self, parent: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
        self.mutations.push(Mutation::ChildList {
            parent,
            added,
            removed,
        });
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}
