//! Mutation records produced by the DOM.
//!
//! The [`Dom`](super::Dom) appends a record for every structural or attribute
//! change made through its mutating methods. Records accumulate until drained
//! with [`Dom::take_mutations`](super::Dom::take_mutations), the same way the
//! host's mutation observers deliver batches.

use super::node::NodeId;

/// A single change to the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Direct children of `parent` were added or removed.
    ChildList {
        parent: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// An attribute was set, changed or removed.
    Attribute {
        node: NodeId,
        name: String,
        previous: Option<String>,
        current: Option<String>,
    },
    /// A node left the tree (reported for every node of a removed subtree).
    Detached { node: NodeId },
    /// The document finished loading; no more children are being streamed in.
    Loaded,
}

impl Mutation {
    /// The node this record is about, if it concerns one.
    pub fn target(&self) -> Option<NodeId> {
        match self {
            Mutation::ChildList { parent, .. } => Some(*parent),
            Mutation::Attribute { node, .. } | Mutation::Detached { node } => Some(*node),
            Mutation::Loaded => None,
        }
    }
}
