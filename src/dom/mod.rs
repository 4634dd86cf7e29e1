//! Host render tree: slotmap-backed node arena with attributes, listeners
//! and mutation records.

pub mod event;
pub mod mutation;
pub mod node;
pub mod tree;

pub use event::{Event, EventCallback, ListenerHandle};
pub use mutation::Mutation;
pub use node::{NodeData, NodeId};
pub use tree::Dom;
