//! Declarative bindings: marker attributes, namespace handlers, reconciliation.
//!
//! - [`matching`]: [`BindingMatch`], the [`NamespaceHandler`] trait, [`NamespaceRegistry`]
//! - [`reconcile`]: the subtree walk and [`HandlerContext`]
//! - [`handlers`]: built-in `attr`, `set`, `on` and `cls` handlers

pub mod handlers;
pub mod matching;
pub mod reconcile;

pub use matching::{BindingMatch, HandlerRef, NamespaceHandler, NamespaceRegistry};
pub use reconcile::HandlerContext;
