//! Controlled nodes: components, lifecycle states and scope resolution.

pub mod component;
pub(crate) mod controller;
pub mod lifecycle;
pub mod scope;

pub use component::{Component, Context, Plain};
pub use lifecycle::{LifecycleEvent, LifecycleObserver, LifecycleState};
pub use scope::ScopeMap;
