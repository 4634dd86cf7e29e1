//! # gilt-logic
//!
//! Reactive stores, node lifecycles and declarative bindings for a retained
//! node tree.
//!
//! A *provider* node owns a named [`ReactiveStore`](reactive::ReactiveStore).
//! Descendants bind to it with marker attributes such as
//! `attr:hidden="{s.visible}"` or `cls:active|selected="{s.on}"`; whenever the
//! store changes, the provider re-applies every marker in its subtree on the
//! next tick. Updates are coalesced per node, nested providers reconcile their
//! own subtrees, and event listeners attached by bindings never accumulate.
//!
//! ## Core Systems
//!
//! - **[`reactive`]**: Stores, values, `{scope.path}` expressions
//! - **[`scheduler`]**: Frame queue and per-node update debouncing
//! - **[`element`]**: Component trait, lifecycle states, scope resolution
//! - **[`binding`]**: Marker matching, reconciliation, built-in handlers
//! - **[`runtime`]**: The runtime tying everything together
//! - **[`dom`]**: Slotmap-backed host tree with mutation records and listeners
//! - **[`components`]**: Built-in `Provider` and `Conditional`
//! - **[`testing`]**: Headless harness and snapshot helpers

// Foundation
pub mod config;
pub mod dom;
pub mod error;

// Reactivity
pub mod reactive;
pub mod scheduler;

// Lifecycle and bindings
pub mod binding;
pub mod element;

// Runtime
pub mod components;
pub mod runtime;

// Testing
pub mod testing;

pub use config::RuntimeConfig;
pub use element::{Component, Context, LifecycleEvent, LifecycleState};
pub use error::{HookError, HookResult, StoreError};
pub use reactive::{ReactiveStore, Value};
pub use runtime::{Runtime, TickReport};
