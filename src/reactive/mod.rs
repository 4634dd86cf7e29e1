//! Reactive state: stores, values, path expressions.
//!
//! - [`ReactiveStore`]: named value tree with synchronous change notification.
//! - [`Value`]: JSON-like data plus derived values and event callbacks.
//! - [`PathExpression`]: the `{scope.a.b}` marker syntax.

pub mod path;
pub mod store;
pub mod value;

pub use path::PathExpression;
pub use store::{ReactiveStore, StoreChange, SubscriptionId, WeakStore, ROOT_PROPERTY};
pub use value::{Derived, Map, Reader, Value};
