//! Built-in components.
//!
//! - [`Provider`]: owns a named store for its subtree
//! - [`Conditional`]: hides itself unless its `condition` holds
//! - [`Else`]: hides itself while a sibling's condition holds

pub mod conditional;
pub mod otherwise;
pub mod provider;

pub use conditional::Conditional;
pub use otherwise::Else;
pub use provider::Provider;
