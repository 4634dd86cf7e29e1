//! Provider: a node that owns a named store for its subtree.

use std::fmt;

use crate::element::{Component, Context};
use crate::error::HookResult;
use crate::reactive::{ReactiveStore, Value};

type InitFn = Box<dyn FnOnce(&ReactiveStore) -> Value>;

/// Owns a store, visible to descendants under the node's `name` attribute.
///
/// The store starts from the given initial value. An optional initializer runs
/// once the node has settled and replaces the root with what it returns, which
/// lets the initial state depend on the settled subtree.
pub struct Provider {
    initial: Option<Value>,
    init: Option<InitFn>,
}

impl Provider {
    /// A provider starting from `initial` (an object or an array).
    pub fn new(initial: impl Into<Value>) -> Self {
        Self {
            initial: Some(initial.into()),
            init: None,
        }
    }

    /// A provider starting empty whose root is computed once it settles.
    pub fn with_init(init: impl FnOnce(&ReactiveStore) -> Value + 'static) -> Self {
        Self {
            initial: Some(Value::object()),
            init: Some(Box::new(init)),
        }
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::new(Value::object())
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("initial", &self.initial)
            .field("init", &self.init.is_some())
            .finish()
    }
}

impl Component for Provider {
    fn init_store(&mut self) -> Option<Value> {
        Some(self.initial.take().unwrap_or_else(Value::object))
    }

    fn on_settled(&mut self, cx: &mut Context<'_>) -> HookResult {
        if let (Some(init), Some(store)) = (self.init.take(), cx.store()) {
            store.set_value(init(&store))?;
        }
        Ok(())
    }
}
