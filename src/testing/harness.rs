//! Harness: drive a headless runtime from tests.
//!
//! The `Harness` owns a [`Runtime`] with a `body` root container and offers a
//! compact API for building trees, poking at them, running ticks and
//! inspecting the result.

use std::cell::RefCell;
use std::rc::Rc;

use crate::components::Provider;
use crate::config::RuntimeConfig;
use crate::dom::{Dom, Event, NodeData, NodeId};
use crate::element::{Component, LifecycleEvent};
use crate::reactive::{ReactiveStore, Value};
use crate::runtime::{Runtime, TickReport};

/// Upper bound on ticks run by [`Harness::settle`].
pub const SETTLE_TICKS: usize = 100;

// ---------------------------------------------------------------------------
// EventLog
// ---------------------------------------------------------------------------

/// Lifecycle events recorded for one node.
#[derive(Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<LifecycleEvent>>>);

impl EventLog {
    /// A copy of everything recorded so far.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.0.borrow().clone()
    }

    /// Drain the log.
    pub fn take(&self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    /// How many times `event` was recorded.
    pub fn count(&self, event: &LifecycleEvent) -> usize {
        self.0.borrow().iter().filter(|e| *e == event).count()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A headless runtime for testing.
///
/// # Examples
///
/// ```
/// use gilt_logic::dom::NodeData;
/// use gilt_logic::testing::Harness;
///
/// let mut h = Harness::new();
/// let ctx = h.provider(h.body(), "s", serde_json::json!({ "visible": false }));
/// let el = h.insert(ctx, NodeData::new("div").with_attr("attr:hidden", "{s.visible}"));
/// h.settle();
/// assert_eq!(h.attribute(el, "hidden"), None);
/// ```
pub struct Harness {
    runtime: Runtime,
    body: NodeId,
}

impl Harness {
    /// A fully loaded tree with default config.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// A fully loaded tree with the given config.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::from_dom(Dom::new(), config)
    }

    /// A tree that is still loading: nodes settle as siblings arrive or once
    /// [`finish_loading`](Harness::finish_loading) is called.
    pub fn streaming(config: RuntimeConfig) -> Self {
        Self::from_dom(Dom::streaming(), config)
    }

    fn from_dom(dom: Dom, config: RuntimeConfig) -> Self {
        let mut runtime = Runtime::with_dom(dom, config);
        let body = runtime.dom_mut().insert(NodeData::new("body"));
        Self { runtime, body }
    }

    /// The root container.
    pub fn body(&self) -> NodeId {
        self.body
    }

    // ── Building ─────────────────────────────────────────────────────

    /// Mount a [`Provider`] named `name` under `parent`.
    pub fn provider(&mut self, parent: NodeId, name: &str, initial: impl Into<Value>) -> NodeId {
        self.runtime.mount(
            parent,
            NodeData::new("le-context").with_attr("name", name),
            Provider::new(initial),
        )
    }

    /// Mount any component under `parent`.
    pub fn mount(
        &mut self,
        parent: NodeId,
        data: NodeData,
        component: impl Component + 'static,
    ) -> NodeId {
        self.runtime.mount(parent, data, component)
    }

    /// Insert a plain (uncontrolled) node under `parent`.
    pub fn insert(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        self.runtime.dom_mut().insert_child(parent, data)
    }

    // ── Interaction ──────────────────────────────────────────────────

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        self.runtime.set_attribute(node, name, value);
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        self.runtime.remove_attribute(node, name);
    }

    pub fn remove(&mut self, node: NodeId) {
        self.runtime.remove(node);
    }

    pub fn finish_loading(&mut self) {
        self.runtime.finish_loading();
    }

    /// Dispatch `event` at `node`. Returns the number of listeners called.
    pub fn dispatch(&mut self, node: NodeId, event: &str) -> usize {
        self.runtime.dispatch(&Event::new(event, node))
    }

    /// Dispatch a `click` at `node`.
    pub fn click(&mut self, node: NodeId) -> usize {
        self.dispatch(node, "click")
    }

    /// Record `node`'s lifecycle events from now on.
    pub fn record(&mut self, node: NodeId) -> EventLog {
        let log = EventLog::default();
        let sink = Rc::clone(&log.0);
        self.runtime
            .observe(node, move |_, event| sink.borrow_mut().push(event.clone()));
        log
    }

    // ── Processing ───────────────────────────────────────────────────

    /// Run exactly one tick.
    pub fn tick(&mut self) -> TickReport {
        self.runtime.tick()
    }

    /// Tick until nothing is pending (bounded by [`SETTLE_TICKS`]).
    pub fn settle(&mut self) -> TickReport {
        self.runtime.run_until_idle(SETTLE_TICKS)
    }

    // ── Query ────────────────────────────────────────────────────────

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    /// The store owned by `node`.
    pub fn store(&self, node: NodeId) -> Option<ReactiveStore> {
        self.runtime.store(node)
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.runtime.dom().attribute(node, name).map(str::to_owned)
    }

    pub fn text(&self, node: NodeId) -> String {
        self.runtime.dom().text(node).to_owned()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.runtime
            .dom()
            .get(node)
            .is_some_and(|data| data.has_class(class))
    }

    pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
        self.runtime.dom().listener_count(node, event)
    }

    /// Snapshot text of the subtree under `node`.
    pub fn markup(&self, node: NodeId) -> String {
        super::snapshot::markup(self.runtime.dom(), node)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
