//! Runtime: owns the tree, the controllers, the stores and the frame queue.
//!
//! [`Runtime`] ties the pieces together. Host changes (mutation records) and
//! store notifications are queued and delivered by [`flush`](Runtime::flush);
//! deferred work runs on [`tick`](Runtime::tick). Work triggered during a tick
//! always lands on a later tick.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use slotmap::SecondaryMap;
use tracing::{debug, trace, warn};

use crate::binding::NamespaceRegistry;
use crate::config::RuntimeConfig;
use crate::dom::{Dom, Event, NodeData, NodeId};
use crate::element::controller::Controller;
use crate::element::lifecycle::{LifecycleEvent, LifecycleObserver, LifecycleState};
use crate::element::scope::{self, ScopeMap};
use crate::element::{Component, Context};
use crate::error::HookError;
use crate::reactive::{PathExpression, ReactiveStore, Reader, StoreChange, Value};
use crate::scheduler::FrameQueue;

// ---------------------------------------------------------------------------
// Notices and reports
// ---------------------------------------------------------------------------

/// A store notification waiting to be delivered to a controller.
#[derive(Debug, Clone)]
pub(crate) enum Notice {
    /// The node's own store changed.
    Store { node: NodeId, change: StoreChange },
    /// An ancestor store the node subscribes to changed.
    Provider {
        node: NodeId,
        scope: String,
        change: StoreChange,
    },
}

/// A component hook that returned an error.
#[derive(Debug, Clone, PartialEq)]
pub struct HookFailure {
    pub node: NodeId,
    /// Hook name, e.g. `"on_update"`.
    pub hook: &'static str,
    pub error: HookError,
}

/// What happened during one or more ticks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Ticks run.
    pub ticks: usize,
    /// Frame callbacks run.
    pub frames: usize,
    /// Hooks that failed, in order.
    pub failures: Vec<HookFailure>,
}

impl TickReport {
    /// Fold another report into this one.
    pub fn merge(&mut self, other: TickReport) {
        self.ticks += other.ticks;
        self.frames += other.frames;
        self.failures.extend(other.failures);
    }

    /// Whether every hook succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// The reactive runtime.
pub struct Runtime {
    pub(crate) dom: Dom,
    pub(crate) controllers: SecondaryMap<NodeId, Controller>,
    pub(crate) stores: SecondaryMap<NodeId, ReactiveStore>,
    pub(crate) observers: SecondaryMap<NodeId, Vec<LifecycleObserver>>,
    pub(crate) frames: FrameQueue<Runtime>,
    pub(crate) inbox: Rc<RefCell<VecDeque<Notice>>>,
    pub(crate) failures: Vec<HookFailure>,
    pub(crate) config: RuntimeConfig,
    pub(crate) next_scope: u64,
}

impl Runtime {
    /// Create a runtime over an empty, fully loaded tree.
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_dom(Dom::new(), config)
    }

    /// Create a runtime over an existing tree (e.g. [`Dom::streaming`]).
    pub fn with_dom(dom: Dom, config: RuntimeConfig) -> Self {
        Self {
            dom,
            controllers: SecondaryMap::new(),
            stores: SecondaryMap::new(),
            observers: SecondaryMap::new(),
            frames: FrameQueue::new(),
            inbox: Rc::new(RefCell::new(VecDeque::new())),
            failures: Vec::new(),
            config,
            next_scope: 0,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    /// Mutable tree access. Changes are picked up by the next
    /// [`flush`](Runtime::flush).
    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    // ── Attaching components ─────────────────────────────────────────

    /// Insert a node under `parent` and attach `component` to it.
    pub fn mount(
        &mut self,
        parent: NodeId,
        data: NodeData,
        component: impl Component + 'static,
    ) -> NodeId {
        let node = self.dom.insert_child(parent, data);
        self.connect(node, Box::new(component));
        node
    }

    /// Attach `component` to an existing node. Returns `false` if the node is
    /// missing or already controlled.
    pub fn attach(&mut self, node: NodeId, component: impl Component + 'static) -> bool {
        self.connect(node, Box::new(component))
    }

    /// Remove a subtree and detach every controlled node in it.
    pub fn remove(&mut self, node: NodeId) -> Option<NodeData> {
        let data = self.dom.remove(node);
        self.flush();
        data
    }

    /// Set an attribute and deliver the change.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: impl Into<String>) -> bool {
        let found = self.dom.set_attribute(node, name, value);
        self.flush();
        found
    }

    /// Remove an attribute and deliver the change.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Option<String> {
        let previous = self.dom.remove_attribute(node, name);
        self.flush();
        previous
    }

    /// Mark the tree fully loaded; waiting nodes settle immediately.
    pub fn finish_loading(&mut self) {
        self.dom.finish_loading();
        self.flush();
    }

    /// Dispatch an event to its target's listeners, then deliver whatever the
    /// listeners changed. Returns the number of listeners called.
    pub fn dispatch(&mut self, event: &Event) -> usize {
        let called = self.dom.dispatch(event);
        self.flush();
        called
    }

    // ── Observation and inspection ───────────────────────────────────

    /// Observe `node`'s lifecycle events. Register before
    /// [`attach`](Runtime::attach) to see `Attached` and `Settled`.
    pub fn observe(&mut self, node: NodeId, observer: impl Fn(NodeId, &LifecycleEvent) + 'static) {
        if let Some(entry) = self.observers.entry(node) {
            entry.or_default().push(Rc::new(observer));
        }
    }

    /// Lifecycle state of a controlled node.
    pub fn state(&self, node: NodeId) -> Option<LifecycleState> {
        self.controllers.get(node).map(|controller| controller.state)
    }

    /// The store owned by `node`, if it is a provider.
    pub fn store(&self, node: NodeId) -> Option<ReactiveStore> {
        self.stores.get(node).cloned()
    }

    /// Namespace registry of a controlled node.
    pub fn namespaces_mut(&mut self, node: NodeId) -> Option<&mut NamespaceRegistry> {
        self.controllers
            .get_mut(node)
            .map(|controller| &mut controller.namespaces)
    }

    /// Schedule an update pass for `node` on the next tick.
    pub fn request_update(&mut self, node: NodeId) {
        self.schedule_update(node);
    }

    /// The condition `node`'s component gates its content on, if any.
    ///
    /// `None` for uncontrolled or disconnected nodes, and while the node's
    /// own hook is running.
    pub fn condition(&mut self, node: NodeId) -> Option<bool> {
        let controller = self.controllers.get_mut(node)?;
        if !controller.state.is_connected() {
            return None;
        }
        let component = controller.component.take()?;
        let condition = component.condition(&Context::new(self, node));
        if let Some(controller) = self.controllers.get_mut(node) {
            if controller.component.is_none() {
                controller.component = Some(component);
            }
        }
        condition
    }

    /// Stop or resume scheduling updates when an ancestor store changes.
    /// Hooks still run.
    pub fn set_provider_updates(&mut self, node: NodeId, enabled: bool) {
        if let Some(controller) = self.controllers.get_mut(node) {
            controller.provider_updates = enabled;
        }
    }

    // ── Scope lookups ────────────────────────────────────────────────

    /// Providers visible from `node`, nearest first.
    pub fn scope_map(&self, node: NodeId) -> ScopeMap {
        scope::scope_map(&self.dom, &self.stores, node)
    }

    /// The store selected by `expression`'s scope, as seen from `node`.
    pub fn scope_store(&self, node: NodeId, expression: &str) -> Option<ReactiveStore> {
        let path = PathExpression::parse(expression)?;
        self.scope_map(node).get(path.scope()).cloned()
    }

    /// Resolve `expression` as seen from `node`, on behalf of `reader`.
    ///
    /// `None` for literals, unknown scopes and missing paths.
    pub fn scoped_value(
        &self,
        node: NodeId,
        expression: &str,
        reader: Option<NodeId>,
    ) -> Option<Value> {
        let path = PathExpression::parse(expression)?;
        let store = self.scope_map(node).get(path.scope()).cloned()?;
        let reader = reader.and_then(|id| self.dom.get(id).map(|data| Reader { id, data }));
        store.lookup_value_as(&path.path(), reader)
    }

    /// Resolve attribute `name` of `node`: literals as strings, path
    /// expressions through the scopes visible from `node`.
    pub fn value_from_attribute(
        &self,
        node: NodeId,
        name: &str,
        reader: Option<NodeId>,
    ) -> Option<Value> {
        let raw = self.dom.attribute(node, name)?;
        if PathExpression::is_path_expression(raw) {
            self.scoped_value(node, raw, reader)
        } else {
            Some(Value::String(raw.to_owned()))
        }
    }

    // ── Driving ──────────────────────────────────────────────────────

    /// Deliver queued mutation records and store notifications until both
    /// queues are empty. Hooks run synchronously; update passes are only
    /// scheduled.
    pub fn flush(&mut self) {
        loop {
            let mutations = self.dom.take_mutations();
            let notices: Vec<Notice> = self.inbox.borrow_mut().drain(..).collect();
            if mutations.is_empty() && notices.is_empty() {
                break;
            }
            trace!(mutations = mutations.len(), notices = notices.len(), "flush");
            for mutation in mutations {
                self.deliver_mutation(mutation);
            }
            for notice in notices {
                self.deliver_notice(notice);
            }
        }
    }

    /// Run one tick: every frame requested before it starts, each followed by
    /// a flush.
    pub fn tick(&mut self) -> TickReport {
        self.flush();
        let mut report = TickReport {
            ticks: 1,
            ..TickReport::default()
        };
        if let Some(boundary) = self.frames.boundary() {
            while let Some(callback) = self.frames.pop_due(boundary) {
                callback(self);
                report.frames += 1;
                self.flush();
            }
        }
        report.failures = std::mem::take(&mut self.failures);
        debug!(frames = report.frames, failures = report.failures.len(), "tick");
        report
    }

    /// Whether nothing is queued or scheduled.
    pub fn is_idle(&self) -> bool {
        self.frames.is_empty() && !self.dom.has_mutations() && self.inbox.borrow().is_empty()
    }

    /// Tick until idle or until `max_ticks` ticks ran.
    pub fn run_until_idle(&mut self, max_ticks: usize) -> TickReport {
        self.flush();
        let mut report = TickReport::default();
        report.failures = std::mem::take(&mut self.failures);
        while report.ticks < max_ticks && !self.is_idle() {
            report.merge(self.tick());
        }
        if !self.is_idle() {
            warn!(max_ticks, pending = self.frames.len(), "runtime still busy after tick limit");
        }
        report
    }

    /// Tick once per frame interval until idle or until `max_ticks` ticks ran.
    pub async fn run(&mut self, max_ticks: usize) -> TickReport {
        let mut interval = tokio::time::interval(self.config.tick_period());
        self.flush();
        let mut report = TickReport::default();
        report.failures = std::mem::take(&mut self.failures);
        while report.ticks < max_ticks && !self.is_idle() {
            interval.tick().await;
            report.merge(self.tick());
        }
        report
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
