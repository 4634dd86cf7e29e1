//! Lifecycle controller: attach, settle detection, update passes, detach.
//!
//! Each controlled node owns a [`Controller`] holding its lifecycle state,
//! its component, its subscriptions and its update scheduler. The transitions
//! themselves are driven by the [`Runtime`], which owns every controller.

use std::rc::Rc;

use tracing::{debug, debug_span, error, trace, warn};

use super::component::{Component, Context};
use super::lifecycle::{LifecycleEvent, LifecycleState};
use crate::binding::{handlers, NamespaceRegistry};
use crate::dom::event::ListenerHandle;
use crate::dom::mutation::Mutation;
use crate::dom::node::NodeId;
use crate::error::{HookError, HookResult};
use crate::reactive::{
    PathExpression, ReactiveStore, StoreChange, SubscriptionId, Value, WeakStore,
};
use crate::runtime::{HookFailure, Notice, Runtime};
use crate::scheduler::{FrameId, UpdateScheduler};

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Subscription to an ancestor's store made on behalf of one attribute.
pub(crate) struct ProviderSubscription {
    pub(crate) attribute: String,
    pub(crate) scope: String,
    pub(crate) store: WeakStore,
    pub(crate) id: SubscriptionId,
}

/// Per-node lifecycle bookkeeping.
pub(crate) struct Controller {
    pub(crate) state: LifecycleState,
    /// Taken out while one of its hooks runs.
    pub(crate) component: Option<Box<dyn Component>>,
    pub(crate) observed: Vec<String>,
    pub(crate) namespaces: NamespaceRegistry,
    pub(crate) scheduler: UpdateScheduler,
    pub(crate) settle_frame: Option<FrameId>,
    pub(crate) settle_attempts: u32,
    pub(crate) own_subscription: Option<SubscriptionId>,
    pub(crate) provider_subscriptions: Vec<ProviderSubscription>,
    pub(crate) observing_children: bool,
    pub(crate) provider_updates: bool,
    /// Cancels the listeners attached by the latest reconciliation pass.
    pub(crate) listeners: ListenerHandle,
}

impl Controller {
    fn new(component: Box<dyn Component>) -> Self {
        let observed = component
            .observed_attributes()
            .iter()
            .map(|name| (*name).to_owned())
            .collect();
        Self {
            state: LifecycleState::Constructed,
            component: Some(component),
            observed,
            namespaces: NamespaceRegistry::new(),
            scheduler: UpdateScheduler::new(),
            settle_frame: None,
            settle_attempts: 0,
            own_subscription: None,
            provider_subscriptions: Vec::new(),
            observing_children: false,
            provider_updates: true,
            listeners: ListenerHandle::new(),
        }
    }

    pub(crate) fn observes(&self, attribute: &str) -> bool {
        self.observed.iter().any(|name| name == attribute)
    }
}

// ---------------------------------------------------------------------------
// Lifecycle transitions
// ---------------------------------------------------------------------------

impl Runtime {
    /// Run one hook of `node`'s component, recording a failure.
    pub(crate) fn run_hook(
        &mut self,
        node: NodeId,
        hook: &'static str,
        f: impl FnOnce(&mut dyn Component, &mut Context<'_>) -> HookResult,
    ) -> HookResult {
        let Some(mut component) = self
            .controllers
            .get_mut(node)
            .and_then(|controller| controller.component.take())
        else {
            return Ok(());
        };
        let result = f(component.as_mut(), &mut Context::new(self, node));
        if let Some(controller) = self.controllers.get_mut(node) {
            if controller.component.is_none() && controller.state != LifecycleState::Disconnected {
                controller.component = Some(component);
            }
        }
        if let Err(err) = &result {
            self.record_failure(node, hook, err.clone());
        }
        result
    }

    pub(crate) fn record_failure(&mut self, node: NodeId, hook: &'static str, error: HookError) {
        error!(?node, hook, %error, "lifecycle hook failed");
        self.failures.push(HookFailure { node, hook, error });
    }

    /// Notify `node`'s observers.
    pub(crate) fn emit(&mut self, node: NodeId, event: LifecycleEvent) {
        trace!(?node, ?event, "lifecycle event");
        let observers = self.observers.get(node).cloned().unwrap_or_default();
        for observer in &observers {
            observer(node, &event);
        }
    }

    fn set_state(&mut self, node: NodeId, state: LifecycleState) {
        if let Some(controller) = self.controllers.get_mut(node) {
            if controller.state != state {
                debug!(?node, from = ?controller.state, to = ?state, "lifecycle transition");
                controller.state = state;
            }
        }
    }

    fn state_of(&self, node: NodeId) -> Option<LifecycleState> {
        self.controllers.get(node).map(|controller| controller.state)
    }

    // ── Attach ───────────────────────────────────────────────────────

    /// Put `node` under control of `component` and start its lifecycle.
    pub(crate) fn connect(&mut self, node: NodeId, mut component: Box<dyn Component>) -> bool {
        if !self.dom.contains(node) {
            warn!(?node, "cannot attach a component to a missing node");
            return false;
        }
        if self
            .state_of(node)
            .is_some_and(|state| state != LifecycleState::Disconnected)
        {
            warn!(?node, "node already has a component");
            return false;
        }
        let _span = debug_span!("connect", ?node).entered();

        let initial = component.init_store();
        self.controllers.insert(node, Controller::new(component));
        self.set_state(node, LifecycleState::Connected);

        if let Some(initial) = initial {
            self.install_store(node, initial);
        }
        if let Some(controller) = self.controllers.get_mut(node) {
            if let Some(component) = &controller.component {
                component.register_namespaces(&mut controller.namespaces);
            }
        }

        let observed = self
            .controllers
            .get(node)
            .map(|controller| controller.observed.clone())
            .unwrap_or_default();
        for name in observed {
            if let Some(value) = self.dom.attribute(node, &name).map(str::to_owned) {
                self.resubscribe(node, &name, None, Some(&value));
            }
        }

        if self.run_hook(node, "on_attach", |c, cx| c.on_attach(cx)).is_err() {
            return true;
        }
        self.emit(node, LifecycleEvent::Attached);

        self.set_state(node, LifecycleState::AwaitingSettle);
        self.check_settled(node);
        true
    }

    /// Create `node`'s own store and make it a provider.
    fn install_store(&mut self, node: NodeId, initial: Value) {
        let name = self
            .dom
            .attribute(node, "name")
            .or_else(|| self.dom.attribute(node, "id"))
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| {
                self.next_scope += 1;
                format!("scope-{}", self.next_scope)
            });
        let store = ReactiveStore::new(name, initial);

        let inbox = Rc::downgrade(&self.inbox);
        let subscription = store.subscribe(move |change| {
            if let Some(inbox) = inbox.upgrade() {
                inbox.borrow_mut().push_back(Notice::Store {
                    node,
                    change: change.clone(),
                });
            }
        });
        debug!(?node, store = %store.name(), "provider store created");
        self.stores.insert(node, store);

        let builtin = self.config.builtin_namespaces;
        if let Some(controller) = self.controllers.get_mut(node) {
            controller.own_subscription = Some(subscription);
            if builtin {
                handlers::register_builtins(&mut controller.namespaces);
            }
        }
    }

    // ── Settle detection ─────────────────────────────────────────────

    /// Whether `node` can no longer receive initial children.
    pub(crate) fn is_structurally_settled(&self, node: NodeId) -> bool {
        if !self.dom.is_loading() {
            return true;
        }
        let mut current = node;
        loop {
            if self.dom.next_sibling(current).is_some() {
                return true;
            }
            match self.dom.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Settle now, or re-check on the next tick until the retry cap is hit.
    pub(crate) fn check_settled(&mut self, node: NodeId) {
        if self.state_of(node) != Some(LifecycleState::AwaitingSettle) {
            return;
        }
        if self.is_structurally_settled(node) {
            self.enter_settled(node);
            return;
        }

        let max = self.config.max_settle_attempts;
        let Some(controller) = self.controllers.get_mut(node) else {
            return;
        };
        controller.settle_frame = None;
        controller.settle_attempts += 1;
        let attempts = controller.settle_attempts;
        if attempts > max {
            warn!(?node, attempts = max, "node never settled; giving up");
            self.set_state(node, LifecycleState::Stalled);
            self.emit(node, LifecycleEvent::SettleTimedOut { attempts: max });
            return;
        }
        let frame = self.frames.request(move |rt: &mut Runtime| rt.check_settled(node));
        if let Some(controller) = self.controllers.get_mut(node) {
            controller.settle_frame = Some(frame);
        }
    }

    /// Re-check every node still waiting to settle. Used once loading ends.
    pub(crate) fn recheck_waiting(&mut self) {
        let waiting: Vec<NodeId> = self
            .controllers
            .iter()
            .filter(|(_, c)| c.state == LifecycleState::AwaitingSettle)
            .map(|(node, _)| node)
            .collect();
        for node in waiting {
            if let Some(frame) = self
                .controllers
                .get_mut(node)
                .and_then(|controller| controller.settle_frame.take())
            {
                self.frames.cancel(frame);
            }
            if self.is_structurally_settled(node) {
                self.enter_settled(node);
            } else {
                self.check_settled(node);
            }
        }
    }

    fn enter_settled(&mut self, node: NodeId) {
        self.set_state(node, LifecycleState::Settled);
        self.schedule_update(node);
        if self.run_hook(node, "on_settled", |c, cx| c.on_settled(cx)).is_err() {
            return;
        }
        self.emit(node, LifecycleEvent::Settled);
        if let Some(controller) = self.controllers.get_mut(node) {
            controller.observing_children = true;
        }
    }

    // ── Updates ──────────────────────────────────────────────────────

    /// Coalesce an update pass for `node` into the next tick.
    ///
    /// Ignored until the node has settled.
    pub(crate) fn schedule_update(&mut self, node: NodeId) {
        let Some(controller) = self.controllers.get(node) else {
            return;
        };
        if !controller.state.is_settled() {
            trace!(?node, state = ?controller.state, "update ignored before settle");
            return;
        }
        controller
            .scheduler
            .schedule_update(&mut self.frames, move |rt: &mut Runtime| rt.run_update(node));
    }

    /// One update pass: before-update hook, reconcile, update hook, event.
    pub(crate) fn run_update(&mut self, node: NodeId) {
        let Some(state) = self.state_of(node) else {
            return;
        };
        if !matches!(state, LifecycleState::Settled | LifecycleState::Initialized) {
            return;
        }
        let _span = debug_span!("update", ?node).entered();

        if self
            .run_hook(node, "on_before_update", |c, cx| c.on_before_update(cx))
            .is_err()
        {
            return;
        }
        if self.state_of(node).is_none_or(|state| !state.is_settled()) {
            return;
        }
        self.set_state(node, LifecycleState::Updating);
        self.reconcile(node);

        let result = self.run_hook(node, "on_update", |c, cx| c.on_update(cx));
        if self.state_of(node) == Some(LifecycleState::Updating) {
            self.set_state(node, LifecycleState::Initialized);
        }
        if result.is_ok() {
            self.emit(node, LifecycleEvent::Updated);
            self.notify_siblings(node);
        }
    }

    /// Let settled siblings react to `node` finishing an update.
    fn notify_siblings(&mut self, node: NodeId) {
        let Some(parent) = self.dom.parent(node) else {
            return;
        };
        let siblings: Vec<NodeId> = self
            .dom
            .children(parent)
            .iter()
            .copied()
            .filter(|&sibling| sibling != node)
            .collect();
        for sibling in siblings {
            if self.state_of(sibling).is_some_and(LifecycleState::is_settled) {
                // A failure is already recorded for the tick report.
                let _ = self.run_hook(sibling, "on_sibling_updated", |c, cx| {
                    c.on_sibling_updated(cx, node)
                });
            }
        }
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Move the subscription held for `attribute` when its scope changes.
    pub(crate) fn resubscribe(
        &mut self,
        node: NodeId,
        attribute: &str,
        previous: Option<&str>,
        current: Option<&str>,
    ) {
        let old_scope = previous.and_then(PathExpression::scope_of);
        let new_scope = current.and_then(PathExpression::scope_of);
        let subscribed = self.controllers.get(node).is_some_and(|controller| {
            controller
                .provider_subscriptions
                .iter()
                .any(|sub| sub.attribute == attribute)
        });
        if old_scope == new_scope && (subscribed || new_scope.is_none()) {
            return;
        }

        if let Some(controller) = self.controllers.get_mut(node) {
            if let Some(pos) = controller
                .provider_subscriptions
                .iter()
                .position(|sub| sub.attribute == attribute)
            {
                let sub = controller.provider_subscriptions.remove(pos);
                if let Some(store) = sub.store.upgrade() {
                    store.unsubscribe(sub.id);
                }
                debug!(?node, attribute, scope = %sub.scope, "provider subscription dropped");
            }
        }

        let Some(scope) = new_scope else {
            return;
        };
        let Some(store) = self.scope_map(node).get(&scope).cloned() else {
            debug!(?node, attribute, %scope, "no provider in scope");
            return;
        };
        let inbox = Rc::downgrade(&self.inbox);
        let notice_scope = scope.clone();
        let id = store.subscribe(move |change| {
            if let Some(inbox) = inbox.upgrade() {
                inbox.borrow_mut().push_back(Notice::Provider {
                    node,
                    scope: notice_scope.clone(),
                    change: change.clone(),
                });
            }
        });
        debug!(?node, attribute, %scope, "provider subscription added");
        if let Some(controller) = self.controllers.get_mut(node) {
            controller.provider_subscriptions.push(ProviderSubscription {
                attribute: attribute.to_owned(),
                scope,
                store: store.downgrade(),
                id,
            });
        }
    }

    // ── Detach ───────────────────────────────────────────────────────

    /// Tear down `node`: cancel pending work, drop every subscription and
    /// listener, run the detach hook, retire its store.
    pub(crate) fn disconnect(&mut self, node: NodeId) {
        let Some(controller) = self.controllers.get_mut(node) else {
            return;
        };
        if controller.state == LifecycleState::Disconnected {
            return;
        }
        let _span = debug_span!("disconnect", ?node).entered();

        controller.scheduler.cancel(&mut self.frames);
        if let Some(frame) = controller.settle_frame.take() {
            self.frames.cancel(frame);
        }
        controller.observing_children = false;
        controller.listeners.abort();
        let own = controller.own_subscription.take();
        let subscriptions = std::mem::take(&mut controller.provider_subscriptions);

        if let (Some(id), Some(store)) = (own, self.stores.get(node)) {
            store.unsubscribe(id);
        }
        for sub in subscriptions {
            if let Some(store) = sub.store.upgrade() {
                store.unsubscribe(sub.id);
            }
        }

        self.set_state(node, LifecycleState::Disconnected);
        if self
            .run_hook(node, "on_detach", |c, cx| c.on_detach(cx))
            .is_ok()
        {
            self.emit(node, LifecycleEvent::Detached);
        }

        if let Some(store) = self.stores.remove(node) {
            store.clear_subscribers();
        }
        if let Some(controller) = self.controllers.get_mut(node) {
            controller.component = None;
            controller.namespaces = NamespaceRegistry::new();
        }
        self.observers.remove(node);
    }

    // ── Delivery ─────────────────────────────────────────────────────

    /// React to one mutation record.
    pub(crate) fn deliver_mutation(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::Attribute {
                node,
                name,
                previous,
                current,
            } => self.attribute_changed(node, name, previous, current),
            Mutation::ChildList {
                parent,
                added,
                removed,
            } => self.children_changed(parent, added, removed),
            Mutation::Detached { node } => self.disconnect(node),
            Mutation::Loaded => self.recheck_waiting(),
        }
    }

    fn attribute_changed(
        &mut self,
        node: NodeId,
        name: String,
        previous: Option<String>,
        current: Option<String>,
    ) {
        let Some(controller) = self.controllers.get(node) else {
            return;
        };
        if !controller.state.is_connected() || !controller.observes(&name) {
            return;
        }
        self.resubscribe(node, &name, previous.as_deref(), current.as_deref());
        if self.state_of(node).is_none_or(|state| !state.is_settled()) {
            return;
        }

        self.schedule_update(node);
        if self
            .run_hook(node, "on_attribute_changed", |c, cx| {
                c.on_attribute_changed(cx, &name, previous.as_deref(), current.as_deref())
            })
            .is_err()
        {
            return;
        }
        self.emit(
            node,
            LifecycleEvent::AttributeChanged {
                name,
                previous,
                current,
            },
        );
    }

    fn children_changed(&mut self, parent: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
        if !self
            .controllers
            .get(parent)
            .is_some_and(|controller| controller.observing_children)
        {
            return;
        }
        self.schedule_update(parent);
        if self
            .run_hook(parent, "on_children_changed", |c, cx| {
                c.on_children_changed(cx, &added, &removed)
            })
            .is_err()
        {
            return;
        }
        self.emit(parent, LifecycleEvent::ChildrenChanged { added, removed });
    }

    /// React to one store notification.
    pub(crate) fn deliver_notice(&mut self, notice: Notice) {
        match notice {
            Notice::Store { node, change } => self.store_changed(node, change),
            Notice::Provider {
                node,
                scope,
                change,
            } => self.provider_changed(node, scope, change),
        }
    }

    fn store_changed(&mut self, node: NodeId, change: StoreChange) {
        if self
            .state_of(node)
            .is_none_or(|state| !state.is_connected())
        {
            return;
        }
        self.schedule_update(node);
        if self
            .run_hook(node, "on_store_changed", |c, cx| c.on_store_changed(cx, &change))
            .is_err()
        {
            return;
        }
        self.emit(
            node,
            LifecycleEvent::StoreChanged {
                property: change.property,
            },
        );
    }

    fn provider_changed(&mut self, node: NodeId, scope: String, change: StoreChange) {
        let Some(controller) = self.controllers.get(node) else {
            return;
        };
        if !controller.state.is_connected() {
            return;
        }
        if controller.provider_updates {
            self.schedule_update(node);
        }
        if self
            .run_hook(node, "on_provider_changed", |c, cx| {
                c.on_provider_changed(cx, &scope, &change)
            })
            .is_err()
        {
            return;
        }
        self.emit(
            node,
            LifecycleEvent::ProviderChanged {
                scope,
                property: change.property,
            },
        );
    }
}
