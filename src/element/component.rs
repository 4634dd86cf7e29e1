//! The [`Component`] trait: per-node behavior plugged into the lifecycle.
//!
//! Hooks run synchronously, in a fixed order per transition, with a
//! [`Context`] giving access to the tree and to the scopes visible from the
//! node. A hook returning `Err` aborts the rest of its sequence: later hooks
//! and the lifecycle event of that transition are skipped, and the failure is
//! reported in the [`TickReport`](crate::runtime::TickReport).

use crate::binding::NamespaceRegistry;
use crate::dom::node::NodeId;
use crate::dom::Dom;
use crate::element::scope::ScopeMap;
use crate::error::HookResult;
use crate::reactive::{ReactiveStore, StoreChange, Value};
use crate::runtime::Runtime;

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Behavior attached to one node.
///
/// Every method has a no-op default.
pub trait Component {
    /// Initial value of this node's own store. Returning `Some` makes the
    /// node a provider.
    fn init_store(&mut self) -> Option<Value> {
        None
    }

    /// Attributes whose changes are reported to
    /// [`on_attribute_changed`](Component::on_attribute_changed).
    fn observed_attributes(&self) -> &[&str] {
        &[]
    }

    /// Register extra namespaces. Runs once, at attach.
    fn register_namespaces(&self, _registry: &mut NamespaceRegistry) {}

    /// The node was attached to the tree.
    fn on_attach(&mut self, _cx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    /// The node and its initial children are fully constructed.
    fn on_settled(&mut self, _cx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    /// Direct children changed after the node settled.
    fn on_children_changed(
        &mut self,
        _cx: &mut Context<'_>,
        _added: &[NodeId],
        _removed: &[NodeId],
    ) -> HookResult {
        Ok(())
    }

    /// An observed attribute changed after the node settled.
    fn on_attribute_changed(
        &mut self,
        _cx: &mut Context<'_>,
        _name: &str,
        _previous: Option<&str>,
        _current: Option<&str>,
    ) -> HookResult {
        Ok(())
    }

    /// Runs first in every update pass.
    fn on_before_update(&mut self, _cx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    /// Runs after bindings were reconciled.
    fn on_update(&mut self, _cx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    /// A store this node subscribes to through an observed attribute changed.
    fn on_provider_changed(
        &mut self,
        _cx: &mut Context<'_>,
        _scope: &str,
        _change: &StoreChange,
    ) -> HookResult {
        Ok(())
    }

    /// This node's own store changed.
    fn on_store_changed(&mut self, _cx: &mut Context<'_>, _change: &StoreChange) -> HookResult {
        Ok(())
    }

    /// A sibling finished an update pass.
    fn on_sibling_updated(&mut self, _cx: &mut Context<'_>, _sibling: NodeId) -> HookResult {
        Ok(())
    }

    /// The node was detached. Subscriptions are already gone.
    fn on_detach(&mut self, _cx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    /// Whether the condition gating this node's content holds.
    ///
    /// `None` for components that are not gated on a condition.
    fn condition(&self, _cx: &Context<'_>) -> Option<bool> {
        None
    }
}

/// A component with no behavior of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plain;

impl Component for Plain {}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// What a hook can see and do.
pub struct Context<'a> {
    pub(crate) runtime: &'a mut Runtime,
    pub(crate) node: NodeId,
}

impl<'a> Context<'a> {
    pub(crate) fn new(runtime: &'a mut Runtime, node: NodeId) -> Self {
        Self { runtime, node }
    }

    /// The node this hook runs for.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn dom(&self) -> &Dom {
        self.runtime.dom()
    }

    pub fn dom_mut(&mut self) -> &mut Dom {
        self.runtime.dom_mut()
    }

    /// An attribute of this node.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.runtime.dom().attribute(self.node, name)
    }

    /// This node's own store, if it is a provider.
    pub fn store(&self) -> Option<ReactiveStore> {
        self.runtime.store(self.node)
    }

    /// Providers visible from this node.
    pub fn scope_map(&self) -> ScopeMap {
        self.runtime.scope_map(self.node)
    }

    /// The store selected by a path expression's scope.
    pub fn scope_store(&self, expression: &str) -> Option<ReactiveStore> {
        self.runtime.scope_store(self.node, expression)
    }

    /// Resolve a path expression on behalf of `reader` (this node if `None`).
    pub fn scoped_value(&self, expression: &str, reader: Option<NodeId>) -> Option<Value> {
        self.runtime
            .scoped_value(self.node, expression, Some(reader.unwrap_or(self.node)))
    }

    /// Resolve one of this node's attributes: literals as strings, path
    /// expressions through the visible scopes on behalf of `reader` (this node
    /// if `None`).
    pub fn value_from_attribute(&self, name: &str, reader: Option<NodeId>) -> Option<Value> {
        self.runtime
            .value_from_attribute(self.node, name, Some(reader.unwrap_or(self.node)))
    }

    /// The condition reported by another node's component, if any.
    pub fn condition_of(&mut self, node: NodeId) -> Option<bool> {
        self.runtime.condition(node)
    }

    /// Schedule an update pass for this node.
    pub fn request_update(&mut self) {
        self.runtime.request_update(self.node);
    }

    /// Stop or resume scheduling updates on ancestor store changes.
    pub fn set_provider_updates(&mut self, enabled: bool) {
        self.runtime.set_provider_updates(self.node, enabled);
    }
}
