//! Reconciliation: walk a provider's subtree and hand markers to handlers.
//!
//! The walk visits descendants of the owner in document order. A descendant
//! that is itself a provider reconciles its own subtree (against its own
//! scopes and namespaces) and is skipped by the outer walk. Matches are grouped
//! per handler, in first-seen order, and every group is applied once.
//!
//! Each pass aborts the listener handle of the previous pass before handlers
//! run, so a node never carries listeners from an earlier pass.

use std::rc::Rc;

use tracing::{debug_span, trace};

use super::matching::{BindingMatch, HandlerRef};
use crate::dom::event::{EventCallback, ListenerHandle};
use crate::dom::node::NodeId;
use crate::dom::Dom;
use crate::element::scope::ScopeMap;
use crate::reactive::{PathExpression, ReactiveStore, Value};
use crate::runtime::Runtime;

// ---------------------------------------------------------------------------
// HandlerContext
// ---------------------------------------------------------------------------

/// What a namespace handler can see and do during one pass.
pub struct HandlerContext<'a> {
    runtime: &'a mut Runtime,
    owner: NodeId,
    listeners: ListenerHandle,
}

impl<'a> HandlerContext<'a> {
    pub(crate) fn new(runtime: &'a mut Runtime, owner: NodeId, listeners: ListenerHandle) -> Self {
        Self {
            runtime,
            owner,
            listeners,
        }
    }

    /// The provider running this pass.
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn dom(&self) -> &Dom {
        self.runtime.dom()
    }

    pub fn dom_mut(&mut self) -> &mut Dom {
        self.runtime.dom_mut()
    }

    /// Handle shared by every listener attached in this pass.
    pub fn listeners(&self) -> &ListenerHandle {
        &self.listeners
    }

    /// Scopes visible from the owner.
    pub fn scope_map(&self) -> ScopeMap {
        self.runtime.scope_map(self.owner)
    }

    /// The store a path expression selects, seen from the owner.
    pub fn scope_store(&self, expression: &str) -> Option<ReactiveStore> {
        self.runtime.scope_store(self.owner, expression)
    }

    /// Resolve a match's value: literals as strings, path expressions through
    /// the owner's scopes with the matched node as reader.
    pub fn resolve(&self, binding: &BindingMatch) -> Option<Value> {
        if PathExpression::is_path_expression(&binding.value) {
            self.runtime
                .scoped_value(self.owner, &binding.value, Some(binding.node))
        } else {
            Some(Value::String(binding.value.clone()))
        }
    }

    /// Attach a listener that lives until the next pass of this owner.
    pub fn add_listener(&mut self, node: NodeId, event: &str, callback: EventCallback) {
        let handle = self.listeners.clone();
        self.runtime
            .dom_mut()
            .add_listener(node, event, callback, Some(handle));
    }
}

// ---------------------------------------------------------------------------
// Reconciliation pass
// ---------------------------------------------------------------------------

impl Runtime {
    /// Apply every marker under `owner`. No-op until the owner has settled and
    /// its first update pass has started.
    pub(crate) fn reconcile(&mut self, owner: NodeId) {
        let Some(controller) = self.controllers.get(owner) else {
            return;
        };
        if !controller.state.is_initialized() {
            trace!(?owner, state = ?controller.state, "not ready to reconcile");
            return;
        }
        let registry = controller.namespaces.clone();
        let _span = debug_span!("reconcile", ?owner).entered();

        let mut groups: Vec<(HandlerRef, Vec<BindingMatch>)> = Vec::new();
        let mut stack: Vec<NodeId> = self.dom.children(owner).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if self.stores.contains_key(node) {
                self.reconcile(node);
                continue;
            }
            if let Some(data) = self.dom.get(node) {
                for (handler, binding) in registry.matches_for(node, data) {
                    match groups.iter_mut().find(|(h, _)| Rc::ptr_eq(h, &handler)) {
                        Some((_, bindings)) => bindings.push(binding),
                        None => groups.push((handler, vec![binding])),
                    }
                }
            }
            stack.extend(self.dom.children(node).iter().rev().copied());
        }

        let handle = ListenerHandle::new();
        if let Some(controller) = self.controllers.get_mut(owner) {
            let previous = std::mem::replace(&mut controller.listeners, handle.clone());
            previous.abort();
        }

        trace!(?owner, groups = groups.len(), "applying bindings");
        for (handler, bindings) in &groups {
            let mut cx = HandlerContext::new(self, owner, handle.clone());
            handler.apply(&mut cx, bindings);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::binding::NamespaceRegistry;
    use crate::config::RuntimeConfig;
    use crate::components::Provider;
    use crate::dom::NodeData;
    use crate::reactive::Value;

    type Seen = Rc<RefCell<Vec<String>>>;

    fn recorder(seen: &Seen) -> impl Fn(&mut HandlerContext<'_>, &[BindingMatch]) + 'static {
        let seen = Rc::clone(seen);
        move |_cx: &mut HandlerContext<'_>, bindings: &[BindingMatch]| {
            let names: Vec<_> = bindings.iter().map(|b| b.name.as_str()).collect();
            seen.borrow_mut().push(names.join(","));
        }
    }

    fn runtime() -> (Runtime, NodeId) {
        let mut rt = Runtime::new(RuntimeConfig::new().with_builtin_namespaces(false));
        let body = rt.dom_mut().insert(NodeData::new("body"));
        (rt, body)
    }

    #[test]
    fn groups_per_handler_in_document_order() {
        let (mut rt, body) = runtime();
        let seen: Seen = Rc::default();
        let ctx = rt.mount(
            body,
            NodeData::new("le-context").with_attr("name", "s"),
            Provider::new(Value::object()),
        );
        let mut registry = NamespaceRegistry::new();
        registry.register("x", recorder(&seen));
        registry.register("y", recorder(&seen));
        *rt.namespaces_mut(ctx).unwrap() = registry;

        let a = rt.dom_mut().insert_child(ctx, NodeData::new("div").with_attr("y:one", "1"));
        rt.dom_mut().insert_child(a, NodeData::new("span").with_attr("x:two", "2"));
        rt.dom_mut().insert_child(ctx, NodeData::new("div").with_attr("x:three", "3"));
        rt.run_until_idle(10);

        // Groups run in first-seen order: `y:one` is met before any `x` marker.
        assert_eq!(*seen.borrow(), vec!["y:one", "x:two,x:three"]);
    }

    #[test]
    fn nested_provider_subtree_is_skipped() {
        let (mut rt, body) = runtime();
        let outer_seen: Seen = Rc::default();
        let inner_seen: Seen = Rc::default();

        let outer = rt.mount(
            body,
            NodeData::new("le-context").with_attr("name", "outer"),
            Provider::new(Value::object()),
        );
        let inner = rt.mount(
            outer,
            NodeData::new("le-context").with_attr("name", "inner"),
            Provider::new(Value::object()),
        );
        rt.namespaces_mut(outer).unwrap().register("x", recorder(&outer_seen));
        rt.namespaces_mut(inner).unwrap().register("x", recorder(&inner_seen));

        rt.dom_mut().insert_child(inner, NodeData::new("span").with_attr("x:inside", "1"));
        rt.dom_mut().insert_child(outer, NodeData::new("span").with_attr("x:outside", "1"));
        rt.run_until_idle(10);

        assert!(outer_seen.borrow().iter().all(|s| s == "x:outside"));
        assert!(!outer_seen.borrow().is_empty());
        assert!(inner_seen.borrow().iter().all(|s| s == "x:inside"));
        assert!(!inner_seen.borrow().is_empty());
    }

    #[test]
    fn owner_markers_are_not_matched() {
        let (mut rt, body) = runtime();
        let seen: Seen = Rc::default();
        let ctx = rt.mount(
            body,
            NodeData::new("le-context")
                .with_attr("name", "s")
                .with_attr("x:self", "1"),
            Provider::new(Value::object()),
        );
        rt.namespaces_mut(ctx).unwrap().register("x", recorder(&seen));
        rt.request_update(ctx);
        rt.run_until_idle(10);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn resolve_literal_and_path() {
        let (mut rt, body) = runtime();
        let resolved: Rc<RefCell<Vec<Option<Value>>>> = Rc::default();
        let ctx = rt.mount(
            body,
            NodeData::new("le-context").with_attr("name", "s"),
            Provider::new(Value::from(serde_json::json!({ "n": 3 }))),
        );
        let sink = Rc::clone(&resolved);
        rt.namespaces_mut(ctx)
            .unwrap()
            .register("x", move |cx: &mut HandlerContext<'_>, bindings: &[BindingMatch]| {
                for binding in bindings {
                    sink.borrow_mut().push(cx.resolve(binding));
                }
            });
        rt.dom_mut().insert_child(
            ctx,
            NodeData::new("span")
                .with_attr("x:a", "{s.n}")
                .with_attr("x:b", "plain")
                .with_attr("x:c", "{s.missing}"),
        );
        rt.run_until_idle(10);

        assert_eq!(
            *resolved.borrow(),
            vec![
                Some(Value::Number(3.0)),
                Some(Value::from("plain")),
                None
            ]
        );
    }
}
