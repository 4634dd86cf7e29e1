//! Marker attributes, namespace handlers and the per-provider registry.
//!
//! A marker attribute is named `<namespace>:<local name>`, e.g.
//! `attr:hidden="{s.visible}"`. During reconciliation each marker whose
//! namespace is registered becomes a [`BindingMatch`] handed to that
//! namespace's handler.

use std::fmt;
use std::rc::Rc;

use super::reconcile::HandlerContext;
use crate::dom::node::{NodeData, NodeId};

// ---------------------------------------------------------------------------
// BindingMatch
// ---------------------------------------------------------------------------

/// One marker attribute found during a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingMatch {
    /// The node carrying the marker.
    pub node: NodeId,
    /// Full attribute name, e.g. `attr:hidden`.
    pub name: String,
    /// Name after the namespace prefix, e.g. `hidden`.
    pub local_name: String,
    /// Raw attribute value: a path expression or a literal.
    pub value: String,
}

impl BindingMatch {
    /// Split `name` into `(namespace, local name)`. `None` without a colon.
    ///
    /// The local name ends at the next colon: `attr:a:b` yields `a`.
    pub fn split_name(name: &str) -> Option<(&str, &str)> {
        let (namespace, rest) = name.split_once(':')?;
        let local_name = rest.split_once(':').map_or(rest, |(local, _)| local);
        Some((namespace, local_name))
    }
}

// ---------------------------------------------------------------------------
// NamespaceHandler
// ---------------------------------------------------------------------------

/// Applies every match of one namespace found in a pass.
pub trait NamespaceHandler {
    fn apply(&self, cx: &mut HandlerContext<'_>, matches: &[BindingMatch]);
}

impl<F> NamespaceHandler for F
where
    F: Fn(&mut HandlerContext<'_>, &[BindingMatch]),
{
    fn apply(&self, cx: &mut HandlerContext<'_>, matches: &[BindingMatch]) {
        self(cx, matches)
    }
}

/// Shared handler reference. Matches are grouped by handler identity.
pub type HandlerRef = Rc<dyn NamespaceHandler>;

// ---------------------------------------------------------------------------
// NamespaceRegistry
// ---------------------------------------------------------------------------

/// Ordered map from namespace name to handler.
///
/// Registration order is the order handlers run in. Registering a name twice
/// replaces the handler in place.
#[derive(Clone, Default)]
pub struct NamespaceRegistry {
    entries: Vec<(String, HandlerRef)>,
}

impl NamespaceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `namespace`.
    pub fn register(
        &mut self,
        namespace: impl Into<String>,
        handler: impl NamespaceHandler + 'static,
    ) -> HandlerRef {
        let handler: HandlerRef = Rc::new(handler);
        self.register_shared(namespace, Rc::clone(&handler));
        handler
    }

    /// Register an already shared handler. Several namespaces may share one.
    pub fn register_shared(&mut self, namespace: impl Into<String>, handler: HandlerRef) {
        let namespace = namespace.into();
        match self.entries.iter_mut().find(|(name, _)| *name == namespace) {
            Some(entry) => entry.1 = handler,
            None => self.entries.push((namespace, handler)),
        }
    }

    /// Remove a namespace. Returns whether it was registered.
    pub fn unregister(&mut self, namespace: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(name, _)| name != namespace);
        self.entries.len() != before
    }

    /// The handler registered for `namespace`.
    pub fn get(&self, namespace: &str) -> Option<&HandlerRef> {
        self.entries
            .iter()
            .find(|(name, _)| name == namespace)
            .map(|(_, handler)| handler)
    }

    /// Whether `namespace` is registered.
    pub fn contains(&self, namespace: &str) -> bool {
        self.get(namespace).is_some()
    }

    /// Registered namespace names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Marker attributes of `data` belonging to a registered namespace, paired
    /// with their handlers. Attributes are visited in namespace registration
    /// order, then in attribute order.
    pub fn matches_for(&self, node: NodeId, data: &NodeData) -> Vec<(HandlerRef, BindingMatch)> {
        let mut found = Vec::new();
        for (namespace, handler) in &self.entries {
            for (name, value) in &data.attributes {
                let Some((prefix, local_name)) = BindingMatch::split_name(name) else {
                    continue;
                };
                if prefix != namespace {
                    continue;
                }
                found.push((
                    Rc::clone(handler),
                    BindingMatch {
                        node,
                        name: name.clone(),
                        local_name: local_name.to_owned(),
                        value: value.clone(),
                    },
                ));
            }
        }
        found
    }
}

impl fmt::Debug for NamespaceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
