//! Scope resolution: which providers are visible from a node.
//!
//! Walking from a node up to (but excluding) the root container, every node
//! that owns a store and carries a non-empty `name` attribute contributes one
//! scope. The nearest provider wins when names collide.

use slotmap::SecondaryMap;

use crate::dom::node::NodeId;
use crate::dom::Dom;
use crate::reactive::ReactiveStore;

/// Scope name to store, nearest provider first.
#[derive(Clone, Default)]
pub struct ScopeMap {
    entries: Vec<(String, ReactiveStore)>,
}

impl ScopeMap {
    /// The store visible under `name`.
    pub fn get(&self, name: &str) -> Option<&ReactiveStore> {
        self.entries
            .iter()
            .find(|(scope, _)| scope == name)
            .map(|(_, store)| store)
    }

    /// Whether a provider named `name` is visible.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Visible scope names, nearest first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(scope, _)| scope.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ReactiveStore)> {
        self.entries.iter().map(|(scope, store)| (scope.as_str(), store))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ScopeMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Build the scope map seen from `node`, the node itself included.
pub fn scope_map(
    dom: &Dom,
    stores: &SecondaryMap<NodeId, ReactiveStore>,
    node: NodeId,
) -> ScopeMap {
    let root = dom.root();
    let mut entries: Vec<(String, ReactiveStore)> = Vec::new();
    let mut current = Some(node);
    while let Some(id) = current {
        if Some(id) == root {
            break;
        }
        if let (Some(store), Some(name)) = (stores.get(id), dom.attribute(id, "name")) {
            if !name.is_empty() && !entries.iter().any(|(scope, _)| scope == name) {
                entries.push((name.to_owned(), store.clone()));
            }
        }
        current = dom.parent(id);
    }
    ScopeMap { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeData;
    use crate::reactive::Value;

    fn provider(
        dom: &mut Dom,
        stores: &mut SecondaryMap<NodeId, ReactiveStore>,
        parent: NodeId,
        name: &str,
    ) -> NodeId {
        let id = dom.insert_child(parent, NodeData::new("le-context").with_attr("name", name));
        stores.insert(id, ReactiveStore::new(name, Value::object()));
        id
    }

    #[test]
    fn collects_ancestors_and_self() {
        let mut dom = Dom::new();
        let mut stores = SecondaryMap::new();
        let body = dom.insert(NodeData::new("body"));
        let outer = provider(&mut dom, &mut stores, body, "outer");
        let inner = provider(&mut dom, &mut stores, outer, "inner");
        let leaf = dom.insert_child(inner, NodeData::new("span"));

        let map = scope_map(&dom, &stores, leaf);
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["inner", "outer"]);
        assert!(map.get("outer").unwrap().ptr_eq(&stores[outer]));

        let map = scope_map(&dom, &stores, inner);
        assert!(map.contains("inner"));
    }

    #[test]
    fn nearest_provider_shadows() {
        let mut dom = Dom::new();
        let mut stores = SecondaryMap::new();
        let body = dom.insert(NodeData::new("body"));
        let outer = provider(&mut dom, &mut stores, body, "s");
        let inner = provider(&mut dom, &mut stores, outer, "s");
        let leaf = dom.insert_child(inner, NodeData::new("span"));

        let map = scope_map(&dom, &stores, leaf);
        assert_eq!(map.len(), 1);
        assert!(map.get("s").unwrap().ptr_eq(&stores[inner]));

        let sibling = dom.insert_child(outer, NodeData::new("span"));
        let map = scope_map(&dom, &stores, sibling);
        assert!(map.get("s").unwrap().ptr_eq(&stores[outer]));
    }

    #[test]
    fn root_is_excluded() {
        let mut dom = Dom::new();
        let mut stores = SecondaryMap::new();
        let body = dom.insert(NodeData::new("body").with_attr("name", "root"));
        stores.insert(body, ReactiveStore::new("root", Value::object()));
        let leaf = dom.insert_child(body, NodeData::new("span"));

        assert!(scope_map(&dom, &stores, leaf).is_empty());
    }

    #[test]
    fn unnamed_providers_are_invisible() {
        let mut dom = Dom::new();
        let mut stores = SecondaryMap::new();
        let body = dom.insert(NodeData::new("body"));
        let anon = dom.insert_child(body, NodeData::new("le-context").with_id("x"));
        stores.insert(anon, ReactiveStore::new("x", Value::object()));
        let leaf = dom.insert_child(anon, NodeData::new("span"));

        assert!(scope_map(&dom, &stores, leaf).is_empty());
    }
}
