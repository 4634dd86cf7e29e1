//! Reactive store: a named, path-addressable value tree with subscribers.
//!
//! The store owns its whole value tree. Reads go through
//! [`lookup_value`](ReactiveStore::lookup_value), writes through
//! [`set`](ReactiveStore::set) / [`set_value`](ReactiveStore::set_value) /
//! [`remove`](ReactiveStore::remove), which is what guarantees that every
//! mutation, at any depth, reaches the subscribers.
//!
//! Single-threaded: handles are `Rc`-shared and cheap to clone.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{trace, warn};

use super::value::{Reader, Value};
use crate::error::StoreError;

/// Property name reported when the whole root value is replaced.
pub const ROOT_PROPERTY: &str = "_store";

/// Identifies a subscriber of one store. Always positive, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// The raw id.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Payload delivered to subscribers on every mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    /// Last path segment that changed (`"_store"` for a root replacement).
    pub property: String,
    /// Full dot-separated path that changed (empty for a root replacement).
    pub path: String,
    pub previous: Option<Value>,
    pub current: Option<Value>,
}

type Subscriber = Rc<dyn Fn(&StoreChange)>;

struct StoreInner {
    name: String,
    root: Value,
    subscribers: BTreeMap<SubscriptionId, Subscriber>,
    next_id: u64,
}

/// Shared handle to a reactive store.
#[derive(Clone)]
pub struct ReactiveStore {
    inner: Rc<RefCell<StoreInner>>,
}

/// Non-owning handle to a [`ReactiveStore`].
#[derive(Clone)]
pub struct WeakStore {
    inner: Weak<RefCell<StoreInner>>,
}

impl WeakStore {
    /// Upgrade to a strong handle if the store is still alive.
    pub fn upgrade(&self) -> Option<ReactiveStore> {
        self.inner.upgrade().map(|inner| ReactiveStore { inner })
    }
}

impl fmt::Debug for WeakStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakStore(..)")
    }
}

impl ReactiveStore {
    /// Create a store. A non-container initial value is replaced by `{}`.
    pub fn new(name: impl Into<String>, initial: impl Into<Value>) -> Self {
        let name = name.into();
        let mut root = initial.into();
        if !root.is_container() {
            warn!(store = %name, kind = root.kind(), "store root must be an object or an array; starting empty");
            root = Value::object();
        }
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                name,
                root,
                subscribers: BTreeMap::new(),
                next_id: 1,
            })),
        }
    }

    /// The scope name of this store.
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Whether two handles point at the same store.
    pub fn ptr_eq(&self, other: &ReactiveStore) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// A non-owning handle.
    pub fn downgrade(&self) -> WeakStore {
        WeakStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    // ── Root value ───────────────────────────────────────────────────

    /// A copy of the whole root value.
    pub fn value(&self) -> Value {
        self.inner.borrow().root.clone()
    }

    /// Replace the root value.
    ///
    /// Rejects anything but objects and arrays. Notifies with property
    /// `"_store"` unless the new root equals the old one. Returns whether the
    /// root changed.
    pub fn set_value(&self, value: impl Into<Value>) -> Result<bool, StoreError> {
        let value = value.into();
        if !value.is_container() {
            let err = StoreError::InvalidRoot { kind: value.kind() };
            warn!(store = %self.name(), %err, "ignoring store assignment");
            return Err(err);
        }
        let previous = {
            let mut inner = self.inner.borrow_mut();
            if inner.root == value {
                return Ok(false);
            }
            std::mem::replace(&mut inner.root, value.clone())
        };
        self.notify(&StoreChange {
            property: ROOT_PROPERTY.to_owned(),
            path: String::new(),
            previous: Some(previous),
            current: Some(value),
        });
        Ok(true)
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Register a callback invoked synchronously on every mutation.
    pub fn subscribe(&self, callback: impl Fn(&StoreChange) + 'static) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.insert(id, Rc::new(callback));
        id
    }

    /// Remove a subscriber. Returns `true` iff it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.borrow_mut().subscribers.remove(&id).is_some()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Drop every subscriber (teardown).
    pub fn clear_subscribers(&self) {
        self.inner.borrow_mut().subscribers.clear();
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Look up a dot-separated path. Empty path returns the root.
    ///
    /// Returns `None` as soon as a segment is missing.
    pub fn lookup_value(&self, path: &str) -> Option<Value> {
        self.lookup_value_as(path, None)
    }

    /// Look up a path on behalf of `reader`.
    ///
    /// Derived values met along the way are evaluated with the root value and
    /// this reader only. Derived callbacks must not mutate the store.
    pub fn lookup_value_as(&self, path: &str, reader: Option<Reader<'_>>) -> Option<Value> {
        let inner = self.inner.borrow();
        let root = &inner.root;
        if path.is_empty() {
            return Some(root.clone());
        }
        let keys: Vec<&str> = path.split('.').collect();
        walk(root, root, &keys, reader)
    }

    /// Wrap `callback` as a value computed on read from `(root, reader)`.
    pub fn derive(&self, callback: impl Fn(&Value, Option<Reader<'_>>) -> Value + 'static) -> Value {
        Value::derived(callback)
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Assign `value` at `path`, notifying subscribers if it changed.
    ///
    /// Intermediate containers must exist. Array segments are indices; an
    /// index equal to the length appends. An empty path replaces the root.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<bool, StoreError> {
        let value = value.into();
        if path.is_empty() {
            return self.set_value(value);
        }
        let result = self.write(path, value);
        match result {
            Ok(Some(change)) => {
                self.notify(&change);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(err) => {
                warn!(store = %self.name(), %err, "ignoring store mutation");
                Err(err)
            }
        }
    }

    /// Read-modify-write at `path`.
    pub fn update(
        &self,
        path: &str,
        f: impl FnOnce(Option<&Value>) -> Value,
    ) -> Result<bool, StoreError> {
        let current = self.raw(path);
        let next = f(current.as_ref());
        self.set(path, next)
    }

    /// Remove the object key or array element at `path`.
    ///
    /// Returns the removed value; removing something absent is a silent no-op.
    pub fn remove(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let (parent_path, key) = split_last(path);
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let result = container_mut(&mut inner.root, parent_path).map(|parent| match parent {
                Value::Object(map) => map.remove(key),
                Value::Array(items) => match key.parse::<usize>() {
                    Ok(index) if index < items.len() => Some(items.remove(index)),
                    _ => None,
                },
                _ => None,
            });
            result
        };
        let removed = match removed {
            Ok(removed) => removed,
            Err(err) => {
                warn!(store = %self.name(), %err, "ignoring store removal");
                return Err(err);
            }
        };
        if let Some(previous) = &removed {
            self.notify(&StoreChange {
                property: key.to_owned(),
                path: path.to_owned(),
                previous: Some(previous.clone()),
                current: None,
            });
        }
        Ok(removed)
    }

    /// Apply a write under the borrow; returns the change to announce.
    fn write(&self, path: &str, value: Value) -> Result<Option<StoreChange>, StoreError> {
        let mut inner = self.inner.borrow_mut();
        let (parent_path, key) = split_last(path);
        let parent = container_mut(&mut inner.root, parent_path)?;
        let previous = parent.get(key).cloned();
        if previous.as_ref() == Some(&value) {
            return Ok(None);
        }
        match parent {
            Value::Object(map) => {
                map.insert(key.to_owned(), value.clone());
            }
            Value::Array(items) => {
                let index = key.parse::<usize>().map_err(|_| StoreError::MissingPath {
                    path: path.to_owned(),
                })?;
                let len = items.len();
                if index < len {
                    items[index] = value.clone();
                } else if index == len {
                    items.push(value.clone());
                } else {
                    return Err(StoreError::IndexOutOfBounds {
                        path: path.to_owned(),
                        index,
                        len,
                    });
                }
            }
            _ => unreachable!("container_mut only returns containers"),
        }
        Ok(Some(StoreChange {
            property: key.to_owned(),
            path: path.to_owned(),
            previous,
            current: Some(value),
        }))
    }

    /// Raw (unevaluated) copy of the value at `path`.
    fn raw(&self, path: &str) -> Option<Value> {
        let inner = self.inner.borrow();
        if path.is_empty() {
            return Some(inner.root.clone());
        }
        let found = path
            .split('.')
            .try_fold(&inner.root, |current, key| current.get(key))
            .cloned();
        found
    }

    /// Invoke every subscriber, in subscription order, outside the borrow.
    fn notify(&self, change: &StoreChange) {
        let (name, subscribers) = {
            let inner = self.inner.borrow();
            let subs: Vec<Subscriber> = inner.subscribers.values().cloned().collect();
            (inner.name.clone(), subs)
        };
        trace!(store = %name, property = %change.property, subscribers = subscribers.len(), "store changed");
        for subscriber in subscribers {
            subscriber(change);
        }
    }
}

impl fmt::Debug for ReactiveStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ReactiveStore")
            .field("name", &inner.name)
            .field("root", &inner.root)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

fn walk(root: &Value, current: &Value, keys: &[&str], reader: Option<Reader<'_>>) -> Option<Value> {
    let Some((key, rest)) = keys.split_first() else {
        return Some(current.clone());
    };
    match current.get(key)? {
        Value::Derived(derived) => {
            let computed = derived.evaluate(root, reader);
            walk(root, &computed, rest, reader)
        }
        child => walk(root, child, rest, reader),
    }
}

fn split_last(path: &str) -> (&str, &str) {
    path.rsplit_once('.').unwrap_or(("", path))
}

fn container_mut<'v>(root: &'v mut Value, path: &str) -> Result<&'v mut Value, StoreError> {
    let mut current = root;
    if !path.is_empty() {
        for key in path.split('.') {
            current = current.get_mut(key).ok_or_else(|| StoreError::MissingPath {
                path: path.to_owned(),
            })?;
        }
    }
    if current.is_container() {
        Ok(current)
    } else {
        Err(StoreError::NotAContainer {
            path: path.to_owned(),
        })
    }
}
