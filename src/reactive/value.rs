//! Store values: JSON-like data plus derived values and callbacks.
//!
//! [`Value`] is an explicit tagged variant. Plain data mirrors JSON; the two
//! extra variants carry behavior:
//!
//! - [`Value::Derived`] is computed on read from the store's root value and the
//!   node performing the lookup (the [`Reader`]).
//! - [`Value::Callback`] is an event listener that `on:` bindings attach.
//!
//! Behavioral variants compare by identity, data variants by value.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::event::{Event, EventCallback};
use crate::dom::node::{NodeData, NodeId};

/// Object map type used by [`Value::Object`].
pub type Map = BTreeMap<String, Value>;

/// The node on whose behalf a lookup is performed.
///
/// Handed to derived callbacks so they can take DOM-facing context into
/// account (e.g. compute a value from the reading node's attributes).
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    pub id: NodeId,
    pub data: &'a NodeData,
}

type DerivedFn = dyn Fn(&Value, Option<Reader<'_>>) -> Value;

/// A value computed lazily from `(root, reader)` each time it is read.
#[derive(Clone)]
pub struct Derived(Rc<DerivedFn>);

impl Derived {
    /// Evaluate against the given root value and reader.
    pub fn evaluate(&self, root: &Value, reader: Option<Reader<'_>>) -> Value {
        (self.0)(root, reader)
    }
}

impl fmt::Debug for Derived {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Derived(..)")
    }
}

/// A value held by a reactive store.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(Map),
    Derived(Derived),
    Callback(EventCallback),
}

impl Value {
    /// An empty object.
    pub fn object() -> Self {
        Value::Object(Map::new())
    }

    /// Wrap a closure as a derived value.
    pub fn derived(f: impl Fn(&Value, Option<Reader<'_>>) -> Value + 'static) -> Self {
        Value::Derived(Derived(Rc::new(f)))
    }

    /// Wrap a closure as an event callback.
    pub fn callback(f: impl Fn(&Event) + 'static) -> Self {
        Value::Callback(Rc::new(f))
    }

    /// Short type name, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Derived(_) => "derived",
            Value::Callback(_) => "callback",
        }
    }

    /// Whether this is an object or an array.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_callback(&self) -> Option<&EventCallback> {
        match self {
            Value::Callback(cb) => Some(cb),
            _ => None,
        }
    }

    /// Truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Child of a container: object key, or array index for arrays.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            Value::Array(items) => items.get(key.parse::<usize>().ok()?),
            _ => None,
        }
    }

    /// Mutable child of a container.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self {
            Value::Object(map) => map.get_mut(key),
            Value::Array(items) => items.get_mut(key.parse::<usize>().ok()?),
            _ => None,
        }
    }

    /// Attribute form: strings and numbers as text, `true` as `""`.
    ///
    /// Everything else (including `false`) means "no attribute".
    pub fn to_attribute(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(format_number(*n)),
            Value::Bool(true) => Some(String::new()),
            _ => None,
        }
    }

    /// Text content form.
    ///
    /// `null` renders as empty text and arrays as their items' text joined
    /// with `,`. Objects render as JSON.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null | Value::Derived(_) | Value::Callback(_) => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => self.to_json().to_string(),
        }
    }

    /// Convert to plain JSON. Derived values and callbacks become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null | Value::Derived(_) | Value::Callback(_) => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => match integral(*n) {
                Some(i) => Json::Number(i.into()),
                None => serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number),
            },
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// `n` as an integer, when it is finite, whole and exactly representable.
fn integral(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15).then_some(n as i64)
}

fn format_number(n: f64) -> String {
    match integral(n) {
        Some(i) => i.to_string(),
        None => n.to_string(),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Derived(a), Value::Derived(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Callback(a), Value::Callback(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Object(map) => f.debug_tuple("Object").field(map).finish(),
            Value::Derived(d) => d.fmt(f),
            Value::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}
