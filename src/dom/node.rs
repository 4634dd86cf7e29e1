//! Node types: NodeId, NodeData.

use slotmap::new_key_type;

new_key_type! {
    /// Unique identifier for a DOM node. Copy, lightweight (u64).
    pub struct NodeId;
}

/// Data associated with a single DOM node.
///
/// Attributes keep their insertion order, which is the order marker attributes
/// are reported to namespace handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeData {
    /// Tag name (e.g. "div", "le-context").
    pub tag: String,
    /// Attributes in insertion order.
    pub attributes: Vec<(String, String)>,
    /// Class list.
    pub classes: Vec<String>,
    /// Text content.
    pub text: String,
}

impl NodeData {
    /// Create a new `NodeData` with the given tag and no attributes.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Set the `id` attribute (builder).
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with_attr("id", id)
    }

    /// Set an attribute (builder).
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name.into(), value.into());
        self
    }

    /// Add a single class (builder).
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        self.add_class(&class);
        self
    }

    /// Set the text content (builder).
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// The value of the `id` attribute, if any.
    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    /// Look up an attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the attribute is present.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Attribute names in insertion order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(n, _)| n.as_str())
    }

    /// Set an attribute, returning the previous value.
    ///
    /// A new attribute is appended; an existing one keeps its position.
    pub fn set_attribute(&mut self, name: String, value: String) -> Option<String> {
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => Some(std::mem::replace(v, value)),
            None => {
                self.attributes.push((name, value));
                None
            }
        }
    }

    /// Remove an attribute, returning its value if it was present.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(n, _)| n == name)?;
        Some(self.attributes.remove(pos).1)
    }

    /// Check whether this node has a given class.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Add a class. No-op if already present.
    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_owned());
        }
    }

    /// Remove a class. No-op if not present.
    pub fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }
}
