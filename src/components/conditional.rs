//! Conditional: shows or hides itself from a `condition` attribute.

use crate::element::{Component, Context};
use crate::error::HookResult;
use crate::reactive::Value;

/// Toggles the `hidden` attribute on every update.
///
/// `condition` may be a literal or a path expression. The literals `"true"`
/// and `"false"` mean what they say; a missing attribute or value hides the
/// node; anything else follows truthiness.
#[derive(Debug, Clone, Copy, Default)]
pub struct Conditional;

impl Conditional {
    fn is_true(condition: Option<Value>) -> bool {
        match condition {
            None => false,
            Some(Value::String(text)) if text == "true" => true,
            Some(Value::String(text)) if text == "false" => false,
            Some(value) => value.is_truthy(),
        }
    }
}

impl Component for Conditional {
    fn observed_attributes(&self) -> &[&str] {
        &["condition"]
    }

    fn condition(&self, cx: &Context<'_>) -> Option<bool> {
        Some(Self::is_true(cx.value_from_attribute("condition", None)))
    }

    fn on_update(&mut self, cx: &mut Context<'_>) -> HookResult {
        let node = cx.node();
        if self.condition(cx).unwrap_or(false) {
            cx.dom_mut().remove_attribute(node, "hidden");
        } else {
            cx.dom_mut().set_attribute(node, "hidden", "");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::components::Provider;
    use crate::dom::NodeData;
    use crate::runtime::Runtime;

    #[test]
    fn truthiness() {
        assert!(Conditional::is_true(Some(Value::from("true"))));
        assert!(!Conditional::is_true(Some(Value::from("false"))));
        assert!(!Conditional::is_true(None));
        assert!(!Conditional::is_true(Some(Value::Null)));
        assert!(Conditional::is_true(Some(Value::from("yes"))));
        assert!(!Conditional::is_true(Some(Value::from(0))));
        assert!(Conditional::is_true(Some(Value::from(true))));
    }

    #[test]
    fn follows_provider_value() {
        let mut rt = Runtime::default();
        let body = rt.dom_mut().insert(NodeData::new("body"));
        let ctx = rt.mount(
            body,
            NodeData::new("le-context").with_attr("name", "s"),
            Provider::new(Value::from(json!({ "open": false }))),
        );
        let cond = rt.mount(
            ctx,
            NodeData::new("le-if").with_attr("condition", "{s.open}"),
            Conditional,
        );
        rt.run_until_idle(10);
        assert_eq!(rt.dom().attribute(cond, "hidden"), Some(""));

        rt.store(ctx).unwrap().set("open", true).unwrap();
        rt.run_until_idle(10);
        assert_eq!(rt.dom().attribute(cond, "hidden"), None);
    }

    #[test]
    fn literal_condition_attribute() {
        let mut rt = Runtime::default();
        let body = rt.dom_mut().insert(NodeData::new("body"));
        let cond = rt.mount(
            body,
            NodeData::new("le-if").with_attr("condition", "true"),
            Conditional,
        );
        rt.run_until_idle(10);
        assert_eq!(rt.dom().attribute(cond, "hidden"), None);

        rt.set_attribute(cond, "condition", "false");
        rt.run_until_idle(10);
        assert_eq!(rt.dom().attribute(cond, "hidden"), Some(""));
        assert_eq!(rt.condition(cond), Some(false));
    }
}
