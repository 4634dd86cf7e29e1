//! Built-in namespace handlers: `attr`, `set`, `on`, `cls`.
//!
//! Handlers never fail. A value that does not resolve means "clear".

use tracing::{trace, warn};

use super::matching::{BindingMatch, NamespaceRegistry};
use super::reconcile::HandlerContext;
use crate::reactive::{PathExpression, Value};

/// Register the four built-in namespaces, in `attr`, `set`, `on`, `cls` order.
pub fn register_builtins(registry: &mut NamespaceRegistry) {
    registry.register("attr", attr);
    registry.register("set", set);
    registry.register("on", on);
    registry.register("cls", cls);
}

/// `attr:<name>`: reflect the value as an attribute.
///
/// Strings and numbers are set as text, `true` as an empty attribute. `false`,
/// `null`, `"null"`, `"false"`, containers, callbacks and unresolved paths
/// remove the attribute.
pub fn attr(cx: &mut HandlerContext<'_>, bindings: &[BindingMatch]) {
    for binding in bindings {
        let value = cx.resolve(binding).and_then(|value| value.to_attribute());
        match value.as_deref() {
            None | Some("null") | Some("false") => {
                cx.dom_mut().remove_attribute(binding.node, &binding.local_name);
            }
            Some(text) => {
                cx.dom_mut()
                    .set_attribute(binding.node, &binding.local_name, text);
            }
        }
    }
}

/// `set:text`: assign the value as text content. Other slots are ignored.
pub fn set(cx: &mut HandlerContext<'_>, bindings: &[BindingMatch]) {
    for binding in bindings {
        match binding.local_name.as_str() {
            "text" => {
                let text = cx
                    .resolve(binding)
                    .map(|value| value.to_text())
                    .unwrap_or_default();
                cx.dom_mut().set_text(binding.node, text);
            }
            other => trace!(slot = other, "unsupported set: slot"),
        }
    }
}

/// `on:<event>`: attach the callback the path expression resolves to.
///
/// Listeners carry the pass's cancellation handle, so the next pass replaces
/// them instead of stacking new ones on top.
pub fn on(cx: &mut HandlerContext<'_>, bindings: &[BindingMatch]) {
    for binding in bindings {
        if !PathExpression::is_path_expression(&binding.value) {
            warn!(marker = %binding.name, value = %binding.value, "event binding must be a path expression");
            continue;
        }
        match cx.resolve(binding) {
            Some(Value::Callback(callback)) => {
                cx.add_listener(binding.node, &binding.local_name, callback);
            }
            other => {
                let kind = other.as_ref().map_or("nothing", Value::kind);
                warn!(
                    marker = %binding.name,
                    value = %binding.value,
                    resolved = kind,
                    "event binding does not resolve to a callback"
                );
            }
        }
    }
}

/// `cls:<a>|<b>`: add every listed class when the value is truthy, remove
/// them otherwise.
pub fn cls(cx: &mut HandlerContext<'_>, bindings: &[BindingMatch]) {
    for binding in bindings {
        let enabled = cx.resolve(binding).is_some_and(|value| value.is_truthy());
        let Some(data) = cx.dom_mut().get_mut(binding.node) else {
            continue;
        };
        for class in binding.local_name.split('|').filter(|c| !c.is_empty()) {
            if enabled {
                data.add_class(class);
            } else {
                data.remove_class(class);
            }
        }
    }
}
