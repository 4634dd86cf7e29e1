//! Else: the fallback branch next to one or more [`Conditional`]s.
//!
//! [`Conditional`]: super::Conditional

use crate::dom::NodeId;
use crate::element::{Component, Context};
use crate::error::HookResult;

/// Shown only while no sibling's condition holds.
///
/// Siblings are the other children of the same parent. Only components that
/// report a [`condition`](Component::condition) count. When such a sibling
/// finishes an update, the check runs again on the next tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct Else;

impl Else {
    fn sibling_holds(cx: &mut Context<'_>) -> bool {
        let node = cx.node();
        let siblings: Vec<NodeId> = match cx.dom().parent(node) {
            Some(parent) => cx
                .dom()
                .children(parent)
                .iter()
                .copied()
                .filter(|&sibling| sibling != node)
                .collect(),
            None => Vec::new(),
        };
        siblings
            .into_iter()
            .any(|sibling| cx.condition_of(sibling) == Some(true))
    }
}

impl Component for Else {
    fn on_update(&mut self, cx: &mut Context<'_>) -> HookResult {
        let node = cx.node();
        if Self::sibling_holds(cx) {
            cx.dom_mut().set_attribute(node, "hidden", "");
        } else {
            cx.dom_mut().remove_attribute(node, "hidden");
        }
        Ok(())
    }

    fn on_sibling_updated(&mut self, cx: &mut Context<'_>, sibling: NodeId) -> HookResult {
        if cx.condition_of(sibling).is_some() {
            cx.request_update();
        }
        Ok(())
    }
}
