//! Integration tests for gilt-logic.
//!
//! These tests exercise the public API from outside the crate: providers,
//! bindings, lifecycle transitions and the tick loop working together.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gilt_logic::binding::{BindingMatch, HandlerContext};
use gilt_logic::components::{Conditional, Else, Provider};
use gilt_logic::dom::{NodeData, NodeId};
use gilt_logic::element::{Component, Context, LifecycleEvent, LifecycleState, Plain};
use gilt_logic::error::{HookError, HookResult};
use gilt_logic::reactive::{ReactiveStore, Value};
use gilt_logic::testing::Harness;
use gilt_logic::RuntimeConfig;
use pretty_assertions::assert_eq;
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Observes `source` so the node subscribes to whichever provider it names.
struct Watcher;

impl Component for Watcher {
    fn observed_attributes(&self) -> &[&str] {
        &["source"]
    }
}

/// A provider whose update pass always fails before reconciling.
struct Exploding {
    reached_update: Rc<Cell<bool>>,
}

impl Component for Exploding {
    fn init_store(&mut self) -> Option<Value> {
        Some(Value::from(json!({ "v": "set" })))
    }

    fn on_before_update(&mut self, _cx: &mut Context<'_>) -> HookResult {
        Err(HookError::new("exploded"))
    }

    fn on_update(&mut self, _cx: &mut Context<'_>) -> HookResult {
        self.reached_update.set(true);
        Ok(())
    }
}

fn nested_providers(h: &mut Harness) -> (NodeId, NodeId, NodeId) {
    let body = h.body();
    let a = h.provider(body, "a", json!({ "x": 1 }));
    let b = h.provider(a, "b", json!({ "x": 1 }));
    let w = h.mount(
        b,
        NodeData::new("x-watch").with_attr("source", "{a.x}"),
        Watcher,
    );
    h.settle();
    (a, b, w)
}

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

#[test]
fn test_path_resolution() {
    let store = ReactiveStore::new("s", json!({ "a": { "b": 5 } }));
    assert_eq!(store.lookup_value("a.b"), Some(Value::from(5)));
    assert_eq!(store.lookup_value("a.c"), None);
    assert_eq!(store.lookup_value("missing.x"), None);
}

#[test]
fn test_subscribe_unsubscribe() {
    let store = ReactiveStore::new("s", json!({}));
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let id = store.subscribe(move |_| counter.set(counter.get() + 1));
    assert!(id.get() > 0);

    store.set("k", 1).unwrap();
    assert_eq!(calls.get(), 1);

    assert!(store.unsubscribe(id));
    assert!(!store.unsubscribe(id));
    store.set("k", 2).unwrap();
    assert_eq!(calls.get(), 1);
}

// ---------------------------------------------------------------------------
// Built-in bindings
// ---------------------------------------------------------------------------

#[test]
fn test_attr_binding_follows_store_across_ticks() {
    let mut h = Harness::new();
    let ctx = h.provider(h.body(), "s", json!({ "visible": false }));
    let el = h.insert(ctx, NodeData::new("div").with_attr("attr:hidden", "{s.visible}"));
    h.settle();
    assert_eq!(h.attribute(el, "hidden"), None);

    let store = h.store(ctx).unwrap();
    store.set("visible", true).unwrap();
    assert_eq!(h.attribute(el, "hidden"), None, "applied before the tick");
    h.tick();
    assert_eq!(h.attribute(el, "hidden").as_deref(), Some(""));

    store.set("visible", false).unwrap();
    h.tick();
    assert_eq!(h.attribute(el, "hidden"), None);
}

#[test]
fn test_attr_hidden_from_derived_visibility() {
    let mut h = Harness::new();
    let ctx = h.provider(h.body(), "s", json!({ "visible": false }));
    let store = h.store(ctx).unwrap();
    store
        .set(
            "hidden",
            Value::derived(|root, _| {
                let visible = root.get("visible").and_then(Value::as_bool).unwrap_or(false);
                Value::from(!visible)
            }),
        )
        .unwrap();
    let el = h.insert(ctx, NodeData::new("div").with_attr("attr:hidden", "{s.hidden}"));
    h.settle();
    assert_eq!(h.attribute(el, "hidden").as_deref(), Some(""));

    store.set("visible", true).unwrap();
    h.tick();
    assert_eq!(h.attribute(el, "hidden"), None);

    store.set("visible", false).unwrap();
    h.tick();
    assert_eq!(h.attribute(el, "hidden").as_deref(), Some(""));
}

#[test]
fn test_cls_binding_toggles_every_token() {
    let mut h = Harness::new();
    let ctx = h.provider(h.body(), "s", json!({ "flag": true }));
    let el = h.insert(
        ctx,
        NodeData::new("li").with_attr("cls:active|selected", "{s.flag}"),
    );
    h.settle();
    assert!(h.has_class(el, "active"));
    assert!(h.has_class(el, "selected"));

    h.store(ctx).unwrap().set("flag", false).unwrap();
    h.tick();
    assert!(!h.has_class(el, "active"));
    assert!(!h.has_class(el, "selected"));
}

#[test]
fn test_reconciliation_is_idempotent() {
    let mut h = Harness::new();
    let ctx = h.provider(
        h.body(),
        "s",
        json!({ "label": "Hi", "on": true, "n": 3, "off": false }),
    );
    let list = h.insert(ctx, NodeData::new("ul"));
    h.insert(
        list,
        NodeData::new("li")
            .with_attr("set:text", "{s.label}")
            .with_attr("attr:data-n", "{s.n}")
            .with_attr("attr:disabled", "{s.off}")
            .with_attr("cls:on", "{s.on}"),
    );
    h.settle();
    let first = h.markup(ctx);

    h.runtime_mut().request_update(ctx);
    let report = h.settle();
    assert_eq!(report.frames, 1);
    assert_eq!(h.markup(ctx), first);
}

#[test]
fn test_no_stale_listeners_across_passes() {
    let mut h = Harness::new();
    let ctx = h.provider(h.body(), "s", json!({}));
    let store = h.store(ctx).unwrap();
    let clicks = Rc::new(Cell::new(0));
    let counter = Rc::clone(&clicks);
    store
        .set("press", Value::callback(move |_| counter.set(counter.get() + 1)))
        .unwrap();
    let button = h.insert(ctx, NodeData::new("button").with_attr("on:click", "{s.press}"));
    h.settle();

    for _ in 0..5 {
        h.runtime_mut().request_update(ctx);
        h.settle();
    }
    assert_eq!(h.listener_count(button, "click"), 1);
    assert_eq!(h.click(button), 1);
    assert_eq!(clicks.get(), 1);

    // The next pass finds no callback: the old listener must be gone too.
    h.runtime_mut()
        .dom_mut()
        .set_attribute(button, "on:click", "{s.missing}");
    h.runtime_mut().request_update(ctx);
    h.settle();
    assert_eq!(h.listener_count(button, "click"), 0);
    assert_eq!(h.click(button), 0);
}

#[test]
fn test_listener_writes_restart_the_cycle() {
    let mut h = Harness::new();
    let ctx = h.provider(h.body(), "s", json!({ "open": false }));
    let store = h.store(ctx).unwrap();
    let weak = store.downgrade();
    store
        .set(
            "toggle",
            Value::callback(move |_| {
                if let Some(store) = weak.upgrade() {
                    let _ = store.update("open", |open| {
                        Value::from(!open.and_then(Value::as_bool).unwrap_or(false))
                    });
                }
            }),
        )
        .unwrap();
    let button = h.insert(
        ctx,
        NodeData::new("button")
            .with_attr("on:click", "{s.toggle}")
            .with_attr("attr:aria-pressed", "{s.open}"),
    );
    h.settle();
    assert_eq!(h.attribute(button, "aria-pressed"), None);

    h.click(button);
    assert_eq!(store.lookup_value("open"), Some(Value::from(true)));
    h.tick();
    assert_eq!(h.attribute(button, "aria-pressed").as_deref(), Some(""));

    h.click(button);
    h.tick();
    assert_eq!(h.attribute(button, "aria-pressed"), None);
    assert_eq!(h.listener_count(button, "click"), 1);
}

// ---------------------------------------------------------------------------
// Scopes
// ---------------------------------------------------------------------------

#[test]
fn test_nearest_provider_shadows_and_owns_its_subtree() {
    let mut h = Harness::new();
    let body = h.body();
    let outer = h.provider(body, "s", json!({ "label": "outer" }));
    let outer_span = h.insert(
        outer,
        NodeData::new("span")
            .with_attr("set:text", "{s.label}")
            .with_attr("track:x", "1"),
    );
    let inner = h.provider(outer, "s", json!({ "label": "inner" }));
    let inner_span = h.insert(
        inner,
        NodeData::new("span")
            .with_attr("set:text", "{s.label}")
            .with_attr("track:x", "1"),
    );

    let seen: Rc<RefCell<Vec<NodeId>>> = Rc::default();
    let sink = Rc::clone(&seen);
    h.runtime_mut().namespaces_mut(outer).unwrap().register(
        "track",
        move |_cx: &mut HandlerContext<'_>, matches: &[BindingMatch]| {
            sink.borrow_mut().extend(matches.iter().map(|m| m.node));
        },
    );
    h.settle();

    assert_eq!(h.text(outer_span), "outer");
    assert_eq!(h.text(inner_span), "inner");
    assert!(!seen.borrow().is_empty());
    assert!(seen.borrow().iter().all(|&node| node == outer_span));

    h.store(outer).unwrap().set("label", "changed").unwrap();
    h.settle();
    assert_eq!(h.text(outer_span), "changed");
    assert_eq!(h.text(inner_span), "inner");
}

#[test]
fn test_cross_scope_resubscription() {
    let mut h = Harness::new();
    let (a, b, w) = nested_providers(&mut h);
    let store_a = h.store(a).unwrap();
    let store_b = h.store(b).unwrap();
    assert_eq!(store_a.subscriber_count(), 2);
    assert_eq!(store_b.subscriber_count(), 1);

    let log = h.record(w);
    h.set_attribute(w, "source", "{b.x}");
    assert_eq!(store_a.subscriber_count(), 1);
    assert_eq!(store_b.subscriber_count(), 2);

    store_a.set("x", 2).unwrap();
    h.settle();
    let from = |scope: &str| {
        log.events().iter().any(
            |e| matches!(e, LifecycleEvent::ProviderChanged { scope: s, .. } if s == scope),
        )
    };
    assert!(!from("a"));

    store_b.set("x", 2).unwrap();
    h.settle();
    assert!(from("b"));
}

#[test]
fn test_provider_updates_can_be_disabled() {
    let mut h = Harness::new();
    let (_a, b, w) = nested_providers(&mut h);
    h.set_attribute(w, "source", "{b.x}");
    h.settle();
    h.runtime_mut().set_provider_updates(w, false);
    let log = h.record(w);

    h.store(b).unwrap().set("x", 5).unwrap();
    h.settle();
    assert_eq!(log.count(&LifecycleEvent::Updated), 0);
    assert_eq!(
        log.count(&LifecycleEvent::ProviderChanged {
            scope: "b".into(),
            property: "x".into()
        }),
        1
    );
}

#[test]
fn test_conditional_switches_from_literal_to_path() {
    let mut h = Harness::new();
    let ctx = h.provider(h.body(), "s", json!({ "open": true }));
    let cond = h.mount(
        ctx,
        NodeData::new("le-if").with_attr("condition", "false"),
        Conditional,
    );
    h.settle();
    assert_eq!(h.attribute(cond, "hidden").as_deref(), Some(""));

    h.set_attribute(cond, "condition", "{s.open}");
    h.settle();
    assert_eq!(h.attribute(cond, "hidden"), None);

    h.store(ctx).unwrap().set("open", false).unwrap();
    h.settle();
    assert_eq!(h.attribute(cond, "hidden").as_deref(), Some(""));
}

#[test]
fn test_else_branch_tracks_its_conditional_sibling() {
    let mut h = Harness::new();
    let ctx = h.provider(h.body(), "s", json!({ "logged_in": false }));
    let branch = h.mount(
        ctx,
        NodeData::new("le-if").with_attr("condition", "{s.logged_in}"),
        Conditional,
    );
    let fallback = h.mount(ctx, NodeData::new("le-else"), Else);
    h.settle();
    assert_eq!(h.attribute(branch, "hidden").as_deref(), Some(""));
    assert_eq!(h.attribute(fallback, "hidden"), None);

    h.store(ctx).unwrap().set("logged_in", true).unwrap();
    h.settle();
    assert_eq!(h.attribute(branch, "hidden"), None);
    assert_eq!(h.attribute(fallback, "hidden").as_deref(), Some(""));

    h.remove(branch);
    h.runtime_mut().request_update(fallback);
    h.settle();
    assert_eq!(h.attribute(fallback, "hidden"), None);
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

#[test]
fn test_burst_of_changes_updates_once() {
    let mut h = Harness::new();
    let ctx = h.provider(h.body(), "s", json!({ "n": 0 }));
    h.settle();
    let log = h.record(ctx);

    let store = h.store(ctx).unwrap();
    for n in 1..=10 {
        store.set("n", n).unwrap();
    }
    let report = h.tick();
    assert_eq!(report.frames, 1);
    assert_eq!(log.count(&LifecycleEvent::Updated), 1);
    assert!(h.runtime().is_idle());
}

#[test]
fn test_async_driver() {
    let mut h = Harness::with_config(RuntimeConfig::new().with_fps(1000));
    let ctx = h.provider(h.body(), "s", json!({ "label": "async" }));
    let span = h.insert(ctx, NodeData::new("span").with_attr("set:text", "{s.label}"));

    let report = tokio_test::block_on(h.runtime_mut().run(50));
    assert!(report.ticks >= 1);
    assert!(report.is_clean());
    assert_eq!(h.text(span), "async");
    assert!(h.runtime().is_idle());
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_lifecycle_event_order() {
    let mut h = Harness::new();
    let body = h.body();
    let node = h.insert(body, NodeData::new("le-context").with_attr("name", "s"));
    let log = h.record(node);
    h.runtime_mut().attach(node, Provider::new(json!({})));
    h.settle();
    h.remove(node);

    assert_eq!(
        log.events(),
        vec![
            LifecycleEvent::Attached,
            LifecycleEvent::Settled,
            LifecycleEvent::Updated,
            LifecycleEvent::Detached,
        ]
    );
}

#[test]
fn test_failing_hook_aborts_its_sequence() {
    let mut h = Harness::new();
    let body = h.body();
    let reached_update = Rc::new(Cell::new(false));
    let broken = h.mount(
        body,
        NodeData::new("x-exploding").with_attr("name", "e"),
        Exploding {
            reached_update: Rc::clone(&reached_update),
        },
    );
    let bound = h.insert(broken, NodeData::new("span").with_attr("attr:data-v", "{e.v}"));
    let healthy = h.provider(body, "ok", json!({ "v": "set" }));
    let healthy_bound = h.insert(healthy, NodeData::new("span").with_attr("attr:data-v", "{ok.v}"));

    let report = h.settle();
    assert!(!report.is_clean());
    assert!(report
        .failures
        .iter()
        .all(|f| f.node == broken && f.hook == "on_before_update"));
    assert!(!reached_update.get());
    assert_eq!(h.attribute(bound, "data-v"), None);
    assert_eq!(h.runtime().state(broken), Some(LifecycleState::Settled));
    assert_eq!(h.attribute(healthy_bound, "data-v").as_deref(), Some("set"));
}

#[test]
fn test_settle_cap_reports_stalled() {
    let mut h = Harness::streaming(RuntimeConfig::new().with_max_settle_attempts(2));
    let body = h.body();
    let node = h.insert(body, NodeData::new("x-plain"));
    let log = h.record(node);
    h.runtime_mut().attach(node, Plain);
    h.settle();

    assert_eq!(h.runtime().state(node), Some(LifecycleState::Stalled));
    assert_eq!(
        log.events(),
        vec![
            LifecycleEvent::Attached,
            LifecycleEvent::SettleTimedOut { attempts: 2 }
        ]
    );

    h.finish_loading();
    assert_eq!(h.runtime().state(node), Some(LifecycleState::Stalled));
}

#[test]
fn test_streaming_tree_settles_as_siblings_arrive() {
    let mut h = Harness::streaming(RuntimeConfig::default());
    let body = h.body();
    let ctx = h.provider(body, "s", json!({ "label": "streamed" }));
    let span = h.insert(ctx, NodeData::new("span").with_attr("set:text", "{s.label}"));
    h.settle();
    assert_eq!(h.runtime().state(ctx), Some(LifecycleState::AwaitingSettle));
    assert_eq!(h.text(span), "");

    h.insert(body, NodeData::new("footer"));
    h.settle();
    assert_eq!(h.runtime().state(ctx), Some(LifecycleState::Initialized));
    assert_eq!(h.text(span), "streamed");
}

#[test]
fn test_detach_unsubscribes_everything() {
    let mut h = Harness::new();
    let (a, b, w) = nested_providers(&mut h);
    let store_a = h.store(a).unwrap();
    let store_b = h.store(b).unwrap();

    h.remove(w);
    assert_eq!(store_a.subscriber_count(), 1);
    assert_eq!(h.runtime().state(w), Some(LifecycleState::Disconnected));

    h.remove(a);
    assert_eq!(store_a.subscriber_count(), 0);
    assert_eq!(store_b.subscriber_count(), 0);
    assert_eq!(h.runtime().state(a), Some(LifecycleState::Disconnected));
    assert_eq!(h.runtime().state(b), Some(LifecycleState::Disconnected));
    assert!(h.store(a).is_none());

    store_a.set("x", 9).unwrap();
    assert!(h.settle().is_clean());
    assert!(h.runtime().is_idle());
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[test]
fn test_bound_tree_snapshot() {
    let mut h = Harness::new();
    let ctx = h.provider(
        h.body(),
        "todo",
        json!({
            "title": "Groceries",
            "items": [
                { "text": "milk", "done": true },
                { "text": "eggs", "done": false }
            ]
        }),
    );
    h.insert(ctx, NodeData::new("h1").with_attr("set:text", "{todo.title}"));
    let list = h.insert(ctx, NodeData::new("ul"));
    for i in 0..2 {
        h.insert(
            list,
            NodeData::new("li")
                .with_attr("cls:done", format!("{{todo.items.{i}.done}}"))
                .with_attr("set:text", format!("{{todo.items.{i}.text}}")),
        );
    }
    h.settle();

    insta::assert_snapshot!(h.markup(ctx), @r#"
    <le-context name="todo">
      <h1 set:text="{todo.title}"> "Groceries"
      <ul>
        <li cls:done="{todo.items.0.done}" set:text="{todo.items.0.text}" class="done"> "milk"
        <li cls:done="{todo.items.1.done}" set:text="{todo.items.1.text}"> "eggs"
    "#);
}
