use anyhow::anyhow;
use sequent_scheduler::{ErrorContext, Meta, report, reset_error_handler, set_error_handler};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn test_handler_receives_each_report_once() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    set_error_handler(move |err, ctx| sink.borrow_mut().push((err.to_string(), ctx.clone())));

    let ctx = ErrorContext::new("set_attribute")
        .with_args(vec!["x".into(), "1".into()])
        .with_target("div#app");
    report(&anyhow!("first"), &ctx);
    report(&anyhow!("second"), &ctx);

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, "first");
    assert_eq!(seen[1].1, ctx);
    reset_error_handler();
}

#[test]
fn test_handler_may_replace_itself() {
    let hits = Rc::new(RefCell::new(0));
    let outer = hits.clone();
    set_error_handler(move |_, _| {
        *outer.borrow_mut() += 1;
        let inner = outer.clone();
        set_error_handler(move |_, _| *inner.borrow_mut() += 100);
    });

    let ctx = ErrorContext::new("op");
    report(&anyhow!("a"), &ctx);
    report(&anyhow!("b"), &ctx);
    assert_eq!(*hits.borrow(), 101);
    reset_error_handler();
}

#[test]
fn test_default_handler_logs_without_panicking() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    reset_error_handler();
    report(&anyhow!("logged"), &ErrorContext::new("op"));
}

#[test]
fn test_context_display_and_serialization() {
    let mut meta = Meta::new();
    meta.insert("request".into(), json!(7));
    let ctx = ErrorContext::new("promisify")
        .with_args(vec!["a".into(), "b".into()])
        .with_meta(meta);

    assert_eq!(ctx.to_string(), "promisify(a, b)");
    assert_eq!(
        serde_json::to_value(&ctx).unwrap(),
        json!({ "operation": "promisify", "args": ["a", "b"], "meta": { "request": 7 } })
    );

    let targeted = ErrorContext::new("wait").with_target("li.item");
    assert_eq!(targeted.to_string(), "wait() on li.item");
}
