use sequent::dom::{Document, DomError};
use sequent::{ChainError, Dispatch, select, select_all, wrap};
use std::time::Duration;
use tokio::task::LocalSet;
use tokio::time::sleep;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn test_queued_names_are_enqueued() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::parse(r#"<div id="t"></div>"#).unwrap();
            let chain = select(&doc, "#t", false).unwrap();

            assert_eq!(chain.invoke("wait", &["20"]).unwrap(), Dispatch::Queued);
            assert_eq!(
                chain.invoke("set_attribute", &["x", "1"]).unwrap(),
                Dispatch::Queued
            );
            assert_eq!(chain.invoke("toggle_class", &["on", "true"]).unwrap(), Dispatch::Queued);

            let el = chain.native().unwrap().clone();
            assert!(!el.has_attribute("x"));
            sleep(ms(21)).await;
            assert_eq!(el.get_attribute("x").as_deref(), Some("1"));
            assert!(el.has_class("on"));
        })
        .await;
}

#[test]
fn test_other_names_fall_through_to_the_element() {
    let doc = Document::parse(r#"<p id="t" class="note">hello</p>"#).unwrap();
    let chain = wrap(doc.get_element_by_id("t").unwrap(), false);

    assert_eq!(
        chain.invoke("text_content", &[]).unwrap(),
        Dispatch::Native(Some("hello".into()))
    );
    assert_eq!(
        chain.invoke("has_class", &["note"]).unwrap(),
        Dispatch::Native(Some("true".into()))
    );
    assert_eq!(
        chain.invoke("get_attribute", &["missing"]).unwrap(),
        Dispatch::Native(None)
    );
}

#[test]
fn test_bad_names_and_arguments_are_rejected() {
    let doc = Document::parse(r#"<p id="t"></p>"#).unwrap();
    let chain = wrap(doc.get_element_by_id("t").unwrap(), true);

    assert!(matches!(
        chain.invoke("set_attribute", &["only-name"]),
        Err(ChainError::InvalidArguments { operation, .. }) if operation == "set_attribute"
    ));
    assert!(matches!(
        chain.invoke("wait", &["soon"]),
        Err(ChainError::InvalidArguments { .. })
    ));
    assert!(matches!(
        chain.invoke("toggle_class", &["on", "yes"]),
        Err(ChainError::InvalidArguments { .. })
    ));
    assert!(matches!(
        chain.invoke("fly", &[]),
        Err(ChainError::Dom(DomError::UnknownMember(name))) if name == "fly"
    ));
    assert!(matches!(
        chain.invoke("get_attribute", &[]),
        Err(ChainError::Dom(DomError::Arity { expected: 1, got: 0, .. }))
    ));
}

#[test]
fn test_collection_falls_through_per_member() {
    let doc = Document::parse(r#"<i title="a"></i><i></i><i title="c"></i>"#).unwrap();
    let items = select_all(&doc, "i", true).unwrap();

    assert_eq!(
        items.invoke("get_attribute", &["title"]).unwrap(),
        Dispatch::NativeAll(vec![Some("a".into()), None, Some("c".into())])
    );
}

#[test]
fn test_select_without_match_fails() {
    let doc = Document::parse("<p></p>").unwrap();
    assert!(matches!(select(&doc, "#nope", false), Err(ChainError::NoMatch(_))));
    assert!(matches!(
        select(&doc, "p[", false),
        Err(ChainError::Dom(DomError::Selector { .. }))
    ));
    assert!(select_all(&doc, "span", false).unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unresolved_chain_has_no_native_target() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::parse(r#"<ul><li id="a"></li></ul>"#).unwrap();
            let item = select(&doc, "#a", false).unwrap();
            let list = item.wait(ms(10)).parent().unwrap();

            assert!(!list.is_resolved());
            assert!(matches!(
                list.invoke("tag_name", &[]),
                Err(ChainError::NoTarget(name)) if name == "tag_name"
            ));
            // Queued names are still accepted and replayed once resolved.
            assert_eq!(list.invoke("add_class", &["open"]).unwrap(), Dispatch::Queued);

            list.settled().await;
            assert_eq!(
                list.invoke("has_class", &["open"]).unwrap(),
                Dispatch::Native(Some("true".into()))
            );
        })
        .await;
}
