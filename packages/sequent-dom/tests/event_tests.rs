use sequent_dom::Document;
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn test_dispatch_runs_listeners_in_registration_order() {
    let doc = Document::parse(r#"<button id="b"></button>"#).unwrap();
    let button = doc.get_element_by_id("b").unwrap();
    let hits = Rc::new(RefCell::new(Vec::new()));

    for tag in ["first", "second"] {
        let hits = hits.clone();
        button
            .on("click", move |e| {
                hits.borrow_mut()
                    .push(format!("{tag}:{}:{:?}", e.name, e.detail))
            })
            .unwrap();
    }

    assert_eq!(button.dispatch_with("click", Some("d".into())).unwrap(), 2);
    assert_eq!(
        *hits.borrow(),
        ["first:click:Some(\"d\")", "second:click:Some(\"d\")"]
    );
    assert_eq!(button.dispatch("keyup").unwrap(), 0);
}

#[test]
fn test_listener_may_mutate_its_target() {
    let doc = Document::parse(r#"<button id="b"></button>"#).unwrap();
    let button = doc.get_element_by_id("b").unwrap();
    button
        .on("click", |e| {
            e.target.set_attribute("aria-pressed", "true").unwrap();
        })
        .unwrap();

    button.dispatch("click").unwrap();
    assert_eq!(button.get_attribute("aria-pressed").as_deref(), Some("true"));
}

#[test]
fn test_off_and_remove_listener() {
    let doc = Document::new();
    let el = doc.create_element("div");
    let count = Rc::new(RefCell::new(0));

    let c = count.clone();
    let keep = el.on("ping", move |_| *c.borrow_mut() += 1).unwrap();
    let c = count.clone();
    el.on("ping", move |_| *c.borrow_mut() += 10).unwrap();

    assert!(el.remove_listener(keep).unwrap());
    assert!(!el.remove_listener(keep).unwrap());
    el.dispatch("ping").unwrap();
    assert_eq!(*count.borrow(), 10);

    assert_eq!(el.off("ping").unwrap(), 1);
    assert_eq!(el.dispatch("ping").unwrap(), 0);
}

#[test]
fn test_clones_do_not_copy_listeners() {
    let doc = Document::new();
    let el = doc.create_element("div");
    el.on("ping", |_| {}).unwrap();
    let copy = el.clone_node(true).unwrap();
    assert_eq!(copy.dispatch("ping").unwrap(), 0);
}
