use sequent_dom::{Document, DomError};

const PAGE: &str = concat!(
    r#"<div id="root" class="box main">"#,
    r#"<p class="intro">a</p><p>b</p>"#,
    r#"<section><p lang="en-US">c</p><a href="https://x.dev/page.html">l</a></section>"#,
    r#"</div>"#,
);

fn count(doc: &Document, selector: &str) -> usize {
    doc.query_selector_all(selector).unwrap().len()
}

#[test]
fn test_combinators() {
    let doc = Document::parse(PAGE).unwrap();
    assert_eq!(count(&doc, "p"), 3);
    assert_eq!(count(&doc, "#root > p"), 2);
    assert_eq!(count(&doc, "#root p"), 3);
    assert_eq!(count(&doc, "p.intro + p"), 1);
    assert_eq!(count(&doc, "p.intro ~ section"), 1);
    assert_eq!(count(&doc, "section > *"), 2);
}

#[test]
fn test_attribute_and_pseudo_selectors() {
    let doc = Document::parse(PAGE).unwrap();
    assert_eq!(count(&doc, "[lang|=en]"), 1);
    assert_eq!(count(&doc, "a[href^=https][href$='.html']"), 1);
    assert_eq!(count(&doc, "[class~=main]"), 1);
    assert_eq!(count(&doc, "p:first-child"), 2);
    assert_eq!(count(&doc, "section:empty"), 0);
}

#[test]
fn test_groups_come_back_in_document_order() {
    let doc = Document::parse(PAGE).unwrap();
    let found = doc.query_selector_all("section, .intro").unwrap();
    let tags: Vec<String> = found.iter().map(|e| e.tag_name().unwrap()).collect();
    assert_eq!(tags, ["p", "section"]);
}

#[test]
fn test_scoped_queries_and_matches() {
    let doc = Document::parse(PAGE).unwrap();
    let root = doc.get_element_by_id("root").unwrap();
    let section = root.query_selector("section").unwrap().unwrap();

    assert_eq!(section.query_selector_all("p").unwrap().len(), 1);
    assert!(root.matches(".box.main").unwrap());
    assert!(!section.matches("div").unwrap());
}

#[test]
fn test_invalid_selector_is_an_error() {
    let doc = Document::parse(PAGE).unwrap();
    assert!(matches!(
        doc.query_selector_all("p["),
        Err(DomError::Selector { .. })
    ));
}
