use sequent::dom::{Document, Element};
use sequent::{BecomeOptions, Matching, Mode, select, select_all, wrap_all};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;
use tokio::time::sleep;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn list(n: usize) -> Document {
    let items: String = (0..n).map(|i| format!("<li>{i}</li>")).collect();
    Document::parse(&format!(r#"<ul id="list">{items}</ul>"#)).unwrap()
}

fn texts(doc: &Document) -> Vec<String> {
    doc.get_element_by_id("list")
        .unwrap()
        .children()
        .iter()
        .map(Element::text_content)
        .collect()
}

#[test]
fn test_list_reads_are_direct() {
    let doc = list(3);
    let items = select_all(&doc, "li", false).unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[1].text_content(), "1");
    let all: Vec<String> = (&items).into_iter().map(Element::text_content).collect();
    assert_eq!(all, ["0", "1", "2"]);
    assert_eq!(items.at(2).unwrap().native(), Some(&items[2]));
    assert!(items.at(3).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_operations_fan_out_to_every_member() {
    LocalSet::new()
        .run_until(async {
            let doc = list(3);
            let items = select_all(&doc, "li", false).unwrap();

            items
                .add_class("item")
                .css("color", "red")
                .wait(ms(10))
                .text("done");

            assert!(items.iter().all(|li| !li.has_class("item")));
            items.settled().await;
            for li in items.iter() {
                assert!(li.has_class("item"));
                assert_eq!(li.style("color").as_deref(), Some("red"));
                assert_eq!(li.text_content(), "done");
            }
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_members_drain_independently() {
    LocalSet::new()
        .run_until(async {
            let doc = list(3);
            let items = select_all(&doc, "li", false).unwrap();
            let log = Rc::new(RefCell::new(Vec::new()));

            let slow = log.clone();
            let after = log.clone();
            items
                .run_async(move |li| {
                    let log = slow.clone();
                    async move {
                        let n: u64 = li.text_content().parse()?;
                        sleep(ms(30 - n * 10)).await;
                        log.borrow_mut().push(format!("slept {n}"));
                        anyhow::Ok(())
                    }
                })
                .run(move |li| {
                    after.borrow_mut().push(format!("after {}", li.text_content()));
                    Ok(())
                });

            items.settled().await;
            assert_eq!(
                *log.borrow(),
                ["slept 2", "after 2", "slept 1", "after 1", "slept 0", "after 0"]
            );
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_become_cycles_short_replacement_lists() {
    LocalSet::new()
        .run_until(async {
            let doc = list(5);
            let items = select_all(&doc, "li", false).unwrap();
            let replacements = doc.create_fragment("<li>x</li><li>y</li>").unwrap();

            items.become_with(replacements.clone(), BecomeOptions::default());
            items.settled().await;

            assert_eq!(texts(&doc), ["x", "y", "x", "y", "x"]);
            // Clone mode leaves the originals where they were.
            assert!(replacements.iter().all(|r| !r.is_connected()));
            assert!(items.iter().all(|li| !li.is_connected()));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_become_remove_drops_unmatched_members() {
    LocalSet::new()
        .run_until(async {
            let doc = list(3);
            let items = select_all(&doc, "li", false).unwrap();
            let replacement = doc.create_fragment("<li>only</li>").unwrap();

            items.become_with(
                replacement.clone(),
                BecomeOptions::default()
                    .mode(Mode::Move)
                    .matching(Matching::Remove),
            );
            items.settled().await;

            assert_eq!(texts(&doc), ["only"]);
            // Move mode relocates the node itself.
            assert!(replacement[0].is_connected());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_become_with_nothing_is_a_no_op() {
    LocalSet::new()
        .run_until(async {
            let doc = list(2);
            let items = select_all(&doc, "li", false).unwrap();
            items.become_with(Vec::new(), BecomeOptions::default());
            items.settled().await;
            assert_eq!(texts(&doc), ["0", "1"]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_appended_node_moves_into_first_member_and_clones_for_rest() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::parse(r#"<div class="box"></div><div class="box"></div>"#).unwrap();
            let boxes = select_all(&doc, ".box", false).unwrap();
            let badge = doc.create_element("em");
            badge.set_attribute("class", "badge").unwrap();

            boxes.append(&badge).prepend("<b>hi</b>");
            boxes.settled().await;

            assert_eq!(badge.parent(), Some(boxes[0].clone()));
            for b in boxes.iter() {
                assert_eq!(b.inner_html(), r#"<b>hi</b><em class="badge"></em>"#);
            }
            assert_eq!(doc.query_selector_all(".badge").unwrap().len(), 2);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_members_are_collapsed() {
    LocalSet::new()
        .run_until(async {
            let doc = list(2);
            let first = doc.query_selector("li").unwrap().unwrap();
            let items = wrap_all(vec![first.clone(), first.clone()], false);
            assert_eq!(items.len(), 1);

            items.append("!");
            items.settled().await;
            assert_eq!(first.text_content(), "0!");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_single_chain_become() {
    LocalSet::new()
        .run_until(async {
            let doc = list(2);
            let first = select(&doc, "li", false).unwrap();
            let fresh = doc.create_fragment("<li>new</li>").unwrap();
            first.become_with(fresh, BecomeOptions::default().mode(Mode::Move));
            first.settled().await;
            assert_eq!(texts(&doc), ["new", "1"]);
        })
        .await;
}
