use anyhow::anyhow;
use sequent::dom::Document;
use sequent::{Meta, select, select_all, set_error_handler};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;
use tokio::time::{Instant, sleep};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn capture_reports() -> Rc<RefCell<Vec<String>>> {
    let reports = Rc::new(RefCell::new(Vec::new()));
    let sink = reports.clone();
    set_error_handler(move |err, ctx| {
        sink.borrow_mut()
            .push(format!("{}:{err}:{}", ctx.operation, serde_json::to_string(&ctx.meta).unwrap()));
    });
    reports
}

#[tokio::test(start_paused = true)]
async fn test_promisify_holds_the_queue_until_settled() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::parse(r#"<div id="t"></div>"#).unwrap();
            let chain = select(&doc, "#t", false).unwrap();

            chain
                .promisify(
                    |el, settle| {
                        tokio::task::spawn_local(async move {
                            sleep(ms(20)).await;
                            el.set_attribute("loaded", "yes").unwrap();
                            settle.resolve(());
                        });
                        Ok(())
                    },
                    None,
                    Meta::new(),
                )
                .text("after load");

            let el = chain.native().unwrap().clone();
            sleep(ms(19)).await;
            assert_eq!(el.text_content(), "");
            chain.settled().await;
            assert_eq!(el.get_attribute("loaded").as_deref(), Some("yes"));
            assert_eq!(el.text_content(), "after load");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_forgotten_callback_releases_queue_after_timeout() {
    LocalSet::new()
        .run_until(async {
            let reports = capture_reports();
            let doc = Document::parse(r#"<div id="t"></div>"#).unwrap();
            let chain = select(&doc, "#t", false).unwrap();

            let start = Instant::now();
            chain
                .promisify(|_, _| Ok(()), Some(ms(100)), Meta::new())
                .set_attribute("done", "yes");
            chain.settled().await;

            assert!(start.elapsed() >= ms(100));
            assert!(start.elapsed() < ms(102));
            assert!(chain.native().unwrap().has_attribute("done"));
            assert!(reports.borrow().is_empty());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_promisify_rejection_is_reported_once_with_meta() {
    LocalSet::new()
        .run_until(async {
            let reports = capture_reports();
            let doc = Document::parse(r#"<div id="t"></div>"#).unwrap();
            let chain = select(&doc, "#t", false).unwrap();

            let meta = Meta::from([("endpoint".to_string(), json!("/api"))]);
            chain
                .promisify(
                    |_, settle| {
                        settle.reject(anyhow!("offline"));
                        Ok(())
                    },
                    None,
                    meta.clone(),
                )
                .promisify(|_, _| Err(anyhow!("threw")), None, meta)
                .set_attribute("after", "yes");
            chain.settled().await;

            assert!(chain.native().unwrap().has_attribute("after"));
            assert_eq!(
                *reports.borrow(),
                [
                    r#"promisify:offline:{"endpoint":"/api"}"#,
                    r#"promisify:threw:{"endpoint":"/api"}"#,
                ]
            );
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_defer_waits_only_for_tasks_queued_before_it() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::parse(r#"<div id="t"></div>"#).unwrap();
            let chain = select(&doc, "#t", false).unwrap();
            let seen = Rc::new(RefCell::new(Vec::new()));

            chain.wait(ms(50)).set_attribute("stage", "1");
            let record = seen.clone();
            chain.defer(move |el| {
                record
                    .borrow_mut()
                    .push(el.get_attribute("stage").unwrap_or_default());
                Ok(())
            });
            chain.wait(ms(100)).set_attribute("stage", "2");

            sleep(ms(49)).await;
            assert!(seen.borrow().is_empty());
            sleep(ms(2)).await;
            assert_eq!(*seen.borrow(), ["1"]);

            chain.settled().await;
            assert_eq!(*seen.borrow(), ["1"]);
            assert_eq!(
                chain.native().unwrap().get_attribute("stage").as_deref(),
                Some("2")
            );
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_defer_sees_state_before_later_sync_tasks() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::parse(r#"<div id="t"></div>"#).unwrap();
            let chain = select(&doc, "#t", false).unwrap();
            let seen = Rc::new(RefCell::new(Vec::new()));

            let record = seen.clone();
            chain
                .set_attribute("s", "1")
                .defer(move |el| {
                    record.borrow_mut().push(el.get_attribute("s").unwrap_or_default());
                    Ok(())
                })
                .set_attribute("s", "2");

            chain.settled().await;
            assert_eq!(*seen.borrow(), ["1"]);
            assert_eq!(chain.native().unwrap().get_attribute("s").as_deref(), Some("2"));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_defer_never_overlaps_an_async_task() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::parse(r#"<div id="t"></div>"#).unwrap();
            let chain = select(&doc, "#t", false).unwrap();
            let log = Rc::new(RefCell::new(Vec::new()));

            let (deferred, slow) = (log.clone(), log.clone());
            chain
                .set_attribute("s", "1")
                .defer(move |_| {
                    deferred.borrow_mut().push("defer");
                    Ok(())
                })
                .run_async(move |_| {
                    let log = slow.clone();
                    async move {
                        log.borrow_mut().push("async-start");
                        sleep(ms(20)).await;
                        log.borrow_mut().push("async-end");
                        anyhow::Ok(())
                    }
                });

            chain.settled().await;
            assert_eq!(*log.borrow(), ["defer", "async-start", "async-end"]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_defer_runs_per_member_and_reports_failures() {
    LocalSet::new()
        .run_until(async {
            let reports = capture_reports();
            let doc = Document::parse("<p>a</p><p>b</p>").unwrap();
            let items = select_all(&doc, "p", false).unwrap();
            let seen = Rc::new(RefCell::new(Vec::new()));

            let record = seen.clone();
            items.add_class("ready").defer(move |el| {
                if el.text_content() == "b" {
                    return Err(anyhow!("no b"));
                }
                record.borrow_mut().push(el.has_class("ready"));
                Ok(())
            });

            items.settled().await;
            assert_eq!(*seen.borrow(), [true]);
            assert_eq!(*reports.borrow(), ["defer:no b:{}"]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_listeners_are_bound_in_queue_order() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::parse(r#"<button id="b"></button>"#).unwrap();
            let button = select(&doc, "#b", false).unwrap();
            let clicks = Rc::new(RefCell::new(Vec::new()));

            let log = clicks.clone();
            button
                .trigger("click")
                .on("click", move |e| log.borrow_mut().push(e.detail.clone()))
                .trigger_with("click", "second")
                .off("click")
                .trigger("click");

            button.settled().await;
            assert_eq!(*clicks.borrow(), [Some("second".to_string())]);
        })
        .await;
}
