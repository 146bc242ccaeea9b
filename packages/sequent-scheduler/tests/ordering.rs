use anyhow::anyhow;
use sequent_scheduler::{Task, TaskQueue, set_error_handler};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;
use tokio::time::sleep;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn test_tasks_run_in_enqueue_order_across_async_delays() {
    LocalSet::new()
        .run_until(async {
            let queue = TaskQueue::new("list");
            let log = Rc::new(RefCell::new(Vec::new()));

            for (i, delay) in [30u64, 0, 10, 0, 20].into_iter().enumerate() {
                let log = log.clone();
                if delay == 0 {
                    queue.enqueue(Task::sync("push", move || {
                        log.borrow_mut().push(i);
                        anyhow::Ok(())
                    }));
                } else {
                    queue.enqueue(Task::future("push", move || async move {
                        sleep(ms(delay)).await;
                        log.borrow_mut().push(i);
                        anyhow::Ok(())
                    }));
                }
            }

            // Nothing runs until the enqueuing code yields.
            assert!(log.borrow().is_empty());
            assert_eq!(queue.len(), 5);

            queue.idle().await;
            assert_eq!(*log.borrow(), [0, 1, 2, 3, 4]);
            assert_eq!(queue.completed(), 5);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_next_task_starts_only_after_previous_settles() {
    LocalSet::new()
        .run_until(async {
            let queue = TaskQueue::new("strict");
            let first_done = Rc::new(Cell::new(false));
            let observed = Rc::new(Cell::new(None));

            let done = first_done.clone();
            queue.enqueue(Task::future("slow", move || async move {
                sleep(ms(50)).await;
                done.set(true);
                anyhow::Ok(())
            }));
            let done = first_done.clone();
            let seen = observed.clone();
            queue.enqueue(Task::sync("check", move || {
                seen.set(Some(done.get()));
                Ok(())
            }));

            sleep(ms(10)).await;
            assert!(queue.is_draining());
            assert_eq!(observed.get(), None);

            queue.idle().await;
            assert_eq!(observed.get(), Some(true));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_failures_are_reported_and_do_not_stop_the_queue() {
    LocalSet::new()
        .run_until(async {
            let reports = Rc::new(RefCell::new(Vec::new()));
            let sink = reports.clone();
            set_error_handler(move |err, ctx| {
                sink.borrow_mut()
                    .push(format!("{}:{}:{}", ctx.operation, ctx.args.join(","), err));
            });

            let queue = TaskQueue::new("failing");
            let ran = Rc::new(Cell::new(false));

            queue.enqueue(Task::sync("explode", || Err(anyhow!("sync boom"))).with_args(vec!["1".into()]));
            queue.enqueue(Task::future("reject", || async {
                sleep(ms(5)).await;
                Err::<(), _>(anyhow!("async boom"))
            }));
            let flag = ran.clone();
            queue.enqueue(Task::sync("after", move || {
                flag.set(true);
                Ok(())
            }));

            queue.idle().await;
            assert!(ran.get());
            assert_eq!(
                *reports.borrow(),
                ["explode:1:sync boom", "reject::async boom"]
            );
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_enqueue_during_drain_appends() {
    LocalSet::new()
        .run_until(async {
            let queue = TaskQueue::new("reentrant");
            let log = Rc::new(RefCell::new(Vec::new()));

            let (q, l) = (queue.clone(), log.clone());
            queue.enqueue(Task::sync("a", move || {
                l.borrow_mut().push("a");
                let l = l.clone();
                q.enqueue(Task::sync("c", move || {
                    l.borrow_mut().push("c");
                    Ok(())
                }));
                Ok(())
            }));
            let l = log.clone();
            queue.enqueue(Task::sync("b", move || {
                l.borrow_mut().push("b");
                Ok(())
            }));

            // `c` is enqueued while draining, so wait on the final count.
            queue.reached(3).await;
            assert_eq!(*log.borrow(), ["a", "b", "c"]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_drain_stops_when_empty_and_resumes_on_enqueue() {
    LocalSet::new()
        .run_until(async {
            let queue = TaskQueue::new("resume");
            let count = Rc::new(Cell::new(0));

            let c = count.clone();
            queue.enqueue(Task::sync("one", move || {
                c.set(c.get() + 1);
                Ok(())
            }));
            queue.idle().await;
            assert!(!queue.is_draining());
            assert!(queue.is_empty());

            let c = count.clone();
            queue.enqueue(Task::sync("two", move || {
                c.set(c.get() + 1);
                Ok(())
            }));
            assert!(queue.is_draining());
            queue.idle().await;
            assert_eq!(count.get(), 2);
            assert_eq!(queue.enqueued(), 2);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_panicking_task_does_not_wedge_the_queue() {
    LocalSet::new()
        .run_until(async {
            let queue = TaskQueue::new("panicky");
            let ran = Rc::new(Cell::new(false));

            queue.enqueue(Task::sync("explode", || panic!("task panicked")));
            queue.reached(1).await;
            assert!(!queue.is_draining());

            let flag = ran.clone();
            queue.enqueue(Task::sync("after", move || {
                flag.set(true);
                Ok(())
            }));
            queue.idle().await;
            assert!(ran.get());
            assert_eq!(queue.completed(), 2);
        })
        .await;
}
