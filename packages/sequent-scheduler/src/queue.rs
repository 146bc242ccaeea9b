use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use tokio::sync::Notify;
use tracing::{debug, trace, warn};

use crate::router;
use crate::task::{Outcome, Task};

/// A FIFO worklist bound to one target, plus the loop that drains it.
///
/// At most one task is in flight at a time. The drain loop is spawned onto the
/// current [`LocalSet`](tokio::task::LocalSet) the first time a task lands on
/// an idle queue, so a burst of synchronous `enqueue` calls is fully recorded
/// before anything runs.
pub struct TaskQueue {
    label: String,
    pending: RefCell<VecDeque<Task>>,
    draining: Cell<bool>,
    enqueued: Cell<u64>,
    completed: Cell<u64>,
    progress: Notify,
}

impl TaskQueue {
    pub fn new(label: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            label: label.into(),
            pending: RefCell::new(VecDeque::new()),
            draining: Cell::new(false),
            enqueued: Cell::new(0),
            completed: Cell::new(0),
            progress: Notify::new(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Appends `task` and starts draining if the queue was idle.
    ///
    /// A task (or error handler) that panics ends the current drain. The task
    /// counts as completed and the queue goes idle; tasks still pending run
    /// once the next `enqueue` starts a new drain.
    ///
    /// # Panics
    ///
    /// When a drain has to be started outside a `LocalSet`.
    pub fn enqueue(self: &Rc<Self>, task: Task) {
        trace!(queue = %self.label, operation = task.operation(), "enqueue");
        self.pending.borrow_mut().push_back(task);
        self.enqueued.set(self.enqueued.get() + 1);

        if !self.draining.replace(true) {
            debug!(queue = %self.label, "drain started");
            tokio::task::spawn_local(drain(Rc::clone(self)));
        }
    }

    /// Tasks waiting to run, not counting one in flight.
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.get()
    }

    /// Total number of tasks ever enqueued. Task `n` (1-based) has finished
    /// once [`completed`](Self::completed) is at least `n`.
    pub fn enqueued(&self) -> u64 {
        self.enqueued.get()
    }

    pub fn completed(&self) -> u64 {
        self.completed.get()
    }

    /// Resolves once `mark` tasks have finished, successfully or not.
    pub async fn reached(&self, mark: u64) {
        loop {
            let notified = self.progress.notified();
            if self.completed.get() >= mark {
                return;
            }
            notified.await;
        }
    }

    /// Resolves once every task enqueued so far has finished.
    pub async fn idle(&self) {
        self.reached(self.enqueued()).await
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("label", &self.label)
            .field("pending", &self.len())
            .field("draining", &self.draining.get())
            .field("completed", &self.completed.get())
            .finish()
    }
}

/// Clears `draining` however the drain loop ends.
struct Draining {
    queue: Rc<TaskQueue>,
    finished: bool,
}

impl Drop for Draining {
    fn drop(&mut self) {
        let queue = &self.queue;
        if !self.finished {
            // The task in flight panicked, or the drain was dropped mid-task.
            queue.completed.set(queue.completed.get() + 1);
            queue.progress.notify_waiters();
            warn!(queue = %queue.label, pending = queue.len(), "drain aborted");
        }
        queue.draining.set(false);
    }
}

async fn drain(queue: Rc<TaskQueue>) {
    let mut guard = Draining {
        queue,
        finished: false,
    };
    loop {
        let queue = &guard.queue;
        // Pop in its own statement so the borrow is released before the task
        // runs; tasks may enqueue onto this same queue.
        let next = queue.pending.borrow_mut().pop_front();
        let Some(task) = next else {
            break;
        };
        run(task, &queue.label).await;
        queue.completed.set(queue.completed.get() + 1);
        queue.progress.notify_waiters();
    }
    guard.finished = true;
    debug!(queue = %guard.queue.label, completed = guard.queue.completed.get(), "drain idle");
}

async fn run(task: Task, label: &str) {
    let (context, body) = task.into_parts();
    trace!(queue = %label, operation = %context.operation, "run");
    let result = match body() {
        Ok(Outcome::Ready) => Ok(()),
        Ok(Outcome::Pending(future)) => future.await,
        Err(err) => Err(err),
    };
    if let Err(err) = result {
        router::report(&err, &context);
    }
}
