use std::fmt;
use std::future::Future;

use futures::future::{FutureExt, LocalBoxFuture};

use crate::router::ErrorContext;

/// Result type of every unit of queued work.
pub type TaskResult<T = ()> = anyhow::Result<T>;

/// What a task's body produced when it was run.
pub enum Outcome {
    /// The work is done; the queue moves on without suspending.
    Ready,
    /// The queue suspends until this future settles.
    Pending(LocalBoxFuture<'static, TaskResult>),
}

impl Outcome {
    pub fn pending(future: impl Future<Output = TaskResult> + 'static) -> Self {
        Outcome::Pending(future.boxed_local())
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ready => f.write_str("Ready"),
            Outcome::Pending(_) => f.write_str("Pending"),
        }
    }
}

type Body = Box<dyn FnOnce() -> TaskResult<Outcome>>;

/// A named unit of work, bound to its arguments when it is created.
pub struct Task {
    context: ErrorContext,
    body: Body,
}

impl Task {
    pub fn new(
        operation: impl Into<String>,
        body: impl FnOnce() -> TaskResult<Outcome> + 'static,
    ) -> Self {
        Self {
            context: ErrorContext::new(operation),
            body: Box::new(body),
        }
    }

    /// A task that always completes synchronously.
    pub fn sync(operation: impl Into<String>, body: impl FnOnce() -> TaskResult + 'static) -> Self {
        Self::new(operation, move || body().map(|()| Outcome::Ready))
    }

    /// A task whose whole body is a future.
    pub fn future<F>(operation: impl Into<String>, body: impl FnOnce() -> F + 'static) -> Self
    where
        F: Future<Output = TaskResult> + 'static,
    {
        Self::new(operation, move || Ok(Outcome::pending(body())))
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.context.args = args;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.context.target = Some(target.into());
        self
    }

    pub fn operation(&self) -> &str {
        &self.context.operation
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    pub(crate) fn into_parts(self) -> (ErrorContext, Body) {
        (self.context, self.body)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("operation", &self.context.operation)
            .field("args", &self.context.args)
            .field("target", &self.context.target)
            .finish_non_exhaustive()
    }
}
