//! Execution queues for chained, ordered work.
//!
//! A [`TaskQueue`] runs [`Task`]s one at a time in the order they were
//! enqueued, awaiting any task that hands back a pending future before moving
//! on. Failures never stop a queue; they are handed to the thread's error
//! handler (see [`router`]) and the next task runs.
//!
//! Everything here is single-threaded. Queues drain on
//! [`tokio::task::spawn_local`], so enqueueing must happen inside a
//! [`tokio::task::LocalSet`].

pub mod deferred;
pub mod queue;
pub mod registry;
pub mod router;
pub mod task;

pub use deferred::{DEFAULT_TIMEOUT, Deferred, Settle, normalize};
pub use queue::TaskQueue;
pub use registry::QueueRegistry;
pub use router::{ErrorContext, ErrorHandler, Meta, report, reset_error_handler, set_error_handler};
pub use task::{Outcome, Task, TaskResult};
