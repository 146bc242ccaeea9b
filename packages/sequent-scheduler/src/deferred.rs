//! Turning callback-style functions into awaitable results.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::{FutureExt, LocalBoxFuture};
use tokio::sync::oneshot;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::router::{self, ErrorContext, Meta};
use crate::task::TaskResult;

/// How long a normalized call waits for settlement before resolving empty.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// The outcome of an asynchronous call.
///
/// Resolves to `Ok(Some(value))` when settled with a value, `Ok(None)` when
/// it auto-resolved on timeout, and `Err` when rejected.
#[must_use = "a deferred result does nothing unless awaited"]
pub struct Deferred<T> {
    inner: LocalBoxFuture<'static, TaskResult<Option<T>>>,
}

impl<T: 'static> Deferred<T> {
    pub fn new(future: impl Future<Output = TaskResult<Option<T>>> + 'static) -> Self {
        Self {
            inner: future.boxed_local(),
        }
    }

    pub fn resolved(value: T) -> Self {
        Self::new(async move { Ok(Some(value)) })
    }

    pub fn rejected(err: anyhow::Error) -> Self {
        Self::new(async move { Err(err) })
    }
}

impl<T> Future for Deferred<T> {
    type Output = TaskResult<Option<T>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().inner.as_mut().poll(cx)
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred { .. }")
    }
}

/// Resolve/reject handle passed to a normalized function.
///
/// Clones share one settlement; only the first call through any clone counts.
pub struct Settle<T> {
    slot: Rc<RefCell<Option<oneshot::Sender<TaskResult<T>>>>>,
    context: Rc<ErrorContext>,
}

impl<T> Clone for Settle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
            context: Rc::clone(&self.context),
        }
    }
}

impl<T> Settle<T> {
    /// Returns `false` if the call had already been settled or timed out.
    pub fn resolve(&self, value: T) -> bool {
        match self.slot.borrow_mut().take() {
            Some(tx) => {
                let _ = tx.send(Ok(value));
                true
            }
            None => false,
        }
    }

    /// Reports `err` and settles as rejected. Returns `false`, without
    /// reporting, if the call had already been settled or timed out.
    pub fn reject(&self, err: impl Into<anyhow::Error>) -> bool {
        let Some(tx) = self.slot.borrow_mut().take() else {
            return false;
        };
        let err = err.into();
        router::report(&err, &self.context);
        let _ = tx.send(Err(err));
        true
    }

    pub fn is_settled(&self) -> bool {
        self.slot.borrow().is_none()
    }
}

/// Wraps a callback-style `f` into a function returning a [`Deferred`].
///
/// `f` receives its argument and a [`Settle`] handle. The timeout (defaulting
/// to [`DEFAULT_TIMEOUT`]) starts when the returned function is called; if
/// nothing settles by then the result resolves with no value. Rejections and
/// synchronous errors from `f` are reported as operation `"promisify"` with
/// `meta` merged into the context.
pub fn normalize<A, T, F>(
    f: F,
    timeout: Option<Duration>,
    meta: Meta,
) -> impl Fn(A) -> Deferred<T>
where
    A: fmt::Debug,
    T: 'static,
    F: Fn(A, Settle<T>) -> TaskResult + 'static,
{
    let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
    move |arg: A| {
        let context = ErrorContext::new("promisify")
            .with_args(vec![format!("{arg:?}")])
            .with_meta(meta.clone());
        let (tx, rx) = oneshot::channel();
        let settle = Settle {
            slot: Rc::new(RefCell::new(Some(tx))),
            context: Rc::new(context),
        };
        let deadline = Instant::now() + timeout;
        let slot = Rc::downgrade(&settle.slot);

        if let Err(err) = f(arg, settle.clone()) {
            router::report(&err, &settle.context);
            if settle.slot.borrow_mut().take().is_some() {
                return Deferred::rejected(err);
            }
        }

        Deferred::new(async move {
            tokio::select! {
                settled = rx => match settled {
                    Ok(result) => result.map(Some),
                    // Every handle dropped unsettled: only the timer can finish it.
                    Err(_) => {
                        sleep_until(deadline).await;
                        debug!(?timeout, "promisify auto-resolved");
                        Ok(None)
                    }
                },
                () = sleep_until(deadline) => {
                    close(&slot);
                    debug!(?timeout, "promisify auto-resolved");
                    Ok(None)
                }
            }
        })
    }
}

/// Marks a timed-out call settled so late resolve/reject calls are ignored.
fn close<T>(slot: &Weak<RefCell<Option<oneshot::Sender<TaskResult<T>>>>>) {
    if let Some(slot) = slot.upgrade() {
        slot.borrow_mut().take();
    }
}
