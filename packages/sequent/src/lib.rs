//! Ordered, chainable operations on DOM elements.
//!
//! ```ignore
//! let card = sequent::select(&doc, "#card", false)?;
//! card.add_class("loading")
//!     .wait(Duration::from_millis(50))
//!     .text("ready")
//!     .remove_class("loading");
//! ```
//!
//! Each element gets one execution queue. Queued methods append a task to it
//! and return immediately; the queue runs tasks strictly one after another,
//! waiting on asynchronous ones, once the calling code yields. A failing task
//! is reported to the error handler (see [`set_error_handler`]) and the queue
//! carries on.
//!
//! Queues drain on the current [`tokio::task::LocalSet`].

#[macro_use]
mod methods;

mod binding;
mod chain;
mod collection;
mod error;
mod op;
mod queues;
mod replace;
mod traverse;

use sequent_dom::{Document, Element};

use crate::binding::Binding;

pub use chain::{Chain, Dispatch};
pub use collection::ChainAll;
pub use error::{ChainError, Result};
pub use op::Content;
pub use queues::live_queues;
pub use replace::{BecomeOptions, Matching, Mode};

pub use sequent_dom as dom;
pub use sequent_scheduler::{
    DEFAULT_TIMEOUT, Deferred, ErrorContext, Meta, Settle, TaskResult, normalize,
    reset_error_handler, set_error_handler,
};

/// Chain over the first element matching `selector`.
///
/// With `fixed`, context switches on the returned chain fail with
/// [`ChainError::ImmutableTarget`].
pub fn select(document: &Document, selector: &str, fixed: bool) -> Result<Chain> {
    let element = document
        .query_selector(selector)?
        .ok_or_else(|| ChainError::NoMatch(selector.to_string()))?;
    Ok(wrap(element, fixed))
}

/// Chain over every element matching `selector`, in document order. Matching
/// nothing yields an empty collection.
pub fn select_all(document: &Document, selector: &str, fixed: bool) -> Result<ChainAll> {
    Ok(wrap_all(document.query_selector_all(selector)?, fixed))
}

pub fn wrap(element: Element, fixed: bool) -> Chain {
    Chain::from_binding(Binding::resolved(vec![element], fixed))
}

pub fn wrap_all(elements: impl IntoIterator<Item = Element>, fixed: bool) -> ChainAll {
    ChainAll::from_binding(Binding::resolved(elements.into_iter().collect(), fixed))
}
