//! The per-thread error sink every task failure is reported to.
//!
//! The chain runtime is single-threaded, so per-thread is the whole program
//! for all practical purposes.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

/// Open, caller-extensible diagnostic fields.
pub type Meta = BTreeMap<String, serde_json::Value>;

pub type ErrorHandler = Rc<dyn Fn(&anyhow::Error, &ErrorContext)>;

/// What failed and where.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorContext {
    pub operation: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Self::default()
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Merges `meta` in; keys already present are overwritten.
    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta.extend(meta);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.operation, self.args.join(", "))?;
        if let Some(target) = &self.target {
            write!(f, " on {target}")?;
        }
        Ok(())
    }
}

fn default_handler() -> ErrorHandler {
    Rc::new(|err, ctx| {
        tracing::error!(
            operation = %ctx.operation,
            args = ?ctx.args,
            target = ?ctx.target,
            meta = ?ctx.meta,
            "task failed: {err:#}"
        );
    })
}

thread_local! {
    static HANDLER: RefCell<ErrorHandler> = RefCell::new(default_handler());
}

/// Replaces the handler for every subsequent failure on this thread.
pub fn set_error_handler(handler: impl Fn(&anyhow::Error, &ErrorContext) + 'static) {
    HANDLER.with(|slot| *slot.borrow_mut() = Rc::new(handler));
}

/// Restores the logging handler.
pub fn reset_error_handler() {
    HANDLER.with(|slot| *slot.borrow_mut() = default_handler());
}

/// Hands one failure to the current handler. Panics in the handler propagate.
pub fn report(err: &anyhow::Error, context: &ErrorContext) {
    // Clone out first: the handler may itself replace the handler.
    let handler = HANDLER.with(|slot| Rc::clone(&slot.borrow()));
    handler(err, context);
}
