use sequent_dom::DomError;
use thiserror::Error;

/// Errors surfaced synchronously at the call site.
///
/// Failures of queued work never show up here; they go to the error handler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("`{operation}` cannot retarget a fixed chain")]
    ImmutableTarget { operation: &'static str },

    #[error("no element matches `{0}`")]
    NoMatch(String),

    #[error("invalid arguments for `{operation}`: {reason}")]
    InvalidArguments { operation: String, reason: String },

    #[error("`{0}` needs a resolved element but the chain has none")]
    NoTarget(String),

    #[error(transparent)]
    Dom(#[from] DomError),
}

pub type Result<T> = std::result::Result<T, ChainError>;
