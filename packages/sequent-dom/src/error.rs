use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("node no longer exists in its document")]
    NodeNotFound,

    #[error("node is not an element")]
    NotAnElement,

    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("malformed html: {0}")]
    Html(String),

    #[error("cannot insert a node into itself or one of its descendants")]
    HierarchyRequest,

    #[error("node belongs to a different document")]
    WrongDocument,

    #[error("node must be detached before it can be disposed")]
    StillAttached,

    #[error("element has no member named `{0}`")]
    UnknownMember(String),

    #[error("`{member}` expects {expected} argument(s), got {got}")]
    Arity {
        member: String,
        expected: usize,
        got: usize,
    },
}

pub type Result<T> = std::result::Result<T, DomError>;
