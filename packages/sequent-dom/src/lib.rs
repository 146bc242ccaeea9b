pub mod document;
pub mod element;
pub mod error;
pub mod events;
pub mod html;
pub mod mutations;
pub mod sanitize;
pub mod selector;
mod style;

pub use document::{Attribute, Document, NodeId};
pub use element::Element;
pub use error::{DomError, Result};
pub use events::{Event, Handler, ListenerId};
pub use mutations::Mutation;
pub use sanitize::{SanitizeConfig, sanitize};
