use std::fmt;
use std::rc::Rc;

use sequent_dom::Element;

use crate::binding::Binding;
use crate::error::{ChainError, Result};
use crate::op::Op;

/// Result of [`Chain::invoke`] and [`ChainAll::invoke`](crate::ChainAll::invoke).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The name is a queued operation; it was enqueued.
    Queued,
    /// The name fell through to the element and ran immediately.
    Native(Option<String>),
    /// The name fell through to every member of a collection.
    NativeAll(Vec<Option<String>>),
}

/// A chain over a single element.
///
/// Queued methods return the chain itself so calls can be strung together;
/// they run in call order on the element's queue. Context switches such as
/// [`parent`](Chain::parent) return a new chain whose target is resolved
/// when the switch reaches the front of this chain's queue.
///
/// Everything not covered by a queued method is available directly on the
/// element through [`native`](Chain::native) or by name through
/// [`invoke`](Chain::invoke). Those calls are not ordered against the queue.
#[derive(Clone)]
pub struct Chain {
    binding: Rc<Binding>,
}

impl Chain {
    pub(crate) fn from_binding(binding: Rc<Binding>) -> Self {
        Self { binding }
    }

    /// The wrapped element, or `None` while unresolved or when a context
    /// switch found nothing.
    pub fn native(&self) -> Option<&Element> {
        self.binding.elements().first()
    }

    /// Calls `name` by name: queued when it is a queued operation, otherwise
    /// run right away against the element.
    pub fn invoke(&self, name: &str, args: &[&str]) -> Result<Dispatch> {
        if let Some(op) = Op::parse(name, args) {
            self.push(op?);
            return Ok(Dispatch::Queued);
        }
        let element = self
            .native()
            .ok_or_else(|| ChainError::NoTarget(name.to_string()))?;
        Ok(Dispatch::Native(element.call(name, args)?))
    }
}

chain_methods!(Chain, Chain);

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("target", &self.native())
            .field("fixed", &self.binding.is_fixed())
            .finish()
    }
}
