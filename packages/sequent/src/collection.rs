use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use sequent_dom::Element;

use crate::binding::Binding;
use crate::chain::{Chain, Dispatch};
use crate::error::Result;
use crate::op::Op;

/// A chain over an ordered list of elements.
///
/// Every queued method enqueues one task per member, on that member's own
/// queue, so members progress independently. The collection dereferences to
/// `[Element]` for indexing, `len` and iteration; those reads are immediate.
#[derive(Clone)]
pub struct ChainAll {
    binding: Rc<Binding>,
}

impl ChainAll {
    pub(crate) fn from_binding(binding: Rc<Binding>) -> Self {
        Self { binding }
    }

    /// Chain over the `index`-th member, sharing its queue.
    pub fn at(&self, index: usize) -> Option<Chain> {
        let element = self.get(index)?.clone();
        Some(Chain::from_binding(Binding::resolved(
            vec![element],
            self.binding.is_fixed(),
        )))
    }

    /// Like [`Chain::invoke`], falling through to every member in order.
    pub fn invoke(&self, name: &str, args: &[&str]) -> Result<Dispatch> {
        if let Some(op) = Op::parse(name, args) {
            self.push(op?);
            return Ok(Dispatch::Queued);
        }
        let results = self
            .iter()
            .map(|element| element.call(name, args))
            .collect::<sequent_dom::Result<Vec<_>>>()?;
        Ok(Dispatch::NativeAll(results))
    }
}

chain_methods!(ChainAll, ChainAll);

impl Deref for ChainAll {
    type Target = [Element];

    fn deref(&self) -> &[Element] {
        self.binding.elements()
    }
}

impl<'a> IntoIterator for &'a ChainAll {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for ChainAll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainAll")
            .field("members", &self.binding.elements())
            .field("resolved", &self.binding.is_resolved())
            .field("fixed", &self.binding.is_fixed())
            .finish()
    }
}
