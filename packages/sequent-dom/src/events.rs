use std::rc::Rc;

use crate::element::Element;

/// Identifies one registered listener so it can be removed individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

pub type Handler = Rc<dyn Fn(&Event)>;

/// A synchronously dispatched event.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub target: Element,
    pub detail: Option<String>,
}

#[derive(Clone)]
pub(crate) struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) name: String,
    pub(crate) handler: Handler,
}
