use sequent_dom::{Element, selector};

use crate::error::Result;

/// A context switch, evaluated against the live tree when its task runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    Parent,
    Next,
    Prev,
    First,
    Last,
    Kids,
    Siblings,
    Closest(String),
    Pick(String),
    PickAll(String),
}

impl Step {
    /// Builds a selector step, rejecting malformed selectors up front.
    pub(crate) fn with_selector(make: fn(String) -> Step, selector: &str) -> Result<Step> {
        selector::parse(selector)?;
        Ok(make(selector.to_string()))
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Step::Parent => "parent",
            Step::Next => "next",
            Step::Prev => "prev",
            Step::First => "first",
            Step::Last => "last",
            Step::Kids => "kids",
            Step::Siblings => "siblings",
            Step::Closest(_) => "closest",
            Step::Pick(_) => "pick",
            Step::PickAll(_) => "pick_all",
        }
    }

    pub(crate) fn args(&self) -> Vec<String> {
        match self {
            Step::Closest(s) | Step::Pick(s) | Step::PickAll(s) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Elements this step reaches from `member`, in document order.
    pub(crate) fn apply(&self, member: &Element) -> sequent_dom::Result<Vec<Element>> {
        let one = |found: Option<Element>| -> Vec<Element> { found.into_iter().collect() };
        Ok(match self {
            Step::Parent => one(member.parent()),
            Step::Next => one(member.next_sibling()),
            Step::Prev => one(member.previous_sibling()),
            Step::First => one(member.first_child()),
            Step::Last => one(member.last_child()),
            Step::Kids => member.children(),
            Step::Siblings => member.siblings(),
            Step::Closest(selector) => one(member.closest(selector)?),
            Step::Pick(selector) => one(member.query_selector(selector)?),
            Step::PickAll(selector) => member.query_selector_all(selector)?,
        })
    }
}
