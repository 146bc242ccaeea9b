//! The table of queued operations.
//!
//! Every chain method that must stay ordered relative to other queued work is
//! an [`Op`]. Anything else falls through to the element itself.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;
use sequent_dom::{Element, Handler, SanitizeConfig};
use sequent_scheduler::{Meta, Outcome, Settle, Task, TaskResult, normalize};

use crate::error::{ChainError, Result};
use crate::replace::{self, BecomeOptions};

pub(crate) type Callback = Rc<dyn Fn(&Element) -> TaskResult>;
pub(crate) type AsyncCallback = Rc<dyn Fn(Element) -> LocalBoxFuture<'static, TaskResult>>;
pub(crate) type SettleCallback = Rc<dyn Fn(Element, Settle<()>) -> TaskResult>;

/// Where inserted content goes relative to the member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    Append,
    Prepend,
    Before,
    After,
}

impl Placement {
    fn name(self) -> &'static str {
        match self {
            Placement::Append => "append",
            Placement::Prepend => "prepend",
            Placement::Before => "before",
            Placement::After => "after",
        }
    }
}

/// Content for `append`, `prepend`, `before` and `after`.
///
/// Markup is parsed separately for every member. Existing elements are moved
/// into the first member and deep-cloned for the others.
#[derive(Debug, Clone)]
pub enum Content {
    Html(String),
    Nodes(Vec<Element>),
}

impl From<&str> for Content {
    fn from(html: &str) -> Self {
        Content::Html(html.to_string())
    }
}

impl From<String> for Content {
    fn from(html: String) -> Self {
        Content::Html(html)
    }
}

impl From<Element> for Content {
    fn from(node: Element) -> Self {
        Content::Nodes(vec![node])
    }
}

impl From<&Element> for Content {
    fn from(node: &Element) -> Self {
        Content::Nodes(vec![node.clone()])
    }
}

impl From<Vec<Element>> for Content {
    fn from(nodes: Vec<Element>) -> Self {
        Content::Nodes(nodes)
    }
}

#[derive(Clone)]
pub(crate) enum Op {
    SetAttribute(String, String),
    RemoveAttribute(String),
    ToggleAttribute(String, Option<bool>),
    AddClass(String),
    RemoveClass(String),
    ToggleClass(String, Option<bool>),
    Css(String, String),
    Text(String),
    Html(String),
    Sanitize(String, Rc<SanitizeConfig>),
    Insert(Placement, Content),
    Remove,
    Become(Rc<[Element]>, BecomeOptions),
    Wait(Duration),
    Run(Callback),
    RunAsync(AsyncCallback),
    Promisify(SettleCallback, Option<Duration>, Meta),
    On(String, Handler),
    Off(String),
    Trigger(String, Option<String>),
}

impl Op {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Op::SetAttribute(..) => "set_attribute",
            Op::RemoveAttribute(_) => "remove_attribute",
            Op::ToggleAttribute(..) => "toggle_attribute",
            Op::AddClass(_) => "add_class",
            Op::RemoveClass(_) => "remove_class",
            Op::ToggleClass(..) => "toggle_class",
            Op::Css(..) => "css",
            Op::Text(_) => "text",
            Op::Html(_) => "html",
            Op::Sanitize(..) => "sanitize",
            Op::Insert(placement, _) => placement.name(),
            Op::Remove => "remove",
            Op::Become(..) => "become",
            Op::Wait(_) => "wait",
            Op::Run(_) => "run",
            Op::RunAsync(_) => "run_async",
            Op::Promisify(..) => "promisify",
            Op::On(..) => "on",
            Op::Off(_) => "off",
            Op::Trigger(..) => "trigger",
        }
    }

    /// Arguments as recorded in error reports.
    pub(crate) fn args(&self) -> Vec<String> {
        fn flag(force: &Option<bool>) -> Vec<String> {
            force.iter().map(bool::to_string).collect()
        }
        match self {
            Op::SetAttribute(name, value) | Op::Css(name, value) => {
                vec![name.clone(), value.clone()]
            }
            Op::RemoveAttribute(value)
            | Op::AddClass(value)
            | Op::RemoveClass(value)
            | Op::Text(value)
            | Op::Html(value)
            | Op::Sanitize(value, _)
            | Op::On(value, _)
            | Op::Off(value) => vec![value.clone()],
            Op::ToggleAttribute(name, force) | Op::ToggleClass(name, force) => {
                let mut args = vec![name.clone()];
                args.extend(flag(force));
                args
            }
            Op::Insert(_, Content::Html(html)) => vec![html.clone()],
            Op::Insert(_, Content::Nodes(nodes)) => nodes.iter().map(Element::describe).collect(),
            Op::Become(nodes, options) => {
                let mut args: Vec<String> = nodes.iter().map(Element::describe).collect();
                args.push(format!("{options:?}"));
                args
            }
            Op::Wait(duration) => vec![format!("{}ms", duration.as_millis())],
            Op::Trigger(name, detail) => {
                let mut args = vec![name.clone()];
                args.extend(detail.iter().cloned());
                args
            }
            Op::Remove | Op::Run(_) | Op::RunAsync(_) | Op::Promisify(..) => Vec::new(),
        }
    }

    /// Looks `name` up in the operation table. `None` means the name is not a
    /// queued operation and should fall through to the element.
    ///
    /// Only operations whose arguments are plain strings can be invoked by
    /// name; callbacks and element arguments need the typed methods.
    pub(crate) fn parse(name: &str, args: &[&str]) -> Option<Result<Op>> {
        let invalid = |reason: String| ChainError::InvalidArguments {
            operation: name.to_string(),
            reason,
        };
        let arity = |min: usize, max: usize| {
            if (min..=max).contains(&args.len()) {
                Ok(())
            } else if min == max {
                Err(invalid(format!("expected {min} argument(s), got {}", args.len())))
            } else {
                Err(invalid(format!(
                    "expected {min} to {max} arguments, got {}",
                    args.len()
                )))
            }
        };
        let force = |at: usize| -> Result<Option<bool>> {
            match args.get(at) {
                None => Ok(None),
                Some(&"true") => Ok(Some(true)),
                Some(&"false") => Ok(Some(false)),
                Some(other) => Err(invalid(format!("`{other}` is not a boolean"))),
            }
        };
        let arg = |at: usize| args[at].to_string();

        let op = match name {
            "set_attribute" => arity(2, 2).map(|_| Op::SetAttribute(arg(0), arg(1))),
            "remove_attribute" => arity(1, 1).map(|_| Op::RemoveAttribute(arg(0))),
            "toggle_attribute" => arity(1, 2)
                .and_then(|_| force(1))
                .map(|f| Op::ToggleAttribute(arg(0), f)),
            "add_class" => arity(1, 1).map(|_| Op::AddClass(arg(0))),
            "remove_class" => arity(1, 1).map(|_| Op::RemoveClass(arg(0))),
            "toggle_class" => arity(1, 2)
                .and_then(|_| force(1))
                .map(|f| Op::ToggleClass(arg(0), f)),
            "css" => arity(2, 2).map(|_| Op::Css(arg(0), arg(1))),
            "text" => arity(1, 1).map(|_| Op::Text(arg(0))),
            "html" => arity(1, 1).map(|_| Op::Html(arg(0))),
            "sanitize" => arity(1, 1)
                .map(|_| Op::Sanitize(arg(0), Rc::new(SanitizeConfig::default()))),
            "append" | "prepend" | "before" | "after" => arity(1, 1).map(|_| {
                let placement = match name {
                    "append" => Placement::Append,
                    "prepend" => Placement::Prepend,
                    "before" => Placement::Before,
                    _ => Placement::After,
                };
                Op::Insert(placement, Content::Html(arg(0)))
            }),
            "remove" => arity(0, 0).map(|_| Op::Remove),
            "wait" => arity(1, 1).and_then(|_| {
                args[0]
                    .parse::<u64>()
                    .map(|ms| Op::Wait(Duration::from_millis(ms)))
                    .map_err(|_| invalid(format!("`{}` is not a millisecond count", args[0])))
            }),
            "off" => arity(1, 1).map(|_| Op::Off(arg(0))),
            "trigger" => arity(1, 2).map(|_| Op::Trigger(arg(0), args.get(1).map(|d| d.to_string()))),
            _ => return None,
        };
        Some(op)
    }

    /// Builds the task that applies this operation to `member`, the
    /// `index`-th member of its chain.
    pub(crate) fn task(&self, member: &Element, index: usize) -> Task {
        let name = self.name();
        let el = member.clone();
        let task = match self.clone() {
            Op::SetAttribute(attr, value) => {
                Task::sync(name, move || Ok(el.set_attribute(&attr, &value)?))
            }
            Op::RemoveAttribute(attr) => Task::sync(name, move || Ok(el.remove_attribute(&attr)?)),
            Op::ToggleAttribute(attr, force) => Task::sync(name, move || {
                el.toggle_attribute(&attr, force)?;
                Ok(())
            }),
            Op::AddClass(class) => Task::sync(name, move || Ok(el.add_class(&class)?)),
            Op::RemoveClass(class) => Task::sync(name, move || Ok(el.remove_class(&class)?)),
            Op::ToggleClass(class, force) => Task::sync(name, move || {
                el.toggle_class(&class, force)?;
                Ok(())
            }),
            Op::Css(property, value) => Task::sync(name, move || Ok(el.set_style(&property, &value)?)),
            Op::Text(text) => Task::sync(name, move || Ok(el.set_text_content(&text)?)),
            Op::Html(html) => Task::sync(name, move || Ok(el.set_inner_html(&html)?)),
            Op::Sanitize(html, config) => Task::sync(name, move || {
                let clean = sequent_dom::sanitize(&html, &config)?;
                Ok(el.set_inner_html(&clean)?)
            }),
            Op::Insert(placement, content) => {
                Task::sync(name, move || insert(&el, placement, &content, index))
            }
            Op::Remove => Task::sync(name, move || Ok(el.remove()?)),
            Op::Become(replacements, options) => Task::sync(name, move || {
                Ok(replace::apply(&el, index, &replacements, options)?)
            }),
            Op::Wait(duration) => Task::future(name, move || async move {
                tokio::time::sleep(duration).await;
                anyhow::Ok(())
            }),
            Op::Run(callback) => Task::sync(name, move || callback(&el)),
            Op::RunAsync(callback) => Task::new(name, move || Ok(Outcome::Pending(callback(el)))),
            Op::Promisify(callback, timeout, meta) => Task::new(name, move || {
                let call = normalize(
                    move |el: Element, settle: Settle<()>| callback(el, settle),
                    timeout,
                    meta,
                );
                let deferred = call(el);
                // Rejections were already reported with their promisify context.
                Ok(Outcome::pending(async move {
                    let _ = deferred.await;
                    anyhow::Ok(())
                }))
            }),
            Op::On(event, handler) => Task::sync(name, move || {
                el.add_listener(&event, handler)?;
                Ok(())
            }),
            Op::Off(event) => Task::sync(name, move || {
                el.off(&event)?;
                Ok(())
            }),
            Op::Trigger(event, detail) => Task::sync(name, move || {
                el.dispatch_with(&event, detail)?;
                Ok(())
            }),
        };
        task.with_args(self.args()).with_target(member.describe())
    }
}

impl fmt::Debug for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.args().join(", "))
    }
}

fn insert(member: &Element, placement: Placement, content: &Content, index: usize) -> TaskResult {
    let nodes = match content {
        Content::Html(html) => {
            match placement {
                Placement::Append => member.append_html(html)?,
                Placement::Prepend => member.prepend_html(html)?,
                Placement::Before => member.before_html(html)?,
                Placement::After => member.after_html(html)?,
            }
            return Ok(());
        }
        Content::Nodes(nodes) if index == 0 => nodes.clone(),
        Content::Nodes(nodes) => nodes
            .iter()
            .map(|node| node.clone_node(true))
            .collect::<sequent_dom::Result<Vec<_>>>()?,
    };

    match placement {
        Placement::Append => {
            for node in &nodes {
                member.append_child(node)?;
            }
        }
        Placement::Before => {
            for node in &nodes {
                member.before(node)?;
            }
        }
        Placement::Prepend => {
            for node in nodes.iter().rev() {
                member.prepend_child(node)?;
            }
        }
        Placement::After => {
            for node in nodes.iter().rev() {
                member.after(node)?;
            }
        }
    }
    Ok(())
}
