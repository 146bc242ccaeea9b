use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashSet;
use sequent_dom::Element;
use sequent_scheduler::{Task, TaskQueue};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::op::{Callback, Op};
use crate::queues;
use crate::traverse::Step;

/// Work issued against a chain.
pub(crate) enum Command {
    Apply(Op),
    Traverse { step: Step, sink: Rc<Binding> },
    Defer(Callback),
    Settled(oneshot::Sender<()>),
}

struct Members {
    elements: Vec<Element>,
    queues: Vec<Rc<TaskQueue>>,
}

/// The target of a chain.
///
/// A chain produced by a context switch starts unresolved: its target is only
/// known once the switch's tasks have run. Commands issued before that wait in
/// the backlog and are replayed, in order, the moment the target resolves.
pub(crate) struct Binding {
    members: OnceCell<Members>,
    backlog: RefCell<Vec<Command>>,
    fixed: bool,
}

impl Binding {
    pub(crate) fn pending(fixed: bool) -> Rc<Self> {
        Rc::new(Self {
            members: OnceCell::new(),
            backlog: RefCell::new(Vec::new()),
            fixed,
        })
    }

    pub(crate) fn resolved(elements: Vec<Element>, fixed: bool) -> Rc<Self> {
        let binding = Self::pending(fixed);
        binding.resolve(elements);
        binding
    }

    pub(crate) fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.members.get().is_some()
    }

    /// Resolved members; empty while unresolved.
    pub(crate) fn elements(&self) -> &[Element] {
        self.members
            .get()
            .map(|m| m.elements.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn dispatch(&self, command: Command) {
        match self.members.get() {
            Some(members) => members.run(command),
            None => self.backlog.borrow_mut().push(command),
        }
    }

    /// Fixes the target (duplicates dropped, first occurrence kept) and
    /// replays the backlog.
    pub(crate) fn resolve(&self, elements: Vec<Element>) {
        let mut seen = FxHashSet::default();
        let elements: Vec<Element> = elements
            .into_iter()
            .filter(|el| seen.insert(el.clone()))
            .collect();
        let queues = elements.iter().map(queues::queue_for).collect();
        let count = elements.len();
        if self.members.set(Members { elements, queues }).is_err() {
            warn!("chain target resolved twice; keeping the first");
            return;
        }

        let backlog = std::mem::take(&mut *self.backlog.borrow_mut());
        debug!(members = count, replayed = backlog.len(), "chain target resolved");
        for command in backlog {
            self.dispatch(command);
        }
    }
}

impl Members {
    fn each(&self) -> impl Iterator<Item = (usize, &Element, &Rc<TaskQueue>)> {
        self.elements
            .iter()
            .zip(&self.queues)
            .enumerate()
            .map(|(i, (el, queue))| (i, el, queue))
    }

    fn run(&self, command: Command) {
        match command {
            Command::Apply(op) => {
                for (i, el, queue) in self.each() {
                    queue.enqueue(op.task(el, i));
                }
            }
            Command::Traverse { step, sink } => {
                if self.elements.is_empty() {
                    sink.resolve(Vec::new());
                    return;
                }
                let gather = Rc::new(Gather {
                    parts: RefCell::new(vec![Vec::new(); self.elements.len()]),
                    remaining: Cell::new(self.elements.len()),
                    sink,
                });
                for (i, el, queue) in self.each() {
                    queue.enqueue(traverse_task(&step, el, i, &gather));
                }
            }
            Command::Defer(callback) => {
                for (_, el, queue) in self.each() {
                    let (target, callback) = (el.clone(), Rc::clone(&callback));
                    queue.enqueue(
                        Task::sync("defer", move || callback(&target)).with_target(el.describe()),
                    );
                }
            }
            Command::Settled(done) => {
                let marks: Vec<_> = self
                    .queues
                    .iter()
                    .map(|queue| (Rc::clone(queue), queue.enqueued()))
                    .collect();
                tokio::task::spawn_local(async move {
                    for (queue, mark) in marks {
                        queue.reached(mark).await;
                    }
                    let _ = done.send(());
                });
            }
        }
    }
}

fn traverse_task(step: &Step, member: &Element, index: usize, gather: &Rc<Gather>) -> Task {
    let (step, el, gather) = (step.clone(), member.clone(), Rc::clone(gather));
    let args = step.args();
    Task::sync(step.name(), move || match step.apply(&el) {
        Ok(found) => {
            gather.deliver(index, found);
            Ok(())
        }
        Err(err) => {
            gather.deliver(index, Vec::new());
            Err(err.into())
        }
    })
    .with_args(args)
    .with_target(member.describe())
}

/// Collects per-member traversal results and resolves the new chain once
/// every member has reported.
struct Gather {
    parts: RefCell<Vec<Vec<Element>>>,
    remaining: Cell<usize>,
    sink: Rc<Binding>,
}

impl Gather {
    fn deliver(&self, index: usize, found: Vec<Element>) {
        if let Some(slot) = self.parts.borrow_mut().get_mut(index) {
            *slot = found;
        }
        let remaining = self.remaining.get().saturating_sub(1);
        self.remaining.set(remaining);
        if remaining == 0 {
            let parts = std::mem::take(&mut *self.parts.borrow_mut());
            self.sink.resolve(parts.into_iter().flatten().collect());
        }
    }
}
