use std::cell::RefCell;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::queue::TaskQueue;

/// Maps target identities to their queues.
///
/// Entries are weak: a queue lives exactly as long as some proxy (or its own
/// drain loop) holds it, and the registry never keeps targets alive.
pub struct QueueRegistry<K> {
    queues: RefCell<FxHashMap<K, Weak<TaskQueue>>>,
}

impl<K: Eq + Hash> QueueRegistry<K> {
    pub fn new() -> Self {
        Self {
            queues: RefCell::new(FxHashMap::default()),
        }
    }

    /// Returns the live queue for `key`, creating it on first use.
    pub fn queue_for(&self, key: K, label: impl FnOnce() -> String) -> Rc<TaskQueue> {
        let mut queues = self.queues.borrow_mut();
        if let Some(queue) = queues.get(&key).and_then(Weak::upgrade) {
            return queue;
        }
        queues.retain(|_, queue| queue.strong_count() > 0);
        let queue = TaskQueue::new(label());
        queues.insert(key, Rc::downgrade(&queue));
        queue
    }

    pub fn get(&self, key: &K) -> Option<Rc<TaskQueue>> {
        self.queues.borrow().get(key).and_then(Weak::upgrade)
    }

    /// Number of queues still alive.
    pub fn live(&self) -> usize {
        self.queues
            .borrow()
            .values()
            .filter(|queue| queue.strong_count() > 0)
            .count()
    }
}

impl<K: Eq + Hash> Default for QueueRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}
