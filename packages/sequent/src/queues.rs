use std::rc::Rc;

use sequent_dom::{Element, NodeId};
use sequent_scheduler::{QueueRegistry, TaskQueue};

thread_local! {
    static QUEUES: QueueRegistry<(u64, NodeId)> = QueueRegistry::new();
}

/// The queue for `element`, shared by every chain that wraps it.
pub(crate) fn queue_for(element: &Element) -> Rc<TaskQueue> {
    let key = (element.document().id(), element.node_id());
    QUEUES.with(|registry| registry.queue_for(key, || element.describe()))
}

/// Number of element queues currently alive on this thread.
pub fn live_queues() -> usize {
    QUEUES.with(QueueRegistry::live)
}
