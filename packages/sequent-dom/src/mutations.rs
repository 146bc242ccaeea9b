use serde::{Deserialize, Serialize};

use crate::document::NodeId;

/// A record of one change applied to a [`Document`](crate::Document).
///
/// Every primitive that changes the tree appends one of these to the
/// document's log, so callers can observe the exact order in which queued
/// work touched the DOM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    SetAttribute {
        id: NodeId,
        name: String,
        value: String,
    },
    RemoveAttribute {
        id: NodeId,
        name: String,
    },
    SetText {
        id: NodeId,
        value: String,
    },
    SetInnerHtml {
        id: NodeId,
        html: String,
    },
    InsertChild {
        parent: NodeId,
        id: NodeId,
        index: usize,
    },
    Remove {
        id: NodeId,
    },
    ReplaceWith {
        id: NodeId,
        replacement: NodeId,
    },
    NewEventListener {
        id: NodeId,
        name: String,
    },
    RemoveEventListener {
        id: NodeId,
        name: String,
    },
    Dispose {
        id: NodeId,
    },
}

impl Mutation {
    /// The node the mutation was applied to.
    pub fn target(&self) -> NodeId {
        match self {
            Mutation::SetAttribute { id, .. }
            | Mutation::RemoveAttribute { id, .. }
            | Mutation::SetText { id, .. }
            | Mutation::SetInnerHtml { id, .. }
            | Mutation::Remove { id }
            | Mutation::ReplaceWith { id, .. }
            | Mutation::NewEventListener { id, .. }
            | Mutation::RemoveEventListener { id, .. }
            | Mutation::Dispose { id } => *id,
            Mutation::InsertChild { parent, .. } => *parent,
        }
    }
}
