use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::element::Element;
use crate::error::{DomError, Result};
use crate::events::Listener;
use crate::mutations::Mutation;
use crate::{html, selector};

new_key_type! {
    pub struct NodeId;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

pub(crate) struct ElementData {
    pub(crate) tag: String,
    pub(crate) attrs: SmallVec<[Attribute; 4]>,
    pub(crate) listeners: Vec<Listener>,
}

impl ElementData {
    pub(crate) fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: SmallVec::new(),
            listeners: Vec::new(),
        }
    }

    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub(crate) fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value.to_string(),
            None => self.attrs.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub(crate) fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|a| a.name != name);
        before != self.attrs.len()
    }
}

pub(crate) enum NodeKind {
    Root,
    Element(ElementData),
    Text(String),
}

pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: SmallVec<[NodeId; 4]>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: SmallVec::new(),
        }
    }

    pub(crate) fn as_element(&self) -> Option<&ElementData> {
        match &self.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }
}

/// Arena backing one document. All handles index into it by [`NodeId`].
pub(crate) struct Tree {
    pub(crate) nodes: SlotMap<NodeId, Node>,
    pub(crate) root: NodeId,
    pub(crate) mutations: Vec<Mutation>,
    next_listener: u64,
}

impl Tree {
    fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(NodeKind::Root));
        Self {
            nodes,
            root,
            mutations: Vec::new(),
            next_listener: 0,
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id).ok_or(DomError::NodeNotFound)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id).ok_or(DomError::NodeNotFound)
    }

    pub(crate) fn element(&self, id: NodeId) -> Result<&ElementData> {
        self.node(id)?.as_element().ok_or(DomError::NotAnElement)
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element(el) => Ok(el),
            _ => Err(DomError::NotAnElement),
        }
    }

    pub(crate) fn is_element(&self, id: NodeId) -> bool {
        self.nodes
            .get(id)
            .is_some_and(|n| matches!(n.kind, NodeKind::Element(_)))
    }

    pub(crate) fn create(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.insert(Node::new(kind))
    }

    pub(crate) fn next_listener_id(&mut self) -> u64 {
        self.next_listener += 1;
        self.next_listener
    }

    pub(crate) fn record(&mut self, mutation: Mutation) {
        tracing::trace!(?mutation, "dom mutation");
        self.mutations.push(mutation);
    }

    /// `true` when `ancestor` is `id` itself or one of its ancestors.
    pub(crate) fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.nodes.get(node).and_then(|n| n.parent);
        }
        false
    }

    pub(crate) fn is_connected(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id) && self.is_inclusive_ancestor(self.root, id)
    }

    /// Unlinks `id` from its parent. Returns the index it occupied.
    pub(crate) fn detach(&mut self, id: NodeId) -> Result<Option<usize>> {
        let parent = self.node(id)?.parent;
        let Some(parent) = parent else {
            return Ok(None);
        };
        let siblings = &mut self.node_mut(parent)?.children;
        let index = siblings.iter().position(|&c| c == id);
        if let Some(index) = index {
            siblings.remove(index);
        }
        self.node_mut(id)?.parent = None;
        Ok(index)
    }

    /// Moves `child` under `parent` at `index` (clamped; `None` appends).
    pub(crate) fn insert_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: Option<usize>,
    ) -> Result<()> {
        self.node(parent)?;
        self.node(child)?;
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        self.detach(child)?;
        let children = &mut self.node_mut(parent)?.children;
        let index = index.unwrap_or(children.len()).min(children.len());
        children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        self.record(Mutation::InsertChild {
            parent,
            id: child,
            index,
        });
        Ok(())
    }

    /// Unlinks every child of `id`. Text children are freed; elements stay
    /// allocated so existing handles keep working.
    pub(crate) fn detach_children(&mut self, id: NodeId) -> Result<()> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        for child in children {
            if self.is_element(child) {
                if let Some(node) = self.nodes.get_mut(child) {
                    node.parent = None;
                }
            } else {
                self.free(child);
            }
        }
        Ok(())
    }

    /// Deep copy of a subtree. Listeners are not copied.
    pub(crate) fn clone_subtree(&mut self, id: NodeId) -> Result<NodeId> {
        let kind = match &self.node(id)?.kind {
            NodeKind::Element(el) => NodeKind::Element(ElementData {
                tag: el.tag.clone(),
                attrs: el.attrs.clone(),
                listeners: Vec::new(),
            }),
            NodeKind::Text(text) => NodeKind::Text(text.clone()),
            NodeKind::Root => return Err(DomError::NotAnElement),
        };
        let children = self.node(id)?.children.clone();
        let copy = self.create(kind);
        for child in children {
            let child_copy = self.clone_subtree(child)?;
            self.node_mut(child_copy)?.parent = Some(copy);
            self.node_mut(copy)?.children.push(child_copy);
        }
        Ok(copy)
    }

    /// Releases a subtree from the arena.
    pub(crate) fn free(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(next) {
                stack.extend(node.children);
            }
        }
    }

    pub(crate) fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(node) = self.nodes.get(next) else {
                continue;
            };
            if let NodeKind::Text(text) = &node.kind {
                out.push_str(text);
            }
            stack.extend(node.children.iter().rev());
        }
        out
    }

    pub(crate) fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(id)
            .map(|n| {
                n.children
                    .iter()
                    .copied()
                    .filter(|&c| self.is_element(c))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn element_parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes
            .get(id)
            .and_then(|n| n.parent)
            .filter(|&p| self.is_element(p))
    }

    /// Element siblings of `id`, in order, excluding `id` itself.
    pub(crate) fn element_siblings(&self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.nodes.get(id).and_then(|n| n.parent) else {
            return Vec::new();
        };
        self.element_children(parent)
            .into_iter()
            .filter(|&c| c != id)
            .collect()
    }

    pub(crate) fn adjacent_element(&self, id: NodeId, forward: bool) -> Option<NodeId> {
        let parent = self.nodes.get(id)?.parent?;
        let siblings = &self.nodes.get(parent)?.children;
        let index = siblings.iter().position(|&c| c == id)?;
        if forward {
            siblings[index + 1..]
                .iter()
                .copied()
                .find(|&c| self.is_element(c))
        } else {
            siblings[..index]
                .iter()
                .rev()
                .copied()
                .find(|&c| self.is_element(c))
        }
    }

    /// Element descendants of `id` in document (pre-)order.
    pub(crate) fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(id) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(next) = stack.pop() {
            let Some(node) = self.nodes.get(next) else {
                continue;
            };
            if matches!(node.kind, NodeKind::Element(_)) {
                out.push(next);
            }
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

static NEXT_DOCUMENT: AtomicU64 = AtomicU64::new(1);

/// A single-threaded, in-memory document.
///
/// `Document` is a cheap handle; clones refer to the same tree.
#[derive(Clone)]
pub struct Document {
    id: u64,
    tree: Rc<RefCell<Tree>>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            id: NEXT_DOCUMENT.fetch_add(1, Ordering::Relaxed),
            tree: Rc::new(RefCell::new(Tree::new())),
        }
    }

    /// Builds a document whose top level holds the parsed fragment.
    pub fn parse(source: &str) -> Result<Self> {
        let doc = Self::new();
        doc.with_tree_mut(|tree| {
            let root = tree.root;
            html::parse_into(tree, root, source)?;
            tree.mutations.clear();
            Ok(())
        })?;
        Ok(doc)
    }

    /// Process-unique identifier of this document.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn create_element(&self, tag: &str) -> Element {
        let id = self.with_tree_mut(|tree| tree.create(NodeKind::Element(ElementData::new(tag))));
        Element::new(self.clone(), id)
    }

    /// Parses `source` into detached top-level elements (text is discarded).
    pub fn create_fragment(&self, source: &str) -> Result<Vec<Element>> {
        let holder = self.with_tree_mut(|tree| {
            let holder = tree.create(NodeKind::Element(ElementData::new("template")));
            html::parse_into(tree, holder, source).map(|_| holder)
        })?;
        let ids = self.with_tree_mut(|tree| {
            let ids = tree.element_children(holder);
            for &id in &ids {
                tree.detach(id)?;
            }
            tree.free(holder);
            Ok::<_, DomError>(ids)
        })?;
        Ok(ids.into_iter().map(|id| Element::new(self.clone(), id)).collect())
    }

    /// Top-level elements of the document.
    pub fn children(&self) -> Vec<Element> {
        let ids = self.with_tree(|tree| tree.element_children(tree.root));
        self.handles(ids)
    }

    pub fn append_child(&self, element: &Element) -> Result<()> {
        self.check_owner(element)?;
        self.with_tree_mut(|tree| {
            let root = tree.root;
            tree.insert_child(root, element.node_id(), None)
        })
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<Element>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    /// All matching elements in document order.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>> {
        let groups = selector::parse(selector)?;
        let ids = self.with_tree(|tree| {
            tree.descendants(tree.root)
                .into_iter()
                .filter(|&id| selector::matches(tree, id, &groups))
                .collect::<Vec<_>>()
        });
        Ok(self.handles(ids))
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<Element> {
        let found = self.with_tree(|tree| {
            tree.descendants(tree.root).into_iter().find(|&node| {
                tree.element(node)
                    .map(|el| el.attr("id") == Some(id))
                    .unwrap_or(false)
            })
        });
        found.map(|node| Element::new(self.clone(), node))
    }

    pub fn inner_html(&self) -> String {
        self.with_tree(|tree| html::serialize_children(tree, tree.root))
    }

    /// `true` while the element's node is still allocated in this document.
    pub fn contains(&self, element: &Element) -> bool {
        element.document().id == self.id
            && self.with_tree(|tree| tree.nodes.contains_key(element.node_id()))
    }

    /// Frees a detached element and its subtree. Handles to it become dangling
    /// and every later operation on them fails with [`DomError::NodeNotFound`].
    pub fn dispose(&self, element: &Element) -> Result<()> {
        self.check_owner(element)?;
        self.with_tree_mut(|tree| {
            let id = element.node_id();
            if tree.node(id)?.parent.is_some() {
                return Err(DomError::StillAttached);
            }
            tree.free(id);
            tree.record(Mutation::Dispose { id });
            Ok(())
        })
    }

    /// Takes every mutation recorded since the last call.
    pub fn drain_mutations(&self) -> Vec<Mutation> {
        self.with_tree_mut(|tree| std::mem::take(&mut tree.mutations))
    }

    pub(crate) fn check_owner(&self, element: &Element) -> Result<()> {
        if element.document().id == self.id {
            Ok(())
        } else {
            Err(DomError::WrongDocument)
        }
    }

    pub(crate) fn handles(&self, ids: Vec<NodeId>) -> Vec<Element> {
        ids.into_iter()
            .map(|id| Element::new(self.clone(), id))
            .collect()
    }

    pub(crate) fn with_tree<R>(&self, f: impl FnOnce(&Tree) -> R) -> R {
        f(&self.tree.borrow())
    }

    pub(crate) fn with_tree_mut<R>(&self, f: impl FnOnce(&mut Tree) -> R) -> R {
        f(&mut self.tree.borrow_mut())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Document {}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document").field("id", &self.id).finish()
    }
}
