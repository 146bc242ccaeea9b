use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::document::{Attribute, Document, ElementData, NodeId, NodeKind, Tree};
use crate::error::{DomError, Result};
use crate::events::{Event, Handler, Listener, ListenerId};
use crate::mutations::Mutation;
use crate::{html, selector, style};

/// Handle to one element of a [`Document`].
///
/// Handles are cheap to clone and compare by identity: two handles are equal
/// when they point at the same node of the same document.
#[derive(Clone)]
pub struct Element {
    doc: Document,
    id: NodeId,
}

impl Element {
    pub(crate) fn new(doc: Document, id: NodeId) -> Self {
        Self { doc, id }
    }

    pub fn node_id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// `false` once the element has been disposed.
    pub fn exists(&self) -> bool {
        self.doc.with_tree(|tree| tree.nodes.contains_key(self.id))
    }

    fn read<R>(&self, f: impl FnOnce(&Tree, &ElementData) -> R) -> Result<R> {
        self.doc.with_tree(|tree| {
            let el = tree.element(self.id)?;
            Ok(f(tree, el))
        })
    }

    fn write<R>(&self, f: impl FnOnce(&mut Tree) -> Result<R>) -> Result<R> {
        self.doc.with_tree_mut(|tree| {
            tree.element(self.id)?;
            f(tree)
        })
    }

    pub fn tag_name(&self) -> Result<String> {
        self.read(|_, el| el.tag.clone())
    }

    /// Short diagnostic label such as `li#first.item`.
    pub fn describe(&self) -> String {
        self.read(|_, el| {
            let mut out = el.tag.clone();
            if let Some(id) = el.attr("id") {
                out.push('#');
                out.push_str(id);
            }
            for class in el.attr("class").unwrap_or("").split_whitespace() {
                out.push('.');
                out.push_str(class);
            }
            out
        })
        .unwrap_or_else(|_| "<disposed>".to_string())
    }

    // Attributes

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.read(|_, el| el.attr(name).map(str::to_string))
            .ok()
            .flatten()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute(name).is_some()
    }

    pub fn attributes(&self) -> Vec<Attribute> {
        self.read(|_, el| el.attrs.to_vec()).unwrap_or_default()
    }

    pub fn set_attribute(&self, name: &str, value: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        self.write(|tree| {
            tree.element_mut(self.id)?.set_attr(&name, value);
            tree.record(Mutation::SetAttribute {
                id: self.id,
                name,
                value: value.to_string(),
            });
            Ok(())
        })
    }

    pub fn remove_attribute(&self, name: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        self.write(|tree| {
            if tree.element_mut(self.id)?.remove_attr(&name) {
                tree.record(Mutation::RemoveAttribute { id: self.id, name });
            }
            Ok(())
        })
    }

    /// Adds or removes a boolean attribute. Returns whether it is now present.
    pub fn toggle_attribute(&self, name: &str, force: Option<bool>) -> Result<bool> {
        let present = force.unwrap_or(!self.has_attribute(name));
        if present {
            if !self.has_attribute(name) {
                self.set_attribute(name, "")?;
            }
        } else {
            self.remove_attribute(name)?;
        }
        Ok(present)
    }

    // Classes

    pub fn class_list(&self) -> Vec<String> {
        self.get_attribute("class")
            .map(|value| value.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class_list().iter().any(|c| c == class)
    }

    fn write_classes(&self, classes: &[String]) -> Result<()> {
        if classes.is_empty() {
            self.remove_attribute("class")
        } else {
            self.set_attribute("class", &classes.join(" "))
        }
    }

    pub fn add_class(&self, class: &str) -> Result<()> {
        let mut classes = self.class_list();
        let mut changed = false;
        for token in class.split_whitespace() {
            if !classes.iter().any(|c| c == token) {
                classes.push(token.to_string());
                changed = true;
            }
        }
        if changed {
            self.write_classes(&classes)?;
        }
        Ok(())
    }

    pub fn remove_class(&self, class: &str) -> Result<()> {
        let mut classes = self.class_list();
        let before = classes.len();
        let tokens: Vec<&str> = class.split_whitespace().collect();
        classes.retain(|c| !tokens.contains(&c.as_str()));
        if classes.len() != before {
            self.write_classes(&classes)?;
        }
        Ok(())
    }

    /// Returns whether the class is present afterwards.
    pub fn toggle_class(&self, class: &str, force: Option<bool>) -> Result<bool> {
        let present = force.unwrap_or(!self.has_class(class));
        if present {
            self.add_class(class)?;
        } else {
            self.remove_class(class)?;
        }
        Ok(present)
    }

    // Inline style

    pub fn style(&self, property: &str) -> Option<String> {
        let property = style::property_name(property);
        style::parse_declarations(self.get_attribute("style").as_deref())
            .into_iter()
            .find(|(name, _)| *name == property)
            .map(|(_, value)| value)
    }

    /// Sets one inline style property; an empty value removes it.
    pub fn set_style(&self, property: &str, value: &str) -> Result<()> {
        let property = style::property_name(property);
        let mut decls = style::parse_declarations(self.get_attribute("style").as_deref());
        decls.retain(|(name, _)| *name != property);
        if !value.trim().is_empty() {
            decls.push((property, value.trim().to_string()));
        }
        if decls.is_empty() {
            self.remove_attribute("style")
        } else {
            self.set_attribute("style", &style::serialize(&decls))
        }
    }

    // Content

    pub fn text_content(&self) -> String {
        self.doc.with_tree(|tree| tree.text_content(self.id))
    }

    pub fn set_text_content(&self, text: &str) -> Result<()> {
        self.write(|tree| {
            tree.detach_children(self.id)?;
            if !text.is_empty() {
                let node = tree.create(NodeKind::Text(text.to_string()));
                tree.node_mut(self.id)?.children.push(node);
                tree.node_mut(node)?.parent = Some(self.id);
            }
            tree.record(Mutation::SetText {
                id: self.id,
                value: text.to_string(),
            });
            Ok(())
        })
    }

    pub fn inner_html(&self) -> String {
        self.doc
            .with_tree(|tree| html::serialize_children(tree, self.id))
    }

    pub fn set_inner_html(&self, source: &str) -> Result<()> {
        self.write(|tree| {
            tree.detach_children(self.id)?;
            html::parse_into(tree, self.id, source)?;
            tree.record(Mutation::SetInnerHtml {
                id: self.id,
                html: source.to_string(),
            });
            Ok(())
        })
    }

    pub fn outer_html(&self) -> String {
        self.doc.with_tree(|tree| html::serialize_node(tree, self.id))
    }

    // Traversal

    fn handle(&self, id: Option<NodeId>) -> Option<Element> {
        id.map(|id| Element::new(self.doc.clone(), id))
    }

    pub fn parent(&self) -> Option<Element> {
        let id = self.doc.with_tree(|tree| tree.element_parent(self.id));
        self.handle(id)
    }

    pub fn children(&self) -> Vec<Element> {
        let ids = self.doc.with_tree(|tree| tree.element_children(self.id));
        self.doc.handles(ids)
    }

    pub fn siblings(&self) -> Vec<Element> {
        let ids = self.doc.with_tree(|tree| tree.element_siblings(self.id));
        self.doc.handles(ids)
    }

    pub fn next_sibling(&self) -> Option<Element> {
        let id = self.doc.with_tree(|tree| tree.adjacent_element(self.id, true));
        self.handle(id)
    }

    pub fn previous_sibling(&self) -> Option<Element> {
        let id = self.doc.with_tree(|tree| tree.adjacent_element(self.id, false));
        self.handle(id)
    }

    pub fn first_child(&self) -> Option<Element> {
        let id = self
            .doc
            .with_tree(|tree| tree.element_children(self.id).first().copied());
        self.handle(id)
    }

    pub fn last_child(&self) -> Option<Element> {
        let id = self
            .doc
            .with_tree(|tree| tree.element_children(self.id).last().copied());
        self.handle(id)
    }

    pub fn matches(&self, selector: &str) -> Result<bool> {
        let list = selector::parse(selector)?;
        Ok(self
            .doc
            .with_tree(|tree| selector::matches(tree, self.id, &list)))
    }

    /// Nearest inclusive ancestor matching `selector`.
    pub fn closest(&self, selector: &str) -> Result<Option<Element>> {
        let list = selector::parse(selector)?;
        let id = self.doc.with_tree(|tree| {
            let mut current = tree.is_element(self.id).then_some(self.id);
            while let Some(id) = current {
                if selector::matches(tree, id, &list) {
                    return Some(id);
                }
                current = tree.element_parent(id);
            }
            None
        });
        Ok(self.handle(id))
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<Element>> {
        let list = selector::parse(selector)?;
        let id = self.doc.with_tree(|tree| {
            tree.descendants(self.id)
                .into_iter()
                .find(|&id| selector::matches(tree, id, &list))
        });
        Ok(self.handle(id))
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>> {
        let list = selector::parse(selector)?;
        let ids = self.doc.with_tree(|tree| {
            tree.descendants(self.id)
                .into_iter()
                .filter(|&id| selector::matches(tree, id, &list))
                .collect::<Vec<_>>()
        });
        Ok(self.doc.handles(ids))
    }

    // Structure

    pub fn is_connected(&self) -> bool {
        self.doc.with_tree(|tree| tree.is_connected(self.id))
    }

    pub fn append_child(&self, child: &Element) -> Result<()> {
        self.doc.check_owner(child)?;
        self.write(|tree| tree.insert_child(self.id, child.id, None))
    }

    pub fn prepend_child(&self, child: &Element) -> Result<()> {
        self.doc.check_owner(child)?;
        self.write(|tree| tree.insert_child(self.id, child.id, Some(0)))
    }

    /// Parent and position of `self`, or `None` when detached.
    fn slot(tree: &Tree, id: NodeId) -> Result<Option<(NodeId, usize)>> {
        let Some(parent) = tree.node(id)?.parent else {
            return Ok(None);
        };
        let index = tree
            .node(parent)?
            .children
            .iter()
            .position(|&c| c == id)
            .unwrap_or(0);
        Ok(Some((parent, index)))
    }

    /// Inserts `node` immediately before `self`. No-op when `self` is detached.
    pub fn before(&self, node: &Element) -> Result<()> {
        self.doc.check_owner(node)?;
        self.write(|tree| {
            if tree.is_inclusive_ancestor(node.id, self.id) {
                return Err(DomError::HierarchyRequest);
            }
            tree.detach(node.id)?;
            match Self::slot(tree, self.id)? {
                Some((parent, index)) => tree.insert_child(parent, node.id, Some(index)),
                None => Ok(()),
            }
        })
    }

    /// Inserts `node` immediately after `self`. No-op when `self` is detached.
    pub fn after(&self, node: &Element) -> Result<()> {
        self.doc.check_owner(node)?;
        self.write(|tree| {
            if tree.is_inclusive_ancestor(node.id, self.id) {
                return Err(DomError::HierarchyRequest);
            }
            tree.detach(node.id)?;
            match Self::slot(tree, self.id)? {
                Some((parent, index)) => tree.insert_child(parent, node.id, Some(index + 1)),
                None => Ok(()),
            }
        })
    }

    pub fn append_html(&self, source: &str) -> Result<()> {
        self.write(|tree| html::parse_at(tree, self.id, None, source).map(drop))
    }

    pub fn prepend_html(&self, source: &str) -> Result<()> {
        self.write(|tree| html::parse_at(tree, self.id, Some(0), source).map(drop))
    }

    pub fn before_html(&self, source: &str) -> Result<()> {
        self.write(|tree| match Self::slot(tree, self.id)? {
            Some((parent, index)) => html::parse_at(tree, parent, Some(index), source).map(drop),
            None => Ok(()),
        })
    }

    pub fn after_html(&self, source: &str) -> Result<()> {
        self.write(|tree| match Self::slot(tree, self.id)? {
            Some((parent, index)) => {
                html::parse_at(tree, parent, Some(index + 1), source).map(drop)
            }
            None => Ok(()),
        })
    }

    /// Detaches the element. The handle stays valid and can be reinserted.
    pub fn remove(&self) -> Result<()> {
        self.write(|tree| {
            if tree.detach(self.id)?.is_some() {
                tree.record(Mutation::Remove { id: self.id });
            }
            Ok(())
        })
    }

    /// Puts `replacement` where `self` is and detaches `self`.
    pub fn replace_with(&self, replacement: &Element) -> Result<()> {
        self.doc.check_owner(replacement)?;
        if replacement == self {
            return Ok(());
        }
        self.write(|tree| {
            if tree.is_inclusive_ancestor(replacement.id, self.id) {
                return Err(DomError::HierarchyRequest);
            }
            tree.detach(replacement.id)?;
            let Some((parent, index)) = Self::slot(tree, self.id)? else {
                return Ok(());
            };
            tree.detach(self.id)?;
            tree.insert_child(parent, replacement.id, Some(index))?;
            tree.record(Mutation::ReplaceWith {
                id: self.id,
                replacement: replacement.id,
            });
            Ok(())
        })
    }

    /// Copies the element (and with `deep`, its descendants). Listeners are
    /// never copied and the copy starts detached.
    pub fn clone_node(&self, deep: bool) -> Result<Element> {
        let id = self.write(|tree| {
            if deep {
                return tree.clone_subtree(self.id);
            }
            let el = tree.element(self.id)?;
            let copy = ElementData {
                tag: el.tag.clone(),
                attrs: el.attrs.clone(),
                listeners: Vec::new(),
            };
            Ok(tree.create(NodeKind::Element(copy)))
        })?;
        Ok(Element::new(self.doc.clone(), id))
    }

    // Events

    pub fn on(&self, event: &str, handler: impl Fn(&Event) + 'static) -> Result<ListenerId> {
        self.add_listener(event, Rc::new(handler))
    }

    pub fn add_listener(&self, event: &str, handler: Handler) -> Result<ListenerId> {
        self.write(|tree| {
            let id = ListenerId(tree.next_listener_id());
            tree.element_mut(self.id)?.listeners.push(Listener {
                id,
                name: event.to_string(),
                handler,
            });
            tree.record(Mutation::NewEventListener {
                id: self.id,
                name: event.to_string(),
            });
            Ok(id)
        })
    }

    /// Removes every listener for `event`. Returns how many were removed.
    pub fn off(&self, event: &str) -> Result<usize> {
        self.write(|tree| {
            let listeners = &mut tree.element_mut(self.id)?.listeners;
            let before = listeners.len();
            listeners.retain(|l| l.name != event);
            let removed = before - listeners.len();
            if removed > 0 {
                tree.record(Mutation::RemoveEventListener {
                    id: self.id,
                    name: event.to_string(),
                });
            }
            Ok(removed)
        })
    }

    pub fn remove_listener(&self, listener: ListenerId) -> Result<bool> {
        self.write(|tree| {
            let listeners = &mut tree.element_mut(self.id)?.listeners;
            let Some(pos) = listeners.iter().position(|l| l.id == listener) else {
                return Ok(false);
            };
            let removed = listeners.remove(pos);
            tree.record(Mutation::RemoveEventListener {
                id: self.id,
                name: removed.name,
            });
            Ok(true)
        })
    }

    pub fn dispatch(&self, event: &str) -> Result<usize> {
        self.dispatch_with(event, None)
    }

    /// Calls every listener registered for `event`, in registration order.
    /// Returns how many listeners ran.
    pub fn dispatch_with(&self, event: &str, detail: Option<String>) -> Result<usize> {
        let handlers: Vec<Handler> = self.read(|_, el| {
            el.listeners
                .iter()
                .filter(|l| l.name == event)
                .map(|l| Rc::clone(&l.handler))
                .collect()
        })?;
        let payload = Event {
            name: event.to_string(),
            target: self.clone(),
            detail,
        };
        for handler in &handlers {
            handler(&payload);
        }
        Ok(handlers.len())
    }

    // By-name access

    /// Invokes a native member by name. Used by dynamic dispatch for names
    /// that are not queued operations.
    pub fn call(&self, member: &str, args: &[&str]) -> Result<Option<String>> {
        let arity = |expected: usize| {
            if args.len() < expected {
                Err(DomError::Arity {
                    member: member.to_string(),
                    expected,
                    got: args.len(),
                })
            } else {
                Ok(())
            }
        };
        let flag = |b: bool| Some(b.to_string());

        match member {
            "tag_name" => self.tag_name().map(Some),
            "text_content" => Ok(Some(self.text_content())),
            "inner_html" => Ok(Some(self.inner_html())),
            "outer_html" => Ok(Some(self.outer_html())),
            "is_connected" => Ok(flag(self.is_connected())),
            "get_attribute" => {
                arity(1)?;
                Ok(self.get_attribute(args[0]))
            }
            "has_attribute" => {
                arity(1)?;
                Ok(flag(self.has_attribute(args[0])))
            }
            "has_class" => {
                arity(1)?;
                Ok(flag(self.has_class(args[0])))
            }
            "style" => {
                arity(1)?;
                Ok(self.style(args[0]))
            }
            "matches" => {
                arity(1)?;
                self.matches(args[0]).map(flag)
            }
            "set_text_content" => {
                arity(1)?;
                self.set_text_content(args[0]).map(|_| None)
            }
            "set_inner_html" => {
                arity(1)?;
                self.set_inner_html(args[0]).map(|_| None)
            }
            "dispatch" => {
                arity(1)?;
                self.dispatch(args[0]).map(|n| Some(n.to_string()))
            }
            _ => Err(DomError::UnknownMember(member.to_string())),
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.doc == other.doc
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.doc.id().hash(state);
        self.id.hash(state);
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Element({})", self.describe())
    }
}
