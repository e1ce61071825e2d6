// Copyright 2018 Evgeniy Reizner
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::dom::iterators::{
    Ancestors,
    Children,
    Descendants,
    FollowingSiblings,
    NodeEdge,
    PrecedingSiblings,
    Traverse,
};
use crate::dom::node_data::{Link, NodeData};
use crate::dom::{Attribute, Attributes, NodeType};

/// Representation of a DOM node.
///
/// It's designed as a classical DOM node. It has links to a parent node,
/// first child, last child, previous sibling and next sibling,
/// so node manipulations are very fast.
///
/// Node consists of:
///
/// - The [`NodeType`], which indicates its type. It can't be changed.
/// - A tag name, used only by element nodes.
/// - [`Attributes`] - list of [`Attribute`]s, used only by element nodes.
/// - Text data, used by non-element nodes. Empty by default.
///
/// Cloning a `Node` produces a new handle to the same node, not a copy.
/// Equality and hashing are by node identity, so nodes can be used as
/// keys in hash maps.
///
/// [`Attribute`]: struct.Attribute.html
/// [`Attributes`]: struct.Attributes.html
/// [`NodeType`]: enum.NodeType.html
#[derive(Clone)]
pub struct Node(pub(crate) Link);

/// Compares node identities, not data.
impl PartialEq for Node {
    fn eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

/// Hashes the node identity, not data.
impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.node_type() {
            NodeType::Root => write!(f, "Root()"),
            NodeType::Element => write!(f, "Element({})", &*self.tag_name()),
            NodeType::Text => write!(f, "Text({:?})", &*self.text()),
            NodeType::Comment => write!(f, "Comment({:?})", &*self.text()),
        }
    }
}

impl Node {
    /// Returns `true` if both handles point to the same node.
    ///
    /// Same as `==`, but doesn't require references.
    #[inline]
    pub fn same_node(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Returns node's type.
    ///
    /// You can't change the type of the node. Only create a new one.
    pub fn node_type(&self) -> NodeType {
        self.0.borrow().node_type
    }

    /// Returns `true` if the current node is a Root node.
    pub fn is_root(&self) -> bool {
        self.node_type() == NodeType::Root
    }

    /// Returns `true` if the current node is an Element node.
    pub fn is_element(&self) -> bool {
        self.node_type() == NodeType::Element
    }

    /// Returns `true` if the current node is a Text node.
    pub fn is_text(&self) -> bool {
        self.node_type() == NodeType::Text
    }

    /// Returns `true` if the current node is a Comment node.
    pub fn is_comment(&self) -> bool {
        self.node_type() == NodeType::Comment
    }

    /// Returns `true` if the node holds character data.
    ///
    /// Text and comment nodes do, elements and the root don't.
    pub fn is_character_data(&self) -> bool {
        match self.node_type() {
            NodeType::Text | NodeType::Comment => true,
            _ => false,
        }
    }

    /// Returns a parent node, unless this node is detached or the root.
    pub fn parent(&self) -> Option<Node> {
        self.0.borrow().parent.as_ref().and_then(|w| w.upgrade()).map(Node)
    }

    /// Returns `true` if the node has a parent node.
    ///
    /// This method ignores the root node.
    pub fn has_parent(&self) -> bool {
        match self.parent() {
            Some(node) => !node.is_root(),
            None => false,
        }
    }

    /// Returns a first child of this node, unless it has no children.
    pub fn first_child(&self) -> Option<Node> {
        self.0.borrow().first_child.clone().map(Node)
    }

    /// Returns a last child of this node, unless it has no children.
    pub fn last_child(&self) -> Option<Node> {
        self.0.borrow().last_child.as_ref().and_then(|w| w.upgrade()).map(Node)
    }

    /// Returns a previous sibling of this node, unless it is a first child.
    pub fn previous_sibling(&self) -> Option<Node> {
        self.0.borrow().prev_sibling.as_ref().and_then(|w| w.upgrade()).map(Node)
    }

    /// Returns a next sibling of this node, unless it is a last child.
    pub fn next_sibling(&self) -> Option<Node> {
        self.0.borrow().next_sibling.clone().map(Node)
    }

    /// Returns `true` if the node has children nodes.
    pub fn has_children(&self) -> bool {
        self.first_child().is_some()
    }

    /// Returns an iterator over this node and its ancestors.
    ///
    /// Includes the current node.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors(Some(self.clone()))
    }

    /// Returns an iterator over this node and the siblings before it.
    ///
    /// Includes the current node.
    pub fn preceding_siblings(&self) -> PrecedingSiblings {
        PrecedingSiblings(Some(self.clone()))
    }

    /// Returns an iterator over this node and the siblings after it.
    ///
    /// Includes the current node.
    pub fn following_siblings(&self) -> FollowingSiblings {
        FollowingSiblings(Some(self.clone()))
    }

    /// Returns an iterator over this node's children.
    pub fn children(&self) -> Children {
        Children(self.first_child())
    }

    /// Returns an iterator over this node and its descendants, in tree order.
    pub fn descendants(&self) -> Descendants {
        Descendants(self.traverse())
    }

    /// Returns an iterator over the `NodeEdge`s of this node and its
    /// descendants, in tree order.
    ///
    /// A more low-level alternative to [`descendants()`](#method.descendants).
    pub fn traverse(&self) -> Traverse {
        Traverse {
            root: self.clone(),
            next: Some(NodeEdge::Start(self.clone())),
        }
    }

    /// Returns the root of the tree this node belongs to.
    ///
    /// If the node is detached - returns the node itself.
    pub fn tree_root(&self) -> Node {
        // `ancestors()` always yields at least the node itself.
        self.ancestors().last().unwrap()
    }

    /// Returns the position of this node in its parent's child list.
    ///
    /// A detached node or a first child has index 0.
    pub fn child_index(&self) -> usize {
        self.preceding_siblings().count() - 1
    }

    /// Returns `true` if `other` is this node or is contained in its subtree.
    pub fn contains(&self, other: &Node) -> bool {
        other.ancestors().any(|n| n.same_node(self))
    }

    /// Detaches a node from its parent and siblings. Children are not affected.
    pub fn detach(&mut self) {
        self.0.borrow_mut().detach();
    }

    /// Appends a new child to this node, after existing children.
    ///
    /// # Panics
    ///
    /// - If the node and the `new_child` are the same node.
    /// - If the node, the new child, or one of their adjoining nodes
    ///   is currently borrowed.
    pub fn append(&mut self, new_child: &Node) {
        assert!(!self.same_node(new_child), "a node cannot be appended to itself");

        let mut nc = new_child.clone();
        nc.detach();

        let last = {
            let mut this = self.0.borrow_mut();
            let mut child = nc.0.borrow_mut();
            child.parent = Some(Rc::downgrade(&self.0));
            let last = this.last_child.take().and_then(|w| w.upgrade());
            if let Some(ref last) = last {
                child.prev_sibling = Some(Rc::downgrade(last));
            } else {
                debug_assert!(this.first_child.is_none());
                this.first_child = Some(nc.0.clone());
            }
            this.last_child = Some(Rc::downgrade(&nc.0));
            last
        };

        if let Some(last) = last {
            let mut last = last.borrow_mut();
            debug_assert!(last.next_sibling.is_none());
            last.next_sibling = Some(nc.0.clone());
        }
    }

    /// Prepends a new child to this node, before existing children.
    ///
    /// # Panics
    ///
    /// - If the node and the `new_child` are the same node.
    /// - If the node, the new child, or one of their adjoining nodes
    ///   is currently borrowed.
    pub fn prepend(&mut self, new_child: &Node) {
        assert!(!self.same_node(new_child), "a node cannot be prepended to itself");

        let mut nc = new_child.clone();
        nc.detach();

        let first = {
            let mut this = self.0.borrow_mut();
            let mut child = nc.0.borrow_mut();
            child.parent = Some(Rc::downgrade(&self.0));
            let first = this.first_child.take();
            if let Some(ref first) = first {
                child.next_sibling = Some(first.clone());
            } else {
                this.last_child = Some(Rc::downgrade(&nc.0));
            }
            this.first_child = Some(nc.0.clone());
            first
        };

        if let Some(first) = first {
            let mut first = first.borrow_mut();
            debug_assert!(first.prev_sibling.is_none());
            first.prev_sibling = Some(Rc::downgrade(&nc.0));
        }
    }

    /// Inserts a new sibling after this node.
    ///
    /// # Panics
    ///
    /// - If the node and the `new_sibling` are the same node.
    /// - If the node, the new sibling, or one of their adjoining nodes
    ///   is currently borrowed.
    pub fn insert_after(&mut self, new_sibling: &Node) {
        assert!(!self.same_node(new_sibling), "a node cannot be inserted after itself");

        let mut ns = new_sibling.clone();
        ns.detach();

        let next = {
            let mut this = self.0.borrow_mut();
            let mut sib = ns.0.borrow_mut();
            sib.parent = this.parent.clone();
            sib.prev_sibling = Some(Rc::downgrade(&self.0));
            let next = this.next_sibling.take();
            if let Some(ref next) = next {
                sib.next_sibling = Some(next.clone());
            }
            this.next_sibling = Some(ns.0.clone());
            next
        };

        match next {
            Some(next) => {
                next.borrow_mut().prev_sibling = Some(Rc::downgrade(&ns.0));
            }
            None => {
                // the node was the last child
                let parent = self.0.borrow().parent.as_ref().and_then(|w| w.upgrade());
                if let Some(parent) = parent {
                    parent.borrow_mut().last_child = Some(Rc::downgrade(&ns.0));
                }
            }
        }
    }

    /// Inserts a new sibling before this node.
    ///
    /// # Panics
    ///
    /// - If the node and the `new_sibling` are the same node.
    /// - If the node, the new sibling, or one of their adjoining nodes
    ///   is currently borrowed.
    pub fn insert_before(&mut self, new_sibling: &Node) {
        assert!(!self.same_node(new_sibling), "a node cannot be inserted before itself");

        let mut ns = new_sibling.clone();
        ns.detach();

        let prev = {
            let mut this = self.0.borrow_mut();
            let mut sib = ns.0.borrow_mut();
            sib.parent = this.parent.clone();
            sib.next_sibling = Some(self.0.clone());
            let prev = this.prev_sibling.take().and_then(|w| w.upgrade());
            if let Some(ref prev) = prev {
                sib.prev_sibling = Some(Rc::downgrade(prev));
            }
            this.prev_sibling = Some(Rc::downgrade(&ns.0));
            prev
        };

        match prev {
            Some(prev) => {
                prev.borrow_mut().next_sibling = Some(ns.0.clone());
            }
            None => {
                // the node was the first child
                let parent = self.0.borrow().parent.as_ref().and_then(|w| w.upgrade());
                if let Some(parent) = parent {
                    parent.borrow_mut().first_child = Some(ns.0.clone());
                }
            }
        }
    }

    /// Returns a tag name of the element node.
    ///
    /// Non-element nodes have an empty tag name.
    pub fn tag_name(&self) -> Ref<String> {
        Ref::map(self.0.borrow(), |d| &d.tag_name)
    }

    /// Returns `true` if the node has the same tag name as supplied.
    pub fn is_tag_name(&self, tag_name: &str) -> bool {
        *self.tag_name() == tag_name
    }

    /// Returns a text data of the node.
    ///
    /// Nodes with the `Element` type can't contain text data.
    pub fn text(&self) -> Ref<String> {
        Ref::map(self.0.borrow(), |d| &d.text)
    }

    /// Sets a text data to the node.
    ///
    /// # Panics
    ///
    /// Panics if the node is currently borrowed.
    pub fn set_text(&mut self, text: &str) {
        debug_assert_ne!(self.node_type(), NodeType::Element);
        self.0.borrow_mut().text = text.to_owned();
    }

    /// Returns a reference to the `Attributes` of the current node.
    pub fn attributes(&self) -> Ref<Attributes> {
        Ref::map(self.0.borrow(), |d| &d.attributes)
    }

    /// Returns a mutable reference to the `Attributes` of the current node.
    ///
    /// # Panics
    ///
    /// Panics if the node is currently borrowed.
    pub fn attributes_mut(&mut self) -> RefMut<Attributes> {
        RefMut::map(self.0.borrow_mut(), |d| &mut d.attributes)
    }

    /// Returns an attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes().get_value(name).map(str::to_owned)
    }

    /// Returns `true` if the node has an attribute with such a name.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes().contains(name)
    }

    /// Inserts a new attribute. An attribute with the same name is overwritten.
    ///
    /// # Panics
    ///
    /// Panics if the node is currently borrowed.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        debug_assert_eq!(self.node_type(), NodeType::Element);
        self.attributes_mut().insert(Attribute::new(name, value));
    }

    /// Removes an attribute from the node.
    ///
    /// # Panics
    ///
    /// Panics if the node is currently borrowed.
    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes_mut().remove(name);
    }
}

pub(crate) fn new_node(
    node_type: NodeType,
    tag_name: &str,
    text: &str,
) -> Node {
    Node(Rc::new(RefCell::new(NodeData {
        parent: None,
        first_child: None,
        last_child: None,
        prev_sibling: None,
        next_sibling: None,
        node_type,
        tag_name: tag_name.to_owned(),
        attributes: Attributes::new(),
        text: text.to_owned(),
    })))
}
