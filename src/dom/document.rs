// Copyright 2018 Evgeniy Reizner
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::dom::iterators::{Children, Descendants};
use crate::dom::node::{new_node, Node};
use crate::dom::NodeType;

/// Container of [`Node`](struct.Node.html)s.
pub struct Document {
    root: Node,
}

impl Document {
    /// Constructs a new `Document`.
    pub fn new() -> Document {
        Document {
            root: new_node(NodeType::Root, "", ""),
        }
    }

    /// Constructs a new `Node` with the `Element` type.
    ///
    /// The constructed node is detached. Use [`Node::append`] and friends
    /// to add it to the tree.
    ///
    /// # Panics
    ///
    /// Panics if the tag name is empty.
    ///
    /// [`Node::append`]: struct.Node.html#method.append
    ///
    /// # Examples
    /// ```
    /// use domdiff::Document;
    ///
    /// let doc = Document::new();
    /// let div = doc.create_element("div");
    /// doc.root().append(&div);
    ///
    /// assert_eq!(*div.tag_name(), "div");
    /// ```
    pub fn create_element(&self, tag_name: &str) -> Node {
        assert!(!tag_name.is_empty(), "supplied tag name is empty");
        new_node(NodeType::Element, tag_name, "")
    }

    /// Constructs a new `Node` with the `Text` type.
    ///
    /// The constructed node is detached.
    pub fn create_text(&self, text: &str) -> Node {
        new_node(NodeType::Text, "", text)
    }

    /// Constructs a new `Node` with the `Comment` type.
    ///
    /// The constructed node is detached.
    pub fn create_comment(&self, text: &str) -> Node {
        new_node(NodeType::Comment, "", text)
    }

    /// Returns the root `Node`.
    pub fn root(&self) -> Node {
        self.root.clone()
    }

    /// Returns an iterator over the root's children.
    pub fn children(&self) -> Children {
        self.root.children()
    }

    /// Returns an iterator over descendants of the root.
    pub fn descendants(&self) -> Descendants {
        self.root.descendants()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
