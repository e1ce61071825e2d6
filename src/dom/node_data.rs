// Copyright 2018 Evgeniy Reizner
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::dom::{Attributes, NodeType};

pub type Link = Rc<RefCell<NodeData>>;
pub type WeakLink = Weak<RefCell<NodeData>>;

pub struct NodeData {
    // `parent`, `last_child` and `prev_sibling` are weak to keep
    // the strong ownership graph acyclic.
    pub parent: Option<WeakLink>,
    pub first_child: Option<Link>,
    pub last_child: Option<WeakLink>,
    pub prev_sibling: Option<WeakLink>,
    pub next_sibling: Option<Link>,

    pub node_type: NodeType,
    pub tag_name: String,
    pub attributes: Attributes,
    pub text: String,
}

impl NodeData {
    /// Detaches a node from its parent and siblings. Children are not affected.
    pub fn detach(&mut self) {
        let parent_weak = self.parent.take();
        let prev_weak = self.prev_sibling.take();
        let next_strong = self.next_sibling.take();

        let prev_opt = prev_weak.as_ref().and_then(|weak| weak.upgrade());

        if let Some(next) = next_strong.as_ref() {
            next.borrow_mut().prev_sibling = prev_weak;
        } else if let Some(parent) = parent_weak.as_ref() {
            if let Some(parent) = parent.upgrade() {
                parent.borrow_mut().last_child = prev_weak;
            }
        }

        if let Some(prev) = prev_opt {
            prev.borrow_mut().next_sibling = next_strong;
        } else if let Some(parent) = parent_weak.as_ref() {
            if let Some(parent) = parent.upgrade() {
                parent.borrow_mut().first_child = next_strong;
            }
        }
    }
}
