// Copyright 2018 Evgeniy Reizner
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;
use std::rc::Rc;

use crate::diff::record::{Mode, Position, PromiseId, RecordLink, Side, Sibling};
use crate::dom::Node;

/// A bidirectional sibling map for one view (original or mutated)
/// of the tracked records.
///
/// A record owns its position triple; the index answers the reverse
/// question: "which record claims `node` as its prev/next sibling?".
/// Only concrete `Sibling::Node` values are indexed.
pub struct SiblingIndex {
    mode: Mode,
    prev: HashMap<Node, RecordLink>,
    next: HashMap<Node, RecordLink>,
}

impl SiblingIndex {
    pub fn new(mode: Mode) -> SiblingIndex {
        SiblingIndex {
            mode,
            prev: HashMap::new(),
            next: HashMap::new(),
        }
    }

    fn map(&self, side: Side) -> &HashMap<Node, RecordLink> {
        match side {
            Side::Prev => &self.prev,
            Side::Next => &self.next,
        }
    }

    fn map_mut(&mut self, side: Side) -> &mut HashMap<Node, RecordLink> {
        match side {
            Side::Prev => &mut self.prev,
            Side::Next => &mut self.next,
        }
    }

    /// Returns the record that claims `sibling` on the given side,
    /// i.e. the record `r` with `r[mode][side] == sibling`.
    pub fn get(&self, side: Side, sibling: &Node) -> Option<RecordLink> {
        self.map(side).get(sibling).cloned()
    }

    /// Indexes both concrete sibling slots of the record.
    pub fn add(&mut self, link: &RecordLink) {
        for &side in &[Side::Prev, Side::Next] {
            let sibling = {
                let rec = link.borrow();
                match rec.pos(self.mode) {
                    Some(pos) => pos.get(side).as_node().cloned(),
                    None => None,
                }
            };

            if let Some(n) = sibling {
                self.map_mut(side).insert(n, link.clone());
            }
        }
    }

    /// Drops the index entries owned by the record.
    pub fn remove(&mut self, link: &RecordLink) {
        for &side in &[Side::Prev, Side::Next] {
            self.remove_side(link, side);
        }
    }

    /// Drops the index entry owned by the record on one side.
    pub fn remove_side(&mut self, link: &RecordLink, side: Side) {
        let sibling = {
            let rec = link.borrow();
            match rec.pos(self.mode) {
                Some(pos) => pos.get(side).as_node().cloned(),
                None => None,
            }
        };

        if let Some(n) = sibling {
            // The entry may have been overwritten by another record.
            let owned = self.map(side).get(&n).map_or(false, |l| Rc::ptr_eq(l, link));
            if owned {
                self.map_mut(side).remove(&n);
            }
        }
    }

    /// Replaces a sibling slot of the record and keeps the index in sync.
    ///
    /// If the record has no position triple in this view yet, it is lazily
    /// created with `parent_hint` as the parent and both slots unobserved.
    /// Returns the promise that was parked in the replaced slot, if any;
    /// the caller is responsible for resuming it with the new value.
    pub fn update(
        &mut self,
        link: &RecordLink,
        side: Side,
        new: Sibling,
        parent_hint: Option<&Node>,
    ) -> Option<PromiseId> {
        let (old, created) = {
            let mut rec = link.borrow_mut();
            let created = if rec.pos(self.mode).is_none() {
                let parent = match parent_hint {
                    Some(p) => p.clone(),
                    None => {
                        debug_assert!(false, "no position to update and no parent hint");
                        return None;
                    }
                };
                rec.set_pos(self.mode, Position::unknown(parent));
                true
            } else {
                false
            };

            let pos = rec.pos_mut(self.mode).unwrap();
            let old = pos.get(side).clone();
            pos.set(side, new.clone());
            (old, created)
        };

        let mut displaced = None;
        match old {
            Sibling::Node(ref n) => {
                debug_assert!(!created);
                let owned = self.map(side).get(n).map_or(false, |l| Rc::ptr_eq(l, link));
                if owned {
                    self.map_mut(side).remove(n);
                }
            }
            Sibling::Pending(id) => displaced = Some(id),
            _ => {}
        }

        if let Sibling::Node(n) = new {
            self.map_mut(side).insert(n, link.clone());
        }

        displaced
    }

    pub fn clear(&mut self) {
        self.prev.clear();
        self.next.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::record::new_record;
    use crate::dom::Document;

    #[test]
    fn update_reindexes() {
        let doc = Document::new();
        let mut root = doc.root();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let c = doc.create_element("c");
        root.append(&a);
        root.append(&b);
        root.append(&c);

        let mut index = SiblingIndex::new(Mode::Mutated);
        let link = new_record(b.clone(), None, Some(Position::unknown(root.clone())));

        index.update(&link, Side::Prev, Sibling::Node(a.clone()), None);
        assert!(index.get(Side::Prev, &a).is_some());

        index.update(&link, Side::Prev, Sibling::Node(c.clone()), None);
        assert!(index.get(Side::Prev, &a).is_none());
        assert!(index.get(Side::Prev, &c).is_some());

        index.remove(&link);
        assert!(index.get(Side::Prev, &c).is_none());
    }

    #[test]
    fn lazy_triple_creation() {
        let doc = Document::new();
        let mut root = doc.root();
        let a = doc.create_element("a");
        root.append(&a);

        let mut index = SiblingIndex::new(Mode::Mutated);
        let link = new_record(a.clone(), None, None);

        index.update(&link, Side::Next, Sibling::End, Some(&root));

        let rec = link.borrow();
        let pos = rec.mutated.as_ref().unwrap();
        assert_eq!(pos.parent, root);
        assert_eq!(pos.prev, Sibling::Unknown);
        assert_eq!(pos.next, Sibling::End);
    }
}
