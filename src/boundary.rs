// Copyright 2018 Evgeniy Reizner
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::cmp::Ordering;

use crate::dom::Node;

/// The side of a node a [`Boundary`] is anchored to.
///
/// [`Boundary`]: struct.Boundary.html
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum BoundarySide {
    /// The point just before the node.
    Before,
    /// The point just after the node.
    After,
}

/// A node-anchored boundary point.
///
/// A boundary is a position in the tree expressed relative to a node:
/// just before it or just after it. An *inclusive* boundary additionally
/// covers the node itself, so `(node, Before, inclusive)` is an earlier
/// point than `(node, Before, exclusive)` when used as a range start.
#[derive(Clone, PartialEq, Debug)]
pub struct Boundary {
    node: Node,
    side: BoundarySide,
    inclusive: bool,
}

impl Boundary {
    /// Constructs a new boundary.
    pub fn new(node: &Node, side: BoundarySide, inclusive: bool) -> Boundary {
        Boundary {
            node: node.clone(),
            side,
            inclusive,
        }
    }

    /// Returns the anchor node.
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Returns the anchor side.
    pub fn side(&self) -> BoundarySide {
        self.side
    }

    /// Returns `true` if the boundary covers the anchor node itself.
    pub fn is_inclusive(&self) -> bool {
        self.inclusive
    }

    // Document-order rank of the boundary relative to its own node.
    fn rank(&self) -> u8 {
        match (self.side, self.inclusive) {
            (BoundarySide::Before, true) => 0,
            (BoundarySide::Before, false) => 1,
            (BoundarySide::After, false) => 2,
            (BoundarySide::After, true) => 3,
        }
    }
}

// The child-index path from the tree root down to the node.
fn node_path(node: &Node) -> Vec<usize> {
    let mut path: Vec<usize> = node.ancestors().map(|n| n.child_index()).collect();
    path.reverse();
    path
}

// Compares two boundaries in document order.
//
// Both boundaries must be anchored in the same tree. A boundary anchored
// to an ancestor brackets the descendant's boundaries from both sides.
fn cmp(a: &Boundary, b: &Boundary) -> Ordering {
    if a.node == b.node {
        return a.rank().cmp(&b.rank());
    }

    let pa = node_path(&a.node);
    let pb = node_path(&b.node);

    let min = pa.len().min(pb.len());
    for i in 0..min {
        match pa[i].cmp(&pb[i]) {
            Ordering::Equal => {}
            ord => return ord,
        }
    }

    if pa.len() < pb.len() {
        // `a` is anchored to an ancestor of `b`'s anchor.
        match a.side {
            BoundarySide::Before => Ordering::Less,
            BoundarySide::After => Ordering::Greater,
        }
    } else {
        match b.side {
            BoundarySide::Before => Ordering::Greater,
            BoundarySide::After => Ordering::Less,
        }
    }
}


/// A pair of node-anchored boundaries used to report the bounding range
/// of mutations.
///
/// The range is an inert value type: it holds node handles, but never
/// mutates the tree. Use [`extend`](#method.extend) to compute the union
/// of two ranges.
#[derive(Clone, PartialEq, Debug)]
pub struct BoundaryRange {
    start: Boundary,
    end: Boundary,
}

impl BoundaryRange {
    /// Constructs a range that selects the whole `node`.
    pub fn select_node(node: &Node) -> BoundaryRange {
        BoundaryRange {
            start: Boundary::new(node, BoundarySide::Before, true),
            end: Boundary::new(node, BoundarySide::After, true),
        }
    }

    /// Constructs a range collapsed to one side of a node.
    pub fn collapsed(node: &Node, side: BoundarySide) -> BoundaryRange {
        let b = Boundary::new(node, side, false);
        BoundaryRange {
            start: b.clone(),
            end: b,
        }
    }

    /// Returns the start boundary.
    pub fn start(&self) -> &Boundary {
        &self.start
    }

    /// Returns the end boundary.
    pub fn end(&self) -> &Boundary {
        &self.end
    }

    /// Returns `true` if the range is collapsed to a single point.
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Sets the start boundary.
    ///
    /// The boundary is anchored after `node` when `after` is `true`,
    /// before it otherwise. When `collapse` is set the end boundary is
    /// moved to the same point.
    pub fn set_start(&mut self, node: &Node, after: bool, collapse: bool) {
        let side = if after { BoundarySide::After } else { BoundarySide::Before };
        self.start = Boundary::new(node, side, false);
        if collapse {
            self.end = self.start.clone();
        }
    }

    /// Sets the end boundary.
    ///
    /// The boundary is anchored before `node` when `before` is `true`,
    /// after it otherwise. When `collapse` is set the start boundary is
    /// moved to the same point.
    pub fn set_end(&mut self, node: &Node, before: bool, collapse: bool) {
        let side = if before { BoundarySide::Before } else { BoundarySide::After };
        self.end = Boundary::new(node, side, false);
        if collapse {
            self.start = self.end.clone();
        }
    }

    /// Extends this range to the union of `self` and `other`.
    ///
    /// Both ranges must be anchored in the same tree.
    pub fn extend(&mut self, other: &BoundaryRange) {
        if cmp(&other.start, &self.start) == Ordering::Less {
            self.start = other.start.clone();
        }
        if cmp(&other.end, &self.end) == Ordering::Greater {
            self.end = other.end.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn extend_siblings() {
        let doc = Document::new();
        let mut root = doc.root();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        root.append(&a);
        root.append(&b);

        let mut r = BoundaryRange::select_node(&b);
        r.extend(&BoundaryRange::select_node(&a));

        assert_eq!(r.start().node(), &a);
        assert_eq!(r.end().node(), &b);
    }

    #[test]
    fn ancestor_brackets_descendant() {
        let doc = Document::new();
        let mut root = doc.root();
        let mut a = doc.create_element("a");
        let b = doc.create_element("b");
        root.append(&a);
        a.append(&b);

        let mut r = BoundaryRange::select_node(&b);
        r.extend(&BoundaryRange::select_node(&a));

        assert_eq!(r, BoundaryRange::select_node(&a));
    }

    #[test]
    fn collapsed_range() {
        let doc = Document::new();
        let mut root = doc.root();
        let a = doc.create_element("a");
        root.append(&a);

        let r = BoundaryRange::collapsed(&a, BoundarySide::After);
        assert!(r.is_collapsed());
    }
}
