// Copyright 2018 Evgeniy Reizner
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Mutation tracking.
//!
//! [`MutationDiff`] ingests a stream of mutation notifications and
//! maintains the minimum delta between the current tree and its state at
//! the moment tracking began. It never walks the tree to answer queries;
//! everything is derived from the notifications themselves.
//!
//! [`MutationDiff`]: struct.MutationDiff.html

use std::collections::HashMap;

use crate::boundary::{BoundaryRange, BoundarySide};
use crate::diff::property_cache::{NativeKey, PropertyCache};
use crate::diff::record::{Position, Sibling};
use crate::dom::Node;
use crate::error::{Error, Result};

use self::mutations::TreeMutations;

mod mutations;
mod promise;
mod property_cache;
mod record;
mod sibling_index;


bitflags! {
    /// Bit filter controlling what [`MutationDiff::diff`] emits.
    ///
    /// A valid filter selects at least one side (`ORIGINAL`, `MUTATED`)
    /// and at least one category (`DATA`, `ATTRIBUTE`, `CUSTOM`,
    /// `CHILDREN`).
    ///
    /// [`MutationDiff::diff`]: struct.MutationDiff.html#method.diff
    pub struct DiffFilter: u32 {
        /// Emit the original side of each entry.
        const ORIGINAL  = 0b0000_0001;
        /// Emit the mutated (current) side of each entry.
        const MUTATED   = 0b0000_0010;
        /// Include character-data changes.
        const DATA      = 0b0000_0100;
        /// Include attribute changes.
        const ATTRIBUTE = 0b0000_1000;
        /// Include custom-property changes.
        const CUSTOM    = 0b0001_0000;
        /// Include node-position changes.
        const CHILDREN  = 0b0010_0000;
        /// All property categories.
        const PROPERTY  = Self::DATA.bits | Self::ATTRIBUTE.bits | Self::CUSTOM.bits;
        /// Both sides, all categories.
        const ALL       = Self::ORIGINAL.bits | Self::MUTATED.bits
                        | Self::PROPERTY.bits | Self::CHILDREN.bits;
    }
}


/// A mutation notification record.
///
/// Mirrors the three record kinds a DOM `MutationObserver` reports, so an
/// observer-style stream can be piped straight into
/// [`MutationDiff::record`].
///
/// [`MutationDiff::record`]: struct.MutationDiff.html#method.record
#[derive(Clone, Debug)]
pub enum Mutation {
    /// An attribute of `target` was set, changed or removed.
    Attributes {
        /// The element whose attribute changed.
        target: Node,
        /// The attribute name.
        name: String,
        /// The attribute namespace, if any.
        namespace: Option<String>,
        /// The attribute value before the change; `None` if it was absent.
        old_value: Option<String>,
    },
    /// The character data of `target` changed.
    CharacterData {
        /// The text or comment node that changed.
        target: Node,
        /// The data before the change.
        old_value: String,
    },
    /// Children of `target` were removed and/or added.
    ChildList {
        /// The parent whose child list changed.
        target: Node,
        /// The removed children, in order.
        removed: Vec<Node>,
        /// The added children, in order.
        added: Vec<Node>,
        /// The point-in-time sibling just before the window.
        previous_sibling: Option<Node>,
        /// The point-in-time sibling just after the window.
        next_sibling: Option<Node>,
    },
}


/// A sibling as known to the tracker.
#[derive(Clone, PartialEq, Debug)]
pub enum SiblingRef {
    /// A concrete sibling node.
    Node(Node),
    /// No sibling: the position is at the edge of the parent.
    End,
    /// The sibling is not known (yet).
    Unknown,
}

impl SiblingRef {
    fn from_sibling(sibling: &Sibling) -> SiblingRef {
        match sibling {
            Sibling::Node(n) => SiblingRef::Node(n.clone()),
            Sibling::End => SiblingRef::End,
            Sibling::Unknown | Sibling::Pending(_) => SiblingRef::Unknown,
        }
    }
}

/// A node position as known to the tracker.
#[derive(Clone, PartialEq, Debug)]
pub struct NodePosition {
    /// The containing parent.
    pub parent: Node,
    /// The previous sibling.
    pub prev: SiblingRef,
    /// The next sibling.
    pub next: SiblingRef,
}

impl NodePosition {
    fn from_position(pos: &Position) -> NodePosition {
        NodePosition {
            parent: pos.parent.clone(),
            prev: SiblingRef::from_sibling(&pos.prev),
            next: SiblingRef::from_sibling(&pos.next),
        }
    }
}

/// Original and mutated values of a tracked property.
///
/// A side that the filter did not request, or that does not apply
/// (an absent attribute, a vanished custom value), is `None`.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct ValueDiff {
    /// The value at tracking start.
    pub original: Option<String>,
    /// The current value.
    pub mutated: Option<String>,
}

/// The position part of a node diff.
///
/// `original == None` means the node did not exist at tracking start;
/// `mutated == None` means it is presently removed.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct PositionDiff {
    /// The position at tracking start.
    pub original: Option<NodePosition>,
    /// The current position.
    pub mutated: Option<NodePosition>,
}

/// Everything that changed on one node.
#[derive(Clone, Debug, Default)]
pub struct NodeDiff {
    /// The character-data change, if any.
    pub data: Option<ValueDiff>,
    /// The changed attributes, by qualified name.
    pub attributes: HashMap<String, ValueDiff>,
    /// The changed custom properties, by key.
    pub custom: HashMap<String, ValueDiff>,
    /// The position change, if any.
    pub children: Option<PositionDiff>,
}


/// Tracks tree mutations and answers "what changed" queries.
///
/// The diff receives notification records, dispatches property changes to
/// an internal per-node cache and child-list changes to the tree-mutation
/// engine, and can report whether anything changed, the minimal
/// [`BoundaryRange`] bracketing all changes, a structured per-node diff,
/// and revert the tree to its tracking-start state.
///
/// It holds references to tree nodes, never ownership. When tracked nodes
/// leave the caller's scope for good, call [`clear`](#method.clear).
///
/// # Examples
///
/// ```
/// use domdiff::{Document, MutationDiff};
///
/// let doc = Document::new();
/// let mut root = doc.root();
/// let a = doc.create_element("a");
/// let b = doc.create_element("b");
/// root.append(&a);
/// root.append(&b);
///
/// let mut diff = MutationDiff::new();
///
/// // move `b` before `a`, reporting the change as an observer would
/// let mut b2 = b.clone();
/// b2.detach();
/// diff.children(&root, &[b.clone()], &[], Some(&a), None);
/// a.clone().insert_before(&b2);
/// diff.children(&root, &[], &[b.clone()], None, Some(&a));
///
/// assert!(diff.mutated(Some(&root)));
///
/// diff.revert(None).unwrap();
/// assert!(!diff.mutated(Some(&root)));
/// assert_eq!(root.first_child().unwrap(), a);
/// ```
///
/// [`BoundaryRange`]: struct.BoundaryRange.html
pub struct MutationDiff {
    props: PropertyCache,
    tree: TreeMutations,
}

impl MutationDiff {
    /// Constructs an empty diff.
    pub fn new() -> MutationDiff {
        MutationDiff {
            props: PropertyCache::new(),
            tree: TreeMutations::new(),
        }
    }

    /// Ingests one notification record.
    pub fn record(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::Attributes {
                target,
                name,
                namespace,
                old_value,
            } => {
                self.attribute(target, name, namespace.as_deref(), old_value.as_deref());
            }
            Mutation::CharacterData { target, old_value } => {
                self.data(target, old_value);
            }
            Mutation::ChildList {
                target,
                removed,
                added,
                previous_sibling,
                next_sibling,
            } => {
                self.children(
                    target,
                    removed,
                    added,
                    previous_sibling.as_ref(),
                    next_sibling.as_ref(),
                );
            }
        }
    }

    /// Records an attribute change. The current value is read from the
    /// live node.
    pub fn attribute(
        &mut self,
        node: &Node,
        name: &str,
        namespace: Option<&str>,
        old_value: Option<&str>,
    ) {
        let key = match namespace {
            Some(ns) => format!("{}:{}", ns, name),
            None => name.to_owned(),
        };
        let current = node.attribute(&key);
        self.props
            .mark_native(node, NativeKey::Attribute(key), current.as_deref(), old_value);
    }

    /// Records a character-data change. The current value is read from
    /// the live node.
    pub fn data(&mut self, node: &Node, old_value: &str) {
        let current = node.text().clone();
        self.props
            .mark_native(node, NativeKey::Data, Some(&current), Some(old_value));
    }

    /// Records a custom property change.
    ///
    /// Custom properties are opaque to the tracker: the caller supplies
    /// both the current and the old value here, and a callback to
    /// [`revert`](#method.revert) them.
    pub fn custom(&mut self, node: &Node, key: &str, current: Option<&str>, old_value: Option<&str>) {
        self.props.mark_custom(node, key, current, old_value);
    }

    /// Records one batched child-list change of `parent`.
    ///
    /// `prev` and `next` are the point-in-time siblings framing the
    /// removed/added window at the moment the change occurred.
    pub fn children(
        &mut self,
        parent: &Node,
        removed: &[Node],
        added: &[Node],
        prev: Option<&Node>,
        next: Option<&Node>,
    ) {
        self.tree.mutation(parent, removed, added, prev, next);
    }

    /// Returns `true` if anything under `root` differs from the
    /// tracking-start state. Without a root, returns `true` if anything
    /// differs at all.
    pub fn mutated(&self, root: Option<&Node>) -> bool {
        match root {
            None => self.props.dirty_count() > 0 || !self.tree.is_empty(),
            Some(root) => {
                self.props.dirty_nodes().any(|n| root.contains(n))
                    || self.tree.records().any(|link| {
                        let rec = link.borrow();
                        let original = rec
                            .original
                            .as_ref()
                            .map_or(false, |o| root.contains(&o.parent));
                        let mutated = rec
                            .mutated
                            .as_ref()
                            .map_or(false, |m| root.contains(&m.parent));
                        original || mutated
                    })
            }
        }
    }

    /// Computes the minimal range bracketing all differences under `root`.
    ///
    /// The range covers the current box of every dirty or floating node
    /// and the gap each floating node left between its fixed original
    /// siblings. Returns `Ok(None)` when nothing under `root` differs.
    ///
    /// # Errors
    ///
    /// [`Error::DisconnectedRange`] when no root is given and the tracked
    /// nodes span disjoint trees.
    ///
    /// [`Error::DisconnectedRange`]: enum.Error.html
    pub fn range(&self, root: Option<&Node>) -> Result<Option<BoundaryRange>> {
        let mut range: Option<BoundaryRange> = None;
        let mut tree_root: Option<Node> = None;

        fn merge(range: &mut Option<BoundaryRange>, add: BoundaryRange) {
            match range {
                Some(cur) => cur.extend(&add),
                None => *range = Some(add),
            }
        }

        fn admitted(
            node: &Node,
            root: Option<&Node>,
            tree_root: &mut Option<Node>,
        ) -> Result<bool> {
            match root {
                Some(root) => Ok(root.contains(node)),
                None => {
                    let found = node.tree_root();
                    match tree_root {
                        Some(expected) if *expected != found => Err(Error::DisconnectedRange),
                        _ => {
                            *tree_root = Some(found);
                            Ok(true)
                        }
                    }
                }
            }
        }

        // current boxes of dirty-property nodes
        for node in self.props.dirty_nodes() {
            if admitted(node, root, &mut tree_root)? {
                merge(&mut range, BoundaryRange::select_node(node));
            }
        }

        for link in self.tree.records() {
            let rec = link.borrow();

            // the current box of a floating node that is present
            if rec.mutated.is_some() && admitted(&rec.node, root, &mut tree_root)? {
                merge(&mut range, BoundaryRange::select_node(&rec.node));
            }

            // the gap the node left between its fixed original siblings
            if let Some(original) = &rec.original {
                let fixed = |s: &Sibling| match s {
                    Sibling::Node(n) if !self.tree.is_floating(n) => Some(n.clone()),
                    _ => None,
                };

                let mut prev_anchor = fixed(&original.prev);
                if let Some(p) = &prev_anchor {
                    if !admitted(p, root, &mut tree_root)? {
                        prev_anchor = None;
                    }
                }
                let mut next_anchor = fixed(&original.next);
                if let Some(x) = &next_anchor {
                    if !admitted(x, root, &mut tree_root)? {
                        next_anchor = None;
                    }
                }

                match (prev_anchor, next_anchor) {
                    (Some(p), Some(x)) => {
                        let mut gap = BoundaryRange::collapsed(&p, BoundarySide::After);
                        gap.set_end(&x, true, false);
                        merge(&mut range, gap);
                    }
                    (Some(p), None) => {
                        merge(&mut range, BoundaryRange::collapsed(&p, BoundarySide::After));
                    }
                    (None, Some(x)) => {
                        merge(&mut range, BoundaryRange::collapsed(&x, BoundarySide::Before));
                    }
                    (None, None) => {}
                }
            }
        }

        Ok(range)
    }

    /// Builds a per-node map of everything that changed, controlled by
    /// the bit `filter`.
    ///
    /// `custom_getter` supplies the current value of a custom property
    /// for the mutated side; without it, mutated custom values are `None`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidFilter`] when the filter selects no side or no
    /// category.
    ///
    /// [`Error::InvalidFilter`]: enum.Error.html
    pub fn diff(
        &self,
        filter: DiffFilter,
        custom_getter: Option<&dyn Fn(&Node, &str) -> Option<String>>,
    ) -> Result<HashMap<Node, NodeDiff>> {
        if !filter.intersects(DiffFilter::ORIGINAL | DiffFilter::MUTATED)
            || !filter.intersects(DiffFilter::PROPERTY | DiffFilter::CHILDREN)
        {
            return Err(Error::InvalidFilter);
        }

        let original = filter.contains(DiffFilter::ORIGINAL);
        let mutated = filter.contains(DiffFilter::MUTATED);
        let mut out: HashMap<Node, NodeDiff> = HashMap::new();

        if filter.intersects(DiffFilter::PROPERTY) {
            for (node, props) in self.props.iter() {
                for (key, entry) in &props.native {
                    if !entry.dirty {
                        continue;
                    }
                    match key {
                        NativeKey::Data if filter.contains(DiffFilter::DATA) => {
                            let diff = out.entry(node.clone()).or_default();
                            diff.data = Some(ValueDiff {
                                original: if original { entry.original.clone() } else { None },
                                mutated: if mutated { Some(node.text().clone()) } else { None },
                            });
                        }
                        NativeKey::Attribute(name) if filter.contains(DiffFilter::ATTRIBUTE) => {
                            let diff = out.entry(node.clone()).or_default();
                            diff.attributes.insert(
                                name.clone(),
                                ValueDiff {
                                    original: if original { entry.original.clone() } else { None },
                                    mutated: if mutated { node.attribute(name) } else { None },
                                },
                            );
                        }
                        _ => {}
                    }
                }

                if filter.contains(DiffFilter::CUSTOM) {
                    for (key, entry) in &props.custom {
                        if !entry.dirty {
                            continue;
                        }
                        let diff = out.entry(node.clone()).or_default();
                        diff.custom.insert(
                            key.clone(),
                            ValueDiff {
                                original: if original { entry.original.clone() } else { None },
                                mutated: if mutated {
                                    custom_getter.and_then(|get| get(node, key))
                                } else {
                                    None
                                },
                            },
                        );
                    }
                }
            }
        }

        if filter.contains(DiffFilter::CHILDREN) {
            for link in self.tree.records() {
                let rec = link.borrow();
                let diff = out.entry(rec.node.clone()).or_default();
                diff.children = Some(PositionDiff {
                    original: if original {
                        rec.original.as_ref().map(NodePosition::from_position)
                    } else {
                        None
                    },
                    mutated: if mutated {
                        rec.mutated.as_ref().map(NodePosition::from_position)
                    } else {
                        None
                    },
                });
            }
        }

        Ok(out)
    }

    /// Reverts the tree to its tracking-start state and drops all
    /// tracked state.
    ///
    /// Properties are restored first, then floating nodes are moved back.
    /// `custom_revert` restores custom properties; dirty custom entries
    /// are skipped without it.
    ///
    /// # Errors
    ///
    /// [`Error::InsufficientInformation`] when some groups of nodes could
    /// not be placed. All other groups are reverted regardless.
    ///
    /// [`Error::InsufficientInformation`]: enum.Error.html
    pub fn revert(&mut self, custom_revert: Option<&dyn Fn(&mut Node, &str, Option<&str>)>) -> Result<()> {
        self.props.revert(custom_revert);
        self.props.clear();

        let skipped = self.tree.revert();
        if skipped > 0 {
            Err(Error::InsufficientInformation(skipped))
        } else {
            Ok(())
        }
    }

    /// Drops all tracked state without touching the tree.
    pub fn clear(&mut self) {
        self.props.clear();
        self.tree.clear();
    }

    /// Reconciles the tracked state with the live tree: clean property
    /// entries are dropped and unknown mutated siblings are read from the
    /// live nodes, resolving all outstanding sibling walks.
    ///
    /// Call this when the notification stream is drained and the live
    /// tree matches the tracker's notion of the current state.
    pub fn synchronize(&mut self) {
        let dirty = self.props.synchronize();
        debug!("{} dirty properties remain after synchronize", dirty);
        self.tree.synchronize();
    }

    /// The number of tracked nodes: nodes with cached properties plus
    /// floating nodes.
    pub fn storage_size(&self) -> usize {
        self.props.len() + self.tree.len()
    }
}

impl Default for MutationDiff {
    fn default() -> Self {
        Self::new()
    }
}
