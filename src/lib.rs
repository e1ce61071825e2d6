// Copyright 2018 Evgeniy Reizner
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/*!

*domdiff* tracks mutations of a DOM-like ordered tree and maintains, at
all times, the minimum delta between the current tree and its state at
the moment tracking began.

## Purpose

Mutation notifications, as reported by a DOM `MutationObserver`, arrive
batched and out of order with respect to the intermediate tree states:
for each batch we are told only the point-in-time previous/next siblings
and the added/removed child lists. The intermediate states are not
observable.

*domdiff* reconstructs, incrementally and without ever walking the full
tree, each moved node's original position, and detects when a node's
final position has returned to its original one so it can be dropped
from the delta. From this delta it answers:

- is the tree different from the original? ([`MutationDiff::mutated`])
- what is the minimal range bracketing all differences?
  ([`MutationDiff::range`])
- what exactly changed, per node? ([`MutationDiff::diff`])
- put everything back. ([`MutationDiff::revert`])

## Benefits

- Queries never traverse the tree; everything is derived from the
  notifications themselves.
- A node that ends up back at its original position drops out of the
  delta, so a rotation of a child list through removes and re-inserts
  costs nothing.
- Attribute, character-data and custom-property changes are tracked with
  their original values, and turn clean again when restored by further
  mutations.

## Limitations

- The caller must feed child-list notifications in the order they
  occurred, with point-in-time siblings, like a `MutationObserver`
  reports them.
- Everything is single-threaded; the types are deliberately not `Send`.
- The bundled [`Document`]/[`Node`] tree is minimal: elements with
  string attributes, text and comment nodes. It exists to carry the
  tracking machinery, not to be a full DOM.

[`MutationDiff::mutated`]: struct.MutationDiff.html#method.mutated
[`MutationDiff::range`]: struct.MutationDiff.html#method.range
[`MutationDiff::diff`]: struct.MutationDiff.html#method.diff
[`MutationDiff::revert`]: struct.MutationDiff.html#method.revert
[`Document`]: struct.Document.html
[`Node`]: struct.Node.html

*/

#![doc(html_root_url = "https://docs.rs/domdiff/0.4.0")]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

#[macro_use] extern crate bitflags;
#[macro_use] extern crate log;


mod boundary;
mod diff;
mod dom;
mod error;


pub use crate::boundary::{Boundary, BoundaryRange, BoundarySide};
pub use crate::diff::{
    DiffFilter,
    Mutation,
    MutationDiff,
    NodeDiff,
    NodePosition,
    PositionDiff,
    SiblingRef,
    ValueDiff,
};
pub use crate::dom::{
    Ancestors,
    Attribute,
    Attributes,
    Children,
    Descendants,
    Document,
    FollowingSiblings,
    Node,
    NodeEdge,
    NodeType,
    PrecedingSiblings,
    Traverse,
};
pub use crate::error::{Error, Result};
