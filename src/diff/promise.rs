// Copyright 2018 Evgeniy Reizner
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use slab::Slab;

use crate::diff::record::{PromiseId, RecordLink, Side};

/// A deferred computation of an original sibling.
///
/// The promise represents "the original sibling of `origin` in
/// `direction`, pending discovery of intermediate siblings". It is not a
/// task: while suspended it is parked in exactly two slots - the origin's
/// original-side slot and the `pointer` record's mutated-side slot - and
/// resolution is a synchronous walk performed by the engine when a
/// mutation or a synchronize call reveals the parked slot.
pub struct SiblingPromise {
    pub origin: RecordLink,
    pub direction: Side,
    /// The record whose mutated-side slot currently parks this promise.
    pub pointer: Option<RecordLink>,
}

/// Slab-backed storage of live promises.
///
/// Promises are addressed by [`PromiseId`] and live until they are
/// resolved, abandoned or the whole arena is cleared.
///
/// [`PromiseId`]: struct.PromiseId.html
pub struct PromiseArena {
    slab: Slab<SiblingPromise>,
}

impl PromiseArena {
    pub fn new() -> PromiseArena {
        PromiseArena { slab: Slab::new() }
    }

    pub fn insert(&mut self, promise: SiblingPromise) -> PromiseId {
        PromiseId(self.slab.insert(promise))
    }

    pub fn get(&self, id: PromiseId) -> &SiblingPromise {
        &self.slab[id.0]
    }

    pub fn get_mut(&mut self, id: PromiseId) -> &mut SiblingPromise {
        &mut self.slab[id.0]
    }

    pub fn remove(&mut self, id: PromiseId) -> SiblingPromise {
        self.slab.remove(id.0)
    }

    pub fn contains(&self, id: PromiseId) -> bool {
        self.slab.contains(id.0)
    }

    pub fn ids(&self) -> Vec<PromiseId> {
        self.slab.iter().map(|(key, _)| PromiseId(key)).collect()
    }

    pub fn clear(&mut self) {
        self.slab.clear();
    }
}
