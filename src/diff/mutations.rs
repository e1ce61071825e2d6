// Copyright 2018 Evgeniy Reizner
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::diff::promise::{PromiseArena, SiblingPromise};
use crate::diff::record::{
    new_record,
    Mode,
    Position,
    PromiseId,
    RecordLink,
    Side,
    Sibling,
};
use crate::diff::sibling_index::SiblingIndex;
use crate::dom::Node;

/// The state a backward-looking promise resolves against while the
/// window is scanned left to right.
#[derive(Clone)]
enum BackState {
    /// A concrete anchor: the most recent fixed element, or the edge
    /// of the parent.
    Value(Sibling),
    /// The window starts at a floating node; continue the walk from it
    /// through the mutated graph.
    Walk(Node),
}

/// A maximal run of floating nodes sharing an original parent, chained
/// through each other as original siblings.
struct MoveGroup {
    nodes: Vec<Node>,
    parent: Node,
    prev: Sibling,
    next: Sibling,
}

/// The mutation-tracking engine.
///
/// Ingests batched child-list windows and maintains the floating set,
/// the two sibling graphs and the pending promises so that the delta
/// against the tracking-start state stays minimal.
pub struct TreeMutations {
    floating: HashMap<Node, RecordLink>,
    original: SiblingIndex,
    mutated: SiblingIndex,
    promises: PromiseArena,
}

fn parked_promise(link: &RecordLink, side: Side) -> Option<PromiseId> {
    let rec = link.borrow();
    match rec.mutated.as_ref().map(|p| p.get(side).clone()) {
        Some(Sibling::Pending(id)) => Some(id),
        _ => None,
    }
}

impl TreeMutations {
    pub fn new() -> TreeMutations {
        TreeMutations {
            floating: HashMap::new(),
            original: SiblingIndex::new(Mode::Original),
            mutated: SiblingIndex::new(Mode::Mutated),
            promises: PromiseArena::new(),
        }
    }

    /// The number of floating records.
    pub fn len(&self) -> usize {
        self.floating.len()
    }

    pub fn is_empty(&self) -> bool {
        self.floating.is_empty()
    }

    pub fn is_floating(&self, node: &Node) -> bool {
        self.floating.contains_key(node)
    }

    /// An iterator over the floating records.
    pub fn records(&self) -> impl Iterator<Item = &RecordLink> {
        self.floating.values()
    }

    /// Ingests one batched child-list window.
    ///
    /// `prev` and `next` are the point-in-time siblings framing the
    /// `removed` + `added` window inside `parent` at the moment this
    /// batch occurred, which may differ from the live tree's state.
    pub fn mutation(
        &mut self,
        parent: &Node,
        removed: &[Node],
        added: &[Node],
        prev: Option<&Node>,
        next: Option<&Node>,
    ) {
        let mut candidates: Vec<RecordLink> = Vec::new();

        // Step 1: the window reveals `prev, removed.., next` as a
        // contiguous slice; promises parked inside it can make progress.
        self.scan_window(removed, prev, next, &mut candidates);

        // Step 2: ingest removals.
        let mut newly: Vec<Option<RecordLink>> = Vec::with_capacity(removed.len());
        for n in removed {
            match self.floating.get(n).cloned() {
                None => {
                    // The node was fixed until now, so it leaves a hole at
                    // its original position. Siblings are filled in below.
                    let link = new_record(n.clone(), Some(Position::unknown(parent.clone())), None);
                    self.floating.insert(n.clone(), link.clone());
                    newly.push(Some(link));
                }
                Some(link) => {
                    self.mutated.remove(&link);
                    self.sweep_parked(&link);

                    let pure_add = link.borrow().original.is_none();
                    if pure_add {
                        // the earlier add and this removal cancel out
                        self.floating.remove(n);
                    } else {
                        let back_home = link
                            .borrow()
                            .original
                            .as_ref()
                            .map_or(false, |o| o.parent == *parent);
                        link.borrow_mut().mutated = None;
                        if back_home {
                            candidates.push(link.clone());
                        }
                    }
                    newly.push(None);
                }
            }
        }

        // Step 3: fill the original siblings of the newly floated nodes.
        for i in 0..newly.len() {
            let link = match &newly[i] {
                Some(l) => l.clone(),
                None => continue,
            };
            for &side in &[Side::Prev, Side::Next] {
                self.fill_original(&link, side, i, &newly, prev, next, &mut candidates);
            }
        }

        // Step 4: update the window endpoints, then ingest additions.
        if let Some(p) = prev {
            if let Some(link) = self.floating.get(p).cloned() {
                let value = match added.first() {
                    Some(n) => Sibling::Node(n.clone()),
                    None => Sibling::from_node(next),
                };
                let displaced = self.mutated.update(&link, Side::Next, value, Some(parent));
                debug_assert!(displaced.is_none(), "the window scan detaches parked promises");
                candidates.push(link);
            }
        }
        if let Some(x) = next {
            if let Some(link) = self.floating.get(x).cloned() {
                let value = match added.last() {
                    Some(n) => Sibling::Node(n.clone()),
                    None => Sibling::from_node(prev),
                };
                let displaced = self.mutated.update(&link, Side::Prev, value, Some(parent));
                debug_assert!(displaced.is_none(), "the window scan detaches parked promises");
                candidates.push(link);
            }
        }

        for (i, n) in added.iter().enumerate() {
            let link = match self.floating.get(n).cloned() {
                Some(link) => {
                    // a re-add: drop the stale mutated view
                    self.mutated.remove(&link);
                    self.sweep_parked(&link);
                    let back_home = link
                        .borrow()
                        .original
                        .as_ref()
                        .map_or(false, |o| o.parent == *parent);
                    if back_home {
                        candidates.push(link.clone());
                    }
                    link
                }
                None => {
                    let link = new_record(n.clone(), None, None);
                    self.floating.insert(n.clone(), link.clone());
                    link
                }
            };

            let prev_s = if i > 0 {
                Sibling::Node(added[i - 1].clone())
            } else {
                Sibling::from_node(prev)
            };
            let next_s = if i + 1 < added.len() {
                Sibling::Node(added[i + 1].clone())
            } else {
                Sibling::from_node(next)
            };

            link.borrow_mut().mutated = Some(Position {
                parent: parent.clone(),
                prev: prev_s,
                next: next_s,
            });
            self.mutated.add(&link);
        }

        // Step 5: fixedness propagation.
        self.check_candidates(candidates);

        self.assert_invariants();
    }

    // Scans `prev, removed.., next` left to right, resuming the promises
    // the revealed adjacency can answer. Records whose promises resolved
    // are collected as revert candidates.
    fn scan_window(
        &mut self,
        removed: &[Node],
        prev: Option<&Node>,
        next: Option<&Node>,
        candidates: &mut Vec<RecordLink>,
    ) {
        let mut back = match prev {
            None => BackState::Value(Sibling::End),
            Some(p) => {
                if self.floating.contains_key(p) {
                    BackState::Walk(p.clone())
                } else {
                    BackState::Value(Sibling::Node(p.clone()))
                }
            }
        };
        let mut pending_next: Vec<PromiseId> = Vec::new();

        // a promise parked on the prev endpoint's next slot is revealed
        // by this window as well
        if let Some(p) = prev {
            if let Some(link) = self.floating.get(p).cloned() {
                if let Some(id) = parked_promise(&link, Side::Next) {
                    self.unpark(id);
                    pending_next.push(id);
                }
            }
        }

        let elements: Vec<(Node, bool)> = removed
            .iter()
            .map(|n| (n.clone(), false))
            .chain(next.map(|n| (n.clone(), true)))
            .collect();

        for (node, is_next_edge) in elements {
            let link = match self.floating.get(&node).cloned() {
                None => {
                    // a fixed element answers every pending forward walk
                    for id in pending_next.drain(..) {
                        let origin = self.resolve_promise(id, Sibling::Node(node.clone()));
                        candidates.push(origin);
                    }
                    back = BackState::Value(Sibling::Node(node.clone()));
                    continue;
                }
                Some(link) => link,
            };

            // a backward walk parked on this record resolves against the
            // revealed left part of the window
            if let Some(id) = parked_promise(&link, Side::Prev) {
                self.unpark(id);
                if let Some(partner) = pending_next.pop() {
                    // Joint encounter: a forward walk and a backward walk
                    // meet with nothing fixed in between, so their origins
                    // were originally adjacent.
                    let (a, b) = self.joint_resolve(partner, id);
                    candidates.push(a);
                    candidates.push(b);
                } else {
                    match back.clone() {
                        BackState::Value(s) => {
                            candidates.push(self.resolve_promise(id, s));
                        }
                        BackState::Walk(n) => {
                            if let Some(origin) = self.resume_promise(id, Sibling::Node(n)) {
                                candidates.push(origin);
                            }
                        }
                    }
                }
            }

            // a forward walk parked here waits for the rest of the window
            if !is_next_edge {
                if let Some(id) = parked_promise(&link, Side::Next) {
                    self.unpark(id);
                    pending_next.push(id);
                }
            }

            // floating elements are transparent to the backward state
        }

        // forward walks not answered inside the window continue beyond it
        for id in pending_next {
            if let Some(origin) = self.resume_promise(id, Sibling::from_node(next)) {
                candidates.push(origin);
            }
        }
    }

    // Fills `link.original[side]` for a node that was fixed until this
    // window removed it. `index` is the node's position in the removed
    // slice, `newly` the per-position records of this batch.
    fn fill_original(
        &mut self,
        link: &RecordLink,
        side: Side,
        index: usize,
        newly: &[Option<RecordLink>],
        prev: Option<&Node>,
        next: Option<&Node>,
        candidates: &mut Vec<RecordLink>,
    ) {
        {
            let rec = link.borrow();
            if *rec.original.as_ref().unwrap().get(side) != Sibling::Unknown {
                return;
            }
        }
        let node = link.borrow().node.clone();

        // 1) a neighbor's original already points at this node
        if let Some(nb) = self.original.get(side.opposite(), &node) {
            let nb_node = nb.borrow().node.clone();
            self.original.update(link, side, Sibling::Node(nb_node), None);
            return;
        }

        // 2) the nearest element of the removed slice that was fixed until
        //    now; previously floating elements moved into the window after
        //    tracking started and are looked through
        let partner = match side {
            Side::Prev => (0..index).rev().find_map(|k| newly[k].clone()),
            Side::Next => (index + 1..newly.len()).find_map(|k| newly[k].clone()),
        };
        if let Some(partner) = partner {
            let partner_node = partner.borrow().node.clone();
            self.original.update(link, side, Sibling::Node(partner_node), None);

            let partner_open =
                *partner.borrow().original.as_ref().unwrap().get(side.opposite()) == Sibling::Unknown;
            if partner_open {
                self.original.update(&partner, side.opposite(), Sibling::Node(node), None);
            }
            return;
        }

        // 3) the answer lies beyond the window: walk the mutated graph
        //    from the edge
        let start = match side {
            Side::Prev => Sibling::from_node(prev),
            Side::Next => Sibling::from_node(next),
        };
        if let Some(origin) = self.launch_promise(link, side, start) {
            candidates.push(origin);
        }
    }

    // Allocates a promise for `origin.original[direction]` and starts the
    // walk. Returns the origin if the walk resolved right away.
    fn launch_promise(
        &mut self,
        origin: &RecordLink,
        direction: Side,
        start: Sibling,
    ) -> Option<RecordLink> {
        let id = self.promises.insert(SiblingPromise {
            origin: origin.clone(),
            direction,
            pointer: None,
        });
        origin
            .borrow_mut()
            .original
            .as_mut()
            .unwrap()
            .set(direction, Sibling::Pending(id));
        self.resume_promise(id, start)
    }

    // Walks from `start` along the promise's direction through the
    // mutated graph. Fixed nodes and parent edges resolve the promise;
    // an unobserved slot parks it there. Returns the origin record when
    // the promise resolved.
    fn resume_promise(&mut self, id: PromiseId, start: Sibling) -> Option<RecordLink> {
        let direction = self.promises.get(id).direction;
        let mut cur = start;
        let mut steps = self.floating.len() + 1;

        loop {
            match cur {
                Sibling::End => return Some(self.resolve_promise(id, Sibling::End)),
                Sibling::Unknown => {
                    debug_assert!(false, "a walk never starts from an unobserved slot");
                    self.abandon_promise(id);
                    return None;
                }
                Sibling::Pending(_) => {
                    // Another walk already waits on the same unobserved
                    // slot. Walks never join; this one gives up and the
                    // origin slot stays unknown.
                    debug!("a sibling walk met another pending walk; giving up");
                    self.abandon_promise(id);
                    return None;
                }
                Sibling::Node(n) => {
                    let link = match self.floating.get(&n) {
                        None => {
                            // a fixed node is in its original position
                            return Some(self.resolve_promise(id, Sibling::Node(n.clone())));
                        }
                        Some(link) => link.clone(),
                    };

                    if steps == 0 {
                        warn!("a sibling walk did not terminate; the mutated graph is inconsistent");
                        self.abandon_promise(id);
                        return None;
                    }
                    steps -= 1;

                    let slot = link.borrow().mutated.as_ref().map(|p| p.get(direction).clone());
                    match slot {
                        None => {
                            // the walk ran into a node recorded as removed
                            debug!("a sibling walk ran into a removed node; giving up");
                            self.abandon_promise(id);
                            return None;
                        }
                        Some(Sibling::Unknown) => {
                            // park until a mutation reveals the slot
                            link.borrow_mut()
                                .mutated
                                .as_mut()
                                .unwrap()
                                .set(direction, Sibling::Pending(id));
                            self.promises.get_mut(id).pointer = Some(link);
                            return None;
                        }
                        Some(value) => cur = value,
                    }
                }
            }
        }
    }

    // Detaches a promise from the mutated slot it is parked on.
    fn unpark(&mut self, id: PromiseId) {
        let (pointer, direction) = {
            let promise = self.promises.get_mut(id);
            (promise.pointer.take(), promise.direction)
        };

        if let Some(link) = pointer {
            let mut rec = link.borrow_mut();
            if let Some(pos) = rec.mutated.as_mut() {
                if *pos.get(direction) == Sibling::Pending(id) {
                    pos.set(direction, Sibling::Unknown);
                }
            }
        }
    }

    // Completes a promise: writes the found sibling into the origin's
    // original slot and keeps the original index in sync.
    fn resolve_promise(&mut self, id: PromiseId, value: Sibling) -> RecordLink {
        debug_assert!(!value.is_unresolved());

        self.unpark(id);
        let promise = self.promises.remove(id);
        self.original.update(&promise.origin, promise.direction, value, None);
        promise.origin
    }

    // Gives a promise up: the origin slot goes back to unknown.
    fn abandon_promise(&mut self, id: PromiseId) {
        self.unpark(id);
        let promise = self.promises.remove(id);

        let mut rec = promise.origin.borrow_mut();
        if let Some(pos) = rec.original.as_mut() {
            if *pos.get(promise.direction) == Sibling::Pending(id) {
                pos.set(promise.direction, Sibling::Unknown);
            }
        }
    }

    // Resolves a forward walk and a backward walk that met with nothing
    // fixed in between: each origin becomes the other's original sibling.
    fn joint_resolve(&mut self, forward: PromiseId, backward: PromiseId) -> (RecordLink, RecordLink) {
        debug_assert_eq!(self.promises.get(forward).direction, Side::Next);
        debug_assert_eq!(self.promises.get(backward).direction, Side::Prev);

        let forward_node = self.promises.get(forward).origin.borrow().node.clone();
        let backward_node = self.promises.get(backward).origin.borrow().node.clone();

        let a = self.resolve_promise(forward, Sibling::Node(backward_node));
        let b = self.resolve_promise(backward, Sibling::Node(forward_node));
        (a, b)
    }

    // Abandons promises parked on a record whose mutated view is about
    // to vanish.
    fn sweep_parked(&mut self, link: &RecordLink) {
        for &side in &[Side::Prev, Side::Next] {
            if let Some(id) = parked_promise(link, side) {
                debug!("abandoning a promise parked on a vanishing slot");
                self.abandon_promise(id);
            }
        }
    }

    // Step 5: releases every candidate whose whole run has returned to
    // its original position and lets fixedness propagate outward.
    fn check_candidates(&mut self, mut queue: Vec<RecordLink>) {
        let mut checked: HashSet<Node> = HashSet::new();

        while let Some(link) = queue.pop() {
            let node = link.borrow().node.clone();
            if !self.floating.contains_key(&node) {
                continue;
            }
            if !checked.insert(node.clone()) {
                continue;
            }

            let run = match self.restored_run(&link) {
                Some(run) => run,
                None => continue,
            };

            let mut neighbors = Vec::new();
            for member in &run {
                let member_node = member.borrow().node.clone();
                self.release(member);
                for &side in &[Side::Prev, Side::Next] {
                    if let Some(nb) = self.original.get(side, &member_node) {
                        neighbors.push(nb);
                    }
                    if let Some(nb) = self.mutated.get(side, &member_node) {
                        neighbors.push(nb);
                    }
                }
            }

            // the neighborhood changed: records anchored on the released
            // nodes may revert now, including ones that failed above
            checked.clear();
            queue.extend(neighbors);
        }
    }

    // The maximal run of floating nodes around `link` that sits in its
    // original position, or `None` if the run is not anchored.
    //
    // Matching a candidate in isolation against floating neighbors would
    // be unsound: a chain of moved nodes can be pairwise consistent yet
    // anchored at the wrong spot. The whole run reverts, or nothing does.
    fn restored_run(&self, link: &RecordLink) -> Option<Vec<RecordLink>> {
        {
            let rec = link.borrow();
            let (orig, mutd) = match (&rec.original, &rec.mutated) {
                (Some(o), Some(m)) => (o, m),
                _ => return None,
            };
            if orig.parent != mutd.parent {
                return None;
            }
        }

        let mut run: VecDeque<RecordLink> = VecDeque::new();
        let mut seen: HashSet<Node> = HashSet::new();
        run.push_back(link.clone());
        seen.insert(link.borrow().node.clone());

        for &side in &[Side::Prev, Side::Next] {
            let mut cur = link.clone();
            while let Some(nb) = self.run_neighbor(&cur, side) {
                if !seen.insert(nb.borrow().node.clone()) {
                    break;
                }
                match side {
                    Side::Prev => run.push_front(nb.clone()),
                    Side::Next => run.push_back(nb.clone()),
                }
                cur = nb;
            }
        }

        let head = run.front().unwrap().clone();
        let tail = run.back().unwrap().clone();
        if !self.boundary_matches(&head, Side::Prev) {
            return None;
        }
        if !self.boundary_matches(&tail, Side::Next) {
            return None;
        }

        Some(run.into_iter().collect())
    }

    // The floating record that extends a restored run on `side`: the
    // original-graph neighbor, provided both records claim each other
    // originally and are adjacent in the current tree as well.
    fn run_neighbor(&self, link: &RecordLink, side: Side) -> Option<RecordLink> {
        let rec = link.borrow();
        let orig = rec.original.as_ref()?;
        let mutd = rec.mutated.as_ref()?;
        let parent = &orig.parent;

        let orig_nb = match orig.get(side) {
            Sibling::Node(n) => n.clone(),
            _ => return None,
        };
        let nb_link = self.floating.get(&orig_nb)?.clone();
        {
            let nb = nb_link.borrow();
            let nb_orig = nb.original.as_ref()?;
            let nb_mut = nb.mutated.as_ref()?;
            if nb_orig.parent != *parent || nb_mut.parent != *parent {
                return None;
            }
            if *nb_orig.get(side.opposite()) != Sibling::Node(rec.node.clone()) {
                return None;
            }
        }

        // adjacent in the current tree as well, in both directions
        let seen = self.current_anchor(&rec.node, mutd, side)?;
        if seen != Sibling::Node(orig_nb.clone()) {
            return None;
        }
        let nb = nb_link.borrow();
        let seen_back = self.current_anchor(&orig_nb, nb.mutated.as_ref()?, side.opposite())?;
        if seen_back != Sibling::Node(rec.node.clone()) {
            return None;
        }
        drop(nb);

        Some(nb_link)
    }

    // The run's outer boundary on `side` holds when the anchor expected
    // from the original graph equals the anchor currently seen, and both
    // are conclusive.
    fn boundary_matches(&self, link: &RecordLink, side: Side) -> bool {
        let rec = link.borrow();
        let (orig, mutd) = match (&rec.original, &rec.mutated) {
            (Some(o), Some(m)) => (o, m),
            _ => return false,
        };

        let target = match self.original_anchor(orig, side) {
            Some(t) => t,
            None => return false,
        };
        let seen = match self.current_anchor(&rec.node, mutd, side) {
            Some(s) => s,
            None => return false,
        };
        target == seen
    }

    // The anchor the record would see on `side` if it sat in its original
    // position: its original-graph neighbor, looking through records of
    // nodes that are now removed. Only a fixed node or the parent edge is
    // conclusive; a neighbor that is itself floating would have extended
    // the run instead.
    fn original_anchor(&self, orig: &Position, side: Side) -> Option<Sibling> {
        let mut cur = orig.get(side).clone();
        let mut steps = self.floating.len() + 1;

        loop {
            match cur {
                Sibling::End => return Some(Sibling::End),
                Sibling::Unknown | Sibling::Pending(_) => return None,
                Sibling::Node(n) => {
                    let link = match self.floating.get(&n) {
                        None => return Some(Sibling::Node(n)),
                        Some(l) => l.clone(),
                    };
                    let rec = link.borrow();
                    if rec.mutated.is_some() {
                        // a floating node is not an anchor
                        return None;
                    }
                    // removed: its original neighbors inherit the adjacency
                    match &rec.original {
                        Some(o) if o.parent == orig.parent => {
                            if steps == 0 {
                                return None;
                            }
                            steps -= 1;
                            cur = o.get(side).clone();
                        }
                        _ => return None,
                    }
                }
            }
        }
    }

    // The anchor actually next to the record on `side`: its mutated-graph
    // neighbor, looking through floating nodes that originated in a
    // different parent (or did not exist at all) - those neither block
    // nor enable a reversion.
    fn current_anchor(&self, node: &Node, mutd: &Position, side: Side) -> Option<Sibling> {
        let mut cur = mutd.get(side).clone();
        let mut steps = self.floating.len() + 1;

        loop {
            match cur {
                Sibling::End => return Some(Sibling::End),
                Sibling::Unknown | Sibling::Pending(_) => return None,
                Sibling::Node(n) => {
                    if n == *node {
                        return None;
                    }
                    let link = match self.floating.get(&n) {
                        None => return Some(Sibling::Node(n)),
                        Some(l) => l.clone(),
                    };
                    let rec = link.borrow();
                    let foreign = match &rec.original {
                        None => true,
                        Some(o) => o.parent != mutd.parent,
                    };
                    if !foreign {
                        // a floating node that belongs to this parent is a
                        // concrete anchor: it matches the original
                        // neighbor or blocks the reversion
                        return Some(Sibling::Node(n));
                    }
                    match &rec.mutated {
                        Some(m) => {
                            if steps == 0 {
                                return None;
                            }
                            steps -= 1;
                            cur = m.get(side).clone();
                        }
                        None => return None,
                    }
                }
            }
        }
    }

    // Removes a record that became fixed again.
    fn release(&mut self, link: &RecordLink) {
        let node = link.borrow().node.clone();

        // promises never stay attached to a fixed record
        self.sweep_parked(link);
        for &side in &[Side::Prev, Side::Next] {
            let originating = {
                let rec = link.borrow();
                match rec.original.as_ref().map(|p| p.get(side).clone()) {
                    Some(Sibling::Pending(id)) => Some(id),
                    _ => None,
                }
            };
            if let Some(id) = originating {
                self.abandon_promise(id);
            }
        }

        self.floating.remove(&node);
        self.original.remove(link);
        self.mutated.remove(link);
    }

    /// Reconciles the tracked mutated view with the live tree.
    ///
    /// The caller asserts that the floating records match the tree; every
    /// unobserved mutated sibling is read from the live nodes, after which
    /// all outstanding promises can be driven to resolution and the
    /// affected records are re-checked for reversion.
    pub fn synchronize(&mut self) {
        let links: Vec<RecordLink> = self.floating.values().cloned().collect();
        let mut displaced: Vec<(PromiseId, Sibling)> = Vec::new();

        for link in &links {
            for &side in &[Side::Prev, Side::Next] {
                let unresolved = {
                    let rec = link.borrow();
                    match &rec.mutated {
                        Some(m) => m.get(side).is_unresolved(),
                        None => false,
                    }
                };
                if !unresolved {
                    continue;
                }

                let node = link.borrow().node.clone();
                let live = match side {
                    Side::Prev => node.previous_sibling(),
                    Side::Next => node.next_sibling(),
                };
                let value = Sibling::from_node(live.as_ref());
                if let Some(id) = self.mutated.update(link, side, value.clone(), None) {
                    displaced.push((id, value));
                }
            }
        }

        // forward walks first; backward walks are then guaranteed to
        // reach a fixed node
        let mut candidates = Vec::new();
        for &direction in &[Side::Next, Side::Prev] {
            for (id, start) in &displaced {
                if !self.promises.contains(*id) {
                    continue;
                }
                if self.promises.get(*id).direction != direction {
                    continue;
                }
                if let Some(origin) = self.resume_promise(*id, start.clone()) {
                    candidates.push(origin);
                }
            }
        }

        for id in self.promises.ids() {
            debug!("a promise survived synchronize; its sibling is undiscoverable");
            self.abandon_promise(id);
        }

        self.check_candidates(candidates);

        self.assert_invariants();
    }

    /// Reverts the tracked mutations on the live tree.
    ///
    /// Floating nodes are detached first, then every move group is
    /// reinserted at its original position. Returns the number of groups
    /// that could not be placed because both boundary siblings are
    /// unknown; such groups are skipped, everything else proceeds.
    /// All tracked state is dropped afterwards.
    pub fn revert(&mut self) -> usize {
        let groups = self.collect_groups();

        // Detaching everything first avoids inserting a group into a
        // parent that is presently nested inside one of the group's own
        // members; the insertions would detach the nodes anyway.
        for link in self.floating.values() {
            let mut node = link.borrow().node.clone();
            node.detach();
        }

        let mut pending = groups;
        let mut skipped = 0;

        loop {
            let mut progressed = false;
            let mut rest = Vec::new();
            for group in pending {
                if self.place_group(&group, false) {
                    progressed = true;
                } else {
                    rest.push(group);
                }
            }
            pending = rest;
            if pending.is_empty() {
                break;
            }
            if progressed {
                continue;
            }

            // no sibling anchor is reachable: fall back to parent edges
            let mut rest = Vec::new();
            for group in pending {
                if self.place_group(&group, true) {
                    progressed = true;
                } else {
                    rest.push(group);
                }
            }
            pending = rest;
            if pending.is_empty() {
                break;
            }
            if !progressed {
                for group in &pending {
                    warn!(
                        "could not revert a group of {} node(s): both boundary siblings are unknown",
                        group.nodes.len()
                    );
                }
                skipped = pending.len();
                break;
            }
        }

        self.clear();
        skipped
    }

    // Inserts a group next to one of its boundary siblings. Edge
    // fallbacks (prepend/append) are only used when `allow_edges` is set,
    // so that sibling anchors get a chance to be placed first.
    fn place_group(&self, group: &MoveGroup, allow_edges: bool) -> bool {
        if let Sibling::Node(p) = &group.prev {
            if p.parent().map_or(false, |pp| pp == group.parent) {
                let mut anchor = p.clone();
                for n in &group.nodes {
                    anchor.insert_after(n);
                    anchor = n.clone();
                }
                return true;
            }
        }
        if let Sibling::Node(x) = &group.next {
            if x.parent().map_or(false, |xp| xp == group.parent) {
                let mut anchor = x.clone();
                for n in group.nodes.iter().rev() {
                    anchor.insert_before(n);
                    anchor = n.clone();
                }
                return true;
            }
        }

        if !allow_edges {
            return false;
        }

        match (&group.prev, &group.next) {
            (Sibling::End, _) => {
                let mut parent = group.parent.clone();
                for n in group.nodes.iter().rev() {
                    parent.prepend(n);
                }
                true
            }
            (_, Sibling::End) => {
                let mut parent = group.parent.clone();
                for n in &group.nodes {
                    parent.append(n);
                }
                true
            }
            _ => false,
        }
    }

    // Builds the maximal runs of floating nodes that share an original
    // parent and are linked through each other as original siblings.
    fn collect_groups(&self) -> Vec<MoveGroup> {
        let mut visited: HashSet<Node> = HashSet::new();
        let mut groups = Vec::new();

        for (node, link) in &self.floating {
            if visited.contains(node) {
                continue;
            }
            let parent = match &link.borrow().original {
                Some(o) => o.parent.clone(),
                None => continue, // a pure add is never reinserted
            };

            // walk to the head of the run
            let mut head = link.clone();
            let mut guard: HashSet<Node> = HashSet::new();
            guard.insert(node.clone());
            loop {
                let prev_node = match head.borrow().original.as_ref().unwrap().get(Side::Prev) {
                    Sibling::Node(n) => n.clone(),
                    _ => break,
                };
                if guard.contains(&prev_node) || visited.contains(&prev_node) {
                    break;
                }
                let prev_link = match self.floating.get(&prev_node) {
                    Some(l) => l.clone(),
                    None => break,
                };
                let chained = {
                    let head_node = head.borrow().node.clone();
                    let pr = prev_link.borrow();
                    match &pr.original {
                        Some(po) => po.parent == parent && po.next == Sibling::Node(head_node),
                        None => false,
                    }
                };
                if !chained {
                    break;
                }
                guard.insert(prev_node);
                head = prev_link;
            }

            // collect the run from the head forward
            let prev = head.borrow().original.as_ref().unwrap().prev.clone();
            let mut nodes = Vec::new();
            let mut tail = head;
            loop {
                let tail_node = tail.borrow().node.clone();
                visited.insert(tail_node.clone());
                nodes.push(tail_node.clone());

                let next_node = match tail.borrow().original.as_ref().unwrap().get(Side::Next) {
                    Sibling::Node(n) => n.clone(),
                    _ => break,
                };
                if visited.contains(&next_node) {
                    break;
                }
                let next_link = match self.floating.get(&next_node) {
                    Some(l) => l.clone(),
                    None => break,
                };
                let chained = {
                    let nr = next_link.borrow();
                    match &nr.original {
                        Some(no) => no.parent == parent && no.prev == Sibling::Node(tail_node),
                        None => false,
                    }
                };
                if !chained {
                    break;
                }
                tail = next_link;
            }
            let next = tail.borrow().original.as_ref().unwrap().next.clone();

            groups.push(MoveGroup {
                nodes,
                parent,
                prev,
                next,
            });
        }

        groups
    }

    /// Drops all tracked state.
    pub fn clear(&mut self) {
        self.floating.clear();
        self.original.clear();
        self.mutated.clear();
        self.promises.clear();
    }

    #[cfg(debug_assertions)]
    fn assert_invariants(&self) {
        for (node, link) in &self.floating {
            let rec = link.borrow();
            assert!(
                rec.original.is_some() || rec.mutated.is_some(),
                "record {:?} lost both of its positions",
                node
            );
        }
    }

    #[cfg(not(debug_assertions))]
    fn assert_invariants(&self) {}
}
