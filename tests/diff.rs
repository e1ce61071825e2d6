// Copyright 2018 Evgeniy Reizner
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use pretty_assertions::assert_eq;

use domdiff::{
    BoundarySide,
    DiffFilter,
    Document,
    Error,
    MutationDiff,
    Node,
    SiblingRef,
};

// The helpers below behave like a MutationObserver: the point-in-time
// siblings are captured before the tree is touched, and a move is
// reported as a remove followed by an add.

fn tracked_detach(diff: &mut MutationDiff, node: &Node) {
    let parent = node.parent().unwrap();
    let prev = node.previous_sibling();
    let next = node.next_sibling();
    node.clone().detach();
    diff.children(&parent, &[node.clone()], &[], prev.as_ref(), next.as_ref());
}

fn tracked_append(diff: &mut MutationDiff, parent: &Node, node: &Node) {
    if node.parent().is_some() {
        tracked_detach(diff, node);
    }
    let prev = parent.last_child();
    parent.clone().append(node);
    diff.children(parent, &[], &[node.clone()], prev.as_ref(), None);
}

fn tracked_prepend(diff: &mut MutationDiff, parent: &Node, node: &Node) {
    if node.parent().is_some() {
        tracked_detach(diff, node);
    }
    let next = parent.first_child();
    parent.clone().prepend(node);
    diff.children(parent, &[], &[node.clone()], None, next.as_ref());
}

fn tags(parent: &Node) -> Vec<String> {
    parent.children().map(|n| n.tag_name().clone()).collect()
}

fn setup() -> (Document, Node, Node, Node, Node) {
    let doc = Document::new();
    let mut r = doc.root();
    let a = doc.create_element("a");
    let b = doc.create_element("b");
    let c = doc.create_element("c");
    r.append(&a);
    r.append(&b);
    r.append(&c);
    (doc, r, a, b, c)
}

#[test]
fn cycle_back() {
    let (_doc, r, a, b, c) = setup();
    let mut diff = MutationDiff::new();

    tracked_append(&mut diff, &r, &a);
    tracked_prepend(&mut diff, &r, &c);
    tracked_prepend(&mut diff, &r, &b);

    assert_eq!(tags(&r), ["b", "c", "a"]);
    assert!(diff.mutated(Some(&r)));
    assert!(diff.mutated(None));

    // the range brackets the whole rearranged content
    let range = diff.range(Some(&r)).unwrap().unwrap();
    assert_eq!(range.start().node(), &b);
    assert_eq!(range.end().node(), &a);

    diff.revert(None).unwrap();
    assert_eq!(tags(&r), ["a", "b", "c"]);
    assert!(!diff.mutated(None));
    assert_eq!(diff.storage_size(), 0);
}

#[test]
fn rotation_is_not_a_mutation() {
    let (_doc, r, a, b, c) = setup();
    let mut diff = MutationDiff::new();

    tracked_append(&mut diff, &r, &a);
    tracked_append(&mut diff, &r, &b);
    tracked_append(&mut diff, &r, &c);

    // every node went through a remove and an add, but the final order
    // matches the original one, so nothing is floating
    assert_eq!(tags(&r), ["a", "b", "c"]);
    assert!(!diff.mutated(Some(&r)));
    assert_eq!(diff.range(Some(&r)).unwrap(), None);
    assert_eq!(diff.storage_size(), 0);
}

#[test]
fn mixed_remove() {
    let (_doc, r, a, b, c) = setup();
    let mut diff = MutationDiff::new();

    tracked_append(&mut diff, &r, &a);
    tracked_append(&mut diff, &r, &b);
    tracked_detach(&mut diff, &c);

    assert_eq!(tags(&r), ["a", "b"]);

    // the moves of `a` and `b` cancelled out; only the removal remains
    assert_eq!(diff.storage_size(), 1);

    let map = diff
        .diff(DiffFilter::CHILDREN | DiffFilter::ORIGINAL | DiffFilter::MUTATED, None)
        .unwrap();
    assert_eq!(map.len(), 1);
    let entry = map.get(&c).unwrap().children.clone().unwrap();
    assert!(entry.mutated.is_none());
    let original = entry.original.unwrap();
    assert_eq!(original.parent, r);
    assert_eq!(original.prev, SiblingRef::Node(b.clone()));
    assert_eq!(original.next, SiblingRef::End);

    // the range collapses to the gap the removal left behind
    let range = diff.range(Some(&r)).unwrap().unwrap();
    assert!(range.is_collapsed());
    assert_eq!(range.start().node(), &b);
    assert_eq!(range.start().side(), BoundarySide::After);

    diff.revert(None).unwrap();
    assert_eq!(tags(&r), ["a", "b", "c"]);
}

#[test]
fn attribute_toggle_and_restore() {
    let (_doc, r, mut a, _b, _c) = setup();
    a.set_attribute("class", "x");

    let mut diff = MutationDiff::new();

    a.set_attribute("class", "y");
    diff.attribute(&a, "class", None, Some("x"));

    a.set_attribute("class", "x");
    diff.attribute(&a, "class", None, Some("y"));

    assert!(!diff.mutated(Some(&r)));
    assert_eq!(diff.range(Some(&r)).unwrap(), None);

    diff.revert(None).unwrap();
    assert_eq!(a.attribute("class").as_deref(), Some("x"));
}

#[test]
fn data_edit_and_restore() {
    let doc = Document::new();
    let mut r = doc.root();
    let mut t = doc.create_text("hi");
    r.append(&t);

    let mut diff = MutationDiff::new();

    t.set_text("hello");
    diff.data(&t, "hi");

    t.set_text("hi");
    diff.data(&t, "hello");

    assert!(!diff.mutated(Some(&r)));
    diff.revert(None).unwrap();
    assert_eq!(*t.text(), "hi");
}

#[test]
fn attribute_diff_and_revert() {
    let (_doc, r, mut a, _b, _c) = setup();
    a.set_attribute("class", "x");

    let mut diff = MutationDiff::new();

    a.set_attribute("class", "y");
    diff.attribute(&a, "class", None, Some("x"));
    a.remove_attribute("class");
    diff.attribute(&a, "class", None, Some("y"));
    a.set_attribute("id", "1");
    diff.attribute(&a, "id", None, None);

    assert!(diff.mutated(Some(&r)));

    let map = diff
        .diff(DiffFilter::ATTRIBUTE | DiffFilter::ORIGINAL | DiffFilter::MUTATED, None)
        .unwrap();
    let entry = map.get(&a).unwrap();
    let class = entry.attributes.get("class").unwrap();
    assert_eq!(class.original.as_deref(), Some("x"));
    assert_eq!(class.mutated, None);
    let id = entry.attributes.get("id").unwrap();
    assert_eq!(id.original, None);
    assert_eq!(id.mutated.as_deref(), Some("1"));

    diff.revert(None).unwrap();
    assert_eq!(a.attribute("class").as_deref(), Some("x"));
    assert!(!a.has_attribute("id"));
}

#[test]
fn custom_properties() {
    let (_doc, _r, a, _b, _c) = setup();
    let mut diff = MutationDiff::new();

    diff.custom(&a, "scroll", Some("10"), Some("0"));
    assert!(diff.mutated(None));

    let map = diff
        .diff(DiffFilter::CUSTOM | DiffFilter::ORIGINAL | DiffFilter::MUTATED,
              Some(&|_: &Node, _: &str| Some("10".to_owned())))
        .unwrap();
    let entry = map.get(&a).unwrap().custom.get("scroll").unwrap().clone();
    assert_eq!(entry.original.as_deref(), Some("0"));
    assert_eq!(entry.mutated.as_deref(), Some("10"));

    // reverting without a callback skips the entry; with one it restores
    let restored = std::cell::RefCell::new(Vec::new());
    let cb = |_: &mut Node, key: &str, original: Option<&str>| {
        restored.borrow_mut().push((key.to_owned(), original.map(str::to_owned)));
    };
    diff.custom(&a, "scroll", Some("10"), Some("0"));
    diff.revert(Some(&cb)).unwrap();
    assert_eq!(*restored.borrow(), [("scroll".to_owned(), Some("0".to_owned()))]);
}

#[test]
fn untracked_sibling_resolves_to_live_neighbor() {
    // R has one tracked child `a`; an untracked `x` slips in before it,
    // then `a` is removed. The removal window names `x` as the
    // point-in-time sibling, so `a` comes back right after it.
    let doc = Document::new();
    let mut r = doc.root();
    let a = doc.create_element("a");
    r.append(&a);

    let mut diff = MutationDiff::new();

    let x = doc.create_element("x");
    a.clone().insert_before(&x); // untracked

    tracked_detach(&mut diff, &a);

    let map = diff
        .diff(DiffFilter::CHILDREN | DiffFilter::ORIGINAL, None)
        .unwrap();
    let original = map.get(&a).unwrap().children.clone().unwrap().original.unwrap();
    assert_eq!(original.prev, SiblingRef::Node(x.clone()));

    diff.synchronize();
    diff.revert(None).unwrap();
    assert_eq!(tags(&r), ["x", "a"]);
}

#[test]
fn pending_walk_resolves_on_synchronize() {
    // A notification gap leaves the tracker with an unobserved sibling:
    // the walk for `a`'s original prev parks on it and only the live
    // tree, via synchronize, can answer it.
    let doc = Document::new();
    let mut r = doc.root();
    let a = doc.create_element("a");
    let b = doc.create_element("b");
    r.append(&a);
    r.append(&b);

    let mut diff = MutationDiff::new();

    // b is removed...
    tracked_detach(&mut diff, &b);
    // ...and re-inserted first while notifications were not delivered
    r.prepend(&b); // untracked

    // z and w are inserted with proper notifications; the window around
    // w names `b` as an endpoint, which materializes b's mutated view
    // with an unobserved prev slot
    let z = doc.create_element("z");
    tracked_append(&mut diff, &r, &z);
    let w = doc.create_element("w");
    let mut b_handle = b.clone();
    b_handle.insert_after(&w);
    diff.children(&r, &[], &[w.clone()], Some(&b), Some(&a));

    // removing `a` launches a walk for its original prev; the walk steps
    // back through w and b and parks on b's unobserved prev slot
    tracked_detach(&mut diff, &a);

    let map = diff
        .diff(DiffFilter::CHILDREN | DiffFilter::ORIGINAL, None)
        .unwrap();
    let original = map.get(&a).unwrap().children.clone().unwrap().original.unwrap();
    assert_eq!(original.prev, SiblingRef::Unknown);

    // the live tree knows: nothing precedes b, so nothing preceded a
    // originally either
    diff.synchronize();

    let map = diff
        .diff(DiffFilter::CHILDREN | DiffFilter::ORIGINAL, None)
        .unwrap();
    let original = map.get(&a).unwrap().children.clone().unwrap().original.unwrap();
    assert_eq!(original.prev, SiblingRef::End);

    diff.revert(None).unwrap();
    assert_eq!(tags(&r), ["a", "b"]);
}

#[test]
fn parked_walks_meeting_resolve_each_other() {
    // Two walks park on unobserved slots of `d` and `b`; a later window
    // reveals the two slots as adjacent, which identifies the walks'
    // origins as each other's original siblings.
    let doc = Document::new();
    let mut r = doc.root();
    let f = doc.create_element("f");
    r.append(&f);
    let a = doc.create_element("a");
    let b = doc.create_element("b");
    let c = doc.create_element("c");
    let d = doc.create_element("d");
    let w1 = doc.create_element("w1");
    let w2 = doc.create_element("w2");

    let mut diff = MutationDiff::new();

    // float b and d; their own originals resolve against `f`
    diff.children(&r, &[b.clone()], &[], Some(&f), None);
    diff.children(&r, &[d.clone()], &[], Some(&f), None);

    // windows naming them as endpoints materialize their mutated views
    // with one unobserved slot each
    diff.children(&r, &[], &[w1.clone()], Some(&b), None);
    diff.children(&r, &[], &[w2.clone()], None, Some(&d));

    // a's backward walk parks on b's unobserved prev slot
    diff.children(&r, &[a.clone()], &[], Some(&b), None);
    // c's forward walk parks on d's unobserved next slot
    diff.children(&r, &[c.clone()], &[], None, Some(&d));

    // the window reveals d and b adjacent with nothing fixed between:
    // c's walk and a's walk meet
    diff.children(&r, &[d.clone(), b.clone()], &[], None, None);

    let map = diff
        .diff(DiffFilter::CHILDREN | DiffFilter::ORIGINAL, None)
        .unwrap();
    let a_orig = map.get(&a).unwrap().children.clone().unwrap().original.unwrap();
    assert_eq!(a_orig.prev, SiblingRef::Node(c.clone()));
    let c_orig = map.get(&c).unwrap().children.clone().unwrap().original.unwrap();
    assert_eq!(c_orig.next, SiblingRef::Node(a.clone()));
}

#[test]
fn revert_reports_unplaceable_groups() {
    let doc = Document::new();
    let mut r = doc.root();
    let f = doc.create_element("f");
    r.append(&f);
    let m1 = doc.create_element("m1");
    let m2 = doc.create_element("m2");
    let n = doc.create_element("n");

    let mut diff = MutationDiff::new();

    // m1 and m2 float with their mutated views gone
    diff.children(&r, &[m1.clone()], &[], Some(&f), None);
    diff.children(&r, &[m2.clone()], &[], Some(&f), None);

    // both of n's walks run into removed records and give up,
    // leaving both original siblings unknown
    diff.children(&r, &[n.clone()], &[], Some(&m1), Some(&m2));

    match diff.revert(None) {
        Err(Error::InsufficientInformation(count)) => assert_eq!(count, 1),
        other => panic!("unexpected revert outcome: {:?}", other),
    }

    // the unplaceable node stayed detached, everything else was placed
    assert!(n.parent().is_none());
    assert_eq!(m1.parent(), Some(r.clone()));
    assert_eq!(m2.parent(), Some(r.clone()));
    assert_eq!(diff.storage_size(), 0);
}

#[test]
fn invalid_filter_is_rejected() {
    let diff = MutationDiff::new();

    match diff.diff(DiffFilter::ORIGINAL, None) {
        Err(Error::InvalidFilter) => {}
        other => panic!("unexpected diff outcome: {:?}", other),
    }
    match diff.diff(DiffFilter::CHILDREN, None) {
        Err(Error::InvalidFilter) => {}
        other => panic!("unexpected diff outcome: {:?}", other),
    }
    assert!(diff.diff(DiffFilter::ALL, None).unwrap().is_empty());
}

#[test]
fn disconnected_trees_fail_without_root() {
    let doc = Document::new();
    let mut r = doc.root();
    let a = doc.create_element("a");
    r.append(&a);

    // a second, disjoint tree
    let mut island = doc.create_element("island");
    let mut t = doc.create_text("hi");
    island.append(&t);

    let mut diff = MutationDiff::new();

    let mut a = a;
    a.set_attribute("class", "y");
    diff.attribute(&a, "class", None, None);

    t.set_text("hello");
    diff.data(&t, "hi");

    match diff.range(None) {
        Err(Error::DisconnectedRange) => {}
        other => panic!("unexpected range outcome: {:?}", other),
    }

    // with an explicit root the query narrows instead of failing
    let range = diff.range(Some(&r)).unwrap().unwrap();
    assert_eq!(range.start().node(), &a);
    assert_eq!(range.end().node(), &a);
}

#[test]
fn synchronize_is_transparent() {
    // P6: when the live tree matches the tracked state, synchronize
    // changes no answers.
    let (_doc, r, a, b, _c) = setup();
    let mut diff = MutationDiff::new();

    tracked_append(&mut diff, &r, &a);
    tracked_detach(&mut diff, &b);

    let before = diff
        .diff(DiffFilter::CHILDREN | DiffFilter::ORIGINAL | DiffFilter::MUTATED, None)
        .unwrap();
    let mutated_before = diff.mutated(Some(&r));

    diff.synchronize();

    let after = diff
        .diff(DiffFilter::CHILDREN | DiffFilter::ORIGINAL | DiffFilter::MUTATED, None)
        .unwrap();
    assert_eq!(diff.mutated(Some(&r)), mutated_before);
    assert_eq!(before.len(), after.len());
    for (node, entry) in &before {
        assert_eq!(entry.children, after.get(node).unwrap().children);
    }

    diff.revert(None).unwrap();
    assert_eq!(tags(&r), ["a", "b", "c"]);
}

#[test]
fn clear_is_idempotent() {
    let (_doc, r, a, _b, _c) = setup();
    let mut diff = MutationDiff::new();

    tracked_append(&mut diff, &r, &a);
    assert!(diff.mutated(None));

    diff.clear();
    assert!(!diff.mutated(None));
    assert_eq!(diff.storage_size(), 0);

    diff.clear();
    assert!(!diff.mutated(None));
    assert_eq!(diff.storage_size(), 0);
}

#[test]
fn move_across_parents() {
    let doc = Document::new();
    let mut r = doc.root();
    let mut p1 = doc.create_element("p1");
    let mut p2 = doc.create_element("p2");
    let a = doc.create_element("a");
    let b = doc.create_element("b");
    r.append(&p1);
    r.append(&p2);
    p1.append(&a);
    p2.append(&b);

    let mut diff = MutationDiff::new();

    // move `a` from p1 to p2, before b
    let prev = a.previous_sibling();
    let next = a.next_sibling();
    a.clone().detach();
    diff.children(&p1, &[a.clone()], &[], prev.as_ref(), next.as_ref());
    b.clone().insert_before(&a);
    diff.children(&p2, &[], &[a.clone()], None, Some(&b));

    assert!(diff.mutated(Some(&p1)));
    assert!(diff.mutated(Some(&p2)));
    assert_eq!(diff.storage_size(), 1);

    diff.revert(None).unwrap();
    assert_eq!(p1.children().collect::<Vec<_>>(), [a.clone()]);
    assert_eq!(p2.children().collect::<Vec<_>>(), [b.clone()]);
}

#[test]
fn foreign_floaters_do_not_block_reversion() {
    // a node from another parent parked between two fixed nodes is
    // transparent: removing and re-adding `b` around it still reverts
    let doc = Document::new();
    let mut r = doc.root();
    let mut p1 = doc.create_element("p1");
    let p2 = doc.create_element("p2");
    let a = doc.create_element("a");
    let b = doc.create_element("b");
    let x = doc.create_element("x");
    r.append(&p1);
    r.append(&p2);
    p1.append(&a);
    p1.append(&b);
    p2.clone().append(&x);

    let mut diff = MutationDiff::new();

    // x moves in between a and b
    let prev = x.previous_sibling();
    let next = x.next_sibling();
    x.clone().detach();
    diff.children(&p2, &[x.clone()], &[], prev.as_ref(), next.as_ref());
    b.clone().insert_before(&x);
    diff.children(&p1, &[], &[x.clone()], Some(&a), Some(&b));

    // b hops to the end and back
    tracked_detach(&mut diff, &b);
    let prev = p1.last_child();
    p1.append(&b);
    diff.children(&p1, &[], &[b.clone()], prev.as_ref(), None);

    tracked_detach(&mut diff, &b);
    let mut x_handle = x.clone();
    x_handle.insert_after(&b);
    diff.children(&p1, &[], &[b.clone()], Some(&x), None);

    // b is back in its original position relative to p1's own nodes;
    // only x's move remains
    assert_eq!(diff.storage_size(), 1);

    diff.revert(None).unwrap();
    assert_eq!(tags(&p1), ["a", "b"]);
    assert_eq!(tags(&p2), ["x"]);
}
