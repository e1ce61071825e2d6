// Copyright 2018 Evgeniy Reizner
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;

use pretty_assertions::assert_eq;

use domdiff::{Document, Node, NodeType};

fn tags(parent: &Node) -> Vec<String> {
    parent.children().map(|n| n.tag_name().clone()).collect()
}

#[test]
fn append_1() {
    let doc = Document::new();
    let mut root = doc.root();
    let a = doc.create_element("a");
    let b = doc.create_element("b");

    root.append(&a);
    root.append(&b);

    assert_eq!(tags(&root), ["a", "b"]);
    assert_eq!(a.parent(), Some(root.clone()));
    assert_eq!(a.next_sibling(), Some(b.clone()));
    assert_eq!(b.previous_sibling(), Some(a.clone()));
    assert_eq!(root.first_child(), Some(a));
    assert_eq!(root.last_child(), Some(b));
}

#[test]
fn prepend_1() {
    let doc = Document::new();
    let mut root = doc.root();
    let a = doc.create_element("a");
    let b = doc.create_element("b");

    root.prepend(&a);
    root.prepend(&b);

    assert_eq!(tags(&root), ["b", "a"]);
}

#[test]
fn insert_1() {
    let doc = Document::new();
    let mut root = doc.root();
    let mut a = doc.create_element("a");
    let b = doc.create_element("b");
    let c = doc.create_element("c");

    root.append(&a);
    a.insert_after(&c);
    c.clone().insert_before(&b);

    assert_eq!(tags(&root), ["a", "b", "c"]);
    assert_eq!(root.last_child(), Some(c));
}

#[test]
fn detach_1() {
    let doc = Document::new();
    let mut root = doc.root();
    let a = doc.create_element("a");
    let mut b = doc.create_element("b");
    let c = doc.create_element("c");

    root.append(&a);
    root.append(&b);
    root.append(&c);

    b.detach();

    assert_eq!(tags(&root), ["a", "c"]);
    assert_eq!(b.parent(), None);
    assert_eq!(b.previous_sibling(), None);
    assert_eq!(b.next_sibling(), None);
    assert_eq!(a.next_sibling(), Some(c));
}

#[test]
fn detach_edges() {
    let doc = Document::new();
    let mut root = doc.root();
    let mut a = doc.create_element("a");
    let b = doc.create_element("b");

    root.append(&a);
    root.append(&b);

    a.detach();
    assert_eq!(root.first_child(), Some(b.clone()));
    assert_eq!(root.last_child(), Some(b.clone()));

    b.clone().detach();
    assert!(!root.has_children());
}

#[test]
fn reappend_moves() {
    let doc = Document::new();
    let mut root = doc.root();
    let a = doc.create_element("a");
    let b = doc.create_element("b");

    root.append(&a);
    root.append(&b);

    // appending an attached node moves it
    root.append(&a);
    assert_eq!(tags(&root), ["b", "a"]);
}

#[test]
fn iterators_1() {
    let doc = Document::new();
    let mut root = doc.root();
    let mut a = doc.create_element("a");
    let b = doc.create_element("b");
    let c = doc.create_element("c");

    root.append(&a);
    a.append(&b);
    root.append(&c);

    let names: Vec<String> = root.descendants().map(|n| n.tag_name().clone()).collect();
    assert_eq!(names, ["", "a", "b", "c"]);

    let ancestors: Vec<Node> = b.ancestors().collect();
    assert_eq!(ancestors, [b.clone(), a.clone(), root.clone()]);

    assert_eq!(c.preceding_siblings().count(), 2);
    assert_eq!(a.following_siblings().count(), 2);
}

#[test]
fn child_index_1() {
    let doc = Document::new();
    let mut root = doc.root();
    let a = doc.create_element("a");
    let b = doc.create_element("b");

    root.append(&a);
    root.append(&b);

    assert_eq!(a.child_index(), 0);
    assert_eq!(b.child_index(), 1);
    assert_eq!(doc.create_element("x").child_index(), 0);
}

#[test]
fn contains_1() {
    let doc = Document::new();
    let mut root = doc.root();
    let mut a = doc.create_element("a");
    let b = doc.create_element("b");
    let c = doc.create_element("c");

    root.append(&a);
    a.append(&b);
    root.append(&c);

    assert!(root.contains(&b));
    assert!(a.contains(&b));
    assert!(a.contains(&a));
    assert!(!a.contains(&c));
    assert_eq!(b.tree_root(), root);
}

#[test]
fn node_types() {
    let doc = Document::new();
    let root = doc.root();
    let a = doc.create_element("a");
    let t = doc.create_text("hi");
    let c = doc.create_comment("note");

    assert_eq!(root.node_type(), NodeType::Root);
    assert!(a.is_element());
    assert!(t.is_text());
    assert!(c.is_comment());
    assert!(t.is_character_data());
    assert!(c.is_character_data());
    assert!(!a.is_character_data());
    assert_eq!(*t.text(), "hi");
}

#[test]
fn attributes_1() {
    let doc = Document::new();
    let mut a = doc.create_element("a");

    a.set_attribute("class", "x");
    a.set_attribute("id", "1");
    assert_eq!(a.attribute("class").as_deref(), Some("x"));
    assert_eq!(a.attributes().len(), 2);

    // overwriting keeps a single entry
    a.set_attribute("class", "y");
    assert_eq!(a.attribute("class").as_deref(), Some("y"));
    assert_eq!(a.attributes().len(), 2);

    a.remove_attribute("class");
    assert!(!a.has_attribute("class"));
    assert_eq!(a.attributes().len(), 1);
}

#[test]
fn node_identity() {
    let doc = Document::new();
    let mut root = doc.root();
    let a = doc.create_element("a");
    let b = doc.create_element("a");
    root.append(&a);
    root.append(&b);

    // equality is by identity, not by content
    assert_ne!(a, b);
    assert_eq!(a, a.clone());
    assert!(a.same_node(&root.first_child().unwrap()));

    // nodes are usable as hash map keys
    let mut map = HashMap::new();
    map.insert(a.clone(), 1);
    map.insert(b.clone(), 2);
    assert_eq!(map[&a], 1);
    assert_eq!(map[&b], 2);
}

#[test]
fn text_nodes() {
    let doc = Document::new();
    let mut root = doc.root();
    let mut t = doc.create_text("hi");
    root.append(&t);

    t.set_text("hello");
    assert_eq!(*root.first_child().unwrap().text(), "hello");
}
