// Copyright 2018 Evgeniy Reizner
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::dom::Node;

/// Key of a native property.
///
/// Character data is a distinguished key rather than a magic attribute
/// name, so it can never collide with a real attribute.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum NativeKey {
    /// The node's character data.
    Data,
    /// An attribute, by qualified name.
    Attribute(String),
}

/// A cached property original with its dirty flag.
///
/// The original value never changes after the first observation;
/// only the dirty flag toggles as further notifications arrive.
#[derive(Clone, Debug)]
pub struct PropEntry {
    pub original: Option<String>,
    pub dirty: bool,
}

/// Property entries of a single node.
#[derive(Default)]
pub struct NodeProps {
    pub native: HashMap<NativeKey, PropEntry>,
    pub custom: HashMap<String, PropEntry>,
}

impl NodeProps {
    fn is_empty(&self) -> bool {
        self.native.is_empty() && self.custom.is_empty()
    }

    fn any_dirty(&self) -> bool {
        self.native.values().chain(self.custom.values()).any(|e| e.dirty)
    }
}

/// Per-node store of attribute, character-data and custom-property
/// originals, with dirty/clean accounting.
pub struct PropertyCache {
    nodes: HashMap<Node, NodeProps>,
    clean: usize,
    dirty: usize,
}

impl PropertyCache {
    pub fn new() -> PropertyCache {
        PropertyCache {
            nodes: HashMap::new(),
            clean: 0,
            dirty: 0,
        }
    }

    /// Records an observation of a native property.
    ///
    /// On the first observation of a key the `old` value is stored as the
    /// original. Later observations only re-derive the dirty flag by
    /// comparing `current` against the stored original.
    pub fn mark_native(
        &mut self,
        node: &Node,
        key: NativeKey,
        current: Option<&str>,
        old: Option<&str>,
    ) {
        let props = self.nodes.entry(node.clone()).or_insert_with(NodeProps::default);
        Self::mark(&mut props.native, key, current, old, &mut self.clean, &mut self.dirty);
    }

    /// Records an observation of a custom property.
    pub fn mark_custom(
        &mut self,
        node: &Node,
        key: &str,
        current: Option<&str>,
        old: Option<&str>,
    ) {
        let props = self.nodes.entry(node.clone()).or_insert_with(NodeProps::default);
        Self::mark(&mut props.custom, key.to_owned(), current, old, &mut self.clean, &mut self.dirty);
    }

    fn mark<K: std::hash::Hash + Eq>(
        map: &mut HashMap<K, PropEntry>,
        key: K,
        current: Option<&str>,
        old: Option<&str>,
        clean: &mut usize,
        dirty: &mut usize,
    ) {
        match map.entry(key) {
            Entry::Occupied(mut e) => {
                let entry = e.get_mut();
                let is_dirty = current != entry.original.as_deref();
                if is_dirty != entry.dirty {
                    if is_dirty {
                        *clean -= 1;
                        *dirty += 1;
                    } else {
                        *dirty -= 1;
                        *clean += 1;
                    }
                    entry.dirty = is_dirty;
                }
            }
            Entry::Vacant(v) => {
                let is_dirty = current != old;
                if is_dirty {
                    *dirty += 1;
                } else {
                    *clean += 1;
                }
                v.insert(PropEntry {
                    original: old.map(str::to_owned),
                    dirty: is_dirty,
                });
            }
        }
    }

    /// The number of nodes with at least one cached entry.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The number of dirty entries across all nodes.
    pub fn dirty_count(&self) -> usize {
        self.dirty
    }

    /// Returns `true` if the node has at least one dirty entry.
    pub fn has_dirty(&self, node: &Node) -> bool {
        self.nodes.get(node).map_or(false, |p| p.any_dirty())
    }

    /// An iterator over the nodes that have at least one dirty entry.
    pub fn dirty_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|(_, props)| props.any_dirty())
            .map(|(node, _)| node)
    }

    /// An iterator over all tracked nodes and their entries.
    pub fn iter(&self) -> impl Iterator<Item = (&Node, &NodeProps)> {
        self.nodes.iter()
    }

    /// Restores every dirty native entry on the live nodes and invokes
    /// `custom_revert` for every dirty custom entry.
    ///
    /// Character data is restored through data assignment; an absent
    /// original attribute value causes attribute removal. Dirty custom
    /// entries with no callback supplied are left untouched.
    pub fn revert(&mut self, custom_revert: Option<&dyn Fn(&mut Node, &str, Option<&str>)>) {
        for (node, props) in &self.nodes {
            let mut node = node.clone();

            for (key, entry) in &props.native {
                if !entry.dirty {
                    continue;
                }

                match key {
                    NativeKey::Data => {
                        node.set_text(entry.original.as_deref().unwrap_or(""));
                    }
                    NativeKey::Attribute(name) => {
                        match entry.original.as_deref() {
                            Some(value) => node.set_attribute(name, value),
                            None => node.remove_attribute(name),
                        }
                    }
                }
            }

            for (key, entry) in &props.custom {
                if !entry.dirty {
                    continue;
                }

                match custom_revert {
                    Some(cb) => cb(&mut node, key, entry.original.as_deref()),
                    None => {
                        debug!("no callback to revert the custom property '{}'", key);
                    }
                }
            }
        }
    }

    /// Drops all clean entries. Returns the number of remaining dirty ones.
    pub fn synchronize(&mut self) -> usize {
        for props in self.nodes.values_mut() {
            props.native.retain(|_, e| e.dirty);
            props.custom.retain(|_, e| e.dirty);
        }
        self.nodes.retain(|_, props| !props.is_empty());

        self.clean = 0;
        debug_assert_eq!(
            self.dirty,
            self.nodes.values().map(|p| p.native.len() + p.custom.len()).sum::<usize>()
        );
        self.dirty
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.clean = 0;
        self.dirty = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn original_survives_updates() {
        let doc = Document::new();
        let a = doc.create_element("a");

        let mut cache = PropertyCache::new();
        cache.mark_native(&a, NativeKey::Attribute("class".into()), Some("y"), Some("x"));
        assert_eq!(cache.dirty_count(), 1);

        // a second update never replaces the original
        cache.mark_native(&a, NativeKey::Attribute("class".into()), Some("z"), Some("y"));
        assert_eq!(cache.dirty_count(), 1);

        // back to the original value: the entry turns clean
        cache.mark_native(&a, NativeKey::Attribute("class".into()), Some("x"), Some("z"));
        assert_eq!(cache.dirty_count(), 0);
        assert!(!cache.has_dirty(&a));
    }

    #[test]
    fn synchronize_drops_clean() {
        let doc = Document::new();
        let a = doc.create_element("a");
        let mut t = doc.create_text("hi");

        let mut cache = PropertyCache::new();
        cache.mark_native(&a, NativeKey::Attribute("class".into()), Some("x"), Some("x"));
        cache.mark_native(&t, NativeKey::Data, Some("hello"), Some("hi"));
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.synchronize(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.has_dirty(&t));

        t.set_text("hi");
        cache.mark_native(&t, NativeKey::Data, Some("hi"), Some("hello"));
        assert_eq!(cache.synchronize(), 0);
        assert!(cache.is_empty());
    }
}
