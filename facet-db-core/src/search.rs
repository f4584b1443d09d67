//! Lookup, search, flatten, and merge across a selection tree.
//!
//! Every traversal here is iterative. Each visited list is locked only long
//! enough to snapshot its entries; children are visited after the parent's
//! lock is released.

use crate::error::Result;
use crate::list::SelectionList;
use crate::node::{SelectionNode, ValueNode};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

impl SelectionList {
    /// First entry whose canonical value equals `value`, in pre-order.
    ///
    /// With `recursive = false` only the top-level entries are inspected.
    pub fn find_value(&self, value: &str, recursive: bool) -> Result<Option<SelectionNode>> {
        let mut stack = vec![self.entries()?.into_iter()];
        while let Some(iter) = stack.last_mut() {
            let Some(node) = iter.next() else {
                stack.pop();
                continue;
            };
            if node.value() == Some(value) {
                return Ok(Some(node));
            }
            if recursive {
                if let Some(c) = node.as_composite() {
                    let children = c.children().entries()?;
                    stack.push(children.into_iter());
                }
            }
        }
        Ok(None)
    }

    /// New list of the entries matching `query`.
    ///
    /// An entry is kept when its label matches, or, with `invert_selected`,
    /// when it is selected. Composites follow
    /// [`CompositeValueNode::find_all`](crate::CompositeValueNode::find_all).
    pub fn find_all(&self, query: Option<&str>, invert_selected: bool) -> Result<SelectionList> {
        let mut found = Vec::new();
        for node in self.entries()? {
            match &node {
                SelectionNode::Composite(c) => {
                    if let Some(hit) = c.find_all(query, invert_selected)? {
                        found.push(SelectionNode::Composite(hit));
                    }
                }
                SelectionNode::Leaf(v) | SelectionNode::UpperExclusiveEnd(v) => {
                    if v.matches(query) || (invert_selected && v.is_selected()) {
                        found.push(node.clone());
                    }
                }
            }
        }
        Ok(self.derived(found, true))
    }

    /// Whether any node in the tree matches `query`.
    pub(crate) fn any_match(&self, query: Option<&str>) -> Result<bool> {
        let mut pending = vec![self.entries()?];
        while let Some(entries) = pending.pop() {
            if entries.iter().any(|n| n.matches(query, false)) {
                return Ok(true);
            }
            for child in composite_children_of(&entries) {
                pending.push(child.entries()?);
            }
        }
        Ok(false)
    }

    /// Every value node in the tree, pre-order (a composite precedes its
    /// children). Each child list is visited at most once.
    pub fn get_all_values(&self) -> Result<Vec<ValueNode>> {
        let mut out = Vec::new();
        let mut visited: FxHashSet<u64> = FxHashSet::default();
        visited.insert(self.id());

        let mut stack = vec![self.entries()?.into_iter()];
        while let Some(iter) = stack.last_mut() {
            let Some(node) = iter.next() else {
                stack.pop();
                continue;
            };
            out.push(node.value_node().clone());
            if let Some(c) = node.as_composite() {
                if visited.insert(c.children().id()) {
                    let children = c.children().entries()?;
                    stack.push(children.into_iter());
                }
            }
        }
        Ok(out)
    }

    /// Union `other` into this list, matching entries by canonical value.
    ///
    /// - no match: the incoming entry is appended
    /// - both composite: their child lists are merged the same way
    /// - otherwise: the existing entry is kept and the incoming one dropped
    ///
    /// `other` is deep-copied first, so no node is ever shared between the two
    /// trees and `other` is left untouched.
    pub fn merge(&self, other: &SelectionList) -> Result<()> {
        if std::ptr::eq(self, other) {
            return Ok(());
        }
        let incoming = other.deep_clone()?.entries()?;
        let mut pending: Vec<(Arc<SelectionList>, Arc<SelectionList>)> = Vec::new();
        self.merge_local(incoming, &mut pending)?;
        while let Some((target, source)) = pending.pop() {
            if Arc::ptr_eq(&target, &source) {
                continue;
            }
            let incoming = source.entries()?;
            target.merge_local(incoming, &mut pending)?;
        }
        Ok(())
    }

    fn merge_local(
        &self,
        incoming: Vec<SelectionNode>,
        pending: &mut Vec<(Arc<SelectionList>, Arc<SelectionList>)>,
    ) -> Result<()> {
        let mut inner = self.lock_resident()?;
        let mut by_value: FxHashMap<Option<String>, usize> = FxHashMap::default();
        for (i, node) in inner.nodes().enumerate() {
            by_value
                .entry(node.value().map(str::to_string))
                .or_insert(i);
        }

        for node in incoming {
            let key = node.value().map(str::to_string);
            match by_value.get(&key).copied() {
                None => {
                    by_value.insert(key, inner.entries.len());
                    inner.entries.push(Some(node));
                }
                Some(i) => {
                    let existing = inner.entries[i].as_ref().and_then(SelectionNode::as_composite);
                    if let (Some(existing), Some(new)) = (existing, node.as_composite()) {
                        pending.push((Arc::clone(existing.children()), Arc::clone(new.children())));
                    }
                }
            }
        }
        Ok(())
    }
}

fn composite_children_of(entries: &[SelectionNode]) -> impl Iterator<Item = Arc<SelectionList>> + '_ {
    entries
        .iter()
        .filter_map(|n| n.as_composite().map(|c| Arc::clone(c.children())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::CompositeValueNode;
    use crate::state::ValueState;

    fn tree() -> SelectionList {
        let list = SelectionList::new("string");
        let ma = list.new_child();
        ma.set_entries(vec![
            SelectionNode::leaf("Boston", "BOS"),
            SelectionNode::leaf("Worcester", "WOR"),
        ])
        .unwrap();
        let ny = list.new_child();
        ny.set_entries(vec![SelectionNode::leaf("New York City", "NYC")])
            .unwrap();
        list.set_entries(vec![
            SelectionNode::Composite(CompositeValueNode::new(ValueNode::new("Massachusetts", "MA"), ma)),
            SelectionNode::Composite(CompositeValueNode::new(ValueNode::new("New York", "NY"), ny)),
            SelectionNode::Leaf(ValueNode::with_state("Other", "OT", ValueState::SELECTED)),
        ])
        .unwrap();
        list
    }

    fn values(list: &SelectionList) -> Vec<String> {
        list.entries()
            .unwrap()
            .iter()
            .map(|n| n.value().unwrap_or("").to_string())
            .collect()
    }

    #[test]
    fn test_find_value() {
        let list = tree();
        assert_eq!(list.find_value("WOR", true).unwrap().unwrap().label(), Some("Worcester"));
        assert!(list.find_value("WOR", false).unwrap().is_none());
        assert_eq!(list.find_value("NY", false).unwrap().unwrap().label(), Some("New York"));
        assert!(list.find_value("LA", true).unwrap().is_none());
    }

    #[test]
    fn test_find_all_keeps_ancestor_context() {
        let list = tree();
        let found = list.find_all(Some("boston"), false).unwrap();
        assert_eq!(values(&found), vec!["MA"]);
        let children = &found.child_lists()[0];
        assert_eq!(values(children), vec!["BOS"]);
        // source tree untouched
        assert_eq!(values(&list.child_lists()[0]), vec!["BOS", "WOR"]);
    }

    #[test]
    fn test_find_all_direct_match_keeps_whole_subtree() {
        let list = tree();
        let found = list.find_all(Some("york"), false).unwrap();
        assert_eq!(values(&found), vec!["NY"]);
        assert_eq!(values(&found.child_lists()[0]), vec!["NYC"]);
    }

    #[test]
    fn test_find_all_invert_selected() {
        let list = tree();
        let found = list.find_all(Some("boston"), true).unwrap();
        assert_eq!(values(&found), vec!["MA", "OT"]);
        let none = list.find_all(Some("zzz"), false).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_get_all_values_pre_order() {
        let list = tree();
        let all: Vec<String> = list
            .get_all_values()
            .unwrap()
            .iter()
            .map(|v| v.value().unwrap().to_string())
            .collect();
        assert_eq!(all, vec!["MA", "BOS", "WOR", "NY", "NYC", "OT"]);
    }

    #[test]
    fn test_get_all_values_visits_shared_child_once() {
        let list = SelectionList::new("string");
        let shared = list.new_child();
        shared.add(SelectionNode::leaf("x", "x")).unwrap();
        let a = CompositeValueNode::new(ValueNode::new("a", "a"), shared);
        let b = a.clone(); // shares the child list handle
        list.set_entries(vec![SelectionNode::Composite(a), SelectionNode::Composite(b)])
            .unwrap();
        assert_eq!(list.get_all_values().unwrap().len(), 3);
    }

    #[test]
    fn test_merge_appends_and_recurses() {
        let list = tree();
        let other = SelectionList::new("string");
        let ma = other.new_child();
        ma.add(SelectionNode::leaf("Springfield", "SPR")).unwrap();
        ma.add(SelectionNode::Leaf(ValueNode::with_state("Boston", "BOS", ValueState::EXCLUDED)))
            .unwrap();
        other
            .set_entries(vec![
                SelectionNode::Composite(CompositeValueNode::new(ValueNode::new("Massachusetts", "MA"), ma)),
                SelectionNode::leaf("Texas", "TX"),
            ])
            .unwrap();

        list.merge(&other).unwrap();
        assert_eq!(values(&list), vec!["MA", "NY", "OT", "TX"]);
        let ma = &list.child_lists()[0];
        assert_eq!(values(ma), vec!["BOS", "WOR", "SPR"]);
        // existing leaf wins on collision
        assert_eq!(ma.get(0).unwrap().unwrap().state(), ValueState::NONE);
    }

    #[test]
    fn test_merge_leaf_collision_keeps_existing() {
        let list = SelectionList::new("string");
        list.add(SelectionNode::leaf("a", "a")).unwrap();
        let other = SelectionList::new("string");
        other
            .add(SelectionNode::Leaf(ValueNode::with_state("A!", "a", ValueState::SELECTED)))
            .unwrap();
        list.merge(&other).unwrap();
        let entries = list.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label(), Some("a"));
        assert!(!entries[0].is_selected());
    }

    #[test]
    fn test_merge_with_self_is_noop() {
        let list = tree();
        list.merge(&list).unwrap();
        assert_eq!(values(&list), vec!["MA", "NY", "OT"]);
    }

    #[test]
    fn test_merge_does_not_share_nodes() {
        let list = SelectionList::new("string");
        let other = tree();
        list.merge(&other).unwrap();
        let mine = list.child_lists();
        let theirs = other.child_lists();
        assert!(!Arc::ptr_eq(&mine[0], &theirs[0]));
        mine[0].add(SelectionNode::leaf("extra", "EX")).unwrap();
        assert_eq!(theirs[0].len(), 2);
    }
}
