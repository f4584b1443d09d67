//! Ordering, merge, and search behavior of whole selection trees.

use facet_db_core::{
    CompositeValueNode, SelectionList, SelectionNode, SortKind, ValueNode, ValueState,
};

fn leaf(label: &str, state: ValueState) -> SelectionNode {
    SelectionNode::Leaf(ValueNode::with_state(label, label, state))
}

fn labels(list: &SelectionList) -> Vec<String> {
    list.entries()
        .unwrap()
        .iter()
        .filter_map(|n| n.label().map(str::to_string))
        .collect()
}

#[test]
fn specific_sort_puts_selected_first_and_excluded_last() {
    let list = SelectionList::new("string");
    list.set_entries(vec![
        leaf("A", ValueState::INCLUDED),
        leaf("B", ValueState::SELECTED),
        leaf("C", ValueState::EXCLUDED),
    ])
    .unwrap();

    list.sort(SortKind::Specific).unwrap();
    assert_eq!(labels(&list), vec!["B", "A", "C"]);

    // sorting again changes nothing
    list.sort(SortKind::Specific).unwrap();
    assert_eq!(labels(&list), vec!["B", "A", "C"]);
}

#[test]
fn specific_sort_ranks_every_selected_before_excluded_only() {
    let list = SelectionList::new("string");
    let states = [
        ValueState::EXCLUDED,
        ValueState::NONE,
        ValueState::SELECTED | ValueState::EXCLUDED,
        ValueState::INCLUDED,
        ValueState::SELECTED | ValueState::INCLUDED,
        ValueState::EXCLUDED,
        ValueState::SELECTED,
    ];
    list.set_entries(
        states
            .iter()
            .enumerate()
            .map(|(i, s)| leaf(&format!("n{i}"), *s))
            .collect(),
    )
    .unwrap();
    list.sort(SortKind::Specific).unwrap();

    let entries = list.entries().unwrap();
    let last_selected = entries.iter().rposition(|n| n.is_selected()).unwrap();
    let first_excluded_only = entries
        .iter()
        .position(|n| n.is_excluded() && !n.is_selected())
        .unwrap();
    assert!(last_selected < first_excluded_only);
}

#[test]
fn range_labels_sort_by_lower_bound() {
    let list = SelectionList::new("string");
    list.set_entries(
        [">100", "50-75", "<0", "0-50", "75-100"]
            .iter()
            .map(|v| SelectionNode::leaf(*v, *v))
            .collect(),
    )
    .unwrap();

    list.sort(SortKind::Asc).unwrap();
    assert_eq!(labels(&list), vec!["<0", "0-50", "50-75", "75-100", ">100"]);

    list.sort(SortKind::Desc).unwrap();
    assert_eq!(labels(&list), vec![">100", "75-100", "50-75", "0-50", "<0"]);
}

#[test]
fn range_desc_keeps_empty_value_last() {
    let list = SelectionList::new("string");
    list.set_entries(
        ["", ">100", "<0", "50-75"]
            .iter()
            .map(|v| SelectionNode::leaf(*v, *v))
            .collect(),
    )
    .unwrap();

    list.sort(SortKind::Desc).unwrap();
    assert_eq!(labels(&list), vec![">100", "50-75", "<0", ""]);

    list.sort(SortKind::Asc).unwrap();
    assert_eq!(labels(&list), vec!["<0", "50-75", ">100", ""]);
}

#[test]
fn specific_sort_on_range_domain_ranks_by_state() {
    let list = SelectionList::new("string");
    list.set_entries(vec![
        leaf(">100", ValueState::SELECTED),
        leaf("<0", ValueState::EXCLUDED),
        leaf("50-75", ValueState::INCLUDED),
    ])
    .unwrap();

    list.sort(SortKind::Specific).unwrap();
    assert_eq!(labels(&list), vec![">100", "50-75", "<0"]);
}

#[test]
fn value_sort_on_range_domain_orders_by_measure() {
    let list = SelectionList::new("string");
    let measured = |label: &str, measure: f64| {
        let mut v = ValueNode::new(label, label);
        v.set_measure_value(measure);
        v.set_measure_label(Some(format!("{measure}")));
        SelectionNode::Leaf(v)
    };
    list.set_entries(vec![
        measured("<0", 0.9),
        measured(">100", 0.1),
        measured("50-75", 0.5),
    ])
    .unwrap();

    list.sort(SortKind::ValueAsc).unwrap();
    assert_eq!(labels(&list), vec![">100", "50-75", "<0"]);

    list.sort(SortKind::ValueDesc).unwrap();
    assert_eq!(labels(&list), vec!["<0", "50-75", ">100"]);
}

#[test]
fn sort_reaches_nested_lists() {
    let list = SelectionList::new("string");
    let children = list.new_child();
    children
        .set_entries(vec![SelectionNode::leaf("z", "z"), SelectionNode::leaf("a", "a")])
        .unwrap();
    list.set_entries(vec![
        SelectionNode::leaf("y", "y"),
        SelectionNode::Composite(CompositeValueNode::new(ValueNode::new("b", "b"), children)),
    ])
    .unwrap();

    list.sort(SortKind::Asc).unwrap();
    assert_eq!(labels(&list), vec!["b", "y"]);
    assert_eq!(labels(&list.child_lists()[0]), vec!["a", "z"]);
}

#[test]
fn merge_with_deep_copy_is_idempotent() {
    let list = SelectionList::new("string");
    let children = list.new_child();
    children.add(SelectionNode::leaf("Boston", "BOS")).unwrap();
    list.set_entries(vec![
        SelectionNode::Composite(CompositeValueNode::new(ValueNode::new("MA", "MA"), children)),
        SelectionNode::leaf("TX", "TX"),
    ])
    .unwrap();

    let before = list.get_all_values().unwrap();
    let copy = list.deep_clone().unwrap();
    list.merge(&copy).unwrap();
    assert_eq!(list.get_all_values().unwrap(), before);
}

#[test]
fn merge_adds_new_values_and_keeps_existing_leaves() {
    let list = SelectionList::new("string");
    list.set_entries(vec![leaf("A", ValueState::SELECTED)]).unwrap();

    let other = SelectionList::new("string");
    other
        .set_entries(vec![leaf("A", ValueState::EXCLUDED), leaf("B", ValueState::NONE)])
        .unwrap();

    list.merge(&other).unwrap();
    let entries = list.entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].is_selected());
    assert!(!entries[0].is_excluded());
    assert_eq!(entries[1].value(), Some("B"));

    // the source is left untouched
    assert_eq!(other.len(), 2);
}

#[test]
fn find_all_filters_by_label_and_keeps_selected() {
    let list = SelectionList::new("string");
    list.set_entries(vec![
        leaf("Apple", ValueState::SELECTED),
        leaf("Banana", ValueState::NONE),
        leaf("Pineapple", ValueState::NONE),
    ])
    .unwrap();

    let found = list.find_all(Some("APPLE"), false).unwrap();
    assert_eq!(labels(&found), vec!["Apple", "Pineapple"]);
    assert!(found.is_completed());

    // selected entries survive a non-matching query when asked to
    let with_selected = list.find_all(Some("ban"), true).unwrap();
    assert_eq!(labels(&with_selected), vec!["Apple", "Banana"]);
    let plain = list.find_all(Some("ban"), false).unwrap();
    assert_eq!(labels(&plain), vec!["Banana"]);

    // no query matches everything
    assert_eq!(list.find_all(None, false).unwrap().len(), 3);
}
