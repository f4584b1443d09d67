//! Paged payloads: window selection, format dedup, and decoding.

use facet_db_core::{
    CompositeFormat, CompositeValueNode, PageRequest, PagedList, SelectionList, SelectionNode,
    SwapContext, ValueNode, ValueState,
};
use std::sync::Arc;

fn list_with_states(states: &[ValueState]) -> SelectionList {
    let list = SelectionList::new("string");
    list.set_entries(
        states
            .iter()
            .enumerate()
            .map(|(i, s)| SelectionNode::Leaf(ValueNode::with_state(format!("v{i}"), format!("v{i}"), *s)))
            .collect(),
    )
    .unwrap();
    list
}

fn indexes(page: &PagedList) -> Vec<usize> {
    page.entries.iter().map(|e| e.index).collect()
}

#[test]
fn window_plus_selected_outside() {
    let list = list_with_states(&[
        ValueState::NONE,
        ValueState::NONE,
        ValueState::NONE,
        ValueState::EXCLUDED,
        ValueState::SELECTED,
    ]);
    let page = list.to_paged(&PageRequest::new(0, 2)).unwrap();
    assert_eq!(indexes(&page), vec![0, 1, 4]);
    assert_eq!(page.skipped, 2);
    assert_eq!(page.total, 5);
    assert!(!page.others);
}

#[test]
fn included_entries_escape_the_window_too() {
    let list = list_with_states(&[
        ValueState::INCLUDED,
        ValueState::NONE,
        ValueState::NONE,
        ValueState::NONE,
    ]);
    let page = list.to_paged(&PageRequest::new(2, 10)).unwrap();
    assert_eq!(indexes(&page), vec![0, 2, 3]);
    assert_eq!(page.skipped, 1);
}

#[test]
fn max_stops_inspection_and_reports_others() {
    let list = list_with_states(&[
        ValueState::NONE,
        ValueState::NONE,
        ValueState::NONE,
        ValueState::SELECTED,
    ]);
    let request = PageRequest::new(0, 1).with_max(3).with_show_others(true);
    let page = list.to_paged(&request).unwrap();
    // the selected entry at index 3 lies past max and is not inspected
    assert_eq!(indexes(&page), vec![0]);
    assert_eq!(page.skipped, 2);
    assert!(page.others);

    let quiet = list.to_paged(&PageRequest::new(0, 1).with_max(3)).unwrap();
    assert!(!quiet.others);
}

#[test]
fn shared_format_defined_once_and_shared_after_decode() {
    let shared = Arc::new(CompositeFormat {
        background: Some("#eeeeee".into()),
        ..Default::default()
    });
    let list = SelectionList::new("string");
    let children = list.new_child();
    let mut child = ValueNode::new("Boston", "BOS");
    child.set_format(Some(Arc::clone(&shared)));
    children.add(SelectionNode::Leaf(child)).unwrap();

    let mut top = ValueNode::new("MA", "MA");
    top.set_format(Some(Arc::clone(&shared)));
    let mut other = ValueNode::new("TX", "TX");
    other.set_format(Some(Arc::clone(&shared)));
    list.set_entries(vec![
        SelectionNode::Composite(CompositeValueNode::new(top, children)),
        SelectionNode::Leaf(other),
    ])
    .unwrap();

    let page = list.to_paged(&PageRequest::new(0, 10)).unwrap();
    let first = page.entries[0].format.as_ref().unwrap();
    assert!(first.def.is_some());
    let nested = page.entries[0].children.as_ref().unwrap()[0].format.as_ref().unwrap();
    assert_eq!(nested.id, first.id);
    assert!(nested.def.is_none());
    assert!(page.entries[1].format.as_ref().unwrap().def.is_none());

    // through JSON and back
    let json = serde_json::to_string(&page).unwrap();
    let parsed: PagedList = serde_json::from_str(&json).unwrap();
    let nodes = parsed.decode(&SwapContext::default()).unwrap();
    assert_eq!(nodes.len(), 2);
    let f0 = nodes[0].1.value_node().format().unwrap();
    let f1 = nodes[1].1.value_node().format().unwrap();
    assert!(Arc::ptr_eq(f0, f1));
    assert_eq!(f0.background.as_deref(), Some("#eeeeee"));

    let decoded_child = &nodes[0].1.as_composite().unwrap().children().entries().unwrap()[0];
    assert_eq!(decoded_child.value(), Some("BOS"));
    assert!(Arc::ptr_eq(decoded_child.value_node().format().unwrap(), f0));
}

#[test]
fn each_pass_restarts_format_numbering() {
    let list = SelectionList::new("string");
    let mut v = ValueNode::new("A", "A");
    v.set_format(Some(Arc::new(CompositeFormat::default())));
    list.add(SelectionNode::Leaf(v)).unwrap();

    let first = list.to_paged(&PageRequest::new(0, 1)).unwrap();
    let second = list.to_paged(&PageRequest::new(0, 1)).unwrap();
    assert_eq!(first, second);
    assert!(second.entries[0].format.as_ref().unwrap().def.is_some());
}

#[test]
fn reference_before_definition_is_rejected() {
    let json = r#"{"dt":"string","n":1,"sk":0,"e":[{"i":0,"k":"leaf","l":"A","v":"A","s":0,"f":{"id":0}}]}"#;
    let page: PagedList = serde_json::from_str(json).unwrap();
    assert!(page.decode(&SwapContext::default()).is_err());
}
