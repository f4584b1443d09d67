//! Verbose, self-describing JSON form of a selection tree.
//!
//! Used for bookmark-style snapshots. Formats are always written inline (no
//! dedup) and every node carries its `kind` discriminant. The `levels`
//! parameter bounds how many composite levels are expanded; a composite past
//! the bound is written with `"truncated": true` and no children.

use crate::context::SwapContext;
use crate::error::{Result, SelectionError};
use crate::format::{CompositeFormat, Formatter};
use crate::list::SelectionList;
use crate::node::{CompositeValueNode, NodeKind, SelectionNode, ValueNode};
use crate::state::ValueState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn is_zero(v: &i32) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Verbose form of one list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerboseList {
    pub data_type: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_max: Option<f64>,
    pub entries: Vec<VerboseNode>,
}

/// Verbose form of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerboseNode {
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Written only when different from `label`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_label: Option<String>,
    #[serde(default)]
    pub state: ValueState,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub level: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<CompositeFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_format: Option<Formatter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<VerboseList>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub truncated: bool,
}

fn non_nan(v: f64) -> Option<f64> {
    (!v.is_nan()).then_some(v)
}

impl VerboseNode {
    fn from_value(kind: NodeKind, v: &ValueNode) -> Self {
        let original_label = match (v.original_label(), v.label()) {
            (Some(orig), Some(label)) if orig == label => None,
            (orig, _) => orig.map(str::to_string),
        };
        Self {
            kind,
            label: v.label().map(str::to_string),
            value: v.value().map(str::to_string),
            original_label,
            state: v.state(),
            level: v.level(),
            measure_value: non_nan(v.measure_value()),
            measure_label: v.measure_label().map(str::to_string),
            format: v.format().map(|f| f.as_ref().clone()),
            default_format: v.default_format().map(|f| f.as_ref().clone()),
            children: None,
            truncated: false,
        }
    }

    fn to_value(&self) -> ValueNode {
        let mut v = ValueNode::default();
        v.set_label_raw(self.label.clone());
        v.set_original_label(self.original_label.clone().or_else(|| self.label.clone()));
        v.set_value(self.value.clone());
        v.set_state(self.state);
        v.set_level(self.level);
        v.set_measure_value(self.measure_value.unwrap_or(f64::NAN));
        v.set_measure_label(self.measure_label.clone());
        v.set_format(self.format.clone().map(Arc::new));
        v.set_default_format(self.default_format.clone().map(Arc::new));
        v
    }
}

impl SelectionList {
    /// Verbose snapshot. `levels = None` expands every composite; `Some(n)`
    /// expands `n` levels of children below this list.
    pub fn to_verbose(&self, levels: Option<usize>) -> Result<VerboseList> {
        let entries = self.entries()?;
        let (measure_min, measure_max) = self.measure_range();
        let mut out = Vec::with_capacity(entries.len());
        for node in &entries {
            let mut vn = VerboseNode::from_value(node.kind(), node.value_node());
            if let SelectionNode::Composite(c) = node {
                match levels {
                    Some(0) => vn.truncated = true,
                    _ => {
                        let below = levels.map(|n| n - 1);
                        vn.children = Some(c.children().to_verbose(below)?);
                    }
                }
            }
            out.push(vn);
        }
        Ok(VerboseList {
            data_type: self.data_type(),
            completed: self.is_completed(),
            measure_min: non_nan(measure_min),
            measure_max: non_nan(measure_max),
            entries: out,
        })
    }

    /// Rebuild a list from its verbose form.
    ///
    /// Truncated composites come back with an empty child list. A composite
    /// with neither children nor the truncation marker, or a non-composite
    /// with children, is a decode error.
    pub fn from_verbose(verbose: &VerboseList, ctx: &SwapContext) -> Result<SelectionList> {
        let list = SelectionList::with_context(verbose.data_type.clone(), ctx.clone());
        list.set_measure_range(
            verbose.measure_min.unwrap_or(f64::NAN),
            verbose.measure_max.unwrap_or(f64::NAN),
        );
        let mut nodes = Vec::with_capacity(verbose.entries.len());
        for (i, vn) in verbose.entries.iter().enumerate() {
            let value = vn.to_value();
            let node = match (vn.kind, &vn.children) {
                (NodeKind::Composite, Some(children)) => SelectionNode::Composite(
                    CompositeValueNode::new(value, Self::from_verbose(children, ctx)?),
                ),
                (NodeKind::Composite, None) if vn.truncated => SelectionNode::Composite(
                    CompositeValueNode::new(value, list.new_child()),
                ),
                (NodeKind::Composite, None) => {
                    return Err(SelectionError::decode(format!(
                        "entry {}: composite node without children",
                        i
                    )));
                }
                (_, Some(_)) => {
                    return Err(SelectionError::decode(format!(
                        "entry {}: {:?} node cannot have children",
                        i, vn.kind
                    )));
                }
                (NodeKind::Leaf, None) => SelectionNode::Leaf(value),
                (NodeKind::UpperExclusiveEnd, None) => SelectionNode::UpperExclusiveEnd(value),
            };
            nodes.push(node);
        }
        list.set_entries(nodes)?;
        if verbose.completed {
            list.complete();
        }
        Ok(list)
    }

    /// Verbose snapshot as pretty-printed JSON.
    pub fn to_verbose_json(&self, levels: Option<usize>) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_verbose(levels)?)?)
    }

    /// Parse a verbose JSON snapshot.
    pub fn from_verbose_json(json: &str, ctx: &SwapContext) -> Result<SelectionList> {
        let verbose: VerboseList = serde_json::from_str(json)?;
        Self::from_verbose(&verbose, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatterKind;

    fn sample() -> SelectionList {
        let list = SelectionList::new("string");
        let children = list.new_child();
        let grandchildren = list.new_child();
        grandchildren.add(SelectionNode::leaf("Back Bay", "BB")).unwrap();
        children
            .add(SelectionNode::Composite(CompositeValueNode::new(
                ValueNode::new("Boston", "BOS"),
                grandchildren,
            )))
            .unwrap();

        let mut renamed = ValueNode::with_state("Texas", "TX", ValueState::SELECTED);
        renamed.set_label("Lone Star");
        renamed.set_measure_value(0.5);
        renamed.set_format(Some(Arc::new(CompositeFormat {
            foreground: Some("blue".into()),
            ..Default::default()
        })));
        renamed.set_default_format(Some(Arc::new(Formatter::new(FormatterKind::Text, None))));

        list.set_entries(vec![
            SelectionNode::Composite(CompositeValueNode::new(ValueNode::new("Massachusetts", "MA"), children)),
            SelectionNode::Leaf(renamed),
            SelectionNode::UpperExclusiveEnd(ValueNode::default()),
        ])
        .unwrap();
        list.complete();
        list
    }

    #[test]
    fn test_verbose_json_shape() {
        let json = sample().to_verbose_json(None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["entries"][0]["kind"], "composite");
        assert_eq!(value["entries"][1]["kind"], "leaf");
        assert_eq!(value["entries"][1]["original_label"], "Texas");
        assert_eq!(value["entries"][1]["state"], 1);
        assert_eq!(value["entries"][1]["format"]["foreground"], "blue");
        assert_eq!(value["entries"][2]["kind"], "upper_exclusive_end");
        assert!(value["entries"][0]["label"].is_string());
        assert_eq!(value["completed"], true);
    }

    #[test]
    fn test_verbose_roundtrip_preserves_tree() {
        let list = sample();
        let verbose = list.to_verbose(None).unwrap();
        let back = SelectionList::from_verbose(&verbose, list.context()).unwrap();
        assert_eq!(back.to_verbose(None).unwrap(), verbose);
        assert!(back.is_completed());
        assert_eq!(back.get_all_values().unwrap(), list.get_all_values().unwrap());
    }

    #[test]
    fn test_levels_truncate() {
        let list = sample();
        let v0 = list.to_verbose(Some(0)).unwrap();
        assert!(v0.entries[0].truncated);
        assert!(v0.entries[0].children.is_none());

        let v1 = list.to_verbose(Some(1)).unwrap();
        let children = v1.entries[0].children.as_ref().unwrap();
        assert!(children.entries[0].truncated);

        // truncated composites decode with empty children
        let back = SelectionList::from_verbose(&v0, list.context()).unwrap();
        assert!(back.child_lists()[0].is_empty());
    }

    #[test]
    fn test_missing_children_is_decode_error() {
        let json = r#"{"data_type":"string","entries":[{"kind":"composite","label":"x"}]}"#;
        let err = SelectionList::from_verbose_json(json, &SwapContext::default()).unwrap_err();
        assert!(matches!(err, SelectionError::Decode(_)));
    }

    #[test]
    fn test_leaf_with_children_is_decode_error() {
        let json = r#"{"data_type":"string","entries":[
            {"kind":"leaf","children":{"data_type":"string","entries":[]}}]}"#;
        let err = SelectionList::from_verbose_json(json, &SwapContext::default()).unwrap_err();
        assert!(matches!(err, SelectionError::Decode(_)));
    }

    #[test]
    fn test_unknown_state_bits_dropped() {
        let json = r#"{"data_type":"string","entries":[{"kind":"leaf","label":"x","state":245}]}"#;
        let list = SelectionList::from_verbose_json(json, &SwapContext::default()).unwrap();
        let state = list.entries().unwrap()[0].state();
        assert_eq!(state, ValueState::SELECTED | ValueState::EXCLUDED);
        assert_eq!(state, ValueState::from_bits(245));
    }

    #[test]
    fn test_missing_kind_is_json_error() {
        let json = r#"{"data_type":"string","entries":[{"label":"x"}]}"#;
        let err = SelectionList::from_verbose_json(json, &SwapContext::default()).unwrap_err();
        assert!(matches!(err, SelectionError::Json(_)));
    }
}
