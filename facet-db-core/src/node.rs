//! Value nodes: the entries of a selection list.
//!
//! A [`SelectionNode`] is a closed tagged variant:
//!
//! | Kind | Payload | Notes |
//! |------|---------|-------|
//! | `Leaf` | [`ValueNode`] | ordinary facet value |
//! | `Composite` | [`CompositeValueNode`] | grouping value owning a child list |
//! | `UpperExclusiveEnd` | [`ValueNode`] | sentinel closing a range domain |
//!
//! The discriminant ([`NodeKind`]) is written explicitly in every serialized
//! form and dispatched with a `match`.
//!
//! Cloning a composite clones the *handle* to its child list; use
//! [`SelectionNode::deep_clone`] for an independent subtree.

use crate::error::Result;
use crate::format::{CompositeFormat, Formatter};
use crate::list::SelectionList;
use crate::state::ValueState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Serialized node discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Leaf,
    Composite,
    UpperExclusiveEnd,
}

impl NodeKind {
    pub fn code(self) -> u8 {
        match self {
            NodeKind::Leaf => 0,
            NodeKind::Composite => 1,
            NodeKind::UpperExclusiveEnd => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(NodeKind::Leaf),
            1 => Some(NodeKind::Composite),
            2 => Some(NodeKind::UpperExclusiveEnd),
            _ => None,
        }
    }
}

/// Case-insensitive substring test. `None` on either side always matches.
pub(crate) fn label_matches(label: Option<&str>, query: Option<&str>) -> bool {
    match (label, query) {
        (Some(label), Some(query)) => label.to_lowercase().contains(&query.to_lowercase()),
        _ => true,
    }
}

// ============================================================================
// ValueNode
// ============================================================================

/// One facet value with its selection state, level, measure, and formats.
#[derive(Clone)]
pub struct ValueNode {
    label: Option<String>,
    value: Option<String>,
    original_label: Option<String>,
    state: ValueState,
    level: i32,
    measure_value: f64,
    measure_label: Option<String>,
    format: Option<Arc<CompositeFormat>>,
    default_format: Option<Arc<Formatter>>,
}

impl Default for ValueNode {
    fn default() -> Self {
        Self {
            label: None,
            value: None,
            original_label: None,
            state: ValueState::NONE,
            level: 0,
            measure_value: f64::NAN,
            measure_label: None,
            format: None,
            default_format: None,
        }
    }
}

impl ValueNode {
    /// Create a node with a label and canonical value.
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        let mut node = Self {
            value: Some(value.into()),
            ..Default::default()
        };
        node.set_label(label);
        node
    }

    /// Create a node with a label, canonical value, and state.
    pub fn with_state(label: impl Into<String>, value: impl Into<String>, state: ValueState) -> Self {
        let mut node = Self::new(label, value);
        node.state = state;
        node
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Set the label. The first call also fixes the original label.
    pub fn set_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        if self.original_label.is_none() {
            self.original_label = Some(label.clone());
        }
        self.label = Some(label);
    }

    /// Label before any later mutation.
    pub fn original_label(&self) -> Option<&str> {
        self.original_label.as_deref()
    }

    pub(crate) fn set_original_label(&mut self, original: Option<String>) {
        self.original_label = original;
    }

    pub(crate) fn set_label_raw(&mut self, label: Option<String>) {
        self.label = label;
    }

    /// Label for display, falling back to the canonical value.
    pub fn display_label(&self) -> Option<&str> {
        self.label.as_deref().or(self.value.as_deref())
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_value(&mut self, value: Option<String>) {
        self.value = value;
    }

    pub fn state(&self) -> ValueState {
        self.state
    }

    pub fn set_state(&mut self, state: ValueState) {
        self.state = state;
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.state.set(ValueState::SELECTED, selected);
    }

    pub fn set_included(&mut self, included: bool) {
        self.state.set(ValueState::INCLUDED, included);
    }

    pub fn set_excluded(&mut self, excluded: bool) {
        self.state.set(ValueState::EXCLUDED, excluded);
    }

    pub fn set_compatible(&mut self, compatible: bool) {
        self.state.set(ValueState::COMPATIBLE, compatible);
    }

    pub fn is_selected(&self) -> bool {
        self.state.contains(ValueState::SELECTED)
    }

    pub fn is_included(&self) -> bool {
        self.state.contains(ValueState::INCLUDED)
    }

    pub fn is_excluded(&self) -> bool {
        self.state.contains(ValueState::EXCLUDED)
    }

    pub fn is_compatible(&self) -> bool {
        self.state.contains(ValueState::COMPATIBLE)
    }

    /// True iff selected, not compatible, and not excluded.
    ///
    /// Excluded values are already shown disabled, and compatible values are
    /// derived state; neither may trigger a downstream recompute.
    pub fn requires_reset(&self) -> bool {
        self.is_selected() && !self.is_compatible() && !self.is_excluded()
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn set_level(&mut self, level: i32) {
        self.level = level;
    }

    /// Normalized measure (0..1), `NaN` when absent.
    pub fn measure_value(&self) -> f64 {
        self.measure_value
    }

    pub fn set_measure_value(&mut self, measure: f64) {
        self.measure_value = measure;
    }

    pub fn measure_label(&self) -> Option<&str> {
        self.measure_label.as_deref()
    }

    pub fn set_measure_label(&mut self, label: Option<String>) {
        self.measure_label = label;
    }

    pub fn format(&self) -> Option<&Arc<CompositeFormat>> {
        self.format.as_ref()
    }

    pub fn set_format(&mut self, format: Option<Arc<CompositeFormat>>) {
        self.format = format;
    }

    pub fn default_format(&self) -> Option<&Arc<Formatter>> {
        self.default_format.as_ref()
    }

    pub fn set_default_format(&mut self, format: Option<Arc<Formatter>>) {
        self.default_format = format;
    }

    /// Case-insensitive substring match of `query` against the label.
    pub fn matches(&self, query: Option<&str>) -> bool {
        label_matches(self.label(), query)
    }
}

impl PartialEq for ValueNode {
    fn eq(&self, other: &Self) -> bool {
        let measure_eq = (self.measure_value.is_nan() && other.measure_value.is_nan())
            || self.measure_value == other.measure_value;
        self.label == other.label
            && self.value == other.value
            && self.original_label == other.original_label
            && self.state == other.state
            && self.level == other.level
            && measure_eq
            && self.measure_label == other.measure_label
            && self.format == other.format
            && self.default_format == other.default_format
    }
}

impl fmt::Debug for ValueNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueNode")
            .field("label", &self.label)
            .field("value", &self.value)
            .field("state", &self.state)
            .field("level", &self.level)
            .field("measure_value", &self.measure_value)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// CompositeValueNode
// ============================================================================

/// Grouping value of a hierarchical facet. Owns one child list.
#[derive(Clone)]
pub struct CompositeValueNode {
    node: ValueNode,
    children: Arc<SelectionList>,
}

impl CompositeValueNode {
    pub fn new(node: ValueNode, children: SelectionList) -> Self {
        Self {
            node,
            children: Arc::new(children),
        }
    }

    pub fn value_node(&self) -> &ValueNode {
        &self.node
    }

    pub fn value_node_mut(&mut self) -> &mut ValueNode {
        &mut self.node
    }

    pub fn children(&self) -> &Arc<SelectionList> {
        &self.children
    }

    /// Union `other`'s children into this node's children (container merge rule).
    pub fn merge_selection_value(&self, other: &CompositeValueNode) -> Result<()> {
        self.children.merge(&other.children)
    }

    /// Search this subtree.
    ///
    /// A node that matches directly is returned whole. A node that fails the
    /// direct match but has matching descendants is returned as a new
    /// composite whose children are the filtered subtree, preserving the
    /// ancestor context of the match.
    pub fn find_all(&self, query: Option<&str>, invert_selected: bool) -> Result<Option<Self>> {
        if self.node.matches(query) || (invert_selected && self.node.is_selected()) {
            return self.deep_clone().map(Some);
        }
        let filtered = self.children.find_all(query, invert_selected)?;
        if filtered.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::new(self.node.clone(), filtered)))
    }

    /// Independent copy of this node and its whole subtree.
    pub fn deep_clone(&self) -> Result<Self> {
        Ok(Self::new(self.node.clone(), self.children.deep_clone()?))
    }

    fn matches_recursive(&self, query: Option<&str>) -> bool {
        self.node.matches(query) || self.children.any_match(query).unwrap_or(false)
    }
}

impl fmt::Debug for CompositeValueNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeValueNode")
            .field("node", &self.node)
            .field("children", &self.children.id())
            .finish()
    }
}

// ============================================================================
// SelectionNode
// ============================================================================

/// Entry of a selection list.
#[derive(Clone, Debug)]
pub enum SelectionNode {
    Leaf(ValueNode),
    Composite(CompositeValueNode),
    UpperExclusiveEnd(ValueNode),
}

impl SelectionNode {
    pub fn leaf(label: impl Into<String>, value: impl Into<String>) -> Self {
        SelectionNode::Leaf(ValueNode::new(label, value))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            SelectionNode::Leaf(_) => NodeKind::Leaf,
            SelectionNode::Composite(_) => NodeKind::Composite,
            SelectionNode::UpperExclusiveEnd(_) => NodeKind::UpperExclusiveEnd,
        }
    }

    pub fn value_node(&self) -> &ValueNode {
        match self {
            SelectionNode::Leaf(v) | SelectionNode::UpperExclusiveEnd(v) => v,
            SelectionNode::Composite(c) => &c.node,
        }
    }

    pub fn value_node_mut(&mut self) -> &mut ValueNode {
        match self {
            SelectionNode::Leaf(v) | SelectionNode::UpperExclusiveEnd(v) => v,
            SelectionNode::Composite(c) => &mut c.node,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeValueNode> {
        match self {
            SelectionNode::Composite(c) => Some(c),
            _ => None,
        }
    }

    /// True for nodes stored in the swap file (everything but composites).
    pub fn is_swappable_leaf(&self) -> bool {
        !matches!(self, SelectionNode::Composite(_))
    }

    pub fn label(&self) -> Option<&str> {
        self.value_node().label()
    }

    pub fn value(&self) -> Option<&str> {
        self.value_node().value()
    }

    pub fn state(&self) -> ValueState {
        self.value_node().state()
    }

    pub fn is_selected(&self) -> bool {
        self.value_node().is_selected()
    }

    pub fn is_included(&self) -> bool {
        self.value_node().is_included()
    }

    pub fn is_excluded(&self) -> bool {
        self.value_node().is_excluded()
    }

    pub fn requires_reset(&self) -> bool {
        self.value_node().requires_reset()
    }

    /// Label match; `recursive` is honored by composites only.
    pub fn matches(&self, query: Option<&str>, recursive: bool) -> bool {
        match self {
            SelectionNode::Composite(c) if recursive => c.matches_recursive(query),
            _ => self.value_node().matches(query),
        }
    }

    /// Independent copy; composites copy their whole subtree.
    pub fn deep_clone(&self) -> Result<Self> {
        Ok(match self {
            SelectionNode::Composite(c) => SelectionNode::Composite(c.deep_clone()?),
            other => other.clone(),
        })
    }
}
