//! Compact paged JSON form for UI payloads.
//!
//! ## Paging
//!
//! Top-level entries inside `[start, start + count)` are always emitted.
//! Entries outside the window are emitted only when selected or included;
//! the rest are counted in `skipped`. Entries at or past `max` are not
//! inspected at all; `others` tells the UI there is more beyond `max`.
//!
//! ## Format dedup
//!
//! Shared composite formats are numbered by a [`FormatIndex`] rebuilt for
//! every pass (first seen wins). The first entry referencing a format carries
//! its definition; later ones carry only the id. Entries are written in
//! pre-order, and [`PagedList::decode`] relies on that to resolve references.

use crate::context::SwapContext;
use crate::error::{Result, SelectionError};
use crate::format::{CompositeFormat, FormatIndex, Formatter};
use crate::list::SelectionList;
use crate::node::{CompositeValueNode, NodeKind, SelectionNode, ValueNode};
use crate::state::ValueState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Window of a paged request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub start: usize,
    pub count: usize,
    /// Entries at or past this index are never inspected.
    pub max: Option<usize>,
    /// Report whether entries exist past `max`.
    pub show_others: bool,
}

impl PageRequest {
    pub fn new(start: usize, count: usize) -> Self {
        Self {
            start,
            count,
            max: None,
            show_others: false,
        }
    }

    pub fn with_max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_show_others(mut self, show: bool) -> Self {
        self.show_others = show;
        self
    }

    fn in_window(&self, index: usize) -> bool {
        index >= self.start && index - self.start < self.count
    }
}

/// Paged payload of one list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedList {
    #[serde(rename = "dt")]
    pub data_type: String,
    /// Total entries in the list.
    #[serde(rename = "n")]
    pub total: usize,
    /// Entries outside the window that were not emitted.
    #[serde(rename = "sk")]
    pub skipped: usize,
    #[serde(rename = "ot", default, skip_serializing_if = "std::ops::Not::not")]
    pub others: bool,
    #[serde(rename = "e")]
    pub entries: Vec<PagedEntry>,
}

/// One emitted entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedEntry {
    /// Position in the source list.
    #[serde(rename = "i")]
    pub index: usize,
    #[serde(rename = "k")]
    pub kind: NodeKind,
    #[serde(rename = "l", default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "o", default, skip_serializing_if = "Option::is_none")]
    pub original_label: Option<String>,
    #[serde(rename = "s", default)]
    pub state: ValueState,
    #[serde(rename = "lv", default, skip_serializing_if = "is_zero")]
    pub level: i32,
    #[serde(rename = "m", default, skip_serializing_if = "Option::is_none")]
    pub measure_value: Option<f64>,
    #[serde(rename = "ml", default, skip_serializing_if = "Option::is_none")]
    pub measure_label: Option<String>,
    #[serde(rename = "f", default, skip_serializing_if = "Option::is_none")]
    pub format: Option<PagedFormat>,
    #[serde(rename = "df", default, skip_serializing_if = "Option::is_none")]
    pub default_format: Option<Formatter>,
    /// Children of a composite, emitted in full.
    #[serde(rename = "c", default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<PagedEntry>>,
}

/// Deduplicated composite format reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedFormat {
    pub id: u32,
    /// Present on the first reference of the pass only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub def: Option<CompositeFormat>,
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

fn encode_entry(index: usize, node: &SelectionNode, formats: &mut FormatIndex) -> Result<PagedEntry> {
    let v = node.value_node();
    let format = v.format().map(|f| {
        let (id, first) = formats.intern(f);
        PagedFormat {
            id,
            def: first.then(|| f.as_ref().clone()),
        }
    });
    let original_label = match (v.original_label(), v.label()) {
        (Some(orig), Some(label)) if orig == label => None,
        (orig, _) => orig.map(str::to_string),
    };
    let mut entry = PagedEntry {
        index,
        kind: node.kind(),
        label: v.label().map(str::to_string),
        value: v.value().map(str::to_string),
        original_label,
        state: v.state(),
        level: v.level(),
        measure_value: (!v.measure_value().is_nan()).then_some(v.measure_value()),
        measure_label: v.measure_label().map(str::to_string),
        format,
        default_format: v.default_format().map(|f| f.as_ref().clone()),
        children: None,
    };
    if let SelectionNode::Composite(c) = node {
        let children = c.children().entries()?;
        let mut out = Vec::with_capacity(children.len());
        for (i, child) in children.iter().enumerate() {
            out.push(encode_entry(i, child, formats)?);
        }
        entry.children = Some(out);
    }
    Ok(entry)
}

impl SelectionList {
    /// Paged, format-deduplicated snapshot.
    pub fn to_paged(&self, request: &PageRequest) -> Result<PagedList> {
        let entries = self.entries()?;
        let limit = request.max.map_or(entries.len(), |m| m.min(entries.len()));
        let mut formats = FormatIndex::new();
        let mut out = Vec::new();
        let mut skipped = 0usize;

        for (i, node) in entries.iter().enumerate().take(limit) {
            let chosen = node
                .state()
                .intersects(ValueState::SELECTED | ValueState::INCLUDED);
            if request.in_window(i) || chosen {
                out.push(encode_entry(i, node, &mut formats)?);
            } else {
                skipped += 1;
            }
        }

        Ok(PagedList {
            data_type: self.data_type(),
            total: entries.len(),
            skipped,
            others: request.show_others && entries.len() > limit,
            entries: out,
        })
    }
}

impl PagedList {
    /// Rebuild `(index, node)` pairs. Entries sharing a format id share one
    /// `Arc` again. Composite children get lists created under `ctx`.
    pub fn decode(&self, ctx: &SwapContext) -> Result<Vec<(usize, SelectionNode)>> {
        let mut formats: Vec<Arc<CompositeFormat>> = Vec::new();
        let mut out = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let node = decode_entry(entry, &self.data_type, ctx, &mut formats)?;
            out.push((entry.index, node));
        }
        Ok(out)
    }
}

/// Definitions arrive in id order because numbering is first-seen and
/// entries are written in pre-order.
fn resolve_format(format: &PagedFormat, formats: &mut Vec<Arc<CompositeFormat>>) -> Result<Arc<CompositeFormat>> {
    let id = format.id as usize;
    match &format.def {
        Some(def) => {
            if id != formats.len() {
                return Err(SelectionError::decode(format!(
                    "format {} defined out of sequence (expected {})",
                    id,
                    formats.len()
                )));
            }
            let shared = Arc::new(def.clone());
            formats.push(Arc::clone(&shared));
            Ok(shared)
        }
        None => formats.get(id).cloned().ok_or_else(|| {
            SelectionError::decode(format!("format {} referenced before definition", id))
        }),
    }
}

fn decode_entry(
    entry: &PagedEntry,
    data_type: &str,
    ctx: &SwapContext,
    formats: &mut Vec<Arc<CompositeFormat>>,
) -> Result<SelectionNode> {
    let mut v = ValueNode::default();
    v.set_label_raw(entry.label.clone());
    v.set_original_label(entry.original_label.clone().or_else(|| entry.label.clone()));
    v.set_value(entry.value.clone());
    v.set_state(entry.state);
    v.set_level(entry.level);
    v.set_measure_value(entry.measure_value.unwrap_or(f64::NAN));
    v.set_measure_label(entry.measure_label.clone());
    v.set_default_format(entry.default_format.clone().map(Arc::new));
    if let Some(f) = &entry.format {
        v.set_format(Some(resolve_format(f, formats)?));
    }

    Ok(match (entry.kind, &entry.children) {
        (NodeKind::Composite, Some(children)) => {
            let list = SelectionList::with_context(data_type, ctx.clone());
            let mut nodes = Vec::with_capacity(children.len());
            for child in children {
                nodes.push(decode_entry(child, data_type, ctx, formats)?);
            }
            list.set_entries(nodes)?;
            SelectionNode::Composite(CompositeValueNode::new(v, list))
        }
        (NodeKind::Composite, None) => {
            return Err(SelectionError::decode(format!(
                "entry {}: composite node without children",
                entry.index
            )));
        }
        (_, Some(_)) => {
            return Err(SelectionError::decode(format!(
                "entry {}: {:?} node cannot have children",
                entry.index, entry.kind
            )));
        }
        (NodeKind::Leaf, None) => SelectionNode::Leaf(v),
        (NodeKind::UpperExclusiveEnd, None) => SelectionNode::UpperExclusiveEnd(v),
    })
}
