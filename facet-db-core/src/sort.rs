//! Sort kinds and entry comparators.
//!
//! Two comparator families:
//!
//! | Family | Kinds | Key |
//! |--------|-------|-----|
//! | label/measure | `Asc`, `Desc`, `ValueAsc`, `ValueDesc`, `Specific` | label, measure, state rank |
//! | range | any non-`None` kind on range-token domains | parsed lower bound in place of the label |
//!
//! On a range domain the lower bound replaces only the label compare: `Asc`
//! and `Desc` order by it, while `Specific` and the measure kinds keep their
//! primary key and use it as the tie-break. Empty values sort last in both
//! directions.
//!
//! The range family is auto-selected when the data type is string-like and
//! every value among the first `range_lookahead` entries is a range token
//! (`">N"`, `"<N"`, `"N1-N2"`). `UpperExclusiveEnd` sentinels are ordered after
//! every other entry by every kind. All sorts are stable.

use crate::node::{SelectionNode, ValueNode};
use crate::state::ValueState;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Requested ordering of a selection list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortKind {
    /// Keep insertion order (also "original").
    None,
    /// Label ascending
    #[default]
    Asc,
    /// Label descending
    Desc,
    /// Measure ascending, label tie-break
    ValueAsc,
    /// Measure descending, label tie-break
    ValueDesc,
    /// Selection-state rank, label tie-break
    Specific,
}

impl SortKind {
    /// Numeric code used by bookmark payloads.
    pub fn code(self) -> i32 {
        match self {
            SortKind::None => 0,
            SortKind::Asc => 1,
            SortKind::Desc => 2,
            SortKind::ValueAsc => 3,
            SortKind::ValueDesc => 4,
            SortKind::Specific => 5,
        }
    }

    /// Decode a numeric code. Unknown codes fall back to `Asc`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => SortKind::None,
            1 => SortKind::Asc,
            2 => SortKind::Desc,
            3 => SortKind::ValueAsc,
            4 => SortKind::ValueDesc,
            5 => SortKind::Specific,
            _ => SortKind::Asc,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SortKind::None => "none",
            SortKind::Asc => "asc",
            SortKind::Desc => "desc",
            SortKind::ValueAsc => "value-asc",
            SortKind::ValueDesc => "value-desc",
            SortKind::Specific => "specific",
        }
    }

    fn is_descending(self) -> bool {
        matches!(self, SortKind::Desc | SortKind::ValueDesc)
    }
}

impl fmt::Display for SortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lenient parse: unknown names become `Asc`.
impl std::str::FromStr for SortKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().replace('_', "-").as_str() {
            "none" | "original" => SortKind::None,
            "asc" => SortKind::Asc,
            "desc" => SortKind::Desc,
            "value-asc" => SortKind::ValueAsc,
            "value-desc" => SortKind::ValueDesc,
            "specific" => SortKind::Specific,
            other => {
                tracing::debug!(sort = other, "unknown sort kind, using asc");
                SortKind::Asc
            }
        })
    }
}

// ============================================================================
// Label comparators
// ============================================================================

/// Caller-supplied label ordering (replaces the default collator).
pub trait LabelComparator: fmt::Debug + Send + Sync {
    fn compare(&self, a: &str, b: &str) -> Ordering;
}

/// Default text collator: case-insensitive first, raw text as tie-break.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextCollator;

impl LabelComparator for TextCollator {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        let folded = a
            .chars()
            .flat_map(char::to_lowercase)
            .cmp(b.chars().flat_map(char::to_lowercase));
        folded.then_with(|| a.cmp(b))
    }
}

/// Label compare with empty (or missing) labels last in both directions.
fn compare_labels(
    collator: &dyn LabelComparator,
    a: Option<&str>,
    b: Option<&str>,
    descending: bool,
) -> Ordering {
    let a = a.unwrap_or("");
    let b = b.unwrap_or("");
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = collator.compare(a, b);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
    }
}

/// Rank used by `SortKind::Specific`.
///
/// selected (with or without included) = 0, selected+excluded = 1,
/// included-only = 2, neither = 3, excluded-only = 4.
pub fn specific_rank(state: ValueState) -> u8 {
    let selected = state.contains(ValueState::SELECTED);
    let included = state.contains(ValueState::INCLUDED);
    let excluded = state.contains(ValueState::EXCLUDED);
    match (selected, excluded, included) {
        (true, true, _) => 1,
        (true, false, _) => 0,
        (false, false, true) => 2,
        (false, false, false) => 3,
        (false, true, _) => 4,
    }
}

// ============================================================================
// Range tokens
// ============================================================================

/// Parse a range token into its lower bound.
///
/// `">N"` -> `N`, `"<N"` -> `-inf`, `"N1-N2"` -> `N1`. Returns `None` for
/// anything else, including the empty string.
pub fn range_lower_bound(token: &str) -> Option<f64> {
    let token = token.trim();
    if let Some(rest) = token.strip_prefix('>') {
        return rest.trim().parse::<f64>().ok();
    }
    if let Some(rest) = token.strip_prefix('<') {
        return rest.trim().parse::<f64>().ok().map(|_| f64::NEG_INFINITY);
    }
    // Skip a leading sign so "-5-0" splits at the separator.
    let sep = token
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '-')
        .map(|(i, _)| i)?;
    let (lo, hi) = (&token[..sep], &token[sep + 1..]);
    let lo = lo.trim().parse::<f64>().ok()?;
    hi.trim().parse::<f64>().ok()?;
    Some(lo)
}

/// Sort key of a range-family entry; `None` for empty or unparsable values.
fn range_key(node: &ValueNode) -> Option<f64> {
    let raw = node.value().or(node.label()).unwrap_or("");
    if raw.trim().is_empty() {
        return None;
    }
    range_lower_bound(raw)
}

/// Range compare with keyless entries last in both directions.
fn compare_ranges(a: &ValueNode, b: &ValueNode, descending: bool) -> Ordering {
    match (range_key(a), range_key(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = a.total_cmp(&b);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
    }
}

fn is_string_like(data_type: &str) -> bool {
    matches!(
        data_type.to_ascii_lowercase().as_str(),
        "string" | "str" | "text" | "char" | "varchar"
    )
}

/// Whether the range family applies to these entries.
///
/// Every non-empty value among the first `lookahead` resident entries must
/// parse as a range token, and at least one must be present.
pub fn detect_range_domain<'a, I>(data_type: &str, values: I, lookahead: usize) -> bool
where
    I: IntoIterator<Item = &'a SelectionNode>,
{
    if !is_string_like(data_type) {
        return false;
    }
    let mut seen = 0usize;
    for node in values.into_iter().take(lookahead) {
        if matches!(node, SelectionNode::UpperExclusiveEnd(_)) {
            continue;
        }
        let raw = node.value().unwrap_or("");
        if raw.trim().is_empty() {
            continue;
        }
        if range_lower_bound(raw).is_none() {
            return false;
        }
        seen += 1;
    }
    seen > 0
}

// ============================================================================
// NodeComparator
// ============================================================================

/// Comparator resolved for one sort pass over one list.
#[derive(Debug, Clone)]
pub struct NodeComparator {
    kind: SortKind,
    collator: Arc<dyn LabelComparator>,
    range: bool,
}

impl NodeComparator {
    pub fn new(kind: SortKind, collator: Option<Arc<dyn LabelComparator>>, range: bool) -> Self {
        Self {
            kind,
            collator: collator.unwrap_or_else(|| Arc::new(TextCollator)),
            range,
        }
    }

    pub fn kind(&self) -> SortKind {
        self.kind
    }

    pub fn is_range(&self) -> bool {
        self.range
    }

    /// Whether sorting with this comparator changes anything.
    pub fn is_noop(&self) -> bool {
        self.kind == SortKind::None
    }

    pub fn compare(&self, a: &SelectionNode, b: &SelectionNode) -> Ordering {
        let a_end = matches!(a, SelectionNode::UpperExclusiveEnd(_));
        let b_end = matches!(b, SelectionNode::UpperExclusiveEnd(_));
        match (a_end, b_end) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }
        let (a, b) = (a.value_node(), b.value_node());

        match self.kind {
            SortKind::None => Ordering::Equal,
            SortKind::Asc | SortKind::Desc => self.label_order(a, b, self.kind.is_descending()),
            SortKind::ValueAsc | SortKind::ValueDesc => self.measure_order(a, b),
            SortKind::Specific => specific_rank(a.state())
                .cmp(&specific_rank(b.state()))
                .then_with(|| self.label_order(a, b, false)),
        }
    }

    /// Label compare, or lower-bound compare on range domains.
    fn label_order(&self, a: &ValueNode, b: &ValueNode, descending: bool) -> Ordering {
        if self.range {
            return compare_ranges(a, b, descending);
        }
        compare_labels(self.collator.as_ref(), a.label(), b.label(), descending)
    }

    fn measure_order(&self, a: &ValueNode, b: &ValueNode) -> Ordering {
        // no measure label first, in both directions
        let has_a = a.measure_label().is_some();
        let has_b = b.measure_label().is_some();
        if has_a != has_b {
            return has_a.cmp(&has_b);
        }
        let ord = a.measure_value().total_cmp(&b.measure_value());
        let ord = if self.kind.is_descending() {
            ord.reverse()
        } else {
            ord
        };
        ord.then_with(|| self.label_order(a, b, false))
    }

    /// Stable sort of fully resident slots.
    ///
    /// Placeholders compare equal to everything; callers rehydrate first.
    pub(crate) fn sort_slots(&self, slots: &mut [Option<SelectionNode>]) {
        if self.is_noop() {
            return;
        }
        slots.sort_by(|a, b| match (a, b) {
            (Some(a), Some(b)) => self.compare(a, b),
            _ => Ordering::Equal,
        });
    }
}
