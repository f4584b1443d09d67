//! Presentation formats and their per-pass dictionaries.
//!
//! Formats are opaque to this crate: they are attached to value nodes as
//! shared `Arc`s and handed to the presentation layer by identity. Two
//! dictionaries map them to small integers for the compact wire form and
//! the swap file:
//!
//! - [`FormatIndex`] keys [`CompositeFormat`]s by identity (`Arc` pointer).
//!   Numbering is first-seen-wins and the index is rebuilt for every pass.
//! - [`FormatterDict`] keys label/measure [`Formatter`]s by equality, so equal
//!   formatters collapse to one shared `Arc` after a swap round-trip.
//!
//! Both dictionaries hold a strong reference to every interned value, so a
//! pointer key can never be reused by a different allocation mid-pass.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Id written for "no format".
pub const NO_FORMAT_ID: u32 = u32::MAX;

/// Kind of value formatter applied to a label or measure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatterKind {
    Number,
    Percent,
    Currency,
    Date,
    Message,
    Text,
}

impl FormatterKind {
    fn code(self) -> u8 {
        match self {
            FormatterKind::Number => 0,
            FormatterKind::Percent => 1,
            FormatterKind::Currency => 2,
            FormatterKind::Date => 3,
            FormatterKind::Message => 4,
            FormatterKind::Text => 5,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => FormatterKind::Number,
            1 => FormatterKind::Percent,
            2 => FormatterKind::Currency,
            3 => FormatterKind::Date,
            4 => FormatterKind::Message,
            5 => FormatterKind::Text,
            _ => return None,
        })
    }
}

/// Label/measure formatter (a format kind plus an optional pattern).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Formatter {
    pub kind: FormatterKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Formatter {
    pub fn new(kind: FormatterKind, pattern: Option<&str>) -> Self {
        Self {
            kind,
            pattern: pattern.map(str::to_string),
        }
    }

    pub(crate) fn kind_code(&self) -> u8 {
        self.kind.code()
    }

    pub(crate) fn from_parts(code: u8, pattern: Option<String>) -> Option<Self> {
        FormatterKind::from_code(code).map(|kind| Self { kind, pattern })
    }
}

/// Resolved composite presentation format of a value cell.
///
/// Treated as append-only once it is attached to more than one node within a
/// serialization pass; callers replace the `Arc` instead of mutating it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreground: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<String>,
    #[serde(default)]
    pub wrapping: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<Formatter>,
}

#[inline]
fn identity_key<T>(value: &Arc<T>) -> usize {
    Arc::as_ptr(value) as *const () as usize
}

// ============================================================================
// FormatIndex
// ============================================================================

/// Identity-keyed `CompositeFormat -> u32` dictionary, rebuilt per pass.
#[derive(Debug, Default)]
pub struct FormatIndex {
    ids: FxHashMap<usize, u32>,
    formats: Vec<Arc<CompositeFormat>>,
}

impl FormatIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `format`, returning its id and whether this is its first
    /// occurrence in the current pass.
    pub fn intern(&mut self, format: &Arc<CompositeFormat>) -> (u32, bool) {
        let key = identity_key(format);
        if let Some(&id) = self.ids.get(&key) {
            return (id, false);
        }
        let id = self.formats.len() as u32;
        self.ids.insert(key, id);
        self.formats.push(Arc::clone(format));
        (id, true)
    }

    /// Look up the id of an already interned format.
    pub fn id_of(&self, format: &Arc<CompositeFormat>) -> Option<u32> {
        self.ids.get(&identity_key(format)).copied()
    }

    /// Get the shared format for an id.
    pub fn resolve(&self, id: u32) -> Option<&Arc<CompositeFormat>> {
        self.formats.get(id as usize)
    }

    /// Forget every interned format (start of a new pass).
    pub fn reset(&mut self) {
        self.ids.clear();
        self.formats.clear();
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

// ============================================================================
// FormatterDict
// ============================================================================

/// Equality-keyed `Formatter -> u32` dictionary.
#[derive(Debug, Default)]
pub struct FormatterDict {
    ids: FxHashMap<Formatter, u32>,
    formatters: Vec<Arc<Formatter>>,
}

impl FormatterDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or insert a formatter, returning its sequential id.
    pub fn get_or_insert(&mut self, formatter: &Arc<Formatter>) -> u32 {
        if let Some(&id) = self.ids.get(formatter.as_ref()) {
            return id;
        }
        let id = self.formatters.len() as u32;
        self.ids.insert(formatter.as_ref().clone(), id);
        self.formatters.push(Arc::clone(formatter));
        id
    }

    pub fn resolve(&self, id: u32) -> Option<&Arc<Formatter>> {
        self.formatters.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.formatters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formatters.is_empty()
    }
}

/// Encode an optional formatter as a dictionary id.
pub(crate) fn formatter_id(dict: &mut FormatterDict, f: Option<&Arc<Formatter>>) -> u32 {
    f.map(|f| dict.get_or_insert(f)).unwrap_or(NO_FORMAT_ID)
}

/// Encode an optional composite format as a dictionary id.
pub(crate) fn composite_id(index: &mut FormatIndex, f: Option<&Arc<CompositeFormat>>) -> u32 {
    f.map(|f| index.intern(f).0).unwrap_or(NO_FORMAT_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_index_first_seen_wins() {
        let a = Arc::new(CompositeFormat {
            foreground: Some("red".into()),
            ..Default::default()
        });
        let b = Arc::new(CompositeFormat::default());
        let mut index = FormatIndex::new();

        assert_eq!(index.intern(&b), (0, true));
        assert_eq!(index.intern(&a), (1, true));
        assert_eq!(index.intern(&b), (0, false));
        assert_eq!(index.id_of(&a), Some(1));
        assert!(Arc::ptr_eq(index.resolve(1).unwrap(), &a));
    }

    #[test]
    fn test_format_index_is_identity_keyed() {
        // Equal contents, different allocations: two ids.
        let a = Arc::new(CompositeFormat::default());
        let b = Arc::new(CompositeFormat::default());
        let mut index = FormatIndex::new();
        assert_eq!(index.intern(&a).0, 0);
        assert_eq!(index.intern(&b).0, 1);
    }

    #[test]
    fn test_format_index_reset() {
        let a = Arc::new(CompositeFormat::default());
        let b = Arc::new(CompositeFormat::default());
        let mut index = FormatIndex::new();
        index.intern(&a);
        index.reset();
        assert!(index.is_empty());
        assert_eq!(index.intern(&b), (0, true));
    }

    #[test]
    fn test_formatter_dict_is_equality_keyed() {
        let a = Arc::new(Formatter::new(FormatterKind::Number, Some("#,##0")));
        let b = Arc::new(Formatter::new(FormatterKind::Number, Some("#,##0")));
        let c = Arc::new(Formatter::new(FormatterKind::Date, None));
        let mut dict = FormatterDict::new();
        assert_eq!(dict.get_or_insert(&a), 0);
        assert_eq!(dict.get_or_insert(&b), 0);
        assert_eq!(dict.get_or_insert(&c), 1);
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_formatter_kind_codes_roundtrip() {
        for kind in [
            FormatterKind::Number,
            FormatterKind::Percent,
            FormatterKind::Currency,
            FormatterKind::Date,
            FormatterKind::Message,
            FormatterKind::Text,
        ] {
            assert_eq!(FormatterKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(FormatterKind::from_code(42), None);
    }
}
