//! # Facet DB Core
//!
//! Selection-domain cache for dashboard facets.
//!
//! This crate provides:
//! - Value nodes: `ValueNode`, `CompositeValueNode`, and the `SelectionNode` variant
//! - `SelectionList`: ordered container with sort, merge, find, and search
//! - Swap-to-disk eviction with lazy, lock-guarded rehydration
//! - Verbose and paged (format-deduplicated) wire forms
//! - A pull-based `SwapScheduler` over `Evictable` candidates
//!
//! ## Design Principles
//!
//! 1. **Per-list locking**: one mutex per list, never two held at once
//! 2. **Best-effort caching**: swap failures are logged and leave memory intact
//! 3. **Lenient ordering**: unknown sort kinds fall back to label ascending
//!
//! ## Example
//!
//! ```ignore
//! use facet_db_core::{PageRequest, SelectionList, SortKind, SwapContext};
//!
//! let list = SelectionList::with_context("string", SwapContext::default());
//! list.set_entries(nodes)?;
//! list.complete();
//! list.sort(SortKind::Specific)?;
//! let page = list.to_paged(&PageRequest::new(0, 50))?;
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod evict;
pub mod format;
pub mod list;
pub mod node;
mod search;
pub mod sort;
pub mod state;
pub mod swap;
pub mod wire;

// Re-export main types
pub use config::{SelectionCacheConfig, DEFAULT_GRACE_PERIOD_MS, DEFAULT_MIN_SWAP_ENTRIES};
pub use context::{Clock, ManualClock, SwapContext, SystemClock};
pub use error::{Result, SelectionError};
pub use evict::{Evictable, SwapPassReport, SwapScheduler};
pub use format::{CompositeFormat, FormatIndex, Formatter, FormatterDict, FormatterKind};
pub use list::{Residency, SelectionList};
pub use node::{CompositeValueNode, NodeKind, SelectionNode, ValueNode};
pub use sort::{LabelComparator, NodeComparator, SortKind, TextCollator};
pub use state::ValueState;
pub use wire::{PageRequest, PagedEntry, PagedFormat, PagedList, VerboseList, VerboseNode};
