//! Wire forms of a selection tree.
//!
//! - [`verbose`]: self-describing JSON for bookmark snapshots
//! - [`paged`]: compact, windowed, format-deduplicated JSON for UI payloads

pub mod paged;
pub mod verbose;

pub use paged::{PageRequest, PagedEntry, PagedFormat, PagedList};
pub use verbose::{VerboseList, VerboseNode};
