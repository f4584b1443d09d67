//! Pull-based eviction: the [`Evictable`] contract and a [`SwapScheduler`].
//!
//! Lists never evict themselves. A scheduler owned by the caller holds weak
//! handles to registered candidates, asks each for its priority, and swaps
//! out the highest-ranked ones. Dropped candidates are pruned on the next pass.

use crate::error::Result;
use crate::list::SelectionList;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Something the scheduler may swap out and restore.
pub trait Evictable: Send + Sync {
    fn id(&self) -> u64;

    /// Eviction priority; 0 means "do not evict now".
    fn priority(&self) -> f64;

    /// Whether the candidate is eligible at all (independent of idle time).
    fn is_evictable(&self) -> bool;

    /// Swap out. `Ok(false)` means nothing was done.
    fn evict(&self) -> Result<bool>;

    /// Bring the candidate back into memory.
    fn restore(&self) -> Result<()>;
}

impl Evictable for SelectionList {
    fn id(&self) -> u64 {
        SelectionList::id(self)
    }

    fn priority(&self) -> f64 {
        self.swap_priority()
    }

    fn is_evictable(&self) -> bool {
        self.is_swappable() && self.is_valid()
    }

    fn evict(&self) -> Result<bool> {
        self.try_swap()
    }

    fn restore(&self) -> Result<()> {
        SelectionList::restore(self)
    }
}

/// Outcome of one [`SwapScheduler::run_pass`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapPassReport {
    /// Live candidates asked for their priority.
    pub examined: usize,
    pub evicted: usize,
    pub failed: usize,
    /// Registrations dropped because the candidate no longer exists.
    pub pruned: usize,
}

struct Registration {
    id: u64,
    handle: Weak<dyn Evictable>,
}

/// Registry of eviction candidates.
#[derive(Default)]
pub struct SwapScheduler {
    candidates: Mutex<Vec<Registration>>,
}

impl std::fmt::Debug for SwapScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapScheduler")
            .field("registered", &self.len())
            .finish()
    }
}

impl SwapScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a candidate. Registering the same id twice is a no-op.
    pub fn register<T: Evictable + 'static>(&self, item: &Arc<T>) {
        let id = item.id();
        let item: Arc<dyn Evictable> = Arc::clone(item) as Arc<dyn Evictable>;
        let mut candidates = self.candidates.lock();
        if candidates.iter().any(|r| r.id == id) {
            return;
        }
        candidates.push(Registration {
            id,
            handle: Arc::downgrade(&item),
        });
    }

    /// Register `root` and every descendant list.
    pub fn register_tree(&self, root: &Arc<SelectionList>) {
        let mut pending = vec![Arc::clone(root)];
        while let Some(list) = pending.pop() {
            pending.extend(list.child_lists());
            self.register(&list);
        }
    }

    pub fn unregister(&self, id: u64) -> bool {
        let mut candidates = self.candidates.lock();
        let before = candidates.len();
        candidates.retain(|r| r.id != id);
        candidates.len() != before
    }

    /// Registrations, including ones not yet pruned.
    pub fn len(&self) -> usize {
        self.candidates.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict up to `budget` candidates with the highest positive priority.
    ///
    /// Failures are logged and counted; a failed candidate stays resident.
    pub fn run_pass(&self, budget: usize) -> SwapPassReport {
        let mut report = SwapPassReport::default();

        let live: Vec<Arc<dyn Evictable>> = {
            let mut candidates = self.candidates.lock();
            let before = candidates.len();
            candidates.retain(|r| r.handle.strong_count() > 0);
            report.pruned = before - candidates.len();
            candidates.iter().filter_map(|r| r.handle.upgrade()).collect()
        };
        report.examined = live.len();

        let mut ranked: Vec<(f64, Arc<dyn Evictable>)> = live
            .into_iter()
            .filter(|c| c.is_evictable())
            .map(|c| (c.priority(), c))
            .filter(|(p, _)| *p > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

        for (priority, candidate) in ranked.into_iter().take(budget) {
            match candidate.evict() {
                Ok(true) => {
                    debug!(id = candidate.id(), priority, "evicted");
                    report.evicted += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(id = candidate.id(), priority, error = %e, "eviction failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            examined = report.examined,
            evicted = report.evicted,
            failed = report.failed,
            pruned = report.pruned,
            "swap pass complete"
        );
        report
    }
}
