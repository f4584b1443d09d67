//! Selection lists: ordered, lock-guarded, swappable containers of value nodes.
//!
//! ## Residency
//!
//! | State | Entries | Accessor behavior |
//! |-------|---------|-------------------|
//! | `Valid` | all resident | stamp `last_access`, proceed |
//! | `Invalid` | leaf slots are placeholders | rehydrate from the swap file, then proceed |
//! | `Restoring` | being filled by another thread | wait on the condvar |
//! | `Unavailable` | restore attempts exhausted | `SelectionError::Unavailable` |
//!
//! Every accessor that hands out entries goes through `lock_resident`, so the
//! swap cycle is invisible to callers apart from latency and the
//! `Unavailable` error.
//!
//! ## Locking
//!
//! One `parking_lot::Mutex` per list. Recursive operations (sort, complete,
//! state lookup, search, merge) collect child list handles under the parent
//! lock, release it, and only then visit the children. No thread ever holds
//! two lists' locks at once.

use crate::context::SwapContext;
use crate::error::{Result, SelectionError};
use crate::node::{SelectionNode, ValueNode};
use crate::sort::{detect_range_domain, LabelComparator, NodeComparator, SortKind};
use crate::state::ValueState;
use crate::swap::{self, SwapDicts, SwapWriteOptions};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

static NEXT_LIST_ID: AtomicU64 = AtomicU64::new(1);

/// Whether a list's entries are in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Residency {
    Valid,
    Invalid,
    Restoring,
    Unavailable,
}

/// Bookkeeping for a swapped-out list.
#[derive(Debug)]
struct SwapState {
    path: PathBuf,
    record_count: u64,
    dicts: SwapDicts,
}

pub(crate) struct ListInner {
    pub(crate) entries: Vec<Option<SelectionNode>>,
    pub(crate) data_type: String,
    comparator: Option<Arc<dyn LabelComparator>>,
    measure_min: f64,
    measure_max: f64,
    completed: bool,
    residency: Residency,
    last_access: u64,
    swapped: Option<SwapState>,
    restore_failures: u32,
}

impl ListInner {
    /// Resident entries. Only meaningful while `Valid`.
    pub(crate) fn nodes(&self) -> impl Iterator<Item = &SelectionNode> {
        self.entries.iter().flatten()
    }

    fn nodes_mut(&mut self) -> impl Iterator<Item = &mut SelectionNode> {
        self.entries.iter_mut().flatten()
    }
}

/// Child lists of every composite among `entries`.
///
/// Composites are never swapped, so this is valid in every residency state.
pub(crate) fn composite_children(entries: &[Option<SelectionNode>]) -> Vec<Arc<SelectionList>> {
    entries
        .iter()
        .flatten()
        .filter_map(|n| n.as_composite().map(|c| Arc::clone(c.children())))
        .collect()
}

fn remove_swap_file(list_id: u64, path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(list_id, path = %path.display(), "removed swap file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(list_id, path = %path.display(), error = %e, "failed to remove swap file"),
    }
}

/// Ordered, swappable container of [`SelectionNode`]s.
pub struct SelectionList {
    id: u64,
    ctx: SwapContext,
    inner: Mutex<ListInner>,
    restored: Condvar,
}

impl fmt::Debug for SelectionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionList")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl SelectionList {
    /// Empty list with a default context (default config, system clock).
    pub fn new(data_type: impl Into<String>) -> Self {
        Self::with_context(data_type, SwapContext::default())
    }

    /// Empty list sharing `ctx`.
    pub fn with_context(data_type: impl Into<String>, ctx: SwapContext) -> Self {
        let now = ctx.now();
        Self {
            id: NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed),
            ctx,
            inner: Mutex::new(ListInner {
                entries: Vec::new(),
                data_type: data_type.into(),
                comparator: None,
                measure_min: f64::NAN,
                measure_max: f64::NAN,
                completed: false,
                residency: Residency::Valid,
                last_access: now,
                swapped: None,
                restore_failures: 0,
            }),
            restored: Condvar::new(),
        }
    }

    /// Empty list for composite children: same context and data type.
    pub fn new_child(&self) -> Self {
        let data_type = self.inner.lock().data_type.clone();
        Self::with_context(data_type, self.ctx.clone())
    }

    /// New list with this list's settings and the given entries.
    pub(crate) fn derived(&self, entries: Vec<SelectionNode>, completed: bool) -> Self {
        let (data_type, comparator, measure_min, measure_max) = {
            let src = self.inner.lock();
            (
                src.data_type.clone(),
                src.comparator.clone(),
                src.measure_min,
                src.measure_max,
            )
        };
        let mut out = Self::with_context(data_type, self.ctx.clone());
        let dst = out.inner.get_mut();
        dst.entries = entries.into_iter().map(Some).collect();
        dst.comparator = comparator;
        dst.measure_min = measure_min;
        dst.measure_max = measure_max;
        dst.completed = completed;
        out
    }

    /// Process-unique list id (also names the swap file).
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn context(&self) -> &SwapContext {
        &self.ctx
    }

    // ========================================================================
    // Residency
    // ========================================================================

    /// Lock the list with every entry resident, rehydrating if needed.
    ///
    /// Stamps `last_access` on success.
    pub(crate) fn lock_resident(&self) -> Result<MutexGuard<'_, ListInner>> {
        let mut inner = self.inner.lock();
        loop {
            let residency = inner.residency;
            match residency {
                Residency::Valid => {
                    inner.last_access = self.ctx.now();
                    return Ok(inner);
                }
                Residency::Restoring => self.restored.wait(&mut inner),
                Residency::Invalid => self.restore_locked(&mut inner)?,
                Residency::Unavailable => {
                    return Err(SelectionError::unavailable(
                        self.id,
                        format!("restore failed {} times", inner.restore_failures),
                    ));
                }
            }
        }
    }

    /// Rehydrate an `Invalid` list. The lock is released during file I/O.
    fn restore_locked(&self, inner: &mut MutexGuard<'_, ListInner>) -> Result<()> {
        let Some(state) = inner.swapped.take() else {
            inner.residency = Residency::Unavailable;
            self.restored.notify_all();
            return Err(SelectionError::unavailable(self.id, "swap state missing"));
        };
        inner.residency = Residency::Restoring;

        let read = MutexGuard::unlocked(inner, || {
            swap::read_slots(&state.path, state.record_count, &state.dicts)
        });
        let outcome = read
            .map_err(|e| e.to_string())
            .and_then(|records| fill_placeholders(&mut inner.entries, records));

        match outcome {
            Ok(()) => {
                inner.residency = Residency::Valid;
                inner.restore_failures = 0;
                remove_swap_file(self.id, &state.path);
                debug!(
                    list_id = self.id,
                    entries = state.record_count,
                    "rehydrated selection list"
                );
                self.restored.notify_all();
                Ok(())
            }
            Err(reason) => {
                inner.restore_failures += 1;
                let attempts = inner.restore_failures;
                let exhausted = attempts >= self.ctx.config.max_restore_attempts;
                warn!(
                    list_id = self.id,
                    path = %state.path.display(),
                    attempts,
                    exhausted,
                    error = %reason,
                    "failed to rehydrate selection list"
                );
                if exhausted {
                    inner.residency = Residency::Unavailable;
                    remove_swap_file(self.id, &state.path);
                } else {
                    inner.residency = Residency::Invalid;
                    inner.swapped = Some(state);
                }
                self.restored.notify_all();
                Err(SelectionError::unavailable(self.id, reason))
            }
        }
    }

    /// Make the list resident now (no-op when already valid).
    pub fn restore(&self) -> Result<()> {
        self.lock_resident().map(drop)
    }

    pub fn residency(&self) -> Residency {
        self.inner.lock().residency
    }

    /// True while every entry is in memory.
    pub fn is_valid(&self) -> bool {
        self.inner.lock().residency == Residency::Valid
    }

    pub fn last_access(&self) -> u64 {
        self.inner.lock().last_access
    }

    /// Path of the backing swap file while swapped out.
    pub fn swap_path(&self) -> Option<PathBuf> {
        self.inner.lock().swapped.as_ref().map(|s| s.path.clone())
    }

    // ========================================================================
    // Swap contract
    // ========================================================================

    /// Completed and larger than the configured minimum.
    pub fn is_swappable(&self) -> bool {
        let inner = self.inner.lock();
        self.swappable_locked(&inner)
    }

    fn swappable_locked(&self, inner: &ListInner) -> bool {
        inner.completed && inner.entries.len() > self.ctx.config.min_swap_entries
    }

    /// Eviction priority: 0 unless completed, valid, and idle for at least
    /// the grace period; otherwise idle seconds times `priority_scale`.
    pub fn swap_priority(&self) -> f64 {
        let inner = self.inner.lock();
        if !inner.completed || inner.residency != Residency::Valid {
            return 0.0;
        }
        let idle = self.ctx.now().saturating_sub(inner.last_access);
        if idle < self.ctx.config.grace_period_ms {
            return 0.0;
        }
        idle as f64 / 1000.0 * self.ctx.config.priority_scale
    }

    /// Write every leaf entry to the swap file and drop it from memory.
    ///
    /// Returns `Ok(false)` when the list is not a swap candidate or holds no
    /// leaves. On error the partial file is removed and memory is untouched.
    pub fn try_swap(&self) -> Result<bool> {
        let mut inner = self.inner.lock();
        if inner.residency != Residency::Valid || !self.swappable_locked(&inner) {
            return Ok(false);
        }
        let path = self.ctx.config.swap_path(self.id);
        let options = SwapWriteOptions::from(self.ctx.config.as_ref());

        let (info, dicts) = match swap::write_slots(&path, &inner.entries, options) {
            Ok(written) => written,
            Err(e) => {
                remove_swap_file(self.id, &path);
                return Err(e.into());
            }
        };
        if info.record_count == 0 {
            remove_swap_file(self.id, &path);
            return Ok(false);
        }

        for slot in inner.entries.iter_mut() {
            if slot.as_ref().is_some_and(SelectionNode::is_swappable_leaf) {
                *slot = None;
            }
        }
        inner.residency = Residency::Invalid;
        inner.restore_failures = 0;
        inner.swapped = Some(SwapState {
            path: info.path,
            record_count: info.record_count,
            dicts,
        });
        debug!(
            list_id = self.id,
            entries = info.record_count,
            bytes = info.byte_len,
            "swapped out selection list"
        );
        Ok(true)
    }

    /// Best-effort swap: failures are logged and reported as `false`.
    pub fn swap(&self) -> bool {
        match self.try_swap() {
            Ok(swapped) => swapped,
            Err(e) => {
                warn!(list_id = self.id, error = %e, "swap failed, list kept in memory");
                false
            }
        }
    }

    /// Delete the swap file (if any) and clear every entry. Idempotent.
    pub fn dispose(&self) {
        let mut inner = self.inner.lock();
        while inner.residency == Residency::Restoring {
            self.restored.wait(&mut inner);
        }
        if let Some(state) = inner.swapped.take() {
            remove_swap_file(self.id, &state.path);
        }
        inner.entries.clear();
        inner.residency = Residency::Valid;
        inner.restore_failures = 0;
        self.restored.notify_all();
    }

    // ========================================================================
    // Mutators
    // ========================================================================

    pub fn add(&self, node: SelectionNode) -> Result<()> {
        self.lock_resident()?.entries.push(Some(node));
        Ok(())
    }

    /// Replace every entry.
    pub fn set_entries(&self, nodes: Vec<SelectionNode>) -> Result<()> {
        self.lock_resident()?.entries = nodes.into_iter().map(Some).collect();
        Ok(())
    }

    pub fn set(&self, index: usize, node: SelectionNode) -> Result<()> {
        let mut inner = self.lock_resident()?;
        let len = inner.entries.len();
        match inner.entries.get_mut(index) {
            Some(slot) => {
                *slot = Some(node);
                Ok(())
            }
            None => Err(index_error(index, len)),
        }
    }

    pub fn remove(&self, index: usize) -> Result<SelectionNode> {
        let mut inner = self.lock_resident()?;
        let len = inner.entries.len();
        if index >= len {
            return Err(index_error(index, len));
        }
        inner
            .entries
            .remove(index)
            .ok_or_else(|| SelectionError::other("placeholder in resident list"))
    }

    /// Remove the first top-level entry with this canonical value.
    pub fn remove_value(&self, value: &str) -> Result<Option<SelectionNode>> {
        let mut inner = self.lock_resident()?;
        let pos = inner
            .entries
            .iter()
            .position(|slot| slot.as_ref().and_then(SelectionNode::value) == Some(value));
        Ok(pos.and_then(|i| inner.entries.remove(i)))
    }

    pub fn clear(&self) -> Result<()> {
        self.lock_resident()?.entries.clear();
        Ok(())
    }

    /// Set the state of the first node with this value, searching children
    /// breadth-first. Returns whether a node was found.
    pub fn set_value_state(&self, value: &str, state: ValueState) -> Result<bool> {
        let mut queue: VecDeque<Arc<SelectionList>> = VecDeque::new();
        if self.set_state_local(value, state, &mut queue)? {
            return Ok(true);
        }
        while let Some(list) = queue.pop_front() {
            if list.set_state_local(value, state, &mut queue)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn set_state_local(
        &self,
        value: &str,
        state: ValueState,
        queue: &mut VecDeque<Arc<SelectionList>>,
    ) -> Result<bool> {
        let mut inner = self.lock_resident()?;
        for node in inner.nodes_mut() {
            if node.value() == Some(value) {
                node.value_node_mut().set_state(state);
                return Ok(true);
            }
        }
        queue.extend(composite_children(&inner.entries));
        Ok(false)
    }

    /// Apply `f` to every top-level node (composites included, children not).
    pub fn update_states<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut ValueNode),
    {
        let mut inner = self.lock_resident()?;
        for node in inner.nodes_mut() {
            f(node.value_node_mut());
        }
        Ok(())
    }

    /// Mark this list and every descendant list as fully populated.
    ///
    /// Idempotent; a completed list never reverts.
    pub fn complete(&self) {
        let mut pending = self.complete_local();
        while let Some(child) = pending.pop() {
            pending.extend(child.complete_local());
        }
    }

    fn complete_local(&self) -> Vec<Arc<SelectionList>> {
        let mut inner = self.inner.lock();
        inner.completed = true;
        composite_children(&inner.entries)
    }

    pub fn is_completed(&self) -> bool {
        self.inner.lock().completed
    }

    pub fn data_type(&self) -> String {
        self.inner.lock().data_type.clone()
    }

    pub fn set_data_type(&self, data_type: impl Into<String>) {
        self.inner.lock().data_type = data_type.into();
    }

    /// Override the label comparator (`None` restores the default collator).
    pub fn set_comparator(&self, comparator: Option<Arc<dyn LabelComparator>>) {
        self.inner.lock().comparator = comparator;
    }

    pub fn set_measure_range(&self, min: f64, max: f64) {
        let mut inner = self.inner.lock();
        inner.measure_min = min;
        inner.measure_max = max;
    }

    pub fn measure_range(&self) -> (f64, f64) {
        let inner = self.inner.lock();
        (inner.measure_min, inner.measure_max)
    }

    /// Map raw top-level measures into 0..1 using the measure range.
    ///
    /// `NaN` stays `NaN`; a zero-width or unset range maps to 1.0.
    pub fn normalize_measures(&self) -> Result<()> {
        let mut inner = self.lock_resident()?;
        let (min, max) = (inner.measure_min, inner.measure_max);
        let width = max - min;
        for node in inner.nodes_mut() {
            let v = node.value_node_mut();
            let raw = v.measure_value();
            if raw.is_nan() {
                continue;
            }
            let norm = if width.is_finite() && width > 0.0 {
                ((raw - min) / width).clamp(0.0, 1.0)
            } else {
                1.0
            };
            v.set_measure_value(norm);
        }
        Ok(())
    }

    // ========================================================================
    // Readers
    // ========================================================================

    /// Copy-on-read snapshot of the entries.
    ///
    /// Composite children are shared handles; use [`Self::deep_clone`] for an
    /// independent tree.
    pub fn entries(&self) -> Result<Vec<SelectionNode>> {
        Ok(self.lock_resident()?.nodes().cloned().collect())
    }

    pub fn get(&self, index: usize) -> Result<Option<SelectionNode>> {
        Ok(self
            .lock_resident()?
            .entries
            .get(index)
            .and_then(Option::clone))
    }

    /// Number of entries, counting swapped placeholders.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Canonical values of the selected top-level entries, in order.
    pub fn selected_values(&self) -> Result<Vec<String>> {
        Ok(self
            .lock_resident()?
            .nodes()
            .filter(|n| n.is_selected())
            .filter_map(|n| n.value().map(str::to_string))
            .collect())
    }

    /// Whether any top-level entry requires a downstream reset.
    pub fn requires_reset(&self) -> Result<bool> {
        Ok(self.lock_resident()?.nodes().any(SelectionNode::requires_reset))
    }

    /// Child lists of the composite entries (no rehydration needed).
    pub fn child_lists(&self) -> Vec<Arc<SelectionList>> {
        composite_children(&self.inner.lock().entries)
    }

    // ========================================================================
    // Sort
    // ========================================================================

    /// Sort this list and every descendant list with the same kind.
    pub fn sort(&self, kind: SortKind) -> Result<()> {
        let mut pending = self.sort_local(kind)?;
        while let Some(child) = pending.pop() {
            pending.extend(child.sort_local(kind)?);
        }
        Ok(())
    }

    fn sort_local(&self, kind: SortKind) -> Result<Vec<Arc<SelectionList>>> {
        let mut inner = self.lock_resident()?;
        let range = kind != SortKind::None
            && detect_range_domain(
                &inner.data_type,
                inner.nodes(),
                self.ctx.config.range_lookahead,
            );
        let cmp = NodeComparator::new(kind, inner.comparator.clone(), range);
        cmp.sort_slots(&mut inner.entries);
        Ok(composite_children(&inner.entries))
    }

    // ========================================================================
    // Copies
    // ========================================================================

    /// Independent copy of the whole tree under a new list id. The copy has no
    /// swap file and is fully resident.
    pub fn deep_clone(&self) -> Result<SelectionList> {
        let (snapshot, completed) = {
            let inner = self.lock_resident()?;
            (inner.nodes().cloned().collect::<Vec<_>>(), inner.completed)
        };
        let mut copies = Vec::with_capacity(snapshot.len());
        for node in &snapshot {
            copies.push(node.deep_clone()?);
        }
        Ok(self.derived(copies, completed))
    }
}

impl Drop for SelectionList {
    fn drop(&mut self) {
        if let Some(state) = self.inner.get_mut().swapped.take() {
            remove_swap_file(self.id, &state.path);
        }
    }
}

fn index_error(index: usize, len: usize) -> SelectionError {
    SelectionError::other(format!("index {} out of bounds (len {})", index, len))
}

/// Put restored records back into their placeholder slots.
///
/// Validates first so a bad file never leaves the list half-filled.
fn fill_placeholders(
    entries: &mut [Option<SelectionNode>],
    records: Vec<(usize, SelectionNode)>,
) -> std::result::Result<(), String> {
    let holes = entries.iter().filter(|e| e.is_none()).count();
    if records.len() != holes {
        return Err(format!(
            "swap file holds {} records for {} placeholders",
            records.len(),
            holes
        ));
    }
    let mut prev: Option<usize> = None;
    for (slot, _) in &records {
        if prev.is_some_and(|p| p >= *slot) {
            return Err(format!("swap record slots out of order at {}", slot));
        }
        if !matches!(entries.get(*slot), Some(None)) {
            return Err(format!("swap record slot {} is not a placeholder", slot));
        }
        prev = Some(*slot);
    }
    for (slot, node) in records {
        entries[slot] = Some(node);
    }
    Ok(())
}
