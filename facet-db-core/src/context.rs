//! Shared context handed to every selection list: configuration plus a clock.
//!
//! All time values in this crate are milliseconds on the context's clock.
//! A child container created beneath a list inherits the parent's context.

use crate::config::SelectionCacheConfig;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Millisecond time source.
pub trait Clock: Debug + Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Monotonic process-relative clock.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Configuration and clock shared by a tree of selection lists.
#[derive(Debug, Clone)]
pub struct SwapContext {
    pub config: Arc<SelectionCacheConfig>,
    pub clock: Arc<dyn Clock>,
}

impl SwapContext {
    pub fn new(config: SelectionCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: Arc::new(config),
            clock,
        }
    }

    /// Context with the given config and the system clock.
    pub fn with_config(config: SelectionCacheConfig) -> Self {
        Self::new(config, Arc::new(SystemClock::new()))
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.clock.now_millis()
    }
}

impl Default for SwapContext {
    fn default() -> Self {
        Self::with_config(SelectionCacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now_millis(), 100);
        clock.advance(50);
        assert_eq!(clock.now_millis(), 150);
        clock.set(10);
        assert_eq!(clock.now_millis(), 10);
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_millis();
        let b = clock.now_millis();
        assert!(b >= a);
    }
}
