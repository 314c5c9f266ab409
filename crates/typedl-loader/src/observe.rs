//! Process-wide loader counters.
//!
//! Every open, resolve, call and close is counted here. The harness attaches
//! a [`LoaderStats`] snapshot to its reports.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Loader activity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderEvent {
    Open,
    OpenFailed,
    /// A symbol address was looked up with dlsym.
    Resolve,
    /// A symbol address was served from the per-handle cache.
    ResolveCached,
    ResolveFailed,
    Call,
    Close,
    CloseFailed,
}

const EVENT_COUNT: usize = 8;

static COUNTERS: [AtomicU64; EVENT_COUNT] = [const { AtomicU64::new(0) }; EVENT_COUNT];

impl LoaderEvent {
    const fn slot(self) -> usize {
        match self {
            Self::Open => 0,
            Self::OpenFailed => 1,
            Self::Resolve => 2,
            Self::ResolveCached => 3,
            Self::ResolveFailed => 4,
            Self::Call => 5,
            Self::Close => 6,
            Self::CloseFailed => 7,
        }
    }
}

/// Record one occurrence of `event`.
#[inline]
pub fn observe(event: LoaderEvent) {
    COUNTERS[event.slot()].fetch_add(1, Ordering::Relaxed);
}

/// Point-in-time copy of the counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoaderStats {
    pub opens: u64,
    pub open_failures: u64,
    pub resolves: u64,
    pub cache_hits: u64,
    pub resolve_failures: u64,
    pub calls: u64,
    pub closes: u64,
    pub close_failures: u64,
}

impl LoaderStats {
    /// Handles opened and not yet released.
    #[must_use]
    pub fn live_handles(&self) -> u64 {
        self.opens.saturating_sub(self.closes + self.close_failures)
    }
}

#[must_use]
pub fn snapshot() -> LoaderStats {
    let get = |event: LoaderEvent| COUNTERS[event.slot()].load(Ordering::Relaxed);
    LoaderStats {
        opens: get(LoaderEvent::Open),
        open_failures: get(LoaderEvent::OpenFailed),
        resolves: get(LoaderEvent::Resolve),
        cache_hits: get(LoaderEvent::ResolveCached),
        resolve_failures: get(LoaderEvent::ResolveFailed),
        calls: get(LoaderEvent::Call),
        closes: get(LoaderEvent::Close),
        close_failures: get(LoaderEvent::CloseFailed),
    }
}
