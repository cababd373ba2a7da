//! Process-wide teleport request counters.
//! Relaxed atomics; the service facade is the only writer.
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

static REQUESTS_CREATED: AtomicU64 = AtomicU64::new(0);
static REQUESTS_SUPERSEDED: AtomicU64 = AtomicU64::new(0);
static REQUESTS_ACCEPTED: AtomicU64 = AtomicU64::new(0);
static REQUESTS_EXPIRED: AtomicU64 = AtomicU64::new(0);
static REQUESTS_CLEARED: AtomicU64 = AtomicU64::new(0);

pub fn inc_requests_created() {
    REQUESTS_CREATED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_requests_superseded() {
    REQUESTS_SUPERSEDED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_requests_accepted() {
    REQUESTS_ACCEPTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_requests_expired() {
    REQUESTS_EXPIRED.fetch_add(1, Ordering::Relaxed);
}
pub fn add_requests_cleared(count: usize) {
    REQUESTS_CLEARED.fetch_add(count as u64, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub requests_created: u64,
    pub requests_superseded: u64,
    pub requests_accepted: u64,
    pub requests_expired: u64,
    pub requests_cleared: u64,
}

impl Snapshot {
    /// Requests created but not yet resolved by any path, as seen by the counters.
    pub fn outstanding(&self) -> u64 {
        self.requests_created.saturating_sub(
            self.requests_superseded
                + self.requests_accepted
                + self.requests_expired
                + self.requests_cleared,
        )
    }
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        requests_created: REQUESTS_CREATED.load(Ordering::Relaxed),
        requests_superseded: REQUESTS_SUPERSEDED.load(Ordering::Relaxed),
        requests_accepted: REQUESTS_ACCEPTED.load(Ordering::Relaxed),
        requests_expired: REQUESTS_EXPIRED.load(Ordering::Relaxed),
        requests_cleared: REQUESTS_CLEARED.load(Ordering::Relaxed),
    }
}
