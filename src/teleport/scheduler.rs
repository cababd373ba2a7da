//! Delayed-action scheduling used to expire pending requests.
//!
//! The cache only needs two things from a host: "run this once after a delay"
//! and "never run it after all". That capability is the [`ExpiryScheduler`]
//! trait. Two implementations ship here:
//!
//! * [`TokioScheduler`] - one sleeping task per action on a Tokio runtime,
//!   cancelled by aborting the task.
//! * [`TickScheduler`] - a cooperative queue driven by the host's game loop.
//!   Nothing runs until the host calls [`TickScheduler::advance`], and actions
//!   run on the calling thread.
//!
//! Cancellation contract shared by both: calling [`ExpiryHandle::cancel`]
//! before the action starts guarantees it never runs. Cancelling an action
//! that already ran, is running, or was already cancelled is a no-op.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// Work to run once when a scheduled delay elapses.
pub type ExpiryAction = Box<dyn FnOnce() + Send + 'static>;

/// Length of one server tick on the platforms this cache was built for.
pub const DEFAULT_TICK: Duration = Duration::from_millis(50);

/// Cancellation side of a scheduled action.
pub trait ExpiryHandle: Send + Sync {
    /// Prevent the action from running. Idempotent.
    fn cancel(&self);
}

/// Capability to run an action once after a delay.
pub trait ExpiryScheduler: Send + Sync {
    type Handle: ExpiryHandle;

    fn schedule_after(&self, delay: Duration, action: ExpiryAction) -> Self::Handle;
}

/// Convert a tick count into wall-clock time for a given tick length.
pub fn ticks_to_duration(ticks: u64, tick: Duration) -> Duration {
    tick.saturating_mul(u32::try_from(ticks).unwrap_or(u32::MAX))
}

// ---------------------------------------------------------------------------
// Tokio
// ---------------------------------------------------------------------------

/// Schedules each action as a task that sleeps for the delay and then runs it.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Bind to the runtime of the calling context, if there is one.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

#[derive(Debug)]
pub struct TokioExpiryHandle {
    task: AbortHandle,
}

impl ExpiryHandle for TokioExpiryHandle {
    fn cancel(&self) {
        // abort() on a finished task does nothing; on a task still sleeping it
        // guarantees the action is never polled.
        self.task.abort();
    }
}

impl ExpiryScheduler for TokioScheduler {
    type Handle = TokioExpiryHandle;

    fn schedule_after(&self, delay: Duration, action: ExpiryAction) -> Self::Handle {
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });
        TokioExpiryHandle {
            task: task.abort_handle(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tick-driven
// ---------------------------------------------------------------------------

/// Queue key: due tick, then insertion order so equal ticks run FIFO.
type SlotKey = (u64, u64);

struct Scheduled {
    cancelled: Arc<AtomicBool>,
    action: ExpiryAction,
}

#[derive(Default)]
struct TickQueue {
    now: u64,
    next_seq: u64,
    slots: BTreeMap<SlotKey, Scheduled>,
}

/// Cooperative scheduler for hosts that run a fixed-rate game loop.
///
/// Delays are rounded up to whole ticks (at least one). The host calls
/// [`advance`](Self::advance) once per loop iteration; due actions run in due
/// order on that thread with the internal lock released, so an action may
/// freely schedule or cancel other actions.
#[derive(Clone)]
pub struct TickScheduler {
    queue: Arc<Mutex<TickQueue>>,
    tick: Duration,
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

impl std::fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.lock();
        f.debug_struct("TickScheduler")
            .field("tick", &self.tick)
            .field("now", &queue.now)
            .field("pending", &queue.slots.len())
            .finish()
    }
}

impl TickScheduler {
    pub fn new(tick: Duration) -> Self {
        Self {
            queue: Arc::new(Mutex::new(TickQueue::default())),
            tick: tick.max(Duration::from_millis(1)),
        }
    }

    pub fn tick_length(&self) -> Duration {
        self.tick
    }

    /// Ticks elapsed since the scheduler was created.
    pub fn current_tick(&self) -> u64 {
        self.lock().now
    }

    /// Number of actions still waiting to run (cancelled ones are excluded).
    pub fn pending(&self) -> usize {
        self.lock().slots.len()
    }

    /// Step the clock forward `ticks` times, running whatever falls due at each
    /// step. Returns the number of actions run.
    pub fn advance(&self, ticks: u64) -> usize {
        let mut ran = 0;
        for _ in 0..ticks {
            let due = {
                let mut queue = self.lock();
                queue.now += 1;
                let first_not_due = (queue.now + 1, 0);
                let later = queue.slots.split_off(&first_not_due);
                std::mem::replace(&mut queue.slots, later)
            };
            for (_, scheduled) in due {
                // A handle may have been cancelled by an earlier action in this batch.
                if scheduled.cancelled.load(Ordering::Acquire) {
                    continue;
                }
                (scheduled.action)();
                ran += 1;
            }
        }
        ran
    }

    fn delay_in_ticks(&self, delay: Duration) -> u64 {
        let tick = self.tick.as_nanos();
        let ticks = delay.as_nanos().div_ceil(tick).max(1);
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }

    fn lock(&self) -> MutexGuard<'_, TickQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct TickExpiryHandle {
    cancelled: Arc<AtomicBool>,
    queue: Weak<Mutex<TickQueue>>,
    key: SlotKey,
}

impl std::fmt::Debug for TickExpiryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickExpiryHandle")
            .field("due_tick", &self.key.0)
            .field("cancelled", &self.cancelled.load(Ordering::Acquire))
            .finish()
    }
}

impl ExpiryHandle for TickExpiryHandle {
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        // Drop the queued closure now rather than at its due tick.
        if let Some(queue) = self.queue.upgrade() {
            let mut queue = queue.lock().unwrap_or_else(PoisonError::into_inner);
            queue.slots.remove(&self.key);
        }
    }
}

impl ExpiryScheduler for TickScheduler {
    type Handle = TickExpiryHandle;

    fn schedule_after(&self, delay: Duration, action: ExpiryAction) -> Self::Handle {
        let ticks = self.delay_in_ticks(delay);
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut queue = self.lock();
        let key = (queue.now.saturating_add(ticks), queue.next_seq);
        queue.next_seq += 1;
        queue.slots.insert(
            key,
            Scheduled {
                cancelled: Arc::clone(&cancelled),
                action,
            },
        );
        TickExpiryHandle {
            cancelled,
            queue: Arc::downgrade(&self.queue),
            key,
        }
    }
}
