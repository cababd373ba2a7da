//! Single-slot-per-target cache of pending teleport requests.
//!
//! Every target player has at most one pending request. Each request owns a
//! scheduled expiry action. The outcome of a request is decided by whichever
//! path removes its map entry first:
//!
//! * [`RequestCache::accept`] - plain remove, cancels the expiry.
//! * the expiry action - compare-and-remove on (requester, generation id),
//!   then notify.
//! * [`RequestCache::put`] for the same target - replaces and cancels.
//! * [`RequestCache::clear_for`] / [`RequestCache::clear_all`] - remove and
//!   cancel, no notification.
//!
//! The losing path always finds the slot empty (or holding a newer request it
//! does not match) and does nothing. Slots live in a sharded [`DashMap`], so
//! work on different targets never contends on one lock. The cache never
//! logs; callers observe outcomes through return values and the notifier.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::request::TeleportRequest;
use super::scheduler::{ExpiryAction, ExpiryScheduler};
use super::types::{PendingRequest, PlayerId};

/// Receives `(requester, target)` once for every request that expires
/// without being accepted or cleared.
pub trait ExpiryNotifier: Send + Sync {
    fn expired(&self, requester_id: PlayerId, target_id: PlayerId);
}

impl<F> ExpiryNotifier for F
where
    F: Fn(PlayerId, PlayerId) + Send + Sync,
{
    fn expired(&self, requester_id: PlayerId, target_id: PlayerId) {
        self(requester_id, target_id)
    }
}

type Slots<H> = DashMap<PlayerId, TeleportRequest<H>>;

pub struct RequestCache<S: ExpiryScheduler> {
    requests: Arc<Slots<S::Handle>>,
    scheduler: S,
    notifier: Arc<dyn ExpiryNotifier>,
}

impl<S> RequestCache<S>
where
    S: ExpiryScheduler,
    S::Handle: 'static,
{
    pub fn new(scheduler: S, notifier: impl ExpiryNotifier + 'static) -> Self {
        Self::with_shared_notifier(scheduler, Arc::new(notifier))
    }

    pub fn with_shared_notifier(scheduler: S, notifier: Arc<dyn ExpiryNotifier>) -> Self {
        Self {
            requests: Arc::new(DashMap::new()),
            scheduler,
            notifier,
        }
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Create the pending request `requester -> target`, replacing (and
    /// cancelling) whatever request `target` had before.
    ///
    /// The caller guarantees `requester_id != target_id`. A zero `ttl` expires
    /// the request before this returns: the notifier runs once and nothing is
    /// stored. Returns true if an older request for `target` was superseded.
    pub fn put(&self, requester_id: PlayerId, target_id: PlayerId, ttl: Duration) -> bool {
        if ttl.is_zero() {
            let superseded = self.remove_and_cancel(&target_id).is_some();
            self.notifier.expired(requester_id, target_id);
            return superseded;
        }

        let created_at = Utc::now();
        let expires_at = expiry_time(created_at, ttl);
        let id = Uuid::new_v4();

        // The entry guard holds the target's shard lock until the new request
        // is stored, so a concurrently firing action for this target cannot
        // observe the slot between the removal and the insert.
        match self.requests.entry(target_id) {
            Entry::Occupied(mut slot) => {
                slot.get_mut().cancel_expiry();
                let expiry = self
                    .scheduler
                    .schedule_after(ttl, self.expiry_action(id, requester_id, target_id));
                slot.insert(TeleportRequest::new(
                    id,
                    requester_id,
                    target_id,
                    created_at,
                    expires_at,
                    expiry,
                ));
                true
            }
            Entry::Vacant(slot) => {
                let expiry = self
                    .scheduler
                    .schedule_after(ttl, self.expiry_action(id, requester_id, target_id));
                slot.insert(TeleportRequest::new(
                    id,
                    requester_id,
                    target_id,
                    created_at,
                    expires_at,
                    expiry,
                ));
                false
            }
        }
    }

    /// Resolve the pending request for `target_id`, returning its requester.
    pub fn accept(&self, target_id: &PlayerId) -> Option<PlayerId> {
        self.remove_and_cancel(target_id)
            .map(|request| request.requester_id())
    }

    /// Drop every request that `player` is part of, as target or requester.
    /// Returns the number of requests removed.
    pub fn clear_for(&self, player: &PlayerId) -> usize {
        let mut cleared = usize::from(self.remove_and_cancel(player).is_some());
        self.requests.retain(|_, request| {
            if request.requester_id() == *player {
                request.cancel_expiry();
                cleared += 1;
                false
            } else {
                true
            }
        });
        cleared
    }

    /// Cancel every expiry and empty the cache. No notifications are sent.
    pub fn clear_all(&self) -> usize {
        let mut cleared = 0;
        self.requests.retain(|_, request| {
            request.cancel_expiry();
            cleared += 1;
            false
        });
        cleared
    }

    /// Who is currently asking to teleport to `target_id`.
    pub fn requester_for(&self, target_id: &PlayerId) -> Option<PlayerId> {
        self.requests
            .get(target_id)
            .map(|request| request.requester_id())
    }

    pub fn pending(&self, target_id: &PlayerId) -> Option<PendingRequest> {
        self.requests.get(target_id).map(|request| request.snapshot())
    }

    /// All live requests sent by `requester_id`, one per target.
    pub fn pending_from(&self, requester_id: &PlayerId) -> Vec<PendingRequest> {
        self.requests
            .iter()
            .filter(|entry| entry.requester_id() == *requester_id)
            .map(|entry| entry.snapshot())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    fn remove_and_cancel(&self, target_id: &PlayerId) -> Option<TeleportRequest<S::Handle>> {
        let (_, mut request) = self.requests.remove(target_id)?;
        request.cancel_expiry();
        Some(request)
    }

    fn expiry_action(&self, id: Uuid, requester_id: PlayerId, target_id: PlayerId) -> ExpiryAction {
        let requests = Arc::downgrade(&self.requests);
        let notifier = Arc::clone(&self.notifier);
        Box::new(move || {
            let Some(requests) = requests.upgrade() else {
                return;
            };
            let removed = requests.remove_if(&target_id, |_, current| {
                current.requester_id() == requester_id && current.id() == id
            });
            drop(requests);
            if let Some((_, mut expired)) = removed {
                expired.disarm();
                drop(expired);
                notifier.expired(requester_id, target_id);
            }
        })
    }
}

impl<S: ExpiryScheduler> std::fmt::Debug for RequestCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCache")
            .field("pending", &self.requests.len())
            .finish()
    }
}

fn expiry_time(created_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| created_at.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
