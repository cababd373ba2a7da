//! Caller-facing facade over [`RequestCache`].
//!
//! Enforces the preconditions the cache leaves to its callers (no
//! self-requests, a positive configured timeout), and is where logging and
//! metrics for request outcomes happen.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use super::cache::{ExpiryNotifier, RequestCache};
use super::errors::TeleportError;
use super::scheduler::ExpiryScheduler;
use super::types::{PendingRequest, PlayerId};
use crate::config::TeleportConfig;
use crate::metrics;

/// What happened to the target's slot when a request was filed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Created,
    /// An older request to the same target was cancelled and replaced.
    Superseded,
}

pub struct TeleportService<S: ExpiryScheduler> {
    cache: RequestCache<S>,
    timeout: Duration,
}

impl<S> TeleportService<S>
where
    S: ExpiryScheduler,
    S::Handle: 'static,
{
    pub fn new(
        scheduler: S,
        config: &TeleportConfig,
        notifier: impl ExpiryNotifier + 'static,
    ) -> Result<Self, TeleportError> {
        config.validate()?;
        let host = Arc::new(notifier);
        let cache = RequestCache::new(scheduler, move |requester: PlayerId, target: PlayerId| {
            metrics::inc_requests_expired();
            info!("Teleport request from {} to {} expired", requester, target);
            host.expired(requester, target);
        });
        Ok(Self {
            cache,
            timeout: config.request_timeout(),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cache(&self) -> &RequestCache<S> {
        &self.cache
    }

    /// File a request for `requester` to teleport to `target`.
    pub fn request(
        &self,
        requester: PlayerId,
        target: PlayerId,
    ) -> Result<RequestOutcome, TeleportError> {
        if requester == target {
            warn!("Rejected self teleport request from {}", requester);
            return Err(TeleportError::SelfRequest(requester));
        }
        let superseded = self.cache.put(requester, target, self.timeout);
        metrics::inc_requests_created();
        if superseded {
            metrics::inc_requests_superseded();
            debug!("Replaced pending teleport request for {}", target);
        }
        debug!(
            "Teleport request {} -> {} pending for {:?}",
            requester, target, self.timeout
        );
        Ok(if superseded {
            RequestOutcome::Superseded
        } else {
            RequestOutcome::Created
        })
    }

    /// Accept the request waiting on `target`; returns the player who moves.
    pub fn accept(&self, target: PlayerId) -> Result<PlayerId, TeleportError> {
        let requester = self
            .cache
            .accept(&target)
            .ok_or(TeleportError::NothingPending(target))?;
        metrics::inc_requests_accepted();
        info!("{} accepted teleport request from {}", target, requester);
        Ok(requester)
    }

    pub fn pending_for(&self, target: PlayerId) -> Option<PendingRequest> {
        self.cache.pending(&target)
    }

    /// Forget a player who disconnected, in both directions.
    pub fn player_left(&self, player: PlayerId) -> usize {
        let cleared = self.cache.clear_for(&player);
        metrics::add_requests_cleared(cleared);
        info!(
            "Cleared {} pending teleport request(s) for {}",
            cleared, player
        );
        cleared
    }

    pub fn shutdown(&self) -> usize {
        let cleared = self.cache.clear_all();
        metrics::add_requests_cleared(cleared);
        info!("Teleport service stopped, dropped {} pending request(s)", cleared);
        cleared
    }
}
