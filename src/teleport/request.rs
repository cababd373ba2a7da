use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::scheduler::ExpiryHandle;
use super::types::{PendingRequest, PlayerId};

/// A live teleport request together with the handle of its expiry action.
///
/// The handle is owned exclusively by this record. Dropping the record cancels
/// the action unless it was [disarmed](Self::disarm) first, which is what the
/// expiry path itself does.
#[derive(Debug)]
pub struct TeleportRequest<H: ExpiryHandle> {
    id: Uuid,
    requester_id: PlayerId,
    target_id: PlayerId,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    expiry: Option<H>,
}

impl<H: ExpiryHandle> TeleportRequest<H> {
    pub fn new(
        id: Uuid,
        requester_id: PlayerId,
        target_id: PlayerId,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        expiry: H,
    ) -> Self {
        Self {
            id,
            requester_id,
            target_id,
            created_at,
            expires_at,
            expiry: Some(expiry),
        }
    }

    /// Generation token distinguishing this request from any later one
    /// between the same two players.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn requester_id(&self) -> PlayerId {
        self.requester_id
    }

    pub fn target_id(&self) -> PlayerId {
        self.target_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True while the record still owns a scheduled expiry.
    pub fn is_armed(&self) -> bool {
        self.expiry.is_some()
    }

    /// Cancel the expiry action. Returns false if it was already gone.
    pub fn cancel_expiry(&mut self) -> bool {
        match self.expiry.take() {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Release the handle without cancelling it. Used from inside the expiry
    /// action, which must not cancel itself.
    pub fn disarm(&mut self) {
        self.expiry = None;
    }

    pub fn snapshot(&self) -> PendingRequest {
        PendingRequest {
            requester_id: self.requester_id,
            target_id: self.target_id,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

impl<H: ExpiryHandle> Drop for TeleportRequest<H> {
    fn drop(&mut self) {
        self.cancel_expiry();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingHandle(Arc<AtomicUsize>);

    impl ExpiryHandle for CountingHandle {
        fn cancel(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn request(cancels: &Arc<AtomicUsize>) -> TeleportRequest<CountingHandle> {
        let now = Utc::now();
        TeleportRequest::new(
            Uuid::new_v4(),
            PlayerId::random(),
            PlayerId::random(),
            now,
            now + chrono::Duration::seconds(30),
            CountingHandle(Arc::clone(cancels)),
        )
    }

    #[test]
    fn cancel_expiry_only_cancels_once() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let mut req = request(&cancels);
        assert!(req.is_armed());
        assert!(req.cancel_expiry());
        assert!(!req.cancel_expiry());
        drop(req);
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_cancels_armed_request() {
        let cancels = Arc::new(AtomicUsize::new(0));
        drop(request(&cancels));
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disarmed_request_drops_without_cancelling() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let mut req = request(&cancels);
        req.disarm();
        assert!(!req.is_armed());
        drop(req);
        assert_eq!(cancels.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn snapshot_copies_identities_and_times() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let req = request(&cancels);
        let snap = req.snapshot();
        assert_eq!(snap.requester_id, req.requester_id());
        assert_eq!(snap.target_id, req.target_id());
        assert_eq!(snap.created_at, req.created_at());
        assert_eq!(snap.expires_at, req.expires_at());
    }
}
