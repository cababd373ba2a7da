use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a player taking part in a teleport request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(Uuid);

impl PlayerId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Fresh random identity (v4).
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for PlayerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Read-only view of a live request. Carries no expiry handle, so holding one
/// never keeps a scheduled action alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub requester_id: PlayerId,
    pub target_id: PlayerId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingRequest {
    /// Time left until the scheduled expiry, clamped at zero.
    pub fn remaining(&self, now: DateTime<Utc>) -> chrono::Duration {
        let left = self.expires_at.signed_duration_since(now);
        if left < chrono::Duration::zero() {
            chrono::Duration::zero()
        } else {
            left
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_id_displays_as_uuid() {
        let raw = Uuid::new_v4();
        let id = PlayerId::from(raw);
        assert_eq!(id.to_string(), raw.to_string());
        assert_eq!(id.as_uuid(), &raw);
    }

    #[test]
    fn remaining_clamps_at_zero() {
        let now = Utc::now();
        let req = PendingRequest {
            requester_id: PlayerId::random(),
            target_id: PlayerId::random(),
            created_at: now - chrono::Duration::seconds(40),
            expires_at: now - chrono::Duration::seconds(10),
        };
        assert_eq!(req.remaining(now), chrono::Duration::zero());

        let fresh = PendingRequest {
            expires_at: now + chrono::Duration::seconds(30),
            ..req
        };
        assert_eq!(fresh.remaining(now), chrono::Duration::seconds(30));
    }

    #[test]
    fn pending_request_serializes_ids_as_plain_uuids() {
        let now = Utc::now();
        let req = PendingRequest {
            requester_id: PlayerId::random(),
            target_id: PlayerId::random(),
            created_at: now,
            expires_at: now + chrono::Duration::seconds(30),
        };
        let json = serde_json::to_value(&req).expect("serialize");
        assert_eq!(json["requester_id"], req.requester_id.to_string());
        let back: PendingRequest = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, req);
    }
}
