use thiserror::Error;

use super::types::PlayerId;

/// Errors surfaced by the teleport service facade. The cache core itself is
/// infallible.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TeleportError {
    /// A player tried to send a request to themselves.
    #[error("player {0} cannot send a teleport request to themselves")]
    SelfRequest(PlayerId),

    /// Request timeout or tick length configured as zero.
    #[error("teleport request timeout must be greater than zero")]
    InvalidTimeout,

    /// `accept` found no pending request for this target.
    #[error("no pending teleport request for {0}")]
    NothingPending(PlayerId),
}
