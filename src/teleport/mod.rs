//! Pending teleport requests: one slot per target, expired by a scheduled
//! action, resolved by whichever of accept / expire / clear gets there first.

pub mod cache;
pub mod errors;
pub mod request;
pub mod scheduler;
pub mod service;
pub mod types;

pub use cache::{ExpiryNotifier, RequestCache};
pub use errors::TeleportError;
pub use request::TeleportRequest;
pub use scheduler::{
    ticks_to_duration, ExpiryAction, ExpiryHandle, ExpiryScheduler, TickScheduler, TokioScheduler,
    DEFAULT_TICK,
};
pub use service::{RequestOutcome, TeleportService};
pub use types::{PendingRequest, PlayerId};
