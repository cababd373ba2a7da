//! # tpcache - Pending Teleport Requests for Multiplayer Servers
//!
//! tpcache tracks "player A asked to teleport to player B" requests for a game
//! server. Each target holds at most one pending request, every request expires
//! on its own after a timeout, and an acceptance and an expiry can never both
//! apply to the same request.
//!
//! ## Features
//!
//! - **Single Slot per Target**: a new request to the same player replaces the old one and cancels its timer.
//! - **Race-Safe Resolution**: accept, expiry and clear paths all resolve through one atomic removal; the first one wins.
//! - **Pluggable Scheduling**: expiry timers come from an injected [`ExpiryScheduler`](teleport::ExpiryScheduler) - Tokio tasks or a host-driven tick loop.
//! - **Disconnect Cleanup**: dropping a player removes every request they sent or received, with no stray timers left behind.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tpcache::config::Config;
//! use tpcache::teleport::{PlayerId, TeleportService, TokioScheduler};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("tpcache.toml").await?;
//!     let scheduler = TokioScheduler::try_current().expect("inside a runtime");
//!     let service = TeleportService::new(scheduler, &config.teleport, |requester: PlayerId, target: PlayerId| {
//!         println!("request from {requester} to {target} expired");
//!     })?;
//!
//!     let (alice, bob) = (PlayerId::random(), PlayerId::random());
//!     service.request(alice, bob)?;
//!     assert_eq!(service.accept(bob)?, alice);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`teleport`] - request cache, schedulers and the service facade
//! - [`config`] - TOML configuration
//! - [`metrics`] - request outcome counters

pub mod config;
pub mod metrics;
pub mod teleport;
