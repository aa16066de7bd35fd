//! # gridhunt
//!
//! Real-time multiplayer word-search room engine. Players join a room by
//! code, contribute words under a timer, then race to find them on a
//! letter grid while scores update live.
//!
//! The crate owns the authoritative room state: the phase machine
//! (`lobby -> entry -> play -> finished`), timer-driven transitions, the
//! word/scoring ledger, and grid generation. All mutation for a room is
//! serialized through the [`SessionRegistry`]; connected clients receive
//! deltas via the per-room broadcast stream. Persistence and identity
//! verification are pluggable seams ([`Store`], [`TokenVerifier`]).
//!
//! ## Example
//!
//! ```rust,ignore
//! use gridhunt::{
//!     Command, EngineConfig, Identity, MemoryStore, Notice, SessionRegistry,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = SessionRegistry::new(MemoryStore::new(), EngineConfig::default());
//!
//!     let host = Identity::new("u1", "alice");
//!     let room = registry.create_room(&host).await?;
//!     let mut notices = registry.subscribe(&room.code).await;
//!
//!     registry.apply(&host, &room.code, Command::Join).await?;
//!     registry.apply(&host, &room.code, Command::ToggleReady).await?;
//!     registry.apply(&host, &room.code, Command::StartGame).await?;
//!
//!     while let Ok(notice) = notices.recv().await {
//!         if let Notice::PhaseChange { phase, .. } = notice {
//!             println!("room is now in the {phase} phase");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod error;
pub mod grid;
pub mod identity;
pub mod ledger;
pub mod phase;
pub mod registry;
pub mod store;
pub mod timers;
pub mod types;


pub use broadcast::BroadcastGateway;
pub use error::{EngineError, Reject, Result};
pub use grid::{DEFAULT_GRID_SIZE, GridBuild, build_grid};
pub use identity::{Identity, MemoryTokenVault, TokenVerifier};
pub use ledger::FindOutcome;
pub use registry::SessionRegistry;
pub use store::{MemoryStore, PlayerStats, Store};
pub use timers::TimerManager;
pub use types::*;
