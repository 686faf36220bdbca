//! # rust-follow
//!
//! A follower-positioning engine: entities follow a leader in formation,
//! recomputed on a fixed tick.
//!
//! ## Design Principles
//!
//! 1. **Host-Agnostic**: The engine never owns entities. It reads them through
//!    `EntitySource` and writes positions back through `EntitySink`.
//!
//! 2. **Two-Phase Ticks**: Positions are computed against a frozen snapshot,
//!    then applied on the host's thread. Structural changes made while a
//!    compute pass runs are buffered and flushed at the tick boundary.
//!
//! 3. **Fail Per Session**: A session whose update errors or panics is dropped
//!    on its own; every other session keeps moving.
//!
//! ## Modules
//!
//! - `core`: Vectors, entity ids and traits, configuration, errors, snapshots
//! - `geometry`: Circle helpers for ring packing
//! - `modes`: Placement strategies (joint, arc, orbit, snake)
//! - `follow`: Sessions, the registry and its pending-change buffer
//! - `scheduler`: Compute passes, the worker thread and the tick driver
//! - `world`: In-memory reference host
//!
//! ## Example
//!
//! ```
//! use std::time::Instant;
//!
//! use rust_follow::{EntityId, EntityState, FollowConfig, FollowMode, FollowScheduler, MemoryWorld, Vec2};
//!
//! let mut world = MemoryWorld::new(1000.0, 1000.0);
//! world.spawn(EntityId(1), EntityState::new(Vec2::new(500.0, 500.0)).with_hit_size(4.0));
//! world.spawn(EntityId(2), EntityState::new(Vec2::new(550.0, 500.0)).with_hit_size(4.0));
//!
//! let mut scheduler = FollowScheduler::new(FollowConfig::default()).unwrap();
//! scheduler
//!     .registry_mut()
//!     .follow(EntityId(1), EntityId(2), Some(FollowMode::Joint), &world)
//!     .unwrap();
//!
//! let summary = scheduler.tick(Instant::now(), &mut world).unwrap();
//! assert_eq!(summary.applied, 1);
//! // Dragged to 24 units (spacing 16 + two hit sizes of 4) behind the leader.
//! let follower = world.position(EntityId(2)).unwrap();
//! assert!((follower.x - 524.0).abs() < 1e-3);
//! ```

pub mod core;
pub mod follow;
pub mod geometry;
pub mod modes;
pub mod scheduler;
pub mod world;

// Re-export commonly used types
pub use crate::core::{
    ArcConfig, BoundsPolicy, EntityId, EntitySink, EntitySource, EntityState, ExecutionMode,
    FollowConfig, FollowError, FollowResult, JointConfig, OrbitConfig, SnakeConfig, Vec2,
    WorldBounds, WorldSnapshot,
};

pub use crate::follow::{
    FollowOutcome, FollowRegistry, FollowSession, PlannedMove, SharedSession, TickPhase,
};

pub use crate::modes::{FollowMode, Placement, PlacementContext, Strategy};

pub use crate::scheduler::{FollowScheduler, TickSummary};

pub use crate::world::MemoryWorld;
