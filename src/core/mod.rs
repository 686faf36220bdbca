//! Core engine types: ids, positions, entity traits, configuration, errors.
//!
//! Everything here is mode-agnostic. Strategies, sessions and the scheduler
//! build on these types and never reach into the host directly.

pub mod config;
pub mod entity;
pub mod error;
pub mod snapshot;
pub mod vec2;

pub use config::{
    ArcConfig, BoundsPolicy, ExecutionMode, FollowConfig, JointConfig, OrbitConfig, SnakeConfig,
    TILE_SIZE,
};
pub use entity::{EntityId, EntitySink, EntitySource, EntityState, WorldBounds};
pub use error::{FollowError, FollowResult};
pub use snapshot::WorldSnapshot;
pub use vec2::Vec2;
