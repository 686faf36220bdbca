//! Entity identification and the host-facing entity traits.
//!
//! Every leader and follower is referred to by a stable `EntityId`. The engine
//! never holds entity references: it reads state through an [`EntitySource`]
//! and writes positions back through an [`EntitySink`].
//!
//! ## Identity
//!
//! Equality is by id, not by reference. A host that reconnects an entity
//! under a new object keeps the same `EntityId`, and the engine keeps treating
//! it as the same leader or follower.
//!
//! ```
//! use rust_follow::core::{EntityId, EntityState, Vec2};
//!
//! let id = EntityId(7);
//! assert_eq!(format!("{}", id), "Entity(7)");
//!
//! let state = EntityState::new(Vec2::new(10.0, 10.0)).with_hit_size(0.5);
//! // Spacing never uses a hit size below 1.
//! assert_eq!(state.effective_hit_size(), 1.0);
//! ```

use serde::{Deserialize, Serialize};

use super::Vec2;

/// Stable identifier for a leader or follower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// What the engine needs to know about an entity at one instant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// World position.
    pub position: Vec2,

    /// Facing, in degrees, counter-clockwise from +x.
    pub rotation: f32,

    /// Radius-like size used for spacing.
    pub hit_size: f32,

    /// Dead or otherwise invalid entities are skipped for the tick.
    pub dead: bool,
}

impl EntityState {
    /// A live entity at `position`, facing +x, with a hit size of 1.
    #[must_use]
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            rotation: 0.0,
            hit_size: 1.0,
            dead: false,
        }
    }

    #[must_use]
    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    #[must_use]
    pub fn with_hit_size(mut self, hit_size: f32) -> Self {
        self.hit_size = hit_size;
        self
    }

    #[must_use]
    pub fn dead(mut self) -> Self {
        self.dead = true;
        self
    }

    /// Hit size used for spacing: at least 1, and exactly 1 for dead entities.
    #[must_use]
    pub fn effective_hit_size(&self) -> f32 {
        if self.dead || !self.hit_size.is_finite() {
            1.0
        } else {
            self.hit_size.max(1.0)
        }
    }
}

/// Playable area. Positions outside `[0, width] × [0, height]` are not applied.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

impl WorldBounds {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// No effective bounds.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            width: f32::MAX,
            height: f32::MAX,
        }
    }

    #[must_use]
    pub fn contains(&self, position: Vec2) -> bool {
        position.x >= 0.0
            && position.y >= 0.0
            && position.x <= self.width
            && position.y <= self.height
    }

    #[must_use]
    pub fn clamp(&self, position: Vec2) -> Vec2 {
        position.clamp(Vec2::ZERO, Vec2::new(self.width, self.height))
    }
}

/// Read side of the host: entity lookup and world bounds.
///
/// Implemented by the host for hook evaluation on its own thread, and by
/// [`WorldSnapshot`](super::WorldSnapshot) for the compute pass.
pub trait EntitySource {
    /// Current state of an entity, or `None` if it is gone.
    fn entity(&self, id: EntityId) -> Option<EntityState>;

    /// The playable area.
    fn world_bounds(&self) -> WorldBounds;

    /// Whether the entity must be skipped this tick (missing or dead).
    fn unable_to_update(&self, id: EntityId) -> bool {
        self.entity(id).map_or(true, |state| state.dead)
    }

    /// Spacing size of an entity, 1 when it is missing or dead.
    fn hit_size(&self, id: EntityId) -> f32 {
        self.entity(id).map_or(1.0, |state| state.effective_hit_size())
    }
}

/// Write side of the host, only used during the apply phase.
pub trait EntitySink {
    /// Write the authoritative position of a follower.
    fn set_position(&mut self, id: EntityId, position: Vec2);

    /// Called once per applied follower per tick, after `set_position`.
    ///
    /// Hosts typically forward this to network sync.
    fn notify(&mut self, _id: EntityId, _position: Vec2) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneEntity(Option<EntityState>);

    impl EntitySource for OneEntity {
        fn entity(&self, _id: EntityId) -> Option<EntityState> {
            self.0
        }

        fn world_bounds(&self) -> WorldBounds {
            WorldBounds::unbounded()
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", EntityId(42)), "Entity(42)");
        assert_eq!(EntityId::new(42).raw(), 42);
    }

    #[test]
    fn test_effective_hit_size() {
        let base = EntityState::new(Vec2::ZERO);
        assert_eq!(base.with_hit_size(4.0).effective_hit_size(), 4.0);
        assert_eq!(base.with_hit_size(0.2).effective_hit_size(), 1.0);
        assert_eq!(base.with_hit_size(8.0).dead().effective_hit_size(), 1.0);
        assert_eq!(base.with_hit_size(f32::NAN).effective_hit_size(), 1.0);
    }

    #[test]
    fn test_source_defaults() {
        let missing = OneEntity(None);
        assert!(missing.unable_to_update(EntityId(1)));
        assert_eq!(missing.hit_size(EntityId(1)), 1.0);

        let dead = OneEntity(Some(EntityState::new(Vec2::ZERO).with_hit_size(5.0).dead()));
        assert!(dead.unable_to_update(EntityId(1)));
        assert_eq!(dead.hit_size(EntityId(1)), 1.0);

        let alive = OneEntity(Some(EntityState::new(Vec2::ZERO).with_hit_size(5.0)));
        assert!(!alive.unable_to_update(EntityId(1)));
        assert_eq!(alive.hit_size(EntityId(1)), 5.0);
    }

    #[test]
    fn test_bounds() {
        let bounds = WorldBounds::new(100.0, 50.0);
        assert!(bounds.contains(Vec2::new(0.0, 0.0)));
        assert!(bounds.contains(Vec2::new(100.0, 50.0)));
        assert!(!bounds.contains(Vec2::new(-0.1, 10.0)));
        assert!(!bounds.contains(Vec2::new(10.0, 50.1)));
        assert_eq!(bounds.clamp(Vec2::new(120.0, -3.0)), Vec2::new(100.0, 0.0));
    }

    #[test]
    fn test_serialization() {
        let id = EntityId(123);
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
