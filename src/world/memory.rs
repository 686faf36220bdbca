//! Map-backed entity store implementing both host traits.

use rustc_hash::FxHashMap;

use crate::core::{EntityId, EntitySink, EntitySource, EntityState, Vec2, WorldBounds};

/// Entities in a plain map, plus a log of applied moves.
#[derive(Clone, Debug)]
pub struct MemoryWorld {
    entities: FxHashMap<EntityId, EntityState>,
    bounds: WorldBounds,
    notifications: Vec<(EntityId, Vec2)>,
}

impl MemoryWorld {
    /// Empty world of `width × height`.
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self::with_bounds(WorldBounds::new(width, height))
    }

    #[must_use]
    pub fn with_bounds(bounds: WorldBounds) -> Self {
        Self {
            entities: FxHashMap::default(),
            bounds,
            notifications: Vec::new(),
        }
    }

    /// Add or replace an entity.
    pub fn spawn(&mut self, id: EntityId, state: EntityState) {
        self.entities.insert(id, state);
    }

    /// Remove an entity. Returns its last state.
    pub fn despawn(&mut self, id: EntityId) -> Option<EntityState> {
        self.entities.remove(&id)
    }

    /// Move an entity as the host would (player input, physics...).
    pub fn move_to(&mut self, id: EntityId, position: Vec2) {
        if let Some(state) = self.entities.get_mut(&id) {
            state.position = position;
        }
    }

    pub fn set_rotation(&mut self, id: EntityId, degrees: f32) {
        if let Some(state) = self.entities.get_mut(&id) {
            state.rotation = degrees;
        }
    }

    pub fn set_dead(&mut self, id: EntityId, dead: bool) {
        if let Some(state) = self.entities.get_mut(&id) {
            state.dead = dead;
        }
    }

    #[must_use]
    pub fn position(&self, id: EntityId) -> Option<Vec2> {
        self.entities.get(&id).map(|state| state.position)
    }

    /// Every `notify` received since the last `take_notifications`.
    #[must_use]
    pub fn notifications(&self) -> &[(EntityId, Vec2)] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<(EntityId, Vec2)> {
        std::mem::take(&mut self.notifications)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl EntitySource for MemoryWorld {
    fn entity(&self, id: EntityId) -> Option<EntityState> {
        self.entities.get(&id).copied()
    }

    fn world_bounds(&self) -> WorldBounds {
        self.bounds
    }
}

impl EntitySink for MemoryWorld {
    fn set_position(&mut self, id: EntityId, position: Vec2) {
        self.move_to(id, position);
    }

    fn notify(&mut self, id: EntityId, position: Vec2) {
        self.notifications.push((id, position));
    }
}
