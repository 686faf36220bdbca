//! Frozen copy of the entities a compute pass reads.
//!
//! The scheduler captures a snapshot on the thread that owns entity state,
//! then hands it to the compute pass. The pass never touches the host, so it
//! can run on any thread.

use rustc_hash::FxHashMap;

use super::entity::{EntityId, EntitySource, EntityState, WorldBounds};

/// Entity states and world bounds captured at the start of a tick.
#[derive(Clone, Debug)]
pub struct WorldSnapshot {
    entities: FxHashMap<EntityId, EntityState>,
    bounds: WorldBounds,
}

impl WorldSnapshot {
    /// Empty snapshot with the given bounds.
    #[must_use]
    pub fn new(bounds: WorldBounds) -> Self {
        Self {
            entities: FxHashMap::default(),
            bounds,
        }
    }

    /// Copy the state of every listed entity out of `source`.
    ///
    /// Entities the source no longer knows are left out, so the compute pass
    /// sees them as unable to update.
    pub fn capture<I>(source: &dyn EntitySource, ids: I) -> Self
    where
        I: IntoIterator<Item = EntityId>,
    {
        let mut snapshot = Self::new(source.world_bounds());
        for id in ids {
            if snapshot.entities.contains_key(&id) {
                continue;
            }
            if let Some(state) = source.entity(id) {
                snapshot.entities.insert(id, state);
            }
        }
        snapshot
    }

    /// Insert or overwrite one entity.
    pub fn insert(&mut self, id: EntityId, state: EntityState) {
        self.entities.insert(id, state);
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

impl EntitySource for WorldSnapshot {
    fn entity(&self, id: EntityId) -> Option<EntityState> {
        self.entities.get(&id).copied()
    }

    fn world_bounds(&self) -> WorldBounds {
        self.bounds
    }
}
