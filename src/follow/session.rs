//! A leader and its ordered followers.

use crate::core::{EntityId, EntitySource, FollowConfig, FollowResult, Vec2};
use crate::modes::{FollowMode, Placement, PlacementContext, Strategy};

/// A position computed for one follower, waiting for the apply phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlannedMove {
    pub leader: EntityId,
    pub follower: EntityId,
    pub position: Vec2,
}

/// One follow session.
///
/// ## Lifecycle
///
/// A session starts empty. It becomes removable (`should_remove`) only after
/// its first add or remove has left it empty, so a freshly created session
/// survives until its first follower arrives.
#[derive(Clone, Debug)]
pub struct FollowSession {
    leader: EntityId,
    followers: Vec<EntityId>,
    can_remove: bool,
    strategy: Strategy,
}

impl FollowSession {
    /// Empty session for `leader` using `mode`.
    pub fn new(leader: EntityId, mode: FollowMode, world: &dyn EntitySource) -> Self {
        let position = world.entity(leader).map_or(Vec2::ZERO, |state| state.position);
        Self {
            leader,
            followers: Vec::new(),
            can_remove: false,
            strategy: Strategy::new(mode, position),
        }
    }

    #[must_use]
    pub fn leader(&self) -> EntityId {
        self.leader
    }

    #[must_use]
    pub fn followers(&self) -> &[EntityId] {
        &self.followers
    }

    #[must_use]
    pub fn mode(&self) -> FollowMode {
        self.strategy.mode()
    }

    #[must_use]
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    #[must_use]
    pub fn contains(&self, follower: EntityId) -> bool {
        self.followers.contains(&follower)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.followers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.followers.is_empty()
    }

    /// Whether the session has been used and is now empty.
    #[must_use]
    pub fn should_remove(&self) -> bool {
        self.can_remove && self.followers.is_empty()
    }

    /// Append a follower. Returns false if it is already in the session.
    pub fn add(&mut self, follower: EntityId, world: &dyn EntitySource, config: &FollowConfig) -> bool {
        if self.contains(follower) {
            return false;
        }
        self.followers.push(follower);
        self.can_remove = true;

        let ctx = PlacementContext::new(self.leader, &self.followers, world, config);
        self.strategy.on_add(&ctx, follower);
        true
    }

    /// Remove a follower. Returns false if it was not in the session.
    pub fn remove(
        &mut self,
        follower: EntityId,
        world: &dyn EntitySource,
        config: &FollowConfig,
    ) -> bool {
        let Some(index) = self.followers.iter().position(|&id| id == follower) else {
            return false;
        };
        self.followers.remove(index);
        self.can_remove = true;

        let ctx = PlacementContext::new(self.leader, &self.followers, world, config);
        self.strategy.on_remove(&ctx, follower);
        true
    }

    /// Drop every follower.
    pub fn clear(&mut self, world: &dyn EntitySource, config: &FollowConfig) {
        if self.followers.is_empty() {
            return;
        }
        self.followers.clear();

        let ctx = PlacementContext::new(self.leader, &self.followers, world, config);
        self.strategy.on_clear(&ctx);
    }

    /// Compute target positions for every follower that can be updated.
    ///
    /// Nothing is produced when the leader cannot be updated or there are no
    /// followers. An error leaves `out` with whatever was pushed before it;
    /// the caller decides whether to keep those moves.
    pub fn update(
        &mut self,
        world: &dyn EntitySource,
        config: &FollowConfig,
        out: &mut Vec<PlannedMove>,
    ) -> FollowResult<()> {
        if self.followers.is_empty() || world.unable_to_update(self.leader) {
            return Ok(());
        }

        let ctx = PlacementContext::new(self.leader, &self.followers, world, config);
        self.strategy.pre_update(&ctx)?;

        for (index, &follower) in self.followers.iter().enumerate() {
            if world.unable_to_update(follower) {
                continue;
            }
            let position = self.strategy.compute(&ctx, index, follower)?;
            out.push(PlannedMove {
                leader: self.leader,
                follower,
                position,
            });
        }
        Ok(())
    }
}
