//! Half-ring formation behind the leader.
//!
//! Followers are packed onto rings centred on the direction opposite to the
//! leader's facing. Each ring spans at most `2 × max_sides_angle`; when a
//! ring is full the next follower starts a wider one.

use super::rings::{self, PackKey, Ring};
use super::{FollowMode, Placement, PlacementContext};
use crate::core::{EntityId, FollowError, FollowResult, Vec2};

/// Arc strategy state.
#[derive(Clone, Debug, Default)]
pub struct ArcPlacement {
    rings: Vec<Ring>,
    key: PackKey,
    sizes: Vec<f32>,
}

impl ArcPlacement {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current ring layout.
    #[must_use]
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    fn key_for(ctx: &PlacementContext<'_>) -> PackKey {
        let arc = &ctx.config.arc;
        PackKey {
            leader_hit: ctx.leader_hit_size(),
            total_hit: ctx.total_follower_hit_size(),
            ring_gap: arc.ring_gap.max(1.0),
            spacing: arc.spacing.max(0.0),
            budget: arc.budget(),
            members: ctx.followers.len(),
        }
    }

    fn repack(&mut self, ctx: &PlacementContext<'_>, key: PackKey) {
        ctx.follower_sizes(&mut self.sizes);
        rings::pack_arc(
            &mut self.rings,
            &self.sizes,
            key.leader_hit,
            key.ring_gap,
            key.spacing,
            key.budget,
        );
        self.key = key;
    }
}

impl Placement for ArcPlacement {
    fn mode(&self) -> FollowMode {
        FollowMode::Arc
    }

    fn on_add(&mut self, ctx: &PlacementContext<'_>, _follower: EntityId) {
        self.repack(ctx, Self::key_for(ctx));
    }

    fn on_remove(&mut self, ctx: &PlacementContext<'_>, _follower: EntityId) {
        self.repack(ctx, Self::key_for(ctx));
    }

    fn on_clear(&mut self, ctx: &PlacementContext<'_>) {
        self.repack(ctx, Self::key_for(ctx));
    }

    fn pre_update(&mut self, ctx: &PlacementContext<'_>) -> FollowResult<()> {
        let key = Self::key_for(ctx);
        if key != self.key {
            self.repack(ctx, key);
        }
        Ok(())
    }

    fn compute(
        &mut self,
        ctx: &PlacementContext<'_>,
        index: usize,
        _follower: EntityId,
    ) -> FollowResult<Vec2> {
        let leader = ctx.leader_state()?;
        let (ring, angle) = rings::locate(&self.rings, index).ok_or(FollowError::MissingSlot {
            leader: ctx.leader,
            index,
        })?;
        let behind = (leader.rotation + 180.0).to_radians();
        Ok(leader.position.polar_offset(behind + angle, ring.radius))
    }
}
