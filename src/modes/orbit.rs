//! Rotating full rings around the leader.
//!
//! Packing is the greedy full-ring variant from [`rings::pack_orbit`]. Every
//! tick the rings turn by `angle_speed`, alternating direction from one ring
//! to the next.

use std::f32::consts::TAU;

use super::rings::{self, PackKey, Ring};
use super::{FollowMode, Placement, PlacementContext};
use crate::core::{EntityId, FollowError, FollowResult, Vec2};

/// Orbit strategy state.
#[derive(Clone, Debug, Default)]
pub struct OrbitPlacement {
    rings: Vec<Ring>,
    key: PackKey,
    sizes: Vec<f32>,
}

impl OrbitPlacement {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    fn key_for(ctx: &PlacementContext<'_>) -> PackKey {
        let orbit = &ctx.config.orbit;
        PackKey {
            leader_hit: ctx.leader_hit_size(),
            total_hit: ctx.total_follower_hit_size(),
            ring_gap: orbit.ring_gap.max(1.0),
            spacing: orbit.spacing.max(0.0),
            budget: TAU,
            members: ctx.followers.len(),
        }
    }

    fn repack(&mut self, ctx: &PlacementContext<'_>, key: PackKey) {
        ctx.follower_sizes(&mut self.sizes);
        rings::pack_orbit(
            &mut self.rings,
            &self.sizes,
            key.leader_hit,
            key.ring_gap,
            key.spacing,
        );
        self.key = key;
    }

    /// Turn every ring by `degrees`: even rings forward, odd rings back.
    fn rotate(&mut self, degrees: f32) {
        let step = degrees.to_radians();
        for (i, ring) in self.rings.iter_mut().enumerate() {
            let delta = if i % 2 == 0 { step } else { -step };
            ring.phase = (ring.phase + delta).rem_euclid(TAU);
        }
    }
}

impl Placement for OrbitPlacement {
    fn mode(&self) -> FollowMode {
        FollowMode::Orbit
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
        if !self.rings.is_empty() {
            self.rotate(ctx.config.orbit.angle_speed);
        }
        Ok(())
    }

    fn compute(
        &mut self,
        ctx: &PlacementContext<'_>,
        index: usize,
        _follower: EntityId,
    ) -> FollowResult<Vec2> {
        let leader = ctx.position(ctx.leader)?;
        let (ring, angle) = rings::locate(&self.rings, index).ok_or(FollowError::MissingSlot {
            leader: ctx.leader,
            index,
        })?;
        Ok(leader.polar_offset(ring.phase + angle, ring.radius))
    }
}
