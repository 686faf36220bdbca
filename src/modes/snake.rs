//! Followers strung along the leader's path.
//!
//! The leader's recent positions are kept in a [`Trail`], one sample every
//! `distance` units. Each follower is placed on the trail far enough behind
//! the one ahead to leave room for both hit sizes plus `distance`.

use super::trail::Trail;
use super::{FollowMode, Placement, PlacementContext};
use crate::core::{EntityId, FollowError, FollowResult, Vec2};

/// Trail slots taken by an entity of spacing size `hit`.
#[inline]
fn units(hit: f32, distance: f32) -> f32 {
    (2.0 * hit + distance) / distance
}

/// Snake strategy state.
#[derive(Clone, Debug)]
pub struct SnakePlacement {
    trail: Trail,
    distance: f32,
    required: usize,
    offsets: Vec<f32>,
}

impl SnakePlacement {
    /// Trail seeded at the leader's position.
    #[must_use]
    pub fn new(leader_position: Vec2) -> Self {
        Self {
            trail: Trail::new(leader_position),
            distance: 0.0,
            required: 1,
            offsets: Vec::new(),
        }
    }

    #[must_use]
    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    fn distance_for(ctx: &PlacementContext<'_>) -> f32 {
        ctx.config.snake.distance.max(1.0)
    }

    /// Samples needed to hold the leader and every follower, plus one.
    #[must_use]
    pub fn required_len(ctx: &PlacementContext<'_>) -> usize {
        let distance = Self::distance_for(ctx);
        let total: f32 = units(ctx.leader_hit_size(), distance)
            + ctx
                .followers
                .iter()
                .map(|&id| units(ctx.hit_size(id), distance))
                .sum::<f32>();
        total.ceil() as usize + 1
    }

    fn adapt(&mut self, ctx: &PlacementContext<'_>) {
        self.distance = Self::distance_for(ctx);
        self.required = Self::required_len(ctx);
        self.trail.resize(self.required);
    }
}

impl Placement for SnakePlacement {
    fn mode(&self) -> FollowMode {
        FollowMode::Snake
    }

    fn on_add(&mut self, ctx: &PlacementContext<'_>, _follower: EntityId) {
        self.adapt(ctx);
    }

    fn on_remove(&mut self, ctx: &PlacementContext<'_>, _follower: EntityId) {
        self.adapt(ctx);
    }

    fn on_clear(&mut self, ctx: &PlacementContext<'_>) {
        self.adapt(ctx);
    }

    fn pre_update(&mut self, ctx: &PlacementContext<'_>) -> FollowResult<()> {
        let live = ctx.position(ctx.leader)?;
        if !live.is_finite() {
            return Err(FollowError::NonFinitePosition(ctx.leader));
        }

        if Self::distance_for(ctx) != self.distance || Self::required_len(ctx) != self.required {
            self.adapt(ctx);
        }
        self.trail.advance(live, self.distance);

        let distance = self.distance;
        let mut walked = live.dst(self.trail.head()) + ctx.leader_hit_size();
        self.offsets.clear();
        for &follower in ctx.followers {
            let hit = ctx.hit_size(follower);
            walked += distance + hit;
            self.offsets.push(walked / distance);
            walked += hit;
        }
        Ok(())
    }

    fn compute(
        &mut self,
        ctx: &PlacementContext<'_>,
        index: usize,
        _follower: EntityId,
    ) -> FollowResult<Vec2> {
        let offset = self
            .offsets
            .get(index)
            .copied()
            .ok_or(FollowError::MissingSlot {
                leader: ctx.leader,
                index,
            })?;
        Ok(self.trail.sample(offset))
    }
}
