//! Chain formation with slack.
//!
//! Each follower hangs behind the entity ahead of it in the list (the leader
//! for the first one). A member only moves when the one ahead pulls it past
//! the minimum distance, and then only by the excess, so the chain drags
//! instead of snapping into a straight line.

use rustc_hash::FxHashMap;

use super::{FollowMode, Placement, PlacementContext};
use crate::core::{EntityId, FollowResult, Vec2};

/// Joint strategy state: the resolved point of every follower.
#[derive(Clone, Debug, Default)]
pub struct JointPlacement {
    resolved: FxHashMap<EntityId, Vec2>,
}

impl JointPlacement {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last resolved point of a follower, if it has been placed.
    #[must_use]
    pub fn resolved(&self, follower: EntityId) -> Option<Vec2> {
        self.resolved.get(&follower).copied()
    }
}

impl Placement for JointPlacement {
    fn mode(&self) -> FollowMode {
        FollowMode::Joint
    }

    fn on_remove(&mut self, _ctx: &PlacementContext<'_>, follower: EntityId) {
        self.resolved.remove(&follower);
    }

    fn on_clear(&mut self, _ctx: &PlacementContext<'_>) {
        self.resolved.clear();
    }

    fn compute(
        &mut self,
        ctx: &PlacementContext<'_>,
        index: usize,
        follower: EntityId,
    ) -> FollowResult<Vec2> {
        let ahead = match index.checked_sub(1).and_then(|i| ctx.followers.get(i)) {
            Some(&id) => id,
            None => ctx.leader,
        };
        let ahead_position = match self.resolved.get(&ahead) {
            Some(&point) => point,
            None => ctx.position(ahead)?,
        };

        let mut point = match self.resolved.get(&follower) {
            Some(&point) => point,
            None => ctx.position(follower)?,
        };

        let min_distance = ctx.config.joint.spacing + ctx.hit_size(ahead) + ctx.hit_size(follower);
        let distance = point.dst(ahead_position);
        if distance > min_distance {
            point = point.approach(ahead_position, distance - min_distance);
        }

        self.resolved.insert(follower, point);
        Ok(point)
    }
}
