//! Placement strategies.
//!
//! A strategy decides where each follower of a session goes on a tick:
//! - `Joint`: a chain with slack, each member dragged behind the one ahead
//! - `Arc`: half-rings packed behind the leader's facing
//! - `Orbit`: full rings rotating around the leader
//! - `Snake`: members spaced along the leader's recent path
//!
//! Strategies implement [`Placement`] and are stored in the [`Strategy`] enum
//! so a session can swap modes without boxing.

pub mod arc;
pub mod joint;
pub mod orbit;
pub mod rings;
pub mod snake;
pub mod trail;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{
    EntityId, EntitySource, EntityState, FollowConfig, FollowError, FollowResult, Vec2,
};

pub use arc::ArcPlacement;
pub use joint::JointPlacement;
pub use orbit::OrbitPlacement;
pub use rings::Ring;
pub use snake::SnakePlacement;
pub use trail::Trail;

/// Strategy tag, used in requests and configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowMode {
    #[default]
    Joint,
    Arc,
    Snake,
    Orbit,
}

impl FollowMode {
    /// Every mode, in display order.
    pub const ALL: [FollowMode; 4] = [
        FollowMode::Joint,
        FollowMode::Arc,
        FollowMode::Snake,
        FollowMode::Orbit,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            FollowMode::Joint => "joint",
            FollowMode::Arc => "arc",
            FollowMode::Snake => "snake",
            FollowMode::Orbit => "orbit",
        }
    }
}

impl fmt::Display for FollowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FollowMode {
    type Err = FollowError;

    /// Case-insensitive lookup by name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| FollowError::UnknownMode(s.to_string()))
    }
}

/// Everything a strategy may read while placing followers.
///
/// `followers` is always the session's current list, so hooks see the list
/// after the add or remove they are reacting to.
#[derive(Clone, Copy)]
pub struct PlacementContext<'a> {
    pub leader: EntityId,
    pub followers: &'a [EntityId],
    pub world: &'a dyn EntitySource,
    pub config: &'a FollowConfig,
}

impl<'a> PlacementContext<'a> {
    #[must_use]
    pub fn new(
        leader: EntityId,
        followers: &'a [EntityId],
        world: &'a dyn EntitySource,
        config: &'a FollowConfig,
    ) -> Self {
        Self {
            leader,
            followers,
            world,
            config,
        }
    }

    /// Live leader state, or `MissingEntity` if it is gone.
    pub fn leader_state(&self) -> FollowResult<EntityState> {
        self.world
            .entity(self.leader)
            .ok_or(FollowError::MissingEntity(self.leader))
    }

    /// Live position of any entity, or `MissingEntity`.
    pub fn position(&self, id: EntityId) -> FollowResult<Vec2> {
        self.world
            .entity(id)
            .map(|state| state.position)
            .ok_or(FollowError::MissingEntity(id))
    }

    #[must_use]
    pub fn hit_size(&self, id: EntityId) -> f32 {
        self.world.hit_size(id)
    }

    #[must_use]
    pub fn leader_hit_size(&self) -> f32 {
        self.world.hit_size(self.leader)
    }

    /// Sum of every follower's spacing size.
    #[must_use]
    pub fn total_follower_hit_size(&self) -> f32 {
        self.followers.iter().map(|&id| self.world.hit_size(id)).sum()
    }

    /// Fill `out` with the spacing size of each follower, in order.
    pub fn follower_sizes(&self, out: &mut Vec<f32>) {
        out.clear();
        out.extend(self.followers.iter().map(|&id| self.world.hit_size(id)));
    }
}

/// Placement strategy.
///
/// The session calls the membership hooks right after changing its list,
/// then on every tick calls `pre_update` once followed by `compute` for each
/// follower that can be updated, in list order.
///
/// ## Implementation Notes
///
/// - Hooks repack eagerly; `pre_update` repacks only when something it
///   packed with has changed
/// - `compute` must look its slot up by `index`: skipped followers never
///   shift the others
/// - `compute` returns an absolute world position
pub trait Placement {
    fn mode(&self) -> FollowMode;

    fn on_add(&mut self, _ctx: &PlacementContext<'_>, _follower: EntityId) {}

    fn on_remove(&mut self, _ctx: &PlacementContext<'_>, _follower: EntityId) {}

    fn on_clear(&mut self, _ctx: &PlacementContext<'_>) {}

    fn pre_update(&mut self, _ctx: &PlacementContext<'_>) -> FollowResult<()> {
        Ok(())
    }

    /// Target position of the follower at `index`.
    fn compute(
        &mut self,
        ctx: &PlacementContext<'_>,
        index: usize,
        follower: EntityId,
    ) -> FollowResult<Vec2>;
}

/// Strategy state owned by a session.
#[derive(Clone, Debug)]
pub enum Strategy {
    Joint(JointPlacement),
    Arc(ArcPlacement),
    Orbit(OrbitPlacement),
    Snake(SnakePlacement),
}

impl Strategy {
    /// Fresh state for `mode`. The snake trail starts at `leader_position`.
    #[must_use]
    pub fn new(mode: FollowMode, leader_position: Vec2) -> Self {
        match mode {
            FollowMode::Joint => Strategy::Joint(JointPlacement::new()),
            FollowMode::Arc => Strategy::Arc(ArcPlacement::new()),
            FollowMode::Orbit => Strategy::Orbit(OrbitPlacement::new()),
            FollowMode::Snake => Strategy::Snake(SnakePlacement::new(leader_position)),
        }
    }

    fn inner(&self) -> &dyn Placement {
        match self {
            Strategy::Joint(s) => s,
            Strategy::Arc(s) => s,
            Strategy::Orbit(s) => s,
            Strategy::Snake(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Placement {
        match self {
            Strategy::Joint(s) => s,
            Strategy::Arc(s) => s,
            Strategy::Orbit(s) => s,
            Strategy::Snake(s) => s,
        }
    }
}

impl Placement for Strategy {
    fn mode(&self) -> FollowMode {
        self.inner().mode()
    }

    fn on_add(&mut self, ctx: &PlacementContext<'_>, follower: EntityId) {
        self.inner_mut().on_add(ctx, follower);
    }

    fn on_remove(&mut self, ctx: &PlacementContext<'_>, follower: EntityId) {
        self.inner_mut().on_remove(ctx, follower);
    }

    fn on_clear(&mut self, ctx: &PlacementContext<'_>) {
        self.inner_mut().on_clear(ctx);
    }

    fn pre_update(&mut self, ctx: &PlacementContext<'_>) -> FollowResult<()> {
        self.inner_mut().pre_update(ctx)
    }

    fn compute(
        &mut self,
        ctx: &PlacementContext<'_>,
        index: usize,
        follower: EntityId,
    ) -> FollowResult<Vec2> {
        self.inner_mut().compute(ctx, index, follower)
    }
}
