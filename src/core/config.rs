//! Engine configuration.
//!
//! The host builds a `FollowConfig` at startup and may swap it at any time
//! through the registry. Strategies compare the parameters they last packed
//! with against the active config on every tick and repack lazily when they
//! differ.
//!
//! All distances are in world units. The defaults assume an 8-unit tile:
//! two tiles between followers, three tiles between rings.
//!
//! ```
//! use rust_follow::core::{FollowConfig, ExecutionMode};
//! use rust_follow::modes::FollowMode;
//!
//! let config = FollowConfig::default()
//!     .with_default_mode(FollowMode::Arc)
//!     .with_execution(ExecutionMode::Worker)
//!     .with_tick_interval_ms(50);
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.arc.max_sides_angle, 90.0);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{FollowError, FollowResult};
use crate::modes::FollowMode;

/// World units per tile.
pub const TILE_SIZE: f32 = 8.0;

/// Default tick interval: 30 updates per second.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 33;

/// What to do with a computed position outside the world bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundsPolicy {
    /// Skip the follower for this tick.
    #[default]
    Drop,
    /// Clamp the position into the bounds.
    Clamp,
}

/// Where the compute pass runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// On the caller's thread, inside `begin`.
    #[default]
    Inline,
    /// On a dedicated worker thread.
    Worker,
    /// On the worker thread, fanned out across sessions with rayon.
    Parallel,
}

/// Chain mode parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointConfig {
    /// Gap between the edges of consecutive chain members.
    pub spacing: f32,
}

impl Default for JointConfig {
    fn default() -> Self {
        Self {
            spacing: 2.0 * TILE_SIZE,
        }
    }
}

/// Half-ring mode parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcConfig {
    /// Radial gap between rings.
    pub ring_gap: f32,
    /// Gap between the edges of neighbours on a ring.
    pub spacing: f32,
    /// Angle available on each side of "directly behind", in degrees.
    pub max_sides_angle: f32,
}

impl Default for ArcConfig {
    fn default() -> Self {
        Self {
            ring_gap: 3.0 * TILE_SIZE,
            spacing: 2.0 * TILE_SIZE,
            max_sides_angle: 90.0,
        }
    }
}

impl ArcConfig {
    /// Total angle a ring may span, in radians.
    #[must_use]
    pub fn budget(&self) -> f32 {
        2.0 * self.max_sides_angle.to_radians()
    }
}

/// Rotating full-ring mode parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    /// Radial gap between rings.
    pub ring_gap: f32,
    /// Gap between the edges of neighbours on a ring.
    pub spacing: f32,
    /// Rotation applied to every ring each tick, in degrees.
    pub angle_speed: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            ring_gap: 3.0 * TILE_SIZE,
            spacing: 2.0 * TILE_SIZE,
            angle_speed: 1.0,
        }
    }
}

/// Trail mode parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnakeConfig {
    /// Distance between trail samples, and the gap between trail members.
    pub distance: f32,
}

impl Default for SnakeConfig {
    fn default() -> Self {
        Self {
            distance: 2.0 * TILE_SIZE,
        }
    }
}

/// Complete engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowConfig {
    /// Milliseconds between compute passes.
    pub tick_interval_ms: u64,

    /// Mode used for new sessions when the request does not name one.
    pub default_mode: FollowMode,

    pub bounds_policy: BoundsPolicy,

    /// Read once when the scheduler is built. Changing it through
    /// `set_config` afterwards has no effect on a running scheduler.
    pub execution: ExecutionMode,

    pub joint: JointConfig,
    pub arc: ArcConfig,
    pub orbit: OrbitConfig,
    pub snake: SnakeConfig,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            default_mode: FollowMode::default(),
            bounds_policy: BoundsPolicy::default(),
            execution: ExecutionMode::default(),
            joint: JointConfig::default(),
            arc: ArcConfig::default(),
            orbit: OrbitConfig::default(),
            snake: SnakeConfig::default(),
        }
    }
}

impl FollowConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    #[must_use]
    pub fn with_default_mode(mut self, mode: FollowMode) -> Self {
        self.default_mode = mode;
        self
    }

    #[must_use]
    pub fn with_bounds_policy(mut self, policy: BoundsPolicy) -> Self {
        self.bounds_policy = policy;
        self
    }

    #[must_use]
    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    #[must_use]
    pub fn with_joint(mut self, joint: JointConfig) -> Self {
        self.joint = joint;
        self
    }

    #[must_use]
    pub fn with_arc(mut self, arc: ArcConfig) -> Self {
        self.arc = arc;
        self
    }

    #[must_use]
    pub fn with_orbit(mut self, orbit: OrbitConfig) -> Self {
        self.orbit = orbit;
        self
    }

    #[must_use]
    pub fn with_snake(mut self, snake: SnakeConfig) -> Self {
        self.snake = snake;
        self
    }

    /// Tick interval as a `Duration`.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Reject values no amount of clamping can make sensible.
    pub fn validate(&self) -> FollowResult<()> {
        if self.tick_interval_ms == 0 {
            return Err(FollowError::InvalidConfig(
                "tick_interval_ms must be greater than 0".into(),
            ));
        }

        let values = [
            ("joint.spacing", self.joint.spacing),
            ("arc.ring_gap", self.arc.ring_gap),
            ("arc.spacing", self.arc.spacing),
            ("arc.max_sides_angle", self.arc.max_sides_angle),
            ("orbit.ring_gap", self.orbit.ring_gap),
            ("orbit.spacing", self.orbit.spacing),
            ("snake.distance", self.snake.distance),
        ];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(FollowError::InvalidConfig(format!(
                    "{name} must be a finite, non-negative number (got {value})"
                )));
            }
        }

        if !self.orbit.angle_speed.is_finite() {
            return Err(FollowError::InvalidConfig(
                "orbit.angle_speed must be finite".into(),
            ));
        }

        Ok(())
    }

    /// Copy with every value clamped into the range the strategies support.
    ///
    /// Ring gaps are at least 1, spacings at least 0, the per-side arc angle
    /// within `[0.86°, 180°]` and the snake distance at least 1.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let mut config = self.clone();
        config.tick_interval_ms = config.tick_interval_ms.max(1);
        config.joint.spacing = config.joint.spacing.max(0.0);
        config.arc.ring_gap = config.arc.ring_gap.max(1.0);
        config.arc.spacing = config.arc.spacing.max(0.0);
        config.arc.max_sides_angle = config.arc.max_sides_angle.clamp(0.86, 180.0);
        config.orbit.ring_gap = config.orbit.ring_gap.max(1.0);
        config.orbit.spacing = config.orbit.spacing.max(0.0);
        config.snake.distance = config.snake.distance.max(1.0);
        config
    }
}
