//! 2D vector used for every position and offset in the engine.
//!
//! ```
//! use rust_follow::core::Vec2;
//!
//! let a = Vec2::new(0.0, 0.0);
//! let b = Vec2::new(3.0, 4.0);
//! assert_eq!(a.dst(b), 5.0);
//! assert_eq!(a.approach(b, 10.0), b);
//! ```

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// A point or offset in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    /// The origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing at `radians`, counter-clockwise from +x.
    #[must_use]
    pub fn from_angle(radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self { x: cos, y: sin }
    }

    /// Point at `radius` from `self` in direction `radians`.
    #[must_use]
    pub fn polar_offset(self, radians: f32, radius: f32) -> Self {
        self + Self::from_angle(radians) * radius
    }

    #[must_use]
    pub fn len(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Distance to `other`.
    #[must_use]
    pub fn dst(self, other: Self) -> f32 {
        (other - self).len()
    }

    /// Squared distance to `other`.
    #[must_use]
    pub fn dst2(self, other: Self) -> f32 {
        let d = other - self;
        d.x * d.x + d.y * d.y
    }

    /// Linear interpolation: `t = 0` gives `self`, `t = 1` gives `other`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    /// Move toward `target` by at most `amount`, never overshooting it.
    #[must_use]
    pub fn approach(self, target: Self, amount: f32) -> Self {
        let distance = self.dst(target);
        if distance <= amount || distance == 0.0 {
            target
        } else {
            self + (target - self) * (amount / distance)
        }
    }

    /// Clamp both coordinates into `[min, max]`.
    #[must_use]
    pub fn clamp(self, min: Self, max: Self) -> Self {
        Self {
            x: self.x.clamp(min.x, max.x),
            y: self.y.clamp(min.y, max.y),
        }
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl From<(f32, f32)> for Vec2 {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

impl std::fmt::Display for Vec2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}
