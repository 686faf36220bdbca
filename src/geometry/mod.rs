//! Circle geometry used by the ring packers.
//!
//! All angles are in radians. None of these functions fail: inputs outside
//! the `asin` domain resolve to fixed fallbacks so a ring that cannot fit a
//! member simply reports it as too wide.

use std::f32::consts::TAU;

/// Angle subtended on a circle of `radius` by a chord of length `chord`.
///
/// Returns `2π` when the chord does not fit (`chord / 2r` outside `[-1, 1]`),
/// which makes any ring that would need it overflow its budget.
#[must_use]
pub fn advance_on_circle(radius: f32, chord: f32) -> f32 {
    let ratio = chord / (2.0 * radius);
    if !(-1.0..=1.0).contains(&ratio) {
        return TAU;
    }
    2.0 * ratio.asin()
}

/// Half-angle taken up on a circle of `radius` by something of size `distance`.
///
/// Returns `0` when `distance / radius` is outside `[-1, 1]`.
#[must_use]
pub fn edge_angle(radius: f32, distance: f32) -> f32 {
    let ratio = distance / radius;
    if !(-1.0..=1.0).contains(&ratio) {
        return 0.0;
    }
    ratio.asin()
}

/// Chord length spanned by `angle` on a circle of `radius`.
#[must_use]
pub fn chord_from_angle(radius: f32, angle: f32) -> f32 {
    2.0 * radius * (angle / 2.0).sin()
}
