//! Concentric ring packing.
//!
//! Followers are laid out ring by ring, in list order, around the leader.
//! Each ring is sized for its biggest member and holds as many consecutive
//! followers as fit its angle budget. Both packers are greedy single scans:
//! a ring never reaches back to pull in a later, smaller follower.
//!
//! Rings are stored in a `Vec` that is reused across packings. A ring that
//! still exists after a repack keeps its `phase`, so rotating formations do
//! not jump when membership changes.

use std::f32::consts::TAU;

use smallvec::SmallVec;

use crate::geometry::{advance_on_circle, edge_angle};

/// One ring of followers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ring {
    /// Distance from the leader to the members' centres.
    pub radius: f32,

    /// Angle of each member, relative to the ring's reference direction.
    pub angles: SmallVec<[f32; 8]>,

    /// Rotation of the whole ring, in radians. Only orbits move it.
    pub phase: f32,

    /// Index, in the follower list, of the ring's first member.
    pub first: usize,
}

impl Ring {
    /// Number of members on the ring.
    #[must_use]
    pub fn len(&self) -> usize {
        self.angles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    /// Whether the follower at `index` sits on this ring.
    #[must_use]
    pub fn holds(&self, index: usize) -> bool {
        index >= self.first && index < self.first + self.angles.len()
    }
}

/// Parameters a ring layout was computed with.
///
/// Strategies keep the key of their last packing and repack when the
/// current key differs.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PackKey {
    pub leader_hit: f32,
    pub total_hit: f32,
    pub ring_gap: f32,
    pub spacing: f32,
    pub budget: f32,
    pub members: usize,
}

/// Ring and slot of the follower at `index`.
#[must_use]
pub fn locate(rings: &[Ring], index: usize) -> Option<(&Ring, f32)> {
    let after = rings.partition_point(|ring| ring.first <= index);
    let ring = rings.get(after.checked_sub(1)?)?;
    let angle = *ring.angles.get(index - ring.first)?;
    Some((ring, angle))
}

#[inline]
fn chord(sizes: &[f32], i: usize, j: usize, spacing: f32) -> f32 {
    sizes[i] + spacing + sizes[j]
}

/// Sum of the advances between consecutive members of `start..end`.
fn inner_advance(radius: f32, sizes: &[f32], start: usize, end: usize, spacing: f32) -> f32 {
    (start..end.saturating_sub(1))
        .map(|i| advance_on_circle(radius, chord(sizes, i, i + 1, spacing)))
        .sum()
}

/// Fetch ring `index`, creating it if needed, and reset its layout.
fn ring_slot(rings: &mut Vec<Ring>, index: usize) -> &mut Ring {
    if index >= rings.len() {
        rings.resize_with(index + 1, Ring::default);
    }
    let ring = &mut rings[index];
    ring.angles.clear();
    ring
}

/// Pack `sizes` onto half-rings centred on angle 0.
///
/// Each ring spans at most `budget` radians. The first member of a ring is
/// always accepted, even if it alone exceeds the budget. Leftover rings from
/// a previous packing are dropped.
pub fn pack_arc(
    rings: &mut Vec<Ring>,
    sizes: &[f32],
    leader_hit: f32,
    ring_gap: f32,
    spacing: f32,
    budget: f32,
) {
    let mut inner = (ring_gap + leader_hit).max(1.0);
    let mut start = 0;
    let mut count = 0;

    while start < sizes.len() {
        let mut biggest = sizes[start];
        let mut radius = inner + biggest;
        let mut between = 0.0;
        let mut end = start + 1;

        while end < sizes.len() {
            let size = sizes[end];
            let (candidate_biggest, candidate_radius, mut candidate_between) = if size > biggest {
                let r = inner + size;
                (size, r, inner_advance(r, sizes, start, end, spacing))
            } else {
                (biggest, radius, between)
            };
            candidate_between +=
                advance_on_circle(candidate_radius, chord(sizes, end - 1, end, spacing));

            let span = edge_angle(candidate_radius, sizes[start])
                + candidate_between
                + edge_angle(candidate_radius, size);
            if span > budget {
                break;
            }

            biggest = candidate_biggest;
            radius = candidate_radius;
            between = candidate_between;
            end += 1;
        }

        let ring = ring_slot(rings, count);
        ring.radius = radius;
        ring.first = start;
        if end - start == 1 {
            ring.angles.push(0.0);
        } else {
            let head = edge_angle(radius, sizes[start]);
            let span = head + between + edge_angle(radius, sizes[end - 1]);
            let extra = (budget - span) / (end - start - 1) as f32;
            let mut angle = head - budget / 2.0;
            ring.angles.push(angle);
            for i in start..end - 1 {
                angle += extra + advance_on_circle(radius, chord(sizes, i, i + 1, spacing));
                ring.angles.push(angle);
            }
        }

        inner = radius + biggest + ring_gap;
        count += 1;
        start = end;
    }

    rings.truncate(count);
}

/// Pack `sizes` onto full rings.
///
/// A ring takes followers until its closed span, including the chord from
/// its last member back to its first, passes a full turn. The follower that
/// overflows stays on the ring, and rings with fewer than 3 members never
/// close early. Members are then spread evenly from angle 0. Phases of rings
/// that survive the repack are kept.
pub fn pack_orbit(
    rings: &mut Vec<Ring>,
    sizes: &[f32],
    leader_hit: f32,
    ring_gap: f32,
    spacing: f32,
) {
    let mut inner = (ring_gap + leader_hit).max(1.0);
    let mut start = 0;
    let mut count = 0;

    while start < sizes.len() {
        let mut biggest = sizes[start];
        let mut radius = inner + biggest;
        let mut between = 0.0;
        let mut end = start + 1;

        while end < sizes.len() {
            let size = sizes[end];
            if size > biggest {
                biggest = size;
                radius = inner + biggest;
                between = inner_advance(radius, sizes, start, end, spacing);
            }
            between += advance_on_circle(radius, chord(sizes, end - 1, end, spacing));
            end += 1;

            let closed = between + advance_on_circle(radius, chord(sizes, end - 1, start, spacing));
            if end - start >= 3 && closed > TAU {
                break;
            }
        }

        let members = end - start;
        let span = if members > 1 {
            between + advance_on_circle(radius, chord(sizes, end - 1, start, spacing))
        } else {
            0.0
        };
        let extra = (TAU - span) / members as f32;

        let ring = ring_slot(rings, count);
        ring.radius = radius;
        ring.first = start;
        let mut angle = 0.0;
        ring.angles.push(angle);
        for i in start..end - 1 {
            angle += extra + advance_on_circle(radius, chord(sizes, i, i + 1, spacing));
            ring.angles.push(angle);
        }

        inner = radius + biggest + ring_gap;
        count += 1;
        start = end;
    }

    rings.truncate(count);
}
