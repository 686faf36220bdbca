//! Circular buffer of past leader positions.
//!
//! `head` is the newest sample. Walking forward from the head (wrapping
//! around) goes back in time, so `point(k)` is the sample `k` steps behind
//! the leader. New samples are written one slot *before* the head, which
//! overwrites the oldest one.

use crate::core::Vec2;

#[derive(Clone, Debug, PartialEq)]
pub struct Trail {
    points: Vec<Vec2>,
    head: usize,
}

impl Trail {
    /// One-sample trail at `seed`.
    #[must_use]
    pub fn new(seed: Vec2) -> Self {
        Self {
            points: vec![seed],
            head: 0,
        }
    }

    /// Number of samples. Never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn head(&self) -> Vec2 {
        self.points[self.head]
    }

    /// Sample `k` steps behind the head, wrapping.
    #[must_use]
    pub fn point(&self, k: usize) -> Vec2 {
        self.points[(self.head + k) % self.points.len()]
    }

    /// Grow or shrink to `len` samples (at least 1).
    ///
    /// The buffer is first rotated so the head sits at index 0. Growing
    /// extrapolates past the oldest sample along the direction of the two
    /// oldest samples; shrinking drops the oldest ones.
    pub fn resize(&mut self, len: usize) {
        let len = len.max(1);
        if len == self.points.len() {
            return;
        }

        self.points.rotate_left(self.head);
        self.head = 0;

        if len < self.points.len() {
            self.points.truncate(len);
            return;
        }

        let count = self.points.len();
        let oldest = self.points[count - 1];
        let step = if count >= 2 {
            oldest - self.points[count - 2]
        } else {
            Vec2::ZERO
        };

        let mut next = oldest;
        self.points.reserve(len - count);
        while self.points.len() < len {
            next += step;
            self.points.push(next);
        }
    }

    /// Record leader movement toward `live`.
    ///
    /// While the head is at least `distance` away from the leader, the head
    /// steps back one slot and that slot becomes a point `distance` closer
    /// to the leader than the previous head.
    ///
    /// A history holding non-finite samples is refilled with `live`. At most
    /// `len` samples are written per call. Once a step is too small to move
    /// at `f32` precision, the remaining writes are `live` itself.
    pub fn advance(&mut self, live: Vec2, distance: f32) {
        if !live.is_finite() {
            return;
        }
        if !self.points.iter().all(|point| point.is_finite()) {
            self.points.fill(live);
            return;
        }

        let distance = distance.max(1.0);
        let len = self.points.len();
        let mut current = self.points[self.head];

        // Only the last `len` writes survive a long jump; skip the others.
        let steps = (current.dst(live) / distance).floor();
        if steps > len as f32 {
            current = current.approach(live, (steps - len as f32) * distance);
        }

        for written in 0..len {
            if current.dst(live) < distance {
                break;
            }
            let next = current.approach(live, distance);
            if next == current {
                // Steps vanish in rounding; the rest collapses onto the leader.
                for _ in written..len {
                    self.push_front(live);
                }
                break;
            }
            self.push_front(next);
            current = next;
        }
    }

    fn push_front(&mut self, point: Vec2) {
        let len = self.points.len();
        self.head = (self.head + len - 1) % len;
        self.points[self.head] = point;
    }

    /// Position `offset` samples behind the head, linearly interpolated and
    /// clamped to the oldest sample.
    #[must_use]
    pub fn sample(&self, offset: f32) -> Vec2 {
        let last = (self.points.len() - 1) as f32;
        let offset = if offset.is_finite() {
            offset.clamp(0.0, last)
        } else {
            last
        };
        let low = offset.floor();
        let high = (low + 1.0).min(last);
        self.point(low as usize)
            .lerp(self.point(high as usize), offset - low)
    }
}
