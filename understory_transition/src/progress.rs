// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Directed progress: where a transition is, and which way it is going.
//!
//! A [`Progress`] pairs a [`Direction`] with a value in `[0, 1]`.
//! Insertion progress runs from "not yet shown" (`0`) to "fully shown" (`1`);
//! removal progress runs from "fully shown" (`0`) to "gone" (`1`).
//!
//! ```
//! use understory_transition::progress::Direction;
//!
//! let p = Direction::Insertion.at(0.25);
//! assert_eq!(p.value(), 0.25);
//! assert_eq!(p.presence(), 0.25);
//!
//! // Reversing keeps the number but flips the meaning.
//! let r = p.reversed();
//! assert_eq!(r.direction(), Direction::Removal);
//! assert_eq!(r.value(), 0.25);
//! assert_eq!(r.presence(), 0.75);
//!
//! // Interpolate between the resting (identity) and transformed states.
//! assert_eq!(Direction::Insertion.at(0.0).interpolate(1.0, 0.0), 0.0);
//! assert_eq!(Direction::Insertion.at(1.0).interpolate(1.0, 0.0), 1.0);
//! ```

use kurbo::{Point, Rect, Size, Vec2};

/// Which way a transition moves content.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    /// Content is being added (push, present).
    Insertion,
    /// Content is being taken away (pop, dismiss).
    Removal,
}

impl Direction {
    /// The opposite direction.
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Self::Insertion => Self::Removal,
            Self::Removal => Self::Insertion,
        }
    }

    /// Build a progress in this direction, clamping `value` to `[0, 1]`.
    ///
    /// NaN clamps to `0`.
    pub fn at(self, value: f64) -> Progress {
        Progress {
            direction: self,
            value: clamp_unit(value),
        }
    }
}

/// A direction plus a clamped value in `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Progress {
    direction: Direction,
    value: f64,
}

impl Progress {
    /// Progress at the start of `direction`.
    pub fn start(direction: Direction) -> Self {
        direction.at(0.0)
    }

    /// Progress at the end of `direction`.
    pub fn end(direction: Direction) -> Self {
        direction.at(1.0)
    }

    /// Direction of this progress.
    pub fn direction(self) -> Direction {
        self.direction
    }

    /// Numeric position in `[0, 1]`.
    pub fn value(self) -> f64 {
        self.value
    }

    /// Same value, opposite direction.
    #[must_use]
    pub fn reversed(self) -> Self {
        Self {
            direction: self.direction.reversed(),
            value: self.value,
        }
    }

    /// The same point of the animation expressed in the opposite direction.
    ///
    /// Unlike [`Progress::reversed`], this keeps the on-screen state: insertion
    /// `0.3` becomes removal `0.7`.
    #[must_use]
    pub fn mirrored(self) -> Self {
        Self {
            direction: self.direction.reversed(),
            value: 1.0 - self.value,
        }
    }

    /// How much of the inserted content is present: `value` for insertion,
    /// `1 - value` for removal.
    pub fn presence(self) -> f64 {
        match self.direction {
            Direction::Insertion => self.value,
            Direction::Removal => 1.0 - self.value,
        }
    }

    /// Returns true at the end of the direction.
    pub fn is_finished(self) -> bool {
        self.value >= 1.0
    }

    /// Interpolate between the resting state (`identity`) and the off-screen
    /// state (`transformed`) for this progress.
    ///
    /// Insertion `0` and removal `1` yield `transformed`; insertion `1` and
    /// removal `0` yield `identity`.
    pub fn interpolate<T: Interpolate>(self, identity: T, transformed: T) -> T {
        transformed.lerp(identity, self.presence())
    }
}

/// Linear interpolation for values animated by transitions.
pub trait Interpolate: Sized {
    /// Interpolate from `self` (`t == 0`) to `other` (`t == 1`).
    fn lerp(self, other: Self, t: f64) -> Self;
}

impl Interpolate for f64 {
    fn lerp(self, other: Self, t: f64) -> Self {
        lerp(self, other, t)
    }
}

impl Interpolate for f32 {
    fn lerp(self, other: Self, t: f64) -> Self {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Interpolated value stays between two f32 endpoints."
        )]
        let t = t as f32;
        self + (other - self) * t
    }
}

impl Interpolate for Point {
    fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(lerp(self.x, other.x, t), lerp(self.y, other.y, t))
    }
}

impl Interpolate for Vec2 {
    fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(lerp(self.x, other.x, t), lerp(self.y, other.y, t))
    }
}

impl Interpolate for Size {
    fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            lerp(self.width, other.width, t),
            lerp(self.height, other.height, t),
        )
    }
}

impl Interpolate for Rect {
    fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            lerp(self.x0, other.x0, t),
            lerp(self.y0, other.y0, t),
            lerp(self.x1, other.x1, t),
            lerp(self.y1, other.y1, t),
        )
    }
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[inline]
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
