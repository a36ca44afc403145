// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animation timing carried by presentations.

use core::time::Duration;

use crate::progress::clamp_unit;

/// Easing curve applied by animation backends.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Curve {
    /// Constant speed.
    Linear,
    /// Slow start.
    EaseIn,
    /// Slow end.
    EaseOut,
    /// Slow start and end.
    #[default]
    EaseInOut,
}

impl Curve {
    /// Map linear time `t` in `[0, 1]` to eased progress in `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = clamp_unit(t);
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t * t,
            Self::EaseOut => {
                let u = 1.0 - t;
                1.0 - u * u * u
            }
            Self::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u * u / 2.0
                }
            }
        }
    }
}

/// Duration and curve of a presentation's animation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct AnimationTiming {
    /// Full-length duration of the animation.
    pub duration: Duration,
    /// Easing curve.
    pub curve: Curve,
}

impl Default for AnimationTiming {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(350),
            curve: Curve::EaseInOut,
        }
    }
}

impl AnimationTiming {
    /// Timing with `duration` and the default curve.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    /// Zero-length timing.
    pub fn instant() -> Self {
        Self {
            duration: Duration::ZERO,
            curve: Curve::Linear,
        }
    }

    /// The duration scaled by `fraction`, clamped to `[0, 1]`.
    pub fn scaled(&self, fraction: f64) -> Duration {
        self.duration.mul_f64(clamp_unit(fraction))
    }

    /// Time needed to finish from `value` toward the end (`completed`) or back
    /// toward the start (`!completed`).
    ///
    /// Used to settle an interactive transition after release: a gesture
    /// released near its destination finishes quickly.
    pub fn remaining(&self, value: f64, completed: bool) -> Duration {
        let value = clamp_unit(value);
        if completed {
            self.scaled(1.0 - value)
        } else {
            self.scaled(value)
        }
    }
}
