//! Time-driven interpolation polled once per frame.
//!
//! A [`Tween`] never owns a timer or a callback. The caller advances it with the frame's
//! delta and reacts to [`TweenStatus::Finished`]. Once finished, [`Tween::value`] returns the
//! target exactly, not an interpolated approximation of it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{Quat, Vec3};

/// Easing curve applied to normalized tween time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    #[default]
    Linear,
    /// Hermite `3t² - 2t³`; starts and stops with zero velocity.
    SmoothStep,
}

impl Ease {
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::SmoothStep => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// Values a [`Tween`] can blend between.
pub trait Interpolate: Copy {
    fn interpolate(&self, to: &Self, t: f32) -> Self;
}

impl Interpolate for Vec3 {
    #[inline]
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        self.lerp(to, t)
    }
}

impl Interpolate for Quat {
    #[inline]
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        // Slerp is undefined for opposite quaternions; nlerp still lands on `to` at t = 1.
        self.try_slerp(to, t, 1.0e-6)
            .unwrap_or_else(|| self.nlerp(to, t))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TweenStatus {
    Running,
    Finished,
}

/// Interpolation from `from` to `to` over `duration`.
#[derive(Clone, Debug)]
pub struct Tween<T: Interpolate> {
    from: T,
    to: T,
    duration: Duration,
    elapsed: Duration,
    ease: Ease,
}

impl<T: Interpolate> Tween<T> {
    pub fn new(from: T, to: T, duration: Duration, ease: Ease) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
            ease,
        }
    }

    /// Advance by `dt`. Time past the end is discarded.
    pub fn advance(&mut self, dt: Duration) -> TweenStatus {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
        self.status()
    }

    pub fn status(&self) -> TweenStatus {
        if self.elapsed >= self.duration {
            TweenStatus::Finished
        } else {
            TweenStatus::Running
        }
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.status() == TweenStatus::Finished
    }

    /// Normalized progress in `[0, 1]`; a zero-length tween is always complete.
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    pub fn value(&self) -> T {
        if self.is_finished() {
            return self.to;
        }
        self.from.interpolate(&self.to, self.ease.apply(self.progress()))
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn finishes_exactly_on_target() {
        let from = Vec3::new(0.3, -1.7, 2.9);
        let to = Vec3::new(1.1, 0.2, -0.4);
        let mut tween = Tween::new(from, to, Duration::from_secs(1), Ease::Linear);

        let frame = Duration::from_secs_f32(1.0 / 60.0);
        let mut frames = 0;
        while tween.advance(frame) == TweenStatus::Running {
            frames += 1;
            assert!(frames < 120, "tween never finished");
        }

        assert_eq!(tween.value(), to);
    }

    #[test]
    fn linear_midpoint_is_halfway() {
        let mut tween = Tween::new(
            Vec3::zeros(),
            Vec3::new(2.0, 0.0, -2.0),
            Duration::from_secs(1),
            Ease::Linear,
        );
        tween.advance(Duration::from_millis(500));

        let v = tween.value();
        assert_relative_eq!(v.x, 1.0, epsilon = 1.0e-5);
        assert_relative_eq!(v.z, -1.0, epsilon = 1.0e-5);
        assert_eq!(tween.status(), TweenStatus::Running);
    }

    #[test]
    fn smoothstep_is_symmetric_and_clamped() {
        assert_relative_eq!(Ease::SmoothStep.apply(0.5), 0.5);
        assert_relative_eq!(Ease::SmoothStep.apply(-1.0), 0.0);
        assert_relative_eq!(Ease::SmoothStep.apply(2.0), 1.0);
        assert!(Ease::SmoothStep.apply(0.25) < 0.25);
    }

    #[test]
    fn zero_duration_is_immediately_finished() {
        let to = Quat::from_euler_angles(0.0, 1.0, 0.0);
        let tween = Tween::new(Quat::identity(), to, Duration::ZERO, Ease::Linear);

        assert!(tween.is_finished());
        assert_eq!(tween.value(), to);
    }

    #[test]
    fn rotation_handles_half_turn() {
        let from = Quat::identity();
        let to = Quat::from_euler_angles(0.0, std::f32::consts::PI, 0.0);
        let mut tween = Tween::new(from, to, Duration::from_secs(1), Ease::Linear);

        tween.advance(Duration::from_millis(500));
        let mid = tween.value();
        assert_relative_eq!(mid.angle(), std::f32::consts::FRAC_PI_2, epsilon = 1.0e-3);
    }
}
