//! Per-cube interaction state machine.
//!
//! ```text
//!            drop                 revert
//!   Idle ───────────▶ Launched ───────────▶ Returning
//!    │                                         │
//!    └────────────────── revert ──────────────▶│
//!    ▲                                         │
//!    └──── rotation tween finished (tick) ─────┘
//! ```
//!
//! Nudges apply an impulse in Idle and Launched without changing state. While Returning the
//! body is kinematic and the return tweens own its pose; drops and nudges are ignored and a
//! second revert is a no-op.

use std::time::Duration;

use rapier3d::prelude::RigidBodyHandle;

use crate::audio::{AudioCue, AudioSink, Clip};
use crate::body_tag::{BodyKind, pack_tag};
use crate::constants::{NUDGE_FORCE_DURATION, RETURN_DURATION};
use crate::grid::{CubeId, CubeSpec};
use crate::physics::PhysicsEngine;
use crate::tween::{Ease, Tween, TweenStatus};
use crate::types::{Quat, Transform, Vec3};

/// Timing of the scripted return motion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReturnSettings {
    pub duration: Duration,
    pub ease: Ease,
}

impl Default for ReturnSettings {
    fn default() -> Self {
        Self {
            duration: RETURN_DURATION,
            ease: Ease::Linear,
        }
    }
}

/// Position and orientation tweens driving a returning cube back to its origin.
#[derive(Clone, Debug)]
pub struct ReturnMotion {
    position: Tween<Vec3>,
    rotation: Tween<Quat>,
}

impl ReturnMotion {
    pub fn new(from: Transform, to: Transform, settings: ReturnSettings) -> Self {
        Self {
            position: Tween::new(
                from.translation,
                to.translation,
                settings.duration,
                settings.ease,
            ),
            rotation: Tween::new(from.rotation, to.rotation, settings.duration, settings.ease),
        }
    }

    /// Advance both tweens. Completion follows the rotation tween.
    pub fn advance(&mut self, dt: Duration) -> TweenStatus {
        self.position.advance(dt);
        self.rotation.advance(dt)
    }

    pub fn pose(&self) -> Transform {
        Transform::new(self.position.value(), self.rotation.value())
    }

    pub fn elapsed(&self) -> Duration {
        self.rotation.elapsed()
    }
}

#[derive(Clone, Debug)]
pub enum CubeState {
    /// Floating at rest; gravity off.
    Idle,
    /// Falling freely under gravity.
    Launched,
    /// Kinematic, following a scripted motion home.
    Returning(ReturnMotion),
}

/// Payload-free view of [`CubeState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CubePhase {
    Idle,
    Launched,
    Returning,
}

impl CubeState {
    pub fn phase(&self) -> CubePhase {
        match self {
            CubeState::Idle => CubePhase::Idle,
            CubeState::Launched => CubePhase::Launched,
            CubeState::Returning(_) => CubePhase::Returning,
        }
    }
}

/// A live cube. Its lifetime belongs to the [`Field`](crate::field::Field).
#[derive(Debug)]
pub struct Cube {
    spec: CubeSpec,
    state: CubeState,
    original: Transform,
    body: RigidBodyHandle,
}

impl Cube {
    /// Create the cube's body at its spawn transform, at rest with gravity off.
    pub fn spawn<P: PhysicsEngine + ?Sized>(
        spec: CubeSpec,
        physics: &mut P,
        half_extent: f32,
    ) -> Self {
        let original = spec.transform();
        let tag = pack_tag(spec.id as u64, BodyKind::Cube);
        let body = physics.spawn_cube(original, half_extent, tag);

        Self {
            spec,
            state: CubeState::Idle,
            original,
            body,
        }
    }

    #[inline]
    pub fn id(&self) -> CubeId {
        self.spec.id
    }

    #[inline]
    pub fn spec(&self) -> &CubeSpec {
        &self.spec
    }

    #[inline]
    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    /// Spawn transform the cube returns to.
    #[inline]
    pub fn original(&self) -> Transform {
        self.original
    }

    #[inline]
    pub fn state(&self) -> &CubeState {
        &self.state
    }

    #[inline]
    pub fn phase(&self) -> CubePhase {
        self.state.phase()
    }

    #[inline]
    pub fn is_returning(&self) -> bool {
        self.phase() == CubePhase::Returning
    }

    /// Switch gravity on. No impulse is applied and velocities are left alone.
    ///
    /// Returns `false` when ignored (returning cube or missing body).
    pub fn drop_into_gravity<P: PhysicsEngine + ?Sized>(&mut self, physics: &mut P) -> bool {
        if self.is_returning() {
            log::debug!("cube {}: drop ignored while returning", self.id());
            return false;
        }
        if !physics.set_gravity_enabled(self.body, true) {
            log::warn!("cube {}: body missing, drop ignored", self.id());
            return false;
        }

        if self.phase() == CubePhase::Idle {
            log::debug!("cube {}: idle -> launched", self.id());
        }
        self.state = CubeState::Launched;
        true
    }

    /// Push the cube along `direction` at world-space `point`.
    ///
    /// `force_multiplier` is a force in newtons, acting for [`NUDGE_FORCE_DURATION`].
    pub fn nudge<P: PhysicsEngine + ?Sized>(
        &mut self,
        physics: &mut P,
        direction: Vec3,
        point: Vec3,
        force_multiplier: f32,
    ) -> bool {
        if self.is_returning() {
            return false;
        }
        let impulse = direction * force_multiplier * NUDGE_FORCE_DURATION.as_secs_f32();
        physics.apply_impulse_at(self.body, impulse, point)
    }

    /// Start the scripted return to the spawn transform.
    ///
    /// A cube that is already returning (or whose body is already kinematic) is left alone,
    /// so overlapping return animations never start. Returns `true` if a return started.
    pub fn revert<P, A>(
        &mut self,
        physics: &mut P,
        audio: &mut A,
        play_sound: bool,
        settings: ReturnSettings,
    ) -> bool
    where
        P: PhysicsEngine + ?Sized,
        A: AudioSink + ?Sized,
    {
        if self.is_returning() || physics.is_kinematic(self.body) == Some(true) {
            log::debug!("cube {}: already returning", self.id());
            return false;
        }
        let Some(from) = physics.pose(self.body) else {
            log::warn!("cube {}: body missing, revert ignored", self.id());
            return false;
        };

        if play_sound {
            audio.play_once(AudioCue::from_cube(self.id(), Clip::ComeBack));
        }
        physics.set_kinematic(self.body, true);
        physics.set_gravity_enabled(self.body, false);

        log::debug!("cube {}: {:?} -> returning", self.id(), self.phase());
        self.state = CubeState::Returning(ReturnMotion::new(from, self.original, settings));
        true
    }

    /// Advance a running return by `dt`. Returns `true` on the frame the cube becomes idle.
    pub fn tick<P: PhysicsEngine + ?Sized>(&mut self, physics: &mut P, dt: Duration) -> bool {
        let CubeState::Returning(motion) = &mut self.state else {
            return false;
        };

        if motion.advance(dt) == TweenStatus::Running {
            physics.set_pose(self.body, motion.pose());
            return false;
        }

        // Hand the body back to the simulation, exactly at the origin and at rest.
        physics.set_kinematic(self.body, false);
        physics.set_pose(self.body, self.original);
        physics.halt(self.body);
        self.state = CubeState::Idle;
        log::debug!("cube {}: returning -> idle", self.id());
        true
    }

    /// Remove the body. Any running return motion is discarded with the cube.
    pub fn despawn<P: PhysicsEngine + ?Sized>(self, physics: &mut P) {
        if !physics.despawn(self.body) {
            log::debug!("cube {}: body already removed", self.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rapier_world::RapierPhysics;
    use approx::assert_relative_eq;

    const FRAME: Duration = Duration::from_nanos(16_666_667);

    fn spec(id: CubeId) -> CubeSpec {
        CubeSpec {
            id,
            spawn_position: Vec3::new(0.2 * id as f32, 1.5, 2.0),
            spawn_orientation: Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::PI),
        }
    }

    fn spawn(physics: &mut RapierPhysics, id: CubeId) -> Cube {
        Cube::spawn(spec(id), physics, 0.05)
    }

    /// Step physics and tick the cube together, as the field manager does.
    fn run(cube: &mut Cube, physics: &mut RapierPhysics, frames: usize) {
        for _ in 0..frames {
            cube.tick(physics, FRAME);
            physics.step(FRAME);
        }
    }

    #[test]
    fn spawns_idle_without_gravity() {
        let mut physics = RapierPhysics::new();
        let cube = spawn(&mut physics, 0);

        assert_eq!(cube.phase(), CubePhase::Idle);
        assert_eq!(physics.gravity_enabled(cube.body()), Some(false));
        assert_eq!(physics.is_kinematic(cube.body()), Some(false));
        assert_eq!(physics.pose(cube.body()), Some(cube.original()));
    }

    #[test]
    fn drop_enables_gravity_without_impulse() {
        let mut physics = RapierPhysics::new();
        let mut cube = spawn(&mut physics, 0);

        assert!(cube.drop_into_gravity(&mut physics));

        assert_eq!(cube.phase(), CubePhase::Launched);
        assert_eq!(physics.gravity_enabled(cube.body()), Some(true));
        assert_eq!(physics.linear_velocity(cube.body()), Some(Vec3::zeros()));
    }

    #[test]
    fn nudge_keeps_state_and_moves_body() {
        let mut physics = RapierPhysics::new();
        let mut cube = spawn(&mut physics, 0);
        let point = cube.original().translation;
        physics.step(FRAME);

        assert!(cube.nudge(&mut physics, Vec3::z(), point, 100.0));

        assert_eq!(cube.phase(), CubePhase::Idle);
        let v = physics.linear_velocity(cube.body()).unwrap();
        assert!(v.z > 0.0);
    }

    #[test]
    fn revert_round_trip_restores_origin_and_idles() {
        let mut physics = RapierPhysics::new();
        let mut cube = spawn(&mut physics, 3);
        let mut audio = Vec::new();

        cube.drop_into_gravity(&mut physics);
        cube.nudge(&mut physics, Vec3::x(), cube.original().translation, 100.0);
        run(&mut cube, &mut physics, 30);
        let displaced = physics.pose(cube.body()).unwrap();
        assert!((displaced.translation - cube.original().translation).norm() > 0.1);

        assert!(cube.revert(&mut physics, &mut audio, true, ReturnSettings::default()));
        assert_eq!(cube.phase(), CubePhase::Returning);
        assert_eq!(physics.is_kinematic(cube.body()), Some(true));
        assert_eq!(physics.gravity_enabled(cube.body()), Some(false));
        assert_eq!(audio, vec![AudioCue::from_cube(3, Clip::ComeBack)]);

        // One simulated second.
        let mut frames = 0;
        while cube.phase() == CubePhase::Returning {
            cube.tick(&mut physics, FRAME);
            frames += 1;
            assert!(frames <= 61, "return took longer than a second");
        }
        assert_eq!(frames, 60);

        assert_eq!(cube.phase(), CubePhase::Idle);
        assert_eq!(physics.is_kinematic(cube.body()), Some(false));
        assert_eq!(physics.pose(cube.body()), Some(cube.original()));
        assert_eq!(physics.linear_velocity(cube.body()), Some(Vec3::zeros()));
    }

    #[test]
    fn second_revert_is_a_no_op() {
        let mut physics = RapierPhysics::new();
        let mut cube = spawn(&mut physics, 0);
        let mut audio = Vec::new();

        cube.drop_into_gravity(&mut physics);
        run(&mut cube, &mut physics, 20);

        assert!(cube.revert(&mut physics, &mut audio, true, ReturnSettings::default()));
        run(&mut cube, &mut physics, 10);
        let elapsed = match cube.state() {
            CubeState::Returning(motion) => motion.elapsed(),
            other => panic!("expected returning, got {other:?}"),
        };

        assert!(!cube.revert(&mut physics, &mut audio, true, ReturnSettings::default()));

        // The first animation keeps its progress and only one cue was played.
        match cube.state() {
            CubeState::Returning(motion) => assert_eq!(motion.elapsed(), elapsed),
            other => panic!("expected returning, got {other:?}"),
        }
        assert_eq!(audio.len(), 1);
    }

    #[test]
    fn returning_cube_ignores_drop_and_nudge() {
        let mut physics = RapierPhysics::new();
        let mut cube = spawn(&mut physics, 0);
        let mut audio = Vec::new();

        cube.revert(&mut physics, &mut audio, false, ReturnSettings::default());

        assert!(!cube.drop_into_gravity(&mut physics));
        assert!(!cube.nudge(&mut physics, Vec3::z(), Vec3::zeros(), 100.0));
        assert_eq!(cube.phase(), CubePhase::Returning);
        assert!(audio.is_empty());
    }

    #[test]
    fn return_motion_passes_through_midpoint() {
        let from = Transform::from_translation(Vec3::new(0.0, 0.0, 0.0));
        let to = Transform::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let mut motion = ReturnMotion::new(from, to, ReturnSettings::default());

        assert_eq!(motion.advance(Duration::from_millis(500)), TweenStatus::Running);
        assert_relative_eq!(motion.pose().translation.y, 1.0, epsilon = 1.0e-5);
        assert_eq!(motion.advance(Duration::from_millis(500)), TweenStatus::Finished);
        assert_eq!(motion.pose(), to);
    }

    #[test]
    fn despawned_cube_body_is_gone() {
        let mut physics = RapierPhysics::new();
        let cube = spawn(&mut physics, 0);
        let body = cube.body();

        cube.despawn(&mut physics);

        assert_eq!(physics.pose(body), None);
    }
}
