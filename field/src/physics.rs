//! Seam between the cube logic and the rigid-body engine.
//!
//! The field manager and the cube state machine only talk to physics through
//! [`PhysicsEngine`]. Operations on a body that no longer exists are absorbed: setters return
//! `false` and getters return `None`, and callers log and carry on.

use std::time::Duration;

use rapier3d::prelude::RigidBodyHandle;

use crate::body_tag::{BodyKind, BodyTag, decode_tag};
use crate::types::{Transform, Vec3};

/// One side of a collision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    /// Parent rigid body, if the collider has one (static surfaces may not).
    pub body: Option<RigidBodyHandle>,
    /// Packed identity from the collider's `user_data`, if it was tagged.
    pub tag: Option<BodyTag>,
}

impl Contact {
    pub fn kind(&self) -> Option<BodyKind> {
        self.tag.and_then(decode_tag).map(|(kind, _)| kind)
    }
}

/// A collision-begin event between two bodies.
///
/// Engines may report a touching pair once (Rapier does) or once per participant; the
/// arbiter evaluates both sides of every event it receives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionBegin {
    pub a: Contact,
    pub b: Contact,
    /// Linear velocity of `a` relative to `b` at the moment contact started.
    pub relative_velocity: Vec3,
}

/// Rigid-body services required by the cube field.
pub trait PhysicsEngine {
    /// Create a dynamic cube body at `transform` with gravity disabled.
    fn spawn_cube(&mut self, transform: Transform, half_extent: f32, tag: BodyTag)
    -> RigidBodyHandle;

    /// Remove a body and its colliders. Returns `false` if it was already gone.
    fn despawn(&mut self, body: RigidBodyHandle) -> bool;

    fn set_gravity_enabled(&mut self, body: RigidBodyHandle, enabled: bool) -> bool;

    fn gravity_enabled(&self, body: RigidBodyHandle) -> Option<bool>;

    /// Switch between engine-driven (dynamic) and externally-driven (kinematic) motion.
    fn set_kinematic(&mut self, body: RigidBodyHandle, kinematic: bool) -> bool;

    fn is_kinematic(&self, body: RigidBodyHandle) -> Option<bool>;

    /// Apply an instantaneous impulse at a world-space point.
    fn apply_impulse_at(&mut self, body: RigidBodyHandle, impulse: Vec3, point: Vec3) -> bool;

    fn pose(&self, body: RigidBodyHandle) -> Option<Transform>;

    /// Move a body. Kinematic bodies are moved to the target during the next step; dynamic
    /// bodies are teleported immediately.
    fn set_pose(&mut self, body: RigidBodyHandle, pose: Transform) -> bool;

    fn linear_velocity(&self, body: RigidBodyHandle) -> Option<Vec3>;

    /// Zero linear and angular velocity.
    fn halt(&mut self, body: RigidBodyHandle) -> bool;

    /// Advance the simulation by `dt` and return the collisions that started during the step.
    fn step(&mut self, dt: Duration) -> Vec<CollisionBegin>;
}
