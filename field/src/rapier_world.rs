//! Rapier-backed [`PhysicsEngine`].
//!
//! Holds a complete Rapier simulation: static surfaces (walls, floor), one dynamic body per
//! cube, and an optional kinematic pointer proxy that follows the user's cursor. Collision
//! starts are collected by an [`EventHandler`] during the step and handed back from
//! [`PhysicsEngine::step`] with each participant's [`BodyTag`] resolved.
//!
//! Determinism
//! - Statics are inserted sorted by `id`.
//! - Rapier reports a started pair once; the arbiter evaluates both sides.

use std::sync::Mutex;
use std::time::Duration;

// Re-export Rapier so downstream crates can build scenes without depending on `rapier3d`
// directly.
pub use rapier3d;

use rapier3d::na::{Point3, Translation3, UnitQuaternion};
use rapier3d::prelude::*;

use crate::body_tag::{BodyKind, BodyTag, decode_tag, pack_tag};
use crate::constants::{CUBE_MASS_KG, GRAVITY_MPS2};
use crate::gaze::{GazeHit, GazeRay};
use crate::physics::{CollisionBegin, Contact, PhysicsEngine};
use crate::types::{Transform, Vec3};

/// Restitution of cube colliders; enough to make bounces audible.
const CUBE_RESTITUTION: f32 = 0.4;

/// Radius of the pointer proxy ball (meters).
pub const POINTER_RADIUS: f32 = 0.02;

/// Definition of an immutable surface collider (wall, floor, table).
///
/// Conventions
/// - Units are meters.
/// - For planes the normal is `rotation * +Y`; the plane sits `offset_along_normal` along it.
#[derive(Clone, Debug)]
pub struct WorldStaticDef {
    /// Stable unique identifier; also the surface's [`BodyTag`] id.
    pub id: u32,
    pub translation: Vector<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub shape: ColliderShapeDef,
}

/// Supported surface shapes.
#[derive(Clone, Debug)]
pub enum ColliderShapeDef {
    /// Infinite half-space whose outward normal is the pose's +Y.
    Plane { offset_along_normal: f32 },
    /// Oriented cuboid with given half-extents (meters).
    Cuboid { half_extents: Vector<f32> },
}

impl WorldStaticDef {
    /// Horizontal floor at height `y`.
    pub fn floor(id: u32, y: f32) -> Self {
        Self {
            id,
            translation: Vector::new(0.0, y, 0.0),
            rotation: UnitQuaternion::identity(),
            shape: ColliderShapeDef::Plane {
                offset_along_normal: 0.0,
            },
        }
    }

    /// Vertical wall whose face passes through `point` and faces along `normal`.
    pub fn wall(id: u32, point: Vector<f32>, normal: Vector<f32>) -> Self {
        // A normal of exactly -Y has no unique shortest rotation; flip about X instead.
        let rotation = UnitQuaternion::rotation_between(&Vector::y(), &normal).unwrap_or_else(|| {
            UnitQuaternion::from_axis_angle(&Vector::x_axis(), std::f32::consts::PI)
        });
        Self {
            id,
            translation: point,
            rotation,
            shape: ColliderShapeDef::Plane {
                offset_along_normal: 0.0,
            },
        }
    }
}

/// Build a surface collider. The pose lives on the parent body, so the collider is local.
fn collider_from_def(def: &WorldStaticDef) -> Collider {
    let builder = match &def.shape {
        ColliderShapeDef::Plane {
            offset_along_normal,
        } => ColliderBuilder::halfspace(Vector::y_axis())
            .translation(Vector::y() * *offset_along_normal),
        ColliderShapeDef::Cuboid { half_extents } => {
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }
    };

    builder
        .user_data(pack_tag(def.id as u64, BodyKind::Surface))
        .build()
}

/// Collects collision starts emitted during a step.
#[derive(Default)]
struct CollisionRecorder {
    started: Mutex<Vec<CollisionBegin>>,
}

impl CollisionRecorder {
    fn drain(&self) -> Vec<CollisionBegin> {
        match self.started.lock() {
            Ok(mut started) => std::mem::take(&mut *started),
            Err(_) => {
                log::warn!("collision queue poisoned; dropping events");
                Vec::new()
            }
        }
    }
}

fn contact_of(colliders: &ColliderSet, handle: ColliderHandle) -> Contact {
    match colliders.get(handle) {
        Some(collider) => Contact {
            body: collider.parent(),
            tag: decode_tag(collider.user_data).map(|_| collider.user_data),
        },
        None => Contact {
            body: None,
            tag: None,
        },
    }
}

fn velocity_of(bodies: &RigidBodySet, contact: &Contact) -> Vec3 {
    contact
        .body
        .and_then(|h| bodies.get(h))
        .map(|rb| *rb.linvel())
        .unwrap_or_else(Vec3::zeros)
}

impl EventHandler for CollisionRecorder {
    fn handle_collision_event(
        &self,
        bodies: &RigidBodySet,
        colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if !event.started() {
            return;
        }

        let a = contact_of(colliders, event.collider1());
        let b = contact_of(colliders, event.collider2());
        let relative_velocity = velocity_of(bodies, &a) - velocity_of(bodies, &b);

        if let Ok(mut started) = self.started.lock() {
            started.push(CollisionBegin {
                a,
                b,
                relative_velocity,
            });
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// A Rapier world with the bookkeeping the cube field needs.
pub struct RapierPhysics {
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    gravity: Vector<f32>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    recorder: CollisionRecorder,
    pointer: Option<RigidBodyHandle>,
}

impl Default for RapierPhysics {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierPhysics {
    /// Empty world with standard gravity along -Y.
    pub fn new() -> Self {
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            gravity: Vector::new(0.0, -GRAVITY_MPS2, 0.0),
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            recorder: CollisionRecorder::default(),
            pointer: None,
        }
    }

    /// World pre-populated with surfaces, ready for gaze raycasts.
    pub fn with_statics(mut defs: Vec<WorldStaticDef>) -> Self {
        // Ensure deterministic insertion order.
        defs.sort_by_key(|d| d.id);

        let mut world = Self::new();
        for def in &defs {
            world.add_static(def);
        }
        world.refresh_queries();
        world
    }

    /// Insert a surface as a fixed body with an attached collider.
    pub fn add_static(&mut self, def: &WorldStaticDef) -> RigidBodyHandle {
        let iso = Isometry::from_parts(Translation3::from(def.translation), def.rotation);
        let rb = RigidBodyBuilder::fixed()
            .pose(iso)
            .user_data(pack_tag(def.id as u64, BodyKind::Surface))
            .build();
        let handle = self.bodies.insert(rb);

        self.colliders
            .insert_with_parent(collider_from_def(def), handle, &mut self.bodies);
        handle
    }

    /// Update the broad and narrow phases without integrating, so raycasts see newly added
    /// surfaces before the first step.
    pub fn refresh_queries(&mut self) {
        let mut collision_pipeline = CollisionPipeline::new();
        let hooks = ();
        let events = ();

        collision_pipeline.step(
            0.0,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &hooks,
            &events,
        );
    }

    /// Move the pointer proxy to `point`, creating it on first use.
    ///
    /// The proxy is a kinematic sensor ball: it reports contacts but never pushes cubes.
    pub fn place_pointer(&mut self, point: Vec3) -> RigidBodyHandle {
        if let Some(handle) = self.pointer {
            if let Some(rb) = self.bodies.get_mut(handle) {
                rb.set_next_kinematic_translation(point);
                return handle;
            }
        }

        let tag = pack_tag(0, BodyKind::Pointer);
        let rb = RigidBodyBuilder::kinematic_position_based()
            .translation(point)
            .user_data(tag)
            .build();
        let handle = self.bodies.insert(rb);
        let collider = ColliderBuilder::ball(POINTER_RADIUS)
            .sensor(true)
            .user_data(tag)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        self.pointer = Some(handle);
        handle
    }

    #[inline]
    pub fn pointer(&self) -> Option<RigidBodyHandle> {
        self.pointer
    }

    /// Closest solid hit along `ray` within `max_distance`. Sensors (the pointer) are skipped.
    pub fn cast_ray(&self, ray: &GazeRay, max_distance: f32) -> Option<GazeHit> {
        let filter = QueryFilter::default().exclude_sensors();
        let query = self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        );

        let rapier_ray = Ray::new(Point3::from(ray.origin), ray.direction);
        let (collider, toi) = query.cast_ray(&rapier_ray, max_distance, true)?;

        Some(GazeHit {
            point: ray.at(toi),
            has_hit: true,
            body: self.colliders.get(collider).and_then(|c| c.parent()),
        })
    }
}

impl PhysicsEngine for RapierPhysics {
    fn spawn_cube(
        &mut self,
        transform: Transform,
        half_extent: f32,
        tag: BodyTag,
    ) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::dynamic()
            .pose(transform.iso())
            .gravity_scale(0.0)
            .ccd_enabled(true)
            .user_data(tag)
            .build();
        let handle = self.bodies.insert(rb);

        let collider = ColliderBuilder::cuboid(half_extent, half_extent, half_extent)
            .mass(CUBE_MASS_KG)
            .restitution(CUBE_RESTITUTION)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(tag)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        // Mass is otherwise only derived from colliders during the next step; impulses applied
        // before that would be lost.
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.recompute_mass_properties_from_colliders(&self.colliders);
        }
        handle
    }

    fn despawn(&mut self, body: RigidBodyHandle) -> bool {
        if self.pointer == Some(body) {
            self.pointer = None;
        }
        self.bodies
            .remove(
                body,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    fn set_gravity_enabled(&mut self, body: RigidBodyHandle, enabled: bool) -> bool {
        let Some(rb) = self.bodies.get_mut(body) else {
            return false;
        };
        rb.set_gravity_scale(if enabled { 1.0 } else { 0.0 }, true);
        true
    }

    fn gravity_enabled(&self, body: RigidBodyHandle) -> Option<bool> {
        self.bodies.get(body).map(|rb| rb.gravity_scale() != 0.0)
    }

    fn set_kinematic(&mut self, body: RigidBodyHandle, kinematic: bool) -> bool {
        let Some(rb) = self.bodies.get_mut(body) else {
            return false;
        };
        let body_type = if kinematic {
            RigidBodyType::KinematicPositionBased
        } else {
            RigidBodyType::Dynamic
        };
        rb.set_body_type(body_type, true);
        true
    }

    fn is_kinematic(&self, body: RigidBodyHandle) -> Option<bool> {
        self.bodies.get(body).map(|rb| rb.is_kinematic())
    }

    fn apply_impulse_at(&mut self, body: RigidBodyHandle, impulse: Vec3, point: Vec3) -> bool {
        let Some(rb) = self.bodies.get_mut(body) else {
            return false;
        };
        rb.apply_impulse_at_point(impulse, Point3::from(point), true);
        true
    }

    fn pose(&self, body: RigidBodyHandle) -> Option<Transform> {
        self.bodies
            .get(body)
            .map(|rb| Transform::new(*rb.translation(), *rb.rotation()))
    }

    fn set_pose(&mut self, body: RigidBodyHandle, pose: Transform) -> bool {
        let Some(rb) = self.bodies.get_mut(body) else {
            return false;
        };
        if rb.is_kinematic() {
            rb.set_next_kinematic_translation(pose.translation);
            rb.set_next_kinematic_rotation(pose.rotation);
        } else {
            rb.set_translation(pose.translation, true);
            rb.set_rotation(pose.rotation, true);
        }
        true
    }

    fn linear_velocity(&self, body: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(body).map(|rb| *rb.linvel())
    }

    fn halt(&mut self, body: RigidBodyHandle) -> bool {
        let Some(rb) = self.bodies.get_mut(body) else {
            return false;
        };
        rb.set_linvel(Vector::zeros(), true);
        rb.set_angvel(Vector::zeros(), true);
        true
    }

    fn step(&mut self, dt: Duration) -> Vec<CollisionBegin> {
        if dt.is_zero() {
            return Vec::new();
        }
        self.integration_parameters.dt = dt.as_secs_f32();

        let hooks = ();
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &hooks,
            &self.recorder,
        );

        self.recorder.drain()
    }
}
