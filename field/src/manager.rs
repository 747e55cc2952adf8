//! Field manager: owns the live field and the services it talks to.
//!
//! One [`FieldManager::frame`] call advances everything by one time step:
//!
//! 1. poll the grid-generation gate (first gaze hit, or the dead-ahead fallback on timeout),
//! 2. tick cubes that are returning home,
//! 3. step physics,
//! 4. turn the step's collision starts into audio cues.
//!
//! Commands arrive between frames, through the [`CommandBus`] or by direct calls.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::arbiter;
use crate::audio::{AudioCue, AudioSink, Clip};
use crate::bus::{Command, CommandBus, CommandHandler, CommandTag, SubscriptionId};
use crate::config::FieldConfig;
use crate::cube::Cube;
use crate::field::Field;
use crate::gaze::GazeProbe;
use crate::grid::{GridAnchor, generate_with};
use crate::physics::PhysicsEngine;

/// Latch that allows one grid generation per creation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridGate {
    /// Waiting for a gaze hit; `waited` counts towards the detection timeout.
    Pending { waited: Duration },
    Satisfied,
}

/// What happened during one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// A new grid was spawned this frame.
    pub created: bool,
    /// Cubes that finished returning and became idle.
    pub returned: usize,
    pub collisions: usize,
    pub cues: usize,
}

pub struct FieldManager<P, A, G> {
    config: FieldConfig,
    physics: P,
    audio: A,
    gaze: G,
    field: Field,
    gate: GridGate,
}

impl<P, A, G> FieldManager<P, A, G>
where
    P: PhysicsEngine,
    A: AudioSink,
    G: GazeProbe,
{
    /// The first grid is generated by the first frames, as if a creation request was pending.
    pub fn new(config: FieldConfig, physics: P, audio: A, gaze: G) -> Self {
        Self {
            config,
            physics,
            audio,
            gaze,
            field: Field::default(),
            gate: GridGate::Pending {
                waited: Duration::ZERO,
            },
        }
    }

    /// Replace the current field with a fresh lattice around `anchor`. This also satisfies any
    /// pending grid request.
    pub fn create_field(&mut self, anchor: GridAnchor) {
        self.destroy_field();
        self.gate = GridGate::Satisfied;

        let specs = generate_with(&anchor, &self.config.grid);
        self.audio.play_once(AudioCue::from_field(Clip::Ready));
        self.field = Field::spawn(specs, &mut self.physics, self.config.grid.cube_half_extent);

        log::info!(
            "grid created: {} cubes at view distance {:.2}",
            self.field.len(),
            anchor.view_distance
        );
    }

    pub fn destroy_field(&mut self) {
        if self.field.is_empty() {
            return;
        }
        let count = self.field.len();
        self.field.destroy(&mut self.physics);
        log::info!("grid destroyed: {count} cubes removed");
    }

    /// Handle a CreateGrid request: clear the field and wait for a new anchor.
    pub fn request_grid(&mut self) {
        self.destroy_field();
        self.gate = GridGate::Pending {
            waited: Duration::ZERO,
        };
        log::debug!("grid requested, waiting for a surface");
    }

    pub fn drop_all(&mut self) {
        let mut dropped = 0;
        for cube in self.field.iter_mut() {
            if cube.drop_into_gravity(&mut self.physics) {
                dropped += 1;
            }
        }
        log::debug!("drop all: {dropped}/{} cubes launched", self.field.len());
    }

    /// Send every cube home. One field-level cue plays instead of a cue per cube.
    pub fn revert_all(&mut self) {
        self.audio.play_once(AudioCue::from_field(Clip::ReturnAll));

        let settings = self.config.return_settings();
        let mut started = 0;
        for cube in self.field.iter_mut() {
            if cube.revert(&mut self.physics, &mut self.audio, false, settings) {
                started += 1;
            }
        }
        log::debug!("revert all: {started}/{} cubes returning", self.field.len());
    }

    pub fn drop_gazed(&mut self) -> bool {
        let Some(cube) = gazed_cube(&self.gaze, &mut self.field) else {
            return false;
        };
        cube.drop_into_gravity(&mut self.physics)
    }

    pub fn revert_gazed(&mut self) -> bool {
        let settings = self.config.return_settings();
        let Some(cube) = gazed_cube(&self.gaze, &mut self.field) else {
            return false;
        };
        cube.revert(&mut self.physics, &mut self.audio, true, settings)
    }

    /// Push the gazed cube along the gaze ray, at the point the ray hits it.
    pub fn click(&mut self) -> bool {
        let Some(hit) = self.gaze.probe() else {
            return false;
        };
        let direction = self.gaze.gaze_ray().direction;
        let Some(cube) = hit.body.and_then(|body| self.field.find_by_body_mut(body)) else {
            return false;
        };
        cube.nudge(
            &mut self.physics,
            direction,
            hit.point,
            self.config.force_multiplier,
        )
    }

    pub fn frame(&mut self, dt: Duration) -> FrameStats {
        let mut stats = FrameStats {
            created: self.poll_gate(dt),
            ..FrameStats::default()
        };

        for cube in self.field.iter_mut() {
            if cube.tick(&mut self.physics, dt) {
                stats.returned += 1;
            }
        }

        let events = self.physics.step(dt);
        stats.collisions = events.len();
        for event in &events {
            for cue in arbiter::resolve(&self.field, event, self.config.bounce_velocity_threshold) {
                self.audio.play_once(cue);
                stats.cues += 1;
            }
        }
        stats
    }

    /// Returns `true` if a grid was created.
    fn poll_gate(&mut self, dt: Duration) -> bool {
        let GridGate::Pending { waited } = self.gate else {
            return false;
        };

        let viewer = self.gaze.viewer();
        let anchor = match self.gaze.probe() {
            Some(hit) if self.gaze.is_active() => GridAnchor::from_hit(&viewer, hit.point),
            _ => {
                let waited = waited + dt;
                if waited < self.config.detection_timeout() {
                    self.gate = GridGate::Pending { waited };
                    return false;
                }
                log::info!(
                    "no surface after {:.1}s, using fallback at {:.2}m",
                    waited.as_secs_f32(),
                    self.config.fallback_distance
                );
                GridAnchor::dead_ahead(&viewer, self.config.fallback_distance)
            }
        };

        self.create_field(anchor);
        true
    }

    #[inline]
    pub fn gate(&self) -> GridGate {
        self.gate
    }

    #[inline]
    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    #[inline]
    pub fn field(&self) -> &Field {
        &self.field
    }

    #[inline]
    pub fn physics(&self) -> &P {
        &self.physics
    }

    #[inline]
    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    #[inline]
    pub fn audio(&self) -> &A {
        &self.audio
    }

    #[inline]
    pub fn gaze(&self) -> &G {
        &self.gaze
    }

    #[inline]
    pub fn gaze_mut(&mut self) -> &mut G {
        &mut self.gaze
    }
}

impl<P, A, G> FieldManager<P, A, G>
where
    P: PhysicsEngine + 'static,
    A: AudioSink + 'static,
    G: GazeProbe + 'static,
{
    /// Subscribe `manager` to every field command for as long as it is alive.
    pub fn attach(manager: &Rc<RefCell<Self>>, bus: &CommandBus) -> [SubscriptionId; 3] {
        [CommandTag::CreateGrid, CommandTag::Drop, CommandTag::Revert]
            .map(|tag| bus.subscribe(tag, manager))
    }
}

fn gazed_cube<'a, G: GazeProbe>(gaze: &G, field: &'a mut Field) -> Option<&'a mut Cube> {
    let body = gaze.probe()?.body?;
    field.find_by_body_mut(body)
}

impl<P, A, G> CommandHandler for FieldManager<P, A, G>
where
    P: PhysicsEngine,
    A: AudioSink,
    G: GazeProbe,
{
    fn handle(&mut self, command: &Command) {
        log::debug!("command {command:?}");
        match *command {
            Command::CreateGrid => self.request_grid(),
            Command::Drop { all: true } => self.drop_all(),
            Command::Drop { all: false } => {
                if !self.drop_gazed() {
                    log::debug!("drop: no cube under gaze");
                }
            }
            Command::Revert { all: true } => self.revert_all(),
            Command::Revert { all: false } => {
                if !self.revert_gazed() {
                    log::debug!("revert: no cube under gaze");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::CueSource;
    use crate::cube::CubePhase;
    use crate::gaze::{GazeHit, ViewerGaze};
    use crate::grid::{GridLayout, generate};
    use crate::rapier_world::{RapierPhysics, WorldStaticDef};
    use crate::types::{Quat, Transform, Vec3};
    use approx::assert_relative_eq;

    const FRAME: Duration = Duration::from_nanos(16_666_667);

    type TestManager = FieldManager<RapierPhysics, Vec<AudioCue>, ViewerGaze>;

    fn manager_with(config: FieldConfig, physics: RapierPhysics, gaze: ViewerGaze) -> TestManager {
        FieldManager::new(config, physics, Vec::new(), gaze)
    }

    fn anchor(view_distance: f32) -> GridAnchor {
        GridAnchor {
            position: Vec3::zeros(),
            orientation: Quat::identity(),
            view_distance,
        }
    }

    /// A single column of three cubes along the viewer's forward axis.
    fn three_cube_config() -> FieldConfig {
        FieldConfig {
            grid: GridLayout {
                lateral_extent: 0.0,
                ..GridLayout::default()
            },
            ..FieldConfig::default()
        }
    }

    fn three_cubes() -> TestManager {
        let mut manager = manager_with(
            three_cube_config(),
            RapierPhysics::new(),
            ViewerGaze::default(),
        );
        manager.create_field(anchor(2.9));
        assert_eq!(manager.field().len(), 3);
        manager
    }

    fn cues(manager: &TestManager, clip: Clip) -> usize {
        manager.audio().iter().filter(|c| c.clip == clip).count()
    }

    fn gaze_at(manager: &mut TestManager, id: u32) {
        let cube = manager.field().get(id).unwrap();
        let hit = GazeHit {
            point: cube.original().translation,
            has_hit: true,
            body: Some(cube.body()),
        };
        manager.gaze_mut().observe(Some(hit));
    }

    #[test]
    fn drop_all_enables_gravity_without_touching_velocity() {
        let mut manager = three_cubes();

        manager.drop_all();

        for cube in manager.field().iter() {
            assert_eq!(cube.phase(), CubePhase::Launched);
            assert_eq!(manager.physics().gravity_enabled(cube.body()), Some(true));
            assert_eq!(
                manager.physics().linear_velocity(cube.body()),
                Some(Vec3::zeros())
            );
        }
    }

    #[test]
    fn drop_all_keeps_velocity_of_moving_cubes() {
        let mut manager = three_cubes();
        let body = manager.field().get(0).unwrap().body();
        let center = manager.physics().pose(body).unwrap().translation;
        manager
            .physics_mut()
            .apply_impulse_at(body, Vec3::new(0.3, 0.0, -0.4), center);
        let before = manager.physics().linear_velocity(body).unwrap();
        assert!(before.norm() > 0.4);

        manager.drop_all();

        assert_eq!(manager.physics().gravity_enabled(body), Some(true));
        assert_eq!(manager.physics().linear_velocity(body), Some(before));
    }

    #[test]
    fn revert_all_plays_one_cue_and_returns_everything() {
        let mut manager = three_cubes();
        manager.drop_all();
        for _ in 0..30 {
            manager.frame(FRAME);
        }

        manager.revert_all();

        assert_eq!(cues(&manager, Clip::ReturnAll), 1);
        assert_eq!(cues(&manager, Clip::ComeBack), 0);
        assert!(manager.field().iter().all(Cube::is_returning));

        let mut returned = 0;
        for _ in 0..60 {
            returned += manager.frame(FRAME).returned;
        }
        assert_eq!(returned, 3);
        for cube in manager.field().iter() {
            assert_eq!(cube.phase(), CubePhase::Idle);
            // The frame's physics step runs after the snap; at rest it must not drift.
            let pose = manager.physics().pose(cube.body()).unwrap();
            assert_relative_eq!(pose.translation, cube.original().translation, epsilon = 1.0e-5);
        }
    }

    #[test]
    fn revert_all_twice_keeps_running_animations() {
        let mut manager = three_cubes();
        manager.drop_all();
        for _ in 0..10 {
            manager.frame(FRAME);
        }

        manager.revert_all();
        for _ in 0..30 {
            manager.frame(FRAME);
        }
        manager.revert_all();

        // Had the second call restarted the tweens, this would take another full second.
        let mut returned = 0;
        for _ in 0..30 {
            returned += manager.frame(FRAME).returned;
        }
        assert_eq!(returned, 3);
    }

    #[test]
    fn create_field_replaces_previous_field() {
        let mut manager = three_cubes();
        let old: Vec<_> = manager.field().iter().map(Cube::body).collect();

        manager.create_field(anchor(3.0));

        assert_eq!(manager.field().len(), 48);
        assert_eq!(manager.physics().bodies.len(), 48);
        assert!(old.iter().all(|b| manager.physics().pose(*b).is_none()));
        assert_eq!(cues(&manager, Clip::Ready), 2);
    }

    #[test]
    fn falls_back_to_dead_ahead_after_timeout() {
        let viewer = Transform::from_translation(Vec3::new(0.0, 1.6, 0.0));
        let mut manager = manager_with(
            FieldConfig::default(),
            RapierPhysics::new(),
            ViewerGaze::inactive(viewer),
        );

        for _ in 0..9 {
            assert!(!manager.frame(Duration::from_secs(1)).created);
        }
        assert!(manager.field().is_empty());

        assert!(manager.frame(Duration::from_secs(1)).created);
        let expected = generate(&GridAnchor::dead_ahead(&viewer, 3.5));
        assert_eq!(manager.field().len(), expected.len());
        assert_eq!(manager.field().get(0).unwrap().spec(), &expected[0]);
        assert_eq!(manager.gate(), GridGate::Satisfied);

        // One generation per request.
        manager.frame(Duration::from_secs(20));
        assert_eq!(cues(&manager, Clip::Ready), 1);
    }

    #[test]
    fn first_gaze_hit_generates_grid() {
        let mut manager = manager_with(
            FieldConfig::default(),
            RapierPhysics::new(),
            ViewerGaze::default(),
        );
        manager.gaze_mut().observe(Some(GazeHit {
            point: Vec3::new(0.0, 0.0, 3.0),
            has_hit: false,
            body: None,
        }));
        assert!(!manager.frame(FRAME).created);

        manager.gaze_mut().observe(Some(GazeHit {
            point: Vec3::new(0.0, 0.0, 3.0),
            has_hit: true,
            body: None,
        }));
        assert!(manager.frame(FRAME).created);
        assert_eq!(manager.field().len(), 48);
    }

    #[test]
    fn gazed_commands_target_one_cube() {
        let mut manager = three_cubes();
        gaze_at(&mut manager, 1);

        assert!(manager.drop_gazed());
        let phases: Vec<_> = manager.field().iter().map(Cube::phase).collect();
        assert_eq!(
            phases,
            vec![CubePhase::Idle, CubePhase::Launched, CubePhase::Idle]
        );

        assert!(manager.revert_gazed());
        assert!(manager.field().get(1).unwrap().is_returning());
        assert_eq!(
            manager.audio().last(),
            Some(&AudioCue {
                clip: Clip::ComeBack,
                source: CueSource::Cube(1),
            })
        );

        manager.gaze_mut().observe(None);
        assert!(!manager.drop_gazed());
    }

    #[test]
    fn click_pushes_gazed_cube_along_gaze() {
        let mut manager = three_cubes();
        manager.frame(FRAME);
        gaze_at(&mut manager, 0);

        assert!(manager.click());

        let cube = manager.field().get(0).unwrap();
        assert_eq!(cube.phase(), CubePhase::Idle);
        let (body, start) = (cube.body(), cube.original().translation);
        let v = manager.physics().linear_velocity(body).unwrap();
        // A 1 kg cube under 100 N for 20 ms.
        assert_relative_eq!(v, Vec3::new(0.0, 0.0, 2.0), epsilon = 1.0e-4);

        // Still a gentle push a second later, not a launch out of the room.
        for _ in 0..60 {
            manager.frame(FRAME);
        }
        let pose = manager.physics().pose(body).unwrap();
        assert!(pose.translation.z - start.z < 2.5);
    }

    #[test]
    fn falling_cubes_bounce_audibly_off_the_floor() {
        let physics = RapierPhysics::with_statics(vec![WorldStaticDef::floor(1, -1.0)]);
        let mut manager = manager_with(three_cube_config(), physics, ViewerGaze::default());
        manager.create_field(anchor(2.9));
        manager.drop_all();

        for _ in 0..120 {
            manager.frame(FRAME);
        }

        assert!(cues(&manager, Clip::BounceOther) >= 3);
        assert!(
            manager
                .audio()
                .iter()
                .filter(|c| c.clip == Clip::BounceOther)
                .all(|c| matches!(c.source, CueSource::Cube(id) if id < 3))
        );
    }

    #[test]
    fn bus_commands_reach_the_manager() {
        let bus = CommandBus::new();
        let manager = Rc::new(RefCell::new(three_cubes()));
        FieldManager::attach(&manager, &bus);

        bus.publish(&Command::Drop { all: true });
        assert!(
            manager
                .borrow()
                .field()
                .iter()
                .all(|c| c.phase() == CubePhase::Launched)
        );

        bus.publish(&Command::Revert { all: true });
        assert_eq!(cues(&manager.borrow(), Clip::ReturnAll), 1);

        bus.publish(&Command::CreateGrid);
        assert!(manager.borrow().field().is_empty());
        assert_eq!(
            manager.borrow().gate(),
            GridGate::Pending {
                waited: Duration::ZERO
            }
        );

        drop(manager);
        assert_eq!(bus.subscriber_count(CommandTag::CreateGrid), 0);
    }
}
