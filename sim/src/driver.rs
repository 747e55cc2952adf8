//! Frame-stepped driver: a floor, a wall in front of the viewer, and a keyword script.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use cube_field::{
    CommandBus, CubePhase, FieldManager, FrameStats, GazeProbe, PhysicsEngine, RapierPhysics,
    SpeechCommands, ViewerGaze, WorldStaticDef,
};

use crate::audio::LogAudio;
use crate::config::{ScriptedKeyword, SimConfig};

const FLOOR_ID: u32 = 0;
const WALL_ID: u32 = 1;

pub type SimManager = FieldManager<RapierPhysics, LogAudio, ViewerGaze>;

/// Totals over a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub grids_created: usize,
    pub collisions: usize,
    pub cues: usize,
    pub returned: usize,
    pub keywords: usize,
}

impl RunSummary {
    fn record(&mut self, stats: FrameStats) {
        self.frames += 1;
        self.grids_created += usize::from(stats.created);
        self.collisions += stats.collisions;
        self.cues += stats.cues;
        self.returned += stats.returned;
    }
}

pub struct Simulation {
    manager: Rc<RefCell<SimManager>>,
    commands: SpeechCommands,
    script: VecDeque<ScriptedKeyword>,
    frame_dt: Duration,
    max_gaze_distance: f32,
    elapsed: Duration,
    summary: RunSummary,
}

impl Simulation {
    pub fn new(config: &SimConfig) -> Self {
        let viewer = config.viewer.transform();
        let forward = viewer.forward();
        let physics = RapierPhysics::with_statics(vec![
            WorldStaticDef::floor(FLOOR_ID, config.floor_height),
            WorldStaticDef::wall(
                WALL_ID,
                viewer.translation + forward * config.wall_distance,
                -forward,
            ),
        ]);

        let manager = Rc::new(RefCell::new(FieldManager::new(
            config.field.clone(),
            physics,
            LogAudio::default(),
            ViewerGaze::new(viewer),
        )));
        let bus = Rc::new(CommandBus::new());
        FieldManager::attach(&manager, &bus);

        let mut script: Vec<_> = config.script.clone();
        script.sort_by(|a, b| a.at_secs.total_cmp(&b.at_secs));

        Self {
            manager,
            commands: SpeechCommands::new(bus),
            script: script.into(),
            frame_dt: config.frame_dt(),
            max_gaze_distance: config.field.max_gaze_distance,
            elapsed: Duration::ZERO,
            summary: RunSummary::default(),
        }
    }

    /// Advance one frame: due keywords, then the gaze raycast, then the field.
    pub fn step(&mut self) -> FrameStats {
        while self
            .script
            .front()
            .is_some_and(|next| next.at() <= self.elapsed)
        {
            let Some(next) = self.script.pop_front() else {
                break;
            };
            let t = self.elapsed.as_secs_f32();
            match self.commands.publish_keyword(&next.keyword) {
                Some(command) => {
                    log::info!("t={t:.2}s {:?} -> {command:?}", next.keyword);
                    self.summary.keywords += 1;
                }
                None => log::warn!("t={t:.2}s unknown keyword {:?}", next.keyword),
            }
        }

        let mut manager = self.manager.borrow_mut();
        let ray = manager.gaze().gaze_ray();
        let hit = manager.physics().cast_ray(&ray, self.max_gaze_distance);
        manager.gaze_mut().observe(hit);
        if let Some(hit) = hit {
            manager.physics_mut().place_pointer(hit.point);
        }

        let stats = manager.frame(self.frame_dt);
        self.elapsed += self.frame_dt;
        self.summary.record(stats);
        stats
    }

    /// Step until `duration` of simulated time has passed.
    pub fn run(&mut self, duration: Duration) -> RunSummary {
        while self.elapsed < duration {
            self.step();
        }
        self.summary
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn manager(&self) -> std::cell::Ref<'_, SimManager> {
        self.manager.borrow()
    }

    /// Number of cubes in each phase, as (idle, launched, returning).
    pub fn phase_counts(&self) -> (usize, usize, usize) {
        let manager = self.manager.borrow();
        manager
            .field()
            .iter()
            .fold((0, 0, 0), |(idle, launched, returning), cube| match cube.phase() {
                CubePhase::Idle => (idle + 1, launched, returning),
                CubePhase::Launched => (idle, launched + 1, returning),
                CubePhase::Returning => (idle, launched, returning + 1),
            })
    }

    /// Cubes whose body sits below the floor plane. Should stay zero.
    pub fn sunk_cubes(&self, floor_height: f32) -> usize {
        let manager = self.manager.borrow();
        manager
            .field()
            .iter()
            .filter_map(|cube| manager.physics().pose(cube.body()))
            .filter(|pose| pose.translation.y < floor_height - 0.1)
            .count()
    }
}
