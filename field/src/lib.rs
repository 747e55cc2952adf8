pub mod arbiter;
pub mod audio;
pub mod body_tag;
pub mod bus;
pub mod commands;
pub mod config;
pub mod constants;
pub mod cube;
pub mod field;
pub mod gaze;
pub mod grid;
pub mod manager;
pub mod physics;
pub mod rapier_world;
pub mod tween;
pub mod types;

pub use audio::{AudioCue, AudioSink, Clip, CueSource};
pub use body_tag::{BodyId, BodyKind, BodyTag, decode_tag, pack_tag, unpack_id};
pub use bus::{Command, CommandBus, CommandHandler, CommandTag, SubscriptionId};
pub use commands::{SpeechCommands, parse_keyword};
pub use config::{ConfigError, FieldConfig, checked_duration};
pub use cube::{Cube, CubePhase, CubeState, ReturnMotion, ReturnSettings};
pub use field::Field;
pub use gaze::{GazeHit, GazeProbe, GazeRay, ViewerGaze};
pub use grid::{CubeId, CubeSpec, GridAnchor, GridLayout, generate, generate_with};
pub use manager::{FieldManager, FrameStats, GridGate};
pub use physics::{CollisionBegin, Contact, PhysicsEngine};
pub use rapier_world::{ColliderShapeDef, RapierPhysics, WorldStaticDef};
pub use tween::{Ease, Tween, TweenStatus};
pub use types::{Quat, Transform, Vec3};
