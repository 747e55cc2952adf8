use std::time::Duration;

/// Distance from the viewer to the first (nearest) depth layer of the lattice (meters).
pub const GRID_DEPTH_START: f32 = 1.5;

/// Gap kept between the last depth layer and the gazed surface (meters).
///
/// The deepest layer sits at `view_distance - GRID_DEPTH_MARGIN`.
pub const GRID_DEPTH_MARGIN: f32 = 1.0;

/// Half-width of the lattice on both lateral axes (meters).
/// Lateral coordinates run over `[-GRID_LATERAL_EXTENT, +GRID_LATERAL_EXTENT]`.
pub const GRID_LATERAL_EXTENT: f32 = 0.35;

/// Spacing between neighbouring cells on every axis (meters).
pub const GRID_STEP: f32 = 0.2;

/// Slack added before flooring `range / step` so exact multiples are not lost to rounding.
pub const GRID_STEP_EPS: f32 = 1.0e-4;

/// Upper bound on lattice cells along any one axis, for absurd view distances.
pub const GRID_MAX_CELLS_PER_AXIS: u32 = 256;

/// Half extent of a spawned cube collider (meters).
pub const CUBE_HALF_EXTENT: f32 = 0.05;

/// Mass of a cube body (kilograms), independent of its size.
pub const CUBE_MASS_KG: f32 = 1.0;

/// Force (newtons) per unit of gaze direction when nudging a cube.
pub const DEFAULT_FORCE_MULTIPLIER: f32 = 100.0;

/// How long a nudge force acts. The nudge is applied as the impulse `force * duration`, so the
/// default multiplier moves a cube at 2 m/s.
pub const NUDGE_FORCE_DURATION: Duration = Duration::from_millis(20);

/// Length of the scripted return-to-origin motion.
pub const RETURN_DURATION: Duration = Duration::from_secs(1);

/// Relative speed (m/s) a cube must exceed against a non-cube body to produce a bounce cue.
/// Filters resting contacts.
pub const BOUNCE_VELOCITY_THRESHOLD: f32 = 0.1;

/// How long a creation request waits for a gaze hit before falling back to a dead-ahead anchor.
pub const SURFACE_DETECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// View distance used for the dead-ahead fallback anchor (meters).
pub const FALLBACK_VIEW_DISTANCE: f32 = 3.5;

/// Maximum gaze raycast length (meters).
pub const MAX_GAZE_DISTANCE: f32 = 20.0;

/// Gravity magnitude in meters per second squared (positive value).
pub const GRAVITY_MPS2: f32 = 9.81;
