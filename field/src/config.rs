//! Field configuration.
//!
//! Every field has a default taken from [`crate::constants`], so a JSON file only needs to
//! name the values it changes.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    BOUNCE_VELOCITY_THRESHOLD, DEFAULT_FORCE_MULTIPLIER, FALLBACK_VIEW_DISTANCE,
    MAX_GAZE_DISTANCE, RETURN_DURATION, SURFACE_DETECTION_TIMEOUT,
};
use crate::cube::ReturnSettings;
use crate::grid::GridLayout;
use crate::tween::Ease;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub grid: GridLayout,
    /// Scale applied to the gaze direction when a cube is clicked.
    pub force_multiplier: f32,
    pub return_duration_secs: f32,
    pub return_ease: Ease,
    /// Minimum relative speed for a cube-vs-surface bounce cue (m/s).
    pub bounce_velocity_threshold: f32,
    /// How long a grid request waits for a gaze hit before using the fallback anchor.
    pub detection_timeout_secs: f32,
    /// View distance of the fallback anchor (meters).
    pub fallback_distance: f32,
    /// Gaze raycast length (meters).
    pub max_gaze_distance: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            grid: GridLayout::default(),
            force_multiplier: DEFAULT_FORCE_MULTIPLIER,
            return_duration_secs: RETURN_DURATION.as_secs_f32(),
            return_ease: Ease::default(),
            bounce_velocity_threshold: BOUNCE_VELOCITY_THRESHOLD,
            detection_timeout_secs: SURFACE_DETECTION_TIMEOUT.as_secs_f32(),
            fallback_distance: FALLBACK_VIEW_DISTANCE,
            max_gaze_distance: MAX_GAZE_DISTANCE,
        }
    }
}

impl FieldConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite_non_negative = [
            ("grid.depth_start", self.grid.depth_start),
            ("grid.depth_margin", self.grid.depth_margin),
            ("grid.lateral_extent", self.grid.lateral_extent),
            ("return_duration_secs", self.return_duration_secs),
            ("bounce_velocity_threshold", self.bounce_velocity_threshold),
            ("detection_timeout_secs", self.detection_timeout_secs),
            ("fallback_distance", self.fallback_distance),
            ("force_multiplier", self.force_multiplier),
        ];
        for (name, value) in finite_non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }

        let positive = [
            ("grid.step", self.grid.step),
            ("grid.cube_half_extent", self.grid.cube_half_extent),
            ("max_gaze_distance", self.max_gaze_distance),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        checked_duration("return_duration_secs", self.return_duration_secs)?;
        checked_duration("detection_timeout_secs", self.detection_timeout_secs)?;
        Ok(())
    }

    /// Falls back to [`RETURN_DURATION`] when the configured value is not a valid duration.
    pub fn return_settings(&self) -> ReturnSettings {
        ReturnSettings {
            duration: Duration::try_from_secs_f32(self.return_duration_secs)
                .unwrap_or(RETURN_DURATION),
            ease: self.return_ease,
        }
    }

    pub fn detection_timeout(&self) -> Duration {
        Duration::try_from_secs_f32(self.detection_timeout_secs)
            .unwrap_or(SURFACE_DETECTION_TIMEOUT)
    }
}

/// Converts a seconds value into a [`Duration`], rejecting negative, non-finite and
/// unrepresentable values.
pub fn checked_duration(name: &str, secs: f32) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f32(secs).map_err(|err| {
        ConfigError::Invalid(format!("{name} is not a valid duration ({secs}): {err}"))
    })
}
