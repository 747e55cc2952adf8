//! Simulator settings, loaded from an optional JSON file.

use std::path::Path;
use std::time::Duration;

use cube_field::{ConfigError, FieldConfig, Quat, Transform, Vec3, checked_duration};
use serde::{Deserialize, Serialize};

/// Viewer (head) pose. Yaw turns about +Y, positive pitch looks down.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerPose {
    pub position: [f32; 3],
    pub yaw_degrees: f32,
    pub pitch_degrees: f32,
}

impl Default for ViewerPose {
    fn default() -> Self {
        Self {
            position: [0.0, 1.6, 0.0],
            yaw_degrees: 0.0,
            pitch_degrees: 0.0,
        }
    }
}

impl ViewerPose {
    pub fn transform(&self) -> Transform {
        let yaw = Quat::from_axis_angle(&Vec3::y_axis(), self.yaw_degrees.to_radians());
        let pitch = Quat::from_axis_angle(&Vec3::x_axis(), self.pitch_degrees.to_radians());
        Transform::new(Vec3::from(self.position), yaw * pitch)
    }
}

/// A recognised voice keyword, injected at a fixed simulation time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptedKeyword {
    pub at_secs: f32,
    pub keyword: String,
}

impl ScriptedKeyword {
    pub fn new(at_secs: f32, keyword: &str) -> Self {
        Self {
            at_secs,
            keyword: keyword.to_owned(),
        }
    }

    /// Entries whose time does not fit a [`Duration`] never fire.
    pub fn at(&self) -> Duration {
        Duration::try_from_secs_f32(self.at_secs).unwrap_or(Duration::MAX)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub field: FieldConfig,
    pub frame_rate: u32,
    pub duration_secs: f32,
    pub viewer: ViewerPose,
    /// Distance from the viewer to the wall in front of it (meters).
    pub wall_distance: f32,
    pub floor_height: f32,
    pub script: Vec<ScriptedKeyword>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            field: FieldConfig::default(),
            frame_rate: 60,
            duration_secs: 12.0,
            viewer: ViewerPose::default(),
            wall_distance: 3.0,
            floor_height: 0.0,
            script: vec![
                ScriptedKeyword::new(1.0, "drop all"),
                ScriptedKeyword::new(4.0, "revert all"),
                ScriptedKeyword::new(6.0, "create new grid"),
                ScriptedKeyword::new(7.0, "drop"),
                ScriptedKeyword::new(9.0, "go back"),
            ],
        }
    }
}

impl SimConfig {
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
        self.field.validate()?;

        if self.frame_rate == 0 {
            return Err(ConfigError::Invalid("frame_rate must be positive".into()));
        }
        checked_duration("duration_secs", self.duration_secs)?;
        if !self.wall_distance.is_finite() || self.wall_distance <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "wall_distance must be positive, got {}",
                self.wall_distance
            )));
        }
        for entry in &self.script {
            checked_duration(&format!("script entry {:?}", entry.keyword), entry.at_secs)?;
        }
        Ok(())
    }

    pub fn frame_dt(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }

    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.duration_secs).unwrap_or(Duration::ZERO)
    }
}
