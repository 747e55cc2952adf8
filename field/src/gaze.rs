//! Where the user is looking.
//!
//! Surface detection itself is external. [`GazeProbe`] is what the field manager needs from
//! it: the viewer pose, the current hit (if any) and whether detection is available at all.

use rapier3d::prelude::RigidBodyHandle;

use crate::types::{Transform, Vec3};

/// A ray from the viewer along the gaze direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GazeRay {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl GazeRay {
    /// Ray along the viewer's forward axis.
    pub fn from_viewer(viewer: &Transform) -> Self {
        Self {
            origin: viewer.translation,
            direction: viewer.forward().normalize(),
        }
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Result of a gaze probe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GazeHit {
    pub point: Vec3,
    pub has_hit: bool,
    /// Body under the gaze, if the hit landed on one.
    pub body: Option<RigidBodyHandle>,
}

pub trait GazeProbe {
    /// Current gaze hit, or `None` when nothing is hit.
    fn probe(&self) -> Option<GazeHit>;

    /// Whether surface detection is available at all.
    fn is_active(&self) -> bool;

    /// Viewer (head/camera) pose.
    fn viewer(&self) -> Transform;

    fn gaze_ray(&self) -> GazeRay {
        GazeRay::from_viewer(&self.viewer())
    }
}

/// Gaze state fed from outside once per frame (e.g. by a raycast against the scene).
#[derive(Clone, Debug)]
pub struct ViewerGaze {
    viewer: Transform,
    hit: Option<GazeHit>,
    active: bool,
}

impl Default for ViewerGaze {
    fn default() -> Self {
        Self::new(Transform::identity())
    }
}

impl ViewerGaze {
    pub fn new(viewer: Transform) -> Self {
        Self {
            viewer,
            hit: None,
            active: true,
        }
    }

    /// A probe whose surface detection is unavailable; it never reports hits.
    pub fn inactive(viewer: Transform) -> Self {
        Self {
            viewer,
            hit: None,
            active: false,
        }
    }

    pub fn set_viewer(&mut self, viewer: Transform) {
        self.viewer = viewer;
    }

    /// Record this frame's hit (`None` clears it).
    pub fn observe(&mut self, hit: Option<GazeHit>) {
        self.hit = if self.active { hit } else { None };
    }
}

impl GazeProbe for ViewerGaze {
    fn probe(&self) -> Option<GazeHit> {
        self.hit.filter(|h| h.has_hit)
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn viewer(&self) -> Transform {
        self.viewer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_probe_ignores_hits() {
        let mut gaze = ViewerGaze::inactive(Transform::identity());
        gaze.observe(Some(GazeHit {
            point: Vec3::new(0.0, 0.0, 2.0),
            has_hit: true,
            body: None,
        }));

        assert!(!gaze.is_active());
        assert_eq!(gaze.probe(), None);
    }

    #[test]
    fn misses_are_not_reported() {
        let mut gaze = ViewerGaze::default();
        gaze.observe(Some(GazeHit {
            point: Vec3::zeros(),
            has_hit: false,
            body: None,
        }));

        assert_eq!(gaze.probe(), None);
    }

    #[test]
    fn ray_follows_viewer_forward() {
        let gaze = ViewerGaze::new(Transform::from_translation(Vec3::new(0.0, 1.6, 0.0)));
        let ray = gaze.gaze_ray();

        assert_eq!(ray.at(2.0), Vec3::new(0.0, 1.6, 2.0));
    }
}
