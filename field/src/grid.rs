//! Lattice generation for cube spawn transforms.
//!
//! The lattice is laid out in the anchor's local frame: depth along the anchor's forward
//! axis, and two lateral axes along its right and up axes. Traversal is depth-major, then
//! right, then up, all ascending; a cell's `id` is its traversal index. Collision audio uses
//! id order as a tie-break, so identical anchors must always yield identical output.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CUBE_HALF_EXTENT, GRID_DEPTH_MARGIN, GRID_DEPTH_START, GRID_LATERAL_EXTENT,
    GRID_MAX_CELLS_PER_AXIS, GRID_STEP, GRID_STEP_EPS,
};
use crate::types::{Quat, Transform, Vec3};

/// Dense, zero-based cube identifier within one grid.
pub type CubeId = u32;

/// Reference frame for one grid-generation request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridAnchor {
    /// Viewer origin the lattice offsets are measured from.
    pub position: Vec3,
    /// Viewer orientation; supplies the forward/right/up axes.
    pub orientation: Quat,
    /// Distance from the viewer to the gazed surface (meters).
    pub view_distance: f32,
}

impl GridAnchor {
    /// Anchor for a gaze hit: the view distance is the viewer-to-hit distance.
    pub fn from_hit(viewer: &Transform, hit_point: Vec3) -> Self {
        Self {
            position: viewer.translation,
            orientation: viewer.rotation,
            view_distance: (hit_point - viewer.translation).norm(),
        }
    }

    /// Anchor for a surface `distance` meters straight ahead of the viewer.
    pub fn dead_ahead(viewer: &Transform, distance: f32) -> Self {
        Self {
            position: viewer.translation,
            orientation: viewer.rotation,
            view_distance: distance.max(0.0),
        }
    }

    #[inline]
    fn frame(&self) -> Transform {
        Transform::new(self.position, self.orientation)
    }
}

/// Spawn description for one cube.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubeSpec {
    pub id: CubeId,
    pub spawn_position: Vec3,
    pub spawn_orientation: Quat,
}

impl CubeSpec {
    #[inline]
    pub fn transform(&self) -> Transform {
        Transform::new(self.spawn_position, self.spawn_orientation)
    }
}

/// Lattice dimensions (meters).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    /// Depth of the nearest layer.
    pub depth_start: f32,
    /// Gap between the deepest layer and the surface.
    pub depth_margin: f32,
    /// Half-width of both lateral ranges.
    pub lateral_extent: f32,
    /// Cell spacing on all three axes.
    pub step: f32,
    /// Half extent of each cube's collider.
    pub cube_half_extent: f32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            depth_start: GRID_DEPTH_START,
            depth_margin: GRID_DEPTH_MARGIN,
            lateral_extent: GRID_LATERAL_EXTENT,
            step: GRID_STEP,
            cube_half_extent: CUBE_HALF_EXTENT,
        }
    }
}

impl GridLayout {
    /// Depth range for a view distance. A far bound short of the start collapses to a single
    /// layer at `depth_start`.
    pub fn depth_range(&self, view_distance: f32) -> (f32, f32) {
        let far = view_distance - self.depth_margin;
        (self.depth_start, far.max(self.depth_start))
    }

    /// Number of cells along an axis spanning `[lo, hi]`: `floor((hi - lo) / step) + 1`,
    /// capped at [`GRID_MAX_CELLS_PER_AXIS`]. A non-finite span yields a single cell.
    pub fn steps(&self, lo: f32, hi: f32) -> u32 {
        if !(self.step > 0.0) || !(hi > lo) {
            return 1;
        }
        let gaps = ((hi - lo) / self.step + GRID_STEP_EPS).floor();
        if !gaps.is_finite() {
            return 1;
        }
        // `as` saturates, so huge spans land on the cap instead of wrapping.
        (gaps as u32).min(GRID_MAX_CELLS_PER_AXIS - 1) + 1
    }

    /// Cell count per axis as `(depth, right, up)`.
    pub fn dimensions(&self, view_distance: f32) -> (u32, u32, u32) {
        let (near, far) = self.depth_range(view_distance);
        let lateral = self.steps(-self.lateral_extent, self.lateral_extent);
        (self.steps(near, far), lateral, lateral)
    }
}

/// Generate spawn specs with the default layout.
pub fn generate(anchor: &GridAnchor) -> Vec<CubeSpec> {
    generate_with(anchor, &GridLayout::default())
}

/// Generate spawn specs for `anchor` with `layout`.
pub fn generate_with(anchor: &GridAnchor, layout: &GridLayout) -> Vec<CubeSpec> {
    let frame = anchor.frame();
    let (forward, right, up) = (frame.forward(), frame.right(), frame.up());

    // Turn each cube half a revolution about the anchor's up axis so its front faces the viewer.
    let spawn_orientation = anchor.orientation * Quat::from_axis_angle(&Vec3::y_axis(), PI);

    let (near, _) = layout.depth_range(anchor.view_distance);
    let lateral_lo = -layout.lateral_extent;
    let (depth_n, right_n, up_n) = layout.dimensions(anchor.view_distance);

    let mut specs = Vec::with_capacity((depth_n * right_n * up_n) as usize);
    let mut id: CubeId = 0;

    for zi in 0..depth_n {
        let z = near + zi as f32 * layout.step;
        for xi in 0..right_n {
            let x = lateral_lo + xi as f32 * layout.step;
            for yi in 0..up_n {
                let y = lateral_lo + yi as f32 * layout.step;
                specs.push(CubeSpec {
                    id,
                    spawn_position: anchor.position + forward * z + right * x + up * y,
                    spawn_orientation,
                });
                id += 1;
            }
        }
    }

    specs
}
