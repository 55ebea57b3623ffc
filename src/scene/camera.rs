use glam::{Affine3A, Vec3};

use crate::model::M_EPSILON;

/// View-side queries needed by animation LOD.
///
/// Implementations are read concurrently from worker threads during the
/// per-frame update, hence the `Sync` bound.
pub trait View: Sync {
    /// Distance from the view to a world-space point.
    fn distance(&self, world_position: Vec3) -> f32;

    /// LOD score for an object at `distance` with world-space `scale`.
    /// Larger values mean coarser detail.
    fn lod_distance(&self, distance: f32, scale: f32, bias: f32) -> f32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionType {
    Perspective,
    Orthographic,
}

/// A camera as seen by the animation core: a world placement plus the
/// parameters that drive LOD scoring.
#[derive(Debug, Clone)]
pub struct Camera {
    pub projection_type: ProjectionType,
    pub ortho_size: f32,
    pub zoom: f32,
    pub lod_bias: f32,

    pub(crate) world_matrix: Affine3A,
    pub(crate) view_matrix: Affine3A,
}

impl Camera {
    #[must_use]
    pub fn new_perspective() -> Self {
        Self {
            projection_type: ProjectionType::Perspective,
            ortho_size: 20.0,
            zoom: 1.0,
            lod_bias: 1.0,
            world_matrix: Affine3A::IDENTITY,
            view_matrix: Affine3A::IDENTITY,
        }
    }

    #[must_use]
    pub fn new_orthographic(ortho_size: f32) -> Self {
        Self {
            projection_type: ProjectionType::Orthographic,
            ortho_size,
            ..Self::new_perspective()
        }
    }

    /// Places the camera. The view matrix is the inverse of `world_transform`.
    pub fn set_world_transform(&mut self, world_transform: Affine3A) {
        self.world_matrix = world_transform;
        self.view_matrix = world_transform.inverse();
    }

    #[inline]
    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        self.world_matrix.translation.into()
    }

    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> &Affine3A {
        &self.view_matrix
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new_perspective()
    }
}

impl View for Camera {
    fn distance(&self, world_position: Vec3) -> f32 {
        match self.projection_type {
            ProjectionType::Perspective => (world_position - self.world_position()).length(),
            ProjectionType::Orthographic => {
                self.view_matrix.transform_point3(world_position).z.abs()
            }
        }
    }

    fn lod_distance(&self, distance: f32, scale: f32, bias: f32) -> f32 {
        let d = (self.lod_bias * bias * scale * self.zoom).max(M_EPSILON);
        match self.projection_type {
            ProjectionType::Perspective => distance / d,
            ProjectionType::Orthographic => self.ortho_size / d,
        }
    }
}
