//! CPU-side vertex data
//!
//! Vertex buffers are stored as separate typed element streams rather than an
//! interleaved byte blob. Every stream that is present has exactly
//! `vertex_count()` entries; absent streams are empty.

use std::sync::Arc;

use bitflags::bitflags;
use glam::{Vec3, Vec4};

use crate::resources::version_tracker::ChangeTracker;
use crate::utils::NameHash;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct VertexMask: u8 {
        const POSITION      = 1 << 0;
        const NORMAL        = 1 << 1;
        const TANGENT       = 1 << 2;
        const BLEND_WEIGHTS = 1 << 3;
        const BLEND_INDICES = 1 << 4;
    }
}

/// Bone influences per vertex stored in a buffer.
pub const MAX_VERTEX_BONES: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct VertexBuffer {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    pub blend_weights: Vec<[f32; MAX_VERTEX_BONES]>,
    pub blend_indices: Vec<[u8; MAX_VERTEX_BONES]>,

    tracker: ChangeTracker,
}

impl VertexBuffer {
    #[must_use]
    pub fn new(positions: Vec<Vec3>) -> Self {
        Self {
            positions,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = normals;
        self
    }

    #[must_use]
    pub fn with_tangents(mut self, tangents: Vec<Vec4>) -> Self {
        self.tangents = tangents;
        self
    }

    #[must_use]
    pub fn with_skin(
        mut self,
        blend_indices: Vec<[u8; MAX_VERTEX_BONES]>,
        blend_weights: Vec<[f32; MAX_VERTEX_BONES]>,
    ) -> Self {
        self.blend_indices = blend_indices;
        self.blend_weights = blend_weights;
        self
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn element_mask(&self) -> VertexMask {
        let count = self.vertex_count();
        let mut mask = VertexMask::empty();
        if count > 0 {
            mask |= VertexMask::POSITION;
        }
        if count > 0 && self.normals.len() == count {
            mask |= VertexMask::NORMAL;
        }
        if count > 0 && self.tangents.len() == count {
            mask |= VertexMask::TANGENT;
        }
        if count > 0 && self.blend_weights.len() == count {
            mask |= VertexMask::BLEND_WEIGHTS;
        }
        if count > 0 && self.blend_indices.len() == count {
            mask |= VertexMask::BLEND_INDICES;
        }
        mask
    }

    /// Copy of the streams selected by `mask`, with a fresh version.
    #[must_use]
    pub fn clone_elements(&self, mask: VertexMask) -> Self {
        let pick = |flag: VertexMask| mask.contains(flag) && self.element_mask().contains(flag);
        Self {
            positions: if pick(VertexMask::POSITION) { self.positions.clone() } else { Vec::new() },
            normals: if pick(VertexMask::NORMAL) { self.normals.clone() } else { Vec::new() },
            tangents: if pick(VertexMask::TANGENT) { self.tangents.clone() } else { Vec::new() },
            blend_weights: Vec::new(),
            blend_indices: Vec::new(),
            tracker: ChangeTracker::new(),
        }
    }

    /// Publishes modified data to consumers.
    pub fn commit(&mut self) {
        self.tracker.changed();
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.tracker.version()
    }
}

/// One morphed vertex: target index plus per-element deltas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MorphVertex {
    pub index: u32,
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
}

/// Sparse deltas a morph applies to one vertex buffer of the model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VertexBufferMorph {
    pub buffer_index: usize,
    pub element_mask: VertexMask,
    pub vertices: Vec<MorphVertex>,
}

/// A named morph target and its current weight.
///
/// Vertex deltas are immutable asset data shared between every model instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMorph {
    pub name: String,
    pub name_hash: NameHash,
    pub weight: f32,
    pub buffers: Arc<Vec<VertexBufferMorph>>,
}

impl ModelMorph {
    #[must_use]
    pub fn new(name: &str, buffers: Vec<VertexBufferMorph>) -> Self {
        Self {
            name: name.to_string(),
            name_hash: NameHash::new(name),
            weight: 0.0,
            buffers: Arc::new(buffers),
        }
    }

    /// Same morph data with the weight reset to zero.
    #[must_use]
    pub fn instance(&self) -> Self {
        Self {
            weight: 0.0,
            ..self.clone()
        }
    }
}
