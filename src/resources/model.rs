use std::sync::Arc;

use glam::Vec3;

use crate::resources::bounding::BoundingBox;
use crate::resources::vertex_buffer::{ModelMorph, VertexBuffer};
use crate::scene::skeleton::Skeleton;

/// Where a geometry reads one of its vertex streams from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferSource {
    /// A vertex buffer owned by the [`Model`] asset.
    Model(usize),
    /// A per-instance clone produced by the software animator.
    Animated(usize),
}

/// A drawable subset of a model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometry {
    pub vertex_buffers: Vec<BufferSource>,
    pub index_start: usize,
    pub index_count: usize,
}

impl Geometry {
    #[must_use]
    pub fn new(vertex_buffer: usize, index_start: usize, index_count: usize) -> Self {
        Self {
            vertex_buffers: vec![BufferSource::Model(vertex_buffer)],
            index_start,
            index_count,
        }
    }
}

/// Vertex range of a buffer touched by any morph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MorphRange {
    pub start: usize,
    pub count: usize,
}

/// Immutable model asset shared by animated model instances.
///
/// `geometry_bone_mappings[i]` lists the global bone indices used by geometry
/// `i`, in the order its vertices reference them. An empty list means the
/// geometry uses the global skin matrices directly.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub name: String,
    pub bounding_box: BoundingBox,
    pub skeleton: Skeleton,

    pub geometries: Vec<Geometry>,
    pub geometry_centers: Vec<Vec3>,
    pub geometry_bone_mappings: Vec<Vec<usize>>,

    pub vertex_buffers: Vec<Arc<VertexBuffer>>,
    pub morph_ranges: Vec<MorphRange>,
    pub morphs: Vec<ModelMorph>,
}

impl Model {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn num_geometries(&self) -> usize {
        self.geometries.len()
    }

    #[must_use]
    pub fn morph_range(&self, buffer_index: usize) -> MorphRange {
        self.morph_ranges.get(buffer_index).copied().unwrap_or_default()
    }

    /// Recomputes each buffer's morph range from the morph vertex indices.
    pub fn update_morph_ranges(&mut self) {
        self.morph_ranges = vec![MorphRange::default(); self.vertex_buffers.len()];
        let mut bounds: Vec<Option<(usize, usize)>> = vec![None; self.vertex_buffers.len()];

        for morph in &self.morphs {
            for buffer in morph.buffers.iter() {
                let Some(slot) = bounds.get_mut(buffer.buffer_index) else {
                    continue;
                };
                for vertex in &buffer.vertices {
                    let index = vertex.index as usize;
                    *slot = Some(match *slot {
                        Some((lo, hi)) => (lo.min(index), hi.max(index)),
                        None => (index, index),
                    });
                }
            }
        }

        for (range, bound) in self.morph_ranges.iter_mut().zip(bounds) {
            if let Some((lo, hi)) = bound {
                *range = MorphRange {
                    start: lo,
                    count: hi - lo + 1,
                };
            }
        }
    }
}
