//! CPU-side morphing and skinning
//!
//! [`SoftwareModelAnimator`] owns per-instance clones of the model's vertex
//! buffers. Every update resets the clones from the originals, adds the
//! weighted morph deltas and, with software skinning, transforms the result
//! by the blended skin matrices before committing.
//!
//! Only the streams that actually change are cloned: position, normal and
//! tangent when skinning, otherwise the union of the streams touched by any
//! morph. Buffers that are neither skinned nor morphed are not cloned at all,
//! and without skinning only the buffer's morph range is reset each update.

use std::sync::Arc;

use glam::{Affine3A, Mat3A, Vec3A};

use crate::resources::model::{BufferSource, Geometry, Model, MorphRange};
use crate::resources::vertex_buffer::{
    MAX_VERTEX_BONES, ModelMorph, VertexBuffer, VertexBufferMorph, VertexMask,
};

/// Skinning inputs extracted once per cloned buffer.
#[derive(Debug, Clone, Default)]
struct SkinData {
    enabled: bool,
    skin_normals: bool,
    skin_tangents: bool,
    /// `influences` entries per vertex.
    blend_indices: Vec<u8>,
    blend_weights: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct SoftwareModelAnimator {
    model: Arc<Model>,
    skinned: bool,
    influences: usize,
    vertex_buffers: Vec<Option<VertexBuffer>>,
    skin_data: Vec<SkinData>,
    geometries: Vec<Geometry>,
}

impl SoftwareModelAnimator {
    /// Clones the buffers of `model` that morphing or skinning will modify.
    ///
    /// `influences` is the number of bone weights used per vertex when
    /// `skinned` is set; with fewer than [`MAX_VERTEX_BONES`] the strongest
    /// influences are kept and renormalised.
    #[must_use]
    pub fn new(model: Arc<Model>, skinned: bool, influences: usize) -> Self {
        let mut animator = Self {
            model,
            skinned,
            influences: influences.clamp(1, MAX_VERTEX_BONES),
            vertex_buffers: Vec::new(),
            skin_data: Vec::new(),
            geometries: Vec::new(),
        };
        animator.clone_model_geometries();
        animator.initialize_skin_data();
        animator
    }

    #[inline]
    #[must_use]
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    #[inline]
    #[must_use]
    pub fn is_skinned(&self) -> bool {
        self.skinned
    }

    /// Geometries rewired to read cloned streams.
    #[inline]
    #[must_use]
    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }

    /// Cloned buffer for model buffer `index`, if that buffer was cloned.
    #[must_use]
    pub fn vertex_buffer(&self, index: usize) -> Option<&VertexBuffer> {
        self.vertex_buffers.get(index).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn num_vertex_buffers(&self) -> usize {
        self.vertex_buffers.len()
    }

    /// Copies original data back into the clones.
    pub fn reset_animation(&mut self) {
        for (index, cloned) in self.vertex_buffers.iter_mut().enumerate() {
            let Some(cloned) = cloned else {
                continue;
            };
            let Some(original) = self.model.vertex_buffers.get(index) else {
                continue;
            };

            let range = if self.skinned {
                MorphRange {
                    start: 0,
                    count: original.vertex_count(),
                }
            } else {
                self.model.morph_range(index)
            };
            copy_streams(cloned, original, range);
        }
    }

    /// Adds the deltas of every morph with a non-zero weight.
    pub fn apply_morphs(&mut self, morphs: &[ModelMorph]) {
        for morph in morphs {
            if morph.weight == 0.0 {
                continue;
            }
            for buffer_morph in morph.buffers.iter() {
                let index = buffer_morph.buffer_index;
                let Some(Some(cloned)) = self.vertex_buffers.get_mut(index) else {
                    continue;
                };
                apply_morph(cloned, buffer_morph, morph.weight);
            }
        }
    }

    /// Transforms the cloned positions (and normals / tangents) by the
    /// weighted sum of their bones' skin matrices.
    pub fn apply_skinning(&mut self, skin_matrices: &[Affine3A]) {
        if !self.skinned {
            return;
        }

        let influences = self.influences;
        for (cloned, data) in self.vertex_buffers.iter_mut().zip(&self.skin_data) {
            let Some(cloned) = cloned else {
                continue;
            };
            if !data.enabled {
                continue;
            }

            for vertex in 0..cloned.vertex_count() {
                let base = vertex * influences;
                let indices = &data.blend_indices[base..base + influences];
                let weights = &data.blend_weights[base..base + influences];
                let matrix = blend_matrices(skin_matrices, indices, weights);

                cloned.positions[vertex] = matrix.transform_point3(cloned.positions[vertex]);
                if data.skin_normals {
                    cloned.normals[vertex] = matrix.transform_vector3(cloned.normals[vertex]);
                }
                if data.skin_tangents {
                    let tangent = cloned.tangents[vertex];
                    let xyz = matrix.transform_vector3(tangent.truncate());
                    cloned.tangents[vertex] = xyz.extend(tangent.w);
                }
            }
        }
    }

    /// Publishes every clone (bumps its version).
    pub fn commit(&mut self) {
        for cloned in self.vertex_buffers.iter_mut().flatten() {
            cloned.commit();
        }
    }

    fn morph_element_mask(&self) -> VertexMask {
        if self.skinned {
            return VertexMask::POSITION | VertexMask::NORMAL | VertexMask::TANGENT;
        }
        self.model
            .morphs
            .iter()
            .flat_map(|morph| morph.buffers.iter())
            .fold(VertexMask::empty(), |mask, buffer| mask | buffer.element_mask)
    }

    fn clone_model_geometries(&mut self) {
        let morph_mask = self.morph_element_mask();
        let originals = &self.model.vertex_buffers;
        self.vertex_buffers = vec![None; originals.len()];

        for (index, original) in originals.iter().enumerate() {
            if !self.skinned && self.model.morph_range(index).count == 0 {
                continue;
            }

            let cloned_mask = morph_mask & original.element_mask();
            if cloned_mask.is_empty() {
                log::warn!("Vertex buffer {index} has no elements to morph or skin; not cloned");
                continue;
            }

            self.vertex_buffers[index] = Some(original.clone_elements(cloned_mask));
        }

        // Each geometry keeps its original streams and appends the clones,
        // which override the matching elements
        self.geometries = self
            .model
            .geometries
            .iter()
            .map(|geometry| {
                let mut cloned = geometry.clone();
                for source in &geometry.vertex_buffers {
                    if let BufferSource::Model(index) = *source
                        && self.vertex_buffers.get(index).is_some_and(Option::is_some)
                    {
                        cloned.vertex_buffers.push(BufferSource::Animated(index));
                    }
                }
                cloned
            })
            .collect();
    }

    fn initialize_skin_data(&mut self) {
        self.skin_data = vec![SkinData::default(); self.vertex_buffers.len()];
        if !self.skinned {
            return;
        }

        let influences = self.influences;
        for (index, cloned) in self.vertex_buffers.iter().enumerate() {
            let Some(cloned) = cloned else {
                continue;
            };
            let original = &self.model.vertex_buffers[index];
            let mask = original.element_mask();
            if !mask.contains(VertexMask::BLEND_INDICES | VertexMask::BLEND_WEIGHTS) {
                log::warn!("Vertex buffer {index} has no blend indices or weights; not skinned");
                continue;
            }

            let cloned_mask = cloned.element_mask();
            let data = &mut self.skin_data[index];
            data.enabled = true;
            data.skin_normals = cloned_mask.contains(VertexMask::NORMAL);
            data.skin_tangents = cloned_mask.contains(VertexMask::TANGENT);
            data.blend_indices.reserve(original.vertex_count() * influences);
            data.blend_weights.reserve(original.vertex_count() * influences);

            for (indices, weights) in original.blend_indices.iter().zip(&original.blend_weights) {
                if influences == MAX_VERTEX_BONES {
                    data.blend_indices.extend_from_slice(indices);
                    data.blend_weights.extend_from_slice(weights);
                    continue;
                }

                // Keep the strongest influences and renormalise them
                let mut bones: [(f32, u8); MAX_VERTEX_BONES] =
                    std::array::from_fn(|i| (weights[i], indices[i]));
                bones.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.cmp(&a.1)));
                let total: f32 = bones[..influences].iter().map(|b| b.0).sum();
                for &(weight, bone) in &bones[..influences] {
                    data.blend_indices.push(bone);
                    data.blend_weights.push(if total > 0.0 { weight / total } else { 0.0 });
                }
            }
        }
    }
}

fn blend_matrices(skin_matrices: &[Affine3A], indices: &[u8], weights: &[f32]) -> Affine3A {
    let mut matrix3 = Mat3A::ZERO;
    let mut translation = Vec3A::ZERO;
    for (&bone, &weight) in indices.iter().zip(weights) {
        let skin = skin_matrices
            .get(bone as usize)
            .copied()
            .unwrap_or(Affine3A::IDENTITY);
        matrix3 += skin.matrix3 * weight;
        translation += skin.translation * weight;
    }
    Affine3A { matrix3, translation }
}

/// Copies the streams present in `dest` over `range` from `src`.
fn copy_streams(dest: &mut VertexBuffer, src: &VertexBuffer, range: MorphRange) {
    let end = (range.start + range.count).min(src.vertex_count()).min(dest.vertex_count());
    if range.start >= end {
        return;
    }
    let span = range.start..end;

    let mask = dest.element_mask() & src.element_mask();
    if mask.contains(VertexMask::POSITION) {
        dest.positions[span.clone()].copy_from_slice(&src.positions[span.clone()]);
    }
    if mask.contains(VertexMask::NORMAL) {
        dest.normals[span.clone()].copy_from_slice(&src.normals[span.clone()]);
    }
    if mask.contains(VertexMask::TANGENT) {
        dest.tangents[span.clone()].copy_from_slice(&src.tangents[span]);
    }
}

fn apply_morph(buffer: &mut VertexBuffer, morph: &VertexBufferMorph, weight: f32) {
    let mask = morph.element_mask & buffer.element_mask();
    let count = buffer.vertex_count();

    for vertex in &morph.vertices {
        let index = vertex.index as usize;
        if index >= count {
            continue;
        }
        if mask.contains(VertexMask::POSITION) {
            buffer.positions[index] += vertex.position * weight;
        }
        if mask.contains(VertexMask::NORMAL) {
            buffer.normals[index] += vertex.normal * weight;
        }
        if mask.contains(VertexMask::TANGENT) {
            let tangent = &mut buffer.tangents[index];
            *tangent += (vertex.tangent * weight).extend(0.0);
        }
    }
}
