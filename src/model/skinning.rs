//! Skin matrix storage
//!
//! A model whose skeleton exceeds the per-batch bone limit ships a bone
//! mapping per geometry: the subset of global bone indices that geometry
//! uses, in the order its vertices reference them. Each such geometry gets a
//! compact matrix array of its own.
//!
//! Rather than resolving the mapping every frame, [`SkinMatrices`] keeps a
//! reverse table: for every global bone, the `(geometry, slot)` pairs that
//! mirror it. Computing a bone's matrix then copies it straight into those
//! slots. The table is only valid for the mappings it was built from, so any
//! change to the bone count or to the mappings goes through
//! [`SkinMatrices::rebuild`], which discards and rebuilds everything.

use glam::Affine3A;
use smallvec::SmallVec;

use crate::scene::NodeGraph;
use crate::scene::skeleton::Bone;

/// Global skin matrices plus optional per-geometry copies.
#[derive(Debug, Clone, Default)]
pub struct SkinMatrices {
    global: Vec<Affine3A>,
    geometry: Vec<Vec<Affine3A>>,
    /// `remap[bone]` lists `(geometry, slot)` destinations of that bone.
    remap: Vec<SmallVec<[(u32, u32); 2]>>,
}

impl SkinMatrices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resizes the global array to `num_bones` and rebuilds the
    /// per-geometry arrays and reverse table from `mappings`.
    ///
    /// Mapped skinning is left disabled when every mapping is empty, and
    /// when `software_skinning` is set (CPU skinning always reads the global
    /// array). Mapping entries naming a bone outside the skeleton are dropped
    /// with a warning; their slot stays at identity.
    pub fn rebuild(&mut self, num_bones: usize, mappings: &[Vec<usize>], software_skinning: bool) {
        self.global.clear();
        self.global.resize(num_bones, Affine3A::IDENTITY);
        self.geometry.clear();
        self.remap.clear();

        if mappings.iter().all(Vec::is_empty) {
            return;
        }

        if software_skinning {
            log::warn!("Geometry bone mappings are ignored in software skinning");
            return;
        }

        self.geometry = mappings
            .iter()
            .map(|mapping| vec![Affine3A::IDENTITY; mapping.len()])
            .collect();
        self.remap = vec![SmallVec::new(); num_bones];

        for (geometry_index, mapping) in mappings.iter().enumerate() {
            for (slot, &bone_index) in mapping.iter().enumerate() {
                match self.remap.get_mut(bone_index) {
                    Some(destinations) => destinations.push((geometry_index as u32, slot as u32)),
                    None => log::warn!(
                        "Geometry {geometry_index} slot {slot}: bone {bone_index} out of range \
                         ({num_bones} bones), entry ignored"
                    ),
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.global.clear();
        self.geometry.clear();
        self.remap.clear();
    }

    /// Recomputes every skin matrix from the bones' node world transforms.
    ///
    /// A bone without a resolvable node falls back to `model_world`, which
    /// keeps a partially rigged mesh attached to its model.
    pub fn update<G: NodeGraph + ?Sized>(
        &mut self,
        bones: &[Bone],
        model_world: Affine3A,
        graph: &G,
    ) {
        let count = bones.len().min(self.global.len());

        for (index, bone) in bones.iter().enumerate().take(count) {
            let matrix = match bone.node.and_then(|node| graph.world_transform(node)) {
                Some(bone_world) => bone_world * bone.offset_matrix,
                None => model_world,
            };
            self.global[index] = matrix;

            if let Some(destinations) = self.remap.get(index) {
                for &(geometry, slot) in destinations {
                    self.geometry[geometry as usize][slot as usize] = matrix;
                }
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn global(&self) -> &[Affine3A] {
        &self.global
    }

    /// True if per-geometry arrays are in use.
    #[inline]
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        !self.geometry.is_empty()
    }

    #[must_use]
    pub fn geometry(&self, index: usize) -> Option<&[Affine3A]> {
        self.geometry.get(index).map(Vec::as_slice)
    }

    /// Matrices a draw of geometry `index` should bind: its own compact
    /// array if it has a non-empty mapping, otherwise the global array.
    #[must_use]
    pub fn for_geometry(&self, index: usize) -> &[Affine3A] {
        match self.geometry.get(index) {
            Some(matrices) if !matrices.is_empty() => matrices,
            _ => &self.global,
        }
    }

    /// Number of per-geometry destinations of a global bone.
    #[must_use]
    pub fn destinations(&self, bone_index: usize) -> usize {
        self.remap.get(bone_index).map_or(0, SmallVec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_mappings_use_global_array() {
        let mut skin = SkinMatrices::new();
        skin.rebuild(3, &[Vec::new(), Vec::new()], false);
        assert!(!skin.is_mapped());
        assert_eq!(skin.for_geometry(1).len(), 3);
    }

    #[test]
    fn test_reverse_table_lists_every_destination() {
        let mut skin = SkinMatrices::new();
        skin.rebuild(4, &[vec![3, 1], vec![1]], false);
        assert!(skin.is_mapped());
        assert_eq!(skin.destinations(1), 2);
        assert_eq!(skin.destinations(3), 1);
        assert_eq!(skin.destinations(0), 0);
        assert_eq!(skin.geometry(0).map(<[Affine3A]>::len), Some(2));
    }

    #[test]
    fn test_software_skinning_disables_mappings() {
        let mut skin = SkinMatrices::new();
        skin.rebuild(4, &[vec![3, 1]], true);
        assert!(!skin.is_mapped());
        assert_eq!(skin.global().len(), 4);
    }

    #[test]
    fn test_out_of_range_entry_is_dropped() {
        let mut skin = SkinMatrices::new();
        skin.rebuild(2, &[vec![0, 9]], false);
        assert_eq!(skin.destinations(0), 1);
        // The slot still exists and stays at identity
        assert_eq!(skin.geometry(0), Some(&[Affine3A::IDENTITY, Affine3A::IDENTITY][..]));
    }
}
