use bitflags::bitflags;
use glam::{Affine3A, Quat, Vec3};

use crate::errors::{ArmatureError, Result};
use crate::resources::BoundingBox;
use crate::scene::transform::Transform;
use crate::scene::{NodeGraph, NodeHandle};
use crate::utils::NameHash;

bitflags! {
    /// Which collision volumes of a bone are meaningful.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct BoneCollision: u8 {
        const SPHERE = 1 << 0;
        const BOX    = 1 << 1;
    }
}

/// One joint of a skeleton.
///
/// `node` is a weak back-reference into the scene graph: the skeleton never
/// creates or destroys the node it points to, and the handle may go stale.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub name_hash: NameHash,
    /// Equal to the bone's own index for the root bone.
    pub parent_index: usize,

    // === Bind Pose (local space) ===
    pub initial_position: Vec3,
    pub initial_rotation: Quat,
    pub initial_scale: Vec3,
    /// Inverse bind pose: model space to bone space.
    pub offset_matrix: Affine3A,

    /// Whether animation tracks may drive this bone.
    pub animated: bool,

    // === Collision ===
    pub collision_mask: BoneCollision,
    pub radius: f32,
    /// Bone-local box.
    pub bounding_box: BoundingBox,

    pub node: Option<NodeHandle>,
}

impl Bone {
    #[must_use]
    pub fn new(name: &str, parent_index: usize) -> Self {
        Self {
            name: name.to_string(),
            name_hash: NameHash::new(name),
            parent_index,
            initial_position: Vec3::ZERO,
            initial_rotation: Quat::IDENTITY,
            initial_scale: Vec3::ONE,
            offset_matrix: Affine3A::IDENTITY,
            animated: true,
            collision_mask: BoneCollision::empty(),
            radius: 0.0,
            bounding_box: BoundingBox::UNDEFINED,
            node: None,
        }
    }

    #[must_use]
    pub fn with_initial_transform(mut self, transform: Transform) -> Self {
        self.initial_position = transform.position;
        self.initial_rotation = transform.rotation;
        self.initial_scale = transform.scale;
        self
    }

    #[must_use]
    pub fn with_offset_matrix(mut self, offset_matrix: Affine3A) -> Self {
        self.offset_matrix = offset_matrix;
        self
    }

    #[must_use]
    pub fn with_sphere(mut self, radius: f32) -> Self {
        self.collision_mask |= BoneCollision::SPHERE;
        self.radius = radius;
        self
    }

    #[must_use]
    pub fn with_box(mut self, bounding_box: BoundingBox) -> Self {
        self.collision_mask |= BoneCollision::BOX;
        self.bounding_box = bounding_box;
        self
    }

    #[inline]
    #[must_use]
    pub fn initial_transform(&self) -> Transform {
        Transform::new(self.initial_position, self.initial_rotation, self.initial_scale)
    }
}

/// Flattened bone hierarchy: parents are referenced by index, never by pointer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    bones: Vec<Bone>,
    root_bone_index: Option<usize>,
}

impl Skeleton {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a skeleton, rejecting out-of-range parents and parent cycles.
    pub fn from_bones(bones: Vec<Bone>) -> Result<Self> {
        let count = bones.len();
        for (index, bone) in bones.iter().enumerate() {
            if bone.parent_index >= count {
                return Err(ArmatureError::InvalidBoneParent {
                    bone: index,
                    parent: bone.parent_index,
                });
            }
        }

        // Every chain of parents must reach a self-parented root within `count` steps
        for start in 0..count {
            let mut current = start;
            let mut steps = 0;
            while bones[current].parent_index != current {
                current = bones[current].parent_index;
                steps += 1;
                if steps > count {
                    return Err(ArmatureError::BoneHierarchyCycle { bone: start });
                }
            }
        }

        let root_bone_index = bones
            .iter()
            .enumerate()
            .position(|(index, bone)| bone.parent_index == index);

        Ok(Self {
            bones,
            root_bone_index,
        })
    }

    /// Copies bones and topology from `other`. Node bindings are not copied.
    pub fn define(&mut self, other: &Skeleton) {
        self.bones.clone_from(&other.bones);
        for bone in &mut self.bones {
            bone.node = None;
        }
        self.root_bone_index = other.root_bone_index;
    }

    pub fn clear(&mut self) {
        self.bones.clear();
        self.root_bone_index = None;
    }

    /// Same bone count, and every bone has the same name and parent index.
    #[must_use]
    pub fn is_structurally_compatible(&self, other: &Skeleton) -> bool {
        self.bones.len() == other.bones.len()
            && self
                .bones
                .iter()
                .zip(&other.bones)
                .all(|(a, b)| a.name == b.name && a.parent_index == b.parent_index)
    }

    /// Patches bone values from a compatible skeleton in place, keeping the
    /// current node bindings and `animated` flags.
    ///
    /// Returns `false` (leaving `self` untouched) unless the skeletons are
    /// structurally compatible and every bone is bound to a node.
    pub fn patch_compatible(&mut self, other: &Skeleton) -> bool {
        if !self.is_structurally_compatible(other) || self.bones.iter().any(|b| b.node.is_none()) {
            return false;
        }

        for (dest, src) in self.bones.iter_mut().zip(&other.bones) {
            let node = dest.node;
            let animated = dest.animated;
            dest.clone_from(src);
            dest.node = node;
            dest.animated = animated;
        }
        self.root_bone_index = other.root_bone_index;
        true
    }

    /// Restores bind pose on the nodes of animated bones, with notification.
    pub fn reset<G: NodeGraph + ?Sized>(&self, graph: &mut G) {
        for bone in self.bones.iter().filter(|b| b.animated) {
            if let Some(node) = bone.node {
                graph.set_local_transform(node, bone.initial_transform());
            }
        }
    }

    /// Restores bind pose on the nodes of animated bones without notifying
    /// the scene graph. The caller marks the hierarchy dirty once afterwards.
    pub fn reset_silent<G: NodeGraph + ?Sized>(&self, graph: &mut G) {
        for bone in self.bones.iter().filter(|b| b.animated) {
            if let Some(node) = bone.node {
                graph.set_local_transform_silent(node, bone.initial_transform());
            }
        }
    }

    /// Drops every node binding.
    pub fn reset_nodes(&mut self) {
        for bone in &mut self.bones {
            bone.node = None;
        }
    }

    // === Queries ===

    #[inline]
    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[inline]
    pub fn bones_mut(&mut self) -> &mut [Bone] {
        &mut self.bones
    }

    #[inline]
    #[must_use]
    pub fn num_bones(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn root_bone_index(&self) -> Option<usize> {
        self.root_bone_index
    }

    #[must_use]
    pub fn root_bone(&self) -> Option<&Bone> {
        self.root_bone_index.and_then(|i| self.bones.get(i))
    }

    #[must_use]
    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn bone_mut(&mut self, index: usize) -> Option<&mut Bone> {
        self.bones.get_mut(index)
    }

    /// Missing bones are not an error: the skeleton simply lacks that joint.
    #[must_use]
    pub fn bone_by_name(&self, name: &str) -> Option<&Bone> {
        self.bone_by_hash(NameHash::new(name))
    }

    #[must_use]
    pub fn bone_by_hash(&self, hash: NameHash) -> Option<&Bone> {
        self.bones.iter().find(|b| b.name_hash == hash)
    }

    pub fn bone_by_hash_mut(&mut self, hash: NameHash) -> Option<&mut Bone> {
        self.bones.iter_mut().find(|b| b.name_hash == hash)
    }

    #[must_use]
    pub fn bone_index(&self, hash: NameHash) -> Option<usize> {
        self.bones.iter().position(|b| b.name_hash == hash)
    }

    /// True if `bone` is `ancestor` or lies in its subtree.
    #[must_use]
    pub fn is_in_subtree(&self, bone: usize, ancestor: usize) -> bool {
        let mut current = bone;
        for _ in 0..=self.bones.len() {
            if current == ancestor {
                return true;
            }
            let Some(b) = self.bones.get(current) else {
                return false;
            };
            if b.parent_index == current {
                return false;
            }
            current = b.parent_index;
        }
        false
    }
}
