use glam::Affine3A;
use smallvec::SmallVec;

use crate::model::ModelKey;
use crate::scene::NodeHandle;
use crate::scene::transform::Transform;
use crate::utils::NameHash;

/// A minimal scene node: hierarchy, local transform and cached world matrix.
///
/// # Hierarchy
///
/// - `parent`: Optional handle to parent node (None for root nodes)
/// - `children`: List of child node handles
///
/// # Listeners
///
/// Components that need to learn when this node moves register themselves by
/// key. The node never owns them; a stale key is simply ignored on dispatch.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) name_hash: NameHash,

    // === Core Hierarchy ===
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,

    // === Core Spatial Data ===
    pub(crate) transform: Transform,
    pub(crate) world_matrix: Affine3A,

    pub(crate) listeners: SmallVec<[ModelKey; 2]>,
}

impl Node {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            name_hash: NameHash::new(name),
            parent: None,
            children: Vec::new(),
            transform: Transform::IDENTITY,
            world_matrix: Affine3A::IDENTITY,
            listeners: SmallVec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn name_hash(&self) -> NameHash {
        self.name_hash
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// World matrix as of the last dirty propagation.
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world_matrix
    }

    #[inline]
    #[must_use]
    pub fn listeners(&self) -> &[ModelKey] {
        &self.listeners
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new("")
    }
}
