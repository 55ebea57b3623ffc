//! Scene graph collaborator
//!
//! The animation core never owns transform nodes. It talks to the scene
//! through the [`NodeGraph`] trait:
//! - Node: hierarchy + local transform + cached world matrix
//! - Transform: local TRS value
//! - Scene: reference arena implementation of [`NodeGraph`]
//! - Camera / View: distance and LOD scoring
//! - Skeleton / Bone: flattened bone hierarchy bound to scene nodes

pub mod camera;
pub mod node;
pub mod scene;
pub mod skeleton;
pub mod transform;

pub use camera::{Camera, View};
pub use node::Node;
pub use scene::Scene;
pub use skeleton::{Bone, BoneCollision, Skeleton};
pub use transform::Transform;

use glam::Affine3A;
use slotmap::new_key_type;

use crate::model::ModelKey;
use crate::utils::NameHash;

new_key_type! {
    /// Weak handle to a scene node. Holding one does not keep the node alive.
    pub struct NodeHandle;
}

/// Transform-node contract consumed by skeletons and animated models.
///
/// World matrices are kept current by the graph: a *notifying* write
/// ([`set_local_transform`](Self::set_local_transform),
/// [`mark_dirty`](Self::mark_dirty)) recomputes the subtree and queues a
/// notification for every listener registered on an affected node. A
/// *silent* write only stores the local transform; the world matrices of the
/// node and its descendants stay stale until an ancestor is marked dirty.
pub trait NodeGraph {
    fn contains(&self, node: NodeHandle) -> bool;

    fn name(&self, node: NodeHandle) -> Option<&str>;

    fn name_hash(&self, node: NodeHandle) -> Option<NameHash>;

    fn parent(&self, node: NodeHandle) -> Option<NodeHandle>;

    fn world_transform(&self, node: NodeHandle) -> Option<Affine3A>;

    fn local_transform(&self, node: NodeHandle) -> Option<Transform>;

    /// Sets the local transform and propagates it (with notifications).
    fn set_local_transform(&mut self, node: NodeHandle, transform: Transform);

    /// Sets the local transform without propagation or notification.
    fn set_local_transform_silent(&mut self, node: NodeHandle, transform: Transform);

    /// Recomputes world matrices of `node` and its subtree and notifies
    /// every listener found along the way.
    fn mark_dirty(&mut self, node: NodeHandle);

    fn create_child(&mut self, parent: NodeHandle, name: &str) -> NodeHandle;

    /// Re-parents `child` under `parent`, keeping its local transform.
    fn add_child(&mut self, parent: NodeHandle, child: NodeHandle);

    /// Removes `node` and its whole subtree.
    fn remove_node(&mut self, node: NodeHandle);

    /// Finds a child of `parent` by name hash, optionally searching the
    /// whole subtree (depth-first, pre-order).
    fn find_child(&self, parent: NodeHandle, name: NameHash, recursive: bool) -> Option<NodeHandle>;

    fn add_listener(&mut self, node: NodeHandle, listener: ModelKey);

    fn remove_listener(&mut self, node: NodeHandle, listener: ModelKey);

    /// Drains the `(node, listener)` notifications queued since the last call.
    fn take_dirty_notifications(&mut self) -> Vec<(NodeHandle, ModelKey)>;
}
