use glam::Affine3A;
use slotmap::SlotMap;

use crate::model::ModelKey;
use crate::scene::node::Node;
use crate::scene::transform::Transform;
use crate::scene::{NodeGraph, NodeHandle};
use crate::utils::NameHash;

/// Reference scene graph.
///
/// Nodes live in a `SlotMap` arena; handles are generational, so a handle to a
/// removed node simply stops resolving. World matrices are recomputed eagerly
/// on every notifying write, which keeps reads (`world_transform`) free of
/// interior mutability and therefore safe to share across worker threads.
#[derive(Debug, Default)]
pub struct Scene {
    pub nodes: SlotMap<NodeHandle, Node>,
    pub root_nodes: Vec<NodeHandle>,

    pending_notifications: Vec<(NodeHandle, ModelKey)>,
    traversal_stack: Vec<(NodeHandle, Affine3A)>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root node.
    pub fn add_node(&mut self, name: &str) -> NodeHandle {
        let handle = self.nodes.insert(Node::new(name));
        self.root_nodes.push(handle);
        handle
    }

    #[inline]
    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    /// Number of notifications waiting to be drained.
    #[must_use]
    pub fn pending_notification_count(&self) -> usize {
        self.pending_notifications.len()
    }

    fn parent_world(&self, handle: NodeHandle) -> Affine3A {
        self.nodes
            .get(handle)
            .and_then(|node| node.parent)
            .and_then(|parent| self.nodes.get(parent))
            .map_or(Affine3A::IDENTITY, |parent| parent.world_matrix)
    }

    /// Iterative pre-order walk: parents are always resolved before children.
    fn update_subtree(&mut self, root: NodeHandle) {
        if !self.nodes.contains_key(root) {
            return;
        }

        let mut stack = std::mem::take(&mut self.traversal_stack);
        stack.clear();
        stack.push((root, self.parent_world(root)));

        while let Some((handle, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(handle) else {
                continue;
            };

            node.world_matrix = parent_world * node.transform.to_affine();
            for &listener in &node.listeners {
                self.pending_notifications.push((handle, listener));
            }

            let world = node.world_matrix;
            for &child in node.children.iter().rev() {
                stack.push((child, world));
            }
        }

        self.traversal_stack = stack;
    }

    fn detach_from_parent(&mut self, handle: NodeHandle) {
        let parent = self.nodes.get(handle).and_then(|n| n.parent);
        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(parent)
                && let Some(pos) = p.children.iter().position(|&x| x == handle)
            {
                p.children.remove(pos);
            }
        } else if let Some(pos) = self.root_nodes.iter().position(|&x| x == handle) {
            self.root_nodes.remove(pos);
        }
    }
}

impl NodeGraph for Scene {
    fn contains(&self, node: NodeHandle) -> bool {
        self.nodes.contains_key(node)
    }

    fn name(&self, node: NodeHandle) -> Option<&str> {
        self.nodes.get(node).map(Node::name)
    }

    fn name_hash(&self, node: NodeHandle) -> Option<NameHash> {
        self.nodes.get(node).map(|n| n.name_hash)
    }

    fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    fn world_transform(&self, node: NodeHandle) -> Option<Affine3A> {
        self.nodes.get(node).map(|n| n.world_matrix)
    }

    fn local_transform(&self, node: NodeHandle) -> Option<Transform> {
        self.nodes.get(node).map(|n| n.transform)
    }

    fn set_local_transform(&mut self, node: NodeHandle, transform: Transform) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.transform = transform;
            self.update_subtree(node);
        }
    }

    fn set_local_transform_silent(&mut self, node: NodeHandle, transform: Transform) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.transform = transform;
        }
    }

    fn mark_dirty(&mut self, node: NodeHandle) {
        self.update_subtree(node);
    }

    fn create_child(&mut self, parent: NodeHandle, name: &str) -> NodeHandle {
        let mut child = Node::new(name);
        if self.nodes.contains_key(parent) {
            child.parent = Some(parent);
            child.world_matrix = self.nodes[parent].world_matrix;
            let handle = self.nodes.insert(child);
            self.nodes[parent].children.push(handle);
            handle
        } else {
            log::warn!("create_child: parent node not found, creating '{name}' as a root node");
            let handle = self.nodes.insert(child);
            self.root_nodes.push(handle);
            handle
        }
    }

    fn add_child(&mut self, parent: NodeHandle, child: NodeHandle) {
        if parent == child {
            log::warn!("Cannot attach node to itself!");
            return;
        }
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            return;
        }

        // Refuse to create a cycle
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                log::warn!("Cannot attach node to its own descendant!");
                return;
            }
            cursor = self.nodes.get(current).and_then(|n| n.parent);
        }

        self.detach_from_parent(child);
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        self.update_subtree(child);
    }

    fn remove_node(&mut self, node: NodeHandle) {
        if !self.nodes.contains_key(node) {
            return;
        }
        self.detach_from_parent(node);

        let mut stack = vec![node];
        while let Some(handle) = stack.pop() {
            if let Some(removed) = self.nodes.remove(handle) {
                stack.extend(removed.children);
            }
        }
    }

    fn find_child(
        &self,
        parent: NodeHandle,
        name: NameHash,
        recursive: bool,
    ) -> Option<NodeHandle> {
        let node = self.nodes.get(parent)?;
        if !recursive {
            return node
                .children
                .iter()
                .copied()
                .find(|&c| self.nodes.get(c).is_some_and(|n| n.name_hash == name));
        }

        let mut stack: Vec<NodeHandle> = node.children.iter().rev().copied().collect();
        while let Some(handle) = stack.pop() {
            let Some(current) = self.nodes.get(handle) else {
                continue;
            };
            if current.name_hash == name {
                return Some(handle);
            }
            stack.extend(current.children.iter().rev().copied());
        }
        None
    }

    fn add_listener(&mut self, node: NodeHandle, listener: ModelKey) {
        if let Some(n) = self.nodes.get_mut(node)
            && !n.listeners.contains(&listener)
        {
            n.listeners.push(listener);
        }
    }

    fn remove_listener(&mut self, node: NodeHandle, listener: ModelKey) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.listeners.retain(|l| *l != listener);
        }
    }

    fn take_dirty_notifications(&mut self) -> Vec<(NodeHandle, ModelKey)> {
        std::mem::take(&mut self.pending_notifications)
    }
}
