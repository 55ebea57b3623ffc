//! Animated model registry
//!
//! [`AnimatedModels`] owns every [`AnimatedModel`] and groups them by the
//! scene node they are attached to. The first instance attached to a node
//! is its **master**: it creates the bone nodes, resets and animates them,
//! and owns the bone bounding box. Later instances on the same node are
//! non-master: they bind to the master's bone nodes by name, mirror its
//! world bounding box and only compute their own skin matrices and morphs.
//!
//! # Ownership of bone nodes
//!
//! Bone nodes belong to the scene graph. The bone hierarchy is removed when
//! a master replaces it with an incompatible skeleton, or when the last
//! instance on the node clears its model or detaches. As long as a sibling
//! remains, clearing or detaching leaves the hierarchy in place; if the
//! master was the one leaving, the next sibling is promoted.
//!
//! ```rust,ignore
//! let mut models = AnimatedModels::new();
//! let body = models.create(SkinningSettings::default());
//! models.attach(body, character_node, &mut scene)?;
//! models.set_model(body, Some(body_model), true, &mut scene)?;
//!
//! let armor = models.create(SkinningSettings::default());
//! models.attach(armor, character_node, &mut scene)?;
//! models.set_model(armor, Some(armor_model), true, &mut scene)?;
//! ```

use std::sync::Arc;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::animation::source::SharedStateSource;
use crate::errors::{ArmatureError, Result};
use crate::model::ModelKey;
use crate::model::animated_model::AnimatedModel;
use crate::model::frame::FrameInfo;
use crate::resources::bounding::BoundingBox;
use crate::resources::model::Model;
use crate::scene::camera::View;
use crate::scene::skeleton::Skeleton;
use crate::scene::{NodeGraph, NodeHandle};
use crate::settings::SkinningSettings;
use crate::utils::{NameHash, ScratchPool};

#[derive(Debug, Default)]
pub struct AnimatedModels {
    pub(crate) models: SlotMap<ModelKey, AnimatedModel>,
    /// Instances per node, in attach order. The first one is the master.
    pub(crate) by_node: FxHashMap<NodeHandle, SmallVec<[ModelKey; 2]>>,
    pub(crate) scratch: ScratchPool<ModelKey>,
}

impl AnimatedModels {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: ModelKey) -> Option<&AnimatedModel> {
        self.models.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: ModelKey) -> Option<&mut AnimatedModel> {
        self.models.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelKey, &AnimatedModel)> {
        self.models.iter()
    }

    /// Instances attached to `node`, master first.
    #[must_use]
    pub fn models_on_node(&self, node: NodeHandle) -> &[ModelKey] {
        self.by_node.get(&node).map(|keys| keys.as_slice()).unwrap_or(&[])
    }

    #[must_use]
    pub fn master_of(&self, node: NodeHandle) -> Option<ModelKey> {
        self.models_on_node(node).first().copied()
    }

    fn instance_mut(&mut self, key: ModelKey) -> Result<&mut AnimatedModel> {
        self.models.get_mut(key).ok_or(ArmatureError::UnknownModel(key))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn create(&mut self, settings: SkinningSettings) -> ModelKey {
        self.models.insert(AnimatedModel::new(settings))
    }

    /// Detaches (if attached) and drops an instance.
    pub fn remove<G: NodeGraph>(&mut self, key: ModelKey, graph: &mut G) -> Option<AnimatedModel> {
        if self.models.get(key).is_some_and(|m| m.node.is_some())
            && let Err(err) = self.detach(key, graph)
        {
            log::warn!("Detaching animated model before removal failed: {err}");
        }
        self.models.remove(key)
    }

    /// Attaches an instance to a scene node. The first instance on a node
    /// becomes its master.
    pub fn attach<G: NodeGraph>(
        &mut self,
        key: ModelKey,
        node: NodeHandle,
        graph: &mut G,
    ) -> Result<()> {
        let current = self.instance_mut(key)?.node;
        if current == Some(node) {
            return Ok(());
        }
        if current.is_some() {
            self.detach(key, graph)?;
        }
        if !graph.contains(node) {
            log::error!("Can not attach animated model to a node that is not in the scene");
            return Err(ArmatureError::NotAttached);
        }

        let siblings = self.by_node.entry(node).or_default();
        let is_master = siblings.is_empty();
        siblings.push(key);

        let instance = self.instance_mut(key)?;
        instance.node = Some(node);
        instance.is_master = is_master;
        graph.add_listener(node, key);
        Ok(())
    }

    /// Detaches an instance from its node.
    ///
    /// The last instance to leave a node removes the bone hierarchy; if a
    /// master leaves while siblings remain, the next sibling is promoted.
    pub fn detach<G: NodeGraph>(&mut self, key: ModelKey, graph: &mut G) -> Result<()> {
        let instance = self.instance_mut(key)?;
        let Some(node) = instance.node.take() else {
            return Err(ArmatureError::NotAttached);
        };
        let was_master = instance.is_master;
        instance.is_master = true;

        graph.remove_listener(node, key);
        for bone in instance.skeleton.bones() {
            if let Some(bone_node) = bone.node {
                graph.remove_listener(bone_node, key);
            }
        }
        let root_node = instance.skeleton.root_bone().and_then(|b| b.node);
        instance.skeleton.reset_nodes();

        let mut promoted = None;
        let now_empty = match self.by_node.get_mut(&node) {
            Some(siblings) => {
                siblings.retain(|k| *k != key);
                if was_master {
                    promoted = siblings.first().copied();
                }
                siblings.is_empty()
            }
            None => true,
        };

        if now_empty {
            self.by_node.remove(&node);
            if let Some(root_node) = root_node {
                graph.remove_node(root_node);
            }
        } else if !was_master {
            // The departed attachment no longer widens the master's volumes
            if let Some(master) = self.master_of(node) {
                self.finalize_bone_bounding_boxes(master);
            }
        } else if let Some(next) = promoted
            && let Some(next) = self.models.get_mut(next)
        {
            next.is_master = true;
            next.mark_animation_dirty();
        }
        Ok(())
    }

    // ========================================================================
    // Model & Skeleton
    // ========================================================================

    /// Sets (or clears, with `None`) the model asset of an instance.
    ///
    /// With `create_bones` the master creates a scene node per bone under
    /// its own node and non-master instances bind to them by name. Without
    /// it, bone nodes are expected to exist already and are bound later by
    /// [`apply_attributes`](Self::apply_attributes).
    pub fn set_model<G: NodeGraph>(
        &mut self,
        key: ModelKey,
        model: Option<Arc<Model>>,
        create_bones: bool,
        graph: &mut G,
    ) -> Result<()> {
        let instance = self.instance_mut(key)?;
        let unchanged = match (instance.model(), &model) {
            (Some(current), Some(new)) => Arc::ptr_eq(current, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return Ok(());
        }
        if instance.node.is_none() {
            log::error!("Can not set model while model component is not attached to a scene node");
            return Err(ArmatureError::NotAttached);
        }

        match model {
            Some(model) => {
                instance.load_model_data(&model);
                self.set_skeleton(key, &model.skeleton, create_bones, graph)?;
                self.instance_mut(key)?.finish_model_setup();
            }
            None => {
                self.release_bone_nodes(key, graph);
                self.instance_mut(key)?.clear_model();
                self.set_skeleton(key, &Skeleton::new(), false, graph)?;
            }
        }
        Ok(())
    }

    /// Re-applies the current model, as after the asset was reloaded.
    ///
    /// A skeleton that stayed structurally compatible is patched in place,
    /// keeping bone nodes and `animated` flags.
    pub fn reload_model<G: NodeGraph>(&mut self, key: ModelKey, graph: &mut G) -> Result<()> {
        let instance = self.instance_mut(key)?;
        let Some(model) = instance.model().cloned() else {
            return Ok(());
        };
        // Force set_model past its unchanged-model check
        instance.clear_model();
        self.set_model(key, Some(model), true, graph)
    }

    /// Replaces the skeleton of an instance.
    pub fn set_skeleton<G: NodeGraph>(
        &mut self,
        key: ModelKey,
        skeleton: &Skeleton,
        create_bones: bool,
        graph: &mut G,
    ) -> Result<()> {
        let instance = self.instance_mut(key)?;
        let Some(node) = instance.node else {
            if create_bones {
                log::error!("Animated model not attached to a scene node, no bone nodes created");
                return Err(ArmatureError::NotAttached);
            }
            instance.skeleton.define(skeleton);
            instance.set_geometry_bone_mappings();
            instance.set_assign_bones_pending(true);
            return Ok(());
        };

        if instance.is_master {
            // A reloaded model with the same bone structure keeps its bones
            if instance.skeleton.patch_compatible(skeleton) {
                log::debug!("Skeleton with {} bones patched in place", skeleton.num_bones());
                instance.set_geometry_bone_mappings();
                return Ok(());
            }

            instance.mark_source_tracks_dirty();

            if create_bones {
                self.remove_root_bone(key, graph);
            }

            self.instance_mut(key)?.skeleton.define(skeleton);
            self.finalize_bone_bounding_boxes(key);

            if create_bones {
                let instance = self.instance_mut(key)?;
                for bone in instance.skeleton.bones_mut() {
                    let bone_node = graph.create_child(node, &bone.name);
                    graph.add_listener(bone_node, key);
                    graph.set_local_transform(bone_node, bone.initial_transform());
                    bone.node = Some(bone_node);
                }

                let bones = instance.skeleton.bones();
                for (index, bone) in bones.iter().enumerate() {
                    if bone.parent_index == index {
                        continue;
                    }
                    let parent = bones.get(bone.parent_index).and_then(|p| p.node);
                    if let (Some(parent), Some(child)) = (parent, bone.node) {
                        graph.add_child(parent, child);
                    }
                }
                log::debug!("Created bone hierarchy with {} bones", bones.len());
            }
        } else {
            // Non-master instances reuse the master's bone nodes
            instance.skeleton.define(skeleton);

            if let Some(master) = self.master_of(node)
                && master != key
            {
                self.finalize_bone_bounding_boxes(master);
            }

            if create_bones {
                let instance = self.instance_mut(key)?;
                for bone in instance.skeleton.bones_mut() {
                    let bone_node = graph.find_child(node, bone.name_hash, true);
                    if let Some(bone_node) = bone_node {
                        graph.add_listener(bone_node, key);
                    }
                    bone.node = bone_node;
                }
            }
        }

        // Skin storage always follows the bone count
        let instance = self.instance_mut(key)?;
        instance.set_geometry_bone_mappings();
        instance.set_assign_bones_pending(!create_bones);
        Ok(())
    }

    /// Completes deferred setup: binds bone nodes if the model was set
    /// without creating them.
    pub fn apply_attributes<G: NodeGraph>(&mut self, key: ModelKey, graph: &mut G) -> Result<()> {
        if self.instance_mut(key)?.is_assign_bones_pending() {
            self.assign_bone_nodes(key, graph)?;
        }
        Ok(())
    }

    /// Binds every bone to the descendant node of the same name.
    ///
    /// If no bone node is found at all and a model is set, the bone
    /// hierarchy is created from the model's skeleton instead.
    pub fn assign_bone_nodes<G: NodeGraph>(&mut self, key: ModelKey, graph: &mut G) -> Result<()> {
        let instance = self.instance_mut(key)?;
        instance.set_assign_bones_pending(false);

        let Some(node) = instance.node else {
            log::error!("Can not assign bone nodes to an animated model without a node");
            return Err(ArmatureError::NotAttached);
        };

        let mut bone_found = false;
        for bone in instance.skeleton.bones_mut() {
            let bone_node = graph.find_child(node, bone.name_hash, true);
            if let Some(bone_node) = bone_node {
                bone_found = true;
                graph.add_listener(bone_node, key);
            }
            bone.node = bone_node;
        }

        if !bone_found && let Some(model) = instance.model().cloned() {
            self.set_skeleton(key, &model.skeleton, true, graph)?;
        }

        self.instance_mut(key)?.mark_source_tracks_dirty();
        Ok(())
    }

    /// Rebuilds the master's bone collision volumes, merging those of every
    /// sibling so the shared bounding box covers all attachments.
    pub fn finalize_bone_bounding_boxes(&mut self, key: ModelKey) {
        let Some(node) = self.models.get(key).and_then(|m| m.node) else {
            return;
        };
        let sources: Vec<Skeleton> = self
            .models_on_node(node)
            .iter()
            .filter(|&&k| k != key)
            .filter_map(|&k| self.models.get(k))
            .map(|m| m.skeleton.clone())
            .collect();

        if let Some(instance) = self.models.get_mut(key) {
            instance.merge_bone_bounding_boxes(&sources);
        }
    }

    /// Lets go of the bone hierarchy when the model is cleared.
    ///
    /// The hierarchy is removed only if no sibling is left to use it.
    /// Otherwise this instance just unbinds, and a master hands the bones
    /// over to the next sibling.
    fn release_bone_nodes<G: NodeGraph>(&mut self, key: ModelKey, graph: &mut G) {
        let Some(node) = self.models.get(key).and_then(|m| m.node) else {
            return;
        };
        if self.models_on_node(node).len() <= 1 {
            self.remove_root_bone(key, graph);
            return;
        }

        let Some(instance) = self.models.get_mut(key) else {
            return;
        };
        for bone in instance.skeleton.bones() {
            if let Some(bone_node) = bone.node {
                graph.remove_listener(bone_node, key);
            }
        }
        instance.skeleton.reset_nodes();
        if !instance.is_master {
            return;
        }
        instance.is_master = false;

        let next = self.by_node.get_mut(&node).and_then(|siblings| {
            siblings.retain(|k| *k != key);
            siblings.push(key);
            siblings.first().copied()
        });
        if let Some(next) = next
            && let Some(next) = self.models.get_mut(next)
        {
            next.is_master = true;
            next.mark_animation_dirty();
        }
    }

    fn remove_root_bone<G: NodeGraph>(&mut self, key: ModelKey, graph: &mut G) {
        let root_node = self
            .models
            .get(key)
            .and_then(|m| m.skeleton.root_bone())
            .and_then(|b| b.node);
        if let Some(root_node) = root_node {
            graph.remove_node(root_node);
        }
    }

    // ========================================================================
    // Animation
    // ========================================================================

    /// Connects the source whose states drive this instance. Only a weak
    /// reference is kept.
    pub fn connect_state_source(
        &mut self,
        key: ModelKey,
        source: &SharedStateSource,
    ) -> Result<()> {
        let instance = self.instance_mut(key)?;
        instance.set_state_source(Some(Arc::downgrade(source)));
        instance.mark_animation_dirty();
        Ok(())
    }

    pub fn disconnect_state_source(&mut self, key: ModelKey) -> Result<()> {
        let instance = self.instance_mut(key)?;
        instance.set_state_source(None);
        instance.mark_animation_dirty();
        Ok(())
    }

    /// Requests re-evaluation of the animation. Ignored for non-master
    /// instances.
    pub fn mark_animation_dirty(&mut self, key: ModelKey) -> Result<()> {
        self.instance_mut(key)?.mark_animation_dirty();
        Ok(())
    }

    /// Resets the skeleton to bind pose, applies every animation state and
    /// refreshes the bone bounding box. Only a master does any of this;
    /// for every instance the animation is no longer dirty afterwards.
    ///
    /// The bone writes are silent; the node hierarchy is marked dirty once
    /// and the resulting notifications are dispatched before the bounding
    /// box is recomputed.
    pub fn apply_animation<G: NodeGraph>(&mut self, key: ModelKey, graph: &mut G) {
        let Some(instance) = self.models.get_mut(key) else {
            return;
        };

        if instance.is_master
            && let Some(node) = instance.node
        {
            instance.skeleton.reset_silent(graph);
            if let Some(source) = instance.state_source() {
                source.lock().apply_model_tracks(&instance.skeleton, graph);
            }
            graph.mark_dirty(node);
            self.dispatch_notifications(graph);

            if let Some(instance) = self.models.get_mut(key) {
                instance.update_bone_bounding_box(&*graph);
            }
        }

        if let Some(instance) = self.models.get_mut(key) {
            instance.finish_animation();
        }
    }

    /// Routes queued scene notifications to their instances. Returns the
    /// number of notifications delivered.
    pub fn dispatch_notifications<G: NodeGraph + ?Sized>(&mut self, graph: &mut G) -> usize {
        let notifications = graph.take_dirty_notifications();
        let mut delivered = 0;
        for (node, key) in notifications {
            if let Some(instance) = self.models.get_mut(key) {
                instance.on_marked_dirty(node);
                delivered += 1;
            }
        }
        delivered
    }

    // ========================================================================
    // Morphs
    // ========================================================================

    /// Sets a morph weight. A master forwards the change, by morph name, to
    /// every non-master sibling; a non-master only changes itself.
    pub fn set_morph_weight(&mut self, key: ModelKey, index: usize, weight: f32) -> Result<()> {
        let instance = self.instance_mut(key)?;
        if index >= instance.num_morphs() {
            return Err(ArmatureError::IndexOutOfBounds {
                context: "morph weight".to_string(),
                index,
            });
        }
        if !instance.set_morph_weight_local(index, weight) {
            return Ok(());
        }

        let Some(node) = instance.node.filter(|_| instance.is_master) else {
            return Ok(());
        };
        let hash = instance.morphs()[index].name_hash;

        if let Some(siblings) = self.by_node.get(&node) {
            for &sibling in siblings {
                if sibling == key {
                    continue;
                }
                if let Some(other) = self.models.get_mut(sibling)
                    && !other.is_master
                    && let Some(other_index) = other.morph_index(hash)
                {
                    other.set_morph_weight_local(other_index, weight);
                }
            }
        }
        Ok(())
    }

    /// Sets a morph weight by name. Unknown names are ignored.
    pub fn set_morph_weight_by_name(
        &mut self,
        key: ModelKey,
        name: &str,
        weight: f32,
    ) -> Result<()> {
        self.set_morph_weight_by_hash(key, NameHash::new(name), weight)
    }

    pub fn set_morph_weight_by_hash(
        &mut self,
        key: ModelKey,
        hash: NameHash,
        weight: f32,
    ) -> Result<()> {
        match self.instance_mut(key)?.morph_index(hash) {
            Some(index) => self.set_morph_weight(key, index, weight),
            None => Ok(()),
        }
    }

    /// Zeroes every morph weight, on non-master siblings too when called on
    /// a master.
    pub fn reset_morph_weights(&mut self, key: ModelKey) -> Result<()> {
        let instance = self.instance_mut(key)?;
        instance.reset_morph_weights_local();

        let Some(node) = instance.node.filter(|_| instance.is_master) else {
            return Ok(());
        };
        if let Some(siblings) = self.by_node.get(&node) {
            for &sibling in siblings {
                if sibling == key {
                    continue;
                }
                if let Some(other) = self.models.get_mut(sibling)
                    && !other.is_master
                {
                    other.reset_morph_weights_local();
                }
            }
        }
        Ok(())
    }

    /// Applies byte-quantised morph weights (`byte / 255`), in morph order.
    pub fn set_morphs_attr(&mut self, key: ModelKey, weights: &[u8]) -> Result<()> {
        let count = self.instance_mut(key)?.num_morphs();
        for (index, &weight) in weights.iter().enumerate().take(count) {
            self.set_morph_weight(key, index, f32::from(weight) / 255.0)?;
        }
        Ok(())
    }

    // ========================================================================
    // Views & Bounds
    // ========================================================================

    /// Records that `key` was rendered in `frame_number`.
    pub fn mark_in_view(&mut self, key: ModelKey, frame_number: u32) -> Result<()> {
        self.instance_mut(key)?.mark_in_view(frame_number);
        Ok(())
    }

    /// Per-view distance and LOD update. Call once per view that renders
    /// the instance.
    pub fn update_batches<G: NodeGraph + ?Sized>(
        &mut self,
        key: ModelKey,
        view: &dyn View,
        frame_number: u32,
        graph: &G,
    ) -> Result<()> {
        self.instance_mut(key)?.update_batches(view, frame_number, graph);
        Ok(())
    }

    #[must_use]
    pub fn world_bounding_box(&self, key: ModelKey) -> Option<BoundingBox> {
        self.models.get(key).map(|m| *m.world_bounding_box())
    }

    /// Masters take their bone box into world space; siblings copy it.
    pub fn refresh_world_bounding_boxes<G: NodeGraph + ?Sized>(&mut self, graph: &G) {
        for (node, keys) in &self.by_node {
            let Some(world) = graph.world_transform(*node) else {
                continue;
            };
            let Some((&master, siblings)) = keys.split_first() else {
                continue;
            };

            let Some(instance) = self.models.get_mut(master) else {
                continue;
            };
            instance.is_master = true;
            let master_box = instance.bone_bounding_box().transformed(&world);
            instance.world_bounding_box = master_box;

            for &sibling in siblings {
                if let Some(other) = self.models.get_mut(sibling) {
                    other.world_bounding_box = master_box;
                }
            }
        }
    }

    // ========================================================================
    // Geometry
    // ========================================================================

    /// Main-thread geometry update of one instance: a forced animation
    /// update if one is pending, then skinning and morphs as needed.
    pub fn update_geometry<G: NodeGraph>(
        &mut self,
        key: ModelKey,
        frame: &FrameInfo<'_>,
        graph: &mut G,
    ) {
        let Some(instance) = self.models.get_mut(key) else {
            return;
        };

        if instance.is_force_animation_update() {
            if instance.advance_animation_lod(frame.time_step) {
                self.apply_animation(key, graph);
            }
            if let Some(instance) = self.models.get_mut(key) {
                instance.clear_force_animation_update();
            }
        }

        let Some(instance) = self.models.get_mut(key) else {
            return;
        };
        if instance.is_skinning_dirty() {
            instance.update_skinning(&*graph);
        }
        if instance.is_morphs_dirty() {
            instance.update_morphs();
        }
    }
}
