//! Per-instance animation state
//!
//! An [`AnimatedModel`] is driven by five dirty flags:
//!
//! | Flag                       | Set by                                   | Cleared by              |
//! |----------------------------|------------------------------------------|-------------------------|
//! | `animation_dirty`          | state source changed (master only)       | applying animation      |
//! | `skinning_dirty`           | any bone node or the model node moved    | skinning                |
//! | `morphs_dirty`             | morph weight change, software skinning   | morph update            |
//! | `bone_bounding_box_dirty`  | a bone node moved                        | bone bounding box update|
//! | `force_animation_update`   | animation dirtied while out of view      | geometry update         |
//!
//! Operations that only touch the instance itself live here. Everything
//! that involves sibling instances on the same node (skeleton setup, morph
//! propagation, bounding boxes shared with the master) goes through
//! [`AnimatedModels`](crate::model::AnimatedModels).

use std::sync::{Arc, Weak};

use glam::{Affine3A, Vec3};
use parking_lot::Mutex;

use crate::animation::source::AnimationStateSource;
use crate::model::frame::{FrameInfo, UpdateGeometryType};
use crate::model::skinning::SkinMatrices;
use crate::model::software::SoftwareModelAnimator;
use crate::model::{ANIMATION_LOD_BASESCALE, DOT_SCALE, M_EPSILON};
use crate::resources::bounding::{BoundingBox, Sphere};
use crate::resources::model::{Geometry, Model};
use crate::resources::vertex_buffer::ModelMorph;
use crate::scene::camera::View;
use crate::scene::skeleton::{BoneCollision, Skeleton};
use crate::scene::{NodeGraph, NodeHandle};
use crate::settings::SkinningSettings;
use crate::utils::NameHash;

/// What the pre-update phase decided for one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Not attached, or nothing was dirty.
    Idle,
    /// Out of view and `update_invisible` is off.
    Invisible,
    /// Beyond the draw distance.
    OutOfRange,
    /// Animation is dirty but the LOD timer has not elapsed.
    Throttled,
    /// Animation must be applied on the main thread.
    ApplyAnimation,
    /// Only the bone bounding box was refreshed.
    BoneBoundsUpdated,
}

pub struct AnimatedModel {
    pub(crate) node: Option<NodeHandle>,
    pub(crate) is_master: bool,

    model: Option<Arc<Model>>,
    settings: SkinningSettings,
    pub(crate) skeleton: Skeleton,
    skin: SkinMatrices,

    geometries: Vec<Geometry>,
    geometry_centers: Vec<Vec3>,
    geometry_distances: Vec<f32>,
    geometry_bone_mappings: Vec<Vec<usize>>,
    morphs: Vec<ModelMorph>,
    animator: Option<SoftwareModelAnimator>,

    state_source: Option<Weak<Mutex<dyn AnimationStateSource>>>,
    source_revision: Option<u64>,

    bounding_box: BoundingBox,
    bone_bounding_box: BoundingBox,
    pub(crate) world_bounding_box: BoundingBox,

    // === Configuration ===
    animation_lod_bias: f32,
    lod_bias: f32,
    update_invisible: bool,
    draw_distance: f32,

    // === LOD State ===
    animation_lod_frame_number: u32,
    animation_lod_distance: f32,
    animation_lod_timer: f32,
    view_frame_number: u32,
    distance: f32,
    lod_distance: f32,

    // === Dirty Flags ===
    animation_dirty: bool,
    skinning_dirty: bool,
    morphs_dirty: bool,
    bone_bounding_box_dirty: bool,
    force_animation_update: bool,
    assign_bones_pending: bool,
}

impl AnimatedModel {
    #[must_use]
    pub fn new(settings: SkinningSettings) -> Self {
        Self {
            node: None,
            is_master: true,
            model: None,
            settings,
            skeleton: Skeleton::new(),
            skin: SkinMatrices::new(),
            geometries: Vec::new(),
            geometry_centers: Vec::new(),
            geometry_distances: Vec::new(),
            geometry_bone_mappings: Vec::new(),
            morphs: Vec::new(),
            animator: None,
            state_source: None,
            source_revision: None,
            bounding_box: BoundingBox::UNDEFINED,
            bone_bounding_box: BoundingBox::UNDEFINED,
            world_bounding_box: BoundingBox::UNDEFINED,
            animation_lod_bias: 1.0,
            lod_bias: 1.0,
            update_invisible: false,
            draw_distance: 0.0,
            animation_lod_frame_number: 0,
            animation_lod_distance: 0.0,
            animation_lod_timer: -1.0,
            view_frame_number: 0,
            distance: 0.0,
            lod_distance: 0.0,
            animation_dirty: false,
            skinning_dirty: true,
            morphs_dirty: false,
            bone_bounding_box_dirty: true,
            force_animation_update: false,
            assign_bones_pending: false,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn node(&self) -> Option<NodeHandle> {
        self.node
    }

    #[inline]
    #[must_use]
    pub fn is_master(&self) -> bool {
        self.is_master
    }

    #[inline]
    #[must_use]
    pub fn model(&self) -> Option<&Arc<Model>> {
        self.model.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &SkinningSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Global skin matrices, one per bone.
    #[inline]
    #[must_use]
    pub fn skin_matrices(&self) -> &[Affine3A] {
        self.skin.global()
    }

    /// Matrices to bind when drawing geometry `index`.
    #[must_use]
    pub fn geometry_skin_matrices(&self, index: usize) -> &[Affine3A] {
        self.skin.for_geometry(index)
    }

    #[inline]
    #[must_use]
    pub fn skin(&self) -> &SkinMatrices {
        &self.skin
    }

    #[inline]
    #[must_use]
    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }

    #[inline]
    #[must_use]
    pub fn geometry_bone_mappings(&self) -> &[Vec<usize>] {
        &self.geometry_bone_mappings
    }

    /// Camera distance of each geometry, as of the last batch update.
    #[inline]
    #[must_use]
    pub fn geometry_distances(&self) -> &[f32] {
        &self.geometry_distances
    }

    #[inline]
    #[must_use]
    pub fn animator(&self) -> Option<&SoftwareModelAnimator> {
        self.animator.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn morphs(&self) -> &[ModelMorph] {
        &self.morphs
    }

    #[inline]
    #[must_use]
    pub fn num_morphs(&self) -> usize {
        self.morphs.len()
    }

    #[must_use]
    pub fn morph_weight(&self, index: usize) -> f32 {
        self.morphs.get(index).map_or(0.0, |m| m.weight)
    }

    #[must_use]
    pub fn morph_weight_by_name(&self, name: &str) -> f32 {
        self.morph_weight_by_hash(NameHash::new(name))
    }

    #[must_use]
    pub fn morph_weight_by_hash(&self, hash: NameHash) -> f32 {
        self.morph_index(hash).map_or(0.0, |i| self.morphs[i].weight)
    }

    #[must_use]
    pub fn morph_index(&self, hash: NameHash) -> Option<usize> {
        self.morphs.iter().position(|m| m.name_hash == hash)
    }

    /// Model-space bounding box of the asset.
    #[inline]
    #[must_use]
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// Node-local box enclosing the bones' collision volumes.
    #[inline]
    #[must_use]
    pub fn bone_bounding_box(&self) -> &BoundingBox {
        &self.bone_bounding_box
    }

    /// World-space culling box. Non-master instances share the master's.
    #[inline]
    #[must_use]
    pub fn world_bounding_box(&self) -> &BoundingBox {
        &self.world_bounding_box
    }

    #[inline]
    #[must_use]
    pub fn is_animation_dirty(&self) -> bool {
        self.animation_dirty
    }

    #[inline]
    #[must_use]
    pub fn is_skinning_dirty(&self) -> bool {
        self.skinning_dirty
    }

    #[inline]
    #[must_use]
    pub fn is_morphs_dirty(&self) -> bool {
        self.morphs_dirty
    }

    #[inline]
    #[must_use]
    pub fn is_bone_bounding_box_dirty(&self) -> bool {
        self.bone_bounding_box_dirty
    }

    #[inline]
    #[must_use]
    pub fn is_force_animation_update(&self) -> bool {
        self.force_animation_update
    }

    /// True after a model was set without creating bone nodes; cleared once
    /// the bone nodes are assigned.
    #[inline]
    #[must_use]
    pub fn is_assign_bones_pending(&self) -> bool {
        self.assign_bones_pending
    }

    #[inline]
    #[must_use]
    pub fn has_state_source(&self) -> bool {
        self.state_source.as_ref().is_some_and(|s| s.strong_count() > 0)
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn animation_lod_bias(&self) -> f32 {
        self.animation_lod_bias
    }

    /// Zero disables animation LOD throttling.
    pub fn set_animation_lod_bias(&mut self, bias: f32) {
        self.animation_lod_bias = bias.max(0.0);
    }

    #[inline]
    #[must_use]
    pub fn lod_bias(&self) -> f32 {
        self.lod_bias
    }

    pub fn set_lod_bias(&mut self, bias: f32) {
        self.lod_bias = bias.max(0.0);
    }

    #[inline]
    #[must_use]
    pub fn update_invisible(&self) -> bool {
        self.update_invisible
    }

    pub fn set_update_invisible(&mut self, enable: bool) {
        self.update_invisible = enable;
    }

    #[inline]
    #[must_use]
    pub fn draw_distance(&self) -> f32 {
        self.draw_distance
    }

    /// Zero means unlimited.
    pub fn set_draw_distance(&mut self, distance: f32) {
        self.draw_distance = distance.max(0.0);
    }

    #[inline]
    #[must_use]
    pub fn animation_lod_distance(&self) -> f32 {
        self.animation_lod_distance
    }

    #[inline]
    #[must_use]
    pub fn animation_lod_timer(&self) -> f32 {
        self.animation_lod_timer
    }

    #[inline]
    #[must_use]
    pub fn distance(&self) -> f32 {
        self.distance
    }

    #[inline]
    #[must_use]
    pub fn lod_distance(&self) -> f32 {
        self.lod_distance
    }

    #[inline]
    #[must_use]
    pub fn view_frame_number(&self) -> u32 {
        self.view_frame_number
    }

    /// Records that a view rendered this instance in `frame_number`.
    pub fn mark_in_view(&mut self, frame_number: u32) {
        self.view_frame_number = frame_number;
    }

    /// `animated` flag of every bone, in bone order.
    #[must_use]
    pub fn bones_enabled(&self) -> Vec<bool> {
        self.skeleton.bones().iter().map(|b| b.animated).collect()
    }

    /// Sets the `animated` flag of the first `enabled.len()` bones.
    pub fn set_bones_enabled(&mut self, enabled: &[bool]) {
        for (bone, &animated) in self.skeleton.bones_mut().iter_mut().zip(enabled) {
            bone.animated = animated;
        }
    }

    /// Morph weights quantised to bytes (`weight * 255`).
    #[must_use]
    pub fn morphs_attr(&self) -> Vec<u8> {
        self.morphs
            .iter()
            .map(|m| (m.weight * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect()
    }

    // ========================================================================
    // Thread affinity
    // ========================================================================

    /// Where (if anywhere) this instance's geometry update may run.
    #[must_use]
    pub fn update_geometry_type(&self) -> UpdateGeometryType {
        if self.morphs_dirty
            || self.force_animation_update
            || (self.skinning_dirty && self.settings.software_skinning)
        {
            UpdateGeometryType::MainThread
        } else if self.skinning_dirty {
            UpdateGeometryType::WorkerThread
        } else {
            UpdateGeometryType::None
        }
    }

    // ========================================================================
    // Per-frame phases
    // ========================================================================

    /// Visibility and LOD pre-update. Reads the scene only, so instances
    /// can run this concurrently.
    pub fn update<G: NodeGraph + ?Sized>(
        &mut self,
        frame: &FrameInfo<'_>,
        graph: &G,
    ) -> UpdateOutcome {
        let Some(node) = self.node else {
            return UpdateOutcome::Idle;
        };

        if let Some(camera) = frame.camera
            && frame.frame_number.abs_diff(self.view_frame_number) > 1
        {
            // Out of view: make sure the first visible frame re-evaluates
            if !self.update_invisible {
                if self.animation_dirty {
                    self.animation_lod_timer = -1.0;
                    self.force_animation_update = true;
                }
                return UpdateOutcome::Invisible;
            }

            let position = graph
                .world_transform(node)
                .map_or(Vec3::ZERO, |world| world.translation.into());
            let distance = camera.distance(position);
            if self.draw_distance > 0.0 && distance > self.draw_distance {
                return UpdateOutcome::OutOfRange;
            }
            let scale = self.world_bounding_box.size().dot(DOT_SCALE);
            self.animation_lod_distance = camera.lod_distance(distance, scale, self.lod_bias);
        }

        if self.animation_dirty {
            if self.advance_animation_lod(frame.time_step) {
                UpdateOutcome::ApplyAnimation
            } else {
                UpdateOutcome::Throttled
            }
        } else if self.bone_bounding_box_dirty {
            self.update_bone_bounding_box(graph);
            UpdateOutcome::BoneBoundsUpdated
        } else {
            UpdateOutcome::Idle
        }
    }

    /// Advances the animation LOD timer. Returns `true` when animation
    /// should be applied this frame.
    ///
    /// The first update after the timer was reset (initially, or after the
    /// instance was out of view) always proceeds.
    pub(crate) fn advance_animation_lod(&mut self, time_step: f32) -> bool {
        if self.animation_lod_bias > 0.0 && self.animation_lod_distance > 0.0 {
            if self.animation_lod_timer >= 0.0 {
                self.animation_lod_timer +=
                    self.animation_lod_bias * time_step * ANIMATION_LOD_BASESCALE;
                if self.animation_lod_timer >= self.animation_lod_distance {
                    self.animation_lod_timer %= self.animation_lod_distance;
                } else {
                    return false;
                }
            } else {
                self.animation_lod_timer = 0.0;
            }
        }
        true
    }

    /// Per-view distance and LOD update for an instance rendered by `view`.
    ///
    /// When several views render the instance in the same frame, the
    /// smallest LOD distance drives animation LOD.
    pub fn update_batches<G: NodeGraph + ?Sized>(
        &mut self,
        view: &dyn View,
        frame_number: u32,
        graph: &G,
    ) {
        let Some(world) = self.node.and_then(|node| graph.world_transform(node)) else {
            return;
        };

        self.distance = view.distance(self.world_bounding_box.center());

        self.geometry_distances.resize(self.geometry_centers.len(), 0.0);
        if self.geometry_centers.len() == 1 {
            self.geometry_distances[0] = self.distance;
        } else {
            let centers = &self.geometry_centers;
            for (distance, center) in self.geometry_distances.iter_mut().zip(centers) {
                *distance = view.distance(world.transform_point3(*center));
            }
        }

        // The unanimated model box keeps the LOD scale stable under animation
        let scale = self.bounding_box.transformed(&world).size().dot(DOT_SCALE);
        let new_lod_distance = view.lod_distance(self.distance, scale, self.lod_bias);

        if frame_number == self.animation_lod_frame_number {
            self.animation_lod_distance = self.animation_lod_distance.min(new_lod_distance);
        } else {
            self.animation_lod_distance = new_lod_distance;
            self.animation_lod_frame_number = frame_number;
        }

        self.lod_distance = new_lod_distance;
    }

    /// Recomputes the node-local box around the bones' collision volumes.
    ///
    /// Boxes are transformed into node space. Spheres contribute half their
    /// radius around the bone position.
    pub(crate) fn update_bone_bounding_box<G: NodeGraph + ?Sized>(&mut self, graph: &G) {
        if !self.skeleton.is_empty()
            && let Some(world) = self.node.and_then(|node| graph.world_transform(node))
        {
            self.bone_bounding_box.clear();
            let inverse = world.inverse();

            for bone in self.skeleton.bones() {
                let Some(bone_world) = bone.node.and_then(|node| graph.world_transform(node)) else {
                    continue;
                };

                if bone.collision_mask.contains(BoneCollision::BOX) {
                    self.bone_bounding_box
                        .merge(&bone.bounding_box.transformed(&(inverse * bone_world)));
                } else if bone.collision_mask.contains(BoneCollision::SPHERE) {
                    let center = inverse.transform_point3(bone_world.translation.into());
                    self.bone_bounding_box
                        .merge_sphere(&Sphere::new(center, bone.radius * 0.5));
                }
            }
        }

        self.bone_bounding_box_dirty = false;
    }

    pub(crate) fn update_skinning<G: NodeGraph + ?Sized>(&mut self, graph: &G) {
        let model_world = self
            .node
            .and_then(|node| graph.world_transform(node))
            .unwrap_or(Affine3A::IDENTITY);
        self.skin.update(self.skeleton.bones(), model_world, graph);

        self.skinning_dirty = false;

        // Software skinning rewrites the vertex clones
        if self.settings.software_skinning {
            self.morphs_dirty = true;
        }
    }

    pub(crate) fn update_morphs(&mut self) {
        if let Some(animator) = &mut self.animator {
            animator.reset_animation();
            animator.apply_morphs(&self.morphs);
            if self.settings.software_skinning {
                animator.apply_skinning(self.skin.global());
            }
            animator.commit();
        }

        self.morphs_dirty = false;
    }

    /// Scene notification: `node` (the model node or a bone node) moved.
    pub(crate) fn on_marked_dirty(&mut self, node: NodeHandle) {
        if self.skeleton.is_empty() {
            return;
        }
        self.skinning_dirty = true;
        // The bone box is node-local, so moving only the model node keeps it
        if Some(node) != self.node {
            self.bone_bounding_box_dirty = true;
        }
    }

    // ========================================================================
    // State changes driven by the registry
    // ========================================================================

    pub(crate) fn mark_animation_dirty(&mut self) {
        if self.is_master {
            self.animation_dirty = true;
        }
    }

    pub(crate) fn finish_animation(&mut self) {
        self.animation_dirty = false;
    }

    pub(crate) fn clear_force_animation_update(&mut self) {
        self.force_animation_update = false;
    }

    pub(crate) fn set_assign_bones_pending(&mut self, pending: bool) {
        self.assign_bones_pending = pending;
    }

    pub(crate) fn set_state_source(
        &mut self,
        source: Option<Weak<Mutex<dyn AnimationStateSource>>>,
    ) {
        self.state_source = source;
        self.source_revision = None;
    }

    /// Live state source, if connected and not dropped.
    pub(crate) fn state_source(&self) -> Option<Arc<Mutex<dyn AnimationStateSource>>> {
        self.state_source.as_ref().and_then(Weak::upgrade)
    }

    /// Compares the source revision with the last one seen; a change (or a
    /// dropped source) dirties the animation.
    pub(crate) fn poll_state_source(&mut self) {
        let Some(weak) = &self.state_source else {
            return;
        };
        match weak.upgrade() {
            Some(source) => {
                let revision = source.lock().revision();
                if self.source_revision != Some(revision) {
                    self.source_revision = Some(revision);
                    self.mark_animation_dirty();
                }
            }
            None => {
                // Pose falls back to bind pose
                self.state_source = None;
                self.source_revision = None;
                self.mark_animation_dirty();
            }
        }
    }

    /// Tells the state source to rebind its tracks against the skeleton.
    pub(crate) fn mark_source_tracks_dirty(&self) {
        if let Some(source) = self.state_source() {
            source.lock().mark_tracks_dirty();
        }
    }

    /// Copies geometry, morph and bounding data of a new model asset.
    pub(crate) fn load_model_data(&mut self, model: &Arc<Model>) {
        self.geometries = model.geometries.clone();
        self.geometry_centers = model.geometry_centers.clone();
        self.geometry_centers.resize(self.geometries.len(), Vec3::ZERO);
        self.geometry_distances = vec![0.0; self.geometries.len()];
        self.geometry_bone_mappings = model.geometry_bone_mappings.clone();

        // Morph clones are created on demand
        self.animator = None;
        self.morphs = model.morphs.iter().map(ModelMorph::instance).collect();

        self.bounding_box = model.bounding_box;
        self.bone_bounding_box = model.bounding_box;
        self.bone_bounding_box_dirty = true;
        self.model = Some(Arc::clone(model));
    }

    /// Second half of model setup, once the skeleton and skin storage are
    /// in place.
    pub(crate) fn finish_model_setup(&mut self) {
        if self.settings.software_skinning {
            self.clone_geometries();
        }
    }

    /// Rebuilds skin matrix storage from the skeleton and bone mappings.
    pub(crate) fn set_geometry_bone_mappings(&mut self) {
        self.skin.rebuild(
            self.skeleton.num_bones(),
            &self.geometry_bone_mappings,
            self.settings.software_skinning,
        );
        self.skinning_dirty = true;
    }

    pub(crate) fn clone_geometries(&mut self) {
        let Some(model) = &self.model else {
            return;
        };
        let animator = SoftwareModelAnimator::new(
            Arc::clone(model),
            self.settings.software_skinning,
            self.settings.software_bone_count(),
        );
        self.geometries = animator.geometries().to_vec();
        self.animator = Some(animator);
        self.morphs_dirty = true;
    }

    /// Drops every per-model resource.
    pub(crate) fn clear_model(&mut self) {
        self.model = None;
        self.geometries.clear();
        self.geometry_centers.clear();
        self.geometry_distances.clear();
        self.geometry_bone_mappings.clear();
        self.animator = None;
        self.morphs.clear();
        self.skin.clear();
        self.bounding_box = BoundingBox::UNDEFINED;
        self.bone_bounding_box = BoundingBox::UNDEFINED;
    }

    /// Sets one morph weight on this instance only. Returns `true` if the
    /// weight changed.
    pub(crate) fn set_morph_weight_local(&mut self, index: usize, weight: f32) -> bool {
        if index >= self.morphs.len() {
            return false;
        }

        if weight != 0.0 && self.animator.is_none() {
            self.clone_geometries();
        }

        if self.morphs[index].weight == weight {
            return false;
        }
        self.morphs[index].weight = weight;
        self.morphs_dirty = true;
        true
    }

    pub(crate) fn reset_morph_weights_local(&mut self) {
        for morph in &mut self.morphs {
            morph.weight = 0.0;
        }
        self.morphs_dirty = true;
    }

    /// Rebuilds the bone bounding volumes of the skeleton from `sources`
    /// (the skeletons of sibling instances) and clears degenerate volumes.
    ///
    /// Volumes are first reset to the model asset's, so an attachment that
    /// left no longer widens them, and then widened by every sibling bone of
    /// the same name.
    pub(crate) fn merge_bone_bounding_boxes(&mut self, sources: &[Skeleton]) {
        if let Some(model) = &self.model
            && model.skeleton.is_structurally_compatible(&self.skeleton)
        {
            let originals = model.skeleton.bones();
            for (bone, original) in self.skeleton.bones_mut().iter_mut().zip(originals) {
                bone.collision_mask = original.collision_mask;
                bone.radius = original.radius;
                bone.bounding_box = original.bounding_box;
            }
        }

        for other in sources {
            for bone in self.skeleton.bones_mut() {
                let Some(other_bone) = other.bone_by_hash(bone.name_hash) else {
                    continue;
                };
                if other_bone.collision_mask.contains(BoneCollision::SPHERE) {
                    bone.collision_mask |= BoneCollision::SPHERE;
                    bone.radius = bone.radius.max(other_bone.radius);
                }
                if other_bone.collision_mask.contains(BoneCollision::BOX) {
                    bone.collision_mask |= BoneCollision::BOX;
                    if bone.bounding_box.is_defined() {
                        bone.bounding_box.merge(&other_bone.bounding_box);
                    } else {
                        bone.bounding_box.define(&other_bone.bounding_box);
                    }
                }
            }
        }

        // Dummy bones must not inflate the box
        for bone in self.skeleton.bones_mut() {
            if bone.collision_mask.contains(BoneCollision::BOX)
                && bone.bounding_box.size().length() < M_EPSILON
            {
                bone.collision_mask.remove(BoneCollision::BOX);
            }
            if bone.collision_mask.contains(BoneCollision::SPHERE) && bone.radius < M_EPSILON {
                bone.collision_mask.remove(BoneCollision::SPHERE);
            }
        }
    }
}

impl std::fmt::Debug for AnimatedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimatedModel")
            .field("node", &self.node)
            .field("is_master", &self.is_master)
            .field("model", &self.model.as_ref().map(|m| m.name.as_str()))
            .field("num_bones", &self.skeleton.num_bones())
            .field("animation_dirty", &self.animation_dirty)
            .field("skinning_dirty", &self.skinning_dirty)
            .field("morphs_dirty", &self.morphs_dirty)
            .field("bone_bounding_box_dirty", &self.bone_bounding_box_dirty)
            .field("force_animation_update", &self.force_animation_update)
            .finish_non_exhaustive()
    }
}
