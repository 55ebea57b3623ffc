use std::sync::Arc;

use glam::Quat;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::animation::binder::{Binder, ModelTrackBinding};
use crate::animation::clip::AnimationClip;
use crate::animation::tracks::ChannelMask;
use crate::scene::NodeGraph;
use crate::scene::skeleton::Skeleton;
use crate::utils::NameHash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationBlendMode {
    /// Blend toward the sampled pose by the state weight.
    #[default]
    Lerp,
    /// Add the sample's offset from the track base value, scaled by weight.
    Additive,
}

/// What happened while advancing a state's time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeAdvance {
    /// A non-looped state reached its end (or start, when rewinding).
    pub finished: bool,
    /// Indices into the clip's trigger list that were crossed.
    pub triggers: SmallVec<[usize; 4]>,
}

/// Playback state of one clip on one skeleton.
#[derive(Debug, Clone)]
pub struct AnimationState {
    clip: Arc<AnimationClip>,

    time: f32,
    weight: f32,
    looped: bool,
    layer: u8,
    blend_mode: AnimationBlendMode,
    start_bone: Option<NameHash>,
    bone_weights: FxHashMap<NameHash, f32>,

    bindings: Vec<ModelTrackBinding>,
    tracks_dirty: bool,
}

impl AnimationState {
    #[must_use]
    pub fn new(clip: Arc<AnimationClip>) -> Self {
        Self {
            clip,
            time: 0.0,
            weight: 0.0,
            looped: false,
            layer: 0,
            blend_mode: AnimationBlendMode::Lerp,
            start_bone: None,
            bone_weights: FxHashMap::default(),
            bindings: Vec::new(),
            tracks_dirty: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    #[inline]
    #[must_use]
    pub fn name_hash(&self) -> NameHash {
        self.clip.name_hash
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> f32 {
        self.clip.length()
    }

    #[inline]
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    #[inline]
    #[must_use]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    #[inline]
    #[must_use]
    pub fn is_looped(&self) -> bool {
        self.looped
    }

    #[inline]
    #[must_use]
    pub fn layer(&self) -> u8 {
        self.layer
    }

    #[inline]
    #[must_use]
    pub fn blend_mode(&self) -> AnimationBlendMode {
        self.blend_mode
    }

    #[inline]
    #[must_use]
    pub fn start_bone(&self) -> Option<NameHash> {
        self.start_bone
    }

    /// A state with zero weight contributes nothing.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.weight > 0.0
    }

    #[inline]
    #[must_use]
    pub fn tracks_dirty(&self) -> bool {
        self.tracks_dirty
    }

    pub fn set_time(&mut self, time: f32) {
        self.time = time.clamp(0.0, self.clip.length());
    }

    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight.clamp(0.0, 1.0);
    }

    pub fn set_looped(&mut self, looped: bool) {
        self.looped = looped;
    }

    pub fn set_layer(&mut self, layer: u8) {
        self.layer = layer;
    }

    pub fn set_blend_mode(&mut self, mode: AnimationBlendMode) {
        self.blend_mode = mode;
    }

    /// Restricts playback to the subtree of the named bone (`None` = all).
    pub fn set_start_bone(&mut self, bone: Option<&str>) {
        self.start_bone = bone.map(NameHash::new);
        self.tracks_dirty = true;
    }

    pub fn set_bone_weight(&mut self, bone: NameHash, weight: f32) {
        let weight = weight.clamp(0.0, 1.0);
        self.bone_weights.insert(bone, weight);
        for binding in &mut self.bindings {
            if self.clip.tracks()[binding.track_index].name_hash == bone {
                binding.weight = weight;
            }
        }
    }

    /// Sets the weight of a bone and every bone below it.
    pub fn set_bone_weight_recursive(&mut self, skeleton: &Skeleton, bone: &str, weight: f32) {
        let Some(root) = skeleton.bone_index(NameHash::new(bone)) else {
            return;
        };
        let hashes: SmallVec<[NameHash; 16]> = skeleton
            .bones()
            .iter()
            .enumerate()
            .filter(|(i, _)| skeleton.is_in_subtree(*i, root))
            .map(|(_, b)| b.name_hash)
            .collect();
        for hash in hashes {
            self.set_bone_weight(hash, weight);
        }
    }

    #[must_use]
    pub fn bone_weight(&self, bone: NameHash) -> f32 {
        self.bone_weights.get(&bone).copied().unwrap_or(1.0)
    }

    pub fn mark_tracks_dirty(&mut self) {
        self.tracks_dirty = true;
    }

    /// Advances time by `delta`, wrapping when looped.
    pub fn add_time(&mut self, delta: f32) -> TimeAdvance {
        let mut result = TimeAdvance::default();
        let length = self.clip.length();
        if delta == 0.0 || length == 0.0 {
            return result;
        }

        let old_time = self.time;
        let mut time = old_time + delta;
        if self.looped {
            time = time.rem_euclid(length);
        }
        self.set_time(time);

        if !self.looped {
            let reached_end = delta > 0.0 && old_time < length && self.time == length;
            let reached_start = delta < 0.0 && old_time > 0.0 && self.time == 0.0;
            result.finished = reached_end || reached_start;
        }

        let triggers = self.clip.triggers();
        if triggers.is_empty() {
            return result;
        }

        let mut from = old_time;
        let mut to = self.time;
        let mut wrapped = false;
        if delta > 0.0 && from > to {
            from -= length;
            wrapped = true;
        }
        if delta < 0.0 && to > from {
            to -= length;
            wrapped = true;
        }
        if from > to {
            std::mem::swap(&mut from, &mut to);
        }

        for (index, trigger) in triggers.iter().enumerate() {
            let mut frame_time = trigger.time;
            if self.looped && wrapped {
                frame_time %= length;
            }
            let crossed = from <= frame_time && to > frame_time;
            // The pre-wrap part of the interval covers [from + length, length)
            let crossed_before_wrap = wrapped && from < 0.0 && frame_time >= from + length;
            if crossed || crossed_before_wrap {
                result.triggers.push(index);
            }
        }

        result
    }

    /// Applies sampled transform tracks to the bound bone nodes, silently.
    ///
    /// Only bones flagged `animated` are written. Bindings are rebuilt first
    /// if the tracks were marked dirty.
    pub fn apply_model_tracks(&mut self, skeleton: &Skeleton, graph: &mut dyn NodeGraph) {
        if !self.is_enabled() {
            return;
        }

        if self.tracks_dirty {
            self.bindings = Binder::bind_model_tracks(
                &self.clip,
                skeleton,
                self.start_bone,
                &self.bone_weights,
            );
            self.tracks_dirty = false;
        }

        let clip = Arc::clone(&self.clip);
        let length = clip.length();

        for binding in &mut self.bindings {
            let final_weight = self.weight * binding.weight;
            if final_weight == 0.0 {
                continue;
            }
            let Some(bone) = skeleton.bone(binding.bone_index) else {
                continue;
            };
            if !bone.animated {
                continue;
            }
            let Some(track) = clip.track_by_index(binding.track_index) else {
                continue;
            };
            if track.num_key_frames() == 0 {
                continue;
            }
            let Some(current) = graph.local_transform(binding.node) else {
                continue;
            };

            let mask = track.channel_mask;
            let mut sampled = track.base_value;
            track.sample(self.time, length, self.looped, &mut binding.cursor, &mut sampled);

            let mut result = current;
            match self.blend_mode {
                AnimationBlendMode::Lerp => {
                    let w = track.weights;
                    if mask.contains(ChannelMask::POSITION) {
                        let t = final_weight * w.position;
                        result.position = if t >= 1.0 {
                            sampled.position
                        } else {
                            current.position.lerp(sampled.position, t)
                        };
                    }
                    if mask.contains(ChannelMask::ROTATION) {
                        let t = final_weight * w.rotation;
                        result.rotation = if t >= 1.0 {
                            sampled.rotation
                        } else {
                            current.rotation.slerp(sampled.rotation, t)
                        };
                    }
                    if mask.contains(ChannelMask::SCALE) {
                        let t = final_weight * w.scale;
                        result.scale = if t >= 1.0 {
                            sampled.scale
                        } else {
                            current.scale.lerp(sampled.scale, t)
                        };
                    }
                }
                AnimationBlendMode::Additive => {
                    let base = track.base_value;
                    let w = track.weights;
                    if mask.contains(ChannelMask::POSITION) {
                        let delta = sampled.position - base.position;
                        result.position = current.position + delta * final_weight * w.position;
                    }
                    if mask.contains(ChannelMask::ROTATION) {
                        let delta = sampled.rotation * base.rotation.inverse();
                        let partial = Quat::IDENTITY.slerp(delta, final_weight * w.rotation);
                        result.rotation = (partial * current.rotation).normalize();
                    }
                    if mask.contains(ChannelMask::SCALE) {
                        let delta = sampled.scale - base.scale;
                        result.scale = current.scale + delta * final_weight * w.scale;
                    }
                }
            }

            graph.set_local_transform_silent(binding.node, result);
        }
    }
}
