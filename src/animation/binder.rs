use rustc_hash::FxHashMap;

use crate::animation::clip::AnimationClip;
use crate::animation::keyframes::KeyframeCursor;
use crate::scene::NodeHandle;
use crate::scene::skeleton::Skeleton;
use crate::utils::NameHash;

/// Binding of one clip track to the bone it drives.
#[derive(Debug, Clone)]
pub struct ModelTrackBinding {
    pub track_index: usize,
    pub bone_index: usize,
    pub node: NodeHandle,
    pub weight: f32,
    pub cursor: KeyframeCursor,
}

pub struct Binder;

impl Binder {
    /// Resolves clip tracks against a skeleton.
    ///
    /// A track binds only if a bone with the same name exists and is bound to
    /// a scene node. With a start bone, only that bone's subtree is bound; an
    /// unknown start bone falls back to the whole skeleton.
    #[must_use]
    pub fn bind_model_tracks(
        clip: &AnimationClip,
        skeleton: &Skeleton,
        start_bone: Option<NameHash>,
        bone_weights: &FxHashMap<NameHash, f32>,
    ) -> Vec<ModelTrackBinding> {
        let start_index = start_bone.and_then(|hash| skeleton.bone_index(hash));

        let mut bindings = Vec::with_capacity(clip.num_tracks());
        for (track_index, track) in clip.tracks().iter().enumerate() {
            let Some(bone_index) = skeleton.bone_index(track.name_hash) else {
                continue;
            };
            if let Some(start) = start_index
                && !skeleton.is_in_subtree(bone_index, start)
            {
                continue;
            }
            let Some(node) = skeleton.bone(bone_index).and_then(|b| b.node) else {
                continue;
            };

            bindings.push(ModelTrackBinding {
                track_index,
                bone_index,
                node,
                weight: bone_weights.get(&track.name_hash).copied().unwrap_or(1.0),
                cursor: KeyframeCursor::default(),
            });
        }

        bindings
    }
}
