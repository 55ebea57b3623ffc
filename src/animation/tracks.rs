use bitflags::bitflags;
use glam::{Quat, Vec3};

use crate::animation::keyframes::{Keyframe, KeyframeCursor, KeyframeSet, ValueKeyFrame};
use crate::model::M_EPSILON;
use crate::scene::transform::Transform;
use crate::utils::NameHash;

bitflags! {
    /// Transform channels a track actually animates.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ChannelMask: u8 {
        const POSITION = 1 << 0;
        const ROTATION = 1 << 1;
        const SCALE    = 1 << 2;
    }
}

/// Rigid transform sample. Channels outside the owning track's mask hold
/// meaningless values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformKeyFrame {
    pub time: f32,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl TransformKeyFrame {
    #[must_use]
    pub fn new(time: f32, transform: Transform) -> Self {
        Self {
            time,
            position: transform.position,
            rotation: transform.rotation,
            scale: transform.scale,
        }
    }
}

impl Default for TransformKeyFrame {
    fn default() -> Self {
        Self::new(0.0, Transform::IDENTITY)
    }
}

impl Keyframe for TransformKeyFrame {
    #[inline]
    fn time(&self) -> f32 {
        self.time
    }
}

/// Per-channel blend weights used when layering several tracks on one bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelWeights {
    pub position: f32,
    pub rotation: f32,
    pub scale: f32,
}

impl Default for ChannelWeights {
    fn default() -> Self {
        Self {
            position: 1.0,
            rotation: 1.0,
            scale: 1.0,
        }
    }
}

/// Keyframed transform animation of one bone, identified by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationTrack {
    pub name: String,
    pub name_hash: NameHash,
    pub channel_mask: ChannelMask,
    pub weights: ChannelWeights,
    /// Reference pose subtracted from samples in additive blending.
    pub base_value: Transform,

    key_frames: KeyframeSet<TransformKeyFrame>,
}

impl AnimationTrack {
    #[must_use]
    pub fn new(name: &str, channel_mask: ChannelMask) -> Self {
        Self {
            name: name.to_string(),
            name_hash: NameHash::new(name),
            channel_mask,
            weights: ChannelWeights::default(),
            base_value: Transform::IDENTITY,
            key_frames: KeyframeSet::new(),
        }
    }

    #[must_use]
    pub fn with_key_frames(
        mut self,
        key_frames: impl IntoIterator<Item = TransformKeyFrame>,
    ) -> Self {
        for key_frame in key_frames {
            self.key_frames.add_key_frame(key_frame);
        }
        self
    }

    pub fn add_key_frame(&mut self, key_frame: TransformKeyFrame) {
        self.key_frames.add_key_frame(key_frame);
    }

    pub fn insert_key_frame(&mut self, index: usize, key_frame: TransformKeyFrame) {
        self.key_frames.insert_key_frame(index, key_frame);
    }

    pub fn remove_key_frame(&mut self, index: usize) -> Option<TransformKeyFrame> {
        self.key_frames.remove_key_frame(index)
    }

    pub fn remove_all_key_frames(&mut self) {
        self.key_frames.remove_all_key_frames();
    }

    #[inline]
    #[must_use]
    pub fn key_frames(&self) -> &KeyframeSet<TransformKeyFrame> {
        &self.key_frames
    }

    #[inline]
    #[must_use]
    pub fn num_key_frames(&self) -> usize {
        self.key_frames.len()
    }

    /// Writes the interpolated value of every masked channel into `out`.
    ///
    /// Unmasked channels are left untouched, so callers seed `out` with the
    /// bind pose (or the current node transform) beforehand. When the sample
    /// sits on a key the key value is copied without interpolation.
    pub fn sample(
        &self,
        time: f32,
        duration: f32,
        looped: bool,
        cursor: &mut KeyframeCursor,
        out: &mut Transform,
    ) {
        let Some(span) = self.key_frames.key_frames(time, duration, looped, cursor) else {
            return;
        };

        let key_frame = &self.key_frames[span.frame_index];

        if span.blend_factor >= M_EPSILON {
            let next = &self.key_frames[span.next_frame_index];
            let t = span.blend_factor;
            if self.channel_mask.contains(ChannelMask::POSITION) {
                out.position = key_frame.position.lerp(next.position, t);
            }
            if self.channel_mask.contains(ChannelMask::ROTATION) {
                out.rotation = key_frame.rotation.slerp(next.rotation, t);
            }
            if self.channel_mask.contains(ChannelMask::SCALE) {
                out.scale = key_frame.scale.lerp(next.scale, t);
            }
        } else {
            if self.channel_mask.contains(ChannelMask::POSITION) {
                out.position = key_frame.position;
            }
            if self.channel_mask.contains(ChannelMask::ROTATION) {
                out.rotation = key_frame.rotation;
            }
            if self.channel_mask.contains(ChannelMask::SCALE) {
                out.scale = key_frame.scale;
            }
        }
    }

    /// True if the first and last keyframes agree on every masked channel
    /// within the given thresholds. Rotation is compared as `1 - |dot|`.
    /// A track without keyframes is trivially looped.
    #[must_use]
    pub fn is_looped(
        &self,
        position_threshold: f32,
        rotation_threshold: f32,
        scale_threshold: f32,
    ) -> bool {
        let (Some(first), Some(last)) = (self.key_frames.first(), self.key_frames.last()) else {
            return true;
        };

        if self.channel_mask.contains(ChannelMask::POSITION)
            && !first.position.abs_diff_eq(last.position, position_threshold)
        {
            return false;
        }
        if self.channel_mask.contains(ChannelMask::ROTATION)
            && 1.0 - first.rotation.dot(last.rotation).abs() > rotation_threshold
        {
            return false;
        }
        if self.channel_mask.contains(ChannelMask::SCALE)
            && !first.scale.abs_diff_eq(last.scale, scale_threshold)
        {
            return false;
        }
        true
    }

    /// Builds one transform track from independently timed channel tracks.
    ///
    /// Key times of the enabled channels are merged and sorted. Times closer
    /// than `epsilon` to the previously kept time are dropped, so a cluster
    /// keeps only its earliest key. This is lossy: the dropped keys' values
    /// are not averaged in, only re-sampled at the kept time. Each channel is
    /// then linearly re-sampled (slerp for rotation) onto the merged times,
    /// holding its first / last value outside its own key range.
    ///
    /// A channel requested in `channels` but with an empty source is removed
    /// from the resulting mask.
    #[must_use]
    pub fn create_merged(
        name: &str,
        channels: ChannelMask,
        positions: &KeyframeSet<ValueKeyFrame<Vec3>>,
        rotations: &KeyframeSet<ValueKeyFrame<Quat>>,
        scales: &KeyframeSet<ValueKeyFrame<Vec3>>,
        epsilon: f32,
    ) -> Self {
        let mut mask = channels;
        if positions.is_empty() {
            mask.remove(ChannelMask::POSITION);
        }
        if rotations.is_empty() {
            mask.remove(ChannelMask::ROTATION);
        }
        if scales.is_empty() {
            mask.remove(ChannelMask::SCALE);
        }

        let mut times: Vec<f32> = Vec::new();
        if mask.contains(ChannelMask::POSITION) {
            times.extend(positions.iter().map(|k| k.time));
        }
        if mask.contains(ChannelMask::ROTATION) {
            times.extend(rotations.iter().map(|k| k.time));
        }
        if mask.contains(ChannelMask::SCALE) {
            times.extend(scales.iter().map(|k| k.time));
        }
        times.sort_by(f32::total_cmp);

        let mut merged_times: Vec<f32> = Vec::with_capacity(times.len());
        for time in times {
            match merged_times.last() {
                Some(&kept) if time - kept <= epsilon => {}
                _ => merged_times.push(time),
            }
        }

        let mut track = Self::new(name, mask);
        let mut position_cursor = KeyframeCursor::default();
        let mut rotation_cursor = KeyframeCursor::default();
        let mut scale_cursor = KeyframeCursor::default();

        for time in merged_times {
            let mut key_frame = TransformKeyFrame {
                time,
                ..TransformKeyFrame::default()
            };
            if mask.contains(ChannelMask::POSITION)
                && let Some(value) = positions.sample_clamped(time, &mut position_cursor)
            {
                key_frame.position = value;
            }
            if mask.contains(ChannelMask::ROTATION)
                && let Some(value) = rotations.sample_clamped(time, &mut rotation_cursor)
            {
                key_frame.rotation = value;
            }
            if mask.contains(ChannelMask::SCALE)
                && let Some(value) = scales.sample_clamped(time, &mut scale_cursor)
            {
                key_frame.scale = value;
            }
            track.key_frames.add_key_frame(key_frame);
        }

        track
    }
}
