use rustc_hash::FxHashMap;

use crate::animation::tracks::{AnimationTrack, ChannelMask};
use crate::animation::variant::VariantTrack;
use crate::utils::NameHash;

/// A named point on the clip timeline reported when playback crosses it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTriggerPoint {
    pub time: f32,
    pub data: String,
}

/// Animation asset: transform tracks per bone, generic value tracks and
/// trigger points.
///
/// Tracks are stored densely (so they can be addressed by index) with a hash
/// lookup by name.
#[derive(Debug, Clone, Default)]
pub struct AnimationClip {
    pub name: String,
    pub name_hash: NameHash,
    length: f32,

    tracks: Vec<AnimationTrack>,
    track_lookup: FxHashMap<NameHash, usize>,

    variant_tracks: Vec<VariantTrack>,
    variant_lookup: FxHashMap<NameHash, usize>,

    triggers: Vec<AnimationTriggerPoint>,
}

impl AnimationClip {
    #[must_use]
    pub fn new(name: &str, length: f32) -> Self {
        Self {
            name: name.to_string(),
            name_hash: NameHash::new(name),
            length: length.max(0.0),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn set_length(&mut self, length: f32) {
        self.length = length.max(0.0);
    }

    // === Transform tracks ===

    /// Returns the track for `name`, creating an empty one if needed.
    pub fn create_track(&mut self, name: &str, channel_mask: ChannelMask) -> &mut AnimationTrack {
        let hash = NameHash::new(name);
        let index = match self.track_lookup.get(&hash) {
            Some(&index) => index,
            None => {
                self.tracks.push(AnimationTrack::new(name, channel_mask));
                let index = self.tracks.len() - 1;
                self.track_lookup.insert(hash, index);
                index
            }
        };
        &mut self.tracks[index]
    }

    /// Adds or replaces a fully built track.
    pub fn add_track(&mut self, track: AnimationTrack) {
        if let Some(&index) = self.track_lookup.get(&track.name_hash) {
            self.tracks[index] = track;
        } else {
            self.track_lookup.insert(track.name_hash, self.tracks.len());
            self.tracks.push(track);
        }
    }

    pub fn remove_track(&mut self, name: &str) -> bool {
        let hash = NameHash::new(name);
        let Some(index) = self.track_lookup.remove(&hash) else {
            return false;
        };
        self.tracks.swap_remove(index);
        if let Some(moved) = self.tracks.get(index) {
            self.track_lookup.insert(moved.name_hash, index);
        }
        true
    }

    pub fn remove_all_tracks(&mut self) {
        self.tracks.clear();
        self.track_lookup.clear();
    }

    #[must_use]
    pub fn track(&self, name: &str) -> Option<&AnimationTrack> {
        self.track_by_hash(NameHash::new(name))
    }

    #[must_use]
    pub fn track_by_hash(&self, hash: NameHash) -> Option<&AnimationTrack> {
        self.track_lookup.get(&hash).map(|&i| &self.tracks[i])
    }

    #[must_use]
    pub fn track_by_index(&self, index: usize) -> Option<&AnimationTrack> {
        self.tracks.get(index)
    }

    #[inline]
    #[must_use]
    pub fn tracks(&self) -> &[AnimationTrack] {
        &self.tracks
    }

    #[inline]
    #[must_use]
    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    // === Variant tracks ===

    pub fn create_variant_track(&mut self, name: &str) -> &mut VariantTrack {
        let hash = NameHash::new(name);
        let index = match self.variant_lookup.get(&hash) {
            Some(&index) => index,
            None => {
                self.variant_tracks.push(VariantTrack::new(name));
                let index = self.variant_tracks.len() - 1;
                self.variant_lookup.insert(hash, index);
                index
            }
        };
        &mut self.variant_tracks[index]
    }

    pub fn remove_variant_track(&mut self, name: &str) -> bool {
        let hash = NameHash::new(name);
        let Some(index) = self.variant_lookup.remove(&hash) else {
            return false;
        };
        self.variant_tracks.swap_remove(index);
        if let Some(moved) = self.variant_tracks.get(index) {
            self.variant_lookup.insert(moved.name_hash, index);
        }
        true
    }

    #[must_use]
    pub fn variant_track(&self, name: &str) -> Option<&VariantTrack> {
        self.variant_lookup
            .get(&NameHash::new(name))
            .map(|&i| &self.variant_tracks[i])
    }

    #[must_use]
    pub fn variant_tracks(&self) -> &[VariantTrack] {
        &self.variant_tracks
    }

    // === Triggers ===

    /// Adds a trigger. With `normalized`, `time` is a fraction of the length.
    pub fn add_trigger(&mut self, time: f32, normalized: bool, data: &str) {
        let time = if normalized { time * self.length } else { time };
        self.add_trigger_point(AnimationTriggerPoint {
            time,
            data: data.to_string(),
        });
    }

    /// Inserts keeping triggers sorted by time.
    pub fn add_trigger_point(&mut self, trigger: AnimationTriggerPoint) {
        let index = self.triggers.partition_point(|t| t.time <= trigger.time);
        self.triggers.insert(index, trigger);
    }

    pub fn remove_trigger(&mut self, index: usize) -> Option<AnimationTriggerPoint> {
        (index < self.triggers.len()).then(|| self.triggers.remove(index))
    }

    pub fn remove_all_triggers(&mut self) {
        self.triggers.clear();
    }

    #[inline]
    #[must_use]
    pub fn triggers(&self) -> &[AnimationTriggerPoint] {
        &self.triggers
    }
}
