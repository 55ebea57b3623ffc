//! Time-sorted keyframe storage
//!
//! [`KeyframeSet`] keeps keyframes ordered by non-decreasing time. Appending
//! in order is O(1); an out-of-order append triggers a stable re-sort.
//!
//! Lookups take a [`KeyframeCursor`] holding the index found last time. The
//! search walks from there instead of bisecting, so steadily advancing
//! playback costs O(1) per sample while arbitrary seeks stay bounded by the
//! set size.

use crate::animation::values::Interpolatable;

/// Anything with a timestamp can live in a [`KeyframeSet`].
pub trait Keyframe {
    fn time(&self) -> f32;
}

/// Search hint carried between samples of the same track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyframeCursor {
    pub last_index: usize,
}

/// The keyframe pair bracketing a sample time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyframeSpan {
    pub frame_index: usize,
    pub next_frame_index: usize,
    /// Position between the two keys, in `[0, 1]`.
    pub blend_factor: f32,
}

/// A timestamped value of type `T`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueKeyFrame<T> {
    pub time: f32,
    pub value: T,
}

impl<T> ValueKeyFrame<T> {
    pub fn new(time: f32, value: T) -> Self {
        Self { time, value }
    }
}

impl<T> Keyframe for ValueKeyFrame<T> {
    #[inline]
    fn time(&self) -> f32 {
        self.time
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeSet<K> {
    key_frames: Vec<K>,
}

impl<K> Default for KeyframeSet<K> {
    fn default() -> Self {
        Self {
            key_frames: Vec::new(),
        }
    }
}

impl<K: Keyframe> KeyframeSet<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from arbitrary-order keyframes.
    #[must_use]
    pub fn from_vec(mut key_frames: Vec<K>) -> Self {
        key_frames.sort_by(|a, b| a.time().total_cmp(&b.time()));
        Self { key_frames }
    }

    /// Appends a keyframe, re-sorting only if it arrives out of order.
    pub fn add_key_frame(&mut self, key_frame: K) {
        let needs_sort = self
            .key_frames
            .last()
            .is_some_and(|back| key_frame.time() < back.time());

        self.key_frames.push(key_frame);
        if needs_sort {
            self.sort();
        }
    }

    /// Inserts at `index` (clamped to the end), then restores ordering.
    pub fn insert_key_frame(&mut self, index: usize, key_frame: K) {
        let index = index.min(self.key_frames.len());
        self.key_frames.insert(index, key_frame);
        if !self.is_sorted() {
            self.sort();
        }
    }

    pub fn remove_key_frame(&mut self, index: usize) -> Option<K> {
        (index < self.key_frames.len()).then(|| self.key_frames.remove(index))
    }

    pub fn remove_all_key_frames(&mut self) {
        self.key_frames.clear();
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.key_frames.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key_frames.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&K> {
        self.key_frames.get(index)
    }

    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&K> {
        self.key_frames.first()
    }

    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&K> {
        self.key_frames.last()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[K] {
        &self.key_frames
    }

    pub fn iter(&self) -> std::slice::Iter<'_, K> {
        self.key_frames.iter()
    }

    /// Index of the last keyframe whose time is `<= time`, found by walking
    /// from the cursor. Times before zero are treated as zero, and times
    /// before the first key resolve to index 0.
    ///
    /// Returns `None` only for an empty set.
    pub fn key_frame_index(&self, time: f32, cursor: &mut KeyframeCursor) -> Option<usize> {
        if self.key_frames.is_empty() {
            return None;
        }

        let time = time.max(0.0);
        let last = self.key_frames.len() - 1;
        let mut index = cursor.last_index.min(last);

        // Step back while the current key lies ahead of the sample time
        while index > 0 && time < self.key_frames[index].time() {
            index -= 1;
        }
        // Step forward while the next key has already been reached
        while index < last && time >= self.key_frames[index + 1].time() {
            index += 1;
        }

        cursor.last_index = index;
        Some(index)
    }

    /// Resolves the keyframe pair bracketing `time`.
    ///
    /// When `looped`, the key after the last one wraps to the first and the
    /// interval is extended by `duration`; otherwise it clamps to the last
    /// key. Coinciding keys yield a blend factor of zero.
    pub fn key_frames(
        &self,
        time: f32,
        duration: f32,
        looped: bool,
        cursor: &mut KeyframeCursor,
    ) -> Option<KeyframeSpan> {
        let frame_index = self.key_frame_index(time, cursor)?;
        let time = time.max(0.0);

        let next_frame_index = if frame_index + 1 < self.key_frames.len() {
            frame_index + 1
        } else if looped {
            0
        } else {
            frame_index
        };

        let frame_time = self.key_frames[frame_index].time();
        let next_time = self.key_frames[next_frame_index].time();

        let mut interval = next_time - frame_time;
        if next_time < frame_time {
            interval += duration;
        }

        let blend_factor = if interval > 0.0 {
            ((time - frame_time) / interval).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Some(KeyframeSpan {
            frame_index,
            next_frame_index,
            blend_factor,
        })
    }

    fn is_sorted(&self) -> bool {
        self.key_frames.windows(2).all(|w| w[0].time() <= w[1].time())
    }

    fn sort(&mut self) {
        self.key_frames.sort_by(|a, b| a.time().total_cmp(&b.time()));
    }
}

impl<T: Interpolatable> KeyframeSet<ValueKeyFrame<T>> {
    /// Samples the set without wrapping, holding the first / last value
    /// outside the key range.
    pub fn sample_clamped(&self, time: f32, cursor: &mut KeyframeCursor) -> Option<T> {
        let span = self.key_frames(time, 0.0, false, cursor)?;
        let current = &self.key_frames[span.frame_index];
        if span.next_frame_index == span.frame_index || span.blend_factor <= 0.0 {
            return Some(current.value);
        }
        let next = &self.key_frames[span.next_frame_index];
        Some(T::interpolate_linear(current.value, next.value, span.blend_factor))
    }
}

impl<K> std::ops::Index<usize> for KeyframeSet<K> {
    type Output = K;

    fn index(&self, index: usize) -> &Self::Output {
        &self.key_frames[index]
    }
}

impl<'a, K> IntoIterator for &'a KeyframeSet<K> {
    type Item = &'a K;
    type IntoIter = std::slice::Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.key_frames.iter()
    }
}

impl<K: Keyframe> FromIterator<K> for KeyframeSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}
