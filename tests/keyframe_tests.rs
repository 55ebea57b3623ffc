//! Keyframe Storage Tests
//!
//! Tests for:
//! - KeyframeSet ordering on add / insert / remove
//! - Cursor-driven keyframe lookup (clamping, coinciding keys)
//! - Keyframe pair resolution with and without looping
//! - Cursor search cost on steadily advancing playback
//! - Clamped value sampling

use std::cell::Cell;

use glam::Vec3;

use armature::animation::{Keyframe, KeyframeCursor, KeyframeSet, ValueKeyFrame};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn float_set(times: &[f32]) -> KeyframeSet<ValueKeyFrame<f32>> {
    times.iter().map(|&t| ValueKeyFrame::new(t, t * 10.0)).collect()
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn in_order_appends_keep_insertion_order() {
    let mut set = KeyframeSet::new();
    set.add_key_frame(ValueKeyFrame::new(0.0, 1.0_f32));
    set.add_key_frame(ValueKeyFrame::new(0.5, 2.0));
    set.add_key_frame(ValueKeyFrame::new(1.0, 3.0));

    let values: Vec<f32> = set.iter().map(|k| k.value).collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0]);
}

#[test]
fn out_of_order_append_resorts() {
    let mut set = KeyframeSet::new();
    set.add_key_frame(ValueKeyFrame::new(1.0, 2_u32));
    set.add_key_frame(ValueKeyFrame::new(2.0, 3_u32));
    set.add_key_frame(ValueKeyFrame::new(0.5, 1_u32));

    let values: Vec<u32> = set.iter().map(|k| k.value).collect();
    assert_eq!(values, vec![1, 2, 3]);
    assert!(set.as_slice().windows(2).all(|w| w[0].time <= w[1].time));
}

#[test]
fn equal_times_keep_relative_order() {
    let mut set = KeyframeSet::new();
    set.add_key_frame(ValueKeyFrame::new(1.0, 1_u8));
    set.add_key_frame(ValueKeyFrame::new(1.0, 2_u8));
    // Triggers a re-sort, which must be stable
    set.add_key_frame(ValueKeyFrame::new(0.0, 0_u8));

    let values: Vec<u8> = set.iter().map(|k| k.value).collect();
    assert_eq!(values, vec![0, 1, 2]);
}

#[test]
fn insert_at_wrong_position_is_corrected() {
    let mut set = float_set(&[0.0, 1.0, 2.0]);
    set.insert_key_frame(0, ValueKeyFrame::new(1.5, 15.0));

    let times: Vec<f32> = set.iter().map(|k| k.time).collect();
    assert_eq!(times, vec![0.0, 1.0, 1.5, 2.0]);
}

#[test]
fn insert_index_past_end_is_clamped() {
    let mut set = float_set(&[0.0, 1.0]);
    set.insert_key_frame(99, ValueKeyFrame::new(2.0, 20.0));
    assert_eq!(set.len(), 3);
    assert!(approx(set.last().unwrap().time, 2.0));
}

#[test]
fn remove_key_frame_bounds() {
    let mut set = float_set(&[0.0, 1.0, 2.0]);
    assert!(set.remove_key_frame(5).is_none());
    let removed = set.remove_key_frame(1).unwrap();
    assert!(approx(removed.time, 1.0));
    assert_eq!(set.len(), 2);

    set.remove_all_key_frames();
    assert!(set.is_empty());
}

#[test]
fn from_vec_sorts_arbitrary_input() {
    let set = KeyframeSet::from_vec(vec![
        ValueKeyFrame::new(3.0, 0.0_f32),
        ValueKeyFrame::new(1.0, 0.0),
        ValueKeyFrame::new(2.0, 0.0),
    ]);
    let times: Vec<f32> = set.iter().map(|k| k.time).collect();
    assert_eq!(times, vec![1.0, 2.0, 3.0]);
}

// ============================================================================
// Index Lookup
// ============================================================================

#[test]
fn empty_set_has_no_index() {
    let set: KeyframeSet<ValueKeyFrame<f32>> = KeyframeSet::new();
    let mut cursor = KeyframeCursor::default();
    assert_eq!(set.key_frame_index(0.5, &mut cursor), None);
    assert_eq!(set.key_frames(0.5, 1.0, true, &mut cursor), None);
}

#[test]
fn index_is_last_key_not_after_time() {
    let set = float_set(&[0.0, 1.0, 2.0]);
    let mut cursor = KeyframeCursor::default();

    assert_eq!(set.key_frame_index(0.0, &mut cursor), Some(0));
    assert_eq!(set.key_frame_index(1.5, &mut cursor), Some(1));
    assert_eq!(set.key_frame_index(1.0, &mut cursor), Some(1));
    assert_eq!(set.key_frame_index(2.0, &mut cursor), Some(2));
    assert_eq!(cursor.last_index, 2);
}

#[test]
fn negative_time_clamps_to_first_key() {
    let set = float_set(&[0.0, 1.0]);
    let mut cursor = KeyframeCursor { last_index: 1 };
    assert_eq!(set.key_frame_index(-3.0, &mut cursor), Some(0));
}

#[test]
fn time_past_end_resolves_to_last_key() {
    let set = float_set(&[0.0, 1.0, 2.0]);
    let mut cursor = KeyframeCursor::default();
    assert_eq!(set.key_frame_index(50.0, &mut cursor), Some(2));
}

#[test]
fn stale_cursor_beyond_set_is_tolerated() {
    let set = float_set(&[0.0, 1.0, 2.0]);
    let mut cursor = KeyframeCursor { last_index: 40 };
    assert_eq!(set.key_frame_index(0.5, &mut cursor), Some(0));
}

#[test]
fn rewinding_walks_back() {
    let set = float_set(&[0.0, 1.0, 2.0, 3.0]);
    let mut cursor = KeyframeCursor::default();
    assert_eq!(set.key_frame_index(2.5, &mut cursor), Some(2));
    assert_eq!(set.key_frame_index(0.2, &mut cursor), Some(0));
}

// ============================================================================
// Keyframe Pairs
// ============================================================================

#[test]
fn pair_blend_factor_midpoint() {
    let set = float_set(&[0.0, 1.0, 2.0]);
    let mut cursor = KeyframeCursor::default();
    let span = set.key_frames(1.25, 2.0, false, &mut cursor).unwrap();
    assert_eq!(span.frame_index, 1);
    assert_eq!(span.next_frame_index, 2);
    assert!(approx(span.blend_factor, 0.25));
}

#[test]
fn last_key_clamps_without_loop() {
    let set = float_set(&[0.0, 1.0, 2.0]);
    let mut cursor = KeyframeCursor::default();
    let span = set.key_frames(2.5, 3.0, false, &mut cursor).unwrap();
    assert_eq!(span.frame_index, 2);
    assert_eq!(span.next_frame_index, 2);
    assert!(approx(span.blend_factor, 0.0));
}

#[test]
fn last_key_wraps_with_loop() {
    let set = float_set(&[0.0, 1.0, 2.0]);
    let mut cursor = KeyframeCursor::default();
    // Interval from the last key to the first wraps across the clip end
    let span = set.key_frames(2.5, 3.0, true, &mut cursor).unwrap();
    assert_eq!(span.frame_index, 2);
    assert_eq!(span.next_frame_index, 0);
    assert!(approx(span.blend_factor, 0.5));
}

#[test]
fn coinciding_keys_have_zero_blend() {
    let set = float_set(&[0.0, 1.0, 1.0]);
    let mut cursor = KeyframeCursor::default();
    let span = set.key_frames(1.0, 1.0, false, &mut cursor).unwrap();
    assert!(approx(span.blend_factor, 0.0));
}

#[test]
fn single_key_is_constant() {
    let set = float_set(&[0.5]);
    let mut cursor = KeyframeCursor::default();
    for time in [0.0, 0.5, 3.0] {
        let span = set.key_frames(time, 1.0, true, &mut cursor).unwrap();
        assert_eq!(span.frame_index, 0);
        assert_eq!(span.next_frame_index, 0);
        assert!(approx(span.blend_factor, 0.0));
    }
}

// ============================================================================
// Search Cost
// ============================================================================

thread_local! {
    static TIME_READS: Cell<usize> = const { Cell::new(0) };
}

/// Keyframe that counts how often its time is read.
struct CountingKey {
    time: f32,
}

impl Keyframe for CountingKey {
    fn time(&self) -> f32 {
        TIME_READS.with(|reads| reads.set(reads.get() + 1));
        self.time
    }
}

fn reset_reads() {
    TIME_READS.with(|reads| reads.set(0));
}

fn reads() -> usize {
    TIME_READS.with(Cell::get)
}

#[test]
fn advancing_playback_is_constant_cost_per_sample() {
    let set: KeyframeSet<CountingKey> =
        (0..100).map(|i| CountingKey { time: i as f32 * 0.1 }).collect();
    let mut cursor = KeyframeCursor::default();

    let samples = 400;
    reset_reads();
    for step in 0..samples {
        let time = step as f32 * 0.025;
        let _ = set.key_frames(time, 10.0, false, &mut cursor);
    }
    let per_sample = reads() as f32 / samples as f32;
    assert!(per_sample <= 8.0, "expected O(1) reads per sample, got {per_sample}");
}

#[test]
fn seek_from_reset_cursor_walks_the_set() {
    let set: KeyframeSet<CountingKey> =
        (0..100).map(|i| CountingKey { time: i as f32 * 0.1 }).collect();

    reset_reads();
    let mut cursor = KeyframeCursor::default();
    assert_eq!(set.key_frame_index(9.55, &mut cursor), Some(95));
    let cold = reads();

    reset_reads();
    assert_eq!(set.key_frame_index(9.58, &mut cursor), Some(95));
    let warm = reads();

    assert!(cold > 90, "a cold seek steps through the keys ({cold} reads)");
    assert!(warm <= 3, "a warm lookup stays put ({warm} reads)");
}

// ============================================================================
// Clamped Sampling
// ============================================================================

#[test]
fn sample_clamped_interpolates_and_holds_ends() {
    let set: KeyframeSet<ValueKeyFrame<Vec3>> = [
        ValueKeyFrame::new(1.0, Vec3::ZERO),
        ValueKeyFrame::new(2.0, Vec3::new(10.0, 0.0, 0.0)),
    ]
    .into_iter()
    .collect();
    let mut cursor = KeyframeCursor::default();

    assert_eq!(set.sample_clamped(0.0, &mut cursor), Some(Vec3::ZERO));
    let mid = set.sample_clamped(1.5, &mut cursor).unwrap();
    assert!(approx(mid.x, 5.0));
    assert_eq!(set.sample_clamped(9.0, &mut cursor), Some(Vec3::new(10.0, 0.0, 0.0)));
}
