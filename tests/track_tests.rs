//! Track Tests
//!
//! Tests for:
//! - AnimationTrack sampling (channel masks, interpolation, loop wrap)
//! - Loop detection thresholds
//! - Merging independently timed channels into one track
//! - VariantTrack interpolation modes and type validation
//! - AnimationClip track / trigger bookkeeping

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use glam::{Quat, Vec3};

use armature::animation::{
    AnimatedValue, AnimatedValueType, AnimationClip, AnimationTrack, ChannelMask, InterpolationMode,
    KeyframeCursor, KeyframeSet, TransformKeyFrame, ValueKeyFrame, VariantTrack,
};
use armature::scene::Transform;

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

fn key(time: f32, position: Vec3, rotation: Quat, scale: Vec3) -> TransformKeyFrame {
    TransformKeyFrame::new(time, Transform::new(position, rotation, scale))
}

fn slide_track(mask: ChannelMask) -> AnimationTrack {
    AnimationTrack::new("Slide", mask).with_key_frames([
        key(0.0, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE),
        key(1.0, Vec3::new(10.0, 0.0, 0.0), Quat::from_rotation_y(FRAC_PI_2), Vec3::splat(3.0)),
    ])
}

fn sample(track: &AnimationTrack, time: f32, duration: f32, looped: bool) -> Transform {
    let mut cursor = KeyframeCursor::default();
    let mut out = Transform::IDENTITY;
    track.sample(time, duration, looped, &mut cursor, &mut out);
    out
}

// ============================================================================
// AnimationTrack: Sampling
// ============================================================================

#[test]
fn sample_interpolates_every_masked_channel() {
    let track = slide_track(ChannelMask::all());
    let out = sample(&track, 0.5, 1.0, false);

    assert!(vec3_approx(out.position, Vec3::new(5.0, 0.0, 0.0)));
    assert!(out.rotation.angle_between(Quat::from_rotation_y(FRAC_PI_4)) < EPSILON);
    assert!(vec3_approx(out.scale, Vec3::splat(2.0)));
}

#[test]
fn sample_leaves_unmasked_channels_untouched() {
    let track = slide_track(ChannelMask::POSITION);

    let mut cursor = KeyframeCursor::default();
    let seed = Transform::new(Vec3::ONE, Quat::from_rotation_x(1.0), Vec3::splat(7.0));
    let mut out = seed;
    track.sample(0.5, 1.0, false, &mut cursor, &mut out);

    assert!(vec3_approx(out.position, Vec3::new(5.0, 0.0, 0.0)));
    assert_eq!(out.rotation, seed.rotation);
    assert_eq!(out.scale, seed.scale);
}

#[test]
fn sample_on_key_copies_key_value() {
    let track = slide_track(ChannelMask::all());
    let out = sample(&track, 1.0, 1.0, false);
    assert_eq!(out.position, Vec3::new(10.0, 0.0, 0.0));
    assert_eq!(out.scale, Vec3::splat(3.0));
}

#[test]
fn sample_wraps_last_key_to_first_when_looped() {
    let track = slide_track(ChannelMask::POSITION);

    // Clip is 2s long; halfway between the last key and the wrapped first key
    let looped = sample(&track, 1.5, 2.0, true);
    assert!(vec3_approx(looped.position, Vec3::new(5.0, 0.0, 0.0)));

    let clamped = sample(&track, 1.5, 2.0, false);
    assert!(vec3_approx(clamped.position, Vec3::new(10.0, 0.0, 0.0)));
}

#[test]
fn sample_empty_track_is_noop() {
    let track = AnimationTrack::new("Empty", ChannelMask::all());
    let out = sample(&track, 0.3, 1.0, true);
    assert_eq!(out, Transform::IDENTITY);
}

// ============================================================================
// AnimationTrack: Loop Detection
// ============================================================================

#[test]
fn matching_ends_are_looped() {
    let track = AnimationTrack::new("Idle", ChannelMask::all()).with_key_frames([
        key(0.0, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE),
        key(0.5, Vec3::Y, Quat::from_rotation_z(0.3), Vec3::ONE),
        key(1.0, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE),
    ]);
    assert!(track.is_looped(0.01, 0.001, 0.01));
}

#[test]
fn position_mismatch_is_not_looped() {
    let track = slide_track(ChannelMask::POSITION);
    assert!(!track.is_looped(0.01, 0.001, 0.01));
    assert!(track.is_looped(100.0, 0.001, 0.01));
}

#[test]
fn antipodal_rotations_count_as_equal() {
    let q = Quat::from_rotation_y(0.7);
    let track = AnimationTrack::new("Spin", ChannelMask::ROTATION).with_key_frames([
        key(0.0, Vec3::ZERO, q, Vec3::ONE),
        key(1.0, Vec3::ZERO, -q, Vec3::ONE),
    ]);
    assert!(track.is_looped(0.0, 1e-5, 0.0));
}

#[test]
fn unmasked_channels_are_ignored_by_loop_check() {
    // Scale differs wildly, but the track only animates position
    let track = AnimationTrack::new("Bob", ChannelMask::POSITION).with_key_frames([
        key(0.0, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE),
        key(1.0, Vec3::ZERO, Quat::from_rotation_x(2.0), Vec3::splat(9.0)),
    ]);
    assert!(track.is_looped(0.001, 0.001, 0.001));
}

#[test]
fn empty_track_is_trivially_looped() {
    assert!(AnimationTrack::new("Empty", ChannelMask::all()).is_looped(0.0, 0.0, 0.0));
}

// ============================================================================
// AnimationTrack: Channel Merging
// ============================================================================

#[test]
fn merged_track_keeps_earliest_key_of_a_cluster() {
    let rotation_a = Quat::from_rotation_y(0.5);
    let rotation_b = Quat::from_rotation_y(1.5);

    let positions: KeyframeSet<ValueKeyFrame<Vec3>> = [
        ValueKeyFrame::new(0.0, Vec3::ZERO),
        ValueKeyFrame::new(1.0, Vec3::new(10.0, 0.0, 0.0)),
    ]
    .into_iter()
    .collect();
    let rotations: KeyframeSet<ValueKeyFrame<Quat>> = [
        ValueKeyFrame::new(0.5, rotation_a),
        ValueKeyFrame::new(1.0005, rotation_b),
    ]
    .into_iter()
    .collect();
    let scales = KeyframeSet::new();

    let track = AnimationTrack::create_merged(
        "Arm",
        ChannelMask::POSITION | ChannelMask::ROTATION,
        &positions,
        &rotations,
        &scales,
        0.001,
    );

    let times: Vec<f32> = track.key_frames().iter().map(|k| k.time).collect();
    assert_eq!(times, vec![0.0, 0.5, 1.0]);

    let keys = track.key_frames().as_slice();
    // Rotation holds its first value before its own first key
    assert!(keys[0].rotation.angle_between(rotation_a) < EPSILON);
    assert!(vec3_approx(keys[1].position, Vec3::new(5.0, 0.0, 0.0)));
    assert!(keys[2].rotation.angle_between(rotation_b) < 0.01);
    assert!(vec3_approx(keys[2].position, Vec3::new(10.0, 0.0, 0.0)));
}

#[test]
fn merged_track_from_simultaneous_keys_has_one_key() {
    let positions: KeyframeSet<ValueKeyFrame<Vec3>> =
        [ValueKeyFrame::new(0.0, Vec3::X)].into_iter().collect();
    let rotations: KeyframeSet<ValueKeyFrame<Quat>> =
        [ValueKeyFrame::new(0.0, Quat::from_rotation_z(0.2))].into_iter().collect();
    let scales: KeyframeSet<ValueKeyFrame<Vec3>> =
        [ValueKeyFrame::new(0.0005, Vec3::splat(2.0))].into_iter().collect();

    let track = AnimationTrack::create_merged(
        "Root",
        ChannelMask::all(),
        &positions,
        &rotations,
        &scales,
        0.001,
    );

    assert_eq!(track.num_key_frames(), 1);
    let only = track.key_frames()[0];
    assert_eq!(only.position, Vec3::X);
    assert_eq!(only.scale, Vec3::splat(2.0));
    assert_eq!(track.channel_mask, ChannelMask::all());
}

#[test]
fn merged_track_drops_empty_channels_from_mask() {
    let positions: KeyframeSet<ValueKeyFrame<Vec3>> = [
        ValueKeyFrame::new(0.0, Vec3::ZERO),
        ValueKeyFrame::new(1.0, Vec3::Y),
    ]
    .into_iter()
    .collect();

    let track = AnimationTrack::create_merged(
        "Hip",
        ChannelMask::all(),
        &positions,
        &KeyframeSet::new(),
        &KeyframeSet::new(),
        0.001,
    );

    assert_eq!(track.channel_mask, ChannelMask::POSITION);
    assert_eq!(track.num_key_frames(), 2);
}

// ============================================================================
// VariantTrack
// ============================================================================

fn float_track(mode: InterpolationMode, values: &[(f32, f32)]) -> VariantTrack {
    let mut track = VariantTrack::new("Param");
    track.interpolation = mode;
    for &(time, value) in values {
        track.add_key_frame(time, AnimatedValue::Float(value));
    }
    track.commit();
    track
}

fn sample_float(track: &VariantTrack, time: f32, duration: f32, looped: bool) -> f32 {
    let mut cursor = KeyframeCursor::default();
    match track.sample(time, duration, looped, &mut cursor) {
        Some(AnimatedValue::Float(v)) => v,
        other => panic!("expected a float sample, got {other:?}"),
    }
}

#[test]
fn variant_linear_and_step() {
    let linear = float_track(InterpolationMode::Linear, &[(0.0, 0.0), (1.0, 10.0)]);
    assert!(approx(sample_float(&linear, 0.5, 1.0, false), 5.0));

    let step = float_track(InterpolationMode::Step, &[(0.0, 0.0), (1.0, 10.0)]);
    assert!(approx(sample_float(&step, 0.9, 1.0, false), 0.0));
    assert!(approx(sample_float(&step, 1.0, 1.0, false), 10.0));
}

#[test]
fn variant_loop_wraps() {
    let track = float_track(InterpolationMode::Linear, &[(0.0, 0.0), (1.0, 10.0)]);
    assert!(approx(sample_float(&track, 1.5, 2.0, true), 5.0));
}

#[test]
fn variant_spline_uses_tangents() {
    let track = float_track(InterpolationMode::Spline, &[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]);

    // Keys are hit exactly
    assert!(approx(sample_float(&track, 1.0, 2.0, false), 1.0));
    // End tangent (1 - 0) * 0.5 * 2 = 1, middle tangent (0 - 0) * 0.5 = 0
    assert!(approx(sample_float(&track, 0.5, 2.0, false), 0.625));
}

#[test]
fn variant_discrete_values_step() {
    let mut track = VariantTrack::new("Visible");
    track.add_key_frame(0.0, AnimatedValue::Bool(false));
    track.add_key_frame(1.0, AnimatedValue::Bool(true));
    track.commit();

    let mut cursor = KeyframeCursor::default();
    assert_eq!(track.sample(0.9, 1.0, false, &mut cursor), Some(AnimatedValue::Bool(false)));
    assert_eq!(track.sample(1.0, 1.0, false, &mut cursor), Some(AnimatedValue::Bool(true)));
}

#[test]
fn variant_commit_drops_mismatched_types() {
    let mut track = VariantTrack::new("Mixed");
    track.add_key_frame(0.0, AnimatedValue::Float(1.0));
    track.add_key_frame(0.5, AnimatedValue::Int(2));
    track.add_key_frame(1.0, AnimatedValue::Float(3.0));
    track.commit();

    assert_eq!(track.value_type(), Some(AnimatedValueType::Float));
    assert_eq!(track.key_frames().len(), 2);
}

#[test]
fn variant_empty_track_has_no_sample() {
    let track = VariantTrack::new("Nothing");
    let mut cursor = KeyframeCursor::default();
    assert_eq!(track.sample(0.0, 1.0, false, &mut cursor), None);
}

// ============================================================================
// AnimationClip
// ============================================================================

#[test]
fn clip_create_track_is_idempotent() {
    let mut clip = AnimationClip::new("Walk", 1.0);
    clip.create_track("Hip", ChannelMask::POSITION)
        .add_key_frame(key(0.0, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE));
    clip.create_track("Hip", ChannelMask::all());

    assert_eq!(clip.num_tracks(), 1);
    assert_eq!(clip.track("Hip").unwrap().num_key_frames(), 1);
}

#[test]
fn clip_remove_track_keeps_lookup_valid() {
    let mut clip = AnimationClip::new("Walk", 1.0);
    clip.create_track("A", ChannelMask::POSITION);
    clip.create_track("B", ChannelMask::POSITION);
    clip.create_track("C", ChannelMask::POSITION);

    assert!(clip.remove_track("A"));
    assert!(!clip.remove_track("A"));
    assert_eq!(clip.num_tracks(), 2);
    assert_eq!(clip.track("C").unwrap().name, "C");
    assert_eq!(clip.track("B").unwrap().name, "B");
}

#[test]
fn clip_triggers_sorted_and_normalized() {
    let mut clip = AnimationClip::new("Attack", 2.0);
    clip.add_trigger(1.5, false, "impact");
    clip.add_trigger(0.25, true, "windup");

    let triggers = clip.triggers();
    assert_eq!(triggers.len(), 2);
    assert_eq!(triggers[0].data, "windup");
    assert!(approx(triggers[0].time, 0.5));
    assert_eq!(triggers[1].data, "impact");
}

#[test]
fn clip_negative_length_clamps_to_zero() {
    assert_eq!(AnimationClip::new("Broken", -1.0).length(), 0.0);
}
