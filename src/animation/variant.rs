//! Generic value tracks
//!
//! A [`VariantTrack`] animates a single typed value (a float parameter, a
//! color, a visibility flag...) rather than a bone. Keyframes are checked for
//! a consistent value type, and spline tangents are precomputed, when the
//! track is committed.

use glam::{Quat, Vec2, Vec3, Vec4};

use crate::animation::keyframes::{Keyframe, KeyframeCursor, KeyframeSet};
use crate::animation::values::Interpolatable;
use crate::utils::NameHash;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimatedValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Quat(Quat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimatedValueType {
    Float,
    Int,
    Bool,
    Vec2,
    Vec3,
    Vec4,
    Quat,
}

impl AnimatedValue {
    #[must_use]
    pub fn value_type(&self) -> AnimatedValueType {
        match self {
            Self::Float(_) => AnimatedValueType::Float,
            Self::Int(_) => AnimatedValueType::Int,
            Self::Bool(_) => AnimatedValueType::Bool,
            Self::Vec2(_) => AnimatedValueType::Vec2,
            Self::Vec3(_) => AnimatedValueType::Vec3,
            Self::Vec4(_) => AnimatedValueType::Vec4,
            Self::Quat(_) => AnimatedValueType::Quat,
        }
    }

    /// Linear blend of two values of the same type. Discrete types and
    /// mismatched pairs step to `self`.
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        match (*self, *other) {
            (Self::Float(a), Self::Float(b)) => Self::Float(f32::interpolate_linear(a, b, t)),
            (Self::Vec2(a), Self::Vec2(b)) => Self::Vec2(Vec2::interpolate_linear(a, b, t)),
            (Self::Vec3(a), Self::Vec3(b)) => Self::Vec3(Vec3::interpolate_linear(a, b, t)),
            (Self::Vec4(a), Self::Vec4(b)) => Self::Vec4(Vec4::interpolate_linear(a, b, t)),
            (Self::Quat(a), Self::Quat(b)) => Self::Quat(Quat::interpolate_linear(a, b, t)),
            _ => *self,
        }
    }

    /// Hermite blend using precomputed tangents. Discrete types step.
    #[must_use]
    pub fn hermite(v0: &Self, tangent0: &Self, v1: &Self, tangent1: &Self, t: f32) -> Self {
        match (*v0, *tangent0, *v1, *tangent1) {
            (Self::Float(a), Self::Float(ta), Self::Float(b), Self::Float(tb)) => {
                Self::Float(f32::interpolate_cubic(a, ta, tb, b, t, 1.0))
            }
            (Self::Vec2(a), Self::Vec2(ta), Self::Vec2(b), Self::Vec2(tb)) => {
                Self::Vec2(Vec2::interpolate_cubic(a, ta, tb, b, t, 1.0))
            }
            (Self::Vec3(a), Self::Vec3(ta), Self::Vec3(b), Self::Vec3(tb)) => {
                Self::Vec3(Vec3::interpolate_cubic(a, ta, tb, b, t, 1.0))
            }
            (Self::Vec4(a), Self::Vec4(ta), Self::Vec4(b), Self::Vec4(tb)) => {
                Self::Vec4(Vec4::interpolate_cubic(a, ta, tb, b, t, 1.0))
            }
            (Self::Quat(a), Self::Quat(ta), Self::Quat(b), Self::Quat(tb)) => {
                Self::Quat(Quat::interpolate_cubic(a, ta, tb, b, t, 1.0))
            }
            _ => *v0,
        }
    }

    /// `(to - from) * scale` for continuous types, `None` for discrete ones.
    fn scaled_difference(from: &Self, to: &Self, scale: f32) -> Option<Self> {
        match (*from, *to) {
            (Self::Float(a), Self::Float(b)) => Some(Self::Float((b - a) * scale)),
            (Self::Vec2(a), Self::Vec2(b)) => Some(Self::Vec2((b - a) * scale)),
            (Self::Vec3(a), Self::Vec3(b)) => Some(Self::Vec3((b - a) * scale)),
            (Self::Vec4(a), Self::Vec4(b)) => Some(Self::Vec4((b - a) * scale)),
            (Self::Quat(a), Self::Quat(b)) => {
                let d = (Vec4::from(b) - Vec4::from(a)) * scale;
                Some(Self::Quat(Quat::from_vec4(d)))
            }
            _ => None,
        }
    }

    fn is_discrete(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Bool(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    Step,
    #[default]
    Linear,
    Spline,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantKeyFrame {
    pub time: f32,
    pub value: AnimatedValue,
}

impl Keyframe for VariantKeyFrame {
    #[inline]
    fn time(&self) -> f32 {
        self.time
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantTrack {
    pub name: String,
    pub name_hash: NameHash,
    pub interpolation: InterpolationMode,
    pub spline_tension: f32,

    key_frames: KeyframeSet<VariantKeyFrame>,
    value_type: Option<AnimatedValueType>,
    spline_tangents: Vec<AnimatedValue>,
}

impl VariantTrack {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            name_hash: NameHash::new(name),
            interpolation: InterpolationMode::Linear,
            spline_tension: 0.5,
            key_frames: KeyframeSet::new(),
            value_type: None,
            spline_tangents: Vec::new(),
        }
    }

    /// Adds a keyframe. Call [`commit`](Self::commit) once editing is done.
    pub fn add_key_frame(&mut self, time: f32, value: AnimatedValue) {
        self.key_frames.add_key_frame(VariantKeyFrame { time, value });
    }

    #[must_use]
    pub fn key_frames(&self) -> &KeyframeSet<VariantKeyFrame> {
        &self.key_frames
    }

    #[must_use]
    pub fn value_type(&self) -> Option<AnimatedValueType> {
        self.value_type
    }

    /// Validates value types and rebuilds spline tangents.
    ///
    /// The first keyframe decides the track type; keyframes of another type
    /// are dropped with a warning.
    pub fn commit(&mut self) {
        self.value_type = self.key_frames.first().map(|k| k.value.value_type());

        if let Some(value_type) = self.value_type {
            let total = self.key_frames.len();
            let kept: Vec<VariantKeyFrame> = self
                .key_frames
                .iter()
                .filter(|k| k.value.value_type() == value_type)
                .copied()
                .collect();
            if kept.len() != total {
                log::warn!(
                    "Variant track '{}': dropped {} keyframe(s) not of type {:?}",
                    self.name,
                    total - kept.len(),
                    value_type
                );
                self.key_frames = KeyframeSet::from_vec(kept);
            }
        }

        self.spline_tangents.clear();
        if self.interpolation != InterpolationMode::Spline {
            return;
        }

        let values: Vec<AnimatedValue> = self.key_frames.iter().map(|k| k.value).collect();
        let count = values.len();
        if count < 2 || values[0].is_discrete() {
            return;
        }

        let tension = self.spline_tension;
        for i in 0..count {
            let prev = &values[i.saturating_sub(1)];
            let next = &values[(i + 1).min(count - 1)];
            // One-sided difference at the ends
            let scale = if i == 0 || i == count - 1 { tension * 2.0 } else { tension };
            match AnimatedValue::scaled_difference(prev, next, scale) {
                Some(tangent) => self.spline_tangents.push(tangent),
                None => {
                    self.spline_tangents.clear();
                    return;
                }
            }
        }
    }

    /// Samples the track. Returns `None` for an empty track.
    pub fn sample(
        &self,
        time: f32,
        duration: f32,
        looped: bool,
        cursor: &mut KeyframeCursor,
    ) -> Option<AnimatedValue> {
        let span = self.key_frames.key_frames(time, duration, looped, cursor)?;
        let current = &self.key_frames[span.frame_index];
        let next = &self.key_frames[span.next_frame_index];

        if current.value.is_discrete() || span.blend_factor <= 0.0 {
            return Some(current.value);
        }

        let value = match self.interpolation {
            InterpolationMode::Step => current.value,
            InterpolationMode::Linear => current.value.lerp(&next.value, span.blend_factor),
            InterpolationMode::Spline => {
                match (
                    self.spline_tangents.get(span.frame_index),
                    self.spline_tangents.get(span.next_frame_index),
                ) {
                    (Some(t0), Some(t1)) => AnimatedValue::hermite(
                        &current.value,
                        t0,
                        &next.value,
                        t1,
                        span.blend_factor,
                    ),
                    _ => current.value.lerp(&next.value, span.blend_factor),
                }
            }
        };
        Some(value)
    }
}
