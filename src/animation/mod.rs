//! Animation data and playback
//!
//! - Keyframes: time-sorted storage with cursor-based lookup
//! - Tracks: per-bone transform tracks and typed variant tracks
//! - Clip: the animation asset
//! - State / Controller: weighted playback applied onto bone nodes

mod values;
pub mod binder;
pub mod clip;
pub mod controller;
pub mod keyframes;
pub mod source;
pub mod state;
pub mod tracks;
pub mod variant;

pub use binder::{Binder, ModelTrackBinding};
pub use clip::{AnimationClip, AnimationTriggerPoint};
pub use controller::{AnimationController, AnimationEvent};
pub use keyframes::{Keyframe, KeyframeCursor, KeyframeSet, KeyframeSpan, ValueKeyFrame};
pub use source::{AnimationStateSource, SharedStateSource};
pub use state::{AnimationBlendMode, AnimationState, TimeAdvance};
pub use tracks::{AnimationTrack, ChannelMask, ChannelWeights, TransformKeyFrame};
pub use values::Interpolatable;
pub use variant::{
    AnimatedValue, AnimatedValueType, InterpolationMode, VariantKeyFrame, VariantTrack,
};
