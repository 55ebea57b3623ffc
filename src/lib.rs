#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod animation;
pub mod errors;
pub mod model;
pub mod resources;
pub mod scene;
pub mod settings;
pub mod utils;

pub use animation::{
    AnimationClip, AnimationController, AnimationState, AnimationStateSource, AnimationTrack,
    ChannelMask, KeyframeSet, VariantTrack,
};
pub use errors::{ArmatureError, Result};
pub use model::{
    AnimatedModel, AnimatedModels, FrameInfo, FrameReport, ModelKey, UpdateGeometryType,
};
pub use resources::{BoundingBox, Model};
pub use scene::{Bone, Camera, NodeGraph, NodeHandle, Scene, Skeleton, Transform, View};
pub use settings::SkinningSettings;
pub use utils::NameHash;
