//! Animated model instances
//!
//! ```text
//!  AnimationStateSource ──apply──▶ bone nodes (NodeGraph)
//!                                      │ notifications
//!                                      ▼
//!  AnimatedModels ──────────────▶ AnimatedModel ──▶ SkinMatrices
//!   (registry, master/non-master)     │             (global + per-geometry)
//!                                     └──────────▶ SoftwareModelAnimator
//!                                                   (morphs, CPU skinning)
//! ```
//!
//! - [`AnimatedModel`]: per-instance dirty-flag state machine
//! - [`AnimatedModels`]: registry that owns every instance, groups them by
//!   scene node and implements the master/non-master protocol
//! - [`frame`]: per-frame phase scheduling and thread affinity

pub mod animated_model;
pub mod frame;
pub mod registry;
pub mod skinning;
pub mod software;

pub use animated_model::{AnimatedModel, UpdateOutcome};
pub use frame::{FrameInfo, FrameReport, UpdateGeometryType};
pub use registry::AnimatedModels;
pub use skinning::SkinMatrices;
pub use software::SoftwareModelAnimator;

use glam::Vec3;
use slotmap::new_key_type;

new_key_type! {
    /// Handle to an [`AnimatedModel`] owned by [`AnimatedModels`].
    pub struct ModelKey;
}

/// Threshold below which sizes, radii and blend factors count as zero.
pub const M_EPSILON: f32 = 1e-6;

/// Scales `animation_lod_bias * time_step` into LOD distance units.
pub const ANIMATION_LOD_BASESCALE: f32 = 2500.0;

/// Averages a bounding-box size into a single LOD scale.
pub const DOT_SCALE: Vec3 = Vec3::splat(1.0 / 3.0);
