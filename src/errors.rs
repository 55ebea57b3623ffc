//! Error Types
//!
//! This module defines the error types used by the animation core.
//!
//! # Overview
//!
//! Per-frame evaluation never fails: missing bone nodes, degenerate collision
//! volumes and unsupported skinning modes all degrade to safe fallbacks.
//! [`ArmatureError`] is reserved for:
//! - Construction-time validation of bone hierarchies
//! - Registry calls whose preconditions are not met (component not attached,
//!   unknown component key)
//!
//! Registry errors are logged at the call site as well, so callers that do not
//! care may simply discard the result.
//!
//! ```rust,ignore
//! use armature::errors::{ArmatureError, Result};
//!
//! fn build() -> Result<()> {
//!     let skeleton = Skeleton::from_bones(bones)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::model::ModelKey;

/// The main error type for the animation core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArmatureError {
    // ========================================================================
    // Scene Attachment Errors
    // ========================================================================
    /// The component is not attached to a scene node.
    #[error("Animated model is not attached to a scene node")]
    NotAttached,

    /// The component key does not refer to a live animated model.
    #[error("Unknown animated model: {0:?}")]
    UnknownModel(ModelKey),

    // ========================================================================
    // Skeleton Validation Errors
    // ========================================================================
    /// A bone refers to a parent outside the bone array.
    #[error("Bone {bone} refers to invalid parent index {parent}")]
    InvalidBoneParent {
        /// Index of the offending bone
        bone: usize,
        /// The parent index it refers to
        parent: usize,
    },

    /// Following parent indices from a bone never reaches a root.
    #[error("Bone {bone} is part of a parent cycle")]
    BoneHierarchyCycle {
        /// Index of a bone on the cycle
        bone: usize,
    },

    // ========================================================================
    // Indexing Errors
    // ========================================================================
    /// Index out of bounds.
    #[error("Index out of bounds: {context} (index: {index})")]
    IndexOutOfBounds {
        /// Description of what was being accessed
        context: String,
        /// The invalid index
        index: usize,
    },
}

/// Alias for `Result<T, ArmatureError>`.
pub type Result<T> = std::result::Result<T, ArmatureError>;
