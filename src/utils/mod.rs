//! Utility Module
//!
//! - [`NameHash`]: stable hashing of bone, track and morph names
//! - [`ScratchPool`]: reusable per-frame buffers
//!
//! # Name Hashing
//!
//! Lookups throughout the animation core go through [`NameHash`] so that
//! comparisons are O(1) integer compares.
//!
//! ```rust,ignore
//! use armature::utils::NameHash;
//!
//! let a = NameHash::new("Bip01_Head");
//! let b = NameHash::from("Bip01_Head");
//! assert_eq!(a, b);
//! ```

pub mod hash;
pub mod scratch;

pub use hash::NameHash;
pub use scratch::{ScratchBuffer, ScratchPool};
