//! Asset-side data consumed by animated models
//!
//! - BoundingBox / Sphere: culling volumes
//! - VertexBuffer: CPU vertex streams with morph deltas
//! - Model: the shared asset (geometries, skeleton, bone mappings, morphs)
//! - ChangeTracker: version counter for committed vertex data

pub mod bounding;
pub mod model;
pub mod version_tracker;
pub mod vertex_buffer;

pub use bounding::{BoundingBox, Sphere};
pub use model::{BufferSource, Geometry, Model, MorphRange};
pub use version_tracker::ChangeTracker;
pub use vertex_buffer::{
    MAX_VERTEX_BONES, ModelMorph, MorphVertex, VertexBuffer, VertexBufferMorph, VertexMask,
};
