//! Skinning Settings
//!
//! Chosen once, when an animated model is created. Changing them afterwards
//! requires re-setting the model so skin matrices, bone mappings and geometry
//! clones are rebuilt consistently.
//!
//! ```rust,ignore
//! use armature::settings::SkinningSettings;
//!
//! // Default: hardware skinning, 128 bones per batch
//! let settings = SkinningSettings::default();
//!
//! // CPU skinning with two influences per vertex
//! let settings = SkinningSettings {
//!     software_skinning: true,
//!     num_software_skinning_bones: 2,
//!     ..Default::default()
//! };
//! ```
//!
//! | Field                         | Default | Effect                                              |
//! |-------------------------------|---------|-----------------------------------------------------|
//! | `software_skinning`           | `false` | Skin vertices on the CPU; skinning becomes main-thread only |
//! | `num_software_skinning_bones` | `4`     | Influences used per vertex by CPU skinning (1..=4)  |
//! | `max_bones_per_batch`         | `128`   | Bone limit a model's geometry bone mappings target   |

use serde::{Deserialize, Serialize};

use crate::resources::MAX_VERTEX_BONES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinningSettings {
    pub software_skinning: bool,
    pub num_software_skinning_bones: u32,
    pub max_bones_per_batch: usize,
}

impl Default for SkinningSettings {
    fn default() -> Self {
        Self {
            software_skinning: false,
            num_software_skinning_bones: MAX_VERTEX_BONES as u32,
            max_bones_per_batch: 128,
        }
    }
}

impl SkinningSettings {
    /// Influences per vertex actually used by CPU skinning.
    #[must_use]
    pub fn software_bone_count(&self) -> usize {
        (self.num_software_skinning_bones as usize).clamp(1, MAX_VERTEX_BONES)
    }

    /// True if a skeleton this large needs per-geometry bone mappings.
    #[must_use]
    pub fn needs_bone_mappings(&self, num_bones: usize) -> bool {
        num_bones > self.max_bones_per_batch
    }
}
