use std::sync::Arc;

use parking_lot::Mutex;

use crate::animation::state::AnimationState;
use crate::scene::NodeGraph;
use crate::scene::skeleton::Skeleton;

/// Provider of the weighted animation states applied to a master model.
///
/// The animated model only calls into this; it never blends tracks itself.
pub trait AnimationStateSource: Send {
    /// Currently active states, in application order.
    fn animation_states(&self) -> &[AnimationState];

    /// Applies every state's sampled tracks to the skeleton's bone nodes,
    /// writing silently.
    fn apply_model_tracks(&mut self, skeleton: &Skeleton, graph: &mut dyn NodeGraph);

    /// The skeleton or its node bindings changed; rebind tracks on next apply.
    fn mark_tracks_dirty(&mut self);

    /// Increases whenever the sampled pose may have changed.
    fn revision(&self) -> u64;
}

/// Shared handle to a state source. Models keep only a weak reference.
pub type SharedStateSource = Arc<Mutex<dyn AnimationStateSource>>;
