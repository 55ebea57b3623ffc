//! Animation Controller
//!
//! High-level playback on top of [`AnimationState`]: play / stop with fades,
//! per-layer exclusivity, speed control, auto-fade of finished one-shots and
//! removal of faded-out states.
//!
//! The controller is the usual [`AnimationStateSource`] of a master animated
//! model. Share it as a [`SharedStateSource`](crate::animation::SharedStateSource)
//! and connect it to the model; advance it once per frame with
//! [`update`](AnimationController::update) before the model update runs.
//!
//! ```rust,ignore
//! let controller = Arc::new(Mutex::new(AnimationController::new()));
//! controller.lock().play(walk_clip, 0, true, 0.2);
//! models.connect_state_source(model, &(controller.clone() as SharedStateSource))?;
//!
//! // Every frame
//! let events = controller.lock().update(dt);
//! models.update_frame(&frame, &mut scene);
//! ```

use std::sync::Arc;

use crate::animation::clip::AnimationClip;
use crate::animation::source::AnimationStateSource;
use crate::animation::state::{AnimationBlendMode, AnimationState};
use crate::scene::NodeGraph;
use crate::scene::skeleton::Skeleton;
use crate::utils::NameHash;

/// Playback notifications produced by [`AnimationController::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationEvent {
    Finished {
        animation: NameHash,
    },
    Trigger {
        animation: NameHash,
        time: f32,
        data: String,
    },
}

#[derive(Debug, Clone)]
struct AnimationControl {
    hash: NameHash,
    speed: f32,
    target_weight: f32,
    fade_time: f32,
    auto_fade_time: f32,
    remove_on_completion: bool,
}

impl AnimationControl {
    fn new(hash: NameHash) -> Self {
        Self {
            hash,
            speed: 1.0,
            target_weight: 0.0,
            fade_time: 0.0,
            auto_fade_time: 0.0,
            remove_on_completion: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct AnimationController {
    states: Vec<AnimationState>,
    controls: Vec<AnimationControl>,
    order_dirty: bool,
    revision: u64,
}

impl AnimationController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn state_index(&self, hash: NameHash) -> Option<usize> {
        self.states.iter().position(|s| s.name_hash() == hash)
    }

    fn control_index(&self, hash: NameHash) -> Option<usize> {
        self.controls.iter().position(|c| c.hash == hash)
    }

    #[must_use]
    pub fn state(&self, name: &str) -> Option<&AnimationState> {
        self.state_index(NameHash::new(name)).map(|i| &self.states[i])
    }

    /// Direct access to a state. Counts as a pose change.
    pub fn state_mut(&mut self, name: &str) -> Option<&mut AnimationState> {
        let index = self.state_index(NameHash::new(name))?;
        self.touch();
        Some(&mut self.states[index])
    }

    /// Starts (or resumes) a clip, fading its weight in to 1.
    pub fn play(&mut self, clip: Arc<AnimationClip>, layer: u8, looped: bool, fade_in_time: f32) {
        let hash = clip.name_hash;

        let state_index = match self.state_index(hash) {
            Some(index) => index,
            None => {
                self.states.push(AnimationState::new(clip));
                self.order_dirty = true;
                self.states.len() - 1
            }
        };
        let control_index = match self.control_index(hash) {
            Some(index) => index,
            None => {
                self.controls.push(AnimationControl::new(hash));
                self.controls.len() - 1
            }
        };

        let state = &mut self.states[state_index];
        if state.layer() != layer {
            state.set_layer(layer);
            self.order_dirty = true;
        }
        state.set_looped(looped);

        let control = &mut self.controls[control_index];
        control.target_weight = 1.0;
        control.fade_time = fade_in_time;
        self.touch();
    }

    /// Plays a clip and fades out every other clip on the same layer.
    pub fn play_exclusive(
        &mut self,
        clip: Arc<AnimationClip>,
        layer: u8,
        looped: bool,
        fade_time: f32,
    ) {
        let name = clip.name.clone();
        self.play(clip, layer, looped, fade_time);
        self.fade_others(&name, 0.0, fade_time);
    }

    pub fn stop(&mut self, name: &str, fade_out_time: f32) -> bool {
        let hash = NameHash::new(name);
        let Some(index) = self.control_index(hash) else {
            return self.state_index(hash).is_some();
        };
        let control = &mut self.controls[index];
        control.target_weight = 0.0;
        control.fade_time = fade_out_time;
        true
    }

    pub fn stop_layer(&mut self, layer: u8, fade_out_time: f32) {
        for control in &mut self.controls {
            let on_layer = self
                .states
                .iter()
                .any(|s| s.name_hash() == control.hash && s.layer() == layer);
            if on_layer {
                control.target_weight = 0.0;
                control.fade_time = fade_out_time;
            }
        }
    }

    pub fn stop_all(&mut self, fade_out_time: f32) {
        for control in &mut self.controls {
            control.target_weight = 0.0;
            control.fade_time = fade_out_time;
        }
    }

    pub fn fade(&mut self, name: &str, target_weight: f32, fade_time: f32) -> bool {
        let Some(index) = self.control_index(NameHash::new(name)) else {
            return false;
        };
        let control = &mut self.controls[index];
        control.target_weight = target_weight.clamp(0.0, 1.0);
        control.fade_time = fade_time;
        true
    }

    /// Fades every other clip on the named clip's layer.
    pub fn fade_others(&mut self, name: &str, target_weight: f32, fade_time: f32) -> bool {
        let hash = NameHash::new(name);
        let (Some(_), Some(state_index)) = (self.control_index(hash), self.state_index(hash)) else {
            return false;
        };
        let layer = self.states[state_index].layer();

        for control in &mut self.controls {
            if control.hash == hash {
                continue;
            }
            let same_layer = self
                .states
                .iter()
                .any(|s| s.name_hash() == control.hash && s.layer() == layer);
            if same_layer {
                control.target_weight = target_weight.clamp(0.0, 1.0);
                control.fade_time = fade_time;
            }
        }
        true
    }

    pub fn set_layer(&mut self, name: &str, layer: u8) -> bool {
        let Some(index) = self.state_index(NameHash::new(name)) else {
            return false;
        };
        self.states[index].set_layer(layer);
        self.order_dirty = true;
        self.touch();
        true
    }

    pub fn set_start_bone(&mut self, name: &str, start_bone: Option<&str>) -> bool {
        let Some(index) = self.state_index(NameHash::new(name)) else {
            return false;
        };
        self.states[index].set_start_bone(start_bone);
        self.touch();
        true
    }

    pub fn set_time(&mut self, name: &str, time: f32) -> bool {
        let Some(index) = self.state_index(NameHash::new(name)) else {
            return false;
        };
        self.states[index].set_time(time);
        self.touch();
        true
    }

    pub fn set_speed(&mut self, name: &str, speed: f32) -> bool {
        let Some(index) = self.control_index(NameHash::new(name)) else {
            return false;
        };
        self.controls[index].speed = speed;
        true
    }

    /// Sets the weight immediately, cancelling any fade.
    pub fn set_weight(&mut self, name: &str, weight: f32) -> bool {
        let hash = NameHash::new(name);
        let (Some(control_index), Some(state_index)) =
            (self.control_index(hash), self.state_index(hash))
        else {
            return false;
        };
        self.states[state_index].set_weight(weight);
        let control = &mut self.controls[control_index];
        control.target_weight = self.states[state_index].weight();
        control.fade_time = 0.0;
        self.touch();
        true
    }

    pub fn set_looped(&mut self, name: &str, looped: bool) -> bool {
        let Some(index) = self.state_index(NameHash::new(name)) else {
            return false;
        };
        self.states[index].set_looped(looped);
        self.touch();
        true
    }

    pub fn set_blend_mode(&mut self, name: &str, mode: AnimationBlendMode) -> bool {
        let Some(index) = self.state_index(NameHash::new(name)) else {
            return false;
        };
        self.states[index].set_blend_mode(mode);
        self.touch();
        true
    }

    /// Fade-out time applied automatically when a non-looped clip ends.
    pub fn set_auto_fade(&mut self, name: &str, fade_out_time: f32) -> bool {
        let Some(index) = self.control_index(NameHash::new(name)) else {
            return false;
        };
        self.controls[index].auto_fade_time = fade_out_time.max(0.0);
        true
    }

    pub fn set_remove_on_completion(&mut self, name: &str, remove: bool) -> bool {
        let Some(index) = self.control_index(NameHash::new(name)) else {
            return false;
        };
        self.controls[index].remove_on_completion = remove;
        true
    }

    #[must_use]
    pub fn is_playing(&self, name: &str) -> bool {
        self.control_index(NameHash::new(name)).is_some()
    }

    #[must_use]
    pub fn is_playing_layer(&self, layer: u8) -> bool {
        self.controls.iter().any(|c| {
            self.states
                .iter()
                .any(|s| s.name_hash() == c.hash && s.layer() == layer)
        })
    }

    #[must_use]
    pub fn is_fading_in(&self, name: &str) -> bool {
        let hash = NameHash::new(name);
        match (self.control_index(hash), self.state_index(hash)) {
            (Some(c), Some(s)) => {
                let control = &self.controls[c];
                control.fade_time > 0.0 && control.target_weight > self.states[s].weight()
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn is_fading_out(&self, name: &str) -> bool {
        let hash = NameHash::new(name);
        match (self.control_index(hash), self.state_index(hash)) {
            (Some(c), Some(s)) => {
                let control = &self.controls[c];
                let state = &self.states[s];
                (control.fade_time > 0.0 && control.target_weight < state.weight())
                    || (!state.is_looped()
                        && state.time() >= state.length()
                        && control.auto_fade_time > 0.0)
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn is_at_end(&self, name: &str) -> bool {
        self.state(name)
            .is_some_and(|s| !s.is_looped() && s.time() >= s.length())
    }

    #[must_use]
    pub fn speed(&self, name: &str) -> f32 {
        self.control_index(NameHash::new(name))
            .map_or(0.0, |i| self.controls[i].speed)
    }

    #[must_use]
    pub fn fade_target(&self, name: &str) -> f32 {
        self.control_index(NameHash::new(name))
            .map_or(0.0, |i| self.controls[i].target_weight)
    }

    /// Advances every playing clip by `time_step`, processes fades and
    /// removes clips that have faded out.
    pub fn update(&mut self, time_step: f32) -> Vec<AnimationEvent> {
        let mut events = Vec::new();
        let mut changed = false;

        let mut i = 0;
        while i < self.controls.len() {
            let control = self.controls[i].clone();
            let Some(state_index) = self.state_index(control.hash) else {
                self.controls.remove(i);
                continue;
            };
            let state = &mut self.states[state_index];

            if control.speed != 0.0 {
                let advance = state.add_time(control.speed * time_step);
                changed = true;
                if advance.finished {
                    events.push(AnimationEvent::Finished {
                        animation: control.hash,
                    });
                }
                for trigger_index in advance.triggers {
                    if let Some(trigger) = state.clip().triggers().get(trigger_index) {
                        events.push(AnimationEvent::Trigger {
                            animation: control.hash,
                            time: trigger.time,
                            data: trigger.data.clone(),
                        });
                    }
                }
            }

            let mut target_weight = control.target_weight;
            let mut fade_time = control.fade_time;

            // Finished one-shots fade out automatically
            if !state.is_looped()
                && state.time() >= state.length()
                && control.auto_fade_time > 0.0
            {
                target_weight = 0.0;
                fade_time = control.auto_fade_time;
            }

            let current = state.weight();
            if current != target_weight {
                if fade_time > 0.0 {
                    let delta = time_step / fade_time;
                    let next = if current < target_weight {
                        (current + delta).min(target_weight)
                    } else {
                        (current - delta).max(target_weight)
                    };
                    state.set_weight(next);
                } else {
                    state.set_weight(target_weight);
                }
                changed = true;
            }

            let remove = state.weight() == 0.0
                && (target_weight == 0.0 || fade_time == 0.0)
                && control.remove_on_completion;

            if remove {
                self.states.remove(state_index);
                self.controls.remove(i);
                changed = true;
            } else {
                i += 1;
            }
        }

        if self.order_dirty {
            self.states.sort_by_key(AnimationState::layer);
            self.order_dirty = false;
        }

        if changed {
            self.touch();
        }
        events
    }
}

impl AnimationStateSource for AnimationController {
    fn animation_states(&self) -> &[AnimationState] {
        &self.states
    }

    fn apply_model_tracks(&mut self, skeleton: &Skeleton, graph: &mut dyn NodeGraph) {
        for state in &mut self.states {
            state.apply_model_tracks(skeleton, graph);
        }
    }

    fn mark_tracks_dirty(&mut self) {
        for state in &mut self.states {
            state.mark_tracks_dirty();
        }
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}
