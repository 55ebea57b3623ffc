//! Frame scheduling
//!
//! One frame of animated model work runs in phases with fixed thread
//! affinity:
//!
//! | Phase              | Runs on        | Touches                              |
//! |--------------------|----------------|--------------------------------------|
//! | notifications      | main           | dirty flags                          |
//! | pre-update         | rayon workers  | instance only, scene read-only       |
//! | apply animation    | main           | bone nodes (scene writes)            |
//! | batches            | rayon workers  | instance only, scene read-only       |
//! | skinning           | rayon workers  | skin matrices, scene read-only       |
//! | geometry           | main           | morph clones, forced animation       |
//!
//! Anything that writes to the scene graph is confined to the main thread;
//! worker phases only read it, which is why the graph must be `Sync`.

use rayon::prelude::*;

use crate::model::ModelKey;
use crate::model::animated_model::{AnimatedModel, UpdateOutcome};
use crate::model::registry::AnimatedModels;
use crate::scene::NodeGraph;
use crate::scene::camera::View;

/// Per-frame inputs.
#[derive(Clone, Copy)]
pub struct FrameInfo<'a> {
    pub frame_number: u32,
    /// Seconds since the previous frame.
    pub time_step: f32,
    /// Main view. Without one, every instance counts as visible.
    pub camera: Option<&'a dyn View>,
}

impl<'a> FrameInfo<'a> {
    #[must_use]
    pub fn new(frame_number: u32, time_step: f32) -> Self {
        Self {
            frame_number,
            time_step,
            camera: None,
        }
    }

    #[must_use]
    pub fn with_camera(mut self, camera: &'a dyn View) -> Self {
        self.camera = Some(camera);
        self
    }
}

impl std::fmt::Debug for FrameInfo<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameInfo")
            .field("frame_number", &self.frame_number)
            .field("time_step", &self.time_step)
            .field("has_camera", &self.camera.is_some())
            .finish()
    }
}

/// Where an instance's geometry update may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateGeometryType {
    /// Nothing to do.
    #[default]
    None,
    /// Morphs, software skinning or a forced animation update.
    MainThread,
    /// Skin matrices only.
    WorkerThread,
}

/// Counters of what one [`AnimatedModels::update_frame`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub animations_applied: usize,
    pub throttled: usize,
    pub invisible: usize,
    pub out_of_range: usize,
    pub bone_bounds_updated: usize,
    pub worker_skinned: usize,
    pub main_thread_updates: usize,
}

impl AnimatedModels {
    /// Runs every per-frame phase for all instances.
    ///
    /// Animation state sources are expected to have advanced their time
    /// before this is called. Views that rendered an instance must have
    /// called [`mark_in_view`](Self::mark_in_view) for `frame.frame_number`
    /// beforehand, otherwise the instance counts as invisible.
    pub fn update_frame<G: NodeGraph + Sync>(
        &mut self,
        frame: &FrameInfo<'_>,
        graph: &mut G,
    ) -> FrameReport {
        let mut report = FrameReport::default();

        // Transform changes made since the last frame
        self.dispatch_notifications(graph);
        for model in self.models.values_mut() {
            model.poll_state_source();
        }
        self.refresh_world_bounding_boxes(&*graph);

        // Pre-update: visibility, draw distance, animation LOD
        let outcomes: Vec<(ModelKey, UpdateOutcome)> = {
            let shared: &G = &*graph;
            let mut entries: Vec<(ModelKey, &mut AnimatedModel)> = self.models.iter_mut().collect();
            entries
                .par_iter_mut()
                .map(|(key, model)| (*key, model.update(frame, shared)))
                .collect()
        };

        let mut apply = self.scratch.acquire_empty(outcomes.len());
        for &(key, outcome) in &outcomes {
            match outcome {
                UpdateOutcome::ApplyAnimation => apply.push(key),
                UpdateOutcome::Throttled => report.throttled += 1,
                UpdateOutcome::Invisible => report.invisible += 1,
                UpdateOutcome::OutOfRange => report.out_of_range += 1,
                UpdateOutcome::BoneBoundsUpdated => report.bone_bounds_updated += 1,
                UpdateOutcome::Idle => {}
            }
        }

        // Scene writes stay on this thread
        report.animations_applied = apply.len();
        for &key in apply.iter() {
            self.apply_animation(key, graph);
        }
        self.scratch.release(apply);

        self.refresh_world_bounding_boxes(&*graph);

        if let Some(camera) = frame.camera {
            let shared: &G = &*graph;
            let frame_number = frame.frame_number;
            self.models
                .values_mut()
                .filter(|model| model.view_frame_number() == frame_number)
                .collect::<Vec<_>>()
                .into_par_iter()
                .for_each(|model| model.update_batches(camera, frame_number, shared));
        }

        // Geometry: skinning-only instances go to workers, the rest stay here
        let headless = frame.camera.is_none();
        let mut main_thread = self.scratch.acquire_empty(self.models.len());
        let mut workers: Vec<&mut AnimatedModel> = Vec::new();
        for (key, model) in &mut self.models {
            let out_of_view = !headless && model.view_frame_number() != frame.frame_number;
            if model.node().is_none() || out_of_view {
                continue;
            }
            match model.update_geometry_type() {
                UpdateGeometryType::WorkerThread => workers.push(model),
                UpdateGeometryType::MainThread => main_thread.push(key),
                UpdateGeometryType::None => {}
            }
        }

        report.worker_skinned = workers.len();
        {
            let shared: &G = &*graph;
            workers.into_par_iter().for_each(|model| model.update_skinning(shared));
        }

        report.main_thread_updates = main_thread.len();
        for &key in main_thread.iter() {
            self.update_geometry(key, frame, graph);
        }
        self.scratch.release(main_thread);

        log::trace!(
            "Frame {}: {} applied, {} throttled, {} skinned on workers, {} main-thread updates",
            frame.frame_number,
            report.animations_applied,
            report.throttled,
            report.worker_skinned,
            report.main_thread_updates
        );
        report
    }
}
