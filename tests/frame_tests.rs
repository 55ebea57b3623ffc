//! Frame Update Tests
//!
//! Tests for:
//! - Headless frames applying animation from a state source
//! - Master-only animation on shared nodes
//! - Animation LOD throttling and multi-view LOD selection
//! - Invisible and out-of-range instances
//! - Worker vs main-thread geometry classification

use std::sync::Arc;

use glam::{Affine3A, Vec3};
use parking_lot::Mutex;

use armature::animation::{
    AnimationClip, AnimationController, ChannelMask, SharedStateSource, TransformKeyFrame,
};
use armature::resources::{
    Geometry, ModelMorph, MorphVertex, VertexBuffer, VertexBufferMorph, VertexMask,
};
use armature::scene::NodeGraph;
use armature::{
    AnimatedModels, Bone, BoundingBox, Camera, FrameInfo, FrameReport, Model, ModelKey, NodeHandle,
    Scene, Skeleton, SkinningSettings, Transform,
};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

fn rig(name: &str) -> Arc<Model> {
    let skeleton = Skeleton::from_bones(vec![
        Bone::new("Root", 0).with_sphere(1.0),
        Bone::new("Spine", 0).with_initial_transform(Transform::from_position(Vec3::Y)),
        Bone::new("Head", 1)
            .with_initial_transform(Transform::from_position(Vec3::Y))
            .with_offset_matrix(Affine3A::from_translation(Vec3::new(0.0, -2.0, 0.0)))
            .with_sphere(0.5),
    ])
    .unwrap();

    let buffer = VertexBuffer::new(vec![Vec3::ZERO, Vec3::Y, Vec3::new(0.0, 2.0, 0.0)]).with_skin(
        vec![[0, 0, 0, 0], [1, 0, 0, 0], [2, 0, 0, 0]],
        vec![[1.0, 0.0, 0.0, 0.0]; 3],
    );

    let mut model = Model::new(name);
    model.bounding_box = BoundingBox::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0));
    model.skeleton = skeleton;
    model.geometries = vec![Geometry::new(0, 0, 3)];
    model.geometry_centers = vec![Vec3::Y];
    model.geometry_bone_mappings = vec![Vec::new()];
    model.vertex_buffers = vec![Arc::new(buffer)];
    model.morphs = vec![ModelMorph::new(
        "Nod",
        vec![VertexBufferMorph {
            buffer_index: 0,
            element_mask: VertexMask::POSITION,
            vertices: vec![MorphVertex {
                index: 2,
                position: Vec3::Z,
                ..Default::default()
            }],
        }],
    )];
    model.update_morph_ranges();
    Arc::new(model)
}

/// 1s looping clip raising the head from (0, 1, 0) to (0, 5, 0).
fn nod_clip() -> Arc<AnimationClip> {
    let mut clip = AnimationClip::new("Nod", 1.0);
    let head = clip.create_track("Head", ChannelMask::POSITION);
    head.add_key_frame(TransformKeyFrame::new(0.0, Transform::from_position(Vec3::Y)));
    let raised = Transform::from_position(Vec3::new(0.0, 5.0, 0.0));
    head.add_key_frame(TransformKeyFrame::new(1.0, raised));
    Arc::new(clip)
}

fn playing_controller() -> Arc<Mutex<AnimationController>> {
    let controller = Arc::new(Mutex::new(AnimationController::new()));
    controller.lock().play(nod_clip(), 0, true, 0.0);
    controller
}

fn camera_at(position: Vec3) -> Camera {
    let mut camera = Camera::new_perspective();
    camera.set_world_transform(Affine3A::from_translation(position));
    camera
}

struct World {
    scene: Scene,
    models: AnimatedModels,
}

impl World {
    fn new() -> Self {
        Self {
            scene: Scene::new(),
            models: AnimatedModels::new(),
        }
    }

    fn spawn_on(&mut self, node: NodeHandle, settings: SkinningSettings) -> ModelKey {
        let key = self.models.create(settings);
        self.models.attach(key, node, &mut self.scene).unwrap();
        self.models.set_model(key, Some(rig("Body")), true, &mut self.scene).unwrap();
        key
    }

    fn spawn(&mut self, settings: SkinningSettings) -> ModelKey {
        let node = self.scene.add_node("Character");
        self.spawn_on(node, settings)
    }

    fn head_world(&self, key: ModelKey) -> Vec3 {
        let head = self
            .models
            .get(key)
            .and_then(|m| m.skeleton().bone_by_name("Head"))
            .and_then(|b| b.node)
            .unwrap();
        self.scene.world_transform(head).unwrap().translation.into()
    }

    fn frame(&mut self, frame: &FrameInfo<'_>) -> FrameReport {
        self.models.update_frame(frame, &mut self.scene)
    }
}

// ============================================================================
// Headless Frames
// ============================================================================

#[test]
fn headless_frame_applies_state_source() {
    let mut world = World::new();
    let key = world.spawn(SkinningSettings::default());

    let controller = playing_controller();
    let source: SharedStateSource = controller.clone();
    world.models.connect_state_source(key, &source).unwrap();
    controller.lock().update(0.5);

    let report = world.frame(&FrameInfo::new(1, 0.5));
    assert_eq!(report.animations_applied, 1);
    assert_eq!(report.worker_skinned, 1);
    assert_eq!(report.main_thread_updates, 0);

    // Spine at y = 1, head halfway through its track at local y = 3
    assert!(vec3_approx(world.head_world(key), Vec3::new(0.0, 4.0, 0.0)));

    let instance = world.models.get(key).unwrap();
    let head_skin = instance.skin_matrices()[2];
    assert!(vec3_approx(head_skin.translation.into(), Vec3::new(0.0, 2.0, 0.0)));
    assert!(!instance.is_animation_dirty());
    assert!(!instance.is_skinning_dirty());
    assert!(approx(instance.bone_bounding_box().max.y, 4.25));
}

#[test]
fn unchanged_frame_is_idle() {
    let mut world = World::new();
    let key = world.spawn(SkinningSettings::default());
    let controller = playing_controller();
    let source: SharedStateSource = controller.clone();
    world.models.connect_state_source(key, &source).unwrap();
    controller.lock().update(0.25);

    world.frame(&FrameInfo::new(1, 0.016));
    let report = world.frame(&FrameInfo::new(2, 0.016));
    assert_eq!(report, FrameReport::default());
}

#[test]
fn frame_without_source_only_refreshes_bounds() {
    let mut world = World::new();
    world.spawn(SkinningSettings::default());

    let report = world.frame(&FrameInfo::new(1, 0.016));
    assert_eq!(report.animations_applied, 0);
    assert_eq!(report.bone_bounds_updated, 1);
    assert_eq!(report.worker_skinned, 1);
}

#[test]
fn dropped_source_returns_to_bind_pose() {
    let mut world = World::new();
    let key = world.spawn(SkinningSettings::default());
    let controller = playing_controller();
    let source: SharedStateSource = controller.clone();
    world.models.connect_state_source(key, &source).unwrap();
    controller.lock().update(0.5);
    world.frame(&FrameInfo::new(1, 0.016));
    assert!(vec3_approx(world.head_world(key), Vec3::new(0.0, 4.0, 0.0)));

    drop(source);
    drop(controller);

    let report = world.frame(&FrameInfo::new(2, 0.016));
    assert_eq!(report.animations_applied, 1);
    assert!(vec3_approx(world.head_world(key), Vec3::new(0.0, 2.0, 0.0)));
    assert!(!world.models.get(key).unwrap().has_state_source());
}

#[test]
fn only_the_master_applies_animation() {
    let mut world = World::new();
    let node = world.scene.add_node("Character");
    let body = world.spawn_on(node, SkinningSettings::default());
    let armor = world.spawn_on(node, SkinningSettings::default());

    let controller = playing_controller();
    let source: SharedStateSource = controller.clone();
    world.models.connect_state_source(body, &source).unwrap();
    world.models.connect_state_source(armor, &source).unwrap();
    controller.lock().update(0.5);

    let report = world.frame(&FrameInfo::new(1, 0.016));
    assert_eq!(report.animations_applied, 1);
    // Both follow the shared bone nodes
    assert_eq!(report.worker_skinned, 2);
    assert_eq!(
        world.models.get(body).unwrap().skin_matrices(),
        world.models.get(armor).unwrap().skin_matrices()
    );
    assert_eq!(
        world.models.world_bounding_box(body),
        world.models.world_bounding_box(armor)
    );
}

// ============================================================================
// Animation LOD
// ============================================================================

#[test]
fn distant_model_is_throttled() {
    let mut world = World::new();
    let key = world.spawn(SkinningSettings::default());
    let controller = playing_controller();
    let source: SharedStateSource = controller.clone();
    world.models.connect_state_source(key, &source).unwrap();

    // About 100 units away with a LOD scale of 2: LOD distance ~50.
    // Each 0.012s step advances the timer by 30.
    let camera = camera_at(Vec3::new(0.0, 0.0, 100.0));
    let dt = 0.012;
    let mut run = |frame_number: u32| {
        controller.lock().update(dt);
        world.models.mark_in_view(key, frame_number).unwrap();
        world.frame(&FrameInfo::new(frame_number, dt).with_camera(&camera))
    };

    assert_eq!(run(1).animations_applied, 1);
    // Timer starts now
    assert_eq!(run(2).animations_applied, 1);
    let third = run(3);
    assert_eq!(third.animations_applied, 0);
    assert_eq!(third.throttled, 1);
    assert_eq!(run(4).animations_applied, 1);
    assert_eq!(run(5).throttled, 1);
}

#[test]
fn zero_lod_bias_disables_throttling() {
    let mut world = World::new();
    let key = world.spawn(SkinningSettings::default());
    world.models.get_mut(key).unwrap().set_animation_lod_bias(0.0);
    let controller = playing_controller();
    let source: SharedStateSource = controller.clone();
    world.models.connect_state_source(key, &source).unwrap();

    let camera = camera_at(Vec3::new(0.0, 0.0, 100.0));
    for frame_number in 1..=4 {
        controller.lock().update(0.012);
        world.models.mark_in_view(key, frame_number).unwrap();
        let report = world.frame(&FrameInfo::new(frame_number, 0.012).with_camera(&camera));
        assert_eq!(report.animations_applied, 1, "frame {frame_number}");
    }
}

#[test]
fn closest_view_drives_animation_lod() {
    let mut world = World::new();
    let key = world.spawn(SkinningSettings::default());
    let far = camera_at(Vec3::new(0.0, 0.0, 100.0));
    let near = camera_at(Vec3::new(0.0, 0.0, 10.0));

    world.models.update_batches(key, &far, 7, &world.scene).unwrap();
    world.models.update_batches(key, &near, 7, &world.scene).unwrap();
    let instance = world.models.get(key).unwrap();
    assert!(approx(instance.animation_lod_distance(), 5.0));
    assert!(approx(instance.lod_distance(), 5.0));

    // A new frame starts over from the first view
    world.models.update_batches(key, &far, 8, &world.scene).unwrap();
    assert!(approx(world.models.get(key).unwrap().animation_lod_distance(), 50.0));
}

// ============================================================================
// Visibility
// ============================================================================

#[test]
fn invisible_model_defers_animation_until_seen() {
    let mut world = World::new();
    let key = world.spawn(SkinningSettings::default());
    let controller = playing_controller();
    let source: SharedStateSource = controller.clone();
    world.models.connect_state_source(key, &source).unwrap();
    controller.lock().update(0.5);

    let camera = camera_at(Vec3::new(0.0, 0.0, 10.0));
    let report = world.frame(&FrameInfo::new(5, 0.016).with_camera(&camera));
    assert_eq!(report.invisible, 1);
    assert_eq!(report.animations_applied, 0);
    assert_eq!(report.worker_skinned + report.main_thread_updates, 0);

    let instance = world.models.get(key).unwrap();
    assert!(instance.is_force_animation_update());
    assert!(instance.is_animation_dirty());
    assert!(vec3_approx(world.head_world(key), Vec3::new(0.0, 2.0, 0.0)));

    // Seen again: the pending update runs on the main thread
    world.models.mark_in_view(key, 6).unwrap();
    let report = world.frame(&FrameInfo::new(6, 0.016).with_camera(&camera));
    assert_eq!(report.animations_applied, 1);
    assert_eq!(report.main_thread_updates, 1);
    assert!(!world.models.get(key).unwrap().is_force_animation_update());
    assert!(vec3_approx(world.head_world(key), Vec3::new(0.0, 4.0, 0.0)));
}

#[test]
fn update_invisible_respects_draw_distance() {
    let mut world = World::new();
    let key = world.spawn(SkinningSettings::default());
    {
        let instance = world.models.get_mut(key).unwrap();
        instance.set_update_invisible(true);
        instance.set_draw_distance(50.0);
    }
    let controller = playing_controller();
    let source: SharedStateSource = controller.clone();
    world.models.connect_state_source(key, &source).unwrap();
    controller.lock().update(0.5);

    let far = camera_at(Vec3::new(0.0, 0.0, 100.0));
    let report = world.frame(&FrameInfo::new(5, 0.016).with_camera(&far));
    assert_eq!(report.out_of_range, 1);
    assert_eq!(report.animations_applied, 0);

    let near = camera_at(Vec3::new(0.0, 0.0, 20.0));
    let report = world.frame(&FrameInfo::new(6, 0.016).with_camera(&near));
    assert_eq!(report.out_of_range, 0);
    assert_eq!(report.animations_applied, 1);
}

// ============================================================================
// Geometry Thread Affinity
// ============================================================================

#[test]
fn geometry_work_is_split_by_thread_affinity() {
    let mut world = World::new();
    let hardware = world.spawn(SkinningSettings::default());
    let software = world.spawn(SkinningSettings {
        software_skinning: true,
        ..Default::default()
    });
    let morphed = world.spawn(SkinningSettings::default());
    world.models.set_morph_weight_by_name(morphed, "Nod", 1.0).unwrap();

    let report = world.frame(&FrameInfo::new(1, 0.016));
    assert_eq!(report.worker_skinned, 1);
    assert_eq!(report.main_thread_updates, 2);

    for key in [hardware, software, morphed] {
        let instance = world.models.get(key).unwrap();
        assert!(!instance.is_skinning_dirty());
        assert!(!instance.is_morphs_dirty());
    }

    let morphed_model = world.models.get(morphed).unwrap();
    let morphed_clone = morphed_model.animator().unwrap().vertex_buffer(0).unwrap();
    assert!(vec3_approx(morphed_clone.positions[2], Vec3::new(0.0, 2.0, 1.0)));
}

#[test]
fn models_out_of_view_skip_geometry() {
    let mut world = World::new();
    let seen = world.spawn(SkinningSettings::default());
    world.spawn(SkinningSettings::default());

    let camera = camera_at(Vec3::new(0.0, 0.0, 10.0));
    world.models.mark_in_view(seen, 3).unwrap();
    let report = world.frame(&FrameInfo::new(3, 0.016).with_camera(&camera));
    assert_eq!(report.worker_skinned, 1);
    assert!(!world.models.get(seen).unwrap().is_skinning_dirty());
}
