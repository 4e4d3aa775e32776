use std::f32::consts::TAU;

use cgmath::{InnerSpace, Vector3};
use heart_flow::{
    data_structures::instance::Instance,
    flow::LoopState,
    scene::SceneConfig,
};

use crate::common::test_utils::{MemoryAssetSource, TestLoop, loaded_scene, start_scene};

mod common;

fn transforms(animation: &TestLoop) -> Vec<Instance> {
    let graph = animation.scene().graph();
    graph
        .descendants(graph.root())
        .into_iter()
        .map(|id| *graph.transform(id).unwrap())
        .collect()
}

fn heart_rotations(animation: &TestLoop) -> Vec<f32> {
    let scene = animation.scene();
    scene
        .hearts()
        .iter()
        .map(|&heart| scene.graph().transform(heart).unwrap().rotation.y.0)
        .collect()
}

/// Steps from `0` to `until` in increments of `dt`, ending exactly at `until`.
fn run_until(animation: &mut TestLoop, until: f32, dt: f32) {
    let steps = (until / dt).round() as usize;
    for i in 1..steps {
        animation.step(i as f32 * dt).unwrap();
    }
    animation.step(until).unwrap();
}

#[tokio::test]
async fn zero_delta_changes_nothing() {
    let config = SceneConfig::default();
    let mut animation = loaded_scene(MemoryAssetSource::complete(&config), &config, 2).await;
    animation.step(3.25).unwrap();
    let before = transforms(&animation);
    animation.step(3.25).unwrap();
    assert_eq!(transforms(&animation), before);
}

#[tokio::test]
async fn a_backwards_reading_changes_nothing() {
    let config = SceneConfig::default();
    let mut animation = loaded_scene(MemoryAssetSource::complete(&config), &config, 2).await;
    animation.step(3.0).unwrap();
    let before = transforms(&animation);
    animation.step(1.0).unwrap();
    assert_eq!(transforms(&animation), before);
    assert_eq!(animation.clock().previous(), 3.0);

    // time resumes from the latest reading
    animation.step(3.5).unwrap();
    let group = animation.scene().flower_text().unwrap();
    let scale = animation.scene().graph().transform(group).unwrap().scale.x;
    assert!((scale - (1.0 + 0.02 * 3.5)).abs() < 1e-6);
}

#[tokio::test]
async fn heart_rotation_is_independent_of_frame_rate() {
    let config = SceneConfig::default();
    let mut smooth = loaded_scene(MemoryAssetSource::complete(&config), &config, 4).await;
    let mut choppy = loaded_scene(MemoryAssetSource::complete(&config), &config, 4).await;

    run_until(&mut smooth, 10.0, 1.0 / 60.0);
    run_until(&mut choppy, 10.0, 2.5);

    // 0.5 rad/s for 10s is 5 rad, below one full turn
    for (a, b) in heart_rotations(&smooth).into_iter().zip(heart_rotations(&choppy)) {
        assert!((a - 5.0).abs() < 1e-3, "{}", a);
        assert!((b - 5.0).abs() < 1e-4, "{}", b);
    }
}

#[tokio::test]
async fn heart_rotation_wraps_around() {
    let config = SceneConfig::default();
    let mut animation = loaded_scene(MemoryAssetSource::complete(&config), &config, 4).await;
    run_until(&mut animation, 20.0, 0.5);
    for rotation in heart_rotations(&animation) {
        assert!((rotation - (10.0 - TAU)).abs() < 1e-3, "{}", rotation);
    }
}

#[tokio::test]
async fn flower_group_drifts_and_grows_with_time() {
    let config = SceneConfig::default();
    let mut animation = loaded_scene(MemoryAssetSource::complete(&config), &config, 6).await;
    let group = animation.scene().flower_text().unwrap();

    run_until(&mut animation, 12.0, 0.1);
    let transform = *animation.scene().graph().transform(group).unwrap();
    assert!((transform.position - Vector3::new(0.0, 12.0, -12.0)).magnitude() < 1e-3);
    let expected = 1.0 + 0.02 * 12.0;
    assert!((transform.scale - Vector3::new(expected, expected, expected)).magnitude() < 1e-5);
}

#[tokio::test]
async fn group_attached_later_only_moves_from_then_on() {
    let config = SceneConfig::default();
    let (mut animation, scheduler) = start_scene(MemoryAssetSource::complete(&config), &config, 8);
    // the loop is already running while the loads are in flight
    animation.step(0.0).unwrap();
    animation.step(4.0).unwrap();
    common::test_utils::settle(&scheduler).await;
    animation.step(4.0).unwrap();
    let group = animation.scene().flower_text().unwrap();

    animation.step(6.0).unwrap();
    let transform = *animation.scene().graph().transform(group).unwrap();
    assert!((transform.position - Vector3::new(0.0, 2.0, -2.0)).magnitude() < 1e-5);
    // growth is measured from the start of the loop
    assert!((transform.scale.x - 1.12).abs() < 1e-5);
}

#[tokio::test]
async fn frames_render_until_stopped() {
    let config = SceneConfig::default();
    let mut animation = loaded_scene(MemoryAssetSource::complete(&config), &config, 1).await;
    assert_eq!(animation.step(0.5).unwrap(), LoopState::Running);
    let rendered = animation.renderer().frames.len();

    let stop = animation.stop_signal();
    stop.stop();
    assert_eq!(animation.step(1.0).unwrap(), LoopState::Stopped);
    assert_eq!(animation.state(), LoopState::Stopped);
    assert_eq!(animation.renderer().frames.len(), rendered);
}

#[tokio::test]
async fn text_lines_stay_fixed_inside_the_group() {
    let config = SceneConfig::default();
    let mut animation = loaded_scene(MemoryAssetSource::complete(&config), &config, 1).await;
    run_until(&mut animation, 5.0, 0.25);

    let graph = animation.scene().graph();
    let text = graph.find("text").unwrap();
    let offsets: Vec<f32> = graph
        .children(text)
        .iter()
        .map(|&line| graph.transform(line).unwrap().position.y)
        .collect();
    assert_eq!(offsets, [0.0, -1.5, -3.0, -4.5, -6.0, -7.5, -9.0]);
}

#[tokio::test]
async fn resize_reaches_the_renderer() {
    let config = SceneConfig::default();
    let mut animation = loaded_scene(MemoryAssetSource::complete(&config), &config, 1).await;
    animation.resize(0, 0);
    assert_eq!(animation.renderer().resizes, 0);
    animation.resize(1024, 512);
    animation.set_device_pixel_ratio(3.0);
    animation.step(1.0).unwrap();
    assert_eq!(animation.renderer().resizes, 2);
    assert_eq!(animation.ctx().aspect(), 2.0);
    assert_eq!(animation.renderer().frames.last().unwrap().viewport, (2048, 1024));
}
