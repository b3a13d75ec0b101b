//! Engine behavior across frames: blending, debounce, routine fallback.

use std::sync::Arc;
use swarmform::prelude::*;
use swarmform::GenerationError;

fn engine(count: usize) -> Engine {
    Engine::with_context(EngineConfig::new().with_particle_count(count), SampleContext::seeded(42))
}

#[test]
fn test_blend_converges_without_overshoot() {
    let mut e = engine(300);
    e.handle_gesture(Gesture::Fist, 0.0);
    let target = Arc::clone(e.target());

    let mut prev_gap: Vec<f32> = e
        .current()
        .positions()
        .iter()
        .zip(target.positions())
        .map(|(c, t)| (t - c).abs())
        .collect();

    for frame in 1..=200 {
        e.update(frame as f32 / 60.0);
        for (k, (c, t)) in e.current().positions().iter().zip(target.positions()).enumerate() {
            let gap = (t - c).abs();
            assert!(gap <= prev_gap[k] + 1e-5, "component {} moved away at frame {}", k, frame);
            prev_gap[k] = gap;
        }
    }
    // 0.95^200 leaves well under 0.01% of the initial gap.
    assert!(prev_gap.iter().all(|&g| g < 1e-2));
}

#[test]
fn test_first_blend_step_is_five_percent() {
    let mut e = engine(20);
    e.handle_gesture(Gesture::FingerHeart, 0.0);
    let before = e.current().clone();
    let target = Arc::clone(e.target());
    e.update(0.0);

    for k in 0..before.positions().len() {
        let expected = before.positions()[k] + (target.positions()[k] - before.positions()[k]) * 0.05;
        assert!((e.current().positions()[k] - expected).abs() < 1e-4);
    }
}

#[test]
fn test_repeated_label_keeps_target() {
    let mut e = engine(100);
    assert!(e.handle_label("V-Sign", 0.0));
    let first = Arc::clone(e.target());

    assert!(!e.handle_label("V-Sign", 0.1));
    assert!(Arc::ptr_eq(&first, e.target()));

    assert!(e.handle_label("Open Hand", 0.2));
    assert!(!Arc::ptr_eq(&first, e.target()));
    assert_eq!(e.target_epoch(), 2);
}

#[test]
fn test_unknown_label_targets_cube() {
    let mut e = engine(100);
    e.handle_label("Fist", 0.0);
    assert!(e.handle_label("Thumbs Up", 1.0));
    assert_eq!(e.formation(), &Formation::Cube);
    assert_eq!(e.last_gesture(), Gesture::Unknown);
}

#[test]
fn test_distinct_unknown_labels_each_retarget() {
    let mut e = engine(100);
    assert!(e.handle_label("Thumbs Up", 0.0));
    let first = Arc::clone(e.target());

    assert!(e.handle_label("Rock On", 1.0));
    assert!(!Arc::ptr_eq(&first, e.target()));
    assert_eq!(e.last_label(), "Rock On");
    assert_eq!(e.target_epoch(), 2);

    assert!(!e.handle_label("Rock On", 1.1));
    assert_eq!(e.target_epoch(), 2);
}

#[test]
fn test_text_without_font_falls_back_to_sphere() {
    let provider: &'static GlyphProvider = Box::leak(Box::new(GlyphProvider::new()));
    let mut e = engine(100).with_glyphs(GlyphSource::Provider(provider));
    assert!(e.handle_gesture(Gesture::VSign, 0.0));
    let radius = e.config().sphere_radius;
    assert!((0..100).all(|i| e.target().position(i).length() <= radius + 1e-3));
}

#[test]
fn test_failing_routine_keeps_partial_writes() {
    let mut e = engine(8);
    let before = e.current().clone();
    let routine = compile("positions[i * 3] = 5;\ncolors[count * 3 + 10] = 1;").unwrap();
    e.install_routine(routine);
    e.update(0.0);

    assert!(!e.is_dynamic());
    assert_eq!(e.current().position(0).x, 5.0);
    // Only particle 0 ran before the failure.
    assert_eq!(e.current().position(1), before.position(1));
    assert_eq!(e.current().colors(), before.colors());
}

#[test]
fn test_routine_output_is_where_blending_resumes() {
    let mut e = engine(16);
    e.install_routine(compile("positions[i * 3 + 1] = 7; colors[i * 3] = 0;").unwrap());
    e.update(0.0);
    e.update(0.016);
    assert!(e.take_dirty());
    assert!((0..16).all(|i| e.current().position(i).y == 7.0));

    e.cancel_dynamic();
    let target_y = e.target().position(3).y;
    e.update(0.032);
    let expected = 7.0 + (target_y - 7.0) * 0.05;
    assert!((e.current().position(3).y - expected).abs() < 1e-4);
}

#[test]
fn test_failed_generation_leaves_mode_alone() {
    let mut e = engine(16);
    let generator = |_: &str, _: &str| -> Result<String, GenerationError> { Ok("positions[i] = ;".into()) };
    let result = compile_prompt(&generator, "key", "broken", 1_000);
    assert!(result.is_err());
    if let Ok(routine) = result {
        e.install_routine(routine);
    }
    assert!(!e.is_dynamic());
}

#[test]
fn test_rotation_waits_for_settle() {
    let mut e = engine(10);
    e.handle_gesture(Gesture::Fist, 10.0);
    assert_eq!(e.frame(11.5).rotation_y, 0.0);
    assert!((e.frame(14.0).rotation_y - 0.2).abs() < 1e-5);
}
