//! Formation sampling.
//!
//! [`generate`] turns a [`Formation`] and a particle count into a fresh,
//! fully populated [`ParticleBuffer`]. Output is random: repeated calls share
//! a statistical shape but not values.
//!
//! | Formation | Active particles | Coloring |
//! |-----------|------------------|----------|
//! | Saturn | all (40% sphere surface, 60% tilted ring) | flat blue / flat gold |
//! | Heart | `min(N, heart_cap)` | flat pink |
//! | Text | `min(N, text cap)` | flat gold |
//! | Sphere | all, volume-uniform ball | random hue per particle |
//! | Cube | all, uniform cube | random per channel |
//!
//! Inactive particles are parked at the origin with zero color.

use crate::buffer::ParticleBuffer;
use crate::config::EngineConfig;
use crate::glyph::{GlyphPath, OutlineSource};
use crate::spawn::SampleContext;
use glam::{Quat, Vec2, Vec3};
use std::f32::consts::TAU;

pub const SATURN_BODY_COLOR: Vec3 = Vec3::new(0.1, 0.3, 0.9);
pub const SATURN_RING_COLOR: Vec3 = Vec3::new(0.8, 0.7, 0.4);
pub const HEART_COLOR: Vec3 = Vec3::new(1.0, 0.4, 0.7);
pub const TEXT_COLOR: Vec3 = Vec3::new(0.8, 0.6, 0.0);

/// A named target shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Formation {
    /// Sphere surface plus a tilted ring.
    Saturn,
    /// Parametric heart curve with depth jitter.
    Heart,
    /// Outline-sampled glyphs of the given string.
    Text(String),
    /// Volume-filled rainbow ball; also the Text fallback.
    Sphere,
    /// Uniform random cube; the idle state.
    Cube,
}

impl Formation {
    pub fn text(s: impl Into<String>) -> Self {
        Formation::Text(s.into())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Formation::Saturn => "saturn",
            Formation::Heart => "heart",
            Formation::Text(_) => "text",
            Formation::Sphere => "sphere",
            Formation::Cube => "cube",
        }
    }
}

/// Sample `formation` for `count` particles.
///
/// `glyphs` is only consulted for [`Formation::Text`]; without it, or when the
/// string has no outline, Text falls back to [`Formation::Sphere`].
pub fn generate(
    formation: &Formation,
    count: usize,
    config: &EngineConfig,
    glyphs: Option<&dyn OutlineSource>,
    ctx: &mut SampleContext,
) -> ParticleBuffer {
    let mut buf = ParticleBuffer::new(count);
    match formation {
        Formation::Saturn => fill_saturn(&mut buf, config, ctx),
        Formation::Heart => fill_heart(&mut buf, config, ctx),
        Formation::Text(text) => {
            let filled = glyphs.is_some_and(|g| fill_text(&mut buf, text, g, config, ctx));
            if !filled {
                log::warn!("no glyph outlines for {:?}, using sphere", text);
                fill_sphere(&mut buf, config, ctx);
            }
        }
        Formation::Sphere => fill_sphere(&mut buf, config, ctx),
        Formation::Cube => fill_cube(&mut buf, config, ctx),
    }
    buf
}

fn fill_saturn(buf: &mut ParticleBuffer, config: &EngineConfig, ctx: &mut SampleContext) {
    let saturn = &config.saturn;
    let count = buf.len();
    let body = (count as f32 * saturn.sphere_fraction).floor() as usize;
    let tilt = Quat::from_rotation_x(saturn.ring_tilt);

    for i in 0..body {
        let p = ctx.random_on_sphere(saturn.sphere_radius);
        buf.set(i, p, SATURN_BODY_COLOR);
    }

    for i in body..count {
        let flat = ctx.random_in_annulus(
            saturn.ring_inner_radius,
            saturn.ring_outer_radius,
            saturn.ring_thickness,
        );
        buf.set(i, tilt * flat, SATURN_RING_COLOR);
    }
}

/// Point on the heart curve for parameter `t`, before scaling.
pub fn heart_curve(t: f32) -> Vec2 {
    let x = 16.0 * t.sin().powi(3);
    let y = 13.0 * t.cos() - 5.0 * (2.0 * t).cos() - 2.0 * (3.0 * t).cos() - (4.0 * t).cos();
    Vec2::new(x, y)
}

fn fill_heart(buf: &mut ParticleBuffer, config: &EngineConfig, ctx: &mut SampleContext) {
    let active = buf.len().min(config.heart_cap);
    let scale = config.heart_scale;

    for i in 0..active {
        let t = ctx.random() * TAU;
        let p = heart_curve(t);
        let z = ctx.jitter(config.heart_depth);
        buf.set(i, Vec3::new(p.x, p.y, z) * scale, HEART_COLOR);
    }
    for i in active..buf.len() {
        buf.park(i);
    }
}

/// Pick a path with probability proportional to its length.
///
/// Walks the paths subtracting each length from the draw until one covers
/// what remains. Falls back to the first path on rounding overshoot.
pub fn pick_weighted<'a>(paths: &'a [GlyphPath], lengths: &[f32], draw: f32) -> &'a GlyphPath {
    let mut remaining = draw;
    for (path, &len) in paths.iter().zip(lengths) {
        if remaining <= len {
            return path;
        }
        remaining -= len;
    }
    &paths[0]
}

/// Returns `false` when the string has nothing to sample.
fn fill_text(
    buf: &mut ParticleBuffer,
    text: &str,
    glyphs: &dyn OutlineSource,
    config: &EngineConfig,
    ctx: &mut SampleContext,
) -> bool {
    let (size, cap) = config.text.layout_for(text);
    let paths = glyphs.outline(text, size);
    let lengths: Vec<f32> = paths.iter().map(GlyphPath::length).collect();
    let total: f32 = lengths.iter().sum();
    if paths.is_empty() || total <= 0.0 {
        return false;
    }

    let active = buf.len().min(cap);
    let mut min = Vec2::splat(f32::INFINITY);
    let mut max = Vec2::splat(f32::NEG_INFINITY);

    for i in 0..active {
        let path = pick_weighted(&paths, &lengths, ctx.random() * total);
        let p = path.point_at(ctx.random());
        let z = ctx.jitter(config.text.thickness);
        min = min.min(p);
        max = max.max(p);
        buf.set(i, Vec3::new(p.x, p.y, z), TEXT_COLOR);
    }

    if active > 0 {
        let center = (min + max) * 0.5;
        for i in 0..active {
            let p = buf.position(i);
            buf.set_position(i, Vec3::new(p.x - center.x, p.y - center.y, p.z));
        }
    }

    for i in active..buf.len() {
        buf.park(i);
    }
    true
}

fn fill_sphere(buf: &mut ParticleBuffer, config: &EngineConfig, ctx: &mut SampleContext) {
    for i in 0..buf.len() {
        let p = ctx.random_in_sphere(config.sphere_radius);
        let c = ctx.random_hue(1.0, 0.5);
        buf.set(i, p, c);
    }
}

fn fill_cube(buf: &mut ParticleBuffer, config: &EngineConfig, ctx: &mut SampleContext) {
    for i in 0..buf.len() {
        let p = ctx.random_in_cube(config.cube_size);
        let c = ctx.random_color();
        buf.set(i, p, c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One unit square contour per character, 2 units apart.
    struct Boxes;

    impl OutlineSource for Boxes {
        fn outline(&self, text: &str, size: f32) -> Vec<GlyphPath> {
            text.chars()
                .enumerate()
                .filter(|(_, c)| !c.is_whitespace())
                .filter_map(|(k, _)| {
                    let x = k as f32 * 2.0 * size;
                    GlyphPath::new(
                        vec![
                            Vec2::new(x, 0.0),
                            Vec2::new(x + size, 0.0),
                            Vec2::new(x + size, size),
                            Vec2::new(x, size),
                        ],
                        true,
                    )
                })
                .collect()
        }
    }

    fn check_valid(buf: &ParticleBuffer, count: usize) {
        assert_eq!(buf.positions().len(), count * 3);
        assert_eq!(buf.colors().len(), count * 3);
        assert!(buf.positions().iter().all(|v| v.is_finite()));
        assert!(buf.colors().iter().all(|c| (0.0..=1.0).contains(c)));
    }

    #[test]
    fn test_all_formations_valid_for_small_counts() {
        let config = EngineConfig::default();
        let mut ctx = SampleContext::seeded(7);
        let formations = [
            Formation::Saturn,
            Formation::Heart,
            Formation::text("HI"),
            Formation::Sphere,
            Formation::Cube,
        ];
        for count in [1, 2, 3, 17] {
            for f in &formations {
                let buf = generate(f, count, &config, Some(&Boxes), &mut ctx);
                check_valid(&buf, count);
            }
        }
    }

    #[test]
    fn test_saturn_split_and_colors() {
        let config = EngineConfig::default();
        let mut ctx = SampleContext::seeded(8);
        let buf = generate(&Formation::Saturn, 1000, &config, None, &mut ctx);
        let untilt = Quat::from_rotation_x(-config.saturn.ring_tilt);

        for i in 0..400 {
            assert!((buf.position(i).length() - 4.0).abs() < 1e-3);
            assert_eq!(buf.color(i), SATURN_BODY_COLOR);
        }
        for i in 400..1000 {
            let flat = untilt * buf.position(i);
            let r = Vec2::new(flat.x, flat.z).length();
            assert!(r >= 9.0 - 1e-3 && r <= 14.0 + 1e-3, "ring radius {r}");
            assert!(flat.y.abs() <= 0.25 + 1e-3);
            assert_eq!(buf.color(i), SATURN_RING_COLOR);
        }
    }

    #[test]
    fn test_heart_parks_excess_particles() {
        let config = EngineConfig::default();
        let mut ctx = SampleContext::seeded(9);
        let buf = generate(&Formation::Heart, 10_000, &config, None, &mut ctx);

        let parked = (0..10_000).filter(|&i| buf.is_parked(i)).count();
        assert_eq!(parked, 6000);
        assert!((4000..10_000).all(|i| buf.is_parked(i)));
        assert!((0..4000).all(|i| buf.color(i) == HEART_COLOR));
    }

    #[test]
    fn test_heart_points_lie_on_curve() {
        let config = EngineConfig::default();
        let mut ctx = SampleContext::seeded(10);
        let buf = generate(&Formation::Heart, 500, &config, None, &mut ctx);

        for i in 0..500 {
            let p = buf.position(i) / config.heart_scale;
            // Recover t from x = 16 sin^3(t): two candidates per x.
            let s = (p.x / 16.0).cbrt().clamp(-1.0, 1.0);
            let t0 = s.asin();
            let on_curve = [t0, std::f32::consts::PI - t0]
                .iter()
                .any(|&t| (heart_curve(t).y - p.y).abs() < 0.05);
            assert!(on_curve, "particle {i} at {p:?} is off the curve");
            assert!(p.z.abs() <= 2.0);
        }
    }

    #[test]
    fn test_text_is_centered() {
        let config = EngineConfig::default();
        let mut ctx = SampleContext::seeded(11);
        let buf = generate(&Formation::text("I LOVE YOU"), 5000, &config, Some(&Boxes), &mut ctx);

        let active = config.text.short_cap;
        let mut min = Vec2::splat(f32::INFINITY);
        let mut max = Vec2::splat(f32::NEG_INFINITY);
        for i in 0..active {
            let p = buf.position(i).truncate();
            min = min.min(p);
            max = max.max(p);
            assert_eq!(buf.color(i), TEXT_COLOR);
        }
        assert!(((min + max) * 0.5).length() < 1e-3);
        assert!((active..5000).all(|i| buf.is_parked(i)));
    }

    #[test]
    fn test_long_text_uses_long_cap() {
        let config = EngineConfig::default();
        let mut ctx = SampleContext::seeded(12);
        let buf = generate(&Formation::text("HAPPY NEW YEAR"), 5000, &config, Some(&Boxes), &mut ctx);
        let active = (0..5000).filter(|&i| !buf.is_parked(i)).count();
        assert_eq!(active, 3000);
    }

    #[test]
    fn test_text_without_glyphs_falls_back_to_sphere() {
        let config = EngineConfig::default();
        let mut ctx = SampleContext::seeded(13);
        let buf = generate(&Formation::text("HELLO"), 300, &config, None, &mut ctx);
        assert!((0..300).all(|i| buf.position(i).length() <= 10.0 + 1e-3));
        assert!((0..300).all(|i| buf.color(i) != TEXT_COLOR));

        let blank = generate(&Formation::text("   "), 300, &config, Some(&Boxes), &mut ctx);
        assert!((0..300).all(|i| blank.position(i).length() <= 10.0 + 1e-3));
    }

    #[test]
    fn test_weighted_pick_follows_lengths() {
        let short = GlyphPath::new(vec![Vec2::ZERO, Vec2::new(1.0, 0.0)], false).unwrap();
        let long = GlyphPath::new(vec![Vec2::ZERO, Vec2::new(3.0, 0.0)], false).unwrap();
        let paths = vec![short, long];
        let lengths = [1.0, 3.0];

        assert_eq!(pick_weighted(&paths, &lengths, 0.5).length(), 1.0);
        assert_eq!(pick_weighted(&paths, &lengths, 1.0).length(), 1.0);
        assert_eq!(pick_weighted(&paths, &lengths, 1.5).length(), 3.0);
        assert_eq!(pick_weighted(&paths, &lengths, 3.9).length(), 3.0);
        // Overshoot from rounding lands on the first path.
        assert_eq!(pick_weighted(&paths, &lengths, 4.5).length(), 1.0);
    }

    #[test]
    fn test_cube_and_sphere_ranges() {
        let config = EngineConfig::default();
        let mut ctx = SampleContext::seeded(14);
        let cube = generate(&Formation::Cube, 2000, &config, None, &mut ctx);
        assert!(cube.positions().iter().all(|v| v.abs() <= 25.0));

        let sphere = generate(&Formation::Sphere, 2000, &config, None, &mut ctx);
        assert!((0..2000).all(|i| sphere.position(i).length() <= 10.0 + 1e-3));
    }
}
