//! Random sampling helpers shared by the formations.
//!
//! Every formation draws from a [`SampleContext`], which wraps a small RNG and
//! provides the distributions the shapes need (surface-uniform sphere,
//! volume-uniform ball, cube, annulus, rainbow hue).

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// RNG plus distribution helpers for formation sampling.
#[derive(Debug, Clone)]
pub struct SampleContext {
    rng: SmallRng,
}

impl SampleContext {
    /// Context seeded from the OS entropy source; every run differs.
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Context with a fixed seed, for reproducible output.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    // ========== Random primitives ==========

    /// Random f32 in `[0, 1)`.
    #[inline]
    pub fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Random f32 in `[min, max)`.
    #[inline]
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.rng.gen::<f32>() * (max - min)
    }

    /// Random f32 centered on zero with the given total spread.
    #[inline]
    pub fn jitter(&mut self, spread: f32) -> f32 {
        (self.random() - 0.5) * spread
    }

    // ========== Position helpers ==========

    /// Random point on the surface of a sphere.
    ///
    /// The polar angle is drawn as `acos(2u - 1)` so points do not bunch up at
    /// the poles.
    pub fn random_on_sphere(&mut self, radius: f32) -> Vec3 {
        let theta = self.random() * TAU;
        let phi = (2.0 * self.random() - 1.0).acos();
        spherical(radius, theta, phi)
    }

    /// Random point inside a solid ball, uniform by volume.
    pub fn random_in_sphere(&mut self, radius: f32) -> Vec3 {
        let r = radius * self.random().cbrt();
        self.random_on_sphere(r)
    }

    /// Random point inside an axis-aligned cube of the given side, centered at
    /// the origin.
    pub fn random_in_cube(&mut self, side: f32) -> Vec3 {
        Vec3::new(self.jitter(side), self.jitter(side), self.jitter(side))
    }

    /// Random point in a flat annulus in the XZ plane with a small vertical
    /// spread.
    ///
    /// The radius is drawn uniformly, not by area, so density rises toward the
    /// inner edge.
    pub fn random_in_annulus(&mut self, inner: f32, outer: f32, thickness: f32) -> Vec3 {
        let r = self.random_range(inner, outer);
        let theta = self.random() * TAU;
        let y = self.jitter(thickness);
        Vec3::new(r * theta.cos(), y, r * theta.sin())
    }

    // ========== Color helpers ==========

    /// Random RGB color, each channel independently uniform in `[0, 1)`.
    pub fn random_color(&mut self) -> Vec3 {
        Vec3::new(self.random(), self.random(), self.random())
    }

    /// Random hue at the given saturation and lightness, in linear RGB.
    pub fn random_hue(&mut self, saturation: f32, lightness: f32) -> Vec3 {
        let hue = self.random();
        srgb_to_linear(hsl_to_rgb(hue, saturation, lightness))
    }
}

impl Default for SampleContext {
    fn default() -> Self {
        Self::new()
    }
}

fn spherical(radius: f32, theta: f32, phi: f32) -> Vec3 {
    Vec3::new(
        radius * phi.sin() * theta.cos(),
        radius * phi.sin() * theta.sin(),
        radius * phi.cos(),
    )
}

/// Convert HSL (all components in `[0, 1]`) to sRGB-encoded RGB.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Vec3 {
    let h = h.rem_euclid(1.0);
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);

    if s == 0.0 {
        return Vec3::splat(l);
    }

    let p = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let q = 2.0 * l - p;

    Vec3::new(
        hue_channel(q, p, h + 1.0 / 3.0),
        hue_channel(q, p, h),
        hue_channel(q, p, h - 1.0 / 3.0),
    )
}

fn hue_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

/// Decode sRGB-encoded channels to linear RGB.
pub fn srgb_to_linear(c: Vec3) -> Vec3 {
    let decode = |v: f32| {
        if v < 0.04045 {
            v * 0.0773993808
        } else {
            (v * 0.9478672986 + 0.0521327014).powf(2.4)
        }
    };
    Vec3::new(decode(c.x), decode(c.y), decode(c.z))
}
