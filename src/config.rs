//! Launch-time tunables for the sampler and the animation engine.
//!
//! All values are fixed once an [`Engine`](crate::Engine) is built. A config
//! can be assembled with the `with_*` builder methods or loaded from JSON;
//! missing JSON fields fall back to the defaults below.
//!
//! ```ignore
//! let config = EngineConfig::new()
//!     .with_particle_count(50_000)
//!     .with_blend_factor(0.08);
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fs;
use std::path::Path;

/// Saturn formation: sphere + tilted ring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaturnConfig {
    /// Fraction of particles assigned to the planet body.
    pub sphere_fraction: f32,
    /// Radius of the planet surface.
    pub sphere_radius: f32,
    pub ring_inner_radius: f32,
    pub ring_outer_radius: f32,
    /// Total vertical spread of the ring before tilting.
    pub ring_thickness: f32,
    /// Rotation of the ring about the x-axis, in radians.
    pub ring_tilt: f32,
}

impl Default for SaturnConfig {
    fn default() -> Self {
        Self {
            sphere_fraction: 0.4,
            sphere_radius: 4.0,
            ring_inner_radius: 9.0,
            ring_outer_radius: 14.0,
            ring_thickness: 0.5,
            ring_tilt: PI / 6.0,
        }
    }
}

/// Text formation: glyph outline sampling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Strings longer than this many characters use the "long" size and cap.
    pub long_threshold: usize,
    pub short_size: f32,
    pub long_size: f32,
    pub short_cap: usize,
    pub long_cap: usize,
    /// Total z spread of the outline.
    pub thickness: f32,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            long_threshold: 10,
            short_size: 3.5,
            long_size: 2.5,
            short_cap: 2000,
            long_cap: 3000,
            thickness: 2.0,
        }
    }
}

impl TextConfig {
    /// Font size and active particle cap for a string.
    pub fn layout_for(&self, text: &str) -> (f32, usize) {
        if text.chars().count() > self.long_threshold {
            (self.long_size, self.long_cap)
        } else {
            (self.short_size, self.short_cap)
        }
    }
}

/// Complete engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of particles, fixed for the engine's lifetime.
    pub particle_count: usize,
    /// Per-frame exponential smoothing factor in Standard mode.
    pub blend_factor: f32,
    /// Seconds without rotation after a formation change.
    pub settle_duration: f32,
    /// Idle spin rate in radians per second once settled.
    pub rotation_rate: f32,
    /// Active particles in the Heart formation.
    pub heart_cap: usize,
    pub heart_scale: f32,
    /// Total z spread of the heart before scaling.
    pub heart_depth: f32,
    /// Radius of the volume-filled fallback sphere.
    pub sphere_radius: f32,
    /// Side length of the idle cube.
    pub cube_size: f32,
    pub saturn: SaturnConfig,
    pub text: TextConfig,
    /// Maximum interpreter steps one dynamic routine invocation may take.
    pub routine_step_budget: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            particle_count: 20_000,
            blend_factor: 0.05,
            settle_duration: 2.0,
            rotation_rate: 0.1,
            heart_cap: 4000,
            heart_scale: 0.5,
            heart_depth: 4.0,
            sphere_radius: 10.0,
            cube_size: 50.0,
            saturn: SaturnConfig::default(),
            text: TextConfig::default(),
            routine_step_budget: 50_000_000,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of particles.
    pub fn with_particle_count(mut self, count: usize) -> Self {
        self.particle_count = count;
        self
    }

    /// Set the Standard-mode blend factor (0 < factor <= 1).
    pub fn with_blend_factor(mut self, factor: f32) -> Self {
        self.blend_factor = factor;
        self
    }

    pub fn with_settle_duration(mut self, seconds: f32) -> Self {
        self.settle_duration = seconds;
        self
    }

    pub fn with_rotation_rate(mut self, radians_per_second: f32) -> Self {
        self.rotation_rate = radians_per_second;
        self
    }

    pub fn with_heart_cap(mut self, cap: usize) -> Self {
        self.heart_cap = cap;
        self
    }

    /// Set the short/long active caps for the Text formation.
    pub fn with_text_caps(mut self, short: usize, long: usize) -> Self {
        self.text.short_cap = short;
        self.text.long_cap = long;
        self
    }

    pub fn with_saturn(mut self, saturn: SaturnConfig) -> Self {
        self.saturn = saturn;
        self
    }

    pub fn with_routine_step_budget(mut self, steps: u64) -> Self {
        self.routine_step_budget = steps;
        self
    }

    /// Check that the values describe a usable engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particle_count == 0 {
            return Err(ConfigError::Invalid("particle_count must be at least 1".into()));
        }
        if !(self.blend_factor > 0.0 && self.blend_factor <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "blend_factor must be in (0, 1], got {}",
                self.blend_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.saturn.sphere_fraction) {
            return Err(ConfigError::Invalid(format!(
                "saturn.sphere_fraction must be in [0, 1], got {}",
                self.saturn.sphere_fraction
            )));
        }
        if self.saturn.ring_inner_radius > self.saturn.ring_outer_radius {
            return Err(ConfigError::Invalid(
                "saturn.ring_inner_radius exceeds ring_outer_radius".into(),
            ));
        }
        if self.settle_duration < 0.0 {
            return Err(ConfigError::Invalid("settle_duration must not be negative".into()));
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_configuration() {
        let config = EngineConfig::default();
        assert_eq!(config.particle_count, 20_000);
        assert_eq!(config.blend_factor, 0.05);
        assert_eq!(config.settle_duration, 2.0);
        assert_eq!(config.rotation_rate, 0.1);
        assert_eq!(config.heart_cap, 4000);
        assert!((config.saturn.ring_tilt - PI / 6.0).abs() < 1e-6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_text_layout_threshold() {
        let text = TextConfig::default();
        assert_eq!(text.layout_for("I LOVE YOU"), (3.5, 2000));
        assert_eq!(text.layout_for("HAPPY NEW YEAR"), (2.5, 3000));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "particle_count": 500, "saturn": { "sphere_radius": 2.0 } }"#)
                .unwrap();
        assert_eq!(config.particle_count, 500);
        assert_eq!(config.saturn.sphere_radius, 2.0);
        assert_eq!(config.saturn.ring_inner_radius, 9.0);
        assert_eq!(config.blend_factor, 0.05);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        let config = EngineConfig::new().with_particle_count(1234).with_heart_cap(100);
        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(EngineConfig::new().with_particle_count(0).validate().is_err());
        assert!(EngineConfig::new().with_blend_factor(0.0).validate().is_err());
        assert!(EngineConfig::new().with_blend_factor(1.5).validate().is_err());
    }
}
