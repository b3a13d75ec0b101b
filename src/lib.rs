//! # swarmform
//!
//! Gesture-driven particle formations.
//!
//! A fixed pool of particles flows between procedurally sampled shapes
//! (a ringed planet, a heart, glowing text, a rainbow ball, a loose cube) as
//! hand gestures come in, or hands control over to a small sandboxed routine
//! that rewrites every particle each frame.
//!
//! ## Quick Start
//!
//! ```no_run
//! use swarmform::prelude::*;
//!
//! let config = EngineConfig::new().with_particle_count(20_000);
//! let mut engine = Engine::new(config);
//!
//! // Once per detection cycle:
//! engine.handle_label("Finger Heart", 0.0);
//!
//! // Once per rendered frame:
//! engine.update(0.016);
//! if engine.take_dirty() {
//!     let frame = engine.frame(0.016);
//!     // upload frame.positions and frame.colors
//! #   let _ = frame;
//! }
//! ```
//!
//! ## Formations
//!
//! | Gesture | Formation |
//! |---------|-----------|
//! | Fist | Saturn: sphere plus tilted ring |
//! | V-Sign | Text "I LOVE YOU" |
//! | Finger Heart | Heart curve |
//! | Open Hand | Text "HAPPY NEW YEAR" |
//! | None / anything else | Cube |
//!
//! Text needs glyph outlines. Load a font through [`GlyphProvider`] and hand
//! it to the engine with [`GlyphSource::Provider`]; until it loads, or if it
//! fails, Text falls back to a sphere.
//!
//! ## Routines
//!
//! [`compile`] turns a loop body such as
//!
//! ```text
//! positions[i * 3] = Math.cos(i + time) * 10;
//! colors[i * 3 + 2] = 1;
//! ```
//!
//! into a [`Routine`]. [`Engine::install_routine`] runs it every frame until
//! [`Engine::cancel_dynamic`] is called or the routine fails at runtime, which
//! drops the engine back to blending. [`compile_prompt`] wires an external
//! [`CodeGenerator`] in front of the compiler.

pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod formation;
pub mod generator;
pub mod gesture;
pub mod glyph;
pub mod script;
mod spawn;

pub use bytemuck;
pub use buffer::ParticleBuffer;
pub use config::{EngineConfig, SaturnConfig, TextConfig};
pub use engine::{Engine, Frame, GlyphSource, Mode};
pub use error::{CompileError, ConfigError, GenerationError, GlyphError, RuntimeError};
pub use formation::{generate, Formation};
pub use generator::{compile_prompt, CodeGenerator, SYSTEM_PROMPT};
pub use gesture::{classify, Gesture, HandLandmarks, LANDMARK_COUNT};
pub use glam;
pub use glam::{Vec2, Vec3};
pub use glyph::{FontState, GlyphPath, GlyphProvider, OutlineFont, OutlineSource};
pub use script::{compile, compile_with_budget, strip_fences, Routine};
pub use spawn::{hsl_to_rgb, srgb_to_linear, SampleContext};

/// Convenient re-exports for common usage.
///
/// ```
/// use swarmform::prelude::*;
/// ```
pub mod prelude {
    pub use crate::buffer::ParticleBuffer;
    pub use crate::config::EngineConfig;
    pub use crate::engine::{Engine, GlyphSource, Mode};
    pub use crate::formation::Formation;
    pub use crate::generator::{compile_prompt, CodeGenerator};
    pub use crate::gesture::Gesture;
    pub use crate::glyph::{GlyphProvider, OutlineSource};
    pub use crate::script::{compile, Routine};
    pub use crate::spawn::SampleContext;
    pub use crate::{Vec2, Vec3};
}
