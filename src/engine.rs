//! The formation animation engine.
//!
//! [`Engine`] owns the live particle buffer and the target it blends toward.
//! Gestures pick the target; an installed [`Routine`] takes over the live
//! buffer entirely until it is cancelled or fails.
//!
//! ```no_run
//! use swarmform::prelude::*;
//!
//! let mut engine = Engine::new(EngineConfig::new().with_particle_count(5000));
//! engine.handle_label("Fist", 0.0);
//! for frame in 0..120 {
//!     let time = frame as f32 / 60.0;
//!     engine.update(time);
//!     let view = engine.frame(time);
//!     // upload view.positions / view.colors, rotate by view.rotation_y
//! #   let _ = view;
//! }
//! ```

use crate::buffer::ParticleBuffer;
use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::formation::{self, Formation};
use crate::gesture::Gesture;
use crate::glyph::{FontState, GlyphProvider, OutlineSource};
use crate::script::Routine;
use crate::spawn::SampleContext;
use std::sync::Arc;

/// What drives the live buffer each frame.
#[derive(Debug)]
pub enum Mode {
    /// Blend toward the gesture-selected target.
    Standard,
    /// Hand the live buffer to a routine every frame.
    Dynamic(Routine),
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Standard => "standard",
            Mode::Dynamic(_) => "dynamic",
        }
    }
}

/// Where Text formations get their outlines.
#[derive(Clone, Default)]
pub enum GlyphSource {
    /// No outlines; Text always falls back to Sphere.
    #[default]
    None,
    /// A ready outline source.
    Shared(Arc<dyn OutlineSource>),
    /// A load-once provider that may still be loading.
    Provider(&'static GlyphProvider),
}

impl std::fmt::Debug for GlyphSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GlyphSource::None => f.write_str("None"),
            GlyphSource::Shared(_) => f.write_str("Shared(..)"),
            GlyphSource::Provider(p) => f.debug_tuple("Provider").field(p).finish(),
        }
    }
}

/// Read-only view handed to the renderer.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub positions: &'a [f32],
    pub colors: &'a [f32],
    /// Rotation of the whole cloud about the Y axis, in radians.
    pub rotation_y: f32,
}

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    current: ParticleBuffer,
    target: Arc<ParticleBuffer>,
    formation: Formation,
    last_gesture: Gesture,
    /// Raw label of the last accepted detection; repeats are skipped.
    last_label: String,
    mode: Mode,
    formation_started: f32,
    target_epoch: u64,
    dirty: bool,
    glyphs: GlyphSource,
    ctx: SampleContext,
}

impl Engine {
    /// Create an engine whose live and target buffers hold the same random
    /// cube, so nothing moves until the first gesture.
    ///
    /// `config` is used as given; see [`Engine::try_new`] for a checked
    /// constructor.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_context(config, SampleContext::new())
    }

    /// Like [`Engine::new`], but rejects a config that fails
    /// [`EngineConfig::validate`].
    pub fn try_new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Like [`Engine::new`], sampling from the given context.
    pub fn with_context(config: EngineConfig, mut ctx: SampleContext) -> Self {
        let count = config.particle_count;
        let current = formation::generate(&Formation::Cube, count, &config, None, &mut ctx);
        let target = Arc::new(current.clone());
        Self {
            config,
            current,
            target,
            formation: Formation::Cube,
            last_gesture: Gesture::None,
            last_label: Gesture::None.label().to_string(),
            mode: Mode::Standard,
            formation_started: 0.0,
            target_epoch: 0,
            dirty: true,
            glyphs: GlyphSource::None,
            ctx,
        }
    }

    /// Set where Text formations get their outlines.
    pub fn with_glyphs(mut self, glyphs: GlyphSource) -> Self {
        self.glyphs = glyphs;
        self
    }

    pub fn set_glyphs(&mut self, glyphs: GlyphSource) {
        self.glyphs = glyphs;
    }

    // ========== Gestures and formations ==========

    /// Feed the latest tracker label. Returns whether a new target was built.
    ///
    /// A label equal to the previous one does nothing; any other label,
    /// recognized or not, builds its formation. While a routine is running
    /// labels are ignored and not remembered.
    pub fn handle_label(&mut self, label: &str, time: f32) -> bool {
        self.observe(label, Gesture::from_label(label), time)
    }

    /// Feed the latest gesture, debounced on its canonical label.
    pub fn handle_gesture(&mut self, gesture: Gesture, time: f32) -> bool {
        self.observe(gesture.label(), gesture, time)
    }

    fn observe(&mut self, label: &str, gesture: Gesture, time: f32) -> bool {
        if self.is_dynamic() {
            log::debug!("ignoring gesture {:?} while a routine is running", label);
            return false;
        }
        if label == self.last_label {
            return false;
        }
        log::debug!("gesture {:?} -> {:?}", self.last_label, label);
        self.last_label.clear();
        self.last_label.push_str(label);
        self.last_gesture = gesture;
        self.set_formation(gesture.formation(), time);
        true
    }

    /// Replace the target with a freshly sampled `formation` and restart the
    /// settle period at `time`.
    pub fn set_formation(&mut self, formation: Formation, time: f32) {
        let count = self.config.particle_count;
        let target = match (&formation, &self.glyphs) {
            (Formation::Text(_), GlyphSource::Shared(source)) => {
                formation::generate(&formation, count, &self.config, Some(source.as_ref()), &mut self.ctx)
            }
            (Formation::Text(_), GlyphSource::Provider(provider)) => {
                let font = match provider.state() {
                    FontState::Ready(font) => Some(font),
                    FontState::NotLoaded => {
                        log::info!("font still loading");
                        None
                    }
                    FontState::Failed(_) => None,
                };
                let source = font.as_deref().map(|f| f as &dyn OutlineSource);
                formation::generate(&formation, count, &self.config, source, &mut self.ctx)
            }
            _ => formation::generate(&formation, count, &self.config, None, &mut self.ctx),
        };

        log::info!("formation -> {}", formation.name());
        self.target = Arc::new(target);
        self.formation = formation;
        self.formation_started = time;
        self.target_epoch += 1;
    }

    // ========== Routines ==========

    /// Start running `routine` every frame, replacing any routine already
    /// running. The live buffer is left as it is.
    pub fn install_routine(&mut self, routine: Routine) {
        if self.is_dynamic() {
            log::info!("routine replaced");
        } else {
            log::info!("mode standard -> dynamic");
        }
        self.mode = Mode::Dynamic(routine);
    }

    /// Stop the running routine, if any. Returns whether one was running.
    pub fn cancel_dynamic(&mut self) -> bool {
        match std::mem::replace(&mut self.mode, Mode::Standard) {
            Mode::Dynamic(_) => {
                log::info!("mode dynamic -> standard (cancelled)");
                true
            }
            Mode::Standard => false,
        }
    }

    // ========== Per-frame ==========

    /// Advance one frame.
    ///
    /// In standard mode the live buffer blends toward the target. In dynamic
    /// mode the routine writes the live buffer; if it fails, its partial
    /// writes stay, the failure is logged and the engine returns to standard
    /// mode.
    pub fn update(&mut self, time: f32) {
        let failure = match &mut self.mode {
            Mode::Standard => {
                self.current.blend_toward(&self.target, self.config.blend_factor);
                None
            }
            Mode::Dynamic(routine) => {
                let count = self.current.len();
                let (positions, colors) = self.current.split_mut();
                routine.run(count, time as f64, positions, colors).err()
            }
        };

        if let Some(err) = failure {
            log::error!("routine failed, back to standard mode: {}", err);
            self.mode = Mode::Standard;
        }
        self.dirty = true;
    }

    /// Y rotation at `time`: zero during the settle period after a formation
    /// change, then a constant spin.
    pub fn rotation_y(&self, time: f32) -> f32 {
        let elapsed = time - self.formation_started;
        if elapsed < self.config.settle_duration {
            0.0
        } else {
            (elapsed - self.config.settle_duration) * self.config.rotation_rate
        }
    }

    pub fn frame(&self, time: f32) -> Frame<'_> {
        Frame {
            positions: self.current.positions(),
            colors: self.current.colors(),
            rotation_y: self.rotation_y(time),
        }
    }

    /// Whether the live buffer changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    // ========== Accessors ==========

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn current(&self) -> &ParticleBuffer {
        &self.current
    }

    pub fn target(&self) -> &Arc<ParticleBuffer> {
        &self.target
    }

    pub fn formation(&self) -> &Formation {
        &self.formation
    }

    pub fn last_gesture(&self) -> Gesture {
        self.last_gesture
    }

    pub fn last_label(&self) -> &str {
        &self.last_label
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.mode, Mode::Dynamic(_))
    }

    /// Number of targets built so far.
    pub fn target_epoch(&self) -> u64 {
        self.target_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::compile;
    use glam::Vec3;

    fn engine(count: usize) -> Engine {
        Engine::with_context(EngineConfig::new().with_particle_count(count), SampleContext::seeded(3))
    }

    #[test]
    fn test_starts_as_still_cube() {
        let mut e = engine(100);
        assert_eq!(e.formation(), &Formation::Cube);
        assert_eq!(e.last_gesture(), Gesture::None);
        assert_eq!(e.current().positions(), e.target().positions());
        assert!(e.take_dirty());
        assert!(!e.take_dirty());

        let before = e.current().clone();
        e.update(0.1);
        assert_eq!(&before, e.current());
    }

    #[test]
    fn test_try_new_validates() {
        assert!(Engine::try_new(EngineConfig::new().with_particle_count(10)).is_ok());
        let overshoot = EngineConfig::new().with_particle_count(10).with_blend_factor(1.5);
        assert!(matches!(Engine::try_new(overshoot), Err(ConfigError::Invalid(_))));
        assert!(Engine::try_new(EngineConfig::new().with_particle_count(0)).is_err());
    }

    #[test]
    fn test_gesture_builds_target_once() {
        let mut e = engine(200);
        assert!(!e.handle_label("None", 0.0));
        assert!(e.handle_label("Fist", 1.0));
        assert_eq!(e.formation(), &Formation::Saturn);
        assert_eq!(e.target_epoch(), 1);
        assert!(!e.handle_label("Fist", 1.1));
        assert_eq!(e.target_epoch(), 1);
    }

    #[test]
    fn test_rotation_after_settle() {
        let mut e = engine(10);
        e.handle_label("Finger Heart", 5.0);
        assert_eq!(e.rotation_y(5.0), 0.0);
        assert_eq!(e.rotation_y(6.9), 0.0);
        assert!((e.rotation_y(12.0) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_blend_step() {
        let mut e = engine(1);
        e.current.set(0, Vec3::ZERO, Vec3::ZERO);
        let mut target = ParticleBuffer::new(1);
        target.set(0, Vec3::splat(10.0), Vec3::splat(1.0));
        e.target = Arc::new(target);

        e.update(0.0);
        assert!((e.current().position(0) - Vec3::splat(0.5)).abs().max_element() < 1e-6);
        assert!((e.current().color(0) - Vec3::splat(0.05)).abs().max_element() < 1e-6);
    }

    #[test]
    fn test_dynamic_ignores_gestures() {
        let mut e = engine(50);
        e.install_routine(compile("positions[i * 3] = 1;").unwrap());
        assert!(e.is_dynamic());
        assert!(!e.handle_label("Fist", 0.5));
        assert_eq!(e.last_gesture(), Gesture::None);

        e.update(0.5);
        assert_eq!(e.current().position(7).x, 1.0);

        assert!(e.cancel_dynamic());
        assert!(!e.cancel_dynamic());
        assert!(e.handle_label("Fist", 1.0));
    }

    #[test]
    fn test_routine_swap_stays_dynamic() {
        let mut e = engine(5);
        e.install_routine(compile("positions[i * 3] = 1;").unwrap());
        e.install_routine(compile("positions[i * 3] = 2;").unwrap());
        e.update(0.0);
        assert_eq!(e.mode().name(), "dynamic");
        assert_eq!(e.current().position(4).x, 2.0);
    }

    #[test]
    fn test_failing_routine_falls_back() {
        let mut e = engine(4);
        e.install_routine(compile("positions[i * 3] = 5;\ncolors[count * 3 + 10] = 1;").unwrap());
        e.update(0.0);
        assert!(!e.is_dynamic());
        assert_eq!(e.current().position(0).x, 5.0);

        // Next frame blends from the partial write.
        let target_x = e.target().position(0).x;
        e.update(0.016);
        let expected = 5.0 + (target_x - 5.0) * 0.05;
        assert!((e.current().position(0).x - expected).abs() < 1e-4);
    }
}
