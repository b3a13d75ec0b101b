//! Window, input and frame loop.
//!
//! Number keys stand in for a hand tracker: the held gesture is reported to
//! the engine every frame, the same way a detector would report its latest
//! classification.
//!
//! | Key | Gesture |
//! |-----|---------|
//! | 1 | Fist |
//! | 2 | V-Sign |
//! | 3 | Finger Heart |
//! | 4 | Open Hand |
//! | 0 | None |
//!
//! `R` loads the routine file or asks the generator for a new routine, `Esc`
//! returns to gesture control.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;

use swarmform::{compile_prompt, compile_with_budget, Engine, GenerationError, Gesture, Routine};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::clock::Clock;
use crate::generator::CommandGenerator;
use crate::gpu::GpuState;

const TITLE_INTERVAL: f32 = 0.5;

/// Where `R` gets its routine from.
pub enum RoutineSource {
    None,
    File(PathBuf),
    Generator {
        generator: CommandGenerator,
        prompt: String,
        credential: String,
    },
}

pub struct App {
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    engine: Engine,
    clock: Clock,
    gesture: Gesture,
    routines: RoutineSource,
    pending: Option<Receiver<Result<Routine, GenerationError>>>,
    mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
    last_title: f32,
}

impl App {
    pub fn new(engine: Engine, routines: RoutineSource) -> Self {
        Self {
            window: None,
            gpu_state: None,
            engine,
            clock: Clock::new(),
            gesture: Gesture::None,
            routines,
            pending: None,
            mouse_pressed: false,
            last_mouse_pos: None,
            last_title: f32::NEG_INFINITY,
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) {
        match code {
            KeyCode::Digit1 => self.gesture = Gesture::Fist,
            KeyCode::Digit2 => self.gesture = Gesture::VSign,
            KeyCode::Digit3 => self.gesture = Gesture::FingerHeart,
            KeyCode::Digit4 => self.gesture = Gesture::OpenHand,
            KeyCode::Digit0 => self.gesture = Gesture::None,
            KeyCode::KeyR => self.request_routine(),
            KeyCode::Escape => {
                if self.engine.cancel_dynamic() {
                    log::info!("back to gesture control");
                } else {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn request_routine(&mut self) {
        if self.pending.is_some() {
            log::warn!("a routine is already being generated");
            return;
        }

        let budget = self.engine.config().routine_step_budget;
        match &self.routines {
            RoutineSource::None => {
                log::warn!("no routine source configured (use --routine or --generator)");
            }
            RoutineSource::File(path) => {
                let result = std::fs::read_to_string(path)
                    .map_err(|e| e.to_string())
                    .and_then(|source| compile_with_budget(&source, budget).map_err(|e| e.to_string()));
                match result {
                    Ok(routine) => {
                        log::info!("running routine from {}", path.display());
                        self.engine.install_routine(routine);
                    }
                    Err(e) => log::error!("{}: {}", path.display(), e),
                }
            }
            RoutineSource::Generator {
                generator,
                prompt,
                credential,
            } => {
                let (tx, rx) = mpsc::channel();
                let generator = generator.clone();
                let prompt = prompt.clone();
                let credential = credential.clone();
                std::thread::spawn(move || {
                    let _ = tx.send(compile_prompt(&generator, &credential, &prompt, budget));
                });
                self.pending = Some(rx);
            }
        }
    }

    fn poll_pending(&mut self) {
        let Some(rx) = &self.pending else {
            return;
        };
        match rx.try_recv() {
            Ok(Ok(routine)) => {
                log::info!("running generated routine");
                self.engine.install_routine(routine);
                self.pending = None;
            }
            Ok(Err(e)) => {
                log::error!("{}", e);
                self.pending = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                log::error!("generator thread exited without a result");
                self.pending = None;
            }
        }
    }

    fn update_title(&mut self, time: f32) {
        if time - self.last_title < TITLE_INTERVAL {
            return;
        }
        self.last_title = time;
        if let Some(window) = &self.window {
            let busy = if self.pending.is_some() { " | generating..." } else { "" };
            window.set_title(&format!(
                "swarmform | {} | {} | {} | {:.0} fps{}",
                self.engine.formation().name(),
                self.engine.last_gesture().label(),
                self.engine.mode().name(),
                self.clock.fps(),
                busy,
            ));
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let time = self.clock.tick();
        self.engine.handle_gesture(self.gesture, time);
        self.poll_pending();
        self.engine.update(time);

        if let Some(gpu_state) = &mut self.gpu_state {
            if self.engine.take_dirty() {
                let frame = self.engine.frame(time);
                gpu_state.upload(frame.positions, frame.colors);
            }
            match gpu_state.render(self.engine.rotation_y(time)) {
                Ok(_) => {}
                Err(wgpu::SurfaceError::Lost) => gpu_state.resize(winit::dpi::PhysicalSize {
                    width: gpu_state.config.width,
                    height: gpu_state.config.height,
                }),
                Err(wgpu::SurfaceError::OutOfMemory) => event_loop.exit(),
                Err(e) => log::warn!("render error: {:?}", e),
            }
        }

        self.update_title(time);
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title("swarmform")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(GpuState::new(window.clone(), self.engine.current())) {
            Ok(gpu_state) => {
                self.gpu_state = Some(gpu_state);
                self.window = Some(window);
            }
            Err(e) => {
                log::error!("failed to initialize GPU: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.handle_key(event_loop, code);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.mouse_pressed = state == ElementState::Pressed;
                    if !self.mouse_pressed {
                        self.last_mouse_pos = None;
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.mouse_pressed {
                    if let Some((last_x, last_y)) = self.last_mouse_pos {
                        if let Some(gpu_state) = &mut self.gpu_state {
                            gpu_state
                                .camera
                                .orbit((position.x - last_x) as f32, (position.y - last_y) as f32);
                        }
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.camera.zoom(scroll);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}
