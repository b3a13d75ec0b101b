//! swarmform viewer: renders the engine in a window, with the keyboard
//! standing in for a hand tracker.

mod app;
mod camera;
mod clock;
mod generator;
mod gpu;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use swarmform::{Engine, EngineConfig, GlyphProvider, GlyphSource};
use winit::event_loop::{ControlFlow, EventLoop};

use app::{App, RoutineSource};
use generator::{CommandGenerator, CREDENTIAL_VAR};

#[derive(Parser, Debug)]
#[command(name = "swarmform-viewer")]
#[command(about = "Gesture-driven particle formations", long_about = None)]
struct Args {
    /// Engine configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// TrueType/OpenType font for the text formations
    #[arg(short, long)]
    font: Option<PathBuf>,

    /// Override the particle count from the config
    #[arg(short = 'n', long)]
    particles: Option<usize>,

    /// Routine file run when R is pressed
    #[arg(short, long, conflicts_with = "generator")]
    routine: Option<PathBuf>,

    /// Command that turns a prompt into routine source (prompt on stdin)
    #[arg(short, long, requires = "prompt")]
    generator: Option<String>,

    /// Prompt sent to the generator when R is pressed
    #[arg(short, long)]
    prompt: Option<String>,
}

fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(count) = args.particles {
        config = config.with_particle_count(count);
    }

    let glyphs = match args.font {
        Some(path) => {
            let provider = GlyphProvider::global();
            provider.spawn_load(path);
            GlyphSource::Provider(provider)
        }
        None => {
            log::warn!("no --font given; text formations will show a sphere");
            GlyphSource::None
        }
    };

    let routines = match (args.routine, args.generator) {
        (Some(path), _) => RoutineSource::File(path),
        (None, Some(command_line)) => {
            let generator = CommandGenerator::parse(&command_line)
                .context("--generator must name a command")?;
            let credential = std::env::var(CREDENTIAL_VAR).unwrap_or_default();
            if credential.is_empty() {
                log::warn!("{} is not set; generation requests will be rejected", CREDENTIAL_VAR);
            }
            RoutineSource::Generator {
                generator,
                prompt: args.prompt.unwrap_or_default(),
                credential,
            }
        }
        (None, None) => RoutineSource::None,
    };

    log::info!(
        "{} particles; keys 1-4 and 0 pick gestures, R runs a routine, Esc stops it",
        config.particle_count
    );
    let engine = Engine::try_new(config)
        .context("invalid configuration")?
        .with_glyphs(glyphs);

    let event_loop = EventLoop::new().context("creating event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(engine, routines);
    event_loop.run_app(&mut app).context("running event loop")?;
    Ok(())
}
