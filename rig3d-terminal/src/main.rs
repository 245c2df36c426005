//! rig3d terminal viewer
//!
//! Renders the robot arm or the cylinder showcase as shaded ASCII.
//! Controls:
//!   - WASD / Arrow Keys: Orbit the camera
//!   - +/-: Zoom
//!   - Tab, [ and ]: Select and adjust a robot joint; R resets the pose
//!   - 1/2/3, G, X: Toggle grids, ground and axes
//!   - Q/ESC: Quit

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use rig3d_core::{load_segment_file, SceneKind};
use rig3d_terminal::{AppError, AppOptions, TerminalApp};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "rig3d-terminal", version, about = "Terminal viewer for hierarchical 3D scenes")]
struct Args {
    /// Scene to show: robot or cylinders
    #[arg(long, default_value_t = SceneKind::Robot)]
    scene: SceneKind,

    /// Segment file with extra cylinders to add to the scene
    #[arg(long, value_name = "FILE")]
    segments: Option<PathBuf>,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Hide grids, ground and axes at startup
    #[arg(long)]
    no_helpers: bool,

    /// Write logs here; filter with RUST_LOG (default: warn)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

fn init_logging(path: &Path) -> Result<(), AppError> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))
}

fn run(args: Args) -> Result<(), AppError> {
    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }

    let segments = match &args.segments {
        Some(path) => {
            let segments = load_segment_file(path)?;
            println!("Loaded {} segments from {}", segments.len(), path.display());
            segments
        }
        None => Vec::new(),
    };

    println!("Starting rig3d ({}), press Q to quit...", args.scene);
    std::thread::sleep(std::time::Duration::from_millis(500));

    let mut app = TerminalApp::new(AppOptions {
        scene: args.scene,
        segments,
        show_helpers: !args.no_helpers,
        fps: args.fps,
    })?;
    app.run()
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rig3d: {e}");
            ExitCode::FAILURE
        }
    }
}
