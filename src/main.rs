// SPDX-License-Identifier: GPL-3.0-only

use barcode_scanner::Config;
use barcode_scanner::constants::APP_ID;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

mod cli;

#[derive(Parser)]
#[command(name = "barcode-scanner")]
#[command(about = "Scan barcodes and QR codes from a camera or an image")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Config file (default: ~/.config/barcode-scanner/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Detect a barcode in an image file
    Image {
        /// Image to scan
        path: PathBuf,
    },

    /// Scan with the camera until a barcode is found
    Camera {
        /// Camera index to use (from 'barcode-scanner list')
        #[arg(short, long)]
        camera: Option<usize>,

        /// Give up after this many seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set RUST_LOG to control the log level, e.g. RUST_LOG=barcode_scanner=debug
    if let Err(e) = init_logging(cli.command.is_none()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let mut config = match &cli.config {
        Some(path) => match Config::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::load(),
    };

    let result = match cli.command {
        None => barcode_scanner::terminal::run(&config),
        Some(Commands::List) => cli::list_cameras(&config),
        Some(Commands::Image { path }) => cli::scan_image(&path),
        Some(Commands::Camera { camera, timeout }) => {
            if let Some(index) = camera {
                config.camera_index = index;
            }
            cli::scan_camera(&config, timeout)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr, or to a file in the cache directory while the terminal
/// screen owns the display
fn init_logging(to_file: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    if to_file {
        let dir = dirs::cache_dir()
            .ok_or("No cache directory available")?
            .join(APP_ID);
        std::fs::create_dir_all(&dir)?;
        let file = std::fs::File::create(dir.join(format!("{}.log", APP_ID)))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}
