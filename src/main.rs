// SPDX-License-Identifier: GPL-3.0-only

use camera_uploader::backends::camera::{CameraBackendType, FacingMode};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-uploader")]
#[command(about = "Upload camera snapshots to a server ten times per second")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture and upload continuously (default)
    Run(RunArgs),

    /// List available cameras
    List {
        /// Camera backend to query (default: from config)
        #[arg(short, long, value_enum)]
        backend: Option<CameraBackendType>,

        /// Config file (default: ~/.config/camera-uploader/config.json)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Upload a single snapshot and exit
    Snap(RunArgs),
}

/// Options shared by `run` and `snap`, overriding the config file
#[derive(Args, Clone, Debug, Default)]
pub struct RunArgs {
    /// Server base URL, snapshots go to <URL>/upload
    #[arg(short, long)]
    pub server: Option<String>,

    /// Camera to start with
    #[arg(short, long, value_enum)]
    pub facing: Option<FacingMode>,

    /// Disable camera switching
    #[arg(long)]
    pub no_switch: bool,

    /// Camera backend
    #[arg(short, long, value_enum)]
    pub backend: Option<CameraBackendType>,

    /// Read commands from stdin instead of showing the terminal UI
    #[arg(long)]
    pub headless: bool,

    /// Config file (default: ~/.config/camera-uploader/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Run(cli.run));
    let interactive = matches!(&command, Commands::Run(args) if !args.headless);

    // Set RUST_LOG to control the log level, e.g. RUST_LOG=camera_uploader=debug
    init_logging(interactive)?;

    match command {
        Commands::Run(args) => cli::run_uploader(&args),
        Commands::List { backend, config } => cli::list_cameras(backend, config.as_deref()),
        Commands::Snap(args) => cli::snap(&args),
    }
}

/// Log to stderr, or to a file while the terminal UI owns the screen
fn init_logging(to_file: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    if to_file {
        let dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("camera-uploader");
        std::fs::create_dir_all(&dir)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("camera-uploader.log"))?;
        builder
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
    Ok(())
}
