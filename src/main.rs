// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand, ValueEnum};
use scan_japan::config::{AppTheme, Config};
use scan_japan::constants::{DEFAULT_API_BASE_URL, MAX_DECODE_FPS};
use scan_japan::errors::AppResult;
use std::path::PathBuf;
use std::time::Duration;

mod cli;

#[derive(Parser)]
#[command(name = "scan-japan")]
#[command(about = "Scan barcodes and ingredient labels, and follow earthquakes in Japan")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Lookup service base URL
    #[arg(long, global = true, env = "SCAN_JAPAN_API_URL", default_value = DEFAULT_API_BASE_URL)]
    api_url: String,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    timeout: u64,

    /// Decode attempts per second (1-10)
    #[arg(long, global = true, default_value_t = MAX_DECODE_FPS)]
    decode_fps: u32,

    /// Do not start barcode scanning when the barcode tab opens
    #[arg(long, global = true)]
    no_auto_scan: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive terminal interface (default)
    Terminal,

    /// List available cameras
    List,

    /// Scan one barcode and look the product up
    Barcode {
        /// Camera index to use (from 'scan-japan list')
        #[arg(short, long)]
        camera: Option<usize>,

        /// Decode a still image instead of a camera
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Give up after this many seconds
        #[arg(long, default_value = "30")]
        wait: u64,

        /// Only print the decoded code
        #[arg(long)]
        no_lookup: bool,
    },

    /// Look up a product by barcode
    Lookup {
        /// EAN/UPC code
        code: String,
    },

    /// Photograph an ingredient label and analyse it
    Ingredients {
        /// Camera index to use (from 'scan-japan list')
        #[arg(short, long)]
        camera: Option<usize>,

        /// Analyse a still image instead of a camera
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// Show recent earthquakes
    Earthquakes {
        /// Bypass the service cache
        #[arg(short, long)]
        force: bool,
    },

    /// Show or change saved preferences
    Prefs {
        /// Language code, e.g. en or ja
        #[arg(short, long)]
        language: Option<String>,

        #[arg(short, long)]
        theme: Option<ThemeArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Dark,
    Light,
}

impl From<ThemeArg> for AppTheme {
    fn from(theme: ThemeArg) -> Self {
        match theme {
            ThemeArg::Dark => AppTheme::Dark,
            ThemeArg::Light => AppTheme::Light,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Commands::Terminal));
    init_logging(interactive);

    let config = Config {
        api_base_url: cli.api_url,
        decode_fps: cli.decode_fps.clamp(1, MAX_DECODE_FPS),
        request_timeout: Duration::from_secs(cli.timeout.max(1)),
        auto_start_decode: !cli.no_auto_scan,
        ..Config::default()
    };

    let result: AppResult<()> = match cli.command {
        None | Some(Commands::Terminal) => scan_japan::terminal::run(config),
        Some(Commands::List) => cli::list_cameras(),
        Some(Commands::Barcode {
            camera,
            image,
            wait,
            no_lookup,
        }) => cli::scan_barcode(&config, camera, image, Duration::from_secs(wait), !no_lookup),
        Some(Commands::Lookup { code }) => cli::lookup_product(&config, &code),
        Some(Commands::Ingredients { camera, image }) => cli::analyze_ingredients(&config, camera, image),
        Some(Commands::Earthquakes { force }) => cli::show_earthquakes(&config, force),
        Some(Commands::Prefs { language, theme }) => cli::preferences(language, theme.map(AppTheme::from)),
    };
    Ok(result?)
}

/// Set up tracing
///
/// Set RUST_LOG to control the level, e.g. RUST_LOG=scan_japan=debug. The
/// interactive interface owns the screen, so it logs to a file instead.
fn init_logging(interactive: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    if !interactive {
        builder.with_writer(std::io::stderr).init();
        return;
    }

    match open_log_file() {
        Some(file) => builder
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init(),
        None => builder.with_writer(std::io::sink).init(),
    }
}

fn open_log_file() -> Option<std::fs::File> {
    let dir = dirs::cache_dir()?.join("scan-japan");
    std::fs::create_dir_all(&dir).ok()?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("scan-japan.log"))
        .ok()
}
