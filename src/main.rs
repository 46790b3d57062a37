//! FlowState Sensor CLI
//!
//! Capture input dynamics into session logs and audit those logs.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use flowstate_sensor::{
    analysis::{analyze_log, render_report, AnalysisError},
    collector::{CaptureController, NoopHook},
    config::{Config, SourceConfig},
    logging::init_logging,
    CAPTURE_NOTICE, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "flowstate")]
#[command(version = VERSION)]
#[command(about = "Keystroke and mouse dynamics capture with log auditing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a session until Ctrl+C
    Capture {
        /// Input sources to capture (keyboard, mouse, or all)
        #[arg(long, default_value = "all")]
        sources: String,

        /// Root directory for session logs (overrides the config file)
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// Stop automatically after this many seconds
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Check a session log for integrity problems and anomalies
    Analyze {
        /// Path to a newline-delimited JSON session log
        log_path: PathBuf,

        /// Print the full statistics as JSON instead of the text report
        #[arg(long)]
        json: bool,
    },

    /// Display what a capture session records
    Notice,

    /// Show configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: could not load configuration, using defaults: {e}");
        Config::default()
    });

    match init_logging(&config.logging_config()) {
        Ok(logging) => tracing::debug!(
            name = logging.name(),
            log_file = %logging.log_file().display(),
            level = %logging.level(),
            "logging initialised"
        ),
        Err(e) => eprintln!("Warning: diagnostic logging unavailable: {e}"),
    }

    match cli.command {
        Commands::Capture {
            sources,
            base_dir,
            duration,
        } => cmd_capture(config, &sources, base_dir, duration),
        Commands::Analyze { log_path, json } => cmd_analyze(&log_path, json),
        Commands::Notice => {
            println!("{CAPTURE_NOTICE}");
            Ok(())
        }
        Commands::Config { save } => cmd_config(&config, save),
    }
}

fn cmd_capture(
    mut config: Config,
    sources: &str,
    base_dir: Option<PathBuf>,
    duration: Option<u64>,
) -> anyhow::Result<()> {
    let source_config = SourceConfig::from_csv(sources);
    if !source_config.any_enabled() {
        bail!("At least one source must be enabled (keyboard or mouse)");
    }
    config.sources = source_config;
    if let Some(dir) = base_dir {
        config.base_dir = dir;
    }

    println!("FlowState Sensor v{VERSION}");
    println!("{CAPTURE_NOTICE}");

    let capture_config = config.capture_config()?;
    // No device backend ships with this build; sessions only record what a
    // registered hook delivers.
    let mut controller = CaptureController::new(capture_config, NoopHook::new());
    controller.start().context("Error starting capture")?;

    if let Some(path) = controller.session_path() {
        println!("Recording to {}", path.display());
    }
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")?;

    let deadline = duration.map(|secs| Instant::now() + Duration::from_secs(secs));
    while running.load(Ordering::SeqCst) {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        thread::sleep(Duration::from_millis(100));
    }

    println!();
    println!("Stopping capture...");
    controller.stop();

    println!("Writer: {:?}", controller.writer_state());
    println!();
    println!("{}", controller.summary());
    Ok(())
}

fn cmd_analyze(log_path: &Path, json: bool) -> anyhow::Result<()> {
    let stats = match analyze_log(log_path) {
        Ok(stats) => stats,
        Err(e @ AnalysisError::NotFound(_)) => bail!(e),
        Err(e) => return Err(e).context("Analysis failed"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", render_report(&stats));
    }
    Ok(())
}

fn cmd_config(config: &Config, save: bool) -> anyhow::Result<()> {
    if save {
        config.save().context("Error saving configuration")?;
        println!("Saved configuration to {:?}", Config::config_path());
        return Ok(());
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
