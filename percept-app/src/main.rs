mod app;
mod audio;
mod port;

use anyhow::{Context, Result};
use app::App;
use audio::RodioPlayer;
use clap::Parser;
use percept_core::SyncPort;
use percept_experiment::{AssetPool, EventRecorder, RunConfig, Session, ToneBank};
use percept_timing::HighPrecisionTimer;
use port::ParallelPort;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "percept",
    about = "Timed visual and auditory stimulus presentation with event logging"
)]
struct Cli {
    /// Image directory
    #[arg(short, long, default_value = "images/")]
    images: PathBuf,

    /// Number of trials
    #[arg(short, long, default_value_t = 20)]
    trials: usize,

    /// Output file base name; the run log is written to <NAME>.csv
    #[arg(short, long)]
    output: String,

    /// Tone frequencies in Hz
    #[arg(short, long, num_args = 1.., default_values_t = [440.0, 500.0])]
    freqs: Vec<f32>,

    /// Times each frequency repeats before the set refills; pairs with --freqs
    #[arg(short = 's', long, num_args = 1.., default_values_t = [15u32, 5])]
    repetitions: Vec<u32>,

    /// Tone duration in seconds
    #[arg(short = 'd', long, default_value_t = 0.2)]
    tone_duration: f64,

    /// Inter-stimulus delay bounds in milliseconds: minimum then maximum
    #[arg(short = 'D', long, num_args = 2, value_names = ["MIN", "MAX"], default_values_t = [50u64, 150])]
    delay: Vec<u64>,

    /// Mirror each event as a pulse on the synchronization port
    #[arg(short = 'p', long)]
    sync_port: bool,

    /// Synchronization port address, decimal or 0x-prefixed hex
    #[arg(short = 'a', long, value_parser = parse_address, default_value = "0x0378")]
    port_address: u16,

    /// Debug-level diagnostics
    #[arg(short, long)]
    verbose: bool,
}

fn parse_address(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| format!("invalid port address: {s}"))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let defaults = RunConfig::default();
    let config = RunConfig {
        trials: cli.trials,
        image_dir: cli.images,
        frequencies: cli.freqs,
        repetitions: cli.repetitions,
        tone_secs: cli.tone_duration,
        fixation_secs: defaults.fixation_secs,
        delay_bounds_ms: (cli.delay[0], cli.delay[1]),
        output_name: cli.output,
        sync_address: cli.sync_port.then_some(cli.port_address),
    };
    // Misconfiguration fails here, before any window, device or file exists.
    config.validate()?;

    let tones = ToneBank::new(
        config.frequencies.clone(),
        config.repetitions.clone(),
        Duration::from_secs_f64(config.tone_secs),
    )?;
    let pool = AssetPool::scan(config.image_dir.clone(), config.trials)
        .with_context(|| format!("cannot scan image directory {}", config.image_dir.display()))?;

    let port: Option<Box<dyn SyncPort>> = match config.sync_address {
        Some(address) => Some(Box::new(ParallelPort::open(address)?)),
        None => None,
    };
    let recorder = EventRecorder::new(config.output_path(), port);
    let player = Box::new(RodioPlayer::new()?);
    let timer = HighPrecisionTimer::new();
    let rng = SmallRng::from_os_rng();

    let session = Session::new(config, pool, tones, recorder, player, timer, rng);

    println!("=== PERCEPT STIMULUS RUNNER ===");
    println!("Platform: {}", std::env::consts::OS);
    println!("Press any key to start, ESC to abort.\n");

    App::new(session).run()
}
