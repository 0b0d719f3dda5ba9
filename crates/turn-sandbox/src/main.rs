//! Sandbox entry point.
//!
//! Plays one scripted hex-conquest turn through the action queue, the action
//! bus and the animation planner, then prints the resulting world.
mod animation;
mod scenario;
mod world;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use scenario::ScenarioOptions;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use turn_scheduler::QueueConfig;

/// Scripted turn driving the action scheduler
#[derive(Parser)]
#[command(name = "turn-sandbox")]
#[command(about = "Plays one scripted hex-conquest turn", long_about = None)]
#[command(version)]
struct Cli {
    /// Gold in the treasury at the start of the turn
    #[arg(long, default_value = "30")]
    treasury: u32,

    /// Number of units to try to buy
    #[arg(long, default_value = "3")]
    units: u32,

    /// Undo the last purchase before ending the turn
    #[arg(long)]
    undo: bool,

    /// Print the queue debug dump after the turn
    #[arg(long)]
    dump: bool,

    /// Duration of one animation in milliseconds
    #[arg(long, value_name = "MS", default_value = "20")]
    frame_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = setup_logging()?;

    let config = QueueConfig::from_env();
    tracing::info!(
        target: "sandbox",
        event_buffer = config.event_buffer_size,
        history_limit = ?config.history_limit,
        stall_warning = ?config.stall_warning_after,
        "queue configuration loaded"
    );

    let options = ScenarioOptions {
        treasury: cli.treasury,
        units: cli.units,
        undo: cli.undo,
        dump: cli.dump,
        frame: Duration::from_millis(cli.frame_ms),
    };
    let report = scenario::run(options, config).await?;

    println!("gold:  {}", report.gold);
    println!("units: {:?}", report.units);
    println!("hexes: {:?}", report.owned);
    println!("score: {}", report.score);
    if let Some(dump) = report.dump {
        println!();
        print!("{dump}");
    }

    Ok(())
}

/// Setup logging to stderr, and to a file when `SANDBOX_LOG_DIR` is set.
///
/// The returned guard flushes the file writer on drop.
fn setup_logging() -> Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match std::env::var_os("SANDBOX_LOG_DIR") {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            let file_appender = tracing_appender::rolling::never(&dir, "sandbox.log");
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
