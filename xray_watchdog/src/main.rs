//! # X-ray HV Watchdog
//!
//! Independent process that forces the HV enable line LOW when the
//! controller's heartbeat goes stale without a clean-shutdown flag.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::time::SystemTime;
use tokio::signal;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;
use xray_common::config::load_validated;
use xray_common::consts::DEFAULT_CONFIG_PATH;
use xray_hal::DriverRegistry;
use xray_watchdog::{HvWatchdog, PollOutcome, WatchdogConfig};

/// X-ray rig HV watchdog
#[derive(Parser, Debug)]
#[command(name = "xray_watchdog")]
#[command(version)]
#[command(about = "Forces HV off when the X-ray controller stops heart-beating")]
struct Args {
    /// Path to the configuration TOML (shared with the controller).
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Use the simulation driver regardless of `[hal] driver`.
    #[arg(long)]
    simulate: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("X-ray watchdog v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args).await {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("X-ray watchdog stopped");
}

async fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg: WatchdogConfig = load_validated(&args.config)?;
    if args.simulate {
        cfg.hal.driver = "simulation".to_string();
    }

    // Only the HV line is claimed; the controller owns everything else.
    let registry = DriverRegistry::with_builtin();
    let mut driver = registry.create_driver(&cfg.hal.driver)?;
    driver.init(&cfg.hal)?;
    let hv = driver.digital_output(cfg.pins.hv_enable)?;

    let mut watchdog = HvWatchdog::new(hv, &cfg.heartbeat);
    watchdog.startup()?;

    let mut ticker = interval(cfg.watchdog.poll());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut last = None;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = watchdog.tick(SystemTime::now());
                if last != Some(outcome) {
                    info!("Watchdog state: {:?}", outcome);
                    last = Some(outcome);
                }
                if outcome == PollOutcome::Failed {
                    error!("Watchdog poll failed; HV held OFF");
                }
            }
            res = &mut shutdown => {
                match res {
                    Ok(()) => info!("Received shutdown signal (Ctrl+C)"),
                    Err(e) => error!("Unable to listen for shutdown signal: {e}"),
                }
                break;
            }
        }
    }

    driver.shutdown()?;
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
