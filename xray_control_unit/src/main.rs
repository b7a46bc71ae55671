//! # X-ray Rig Controller
//!
//! Opens the hardware context, starts the safety controller and reads
//! operator commands from stdin, one per line. Every controller
//! notification and every command reply is printed as one JSON line.
//!
//! ```text
//! $ xray_control_unit --config config/xray.toml --simulate
//! arm
//! expose 3.0
//! status
//! quit
//! ```

use clap::Parser;
use serde_json::json;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use xray_common::config::{ConfigError, LogLevel, load_validated};
use xray_common::consts::DEFAULT_CONFIG_PATH;
use xray_control_unit::command::Command;
use xray_control_unit::{ControllerConfig, SafetyController};
use xray_hal::{DriverRegistry, HardwareContext};

/// X-ray rig safety controller
#[derive(Parser, Debug)]
#[command(name = "xray_control_unit")]
#[command(version)]
#[command(about = "Interlock-gated HV/exposure controller for the X-ray rig")]
struct Args {
    /// Path to the controller configuration TOML.
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

fn main() {
    let args = Args::parse();
    let config: Result<ControllerConfig, ConfigError> = load_validated(&args.config);
    let level = config.as_ref().map(|c| c.shared.log_level).unwrap_or_default();
    setup_tracing(&args, level);

    info!("X-ray controller v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|cfg| run(&args, cfg));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("X-ray controller shutdown complete");
}

fn run(args: &Args, mut cfg: ControllerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if args.simulate {
        cfg.hal.driver = "simulation".to_string();
    }
    info!(
        "Config OK: service={}, driver={}, latch={:?}",
        cfg.shared.service_name, cfg.hal.driver, cfg.latch.policy
    );

    let registry = DriverRegistry::with_builtin();
    let driver = registry.create_driver(&cfg.hal.driver)?;
    let hw = Arc::new(HardwareContext::open(driver, &cfg.hal, &cfg.pins)?);

    let controller = Arc::new(SafetyController::new(Arc::clone(&hw), &cfg)?);
    controller.set_notifier(|note| match serde_json::to_string(note) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!("Failed to encode notification: {e}"),
    });

    // Graceful shutdown on SIGINT/SIGTERM: raise the shutdown flag first so
    // the watchdog does not treat the exit as a crash.
    let c = Arc::clone(&controller);
    let h = Arc::clone(&hw);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        c.shutdown();
        if let Err(e) = h.shutdown() {
            error!("Hardware shutdown failed: {e}");
        }
        process::exit(0);
    })?;

    controller.start()?;
    command_loop(&controller)?;

    controller.shutdown();
    hw.shutdown()?;
    Ok(())
}

fn command_loop(controller: &SafetyController) -> io::Result<()> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(cmd) => match cmd.execute(controller) {
                Ok(msg) => json!({ "ok": true, "reply": msg }),
                Err(e) => json!({ "ok": false, "error": e.to_string() }),
            },
            Err(e) => json!({ "ok": false, "error": e.to_string() }),
        };
        let mut out = io::stdout().lock();
        writeln!(out, "{reply}")?;
        out.flush()?;
    }
    info!("Command input closed");
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and `[shared] log_level`.
fn setup_tracing(args: &Args, level: LogLevel) {
    let directive: Directive = if args.verbose {
        Level::DEBUG.into()
    } else {
        level
            .as_directive()
            .parse()
            .unwrap_or_else(|_| Level::INFO.into())
    };

    // stdout carries the JSON protocol; logs go to stderr.
    let filter = EnvFilter::from_default_env().add_directive(directive);

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .compact()
            .init();
    }
}
