//! Stuntman - Adaptive Futures Decision Engine
//!
//! One-shot CLI around the decision engine: evaluate a candle window,
//! inspect or generate configuration.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use stuntman_engine::config::load_config;
use stuntman_engine::config::write_default_config;
use stuntman_engine::domain::candle::{validate_series, Candle};
use stuntman_engine::engine::EngineContext;

#[derive(Parser)]
#[command(name = "stuntman", about = "Adaptive futures decision engine")]
struct CliApp {
    /// Verbose output (info level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Debug output (debug level)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one evaluation cycle over a candle file and print the decision
    Evaluate {
        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// JSON file containing the candle window (oldest first)
        #[arg(short = 'i', long)]
        candles: PathBuf,

        /// Evaluation time, RFC 3339; defaults to the last candle's time
        #[arg(long)]
        at: Option<String>,
    },
    /// Load and validate a config file
    CheckConfig {
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Write a fully-populated default config file
    InitConfig {
        #[arg(short, long, default_value = "config.toml")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    // Load .env file if it exists (secrets go here, not in config.toml)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();

    match app.command {
        Command::Evaluate {
            config,
            candles,
            at,
        } => {
            let config = load_config(&config).context("Failed to load configuration")?;
            init_logging(app.verbose, app.debug, &config.logging.level);
            evaluate_command(config, &candles, at.as_deref())
        }
        Command::CheckConfig { config } => {
            init_logging(app.verbose, app.debug, "warn");
            let loaded = load_config(&config).context("Failed to load configuration")?;
            println!(
                "OK: {} ({}, max daily loss {})",
                config.display(),
                loaded.engine.symbol,
                loaded.engine.risk_limits.max_daily_loss
            );
            Ok(())
        }
        Command::InitConfig { path } => {
            init_logging(app.verbose, app.debug, "warn");
            if path.exists() {
                bail!("{} already exists, not overwriting", path.display());
            }
            write_default_config(&path).context("Failed to write default configuration")?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}

fn init_logging(verbose: bool, debug: bool, config_level: &str) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_level))
    };

    fmt().with_env_filter(filter).init();
}

fn evaluate_command(
    config: stuntman_engine::config::AppConfig,
    candles_path: &PathBuf,
    at: Option<&str>,
) -> Result<()> {
    let contents = std::fs::read_to_string(candles_path)
        .with_context(|| format!("Failed to read candle file {}", candles_path.display()))?;
    let candles: Vec<Candle> =
        serde_json::from_str(&contents).context("Failed to parse candle file")?;
    validate_series(&candles).context("Candle file is not a valid series")?;

    let now = match at {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .context("Invalid --at timestamp")?
            .with_timezone(&Utc),
        None => match candles.last() {
            Some(candle) => candle.time,
            None => bail!("candle file is empty"),
        },
    };

    let mut ctx = EngineContext::new(config.engine)?;
    let output = ctx.evaluate(&candles, now)?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
