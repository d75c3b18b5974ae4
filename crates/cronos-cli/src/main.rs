use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

mod alarms;
mod commands;

use cronos_core::config::resolve_config_path;
use cronos_core::{CronosConfig, CronosError};
use cronos_scheduler::Clock;

// ── CLI ─────────────────────────────────────────────────────────────

/// Cronos: a personal alarm clock with recurrence rules, shift cycles and snooze.
#[derive(Parser, Debug)]
#[command(name = "cronos", version, about)]
struct Cli {
    /// Path to cronos.toml (defaults to ~/.cronos/cronos.toml).
    #[arg(long, global = true, env = "CRONOS_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the engine and ring alarms until Ctrl-C.
    Run,
    /// Show every alarm with its rule and a countdown to the next ring.
    List,
    /// Show the next occurrence of every alarm.
    Next {
        /// Start searching from this local time ("YYYY-MM-DD HH:MM"); defaults to now.
        #[arg(long, value_parser = commands::parse_local_datetime)]
        from: Option<chrono::NaiveDateTime>,
    },
    /// List the alarms whose rule matches a calendar date.
    Check {
        /// Date to check ("YYYY-MM-DD").
        #[arg(long, value_parser = commands::parse_calendar_date)]
        date: chrono::NaiveDate,
    },
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // load config: --config / CRONOS_CONFIG > ~/.cronos/cronos.toml
    let config_path = cli.config.as_deref();
    let (config, config_err) = match CronosConfig::load(config_path) {
        Ok(c) => (c, None),
        Err(e @ CronosError::ConfigNotFound(_)) => return Err(e.into()),
        Err(e) => (CronosConfig::default(), Some(e)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.filter_or_default().into()),
        )
        .init();

    if let Some(e) = config_err {
        warn!("Config load failed ({}), using defaults", e);
    } else {
        let path = resolve_config_path(config_path);
        if Path::new(&path).exists() {
            info!(%path, "config loaded");
        } else {
            warn!(%path, "no config file found, using defaults");
        }
    }

    let alarms = alarms::load_alarms(&CronosConfig::figment(config_path))
        .context("failed to load alarm definitions")?;
    info!(count = alarms.len(), "alarms loaded");

    let clock: Arc<dyn Clock> = Arc::new(cronos_scheduler::SystemClock);

    match cli.command {
        Command::Run => commands::run(&config, alarms, clock).await?,
        Command::List => commands::list(&alarms, clock.now().local),
        Command::Next { from } => {
            commands::next(&alarms, from.unwrap_or_else(|| clock.now().local))
        }
        Command::Check { date } => commands::check(&alarms, date),
    }
    Ok(())
}
