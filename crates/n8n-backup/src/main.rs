//! # n8n-backup
//!

use std::{fs, path::PathBuf, process::ExitCode};

use mimalloc::MiMalloc;
use n8n_backup::{Config, Pipeline, Schedule, Scheduler};
use shared::{Failure, init_logger, parse_level};
use tracing::{error, info};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const CONFIG_FILE: &str = "./config.toml";

fn main() -> ExitCode {
    // Initialize config if args include 'init'.
    if std::env::args().any(|arg| arg.eq("init")) {
        let config = Config::default();
        let contents =
            toml::to_string_pretty(&config).or_log_and_panic("Could not serialize config file");
        fs::write(CONFIG_FILE, contents).or_log_and_panic("Could not create config file");
        return ExitCode::SUCCESS;
    }

    // A missing .env is fine.
    let _ = dotenv::dotenv();

    // Load config
    let config_path = PathBuf::from(CONFIG_FILE);
    let mut config = if config_path.exists() {
        match Config::load_toml(config_path) {
            Ok(config) => config,
            Err(error) => {
                eprintln!("Could not load config: {error}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        Config::default()
    };
    if let Err(error) = config.apply_env(|name| std::env::var(name).ok()) {
        eprintln!("Could not load config: {error}");
        return ExitCode::FAILURE;
    }

    let _logger = init_logger(
        parse_level(&config.logging.level),
        config.logging.directory.as_deref(),
    )
    .or_log_and_panic("Could not initialize logger");

    info!("n8n Backup Service starting");
    info!("  Schedule: {}", config.schedule);
    info!("  Retention: {} days", config.retention_days);
    info!(
        "  Encryption: {}",
        if config.encryption.key.is_empty() {
            "disabled"
        } else {
            "enabled"
        }
    );
    info!("  Destinations: {}", config.destinations_summary());
    info!("  Run on start: {}", config.run_on_start);

    // Validate the schedule before entering the loop.
    let schedule = match Schedule::parse(&config.schedule) {
        Ok(schedule) => schedule,
        Err(error) => {
            error!(
                "Invalid BACKUP_SCHEDULE cron expression '{}': {error}",
                config.schedule
            );
            return ExitCode::FAILURE;
        }
    };

    let run_on_start = config.run_on_start;
    let scheduler = match Scheduler::new(schedule, Pipeline::new(config), run_on_start) {
        Ok(scheduler) => scheduler,
        Err(error) => {
            error!("Invalid BACKUP_SCHEDULE cron expression: {error}");
            return ExitCode::FAILURE;
        }
    };

    scheduler.run()
}
