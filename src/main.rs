#![allow(non_snake_case)]

use std::env;
use std::process::ExitCode;

use calendarBot::cli;
use calendarBot::config::{AppConfig, LogFormat, RunMode, Settings};
use calendarBot::runtime;
use tracing::error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    match settings.log_format {
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(false)).init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match env::var("CONFIG_FILE") {
        Ok(path) => match AppConfig::from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        },
        Err(_) => AppConfig::default(),
    };

    let settings = match Settings::from_config(&config) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&settings);

    let result = match settings.run_mode {
        RunMode::Bot => runtime::run_bot(settings).await,
        RunMode::Cli => cli::cli(settings).await,
    };

    if let Err(err) = result {
        error!(error = %err, "calendar bot exited with an error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
