//! Darkroom CLI Binary
//!
//! Command-line interface for the gallery catalog sync engine.

use clap::Parser;
use darkroom::cli::{exit_code, map_error, Cli, RunContext};
use darkroom::config::ConfigLoader;
use darkroom::logging::{init_logging, resolve_log_file_path, LoggingConfig};
use darkroom::store::StoreEnvironment;
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Darkroom CLI starting");

    let context = RunContext::new(cli.workspace.clone(), cli.config.clone()).and_then(|ctx| {
        match cli.env.as_deref() {
            Some(env) => {
                let environment: StoreEnvironment = env
                    .parse()
                    .map_err(darkroom::error::ApiError::InvalidInput)?;
                ctx.with_store_environment(environment)
            }
            None => Ok(ctx),
        }
    });
    let context = match context {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error loading configuration: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(exit_code(&e));
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(exit_code(&e));
        }
    }
}

/// Build logging configuration from CLI args and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let loaded = match cli.config {
        Some(ref config_path) => ConfigLoader::load_from_file(config_path),
        None => ConfigLoader::load(&cli.workspace),
    };
    let mut config = loaded.map(|c| c.logging).unwrap_or_default();

    if cli.quiet {
        config.enabled = false;
    }
    if cli.verbose {
        config.level = "debug".to_string();
        // An explicit --log-output value still takes precedence below.
        if config.output == "file" {
            config.output = "file+stderr".to_string();
        }
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    }
    resolve_log_file_path(&mut config, &cli.workspace);

    config
}
