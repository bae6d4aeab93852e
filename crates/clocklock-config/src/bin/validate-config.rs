//! Config validation CLI tool
//!
//! Validates a clocklockd configuration file and reports any errors.

use clocklock_config::{CURRENT_CONFIG_VERSION, ConfigError, load_config};
use clocklock_util::{default_config_path, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a clocklockd configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match load_config(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", CURRENT_CONFIG_VERSION);
            println!("  Socket: {}", config.daemon.socket_path.display());
            println!("  Data dir: {}", config.daemon.data_dir.display());
            println!("  Bootstrap domain: {}", config.daemon.bootstrap_domain);
            println!("  Seed rules: {}", config.rules.len());

            if !config.rules.is_empty() {
                println!();
                println!("Rules:");
                for rule in &config.rules {
                    let cooldown = if rule.blocking_enabled() {
                        format!("cooldown {}", format_duration(rule.cooldown))
                    } else {
                        "never blocks".to_string()
                    };
                    println!(
                        "  - {}: limit {}, {}{}",
                        rule.domain,
                        format_duration(rule.time_limit),
                        cooldown,
                        if rule.track_in_background { ", tracks in background" } else { "" }
                    );
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver, CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
