// src/main.rs

use std::process::ExitCode;

use warden::config::{init_config, LoggingConfig};
use warden::errors::LicenseResult;
use warden::hardware::{get_machine_id, machine_digest};
use warden::persistence::LicenseStore;

/// Simple entrypoint for checking and activating a local license.
///
/// ```text
/// warden activate <ACTIVATION-KEY>
/// warden check
/// warden machine-id
/// ```
///
/// Product, keys and file location come from `warden.toml` or `WARDEN_*`
/// environment variables.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(logging: &LoggingConfig) {
    if !logging.enabled {
        return;
    }

    let level = logging
        .level
        .parse::<log::LevelFilter>()
        .unwrap_or(log::LevelFilter::Info);

    let _ = env_logger::Builder::new().filter_level(level).try_init();
}

fn run() -> LicenseResult<ExitCode> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.first().map(String::as_str) == Some("machine-id") {
        // Print the digest, not the raw identifier.
        println!("{}", hex::encode(machine_digest(&get_machine_id())));
        return Ok(ExitCode::SUCCESS);
    }

    let config = init_config()?;
    init_logging(&config.logging);

    let store = LicenseStore::from_config(&config.license)?;
    let path = config.license.license_path()?;

    match args.first().map(String::as_str) {
        Some("activate") => {
            let key = args[1..].join(" ");
            if key.trim().is_empty() {
                eprintln!("usage: warden activate <ACTIVATION-KEY>");
                return Ok(ExitCode::from(2));
            }

            let code = store.validate(&key);
            if !code.is_ok() {
                println!("Activation failed: {code}");
                return Ok(ExitCode::FAILURE);
            }

            store.save(&path, &key)?;
            println!("License activated and saved to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Some("check") | None => {
            if store.load_and_validate(&path) {
                println!("Licensed");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("Not licensed");
                Ok(ExitCode::FAILURE)
            }
        }
        Some(other) => {
            eprintln!("unknown command '{other}' (expected activate, check or machine-id)");
            Ok(ExitCode::from(2))
        }
    }
}
