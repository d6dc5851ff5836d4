// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! smsflow - scripted SMS auto-reply service.
//!
//! This is the binary entry point: the webhook server, the worker pool, and
//! the operator commands against the local store.

mod commands;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// smsflow - scripted SMS auto-reply service.
#[derive(Parser, Debug)]
#[command(name = "smsflow", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the webhook server with in-process workers.
    Serve,
    /// Run workers only.
    Worker,
    /// Append contact records (CSV, or JSON with a .json extension) to the campaign pool.
    Import {
        file: PathBuf,
        /// Header of the number column in CSV input.
        #[arg(long)]
        number_column: Option<String>,
    },
    /// Reserve records from the pool into a new batch.
    Reserve {
        /// Target device id; repeat for several devices.
        #[arg(long = "device", required = true)]
        devices: Vec<String>,
        #[arg(long)]
        per_device: u32,
    },
    /// Show a batch.
    Batch {
        id: i64,
        /// Print the batch items as CSV.
        #[arg(long)]
        csv: bool,
    },
    /// Show per-device counters.
    Stats,
    /// Start a new counting cycle for one device or all of them.
    Cycle {
        #[arg(required_unless_present = "all")]
        device: Option<String>,
        #[arg(long, conflicts_with = "device")]
        all: bool,
    },
    /// Show or replace the reply script.
    Script {
        #[command(subcommand)]
        action: ScriptAction,
    },
    /// Remove a number from the archived set.
    Unarchive { number: String },
}

#[derive(Subcommand, Debug)]
enum ScriptAction {
    /// Print the current script as JSON.
    Show,
    /// Replace the script with the JSON in FILE.
    Set { file: PathBuf },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match smsflow_config::load_and_validate(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            smsflow_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    serve::init_tracing(&config.service.log_level);

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Worker => serve::run_worker(config).await,
        Commands::Import {
            file,
            number_column,
        } => commands::import(&config, &file, number_column.as_deref()).await,
        Commands::Reserve {
            devices,
            per_device,
        } => commands::reserve(&config, devices, per_device).await,
        Commands::Batch { id, csv } => commands::batch(&config, id, csv).await,
        Commands::Stats => commands::stats(&config).await,
        Commands::Cycle { device, all } => {
            commands::cycle(&config, if all { None } else { device }).await
        }
        Commands::Script { action } => match action {
            ScriptAction::Show => commands::script_show(&config).await,
            ScriptAction::Set { file } => commands::script_set(&config, &file).await,
        },
        Commands::Unarchive { number } => commands::unarchive(&config, number).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_reserve_with_repeated_devices() {
        let cli = Cli::parse_from([
            "smsflow", "reserve", "--device", "1", "--device", "2", "--per-device", "3",
        ]);
        match cli.command {
            Commands::Reserve {
                devices,
                per_device,
            } => {
                assert_eq!(devices, vec!["1", "2"]);
                assert_eq!(per_device, 3);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cycle_needs_device_or_all() {
        assert!(Cli::try_parse_from(["smsflow", "cycle"]).is_err());
        assert!(Cli::try_parse_from(["smsflow", "cycle", "7", "--all"]).is_err());
        let cli = Cli::try_parse_from(["smsflow", "cycle", "--all"]).unwrap();
        assert!(matches!(cli.command, Commands::Cycle { all: true, device: None }));
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["smsflow", "stats", "--config", "/tmp/s.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.toml")));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = smsflow_config::load_and_validate_str(
            "[webhook]\nsecret = \"s\"\n",
        )
        .expect("config with a secret should be valid");
        assert_eq!(config.service.name, "smsflow");
    }
}
