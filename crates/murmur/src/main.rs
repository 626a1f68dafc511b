// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Murmur - an always-on reply agent for social-media mentions.
//!
//! This is the binary entry point.

mod serve;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use murmur_config::{ConfigError, MurmurConfig};

/// Murmur - an always-on reply agent for social-media mentions.
#[derive(Parser, Debug)]
#[command(name = "murmur", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run ingestion and reply dispatch until interrupted.
    Serve,
    /// Show conversation store statistics.
    Status {
        /// Output JSON for scripting.
        #[arg(long)]
        json: bool,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate configuration, reporting every problem found.
    Check,
}

fn load(path: Option<&PathBuf>) -> Result<MurmurConfig, Vec<ConfigError>> {
    match path {
        Some(p) => murmur_config::load_and_validate_path(p),
        None => murmur_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            murmur_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Status { json }) => status::run_status(&config, json).await,
        Some(Commands::Config {
            action: ConfigCommand::Check,
        }) => {
            println!(
                "configuration OK (agent=@{}, database={})",
                config.agent.username, config.storage.database_path
            );
            Ok(())
        }
        None => {
            println!("murmur: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
