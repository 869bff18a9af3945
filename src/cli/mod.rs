pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::{self, RegistryConfig};

#[derive(Parser)]
#[command(name = "taskbase")]
#[command(about = "Taskbase CLI - inspect entity definitions and the compiled registry")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Build the registry and report load failures and collisions")]
    Check {
        #[arg(long, help = "Definitions directory (default: ENTITY_DEFINITIONS_DIR)")]
        dir: Option<PathBuf>,
    },

    #[command(about = "List the entity kinds the registry resolves")]
    Kinds {
        #[arg(long, help = "Definitions directory (default: ENTITY_DEFINITIONS_DIR)")]
        dir: Option<PathBuf>,
    },

    #[command(about = "Show the compiled schema of one entity kind")]
    Describe {
        #[arg(help = "Entity kind name")]
        kind: String,

        #[arg(long, help = "Definitions directory (default: ENTITY_DEFINITIONS_DIR)")]
        dir: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Registry settings from the environment, with an optional directory override
fn registry_config(dir: Option<PathBuf>) -> RegistryConfig {
    let mut registry = config::config().registry.clone();
    if let Some(dir) = dir {
        registry.definitions_dir = dir;
    }
    registry
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Check { dir } => commands::check::handle(registry_config(dir), output_format),
        Commands::Kinds { dir } => commands::kinds::handle(registry_config(dir), output_format),
        Commands::Describe { kind, dir } => commands::describe::handle(&kind, registry_config(dir), output_format),
    }
}
