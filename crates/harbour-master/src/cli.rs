use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hm_core::OutputFormat;

#[derive(Parser)]
#[command(name = "harbour-master")]
#[command(about = "Harbour Master: guild ship session tracker")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ~/.config/harbour-master/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll the guild roster on a fixed cadence and report ship sessions
    Watch,

    /// Fetch the current guild ships once and print them
    Poll,

    /// Show/manage configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration (file, defaults and environment)
    Show,
    /// Print a commented configuration template
    Template,
}
