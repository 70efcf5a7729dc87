use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config_cmds;
mod poll_cmd;
mod report;
mod services;
mod watch;

use cli::{Cli, Commands, ConfigCommands};
use hm_config::HarbourConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config {
        cmd: ConfigCommands::Template,
    } = cli.command
    {
        config_cmds::handle_config_template();
        return Ok(());
    }

    let config = HarbourConfig::load(cli.config.as_deref())?;

    // RUST_LOG wins over the configured level; output to stderr, initialize only once.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .ok();

    match cli.command {
        Commands::Watch => watch::handle_watch(config, cli.format).await,
        Commands::Poll => poll_cmd::handle_poll(config, cli.format).await,
        Commands::Config { cmd } => match cmd {
            ConfigCommands::Show => config_cmds::handle_config_show(&config, cli.format),
            ConfigCommands::Template => {
                config_cmds::handle_config_template();
                Ok(())
            }
        },
    }
}
