use std::fmt::Write as _;

use anyhow::{Context, Result};
use hm_config::HarbourConfig;
use hm_core::{GuildShipsResponse, OutputFormat};
use hm_scheduler::{Admission, RosterApi};

pub(crate) async fn handle_poll(config: HarbourConfig, format: OutputFormat) -> Result<()> {
    config.validate()?;
    let client = crate::services::build_client(&config)?;
    let ships = client
        .guild_ships(Admission::Priority, config.guild_id.trim())
        .await
        .context("Failed to fetch guild ships")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ships)?),
        OutputFormat::Text => print!("{}", render_ships(&ships)),
    }
    Ok(())
}

fn render_ships(response: &GuildShipsResponse) -> String {
    let Some(ships) = response.ships.as_deref() else {
        return "No ship list in response\n".to_string();
    };
    let mut out = String::new();
    for ship in ships {
        let crew: Vec<&str> = ship.crew().iter().map(|c| c.display_name()).collect();
        let _ = write!(
            out,
            "{:<24} {:<10} {:?}",
            ship.name, ship.ship_type, ship.sailing_state
        );
        if !crew.is_empty() {
            let _ = write!(out, "  crew: {}", crew.join(", "));
        }
        out.push('\n');
    }
    out
}
