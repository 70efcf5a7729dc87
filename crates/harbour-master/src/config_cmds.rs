use anyhow::Result;
use hm_config::HarbourConfig;
use hm_core::OutputFormat;

const REDACTED: &str = "<redacted>";

pub(crate) fn handle_config_show(config: &HarbourConfig, format: OutputFormat) -> Result<()> {
    let shown = redacted(config);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&shown)?),
        OutputFormat::Text => print!("{}", toml::to_string_pretty(&shown)?),
    }
    Ok(())
}

pub(crate) fn handle_config_template() {
    print!("{}", HarbourConfig::default_template());
}

fn redacted(config: &HarbourConfig) -> HarbourConfig {
    let mut shown = config.clone();
    if !shown.api.cookie.is_empty() {
        shown.api.cookie = REDACTED.to_string();
    }
    shown
}
