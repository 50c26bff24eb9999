//! `samtv describe`: print the TV's device description.

use anyhow::{Context, Result};

use super::open_session;
use crate::config::Config;

pub async fn run(cfg: &Config, json: bool) -> Result<()> {
    let session = open_session(cfg)?;
    let description = session
        .device_description()
        .await
        .context("cannot fetch device description")?;

    if json {
        let text = serde_json::to_string_pretty(&description)
            .context("failed to serialize description")?;
        println!("{text}");
        return Ok(());
    }

    println!("{:<14} {}", "Name", description.device_name);
    println!("{:<14} {}", "Model", description.model_name);
    println!("{:<14} {}", "Firmware", description.firmware_version);
    println!("{:<14} {}", "DUID", description.duid);
    println!("{:<14} {}", "IP", description.ip);
    if description.capabilities.is_empty() {
        return Ok(());
    }

    println!("\nCapabilities:");
    for capability in &description.capabilities {
        println!(
            "  {:<28} port {:<6} {}",
            capability.name, capability.port, capability.location
        );
    }
    Ok(())
}
