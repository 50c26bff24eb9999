//! `samtv pair [--pin N]`: pair with the TV.
//!
//! Without a PIN the TV shows its PIN popup. Run again with `--pin` to
//! finish; a negative PIN closes the popup.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use samtv_client::PairingStatus;

use super::open_session;
use crate::config::Config;

pub async fn run(
    cfg: &Config,
    config_path: Option<&Path>,
    pin: i32,
    force: bool,
    save: bool,
) -> Result<()> {
    let session = open_session(cfg)?;
    let status = session.pair(pin, force).await.context("pairing error")?;

    match status {
        PairingStatus::PinRequested => {
            eprintln!("Enter the PIN shown on the TV with `samtv pair --pin NNNN`.");
        }
        PairingStatus::Cancelled => eprintln!("PIN page closed."),
        PairingStatus::AlreadyPaired => {
            eprintln!("This device is already paired. Use --force to pair again.");
        }
        PairingStatus::Paired(outcome) => {
            eprintln!("You can save the following items:");
            println!("device_uuid: {}", outcome.device_id);
            println!("session_key: {}", outcome.session_key_hex());
            println!("session_id:  {}", outcome.session_id);

            if save {
                let Some(path) = config_path else {
                    bail!("cannot save pairing data: no config file in use");
                };
                let mut file_cfg = Config::load(path)?;
                file_cfg.record_pairing(&cfg.server, &outcome);
                file_cfg.save(path)?;
                info!(path = %path.display(), "pairing data saved");
                eprintln!("Saved to {}", path.display());
            }
        }
    }
    Ok(())
}
