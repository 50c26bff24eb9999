//! CLI subcommand implementations.

pub mod describe;
pub mod key;
pub mod pair;

use anyhow::{bail, Context, Result};

use samtv_client::{DeviceAddress, Session};

use crate::config::Config;

/// Build a session for the configured TV with any saved pairing data restored.
pub fn open_session(cfg: &Config) -> Result<Session> {
    if cfg.server.is_empty() {
        bail!("no TV address: set `server` in the config file or pass --server");
    }
    let address = DeviceAddress::new(&cfg.server).context("invalid TV address")?;
    let session = Session::new(address, cfg.session_config()).context("cannot set up session")?;
    session
        .restore_session_hex(&cfg.session_key, cfg.session_id, &cfg.device_uuid)
        .context("invalid session data")?;
    Ok(session)
}
