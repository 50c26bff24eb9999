//! Configuration at `~/.config/samtvcli/samtvcli.toml`.
//!
//! Holds the TV address and the saved pairing data. Flags and `SAMTV_*`
//! environment variables override file values.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use samtv_client::pairing::PairingOutcome;
use samtv_client::{Backend, RemoteConfig, SessionConfig};

/// Config path that disables the config file.
pub const NO_CONFIG: &str = "/dev/null";

/// Top-level config file structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TV host name or IP address.
    pub server: String,
    pub device_uuid: String,
    /// 32-character hex session key.
    pub session_key: String,
    pub session_id: i64,
    pub debug: bool,
    pub pairing: PairingSection,
}

/// Remote key-exchange service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingSection {
    pub server: String,
    pub accept_invalid_certs: bool,
}

impl Default for PairingSection {
    fn default() -> Self {
        let remote = RemoteConfig::default();
        Self {
            server: remote.server,
            accept_invalid_certs: remote.accept_invalid_certs,
        }
    }
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server: Option<String>,
    pub device_uuid: Option<String>,
    pub session_key: Option<String>,
    pub session_id: Option<i64>,
    pub debug: bool,
}

/// Resolve the `--config` flag: `None` means no config file.
pub fn resolve_path(flag: Option<&str>) -> Option<PathBuf> {
    match flag {
        Some(NO_CONFIG) => None,
        Some(path) => Some(PathBuf::from(path)),
        None => Some(default_path()),
    }
}

pub fn default_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_default();
    home.join(".config").join("samtvcli").join("samtvcli.toml")
}

impl Config {
    /// Load configuration from a TOML file, returning defaults if the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;

        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Save the configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config to {}", path.display()))?;

        Ok(())
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(server) = &overrides.server {
            self.server = server.clone();
        }
        if let Some(device_uuid) = &overrides.device_uuid {
            self.device_uuid = device_uuid.clone();
        }
        if let Some(session_key) = &overrides.session_key {
            self.session_key = session_key.clone();
        }
        if let Some(session_id) = overrides.session_id {
            self.session_id = session_id;
        }
        self.debug |= overrides.debug;
    }

    /// Store a pairing result, keeping everything else.
    pub fn record_pairing(&mut self, server: &str, outcome: &PairingOutcome) {
        if self.server.is_empty() {
            self.server = server.to_string();
        }
        self.device_uuid = outcome.device_id.clone();
        self.session_key = outcome.session_key_hex();
        self.session_id = outcome.session_id;
    }

    pub fn session_config(&self) -> SessionConfig {
        let remote = RemoteConfig {
            server: self.pairing.server.clone(),
            accept_invalid_certs: self.pairing.accept_invalid_certs,
            ..RemoteConfig::default()
        };
        SessionConfig {
            pairing: Backend::Remote(remote),
            ..SessionConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = Config::default();
        assert!(cfg.server.is_empty());
        assert_eq!(cfg.session_id, 0);
        assert!(!cfg.debug);
        assert_eq!(cfg.pairing.server, "https://34.210.190.209:5443");
        assert!(cfg.pairing.accept_invalid_certs);
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
server = "192.168.1.20"
device_uuid = "samtv"
session_key = "00112233445566778899aabbccddeeff"
session_id = 1
debug = true

[pairing]
server = "https://pairing.example:5443"
accept_invalid_certs = false
"#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.server, "192.168.1.20");
        assert_eq!(cfg.session_key, "00112233445566778899aabbccddeeff");
        assert_eq!(cfg.session_id, 1);
        assert!(cfg.debug);
        assert_eq!(cfg.pairing.server, "https://pairing.example:5443");
        assert!(!cfg.pairing.accept_invalid_certs);

        match cfg.session_config().pairing {
            Backend::Remote(remote) => {
                assert_eq!(remote.server, "https://pairing.example:5443");
                assert!(!remote.accept_invalid_certs);
                assert_eq!(remote.username, "orchestrator");
            }
            other => panic!("unexpected backend {other:?}"),
        }
    }

    #[test]
    fn parse_partial_toml_config() {
        let cfg: Config = toml::from_str(r#"server = "tv.lan""#).unwrap();
        assert_eq!(cfg.server, "tv.lan");
        assert_eq!(cfg.session_id, 0); // default
        assert_eq!(cfg.pairing, PairingSection::default());
    }

    #[test]
    fn overrides_win() {
        let mut cfg = Config {
            server: "file-tv".into(),
            device_uuid: "file-uuid".into(),
            session_id: 3,
            ..Config::default()
        };
        cfg.apply(&Overrides {
            server: Some("flag-tv".into()),
            session_id: Some(8),
            debug: true,
            ..Overrides::default()
        });
        assert_eq!(cfg.server, "flag-tv");
        assert_eq!(cfg.device_uuid, "file-uuid");
        assert_eq!(cfg.session_id, 8);
        assert!(cfg.debug);
    }

    #[test]
    fn dev_null_skips_the_file() {
        assert_eq!(resolve_path(Some("/dev/null")), None);
        assert_eq!(resolve_path(Some("x.toml")), Some(PathBuf::from("x.toml")));
        assert!(resolve_path(None).unwrap().ends_with(".config/samtvcli/samtvcli.toml"));
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("samtvcli.toml");

        assert_eq!(Config::load(&path).unwrap(), Config::default());

        let mut cfg = Config::default();
        cfg.record_pairing(
            "10.0.0.5",
            &PairingOutcome {
                device_id: "samtv".into(),
                session_id: 12,
                session_key: [0xab; 16],
            },
        );
        cfg.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.server, "10.0.0.5");
        assert_eq!(loaded.session_key, "ab".repeat(16));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "server = [").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
