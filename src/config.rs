//! Runtime configuration: where dhcpd keeps its files.
//!
//! Defaults, then an optional `key = value` settings file, then
//! environment variables. Command-line flags are applied on top by the
//! binary.

use std::path::{Path, PathBuf};

use crate::domain::AddressFamily;
use crate::error::ConfigError;

const DEFAULT_SETTINGS_PATH: &str = "/etc/dhcpd-leases.conf";
const DEFAULT_DHCPD_CONF: &str = "/etc/dhcp/dhcpd.conf";
const DEFAULT_DHCPD_LEASES: &str = "/var/lib/dhcp/dhcpd.leases";
const DEFAULT_DHCPD6_CONF: &str = "/etc/dhcp/dhcpd6.conf";
const DEFAULT_DHCPD6_LEASES: &str = "/var/lib/dhcp/dhcpd6.leases";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub dhcpd_conf: PathBuf,
    pub dhcpd_leases: PathBuf,
    pub dhcpd6_conf: PathBuf,
    pub dhcpd6_leases: PathBuf,
    /// MAC vendor database (registry text or JSON)
    pub oui_db: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dhcpd_conf: PathBuf::from(DEFAULT_DHCPD_CONF),
            dhcpd_leases: PathBuf::from(DEFAULT_DHCPD_LEASES),
            dhcpd6_conf: PathBuf::from(DEFAULT_DHCPD6_CONF),
            dhcpd6_leases: PathBuf::from(DEFAULT_DHCPD6_LEASES),
            oui_db: None,
        }
    }
}

impl Config {
    /// Load from the settings file named by `DHCPD_LEASES_CONFIG`
    /// (default `/etc/dhcpd-leases.conf`).
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("DHCPD_LEASES_CONFIG")
            .unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load from `path`. A missing file just means defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    config.set(key.trim(), value.trim());
                }
            }
        }

        // Allow environment variable overrides
        for (var, key) in [
            ("DHCPD_LEASES_DHCPD_CONF", "dhcpd_conf"),
            ("DHCPD_LEASES_DHCPD_LEASES", "dhcpd_leases"),
            ("DHCPD_LEASES_DHCPD6_CONF", "dhcpd6_conf"),
            ("DHCPD_LEASES_DHCPD6_LEASES", "dhcpd6_leases"),
            ("DHCPD_LEASES_OUI_DB", "oui_db"),
        ] {
            if let Ok(value) = std::env::var(var) {
                config.set(key, &value);
            }
        }

        Ok(config)
    }

    fn set(&mut self, key: &str, value: &str) {
        match key {
            "dhcpd_conf" => self.dhcpd_conf = PathBuf::from(value),
            "dhcpd_leases" => self.dhcpd_leases = PathBuf::from(value),
            "dhcpd6_conf" => self.dhcpd6_conf = PathBuf::from(value),
            "dhcpd6_leases" => self.dhcpd6_leases = PathBuf::from(value),
            "oui_db" => self.oui_db = Some(PathBuf::from(value)).filter(|p| !p.as_os_str().is_empty()),
            _ => {}
        }
    }

    /// Config file and lease file for `family`.
    pub fn paths(&self, family: AddressFamily) -> (&Path, &Path) {
        match family {
            AddressFamily::V4 => (&self.dhcpd_conf, &self.dhcpd_leases),
            AddressFamily::V6 => (&self.dhcpd6_conf, &self.dhcpd6_leases),
        }
    }
}
