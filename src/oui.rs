//! MAC vendor lookup by OUI (first three octets).
//!
//! Reads either the IEEE registry text (`oui.txt`) or a JSON array of
//! `{"macPrefix": ..., "vendorName": ...}` objects.

use std::collections::HashMap;
use std::path::Path;

use macaddr::MacAddr6;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::OuiError;

/// `00-22-72   (hex)   American Micro-Fuel Device Corp.`
const REGISTRY_LINE: &str =
    r"^\s*([0-9A-Fa-f]{2})-([0-9A-Fa-f]{2})-([0-9A-Fa-f]{2})\s+\S+\s+(.+?)\s*$";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonVendor {
    mac_prefix: String,
    vendor_name: String,
}

/// OUI prefix to vendor name.
#[derive(Debug, Default)]
pub struct OuiDb {
    vendors: HashMap<[u8; 3], String>,
}

impl OuiDb {
    /// Load a database file, picking the format from its first character.
    pub fn load(path: &Path) -> Result<Self, OuiError> {
        let content = std::fs::read_to_string(path)?;
        let db = if content.trim_start().starts_with('[') {
            Self::from_json(&content)?
        } else {
            Self::from_registry_text(&content)?
        };
        debug!("Loaded {} OUI prefixes from {}", db.len(), path.display());
        Ok(db)
    }

    pub fn from_registry_text(content: &str) -> Result<Self, OuiError> {
        let re = Regex::new(REGISTRY_LINE)?;
        let mut vendors = HashMap::new();

        for caps in content.lines().filter_map(|line| re.captures(line)) {
            let octet = |i: usize| u8::from_str_radix(&caps[i], 16).ok();
            if let (Some(a), Some(b), Some(c)) = (octet(1), octet(2), octet(3)) {
                vendors.insert([a, b, c], caps[4].to_string());
            }
        }

        Ok(Self { vendors })
    }

    pub fn from_json(content: &str) -> Result<Self, OuiError> {
        let entries: Vec<JsonVendor> = serde_json::from_str(content)?;
        let vendors = entries
            .into_iter()
            .filter_map(|entry| Some((parse_prefix(&entry.mac_prefix)?, entry.vendor_name)))
            .collect();
        Ok(Self { vendors })
    }

    pub fn lookup(&self, mac: &MacAddr6) -> Option<&str> {
        let b = mac.as_bytes();
        self.vendors.get(&[b[0], b[1], b[2]]).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vendors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
    }
}

/// Parse the first three octets of `00:1B:21`, `00-1B-21` or `001B21`.
fn parse_prefix(prefix: &str) -> Option<[u8; 3]> {
    let hex: String = prefix.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    if hex.len() < 6 {
        return None;
    }
    let octet = |i: usize| u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok();
    Some([octet(0)?, octet(1)?, octet(2)?])
}
