//! Lease record domain model.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use macaddr::MacAddr6;

use super::duid::Duid;
use crate::error::FieldError;

/// Timestamp format used by dhcpd (`2024/03/01 12:00:00`, always UTC).
const LEASE_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// One edge of a lease validity window.
///
/// Ordered so that unset sorts first and always-valid sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LeaseTime {
    /// Not recorded for this lease.
    #[default]
    Unset,
    /// A concrete instant, in the local zone.
    At(DateTime<Local>),
    /// No bound: static reservations and `never` leases.
    Always,
}

impl LeaseTime {
    /// Parse the value of a `starts`/`ends`/`cltt` statement.
    ///
    /// Accepts `W YYYY/MM/DD HH:MM:SS` (weekday optional), `epoch N`
    /// and `never`.
    pub fn parse(value: &str) -> Result<Self, FieldError> {
        let value = value.trim();
        if value == "never" {
            return Ok(Self::Always);
        }

        if let Some(secs) = value.strip_prefix("epoch ") {
            let secs: i64 = secs
                .trim()
                .parse()
                .map_err(|_| FieldError::MalformedTimestamp(value.to_string()))?;
            return Utc
                .timestamp_opt(secs, 0)
                .single()
                .map(|t| Self::At(t.with_timezone(&Local)))
                .ok_or_else(|| FieldError::MalformedTimestamp(value.to_string()));
        }

        // Drop the leading day-of-week digit if present.
        let stamp = match value.split_once(' ') {
            Some((weekday, rest)) if weekday.len() == 1 => rest,
            _ => value,
        };

        let naive = NaiveDateTime::parse_from_str(stamp, LEASE_TIME_FORMAT)
            .map_err(|_| FieldError::MalformedTimestamp(value.to_string()))?;
        Ok(Self::At(Utc.from_utc_datetime(&naive).with_timezone(&Local)))
    }

    pub fn instant(&self) -> Option<DateTime<Local>> {
        match self {
            Self::At(t) => Some(*t),
            _ => None,
        }
    }
}

impl fmt::Display for LeaseTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "-"),
            Self::At(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
            Self::Always => write!(f, "static"),
        }
    }
}

/// Lease binding state as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum BindingState {
    Active,
    Free,
    Expired,
    Released,
    Abandoned,
    Backup,
    /// Synthesized for configuration reservations, never parsed.
    Static,
    /// Anything else the server writes.
    Other(String),
    /// No `binding state` statement seen.
    #[default]
    Unknown,
}

impl BindingState {
    /// Parse a `binding state` value from the lease file.
    pub fn from_lease(value: &str) -> Self {
        match value {
            "active" => Self::Active,
            "free" => Self::Free,
            "expired" => Self::Expired,
            "released" => Self::Released,
            "abandoned" => Self::Abandoned,
            "backup" => Self::Backup,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for BindingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Free => write!(f, "free"),
            Self::Expired => write!(f, "expired"),
            Self::Released => write!(f, "released"),
            Self::Abandoned => write!(f, "abandoned"),
            Self::Backup => write!(f, "backup"),
            Self::Static => write!(f, "static"),
            Self::Other(s) => write!(f, "{}", s),
            Self::Unknown => write!(f, "-"),
        }
    }
}

/// One entry of the reconciled view, keyed by address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseRecord {
    pub address: IpAddr,
    pub mac: Option<MacAddr6>,
    /// Reservation label (`host <name>`), config only
    pub host: Option<String>,
    /// `option host-name` from the config
    pub hostname_option: Option<String>,
    /// Hostname the client asked for, lease file only
    pub client_hostname: Option<String>,
    /// `ddns-fwd-name` recorded by the server
    pub dns_name: Option<String>,
    pub start: LeaseTime,
    pub end: LeaseTime,
    pub binding_state: BindingState,
    /// IPv6 only
    pub iaid: Option<u32>,
    /// IPv6 only
    pub duid: Option<Duid>,
}

impl LeaseRecord {
    /// A bare record for an address; every other field unset.
    pub fn new(address: IpAddr) -> Self {
        Self {
            address,
            mac: None,
            host: None,
            hostname_option: None,
            client_hostname: None,
            dns_name: None,
            start: LeaseTime::Unset,
            end: LeaseTime::Unset,
            binding_state: BindingState::Unknown,
            iaid: None,
            duid: None,
        }
    }

    /// True for records synthesized from configuration reservations.
    pub fn is_static(&self) -> bool {
        self.binding_state == BindingState::Static
    }

    /// True if the lease ended before `now`. Static and open-ended leases never expire.
    pub fn is_expired_at(&self, now: DateTime<Local>) -> bool {
        match self.end {
            LeaseTime::At(end) => end < now,
            _ => false,
        }
    }
}

/// A config reservation with no fixed address, known only by its MAC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IplessReservation {
    pub mac: MacAddr6,
    pub host: String,
    pub hostname_option: Option<String>,
}

/// Parse a MAC literal, accepting one or two hex digits per octet and `:` or `-`.
pub fn parse_mac(value: &str) -> Result<MacAddr6, FieldError> {
    let value = value.trim();
    let octets: Vec<&str> = value.split([':', '-']).collect();
    if octets.len() != 6 {
        return Err(FieldError::MalformedMac(value.to_string()));
    }

    let mut bytes = [0u8; 6];
    for (slot, octet) in bytes.iter_mut().zip(&octets) {
        if octet.is_empty() || octet.len() > 2 {
            return Err(FieldError::MalformedMac(value.to_string()));
        }
        *slot = u8::from_str_radix(octet, 16)
            .map_err(|_| FieldError::MalformedMac(value.to_string()))?;
    }
    Ok(MacAddr6::from(bytes))
}

/// Lowercase colon-hex form (`aa:bb:cc:dd:ee:ff`).
pub fn format_mac(mac: &MacAddr6) -> String {
    mac.as_bytes()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}
