//! Static reservation parser for `dhcpd.conf` / `dhcpd6.conf`.

use std::collections::{BTreeMap, HashMap};
use std::io::BufRead;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use macaddr::MacAddr6;
use tracing::debug;

use super::block_scanner::{BlockError, BlockScanner};
use super::Parsed;
use crate::domain::{parse_mac, BindingState, Duid, IplessReservation, LeaseRecord, LeaseTime};
use crate::error::{FieldError, RecordError, ScanError};

/// `host` blocks may sit indented inside `subnet`/`group`; they end on
/// the first line closing with `}`.
const HOST_START: &str = r"^\s*host\s+([^\s{]+)\s*\{";
const HOST_END: &str = r"\}\s*$";

#[derive(Debug, Default)]
struct HostFields {
    mac: Option<MacAddr6>,
    fixed_v4: Option<Ipv4Addr>,
    fixed_v6: Option<Ipv6Addr>,
    hostname: Option<String>,
    client_id: Option<Duid>,
}

impl HostFields {
    fn address(&self) -> Option<IpAddr> {
        self.fixed_v4
            .map(IpAddr::V4)
            .or_else(|| self.fixed_v6.map(IpAddr::V6))
    }
}

fn set_mac(h: &mut HostFields, v: &str) -> Result<(), FieldError> {
    h.mac = Some(parse_mac(v)?);
    Ok(())
}

fn set_fixed_v4(h: &mut HostFields, v: &str) -> Result<(), FieldError> {
    // dhcpd allows a list; the first entry is the one served first.
    let first = v.split(',').next().unwrap_or(v).trim();
    h.fixed_v4 = Some(
        first
            .parse()
            .map_err(|_| FieldError::MalformedAddress(first.to_string()))?,
    );
    Ok(())
}

fn set_fixed_v6(h: &mut HostFields, v: &str) -> Result<(), FieldError> {
    let first = v.split(',').next().unwrap_or(v).trim();
    h.fixed_v6 = Some(
        first
            .parse()
            .map_err(|_| FieldError::MalformedAddress(first.to_string()))?,
    );
    Ok(())
}

fn set_hostname(h: &mut HostFields, v: &str) -> Result<(), FieldError> {
    h.hostname = Some(v.to_string());
    Ok(())
}

fn set_client_id(h: &mut HostFields, v: &str) -> Result<(), FieldError> {
    h.client_id = Some(Duid::from_hex(v)?);
    Ok(())
}

/// Static reservations from one config file.
#[derive(Debug, Default)]
pub struct StaticLeases {
    /// Reservations with a fixed address.
    pub by_address: BTreeMap<IpAddr, LeaseRecord>,
    /// Reservations with only a MAC.
    pub ip_less: HashMap<MacAddr6, IplessReservation>,
}

/// Parser for `host` blocks.
pub struct ConfigParser {
    scanner: BlockScanner<HostFields>,
}

impl ConfigParser {
    pub fn new() -> Result<Self, ScanError> {
        let scanner = BlockScanner::builder(HOST_START, HOST_END)
            .field("hardware ethernet", r"hardware\s+ethernet\s+([^;\s]+)\s*;", set_mac)
            .field("fixed-address", r"fixed-address\s+([^;]+);", set_fixed_v4)
            .field("fixed-address6", r"fixed-address6\s+([^;]+);", set_fixed_v6)
            .field("host-name", r#"option\s+host-name\s+"([^"]*)"\s*;"#, set_hostname)
            .field(
                "client-id",
                r"host-identifier\s+option\s+dhcp6\.client-id\s+([0-9A-Fa-f:]+)\s*;",
                set_client_id,
            )
            .build()?;
        Ok(Self { scanner })
    }

    /// Parse a config file.
    ///
    /// Every record is `static` with an always-valid window. A host with
    /// no fixed address goes to `ip_less` under its MAC; with neither it
    /// is reported as `MissingKeyField`.
    pub fn parse<R: BufRead>(&self, reader: R) -> Result<Parsed<StaticLeases>, ScanError> {
        let outcome = self.scanner.scan(reader)?;
        let mut leases = StaticLeases::default();
        let mut warnings = outcome.errors;

        for block in outcome.blocks {
            let fields = block.fields;
            let mac = fields
                .mac
                .or_else(|| fields.client_id.as_ref().and_then(Duid::mac));

            match (fields.address(), mac) {
                (Some(address), mac) => {
                    let record = LeaseRecord {
                        mac,
                        host: Some(block.key),
                        hostname_option: fields.hostname,
                        start: LeaseTime::Always,
                        end: LeaseTime::Always,
                        binding_state: BindingState::Static,
                        duid: fields.client_id,
                        ..LeaseRecord::new(address)
                    };
                    if leases.by_address.insert(address, record).is_some() {
                        debug!("Reservation for {} redefined at line {}", address, block.line);
                    }
                }
                (None, Some(mac)) => {
                    leases.ip_less.insert(
                        mac,
                        IplessReservation {
                            mac,
                            host: block.key,
                            hostname_option: fields.hostname,
                        },
                    );
                }
                (None, None) => warnings.push(BlockError {
                    line: block.line,
                    error: RecordError::MissingKeyField {
                        block: block.key.clone(),
                    },
                    key: block.key,
                }),
            }
        }

        debug!(
            "Parsed {} fixed and {} IP-less reservations",
            leases.by_address.len(),
            leases.ip_less.len()
        );

        Ok(Parsed {
            records: leases,
            warnings,
        })
    }
}
