//! Lease database parser for `dhcpd.leases` / `dhcpd6.leases`.
//!
//! The database is append-only: a later block for an address supersedes
//! every earlier one, so the last block wins.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use macaddr::MacAddr6;
use tracing::debug;

use super::block_scanner::{Block, BlockError, BlockScanner};
use super::Parsed;
use crate::domain::{parse_mac, AddressFamily, BindingState, IaNa, LeaseRecord, LeaseTime};
use crate::error::{FieldError, RecordError, ScanError};

const LEASE_START: &str = r"^lease\s+(\S+)\s*\{";
const IANA_START: &str = r"^ia-na\s+(.+?)\s*\{\s*$";
/// Lease blocks close with `}` in column 0; nested `iaaddr` blocks are indented.
const BLOCK_END: &str = r"^\}";

mod patterns {
    pub const MAC: &str = r"^\s*hardware\s+ethernet\s+([^;\s]+)\s*;";
    pub const CLIENT_HOSTNAME: &str = r#"^\s*client-hostname\s+"([^"]*)"\s*;"#;
    pub const DNS_NAME: &str = r#"^\s*set\s+ddns-fwd-name\s*=\s*"([^"]*)"\s*;"#;
    pub const STARTS: &str = r"^\s*starts\s+([^;]+);";
    pub const ENDS: &str = r"^\s*ends\s+([^;]+);";
    pub const CLTT: &str = r"^\s*cltt\s+([^;]+);";
    // Anchored so `next binding state` / `rewind binding state` never match.
    pub const BINDING_STATE: &str = r"^\s*binding\s+state\s+([\w-]+)\s*;";
    pub const IAADDR: &str = r"^\s*iaaddr\s+([0-9A-Fa-f:.]+)\s*\{";
}

#[derive(Debug, Default)]
struct LeaseFields {
    mac: Option<MacAddr6>,
    client_hostname: Option<String>,
    dns_name: Option<String>,
    starts: LeaseTime,
    ends: LeaseTime,
    cltt: LeaseTime,
    binding_state: Option<BindingState>,
    iaaddr: Option<Ipv6Addr>,
}

fn set_mac(l: &mut LeaseFields, v: &str) -> Result<(), FieldError> {
    l.mac = Some(parse_mac(v)?);
    Ok(())
}

fn set_client_hostname(l: &mut LeaseFields, v: &str) -> Result<(), FieldError> {
    l.client_hostname = Some(v.to_string());
    Ok(())
}

fn set_dns_name(l: &mut LeaseFields, v: &str) -> Result<(), FieldError> {
    l.dns_name = Some(v.to_string());
    Ok(())
}

fn set_starts(l: &mut LeaseFields, v: &str) -> Result<(), FieldError> {
    l.starts = LeaseTime::parse(v)?;
    Ok(())
}

fn set_ends(l: &mut LeaseFields, v: &str) -> Result<(), FieldError> {
    l.ends = LeaseTime::parse(v)?;
    Ok(())
}

fn set_cltt(l: &mut LeaseFields, v: &str) -> Result<(), FieldError> {
    l.cltt = LeaseTime::parse(v)?;
    Ok(())
}

fn set_binding_state(l: &mut LeaseFields, v: &str) -> Result<(), FieldError> {
    l.binding_state = Some(BindingState::from_lease(v));
    Ok(())
}

fn set_iaaddr(l: &mut LeaseFields, v: &str) -> Result<(), FieldError> {
    l.iaaddr = Some(
        v.parse()
            .map_err(|_| FieldError::MalformedAddress(v.to_string()))?,
    );
    Ok(())
}

/// Parser for one family's lease database.
pub struct LeaseFileParser {
    family: AddressFamily,
    scanner: BlockScanner<LeaseFields>,
}

impl LeaseFileParser {
    pub fn new(family: AddressFamily) -> Result<Self, ScanError> {
        let scanner = match family {
            AddressFamily::V4 => BlockScanner::builder(LEASE_START, BLOCK_END)
                .field("hardware ethernet", patterns::MAC, set_mac)
                .field("client-hostname", patterns::CLIENT_HOSTNAME, set_client_hostname)
                .field("ddns-fwd-name", patterns::DNS_NAME, set_dns_name)
                .field("starts", patterns::STARTS, set_starts)
                .field("ends", patterns::ENDS, set_ends)
                .field("cltt", patterns::CLTT, set_cltt)
                .field("binding state", patterns::BINDING_STATE, set_binding_state),
            AddressFamily::V6 => BlockScanner::builder(IANA_START, BLOCK_END)
                .field("iaaddr", patterns::IAADDR, set_iaaddr)
                .field("ddns-fwd-name", patterns::DNS_NAME, set_dns_name)
                .field("ends", patterns::ENDS, set_ends)
                .field("cltt", patterns::CLTT, set_cltt)
                .field("binding state", patterns::BINDING_STATE, set_binding_state),
        }
        .build()?;

        Ok(Self { family, scanner })
    }

    /// Parse a lease database into address-keyed records.
    pub fn parse<R: BufRead>(
        &self,
        reader: R,
    ) -> Result<Parsed<BTreeMap<IpAddr, LeaseRecord>>, ScanError> {
        let outcome = self.scanner.scan(reader)?;
        let mut leases = BTreeMap::new();
        let mut warnings = outcome.errors;

        for block in outcome.blocks {
            let line = block.line;
            let converted = match self.family {
                AddressFamily::V4 => Self::v4_record(block),
                AddressFamily::V6 => Self::v6_record(block),
            };

            match converted {
                Ok(record) => {
                    leases.insert(record.address, record);
                }
                Err((key, error)) => warnings.push(BlockError { line, key, error }),
            }
        }

        debug!("Parsed {} {} leases", leases.len(), self.family);

        Ok(Parsed {
            records: leases,
            warnings,
        })
    }

    fn v4_record(block: Block<LeaseFields>) -> Result<LeaseRecord, (String, RecordError)> {
        let address: Ipv4Addr = match block.key.parse() {
            Ok(address) => address,
            Err(_) => {
                let error = RecordError::Field {
                    field: "lease",
                    line: block.line,
                    source: FieldError::MalformedAddress(block.key.clone()),
                };
                return Err((block.key, error));
            }
        };

        let fields = block.fields;
        // Older servers omit `starts`; the last transaction time is the best stand-in.
        let start = match fields.starts {
            LeaseTime::Unset => fields.cltt,
            starts => starts,
        };

        Ok(LeaseRecord {
            mac: fields.mac,
            client_hostname: fields.client_hostname,
            dns_name: fields.dns_name,
            start,
            end: fields.ends,
            binding_state: fields.binding_state.unwrap_or_default(),
            ..LeaseRecord::new(IpAddr::V4(address))
        })
    }

    fn v6_record(block: Block<LeaseFields>) -> Result<LeaseRecord, (String, RecordError)> {
        let iana = match IaNa::from_lease_payload(&block.key) {
            Ok(iana) => iana,
            Err(source) => {
                let error = RecordError::Duid {
                    block: block.key.clone(),
                    source,
                };
                return Err((block.key, error));
            }
        };

        let fields = block.fields;
        let Some(address) = fields.iaaddr else {
            let error = RecordError::MissingKeyField {
                block: block.key.clone(),
            };
            return Err((block.key, error));
        };

        Ok(LeaseRecord {
            mac: iana.duid.mac(),
            dns_name: fields.dns_name,
            // v6 leases carry no `starts`; the last transaction time is the start.
            start: fields.cltt,
            end: fields.ends,
            binding_state: fields.binding_state.unwrap_or_default(),
            iaid: Some(iana.iaid),
            duid: Some(iana.duid),
            ..LeaseRecord::new(IpAddr::V6(address))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Duid;
    use chrono::{Local, TimeZone, Utc};
    use std::io::Cursor;

    fn parse(family: AddressFamily, input: &str) -> Parsed<BTreeMap<IpAddr, LeaseRecord>> {
        LeaseFileParser::new(family)
            .unwrap()
            .parse(Cursor::new(input))
            .unwrap()
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    const V4_LEASE: &str = "\
# The format of this file is documented in the dhcpd.leases(5) manual page.
authoring-byte-order little-endian;

lease 10.0.0.100 {
  starts 5 2024/03/01 12:00:00;
  ends 5 2024/03/01 14:00:00;
  cltt 5 2024/03/01 12:00:00;
  binding state active;
  next binding state free;
  rewind binding state free;
  hardware ethernet 00:1b:21:3c:4d:5e;
  uid \"\\001\\000\\033!<M^\";
  set ddns-fwd-name = \"desk.example.com\";
  client-hostname \"desk\";
}
";

    mod v4_tests {
        use super::*;

        #[test]
        fn test_single_lease() {
            let parsed = parse(AddressFamily::V4, V4_LEASE);
            assert!(parsed.warnings.is_empty());

            let record = &parsed.records[&ip("10.0.0.100")];
            assert_eq!(record.mac, Some(parse_mac("00:1b:21:3c:4d:5e").unwrap()));
            assert_eq!(record.client_hostname.as_deref(), Some("desk"));
            assert_eq!(record.dns_name.as_deref(), Some("desk.example.com"));
            assert_eq!(record.binding_state, BindingState::Active);
            assert_eq!(
                record.start,
                LeaseTime::At(
                    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
                        .unwrap()
                        .with_timezone(&Local)
                )
            );
            assert_eq!(
                record.end.instant().map(|t| t.with_timezone(&Utc)),
                Some(Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap())
            );
            assert_eq!(record.host, None);
            assert_eq!(record.iaid, None);
        }

        #[test]
        fn test_later_block_supersedes_earlier() {
            let input = "lease 10.0.0.1 {\n  binding state active;\n  client-hostname \"old\";\n}\nlease 10.0.0.1 {\n  binding state free;\n}\n";
            let parsed = parse(AddressFamily::V4, input);
            let record = &parsed.records[&ip("10.0.0.1")];
            assert_eq!(record.binding_state, BindingState::Free);
            assert_eq!(record.client_hostname, None);
        }

        #[test]
        fn test_restated_binding_state() {
            let input = "lease 10.0.0.2 {\n  binding state active;\n  binding state expired;\n}\n";
            let parsed = parse(AddressFamily::V4, input);
            assert_eq!(parsed.records[&ip("10.0.0.2")].binding_state, BindingState::Expired);
        }

        #[test]
        fn test_ends_never() {
            let input = "lease 10.0.0.3 {\n  starts 1 2024/01/01 00:00:00;\n  ends never;\n}\n";
            let parsed = parse(AddressFamily::V4, input);
            assert_eq!(parsed.records[&ip("10.0.0.3")].end, LeaseTime::Always);
        }

        #[test]
        fn test_missing_starts_uses_cltt() {
            let input = "lease 10.0.0.4 {\n  cltt epoch 1709296200;\n}\n";
            let parsed = parse(AddressFamily::V4, input);
            assert!(matches!(parsed.records[&ip("10.0.0.4")].start, LeaseTime::At(_)));
        }

        #[test]
        fn test_bad_timestamp_skips_block() {
            let input = "lease 10.0.0.5 {\n  starts 5 2024/99/01 12:00:00;\n}\nlease 10.0.0.6 {\n  binding state free;\n}\n";
            let parsed = parse(AddressFamily::V4, input);
            assert_eq!(parsed.records.len(), 1);
            assert!(parsed.records.contains_key(&ip("10.0.0.6")));
            assert_eq!(parsed.warnings[0].key, "10.0.0.5");
            assert!(matches!(
                parsed.warnings[0].error,
                RecordError::Field {
                    field: "starts",
                    source: FieldError::MalformedTimestamp(_),
                    ..
                }
            ));
        }

        #[test]
        fn test_bad_address_skips_block() {
            let parsed = parse(AddressFamily::V4, "lease 10.0.0.300 {\n}\n");
            assert!(parsed.records.is_empty());
            assert_eq!(parsed.warnings.len(), 1);
        }

        #[test]
        fn test_truncated_lease() {
            let parsed = parse(AddressFamily::V4, "lease 10.0.0.7 {\n  binding state active;\n");
            assert!(parsed.records.is_empty());
            assert!(matches!(
                parsed.warnings[0].error,
                RecordError::TruncatedBlock { line: 1 }
            ));
        }

        #[test]
        fn test_v6_blocks_ignored_by_v4_parser() {
            let input = "ia-na \"\\001\\000\\000\\000\\000\\003\\000\\001\\000\\021\\042\\063\\104\\125\" {\n  iaaddr fc00::1 {\n  }\n}\n";
            let parsed = parse(AddressFamily::V4, input);
            assert!(parsed.records.is_empty());
            assert!(parsed.warnings.is_empty());
        }
    }

    mod v6_tests {
        use super::*;

        const V6_LEASE: &str = "\
server-duid \"\\000\\001\\000\\001\\036\\214\\303\\204\\000\\014)\\000\\000\\001\";

ia-na \"\\004\\000\\000\\000\\000\\003\\000\\001\\252\\273\\314\\335\\356\\377\" {
  cltt 5 2024/03/01 12:00:00;
  iaaddr fc00::1 {
    binding state active;
    preferred-life 27000;
    max-life 43200;
    ends 5 2024/03/01 20:00:00;
    set ddns-fwd-name = \"box.example.com\";
  }
}
";

        #[test]
        fn test_single_iana() {
            let parsed = parse(AddressFamily::V6, V6_LEASE);
            assert!(parsed.warnings.is_empty());

            let record = &parsed.records[&ip("fc00::1")];
            assert_eq!(record.binding_state, BindingState::Active);
            assert_eq!(record.iaid, Some(0x0400_0000));
            assert!(matches!(record.duid, Some(Duid::LinkLayer { hardware_type: 1, .. })));
            assert_eq!(record.mac, Some(parse_mac("aa:bb:cc:dd:ee:ff").unwrap()));
            assert_eq!(record.dns_name.as_deref(), Some("box.example.com"));
            assert_eq!(
                record.start.instant().map(|t| t.with_timezone(&Utc)),
                Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
            );
            assert!(matches!(record.end, LeaseTime::At(_)));
        }

        #[test]
        fn test_iana_without_iaaddr_discarded() {
            let input = "ia-na \"\\004\\000\\000\\000\\000\\003\\000\\001\\252\\273\\314\\335\\356\\377\" {\n  cltt 5 2024/03/01 12:00:00;\n}\n";
            let parsed = parse(AddressFamily::V6, input);
            assert!(parsed.records.is_empty());
            assert!(matches!(
                parsed.warnings[0].error,
                RecordError::MissingKeyField { .. }
            ));
        }

        #[test]
        fn test_unknown_duid_type_skips_block() {
            let input = "ia-na \"\\004\\000\\000\\000\\000\\011\\000\\001\" {\n  iaaddr fc00::2 {\n  }\n}\n";
            let parsed = parse(AddressFamily::V6, input);
            assert!(parsed.records.is_empty());
            assert!(matches!(
                parsed.warnings[0].error,
                RecordError::Duid {
                    source: crate::error::DuidError::UnsupportedDuidType(9),
                    ..
                }
            ));
        }

        #[test]
        fn test_unquoted_payload_skips_block() {
            let input = "ia-na 04:00:00:00 {\n  iaaddr fc00::3 {\n  }\n}\n";
            let parsed = parse(AddressFamily::V6, input);
            assert!(parsed.records.is_empty());
            assert!(matches!(
                parsed.warnings[0].error,
                RecordError::Duid {
                    source: crate::error::DuidError::MalformedIanaPayload(_),
                    ..
                }
            ));
        }

        #[test]
        fn test_vendor_duid_has_no_mac() {
            let input = "ia-na \"\\001\\000\\000\\000\\000\\002\\000\\000\\000\\011\\001\" {\n  iaaddr fc00::4 {\n    binding state free;\n  }\n}\n";
            let parsed = parse(AddressFamily::V6, input);
            let record = &parsed.records[&ip("fc00::4")];
            assert_eq!(record.mac, None);
            assert!(matches!(record.duid, Some(Duid::VendorSpecific { enterprise_number: 9, .. })));
        }
    }
}
