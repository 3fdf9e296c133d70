//! DHCPv6 client identifier (DUID) decoding.
//!
//! The lease database stores each IA-NA as a quoted string holding
//! `IAID (4 bytes) || DUID`, with unprintable bytes written as `\ddd`
//! octal escapes. This module turns that string back into bytes and
//! dispatches the DUID on its 2-byte type tag (RFC 8415 section 11).

use std::fmt;

use macaddr::MacAddr6;

use crate::error::DuidError;

/// DUID type codes.
mod duid_types {
    pub const LLT: u16 = 1;
    pub const EN: u16 = 2;
    pub const LL: u16 = 3;
    pub const UUID: u16 = 4;
}

/// A decoded DHCP Unique Identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Duid {
    /// Type 1: link-layer address plus time
    LinkLayerPlusTime {
        hardware_type: u16,
        time: u32,
        address: Vec<u8>,
    },
    /// Type 2: vendor-assigned, based on enterprise number
    VendorSpecific {
        enterprise_number: u32,
        identifier: Vec<u8>,
    },
    /// Type 3: link-layer address
    LinkLayer { hardware_type: u16, address: Vec<u8> },
    /// Type 4: UUID (expected 16 bytes, not enforced)
    Uuid(Vec<u8>),
}

impl Duid {
    /// Decode a raw DUID blob.
    pub fn decode(data: &[u8]) -> Result<Self, DuidError> {
        let tag = read_u16(data, 0)?;
        let body = &data[2..];

        match tag {
            duid_types::LLT => Ok(Self::LinkLayerPlusTime {
                hardware_type: read_u16(body, 0)?,
                time: read_u32(body, 2)?,
                address: body[6..].to_vec(),
            }),
            duid_types::EN => Ok(Self::VendorSpecific {
                enterprise_number: read_u32(body, 0)?,
                identifier: body[4..].to_vec(),
            }),
            duid_types::LL => Ok(Self::LinkLayer {
                hardware_type: read_u16(body, 0)?,
                address: body[2..].to_vec(),
            }),
            duid_types::UUID => Ok(Self::Uuid(body.to_vec())),
            other => Err(DuidError::UnsupportedDuidType(other)),
        }
    }

    /// Decode a DUID written as colon-separated hex (`00:03:00:01:...`),
    /// the form used by `host-identifier option dhcp6.client-id`.
    pub fn from_hex(text: &str) -> Result<Self, DuidError> {
        let bytes = text
            .trim()
            .split(':')
            .map(|octet| u8::from_str_radix(octet, 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| DuidError::MalformedHex(text.to_string()))?;
        Self::decode(&bytes)
    }

    /// The numeric type tag of this variant.
    pub fn type_code(&self) -> u16 {
        match self {
            Self::LinkLayerPlusTime { .. } => duid_types::LLT,
            Self::VendorSpecific { .. } => duid_types::EN,
            Self::LinkLayer { .. } => duid_types::LL,
            Self::Uuid(_) => duid_types::UUID,
        }
    }

    /// Short label for display.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::LinkLayerPlusTime { .. } => "LLT",
            Self::VendorSpecific { .. } => "EN",
            Self::LinkLayer { .. } => "LL",
            Self::Uuid(_) => "UUID",
        }
    }

    /// Hardware address carried by link-layer DUIDs.
    ///
    /// Uses the trailing six bytes of the address; other variants
    /// carry no hardware address.
    pub fn mac(&self) -> Option<MacAddr6> {
        let address = match self {
            Self::LinkLayerPlusTime { address, .. } | Self::LinkLayer { address, .. } => address,
            _ => return None,
        };
        if address.len() < 6 {
            return None;
        }
        let tail = &address[address.len() - 6..];
        Some(MacAddr6::new(tail[0], tail[1], tail[2], tail[3], tail[4], tail[5]))
    }
}

impl fmt::Display for Duid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = match self {
            Self::LinkLayerPlusTime { address, .. } | Self::LinkLayer { address, .. } => address,
            Self::VendorSpecific { identifier, .. } => identifier,
            Self::Uuid(uuid) => uuid,
        };
        write!(f, "{}:{}", self.type_name(), hex(bytes))
    }
}

/// An Identity Association for Non-temporary Addresses, as keyed in the lease file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IaNa {
    pub iaid: u32,
    pub duid: Duid,
}

impl IaNa {
    /// Decode the quoted `ia-na` payload from a lease file start line.
    pub fn from_lease_payload(raw: &str) -> Result<Self, DuidError> {
        let bytes = unescape_octal(raw)?;
        let iaid = read_u32(&bytes, 0)?;
        let duid = Duid::decode(&bytes[4..])?;
        Ok(Self { iaid, duid })
    }
}

/// Unwrap a quoted, octal-escaped string into raw bytes.
///
/// `\ddd` is one byte in octal, `\` followed by anything else is that
/// character, everything else stands for itself.
pub fn unescape_octal(raw: &str) -> Result<Vec<u8>, DuidError> {
    let inner = raw
        .trim()
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| DuidError::MalformedIanaPayload(raw.to_string()))?;

    let bytes = inner.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let octal = bytes.get(i + 1..i + 4).filter(|d| d.iter().all(|b| (b'0'..=b'7').contains(b)));
        if let Some(digits) = octal {
            let value = digits
                .iter()
                .fold(0u16, |acc, d| acc * 8 + u16::from(d - b'0'));
            let byte = u8::try_from(value)
                .map_err(|_| DuidError::MalformedIanaPayload(raw.to_string()))?;
            out.push(byte);
            i += 4;
        } else if let Some(&escaped) = bytes.get(i + 1) {
            out.push(escaped);
            i += 2;
        } else {
            return Err(DuidError::MalformedIanaPayload(raw.to_string()));
        }
    }

    Ok(out)
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, DuidError> {
    match data.get(offset..offset + 2) {
        Some(b) => Ok(u16::from_be_bytes([b[0], b[1]])),
        None => Err(DuidError::Truncated {
            needed: offset + 2,
            actual: data.len(),
        }),
    }
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, DuidError> {
    match data.get(offset..offset + 4) {
        Some(b) => Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]])),
        None => Err(DuidError::Truncated {
            needed: offset + 4,
            actual: data.len(),
        }),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}
