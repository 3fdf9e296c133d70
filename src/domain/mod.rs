//! Domain models for dhcpd lease data.
//!
//! These types are independent of the text formats they are parsed
//! from and of how they are rendered.

mod duid;
mod family;
mod lease;

pub use duid::{unescape_octal, Duid, IaNa};
pub use family::AddressFamily;
pub use lease::{format_mac, parse_mac, BindingState, IplessReservation, LeaseRecord, LeaseTime};
