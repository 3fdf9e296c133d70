//! Merging static reservations with the lease database.
//!
//! Precedence, in order:
//!
//! 1. dynamic leases, keyed by address;
//! 2. fixed-address reservations replace the dynamic record at the same
//!    address outright. The config is authoritative for that address, so
//!    dynamic-only fields such as `client_hostname` are dropped;
//! 3. IP-less reservations lend `host` / `hostname_option` to any record
//!    with a matching MAC, without overwriting values already present.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;

use macaddr::MacAddr6;
use tracing::debug;

use crate::domain::{IplessReservation, LeaseRecord};

/// Merge one address family's records.
pub fn reconcile(
    dynamic: BTreeMap<IpAddr, LeaseRecord>,
    statics: BTreeMap<IpAddr, LeaseRecord>,
    ip_less: &HashMap<MacAddr6, IplessReservation>,
) -> BTreeMap<IpAddr, LeaseRecord> {
    let mut merged = dynamic;

    for (address, record) in statics {
        if merged.insert(address, record).is_some() {
            debug!("Reservation overrides dynamic lease for {}", address);
        }
    }

    for record in merged.values_mut() {
        let Some(entry) = record.mac.as_ref().and_then(|mac| ip_less.get(mac)) else {
            continue;
        };
        fill_from_ipless(record, entry);
    }

    merged
}

fn fill_from_ipless(record: &mut LeaseRecord, entry: &IplessReservation) {
    if record.host.is_none() {
        record.host = Some(entry.host.clone());
    }
    if record.hostname_option.is_none() {
        record.hostname_option = entry.hostname_option.clone();
    }
}
