//! dhcpd-leases - reconciled view of ISC dhcpd reservations and leases.
//!
//! Each address family is one independent pass: parse the config file's
//! `host` reservations, parse the lease database, then merge them into a
//! single address-keyed record set.

pub mod config;
pub mod domain;
pub mod error;
pub mod oui;
pub mod parser;
pub mod reconcile;
pub mod reporter;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::net::IpAddr;
use std::path::Path;

use tracing::{info, warn};

use crate::domain::{AddressFamily, LeaseRecord};
use crate::error::{LoadError, ParseWarning};
use crate::parser::{BlockError, ConfigParser, LeaseFileParser};

/// The outcome of one address family's pass.
#[derive(Debug)]
pub struct LeaseReport {
    pub family: AddressFamily,
    pub records: BTreeMap<IpAddr, LeaseRecord>,
    /// Blocks skipped in either file.
    pub warnings: Vec<ParseWarning>,
}

/// Parse and reconcile one address family.
///
/// Skipped blocks end up in `warnings`; only a file that cannot be
/// opened or read fails the pass.
pub fn load_family(
    family: AddressFamily,
    config_path: &Path,
    lease_path: &Path,
) -> Result<LeaseReport, LoadError> {
    let config_parser = ConfigParser::new().map_err(|source| LoadError::Scan {
        path: config_path.to_path_buf(),
        source,
    })?;
    let statics = config_parser
        .parse(open(config_path)?)
        .map_err(|source| LoadError::Scan {
            path: config_path.to_path_buf(),
            source,
        })?;

    let lease_parser = LeaseFileParser::new(family).map_err(|source| LoadError::Scan {
        path: lease_path.to_path_buf(),
        source,
    })?;
    let dynamic = lease_parser
        .parse(open(lease_path)?)
        .map_err(|source| LoadError::Scan {
            path: lease_path.to_path_buf(),
            source,
        })?;

    let mut warnings = to_warnings(config_path, statics.warnings);
    warnings.extend(to_warnings(lease_path, dynamic.warnings));

    let records = reconcile::reconcile(
        dynamic.records,
        statics.records.by_address,
        &statics.records.ip_less,
    );

    info!(
        "{}: {} records, {} skipped blocks",
        family,
        records.len(),
        warnings.len()
    );

    Ok(LeaseReport {
        family,
        records,
        warnings,
    })
}

fn open(path: &Path) -> Result<BufReader<File>, LoadError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })
}

fn to_warnings(path: &Path, errors: Vec<BlockError>) -> Vec<ParseWarning> {
    errors
        .into_iter()
        .map(|e| {
            let warning = ParseWarning {
                source_file: path.to_path_buf(),
                line: e.line,
                block: e.key,
                error: e.error,
            };
            warn!("{}", warning);
            warning
        })
        .collect()
}
