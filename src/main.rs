//! dhcpd-leases - show ISC dhcpd reservations and leases as one table.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use dhcpd_leases::config::Config;
use dhcpd_leases::domain::AddressFamily;
use dhcpd_leases::oui::OuiDb;
use dhcpd_leases::reporter::{LeaseReporter, Origin, RecordFilter, SortKey, TableReporter};

#[derive(Parser)]
#[command(name = "dhcpd-leases")]
#[command(about = "Reconcile ISC dhcpd host reservations with the lease database")]
struct Args {
    /// Only the IPv4 server
    #[arg(short = '4')]
    v4_only: bool,

    /// Only the IPv6 server
    #[arg(short = '6')]
    v6_only: bool,

    /// Column to sort rows by
    #[arg(short, long, value_enum, default_value_t = SortKey::Ip)]
    sort: SortKey,

    /// Hide leases whose end time has passed
    #[arg(long)]
    no_expired: bool,

    /// Show only reservations from the config file
    #[arg(long, conflicts_with = "dynamic_only")]
    static_only: bool,

    /// Show only leases that have no reservation
    #[arg(long)]
    dynamic_only: bool,

    /// MAC vendor database (IEEE oui.txt or JSON)
    #[arg(long)]
    oui_db: Option<PathBuf>,

    /// Settings file (default: $DHCPD_LEASES_CONFIG or /etc/dhcpd-leases.conf)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// dhcpd.conf path
    #[arg(long)]
    config: Option<PathBuf>,

    /// dhcpd.leases path
    #[arg(long)]
    leases: Option<PathBuf>,

    /// dhcpd6.conf path
    #[arg(long)]
    config6: Option<PathBuf>,

    /// dhcpd6.leases path
    #[arg(long)]
    leases6: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn families(&self) -> Vec<AddressFamily> {
        match (self.v4_only, self.v6_only) {
            (true, false) => vec![AddressFamily::V4],
            (false, true) => vec![AddressFamily::V6],
            _ => AddressFamily::ALL.to_vec(),
        }
    }

    fn filter(&self) -> RecordFilter {
        let only = if self.static_only {
            Some(Origin::Static)
        } else if self.dynamic_only {
            Some(Origin::Dynamic)
        } else {
            None
        };
        RecordFilter {
            hide_expired: self.no_expired,
            only,
        }
    }

    fn config(&self) -> Result<Config> {
        let mut config = match &self.settings {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
        .context("failed to load settings")?;

        if let Some(path) = &self.config {
            config.dhcpd_conf = path.clone();
        }
        if let Some(path) = &self.leases {
            config.dhcpd_leases = path.clone();
        }
        if let Some(path) = &self.config6 {
            config.dhcpd6_conf = path.clone();
        }
        if let Some(path) = &self.leases6 {
            config.dhcpd6_leases = path.clone();
        }
        if self.oui_db.is_some() {
            config.oui_db = self.oui_db.clone();
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match args.config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut reporter = TableReporter::new()
        .with_sort(args.sort)
        .with_filter(args.filter());
    if let Some(path) = &config.oui_db {
        match OuiDb::load(path) {
            Ok(db) => reporter = reporter.with_oui(db),
            Err(e) => warn!("Vendor lookup disabled, {}: {}", path.display(), e),
        }
    }

    let families = args.families();
    let mut failed = 0;
    for family in &families {
        let (config_path, lease_path) = config.paths(*family);
        match dhcpd_leases::load_family(*family, config_path, lease_path) {
            Ok(report) => reporter.report(&report),
            Err(e) => {
                eprintln!("error: {}: {}", family, e);
                failed += 1;
            }
        }
    }

    if failed == families.len() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
