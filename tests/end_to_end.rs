//! Whole-pass tests: config file and lease database on disk through
//! `load_family`.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use dhcpd_leases::domain::{format_mac, AddressFamily, BindingState, Duid, LeaseTime};
use dhcpd_leases::error::{LoadError, RecordError};
use dhcpd_leases::load_family;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

const DHCPD_CONF: &str = r#"
# office network
subnet 10.0.0.0 netmask 255.255.255.0 {
    range 10.0.0.100 10.0.0.200;

    host printer {
        hardware ethernet aa:bb:cc:dd:ee:ff;
        fixed-address 10.0.0.5;
        option host-name "printer";
    }

    host laptop {
        hardware ethernet 00:11:22:33:44:55;
        option host-name "laptop";
    }
}
"#;

const DHCPD_LEASES: &str = r#"
# The format of this file is documented in the dhcpd.leases(5) manual page.
authoring-byte-order little-endian;

lease 10.0.0.150 {
  starts 4 2024/01/04 10:00:00;
  ends 4 2024/01/04 22:00:00;
  cltt 4 2024/01/04 10:00:00;
  binding state active;
  next binding state free;
  rewind binding state free;
  hardware ethernet 00:11:22:33:44:55;
  client-hostname "dell-xps";
}
lease 10.0.0.151 {
  starts 4 2024/01/04 11:00:00;
  ends 4 2024/01/04 23:00:00;
  binding state active;
  hardware ethernet 66:77:88:99:aa:bb;
}
lease 10.0.0.151 {
  starts 4 2024/01/04 11:00:00;
  ends 4 2024/01/04 11:30:00;
  binding state free;
  hardware ethernet 66:77:88:99:aa:bb;
}
lease 10.0.0.5 {
  starts 4 2024/01/04 09:00:00;
  ends 4 2024/01/04 21:00:00;
  binding state active;
  hardware ethernet aa:bb:cc:dd:ee:ff;
  client-hostname "old-printer";
}
lease 10.0.0.160 {
  starts 4 2024/13/45 99:00:00;
  binding state active;
}
"#;

#[test]
fn test_static_reservation_with_empty_lease_file() {
    let dir = TempDir::new().unwrap();
    let conf = write(
        &dir,
        "dhcpd.conf",
        "host printer { hardware ethernet aa:bb:cc:dd:ee:ff; fixed-address 10.0.0.5; option host-name \"printer\"; }\n",
    );
    let leases = write(&dir, "dhcpd.leases", "");

    let report = load_family(AddressFamily::V4, &conf, &leases).unwrap();
    assert_eq!(report.records.len(), 1);
    assert!(report.warnings.is_empty());

    let record = &report.records[&ip("10.0.0.5")];
    assert_eq!(format_mac(&record.mac.unwrap()), "aa:bb:cc:dd:ee:ff");
    assert_eq!(record.host.as_deref(), Some("printer"));
    assert_eq!(record.hostname_option.as_deref(), Some("printer"));
    assert_eq!(record.binding_state, BindingState::Static);
    assert_eq!(record.start, LeaseTime::Always);
    assert_eq!(record.end, LeaseTime::Always);
}

#[test]
fn test_full_v4_pass() {
    let dir = TempDir::new().unwrap();
    let conf = write(&dir, "dhcpd.conf", DHCPD_CONF);
    let leases = write(&dir, "dhcpd.leases", DHCPD_LEASES);

    let report = load_family(AddressFamily::V4, &conf, &leases).unwrap();
    assert_eq!(report.family, AddressFamily::V4);

    let addresses: Vec<IpAddr> = report.records.keys().copied().collect();
    assert_eq!(
        addresses,
        vec![ip("10.0.0.5"), ip("10.0.0.150"), ip("10.0.0.151")]
    );

    // The reservation replaces the dynamic lease for its address.
    let printer = &report.records[&ip("10.0.0.5")];
    assert!(printer.is_static());
    assert_eq!(printer.client_hostname, None);

    // An IP-less reservation names the dynamic lease with the same MAC.
    let laptop = &report.records[&ip("10.0.0.150")];
    assert_eq!(laptop.host.as_deref(), Some("laptop"));
    assert_eq!(laptop.hostname_option.as_deref(), Some("laptop"));
    assert_eq!(laptop.client_hostname.as_deref(), Some("dell-xps"));
    assert_eq!(laptop.binding_state, BindingState::Active);

    // The later block for an address wins.
    let reused = &report.records[&ip("10.0.0.151")];
    assert_eq!(reused.binding_state, BindingState::Free);
}

#[test]
fn test_warnings_carry_file_and_line() {
    let dir = TempDir::new().unwrap();
    let conf = write(&dir, "dhcpd.conf", DHCPD_CONF);
    let leases = write(&dir, "dhcpd.leases", DHCPD_LEASES);

    let report = load_family(AddressFamily::V4, &conf, &leases).unwrap();
    assert_eq!(report.warnings.len(), 1);

    let warning = &report.warnings[0];
    assert_eq!(warning.source_file, leases);
    assert_eq!(warning.block, "10.0.0.160");
    assert_eq!(warning.line, 34);
    assert!(matches!(
        warning.error,
        RecordError::Field { field: "starts", .. }
    ));
    assert!(!report.records.contains_key(&ip("10.0.0.160")));
}

#[test]
fn test_v6_pass_decodes_iana() {
    let dir = TempDir::new().unwrap();
    let conf = write(
        &dir,
        "dhcpd6.conf",
        "host ws { hardware ethernet 00:0c:29:aa:bb:cc; fixed-address6 fc00::10; }\n",
    );
    let leases = write(
        &dir,
        "dhcpd6.leases",
        r#"ia-na "\000\000\000\007\000\003\000\001\000\014)\001\002\003" {
  cltt 4 2024/01/04 10:00:00;
  iaaddr fc00::1 {
    binding state active;
    preferred-life 375;
    max-life 600;
    ends 4 2024/01/04 10:10:00;
  }
}
"#,
    );

    let report = load_family(AddressFamily::V6, &conf, &leases).unwrap();
    assert_eq!(report.family, AddressFamily::V6);
    assert!(report.warnings.is_empty());

    let lease = &report.records[&ip("fc00::1")];
    assert_eq!(lease.binding_state, BindingState::Active);
    assert_eq!(lease.iaid, Some(7));
    assert!(matches!(lease.duid, Some(Duid::LinkLayer { .. })));
    assert_eq!(format_mac(&lease.mac.unwrap()), "00:0c:29:01:02:03");
    assert!(matches!(lease.end, LeaseTime::At(_)));

    let ws = &report.records[&ip("fc00::10")];
    assert!(ws.is_static());
    assert_eq!(ws.host.as_deref(), Some("ws"));
}

#[test]
fn test_missing_file_fails_the_pass() {
    let dir = TempDir::new().unwrap();
    let conf = write(&dir, "dhcpd.conf", DHCPD_CONF);
    let missing = Path::new("/nonexistent/dhcpd.leases");

    let result = load_family(AddressFamily::V4, &conf, missing);
    match result {
        Err(LoadError::Open { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected open error, got {:?}", other),
    }
}

#[test]
fn test_non_utf8_config_still_reports() {
    let dir = TempDir::new().unwrap();
    let conf = dir.path().join("dhcpd.conf");
    std::fs::write(
        &conf,
        b"# Drucker im B\xfcro\nhost printer {\n  hardware ethernet aa:bb:cc:dd:ee:ff;\n  fixed-address 10.0.0.5;\n} # printer\n",
    )
    .unwrap();
    let leases = write(&dir, "dhcpd.leases", "");

    let report = load_family(AddressFamily::V4, &conf, &leases).unwrap();
    assert!(report.warnings.is_empty());
    assert_eq!(report.records[&ip("10.0.0.5")].host.as_deref(), Some("printer"));
}
