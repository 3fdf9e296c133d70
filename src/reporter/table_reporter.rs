//! Column-aligned table output.

use chrono::{DateTime, Local};
use clap::ValueEnum;

use crate::domain::{format_mac, AddressFamily, LeaseRecord};
use crate::oui::OuiDb;
use crate::reporter::LeaseReporter;
use crate::LeaseReport;

/// Column to order rows by. Ties keep address order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortKey {
    #[default]
    Ip,
    Mac,
    Host,
    Start,
    End,
    State,
}

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Static,
    Dynamic,
}

/// Which records to show.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFilter {
    pub hide_expired: bool,
    pub only: Option<Origin>,
}

impl RecordFilter {
    pub fn accepts(&self, record: &LeaseRecord, now: DateTime<Local>) -> bool {
        if self.hide_expired && record.is_expired_at(now) {
            return false;
        }
        match self.only {
            Some(Origin::Static) => record.is_static(),
            Some(Origin::Dynamic) => !record.is_static(),
            None => true,
        }
    }
}

/// Prints reports as aligned text tables on stdout, warnings on stderr.
pub struct TableReporter {
    sort: SortKey,
    filter: RecordFilter,
    oui: Option<OuiDb>,
}

impl TableReporter {
    pub fn new() -> Self {
        Self {
            sort: SortKey::default(),
            filter: RecordFilter::default(),
            oui: None,
        }
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Add a vendor column resolved from `oui`.
    pub fn with_oui(mut self, oui: OuiDb) -> Self {
        self.oui = Some(oui);
        self
    }

    /// Render the table for `report` as of `now`.
    pub fn render(&self, report: &LeaseReport, now: DateTime<Local>) -> String {
        let mut records: Vec<&LeaseRecord> = report
            .records
            .values()
            .filter(|r| self.filter.accepts(r, now))
            .collect();
        self.sort_records(&mut records);

        let mut rows = vec![self.header(report.family)];
        rows.extend(records.iter().map(|r| self.row(report.family, r)));

        let widths: Vec<usize> = (0..rows[0].len())
            .map(|col| rows.iter().map(|row| row[col].chars().count()).max().unwrap_or(0))
            .collect();

        let mut out = String::new();
        for row in &rows {
            let line = row
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = width))
                .collect::<Vec<_>>()
                .join("  ");
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }

    fn sort_records(&self, records: &mut [&LeaseRecord]) {
        match self.sort {
            SortKey::Ip => {}
            SortKey::Mac => records.sort_by_key(|r| r.mac.map(|m| format_mac(&m))),
            SortKey::Host => records.sort_by(|a, b| a.host.cmp(&b.host)),
            SortKey::Start => records.sort_by_key(|r| r.start),
            SortKey::End => records.sort_by_key(|r| r.end),
            SortKey::State => records.sort_by(|a, b| a.binding_state.cmp(&b.binding_state)),
        }
    }

    fn header(&self, family: AddressFamily) -> Vec<String> {
        let mut cols = vec!["IP", "MAC"];
        if self.oui.is_some() {
            cols.push("Vendor");
        }
        cols.extend(["Host", "Hostname", "Client hostname", "DNS name", "Start", "End", "State"]);
        if family == AddressFamily::V6 {
            cols.extend(["IAID", "DUID"]);
        }
        cols.into_iter().map(String::from).collect()
    }

    fn row(&self, family: AddressFamily, r: &LeaseRecord) -> Vec<String> {
        let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

        let mut cells = vec![
            r.address.to_string(),
            r.mac.map(|m| format_mac(&m)).unwrap_or_else(|| "-".to_string()),
        ];
        if let Some(oui) = &self.oui {
            let vendor = r.mac.as_ref().and_then(|m| oui.lookup(m)).unwrap_or("-");
            cells.push(vendor.to_string());
        }
        cells.extend([
            text(&r.host),
            text(&r.hostname_option),
            text(&r.client_hostname),
            text(&r.dns_name),
            r.start.to_string(),
            r.end.to_string(),
            r.binding_state.to_string(),
        ]);
        if family == AddressFamily::V6 {
            cells.push(r.iaid.map(|i| i.to_string()).unwrap_or_else(|| "-".to_string()));
            cells.push(r.duid.as_ref().map(|d| d.type_name().to_string()).unwrap_or_else(|| "-".to_string()));
        }
        cells
    }
}

impl Default for TableReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaseReporter for TableReporter {
    fn report(&self, report: &LeaseReport) {
        println!("{} leases:", report.family);
        println!("{}", self.render(report, Local::now()));

        for warning in &report.warnings {
            eprintln!("warning: {}", warning);
        }
    }
}
