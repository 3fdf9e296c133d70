//! Text parsers for dhcpd's configuration and lease database.
//!
//! Both formats are handled by the same `BlockScanner` with
//! format-specific field tables.

mod block_scanner;
mod config_parser;
mod lease_parser;

pub use block_scanner::{Block, BlockError, BlockScanner, BlockScannerBuilder, FieldSetter, ScanOutcome};
pub use config_parser::{ConfigParser, StaticLeases};
pub use lease_parser::LeaseFileParser;

/// Records from one file plus the blocks that had to be skipped.
#[derive(Debug)]
pub struct Parsed<T> {
    pub records: T,
    pub warnings: Vec<BlockError>,
}
