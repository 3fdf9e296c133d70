//! Error types for lease extraction.
//!
//! Errors are split by blast radius: a `RecordError` costs one block,
//! a `ScanError` or `LoadError` costs one address family's pass.

use std::path::PathBuf;

use thiserror::Error;

/// Errors decoding a client identifier or an IA-NA payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DuidError {
    #[error("unsupported DUID type {0}")]
    UnsupportedDuidType(u16),

    #[error("malformed IA-NA payload: {0}")]
    MalformedIanaPayload(String),

    #[error("malformed hex identifier '{0}'")]
    MalformedHex(String),

    #[error("identifier truncated: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },
}

/// Errors converting a raw field capture into a typed value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("malformed timestamp '{0}'")]
    MalformedTimestamp(String),

    #[error("malformed MAC address '{0}'")]
    MalformedMac(String),

    #[error("malformed IP address '{0}'")]
    MalformedAddress(String),

    #[error("malformed client identifier: {0}")]
    Duid(#[from] DuidError),
}

/// A single block could not be turned into a record. Never fatal for the pass.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("block starting at line {line} is truncated (end of input)")]
    TruncatedBlock { line: usize },

    #[error("block starting at line {line} is not closed before the next block at line {next}")]
    UnclosedBlock { line: usize, next: usize },

    #[error("block '{block}' has neither an address nor a MAC")]
    MissingKeyField { block: String },

    #[error("field '{field}' on line {line}: {source}")]
    Field {
        field: &'static str,
        line: usize,
        #[source]
        source: FieldError,
    },

    #[error("block '{block}': {source}")]
    Duid {
        block: String,
        #[source]
        source: DuidError,
    },
}

/// The scan itself failed; nothing after this point can be trusted.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid field pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A whole address family's pass failed.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to open {path}: {source}", path = path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}", path = path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: ScanError,
    },
}

/// The tool's own settings file could not be read.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}", path = path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Loading a MAC vendor database failed.
#[derive(Error, Debug)]
pub enum OuiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid vendor JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid registry pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A skipped block, reported alongside whatever did parse.
#[derive(Debug)]
pub struct ParseWarning {
    pub source_file: PathBuf,
    /// Line the offending block started on.
    pub line: usize,
    /// Start-line key of the block (address, host name or payload).
    pub block: String,
    pub error: RecordError,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: skipped '{}': {}",
            self.source_file.display(),
            self.line,
            self.block,
            self.error
        )
    }
}
