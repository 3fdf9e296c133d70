//! Line-oriented block scanner.
//!
//! dhcpd's config and lease files are sequences of `keyword ... {`
//! blocks whose body statements each sit on their own line. The
//! scanner finds blocks by a start and an end pattern and fills a
//! record from an ordered field table, one regex per field.

use std::io::BufRead;

use regex::Regex;

use crate::error::{FieldError, RecordError, ScanError};

/// Stores a captured value into the record, converting it on the way.
pub type FieldSetter<T> = fn(&mut T, &str) -> Result<(), FieldError>;

struct FieldRule<T> {
    name: &'static str,
    pattern: Regex,
    apply: FieldSetter<T>,
}

/// A block that closed cleanly.
#[derive(Debug)]
pub struct Block<T> {
    /// Line number of the start line (1-based).
    pub line: usize,
    /// First capture group of the start pattern.
    pub key: String,
    pub fields: T,
}

/// A block that was recognised but could not be extracted.
#[derive(Debug)]
pub struct BlockError {
    pub line: usize,
    pub key: String,
    pub error: RecordError,
}

/// Everything one scan produced, in input order.
#[derive(Debug)]
pub struct ScanOutcome<T> {
    pub blocks: Vec<Block<T>>,
    pub errors: Vec<BlockError>,
}

struct OpenBlock<T> {
    line: usize,
    key: String,
    fields: T,
    error: Option<RecordError>,
}

/// Builder for a [`BlockScanner`] field table.
pub struct BlockScannerBuilder<T> {
    start: &'static str,
    end: &'static str,
    fields: Vec<(&'static str, &'static str, FieldSetter<T>)>,
}

impl<T> BlockScannerBuilder<T> {
    /// Add a field. The first capture group (or the whole match) is
    /// handed to `apply`. Fields are tried in the order added.
    pub fn field(mut self, name: &'static str, pattern: &'static str, apply: FieldSetter<T>) -> Self {
        self.fields.push((name, pattern, apply));
        self
    }

    pub fn build(self) -> Result<BlockScanner<T>, ScanError> {
        let fields = self
            .fields
            .into_iter()
            .map(|(name, pattern, apply)| -> Result<FieldRule<T>, regex::Error> {
                Ok(FieldRule {
                    name,
                    pattern: Regex::new(pattern)?,
                    apply,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(BlockScanner {
            start: Regex::new(self.start)?,
            end: Regex::new(self.end)?,
            fields,
        })
    }
}

/// Scanner for one block grammar.
///
/// Blocks are delimited by pattern only, not by brace counting: the end
/// pattern must match exactly once per block at the right nesting level.
pub struct BlockScanner<T> {
    start: Regex,
    end: Regex,
    fields: Vec<FieldRule<T>>,
}

impl<T: Default> BlockScanner<T> {
    pub fn builder(start: &'static str, end: &'static str) -> BlockScannerBuilder<T> {
        BlockScannerBuilder {
            start,
            end,
            fields: Vec::new(),
        }
    }

    /// Scan `reader` to the end.
    ///
    /// Malformed blocks are returned in `errors` and scanning carries
    /// on; only read failures abort. Bytes that are not UTF-8 are
    /// replaced, never rejected.
    pub fn scan<R: BufRead>(&self, mut reader: R) -> Result<ScanOutcome<T>, ScanError> {
        let mut outcome = ScanOutcome {
            blocks: Vec::new(),
            errors: Vec::new(),
        };
        let mut open: Option<OpenBlock<T>> = None;
        let mut buf = Vec::new();
        let mut number = 0;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            number += 1;

            let raw = String::from_utf8_lossy(&buf);
            let line = strip_comment(raw.trim_end_matches(['\n', '\r']));
            if line.trim().is_empty() {
                continue;
            }

            open = match open.take() {
                Some(mut block) => {
                    if self.end.is_match(line) {
                        Self::close(block, &mut outcome);
                        None
                    } else if self.start.is_match(line) {
                        // A new block before this one closed: the end was missed.
                        outcome.errors.push(BlockError {
                            line: block.line,
                            key: block.key,
                            error: RecordError::UnclosedBlock {
                                line: block.line,
                                next: number,
                            },
                        });
                        self.open(line, number, &mut outcome)
                    } else {
                        self.apply_fields(&mut block, line, number);
                        Some(block)
                    }
                }
                None => self.open(line, number, &mut outcome),
            };
        }

        if let Some(block) = open {
            outcome.errors.push(BlockError {
                line: block.line,
                key: block.key,
                error: RecordError::TruncatedBlock { line: block.line },
            });
        }

        Ok(outcome)
    }

    /// Start a block if `line` is a start line. One-line blocks
    /// (`host a { hardware ethernet ...; }`) close immediately.
    fn open(&self, line: &str, number: usize, outcome: &mut ScanOutcome<T>) -> Option<OpenBlock<T>> {
        let caps = self.start.captures(line)?;
        let key = caps
            .get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let rest = &line[caps.get(0).map_or(line.len(), |m| m.end())..];

        let mut block = OpenBlock {
            line: number,
            key,
            fields: T::default(),
            error: None,
        };

        self.apply_fields(&mut block, rest, number);
        if self.end.is_match(rest) {
            Self::close(block, outcome);
            None
        } else {
            Some(block)
        }
    }

    fn apply_fields(&self, block: &mut OpenBlock<T>, text: &str, line: usize) {
        for rule in &self.fields {
            let Some(caps) = rule.pattern.captures(text) else {
                continue;
            };
            let value = caps.get(1).or_else(|| caps.get(0)).map_or("", |m| m.as_str());

            if let Err(source) = (rule.apply)(&mut block.fields, value) {
                // Keep the first failure; later lines are still consumed.
                if block.error.is_none() {
                    block.error = Some(RecordError::Field {
                        field: rule.name,
                        line,
                        source,
                    });
                }
            }
        }
    }

    fn close(block: OpenBlock<T>, outcome: &mut ScanOutcome<T>) {
        match block.error {
            Some(error) => outcome.errors.push(BlockError {
                line: block.line,
                key: block.key,
                error,
            }),
            None => outcome.blocks.push(Block {
                line: block.line,
                key: block.key,
                fields: block.fields,
            }),
        }
    }
}

/// Cut a trailing `# comment`, leaving `#` inside quoted strings alone.
fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}
