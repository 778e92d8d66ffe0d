//! pg_dump text-format scanner.
//!
//! The dump is read once, line by line. A `COPY <schema>.<table> (...) FROM stdin;`
//! header switches the scanner into capturing mode for that table, data lines
//! are split on tabs and parsed by the table's fixed column order, and a line
//! that is exactly `\.` closes the block. Blocks may appear in any order and
//! any of them may be missing.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{Extraction, ScanStats, SourceAdapter, SourceError, SourceTable};
use crate::models::{RawChapter, RawDataset, RawMapping, RawRecord, RawRemedy, RawRubric};

const END_OF_BLOCK: &str = "\\.";
const NULL_MARKER: &str = "\\N";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Idle,
    Capturing(SourceTable),
    /// Inside a COPY block for a table the import does not consume.
    Ignoring,
}

/// Why a data line could not become a record.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RowError {
    TooFewColumns { expected: usize, found: usize },
    MissingValue(&'static str),
    BadInteger { column: &'static str, value: String },
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowError::TooFewColumns { expected, found } => {
                write!(f, "expected at least {expected} columns, found {found}")
            }
            RowError::MissingValue(column) => write!(f, "NULL in required column {column}"),
            RowError::BadInteger { column, value } => {
                write!(f, "column {column} is not an integer: {value:?}")
            }
        }
    }
}

/// Line-driven state machine over a dump. Feed lines, then [`finish`](Self::finish).
#[derive(Debug)]
pub struct DumpScanner {
    state: ScanState,
    data: RawDataset,
    stats: ScanStats,
}

impl Default for DumpScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl DumpScanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::Idle,
            data: RawDataset::default(),
            stats: ScanStats::default(),
        }
    }

    pub fn feed_line(&mut self, line: &str) {
        self.stats.lines_read += 1;
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);

        match self.state {
            ScanState::Idle => {
                if let Some(table_name) = copy_header_table(line) {
                    self.stats.blocks_seen += 1;
                    self.state = match SourceTable::from_table_name(table_name) {
                        Some(table) => {
                            tracing::debug!(table = table.as_str(), "Entering COPY block");
                            ScanState::Capturing(table)
                        }
                        None => {
                            self.stats.ignored_blocks += 1;
                            ScanState::Ignoring
                        }
                    };
                }
            }
            ScanState::Ignoring => {
                if line == END_OF_BLOCK {
                    self.state = ScanState::Idle;
                }
            }
            ScanState::Capturing(table) => {
                if line == END_OF_BLOCK {
                    self.state = ScanState::Idle;
                    return;
                }
                match parse_row(table, line) {
                    Ok(record) => {
                        *self.stats.rows.entry(table).or_insert(0) += 1;
                        self.data.push(record);
                    }
                    Err(e) => {
                        *self.stats.malformed.entry(table).or_insert(0) += 1;
                        tracing::debug!(
                            table = table.as_str(),
                            line = self.stats.lines_read,
                            reason = %e,
                            "Skipping malformed dump line"
                        );
                    }
                }
            }
        }
    }

    pub fn finish(mut self) -> Extraction {
        if let ScanState::Capturing(table) = self.state {
            tracing::warn!(table = table.as_str(), "Dump ended inside an unterminated COPY block");
            self.stats.unterminated_blocks += 1;
        } else if self.state == ScanState::Ignoring {
            self.stats.unterminated_blocks += 1;
        }
        Extraction {
            data: self.data,
            stats: self.stats,
        }
    }
}

/// Scan a whole dump from any buffered reader. Invalid UTF-8 is replaced, not fatal.
pub fn scan_reader<R: BufRead>(mut reader: R) -> Result<Extraction, SourceError> {
    let mut scanner = DumpScanner::new();
    let mut buf = Vec::with_capacity(4096);

    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            break;
        }
        scanner.feed_line(&String::from_utf8_lossy(&buf));
    }

    Ok(scanner.finish())
}

/// Scan a dump file on disk.
pub fn scan_file(path: &Path) -> Result<Extraction, SourceError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SourceError::FileNotFound(path.to_path_buf()),
        _ => SourceError::Io(e),
    })?;
    scan_reader(BufReader::with_capacity(1024 * 1024, file)) // 1MB buffer
}

/// File-mode source adapter.
pub struct DumpFileSource {
    path: PathBuf,
}

impl DumpFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SourceAdapter for DumpFileSource {
    async fn extract(&mut self) -> Result<Extraction, SourceError> {
        if !self.path.is_file() {
            return Err(SourceError::FileNotFound(self.path.clone()));
        }

        tracing::info!(path = %self.path.display(), "Scanning OOREP dump");
        let path = self.path.clone();
        let extraction = tokio::task::spawn_blocking(move || scan_file(&path))
            .await
            .map_err(|e| SourceError::Task(e.to_string()))??;

        tracing::info!(
            lines = extraction.stats.lines_read,
            blocks = extraction.stats.blocks_seen,
            rows = extraction.data.total_rows(),
            malformed = extraction.stats.malformed_total(),
            "Dump scan complete"
        );
        Ok(extraction)
    }

    fn source_name(&self) -> String {
        self.path.display().to_string()
    }
}

/// Table name of a `COPY schema.table (...) FROM stdin;` header, schema stripped.
fn copy_header_table(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("COPY ")?;
    if !line.trim_end().ends_with("FROM stdin;") {
        return None;
    }
    let qualified = rest
        .split(|c: char| c == ' ' || c == '(')
        .next()
        .filter(|name| !name.is_empty())?;
    let table = qualified.rsplit('.').next()?;
    Some(table.trim_matches('"'))
}

/// Decode one COPY text-format value. `\N` is NULL.
fn decode_value(raw: &str) -> Option<String> {
    if raw == NULL_MARKER {
        return None;
    }
    if !raw.contains('\\') {
        return Some(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    Some(out)
}

struct Fields(Vec<Option<String>>);

impl Fields {
    fn split(line: &str, expected: usize) -> Result<Self, RowError> {
        let values: Vec<Option<String>> = line.split('\t').map(decode_value).collect();
        if values.len() < expected {
            return Err(RowError::TooFewColumns {
                expected,
                found: values.len(),
            });
        }
        Ok(Self(values))
    }

    fn text(&self, idx: usize) -> Option<String> {
        self.0[idx].clone()
    }

    fn required_text(&self, idx: usize, column: &'static str) -> Result<String, RowError> {
        self.text(idx).ok_or(RowError::MissingValue(column))
    }

    fn int(&self, idx: usize, column: &'static str) -> Result<Option<i64>, RowError> {
        match &self.0[idx] {
            None => Ok(None),
            Some(v) => v.trim().parse::<i64>().map(Some).map_err(|_| RowError::BadInteger {
                column,
                value: v.clone(),
            }),
        }
    }

    fn required_int(&self, idx: usize, column: &'static str) -> Result<i64, RowError> {
        self.int(idx, column)?.ok_or(RowError::MissingValue(column))
    }
}

/// Dispatch a data line to the parser for its table's fixed column order.
fn parse_row(table: SourceTable, line: &str) -> Result<RawRecord, RowError> {
    match table {
        // chapter(abbrev, id, textt, ...)
        SourceTable::Chapter => {
            let f = Fields::split(line, 3)?;
            Ok(RawRecord::Chapter(RawChapter {
                external_id: f.required_int(1, "id")?,
                text: f.text(2).unwrap_or_default(),
            }))
        }
        // remedy(id, nameabbrev, namelong, namealt, ...)
        SourceTable::Remedy => {
            let f = Fields::split(line, 3)?;
            Ok(RawRecord::Remedy(RawRemedy {
                external_id: f.required_int(0, "id")?,
                abbrev: f.text(1).unwrap_or_default(),
                long_name: f.text(2),
                kingdom: None,
            }))
        }
        // rubric(abbrev, id, mother, ismother, chapterid, fullpath, path, textt, ...)
        SourceTable::Rubric => {
            let f = Fields::split(line, 8)?;
            Ok(RawRecord::Rubric(RawRubric {
                external_id: f.required_int(1, "id")?,
                repertory_abbrev: f.required_text(0, "abbrev")?,
                chapter_external_id: f.int(4, "chapterid")?,
                fullpath: f.text(5),
                path: f.text(6),
                text: f.text(7),
            }))
        }
        // rubricremedy(abbrev, rubricid, remedyid, weight, chapterid, ...)
        SourceTable::RubricRemedy => {
            let f = Fields::split(line, 4)?;
            Ok(RawRecord::Mapping(RawMapping {
                repertory_abbrev: f.required_text(0, "abbrev")?,
                rubric_external_id: f.required_int(1, "rubricid")?,
                remedy_external_id: f.required_int(2, "remedyid")?,
                weight: f.required_int(3, "weight")?,
            }))
        }
    }
}
