//! Route table error types.

use std::path::PathBuf;

use thiserror::Error;

/// One validation problem found in a route source.
///
/// Line numbers are 1-based and count the header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteIssue {
    /// The source contains no header row.
    #[error("route source is empty")]
    EmptySource,

    /// The header does not name the configured stations.
    #[error("line 1: expected header {expected:?}, found {found:?}")]
    HeaderMismatch {
        /// The header the configuration requires.
        expected: String,
        /// The header that was read.
        found: String,
    },

    /// A row has the wrong number of columns.
    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        /// Source line.
        line: usize,
        /// `1 + total_stations`.
        expected: usize,
        /// Columns on the row.
        found: usize,
    },

    /// The participant number is not a positive integer.
    #[error("line {line}: invalid participant number {value:?}")]
    InvalidNumber {
        /// Source line.
        line: usize,
        /// The raw cell.
        value: String,
    },

    /// The participant number exceeds the participant cap.
    #[error("line {line}: participant number {number} is outside 1..={max}")]
    NumberOutOfRange {
        /// Source line.
        line: usize,
        /// The parsed number.
        number: u32,
        /// The participant cap.
        max: u32,
    },

    /// The participant number already appeared on an earlier row.
    #[error("line {line}: duplicate participant number {number} (first on line {first_line})")]
    DuplicateNumber {
        /// Source line.
        line: usize,
        /// The repeated number.
        number: u32,
        /// Line of the first occurrence.
        first_line: usize,
    },

    /// A station cell is blank.
    #[error("line {line}: empty content for station {station}")]
    EmptyCell {
        /// Source line.
        line: usize,
        /// 1-based station index.
        station: u32,
    },

    /// The same station appears twice in one route.
    #[error("line {line}: participant {number} visits {content} more than once")]
    DuplicateStation {
        /// Source line.
        line: usize,
        /// Participant number of the row.
        number: u32,
        /// The repeated content reference.
        content: String,
    },

    /// Participant numbers do not form the range `1..=N`.
    #[error("participant numbers are not contiguous, missing {missing:?}")]
    MissingNumbers {
        /// Numbers absent from `1..=N`.
        missing: Vec<u32>,
    },

    /// More rows than the participant cap allows.
    #[error("too many participants: {count} > {max}")]
    TooManyParticipants {
        /// Rows read.
        count: usize,
        /// The participant cap.
        max: u32,
    },
}

/// Failure to load a route table. Nothing is loaded on failure.
#[derive(Debug, Error)]
pub enum RouteLoadError {
    /// The source file could not be read.
    #[error("failed to read route source {path}: {source}")]
    Io {
        /// The file that was read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The source was read but failed validation.
    #[error("route source rejected with {} issue(s)", .0.len())]
    Invalid(Vec<RouteIssue>),
}

impl RouteLoadError {
    /// All validation issues (empty for I/O failures).
    #[must_use]
    pub fn issues(&self) -> &[RouteIssue] {
        match self {
            Self::Invalid(issues) => issues,
            Self::Io { .. } => &[],
        }
    }
}

/// Lookup failure in a loaded route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// No row for this participant number.
    #[error("no route for participant {0}")]
    UnknownParticipant(u32),

    /// The station index is 0 or past the end of the route.
    #[error("participant {number} has no station {station} (route length {len})")]
    StationOutOfRange {
        /// Participant number.
        number: u32,
        /// Requested station.
        station: u32,
        /// Route length.
        len: usize,
    },
}

/// Failure to load a station catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read station catalog {path}: {source}")]
    Io {
        /// The file that was read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The catalog is not valid YAML of the expected shape.
    #[error("invalid station catalog: {0}")]
    Parse(#[from] serde_yaml::Error),
}
