//! The route table: participant number → ordered station content.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{RouteError, RouteIssue, RouteLoadError};

/// Name of the first header column.
const NUMBER_COLUMN: &str = "participant_number";

/// An immutable, validated route table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: BTreeMap<u32, Vec<String>>,
    total_stations: u32,
    fingerprint: String,
}

/// Summary of a loaded route table.
#[derive(Debug, Clone, Serialize)]
pub struct RouteReport {
    /// Number of routes.
    pub participants: usize,
    /// Stations per route.
    pub total_stations: u32,
    /// Distinct content references, sorted.
    pub stations: Vec<String>,
    /// How many routes visit each content reference.
    pub station_usage: BTreeMap<String, usize>,
    /// SHA-256 of the canonical table.
    pub fingerprint: String,
}

impl RouteTable {
    /// A table without routes, used before the first load.
    #[must_use]
    pub fn empty(total_stations: u32) -> Self {
        Self::from_routes(BTreeMap::new(), total_stations)
    }

    /// Parses and validates a tabular route source.
    ///
    /// The first non-blank line is the header
    /// `participant_number,station_1,...,station_T`. Every following
    /// non-blank line holds a participant number and `total_stations`
    /// content references. Content references are trimmed and upper-cased.
    ///
    /// # Errors
    ///
    /// Returns `RouteLoadError::Invalid` carrying every issue found if any
    /// row is malformed; no partial table is produced.
    pub fn load(
        source: &str,
        total_stations: u32,
        max_participants: u32,
    ) -> Result<Self, RouteLoadError> {
        let mut issues = Vec::new();
        let mut lines = source
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty());

        let Some((_, header)) = lines.next() else {
            return Err(RouteLoadError::Invalid(vec![RouteIssue::EmptySource]));
        };

        let expected_header = expected_header(total_stations);
        let found_header = split_row(header).join(",");
        if found_header != expected_header {
            issues.push(RouteIssue::HeaderMismatch {
                expected: expected_header,
                found: found_header,
            });
        }

        let expected_columns = total_stations as usize + 1;
        let mut routes = BTreeMap::new();
        let mut first_seen: HashMap<u32, usize> = HashMap::new();
        let mut rows = 0usize;
        let mut numbers_valid = true;

        for (line, text) in lines {
            rows += 1;
            let cells = split_row(text);
            if cells.len() != expected_columns {
                issues.push(RouteIssue::ColumnCount {
                    line,
                    expected: expected_columns,
                    found: cells.len(),
                });
                numbers_valid = false;
                continue;
            }

            let number = match parse_number(line, &cells[0], max_participants) {
                Ok(number) => number,
                Err(issue) => {
                    issues.push(issue);
                    numbers_valid = false;
                    continue;
                }
            };

            if let Some(&first_line) = first_seen.get(&number) {
                issues.push(RouteIssue::DuplicateNumber {
                    line,
                    number,
                    first_line,
                });
                numbers_valid = false;
                continue;
            }
            first_seen.insert(number, line);

            let route = parse_route(line, number, &cells[1..], &mut issues);
            routes.insert(number, route);
        }

        if rows > max_participants as usize {
            issues.push(RouteIssue::TooManyParticipants {
                count: rows,
                max: max_participants,
            });
        }

        if numbers_valid && !routes.is_empty() {
            let count = u32::try_from(routes.len()).unwrap_or(u32::MAX);
            let missing: Vec<u32> = (1..=count).filter(|n| !routes.contains_key(n)).collect();
            if !missing.is_empty() {
                issues.push(RouteIssue::MissingNumbers { missing });
            }
        }

        if !issues.is_empty() {
            warn!(issues = issues.len(), "route source rejected");
            return Err(RouteLoadError::Invalid(issues));
        }

        let table = Self::from_routes(routes, total_stations);
        info!(
            participants = table.len(),
            stations = table.distinct_stations().len(),
            fingerprint = %table.fingerprint,
            "route table loaded"
        );
        Ok(table)
    }

    /// Reads `path` and loads it with [`RouteTable::load`].
    ///
    /// # Errors
    ///
    /// Returns `RouteLoadError::Io` if the file cannot be read, or
    /// `RouteLoadError::Invalid` if validation fails.
    pub fn load_file(
        path: &Path,
        total_stations: u32,
        max_participants: u32,
    ) -> Result<Self, RouteLoadError> {
        let source = std::fs::read_to_string(path).map_err(|source| RouteLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load(&source, total_stations, max_participants)
    }

    fn from_routes(routes: BTreeMap<u32, Vec<String>>, total_stations: u32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(expected_header(total_stations).as_bytes());
        for (number, route) in &routes {
            hasher.update(b"\n");
            hasher.update(number.to_string().as_bytes());
            for content in route {
                hasher.update(b",");
                hasher.update(content.as_bytes());
            }
        }
        let fingerprint = format!("{:x}", hasher.finalize());
        Self {
            routes,
            total_stations,
            fingerprint,
        }
    }

    /// Content for `station` (1-based) on participant `number`'s route.
    ///
    /// # Errors
    ///
    /// Returns `RouteError::UnknownParticipant` if the number has no route and
    /// `RouteError::StationOutOfRange` if `station` is 0 or beyond the route.
    pub fn resolve(&self, number: u32, station: u32) -> Result<&str, RouteError> {
        let route = self
            .routes
            .get(&number)
            .ok_or(RouteError::UnknownParticipant(number))?;
        station
            .checked_sub(1)
            .and_then(|idx| route.get(idx as usize))
            .map(String::as_str)
            .ok_or(RouteError::StationOutOfRange {
                number,
                station,
                len: route.len(),
            })
    }

    /// The full route of participant `number`.
    #[must_use]
    pub fn route(&self, number: u32) -> Option<&[String]> {
        self.routes.get(&number).map(Vec::as_slice)
    }

    /// Whether participant `number` has a route.
    #[must_use]
    pub fn contains(&self, number: u32) -> bool {
        self.routes.contains_key(&number)
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Stations per route.
    #[must_use]
    pub fn total_stations(&self) -> u32 {
        self.total_stations
    }

    /// SHA-256 of the canonical table, hex encoded.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Distinct content references, sorted.
    #[must_use]
    pub fn distinct_stations(&self) -> Vec<String> {
        let set: HashSet<&String> = self.routes.values().flatten().collect();
        let mut stations: Vec<String> = set.into_iter().cloned().collect();
        stations.sort();
        stations
    }

    /// Summary for administrators.
    #[must_use]
    pub fn report(&self) -> RouteReport {
        let mut station_usage = BTreeMap::new();
        for content in self.routes.values().flatten() {
            *station_usage.entry(content.clone()).or_insert(0) += 1;
        }
        RouteReport {
            participants: self.len(),
            total_stations: self.total_stations,
            stations: self.distinct_stations(),
            station_usage,
            fingerprint: self.fingerprint.clone(),
        }
    }
}

fn expected_header(total_stations: u32) -> String {
    std::iter::once(NUMBER_COLUMN.to_owned())
        .chain((1..=total_stations).map(|i| format!("station_{i}")))
        .collect::<Vec<_>>()
        .join(",")
}

fn split_row(line: &str) -> Vec<String> {
    line.split(',').map(|cell| cell.trim().to_owned()).collect()
}

fn parse_number(line: usize, cell: &str, max: u32) -> Result<u32, RouteIssue> {
    let number: u32 = cell.parse().map_err(|_| RouteIssue::InvalidNumber {
        line,
        value: cell.to_owned(),
    })?;
    if number == 0 || number > max {
        return Err(RouteIssue::NumberOutOfRange { line, number, max });
    }
    Ok(number)
}

fn parse_route(
    line: usize,
    number: u32,
    cells: &[String],
    issues: &mut Vec<RouteIssue>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut route = Vec::with_capacity(cells.len());
    for (idx, cell) in cells.iter().enumerate() {
        let content = cell.to_uppercase();
        if content.is_empty() {
            issues.push(RouteIssue::EmptyCell {
                line,
                station: u32::try_from(idx + 1).unwrap_or(u32::MAX),
            });
        } else if !seen.insert(content.clone()) {
            issues.push(RouteIssue::DuplicateStation {
                line,
                number,
                content: content.clone(),
            });
        }
        route.push(content);
    }
    route
}
