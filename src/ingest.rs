//! Dataset ingestion: delimited text to validated [`GeoRecord`]s.
//!
//! ## Pipeline
//!
//! 1. Header names are trimmed and lower-cased, then matched against
//!    `id`, `place`, `rocks`, `latitude`, `longitude` (any column order).
//! 2. Rows are read one at a time. Every field is trimmed.
//! 3. A missing `id` falls back to the 1-based ordinal of the data row.
//! 4. A row is accepted only with a non-empty rock name and two finite,
//!    non-zero coordinates. Anything else is skipped with a [`SkipReason`].
//!
//! One row's failure never aborts the batch. Accepted records keep source
//! order.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::types::{is_usable_coordinate, GeoRecord};

/// Expected column names after normalization.
pub const EXPECTED_COLUMNS: [&str; 5] = ["id", "place", "rocks", "latitude", "longitude"];

/// Which coordinate a skip reason refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Coordinate {
    /// The `latitude` column.
    Latitude,
    /// The `longitude` column.
    Longitude,
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Latitude => write!(f, "latitude"),
            Self::Longitude => write!(f, "longitude"),
        }
    }
}

/// Why a row was not accepted.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The `rocks` field is empty or absent.
    #[error("missing data: empty rock name")]
    MissingRockName,
    /// A coordinate field is empty or absent.
    #[error("missing data: no {field}")]
    MissingCoordinate {
        /// The missing coordinate.
        field: Coordinate,
    },
    /// A coordinate field is not a number.
    #[error("parse failure: {field} {value:?} is not a number")]
    UnparsableCoordinate {
        /// The offending coordinate.
        field: Coordinate,
        /// The raw text.
        value: String,
    },
    /// A coordinate parsed but is zero or not finite.
    #[error("invalid coordinates: {field} is {value}")]
    InvalidCoordinate {
        /// The offending coordinate.
        field: Coordinate,
        /// The parsed value.
        value: f64,
    },
    /// An earlier accepted row already used this id.
    #[error("duplicate id {id:?}")]
    DuplicateId {
        /// The repeated id.
        id: String,
    },
    /// The row could not be decoded at all.
    #[error("malformed row: {message}")]
    Malformed {
        /// Decoder message.
        message: String,
    },
}

/// A row that was dropped during ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    /// 1-based ordinal among data rows.
    pub row: usize,
    /// Why the row was dropped.
    pub reason: SkipReason,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    /// Accepted records, in source order.
    pub records: Vec<GeoRecord>,
    /// Dropped rows, in source order.
    pub skipped: Vec<SkippedRow>,
}

impl IngestReport {
    /// Number of accepted records.
    pub fn accepted_count(&self) -> usize {
        self.records.len()
    }

    /// Number of skipped rows.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Source-level ingestion failure. Row problems never produce this.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The dataset could not be opened.
    #[error("dataset unavailable at {path}: {source}")]
    SourceUnavailable {
        /// Dataset path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The header row could not be read.
    #[error("dataset header unreadable: {0}")]
    Header(#[from] csv::Error),
}

/// Column positions resolved from a normalized header.
#[derive(Debug, Clone, Copy, Default)]
struct Columns {
    id: Option<usize>,
    place: Option<usize>,
    rocks: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
}

impl Columns {
    fn resolve(normalized: &[String]) -> Self {
        let position = |name: &str| normalized.iter().position(|h| h == name);
        Self {
            id: position("id"),
            place: position("place"),
            rocks: position("rocks"),
            latitude: position("latitude"),
            longitude: position("longitude"),
        }
    }

    fn missing(&self) -> Vec<&'static str> {
        let found = [self.id, self.place, self.rocks, self.latitude, self.longitude];
        EXPECTED_COLUMNS
            .iter()
            .zip(found)
            .filter(|(_, pos)| pos.is_none())
            .map(|(name, _)| *name)
            .collect()
    }
}

/// Reads a delimited dataset into validated records.
#[derive(Debug, Clone)]
pub struct DataIngestor {
    delimiter: u8,
}

impl Default for DataIngestor {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl DataIngestor {
    /// Create an ingestor for comma-separated input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different single-byte field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Ingest the dataset at `path`.
    pub fn ingest_path(&self, path: impl AsRef<Path>) -> Result<IngestReport, IngestError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading dataset");
        let file = File::open(path).map_err(|source| IngestError::SourceUnavailable {
            path: path.display().to_string(),
            source,
        })?;
        self.ingest(file)
    }

    /// Ingest a dataset from any reader.
    pub fn ingest<R: Read>(&self, source: R) -> Result<IngestReport, IngestError> {
        let start = Instant::now();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(source);

        let original = reader.headers()?.clone();
        let normalized: Vec<String> = original
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        debug!(original = ?original, normalized = ?normalized, "Dataset header");

        let columns = Columns::resolve(&normalized);
        let missing = columns.missing();
        if !missing.is_empty() {
            warn!(missing = ?missing, "Dataset header is missing expected columns");
        }

        let mut report = IngestReport::default();
        let mut seen_ids = HashSet::new();

        for (index, result) in reader.records().enumerate() {
            let row = index + 1;
            let outcome = match result {
                Ok(fields) => parse_row(&columns, &fields, row),
                Err(e) => Err(SkipReason::Malformed { message: e.to_string() }),
            };

            let outcome = outcome.and_then(|record| {
                if seen_ids.insert(record.id.clone()) {
                    Ok(record)
                } else {
                    Err(SkipReason::DuplicateId { id: record.id })
                }
            });

            match outcome {
                Ok(record) => report.records.push(record),
                Err(reason) => {
                    warn!(row = row, reason = %reason, "Skipping dataset row");
                    report.skipped.push(SkippedRow { row, reason });
                }
            }
        }

        info!(
            target: "geogate::metrics",
            metric_type = "ingest",
            accepted = report.accepted_count(),
            skipped = report.skipped_count(),
            latency_ms = start.elapsed().as_millis() as u64,
            "ingest_metric"
        );

        Ok(report)
    }
}

fn field<'r>(fields: &'r csv::StringRecord, position: Option<usize>) -> &'r str {
    position
        .and_then(|i| fields.get(i))
        .map(str::trim)
        .unwrap_or_default()
}

fn coordinate(raw: &str, which: Coordinate) -> Result<f64, SkipReason> {
    if raw.is_empty() {
        return Err(SkipReason::MissingCoordinate { field: which });
    }
    let value: f64 = raw.parse().map_err(|_| SkipReason::UnparsableCoordinate {
        field: which,
        value: raw.to_string(),
    })?;
    if !is_usable_coordinate(value) {
        return Err(SkipReason::InvalidCoordinate { field: which, value });
    }
    Ok(value)
}

fn parse_row(columns: &Columns, fields: &csv::StringRecord, row: usize) -> Result<GeoRecord, SkipReason> {
    let rocks = field(fields, columns.rocks);
    if rocks.is_empty() {
        return Err(SkipReason::MissingRockName);
    }
    let latitude = coordinate(field(fields, columns.latitude), Coordinate::Latitude)?;
    let longitude = coordinate(field(fields, columns.longitude), Coordinate::Longitude)?;

    let id = match field(fields, columns.id) {
        "" => row.to_string(),
        id => id.to_string(),
    };

    Ok(GeoRecord::new(id, field(fields, columns.place), rocks, latitude, longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingest(csv: &str) -> IngestReport {
        DataIngestor::new().ingest(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_zero_latitude_skipped_valid_row_accepted() {
        let report = ingest(
            "id,place,rocks,latitude,longitude\n\
             5,Quarry,Granite,0,12.3\n\
             6,Ridge,Basalt,40.1,-3.7\n",
        );
        assert_eq!(report.records, vec![GeoRecord::new("6", "Ridge", "Basalt", 40.1, -3.7)]);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.skipped[0].row, 1);
        assert!(matches!(
            report.skipped[0].reason,
            SkipReason::InvalidCoordinate { field: Coordinate::Latitude, .. }
        ));
    }

    #[test]
    fn test_header_case_and_whitespace_tolerated() {
        let report = ingest(" Longitude , ROCKS,Place ,Latitude, ID\n-3.7, Basalt , Ridge ,40.1, 6 \n");
        assert_eq!(report.records, vec![GeoRecord::new("6", "Ridge", "Basalt", 40.1, -3.7)]);
    }

    #[test]
    fn test_missing_id_defaults_to_row_ordinal() {
        let report = ingest("id,place,rocks,latitude,longitude\n,A,Slate,1.5,2.5\n,B,Shale,3.5,4.5\n");
        let ids: Vec<_> = report.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_id_column_absent_uses_ordinal() {
        let report = ingest("place,rocks,latitude,longitude\nA,Slate,1.5,2.5\n");
        assert_eq!(report.records[0].id, "1");
    }

    #[test]
    fn test_skip_reasons_are_distinguished() {
        let report = ingest(
            "id,place,rocks,latitude,longitude\n\
             1,A,,1,1\n\
             2,B,Slate,,1\n\
             3,C,Slate,north,1\n\
             4,D,Slate,1,0\n\
             5,E,Slate,1,inf\n",
        );
        assert!(report.records.is_empty());
        let reasons: Vec<_> = report.skipped.iter().map(|s| s.reason.clone()).collect();
        assert_eq!(reasons[0], SkipReason::MissingRockName);
        assert_eq!(reasons[1], SkipReason::MissingCoordinate { field: Coordinate::Latitude });
        assert_eq!(
            reasons[2],
            SkipReason::UnparsableCoordinate { field: Coordinate::Latitude, value: "north".into() }
        );
        assert!(matches!(reasons[3], SkipReason::InvalidCoordinate { field: Coordinate::Longitude, .. }));
        assert!(matches!(reasons[4], SkipReason::InvalidCoordinate { field: Coordinate::Longitude, .. }));
    }

    #[test]
    fn test_short_rows_do_not_abort_batch() {
        let report = ingest("id,place,rocks,latitude,longitude\n1,A,Slate\n2,B,Gneiss,10,20\n");
        assert_eq!(report.accepted_count(), 1);
        assert_eq!(report.records[0].id, "2");
        assert_eq!(report.skipped[0].reason, SkipReason::MissingCoordinate { field: Coordinate::Latitude });
    }

    #[test]
    fn test_duplicate_ids_first_wins() {
        let report = ingest(
            "id,place,rocks,latitude,longitude\n\
             ,First,Slate,1,1\n\
             1,Second,Shale,2,2\n",
        );
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].place, "First");
        assert_eq!(report.skipped[0].reason, SkipReason::DuplicateId { id: "1".into() });
    }

    #[test]
    fn test_custom_delimiter() {
        let report = DataIngestor::new()
            .with_delimiter(b';')
            .ingest("id;place;rocks;latitude;longitude\n7;Cliff;Chalk;50,5;1\n".as_bytes())
            .unwrap();
        // "50,5" is not a number in this format.
        assert_eq!(report.accepted_count(), 0);
        assert!(matches!(report.skipped[0].reason, SkipReason::UnparsableCoordinate { .. }));
    }

    #[test]
    fn test_missing_file_is_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DataIngestor::new().ingest_path(dir.path().join("none.csv")).unwrap_err();
        assert!(matches!(err, IngestError::SourceUnavailable { .. }));
    }
}
