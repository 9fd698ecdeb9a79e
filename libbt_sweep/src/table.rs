use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};

use super::config::ColumnMap;
use super::error::TableError;

/// One sampled instant of a 2DBT run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementRow {
    /// Nominal (commanded) temperature in K
    pub setpoint: f64,
    /// Sensor-read temperature in K
    pub probe_temperature: f64,
    /// Measured magnetic field in T
    pub field: f64,
    /// Raw voltage/resistance signal in instrument units
    pub signal: f64,
}

/// Position of each required column within a table header
#[derive(Debug, Clone, Copy)]
struct ColumnIndices {
    setpoint: usize,
    probe_temperature: usize,
    field: usize,
    signal: usize,
}

impl ColumnIndices {
    fn new(headers: &StringRecord, columns: &ColumnMap) -> Result<Self, TableError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| TableError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            setpoint: find(&columns.setpoint)?,
            probe_temperature: find(&columns.probe_temperature)?,
            field: find(&columns.field)?,
            signal: find(&columns.signal)?,
        })
    }
}

/// MeasurementTable is the full, ordered content of one tab-separated measurement log.
///
/// Rows are kept in acquisition order and never mutated after loading.
#[derive(Debug, Clone, Default)]
pub struct MeasurementTable {
    rows: Vec<MeasurementRow>,
    source: Option<PathBuf>,
}

impl MeasurementTable {
    /// Load a table from a tab-separated file on disk
    pub fn read(path: &Path, columns: &ColumnMap) -> Result<Self, TableError> {
        if !path.exists() {
            return Err(TableError::BadFilePath(path.to_path_buf()));
        }
        let size = path.metadata()?.len();
        log::info!(
            "Loading measurement table {} ({})",
            path.to_string_lossy(),
            human_bytes::human_bytes(size as f64)
        );

        let file = File::open(path)?;
        let mut table = Self::from_reader(file, columns)?;
        table.source = Some(path.to_path_buf());
        Ok(table)
    }

    /// Parse a table from any reader of tab-separated text with a header row.
    ///
    /// Every row must carry a finite number in each of the mapped columns; anything else
    /// fails the whole table.
    pub fn from_reader<R: Read>(reader: R, columns: &ColumnMap) -> Result<Self, TableError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let indices = ColumnIndices::new(reader.headers()?, columns)?;

        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        while reader.read_record(&mut record)? {
            let line = record.position().map_or(0, |p| p.line());
            rows.push(MeasurementRow {
                setpoint: parse_value(&record, indices.setpoint, &columns.setpoint, line)?,
                probe_temperature: parse_value(
                    &record,
                    indices.probe_temperature,
                    &columns.probe_temperature,
                    line,
                )?,
                field: parse_value(&record, indices.field, &columns.field, line)?,
                signal: parse_value(&record, indices.signal, &columns.signal, line)?,
            });
        }

        if rows.is_empty() {
            return Err(TableError::NoRows);
        }
        log::debug!("Parsed {} measurement rows", rows.len());

        Ok(Self { rows, source: None })
    }

    /// Build a table directly from rows (no source file)
    pub fn from_rows(rows: Vec<MeasurementRow>) -> Self {
        Self { rows, source: None }
    }

    pub fn rows(&self) -> &[MeasurementRow] {
        &self.rows
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn parse_value(
    record: &StringRecord,
    index: usize,
    column: &str,
    line: u64,
) -> Result<f64, TableError> {
    let raw = match record.get(index) {
        Some(raw) if !raw.is_empty() => raw,
        _ => {
            return Err(TableError::MissingValue {
                line,
                column: column.to_string(),
            })
        }
    };
    let value: f64 = raw.parse().map_err(|_| TableError::BadValue {
        line,
        column: column.to_string(),
        value: raw.to_string(),
    })?;
    if !value.is_finite() {
        return Err(TableError::NonFiniteValue {
            line,
            column: column.to_string(),
            value,
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "time (s)\ttemp setpoint (K)\tprobe temp (K)\tfield (T)\tNF res\n\
                          0.0\t1.5\t1.49\t-0.5\t10\n\
                          1.0\t1.5\t1.51\t0.0\t20\n\
                          2.0\t2.5\t2.52\t0.5\t30\n";

    #[test]
    fn test_read_sample() {
        let table = MeasurementTable::from_reader(SAMPLE.as_bytes(), &ColumnMap::default())
            .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.rows()[1],
            MeasurementRow {
                setpoint: 1.5,
                probe_temperature: 1.51,
                field: 0.0,
                signal: 20.0,
            }
        );
        assert!(table.source().is_none());
    }

    #[test]
    fn test_missing_column() {
        let columns = ColumnMap {
            signal: String::from("FF res"),
            ..Default::default()
        };
        match MeasurementTable::from_reader(SAMPLE.as_bytes(), &columns) {
            Err(TableError::MissingColumn(name)) => assert_eq!(name, "FF res"),
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_value() {
        let data = "temp setpoint (K)\tprobe temp (K)\tfield (T)\tNF res\n\
                    1.5\t1.5\t0.0\t1.0\n\
                    1.5\t1.5\t0.1\toverload\n";
        match MeasurementTable::from_reader(data.as_bytes(), &ColumnMap::default()) {
            Err(TableError::BadValue {
                line,
                column,
                value,
            }) => {
                assert_eq!(line, 3);
                assert_eq!(column, "NF res");
                assert_eq!(value, "overload");
            }
            other => panic!("expected bad value, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_and_nan_values() {
        let empty = "temp setpoint (K)\tprobe temp (K)\tfield (T)\tNF res\n\
                     1.5\t1.5\t\t1.0\n";
        assert!(matches!(
            MeasurementTable::from_reader(empty.as_bytes(), &ColumnMap::default()),
            Err(TableError::MissingValue { .. })
        ));

        let nan = "temp setpoint (K)\tprobe temp (K)\tfield (T)\tNF res\n\
                   1.5\t1.5\t0.0\tNaN\n";
        assert!(matches!(
            MeasurementTable::from_reader(nan.as_bytes(), &ColumnMap::default()),
            Err(TableError::NonFiniteValue { .. })
        ));
    }

    #[test]
    fn test_ragged_row() {
        let ragged = "temp setpoint (K)\tprobe temp (K)\tfield (T)\tNF res\n\
                      1.5\t1.5\t0.0\n";
        assert!(matches!(
            MeasurementTable::from_reader(ragged.as_bytes(), &ColumnMap::default()),
            Err(TableError::CsvError(_))
        ));
    }

    #[test]
    fn test_no_rows() {
        let header_only = "temp setpoint (K)\tprobe temp (K)\tfield (T)\tNF res\n";
        assert!(matches!(
            MeasurementTable::from_reader(header_only.as_bytes(), &ColumnMap::default()),
            Err(TableError::NoRows)
        ));
    }

    #[test]
    fn test_missing_file() {
        let path = Path::new("/definitely/not/a/table.txt");
        assert!(matches!(
            MeasurementTable::read(path, &ColumnMap::default()),
            Err(TableError::BadFilePath(_))
        ));
    }
}
