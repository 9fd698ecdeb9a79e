use std::path::PathBuf;
use thiserror::Error;

use super::worker_status::WorkerStatus;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config has no measurement tables to process")]
    NoTables,
    #[error("Config has no measurement table with index {0}")]
    BadTableIndex(usize),
    #[error("Config output directory {0:?} does not exist")]
    BadOutputPath(PathBuf),
    #[error("Config field range is invalid -- min field: {0} max field: {1}")]
    InvalidFieldRange(f64, f64),
    #[error("Config field step {0} is invalid; it must be a finite positive number")]
    InvalidFieldStep(f64),
    #[error("Config field range and step give {0} field bins; at most 1000000 are supported")]
    TooManyFieldBins(f64),
    #[error("Config lists more than one table with the file name '{0}'; their outputs would collide")]
    DuplicateTableStem(String),
    #[error("Config field step {step} does not evenly divide the field range {range}")]
    UnevenFieldStep { range: f64, step: f64 },
    #[error("Config excitation current {0} is invalid; it must be finite and non-zero")]
    InvalidExcitationCurrent(f64),
    #[error("Config conversion factor {0} is invalid; it must be finite and non-zero")]
    InvalidConversionFactor(f64),
    #[error("Config temperature axis is invalid -- start: {0} end: {1} step: {2}")]
    InvalidTemperatureAxis(f64, f64, f64),
    #[error("Config number of threads {0} is invalid; it must be at least 1")]
    InvalidThreads(i32),
    #[error("Config does not request any output; enable make_grid and/or make_curves")]
    NoOutputRequested,
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Could not open measurement table because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Measurement table failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Measurement table failed to parse tab-separated data: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Measurement table is missing the required column '{0}'")]
    MissingColumn(String),
    #[error("Measurement table line {line} has no value in column '{column}'")]
    MissingValue { line: u64, column: String },
    #[error("Measurement table line {line} has non-numeric value '{value}' in column '{column}'")]
    BadValue {
        line: u64,
        column: String,
        value: String,
    },
    #[error("Measurement table line {line} has non-finite value {value} in column '{column}'")]
    NonFiniteValue { line: u64, column: String, value: f64 },
    #[error("Measurement table contains no data rows")]
    NoRows,
}

#[derive(Debug, Error)]
pub enum BinningError {
    #[error("Binning failed for setpoint {setpoint} K: field bin {bin} [{lo}, {hi}) contains no data")]
    EmptyBin {
        setpoint: f64,
        bin: usize,
        lo: f64,
        hi: f64,
    },
}

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("Writer failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Writer failed to write tab-separated data: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Writer failed to convert to yaml: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Writer failed to format the processing timestamp: {0}")]
    TimestampError(#[from] time::error::Format),
    #[error("Writer could not derive output names from table path {0:?}")]
    BadTablePath(PathBuf),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed while loading table {path:?}: {source}")]
    TableError {
        path: PathBuf,
        #[source]
        source: TableError,
    },
    #[error("Processor failed while binning table {path:?}: {source}")]
    BinningError {
        path: PathBuf,
        #[source]
        source: BinningError,
    },
    #[error("Processor failed due to Writer error: {0}")]
    WriterError(#[from] WriterError),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
}
