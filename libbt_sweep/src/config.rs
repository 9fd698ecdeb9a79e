use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::binning::{FieldBins, SheetResistance};
use super::error::ConfigError;

/// Relative tolerance used when checking that the field step divides the field range
const BIN_DIVISION_TOLERANCE: f64 = 1.0e-9;
/// Upper limit on the number of field bins of a grid
const MAX_FIELD_BINS: f64 = 1.0e6;

/// Header names of the measurement table columns consumed by the transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub setpoint: String,
    pub probe_temperature: String,
    pub field: String,
    pub signal: String,
}

impl Default for ColumnMap {
    /// The column names written by the lab's 2DBT acquisition software
    fn default() -> Self {
        Self {
            setpoint: String::from("temp setpoint (K)"),
            probe_temperature: String::from("probe temp (K)"),
            field: String::from("field (T)"),
            signal: String::from("NF res"),
        }
    }
}

/// Nominal temperature axis of a run, used only for the grid extents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureAxis {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

/// Order of the temperature-step axis of the grid and of the curve list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureOrder {
    /// Setpoints sorted numerically, lowest first
    #[default]
    Ascending,
    /// Setpoints in the order they first appear in the table
    Discovery,
}

/// Structure representing the application configuration. Contains pathing, column and
/// physical constants for a run.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub table_paths: Vec<PathBuf>,
    pub output_path: PathBuf,
    pub columns: ColumnMap,
    pub excitation_current: f64,
    pub conversion_factor: f64,
    pub unit_prefix: String,
    pub temperature_axis: Option<TemperatureAxis>,
    pub min_field: f64,
    pub max_field: f64,
    pub field_step: f64,
    pub temperature_order: TemperatureOrder,
    pub make_grid: bool,
    pub make_curves: bool,
    pub require_full_coverage: bool,
    pub no_data_marker: String,
    pub title: String,
    pub n_threads: i32,
}

impl Default for Config {
    /// Generate a new Config object. Paths will be empty/invalid, the physical constants
    /// are those of a typical 100 uA run plotted in micro-ohms
    fn default() -> Self {
        Self {
            table_paths: vec![],
            output_path: PathBuf::from("None"),
            columns: ColumnMap::default(),
            excitation_current: 1.0e-4,
            conversion_factor: 1.0e-6,
            unit_prefix: String::from("u"),
            temperature_axis: None,
            min_field: -0.5,
            max_field: 8.0,
            field_step: 0.05,
            temperature_order: TemperatureOrder::default(),
            make_grid: true,
            make_curves: false,
            require_full_coverage: false,
            no_data_marker: String::from("NaN"),
            title: String::from("2DBT Plot"),
            n_threads: 1,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Check everything that can be checked before touching a measurement table
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.table_paths.is_empty() {
            return Err(ConfigError::NoTables);
        }
        if !self.output_path.is_dir() {
            return Err(ConfigError::BadOutputPath(self.output_path.clone()));
        }
        if !self.make_grid && !self.make_curves {
            return Err(ConfigError::NoOutputRequested);
        }
        if !self.is_n_threads_valid() {
            return Err(ConfigError::InvalidThreads(self.n_threads));
        }
        // Products are named after the table stem, so stems must be unique
        let mut stems = FxHashSet::default();
        for path in &self.table_paths {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !stems.insert(stem.clone()) {
                return Err(ConfigError::DuplicateTableStem(stem));
            }
        }
        if let Some(axis) = &self.temperature_axis {
            if !axis.step.is_finite()
                || axis.step <= 0.0
                || !axis.start.is_finite()
                || !axis.end.is_finite()
                || axis.end < axis.start
            {
                return Err(ConfigError::InvalidTemperatureAxis(
                    axis.start, axis.end, axis.step,
                ));
            }
        }
        self.sheet_resistance()?;
        self.field_bins()?;
        Ok(())
    }

    /// Build the field bins described by the field range and step.
    ///
    /// The step must divide the range; a narrower trailing bin is never produced.
    pub fn field_bins(&self) -> Result<FieldBins, ConfigError> {
        if !self.min_field.is_finite()
            || !self.max_field.is_finite()
            || self.max_field <= self.min_field
        {
            return Err(ConfigError::InvalidFieldRange(
                self.min_field,
                self.max_field,
            ));
        }
        if !self.field_step.is_finite() || self.field_step <= 0.0 {
            return Err(ConfigError::InvalidFieldStep(self.field_step));
        }

        let range = self.max_field - self.min_field;
        let n_bins = range / self.field_step;
        if !range.is_finite() || !n_bins.is_finite() {
            return Err(ConfigError::InvalidFieldRange(
                self.min_field,
                self.max_field,
            ));
        }
        let rounded = n_bins.round();
        if rounded > MAX_FIELD_BINS {
            return Err(ConfigError::TooManyFieldBins(n_bins));
        }
        let tolerance = BIN_DIVISION_TOLERANCE * n_bins.max(1.0);
        if rounded < 1.0 || !((n_bins - rounded).abs() <= tolerance) {
            return Err(ConfigError::UnevenFieldStep {
                range,
                step: self.field_step,
            });
        }

        Ok(FieldBins::new(
            self.min_field,
            self.max_field,
            self.field_step,
            rounded as usize,
        ))
    }

    /// The voltage to sheet resistance conversion for this run
    pub fn sheet_resistance(&self) -> Result<SheetResistance, ConfigError> {
        if !self.excitation_current.is_finite() || self.excitation_current == 0.0 {
            return Err(ConfigError::InvalidExcitationCurrent(
                self.excitation_current,
            ));
        }
        if !self.conversion_factor.is_finite() || self.conversion_factor == 0.0 {
            return Err(ConfigError::InvalidConversionFactor(self.conversion_factor));
        }
        Ok(SheetResistance::new(
            self.excitation_current,
            self.conversion_factor,
            &self.unit_prefix,
        ))
    }

    /// Get the path to an output product of a table, e.g. `<output>/<stem>_grid.tsv`
    pub fn get_output_file_name(&self, table_path: &Path, suffix: &str) -> Option<PathBuf> {
        let stem = table_path.file_stem()?;
        Some(
            self.output_path
                .join(format!("{}{suffix}", stem.to_string_lossy())),
        )
    }

    pub fn is_n_threads_valid(&self) -> bool {
        self.n_threads >= 1
    }
}
