use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::binning::{GridExtents, ResistanceGrid};
use super::config::{Config, TemperatureOrder};
use super::curves::ResistanceCurve;
use super::error::WriterError;
use super::ramp::RampSummary;

const GRID_SUFFIX: &str = "_grid.tsv";
const CURVES_SUFFIX: &str = "_curves.tsv";
const SUMMARY_SUFFIX: &str = ".yml";
/// This is the version of the output format
const FORMAT_VERSION: &str = "1.0";

/// Shape and coverage of a written grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSummary {
    pub field_bins: usize,
    pub temperature_steps: usize,
    pub empty_cells: usize,
    pub extents: GridExtents,
}

/// The YAML record written next to the products of every processed table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub version: String,
    pub processed_at: String,
    pub source: PathBuf,
    pub title: String,
    pub unit: String,
    pub temperature_order: TemperatureOrder,
    pub datapoints: usize,
    pub ramps: Vec<RampSummary>,
    pub grid: Option<GridSummary>,
    pub curves: Option<usize>,
}

impl RunSummary {
    /// Start a summary stamped with the current time
    pub fn new(
        config: &Config,
        source: &Path,
        unit: String,
        datapoints: usize,
        ramps: Vec<RampSummary>,
    ) -> Result<Self, WriterError> {
        Ok(Self {
            version: format!("{}:{}", env!("CARGO_PKG_NAME"), FORMAT_VERSION),
            processed_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
            source: source.to_path_buf(),
            title: config.title.clone(),
            unit,
            temperature_order: config.temperature_order,
            datapoints,
            ramps,
            grid: None,
            curves: None,
        })
    }
}

/// Write a grid as tab-separated text.
///
/// One line per field bin (bin 0, the highest field, first), one column per temperature
/// step. Cells without data are written as `no_data_marker`.
pub fn write_grid<W: Write>(
    grid: &ResistanceGrid,
    no_data_marker: &str,
    dest: W,
) -> Result<(), WriterError> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(dest);

    let mut header = vec![String::from("field_lo"), String::from("field_hi")];
    header.extend(grid.setpoints().iter().map(|sp| sp.to_string()));
    writer.write_record(&header)?;

    for (bin, cells) in grid.bins().iter().zip(grid.cells().rows()) {
        let mut record = vec![bin.lo.to_string(), bin.hi.to_string()];
        record.extend(cells.iter().map(|cell| match cell {
            Some(value) => value.to_string(),
            None => no_data_marker.to_string(),
        }));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write curves as tab-separated text, one point per line
pub fn write_curves<W: Write>(curves: &[ResistanceCurve], dest: W) -> Result<(), WriterError> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(dest);
    writer.write_record(["setpoint", "label", "field", "resistance"])?;
    for curve in curves {
        let setpoint = curve.setpoint.to_string();
        for (field, resistance) in curve.fields.iter().zip(&curve.resistances) {
            writer.write_record([
                setpoint.clone(),
                curve.label.clone(),
                field.to_string(),
                resistance.to_string(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// ProductWriter places the outputs of one measurement table in the output directory.
///
/// For a table `033_Data.txt` it writes `033_Data_grid.tsv`, `033_Data_curves.tsv` and
/// `033_Data.yml`.
#[derive(Debug)]
pub struct ProductWriter {
    grid_path: PathBuf,
    curves_path: PathBuf,
    summary_path: PathBuf,
    no_data_marker: String,
}

impl ProductWriter {
    pub fn new(config: &Config, table_path: &Path) -> Result<Self, WriterError> {
        let product = |suffix: &str| {
            config
                .get_output_file_name(table_path, suffix)
                .ok_or_else(|| WriterError::BadTablePath(table_path.to_path_buf()))
        };
        Ok(Self {
            grid_path: product(GRID_SUFFIX)?,
            curves_path: product(CURVES_SUFFIX)?,
            summary_path: product(SUMMARY_SUFFIX)?,
            no_data_marker: config.no_data_marker.clone(),
        })
    }

    pub fn write_grid(&self, grid: &ResistanceGrid) -> Result<(), WriterError> {
        write_grid(grid, &self.no_data_marker, File::create(&self.grid_path)?)?;
        log::info!("Wrote grid to {}", self.grid_path.to_string_lossy());
        Ok(())
    }

    pub fn write_curves(&self, curves: &[ResistanceCurve]) -> Result<(), WriterError> {
        write_curves(curves, File::create(&self.curves_path)?)?;
        log::info!("Wrote curves to {}", self.curves_path.to_string_lossy());
        Ok(())
    }

    pub fn write_summary(&self, summary: &RunSummary) -> Result<(), WriterError> {
        let yaml_str = serde_yaml::to_string(summary)?;
        let mut file = File::create(&self.summary_path)?;
        file.write_all(yaml_str.as_bytes())?;
        log::info!("Wrote run summary to {}", self.summary_path.to_string_lossy());
        Ok(())
    }

    pub fn grid_path(&self) -> &Path {
        &self.grid_path
    }

    pub fn curves_path(&self) -> &Path {
        &self.curves_path
    }

    pub fn summary_path(&self) -> &Path {
        &self.summary_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::{FieldBins, SheetResistance};
    use crate::ramp::group_by_setpoint;
    use crate::table::{MeasurementRow, MeasurementTable};

    fn grid() -> ResistanceGrid {
        let rows = vec![
            MeasurementRow {
                setpoint: 1.5,
                probe_temperature: 1.5,
                field: 0.25,
                signal: 2.0,
            },
            MeasurementRow {
                setpoint: 2.5,
                probe_temperature: 2.5,
                field: -0.25,
                signal: 4.0,
            },
        ];
        let ramps: Vec<_> = group_by_setpoint(&MeasurementTable::from_rows(rows))
            .iter()
            .map(|r| r.sorted_by_field())
            .collect();
        let bins = FieldBins::new(-0.5, 0.5, 0.5, 2);
        let conversion = SheetResistance::new(1.0, 1.0, "");
        ResistanceGrid::build(&ramps, &bins, &conversion, false).unwrap()
    }

    #[test]
    fn test_write_grid() {
        let mut buffer = Vec::new();
        write_grid(&grid(), "NaN", &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        let ln2 = std::f64::consts::LN_2;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "field_lo\tfield_hi\t1.5\t2.5");
        assert_eq!(lines[1], format!("0\t0.5\t{}\tNaN", 2.0 * ln2));
        assert_eq!(lines[2], format!("-0.5\t0\tNaN\t{}", 4.0 * ln2));
    }

    #[test]
    fn test_write_curves() {
        let curves = vec![ResistanceCurve {
            setpoint: 1.5,
            label: String::from("1.5K"),
            fields: vec![-0.1, 0.1],
            resistances: vec![10.0, 12.5],
        }];
        let mut buffer = Vec::new();
        write_curves(&curves, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text,
            "setpoint\tlabel\tfield\tresistance\n1.5\t1.5K\t-0.1\t10\n1.5\t1.5K\t0.1\t12.5\n"
        );
    }

    #[test]
    fn test_summary_yaml() {
        let config = Config::default();
        let ramps = vec![RampSummary {
            setpoint: 1.5,
            mean_probe_temperature: 1.52,
            datapoints: 10,
        }];
        let summary =
            RunSummary::new(&config, Path::new("run.txt"), String::from("uΩ/□"), 10, ramps)
                .unwrap();
        assert!(summary.version.starts_with("libbt_sweep:"));

        let yaml = serde_yaml::to_string(&summary).unwrap();
        let parsed: RunSummary = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.ramps, summary.ramps);
        assert_eq!(parsed.temperature_order, TemperatureOrder::Ascending);
        assert!(parsed.grid.is_none());
    }
}
