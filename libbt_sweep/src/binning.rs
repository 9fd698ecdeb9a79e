use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::config::TemperatureAxis;
use super::error::BinningError;
use super::ramp::SortedRamp;
use super::table::MeasurementRow;

/// Converts a raw four-point signal into a sheet resistance.
///
/// `resistance = signal / excitation_current * ln(2) / conversion_factor`. The ln(2) is
/// the Van der Pauw geometric correction, the conversion factor rescales to the unit
/// prefix (1e-6 for micro-ohms, 1e-9 for nano-ohms, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct SheetResistance {
    excitation_current: f64,
    conversion_factor: f64,
    unit_prefix: String,
}

impl SheetResistance {
    pub fn new(excitation_current: f64, conversion_factor: f64, unit_prefix: &str) -> Self {
        Self {
            excitation_current,
            conversion_factor,
            unit_prefix: unit_prefix.to_string(),
        }
    }

    pub fn convert(&self, signal: f64) -> f64 {
        signal / self.excitation_current * std::f64::consts::LN_2 / self.conversion_factor
    }

    /// Unit of the converted values, e.g. `uΩ/□`
    pub fn unit_label(&self) -> String {
        format!("{}Ω/□", self.unit_prefix)
    }
}

/// One fixed-width slice of the field sweep.
///
/// Holds fields in `[lo, hi)`. The top bin (index 0) is also closed at `hi` so that a
/// sample sitting exactly on the maximum field is kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBin {
    pub index: usize,
    pub lo: f64,
    pub hi: f64,
}

impl FieldBin {
    pub fn contains(&self, field: f64) -> bool {
        (self.lo <= field && field < self.hi) || (self.index == 0 && field == self.hi)
    }

    /// The rows of a sorted ramp which fall in this bin. They are contiguous.
    pub fn select<'a>(&self, rows: &'a [MeasurementRow]) -> &'a [MeasurementRow] {
        let start = rows.partition_point(|row| row.field < self.lo);
        let end = if self.index == 0 {
            rows.partition_point(|row| row.field <= self.hi)
        } else {
            rows.partition_point(|row| row.field < self.hi)
        };
        &rows[start..end.max(start)]
    }
}

/// The partition of `[min_field, max_field]` into equal bins, indexed from the maximum
/// field downward.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBins {
    min_field: f64,
    max_field: f64,
    step: f64,
    count: usize,
}

impl FieldBins {
    /// Bins are normally obtained through `Config::field_bins`, which checks that `step`
    /// divides the range into `count` bins.
    pub fn new(min_field: f64, max_field: f64, step: f64, count: usize) -> Self {
        Self {
            min_field,
            max_field,
            step,
            count,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn min_field(&self) -> f64 {
        self.min_field
    }

    pub fn max_field(&self) -> f64 {
        self.max_field
    }

    pub fn bin(&self, index: usize) -> FieldBin {
        let hi = self.max_field - index as f64 * self.step;
        let lo = if index + 1 == self.count {
            self.min_field
        } else {
            self.max_field - (index + 1) as f64 * self.step
        };
        FieldBin { index, lo, hi }
    }

    pub fn iter(&self) -> impl Iterator<Item = FieldBin> + '_ {
        (0..self.count).map(|idx| self.bin(idx))
    }
}

/// Mean converted resistance of each field bin of one ramp. `None` marks a bin without data.
pub fn bin_ramp(
    ramp: &SortedRamp,
    bins: &FieldBins,
    conversion: &SheetResistance,
) -> Vec<Option<f64>> {
    bins.iter()
        .map(|bin| {
            let subset = bin.select(ramp.rows());
            if subset.is_empty() {
                None
            } else {
                let total: f64 = subset.iter().map(|row| row.signal).sum();
                Some(conversion.convert(total / subset.len() as f64))
            }
        })
        .collect()
}

/// Axis extents of a grid for a heat-map style display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridExtents {
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub field_min: f64,
    pub field_max: f64,
}

/// ResistanceGrid is the 2D sheet-resistance map of a run.
///
/// Indexed by `[field bin, temperature step]`. Column `j` belongs to `setpoints()[j]`.
#[derive(Debug, Clone)]
pub struct ResistanceGrid {
    cells: Array2<Option<f64>>,
    setpoints: Vec<f64>,
    bins: FieldBins,
}

impl ResistanceGrid {
    /// Bin and average every ramp. The ramps must already be in temperature-axis order.
    ///
    /// With `require_full_coverage` an empty bin is an error instead of a no-data cell.
    pub fn build(
        ramps: &[SortedRamp],
        bins: &FieldBins,
        conversion: &SheetResistance,
        require_full_coverage: bool,
    ) -> Result<Self, BinningError> {
        let mut cells = Array2::from_elem((bins.len(), ramps.len()), None);

        for (step, ramp) in ramps.iter().enumerate() {
            for (idx, value) in bin_ramp(ramp, bins, conversion).into_iter().enumerate() {
                if value.is_none() {
                    if require_full_coverage {
                        let bin = bins.bin(idx);
                        return Err(BinningError::EmptyBin {
                            setpoint: ramp.setpoint,
                            bin: idx,
                            lo: bin.lo,
                            hi: bin.hi,
                        });
                    }
                    log::debug!(
                        "No data for setpoint {} K in field bin {}",
                        ramp.setpoint,
                        idx
                    );
                }
                cells[[idx, step]] = value;
            }
        }

        Ok(Self {
            cells,
            setpoints: ramps.iter().map(|r| r.setpoint).collect(),
            bins: bins.clone(),
        })
    }

    /// (field bins, temperature steps)
    pub fn shape(&self) -> (usize, usize) {
        self.cells.dim()
    }

    pub fn get(&self, bin: usize, step: usize) -> Option<f64> {
        self.cells.get([bin, step]).copied().flatten()
    }

    pub fn cells(&self) -> &Array2<Option<f64>> {
        &self.cells
    }

    pub fn setpoints(&self) -> &[f64] {
        &self.setpoints
    }

    pub fn bins(&self) -> &FieldBins {
        &self.bins
    }

    /// Number of cells carrying the no-data marker
    pub fn empty_cells(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_none()).count()
    }

    /// Extents are padded by half a step on every side so cells are centered on their
    /// setpoint/bin. Without a configured temperature axis the setpoints themselves are used.
    pub fn extents(&self, axis: Option<&TemperatureAxis>) -> GridExtents {
        let (temperature_min, temperature_max) = match axis {
            Some(axis) => (axis.start - axis.step / 2.0, axis.end + axis.step / 2.0),
            None => {
                let mut sorted = self.setpoints.clone();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let spacing = sorted
                    .windows(2)
                    .map(|w| w[1] - w[0])
                    .filter(|d| *d > 0.0)
                    .fold(f64::INFINITY, f64::min);
                let half = if spacing.is_finite() { spacing / 2.0 } else { 0.0 };
                match (sorted.first(), sorted.last()) {
                    (Some(lo), Some(hi)) => (lo - half, hi + half),
                    _ => (0.0, 0.0),
                }
            }
        };
        let half_step = self.bins.step() / 2.0;
        GridExtents {
            temperature_min,
            temperature_max,
            field_min: self.bins.min_field() - half_step,
            field_max: self.bins.max_field() + half_step,
        }
    }
}
