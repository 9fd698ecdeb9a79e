use super::binning::SheetResistance;
use super::ramp::SortedRamp;

/// Resistance vs. field at one fixed temperature, for overlay plots
#[derive(Debug, Clone, PartialEq)]
pub struct ResistanceCurve {
    pub setpoint: f64,
    pub label: String,
    pub fields: Vec<f64>,
    pub resistances: Vec<f64>,
}

impl ResistanceCurve {
    /// Every sample of the ramp becomes a point, in ascending field order
    pub fn from_ramp(ramp: &SortedRamp, conversion: &SheetResistance) -> Self {
        let (fields, resistances) = ramp
            .rows()
            .iter()
            .map(|row| (row.field, conversion.convert(row.signal)))
            .unzip();
        Self {
            setpoint: ramp.setpoint,
            label: ramp.label(),
            fields,
            resistances,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One curve per ramp, keeping the order of the ramps
pub fn build_curves(ramps: &[SortedRamp], conversion: &SheetResistance) -> Vec<ResistanceCurve> {
    ramps
        .iter()
        .map(|ramp| ResistanceCurve::from_ramp(ramp, conversion))
        .collect()
}
