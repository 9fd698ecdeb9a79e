use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::config::TemperatureOrder;
use super::table::{MeasurementRow, MeasurementTable};

/// A Ramp is one field sweep at a fixed nominal temperature.
///
/// All rows share exactly the same setpoint and are kept in acquisition order.
#[derive(Debug, Clone, PartialEq)]
pub struct Ramp {
    pub setpoint: f64,
    rows: Vec<MeasurementRow>,
}

/// A Ramp whose rows are non-decreasing in field. Only made by [`Ramp::sorted_by_field`].
#[derive(Debug, Clone, PartialEq)]
pub struct SortedRamp {
    pub setpoint: f64,
    rows: Vec<MeasurementRow>,
}

/// Mean measured temperature of a Ramp, to check it against the setpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampSummary {
    pub setpoint: f64,
    pub mean_probe_temperature: f64,
    pub datapoints: usize,
}

impl Ramp {
    pub fn rows(&self) -> &[MeasurementRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Copy the rows into ascending field order. Equal fields keep their relative order.
    pub fn sorted_by_field(&self) -> SortedRamp {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| a.field.total_cmp(&b.field));
        SortedRamp {
            setpoint: self.setpoint,
            rows,
        }
    }

    pub fn summary(&self) -> RampSummary {
        let total: f64 = self.rows.iter().map(|row| row.probe_temperature).sum();
        RampSummary {
            setpoint: self.setpoint,
            mean_probe_temperature: total / self.rows.len() as f64,
            datapoints: self.rows.len(),
        }
    }
}

impl SortedRamp {
    pub fn rows(&self) -> &[MeasurementRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Legend label for this ramp, e.g. `1.5K`. Whole setpoints keep their decimal
    /// point (`2.0K`) to match the legends of the lab's overlay plots.
    pub fn label(&self) -> String {
        format!("{:?}K", self.setpoint)
    }
}

/// Hash key of a setpoint. -0.0 and 0.0 are the same setpoint.
fn setpoint_key(setpoint: f64) -> u64 {
    if setpoint == 0.0 {
        0.0_f64.to_bits()
    } else {
        setpoint.to_bits()
    }
}

/// Partition a table into one Ramp per distinct setpoint.
///
/// Ramps are returned in the order their setpoint first appears in the table. Every row
/// ends up in exactly one Ramp.
pub fn group_by_setpoint(table: &MeasurementTable) -> Vec<Ramp> {
    let mut ramps: Vec<Ramp> = Vec::new();
    let mut lookup: FxHashMap<u64, usize> = FxHashMap::default();

    for row in table.rows() {
        let idx = *lookup.entry(setpoint_key(row.setpoint)).or_insert_with(|| {
            ramps.push(Ramp {
                setpoint: row.setpoint,
                rows: Vec::new(),
            });
            ramps.len() - 1
        });
        ramps[idx].rows.push(*row);
    }

    ramps
}

/// Arrange ramps along the temperature-step axis
pub fn order_ramps(mut ramps: Vec<SortedRamp>, order: TemperatureOrder) -> Vec<SortedRamp> {
    if order == TemperatureOrder::Ascending {
        ramps.sort_by(|a, b| a.setpoint.total_cmp(&b.setpoint));
    }
    ramps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(setpoint: f64, field: f64, signal: f64) -> MeasurementRow {
        MeasurementRow {
            setpoint,
            probe_temperature: setpoint + 0.01,
            field,
            signal,
        }
    }

    fn sample_table() -> MeasurementTable {
        MeasurementTable::from_rows(vec![
            row(2.5, 0.3, 1.0),
            row(1.5, 0.1, 2.0),
            row(2.5, -0.2, 3.0),
            row(1.5, 0.4, 4.0),
            row(3.5, 0.0, 5.0),
            row(2.5, 0.3, 6.0),
            row(1.5, -0.4, 7.0),
        ])
    }

    #[test]
    fn test_grouping_is_partition() {
        let table = sample_table();
        let ramps = group_by_setpoint(&table);

        // one ramp per distinct setpoint, in discovery order
        let setpoints: Vec<f64> = ramps.iter().map(|r| r.setpoint).collect();
        assert_eq!(setpoints, vec![2.5, 1.5, 3.5]);

        // no loss, no duplication
        let total: usize = ramps.iter().map(|r| r.len()).sum();
        assert_eq!(total, table.len());
        for ramp in &ramps {
            assert!(ramp.rows().iter().all(|r| r.setpoint == ramp.setpoint));
        }
        let signals: Vec<f64> = ramps[0].rows().iter().map(|r| r.signal).collect();
        assert_eq!(signals, vec![1.0, 3.0, 6.0]);
    }

    #[test]
    fn test_negative_zero_setpoint() {
        let table = MeasurementTable::from_rows(vec![row(0.0, 0.0, 1.0), row(-0.0, 0.1, 2.0)]);
        assert_eq!(group_by_setpoint(&table).len(), 1);
    }

    #[test]
    fn test_sort_is_stable_permutation() {
        let ramps = group_by_setpoint(&sample_table());
        let original = ramps[0].clone();
        let sorted = ramps[0].sorted_by_field();

        assert_eq!(sorted.len(), original.len());
        assert!(!sorted.is_empty());
        assert!(sorted.rows().windows(2).all(|w| w[0].field <= w[1].field));
        // equal fields 0.3 keep acquisition order (signals 1 then 6)
        let signals: Vec<f64> = sorted.rows().iter().map(|r| r.signal).collect();
        assert_eq!(signals, vec![3.0, 1.0, 6.0]);
        // input untouched
        assert_eq!(ramps[0], original);
    }

    #[test]
    fn test_summary() {
        let ramps = group_by_setpoint(&sample_table());
        let summary = ramps[1].summary();
        assert_eq!(summary.setpoint, 1.5);
        assert_eq!(summary.datapoints, 3);
        assert!((summary.mean_probe_temperature - 1.51).abs() < 1e-12);
    }

    #[test]
    fn test_order_ramps() {
        let sorted: Vec<SortedRamp> = group_by_setpoint(&sample_table())
            .iter()
            .map(|r| r.sorted_by_field())
            .collect();

        let discovery = order_ramps(sorted.clone(), TemperatureOrder::Discovery);
        let setpoints: Vec<f64> = discovery.iter().map(|r| r.setpoint).collect();
        assert_eq!(setpoints, vec![2.5, 1.5, 3.5]);

        let ascending = order_ramps(sorted, TemperatureOrder::Ascending);
        let setpoints: Vec<f64> = ascending.iter().map(|r| r.setpoint).collect();
        assert_eq!(setpoints, vec![1.5, 2.5, 3.5]);
        assert_eq!(ascending[0].label(), "1.5K");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        /// Rows with few distinct setpoints and coarse fields so ties are common. The signal
        /// holds the acquisition index of the row.
        fn table_strategy() -> impl Strategy<Value = MeasurementTable> {
            prop::collection::vec((0u8..5, -8i32..8), 0..200).prop_map(|cells| {
                let rows = cells
                    .into_iter()
                    .enumerate()
                    .map(|(idx, (setpoint, field))| {
                        row(1.5 + setpoint as f64 * 0.5, field as f64 * 0.25, idx as f64)
                    })
                    .collect();
                MeasurementTable::from_rows(rows)
            })
        }

        proptest! {
            /// Property: every row lands in exactly one ramp, one ramp per distinct setpoint
            #[test]
            fn prop_grouping_is_partition(table in table_strategy()) {
                let ramps = group_by_setpoint(&table);

                let distinct: std::collections::BTreeSet<u64> =
                    table.rows().iter().map(|r| r.setpoint.to_bits()).collect();
                prop_assert_eq!(ramps.len(), distinct.len());

                let mut tags: Vec<usize> = Vec::new();
                for ramp in &ramps {
                    prop_assert!(!ramp.is_empty());
                    prop_assert!(ramp.rows().iter().all(|r| r.setpoint == ramp.setpoint));
                    // acquisition order is kept inside a ramp
                    prop_assert!(ramp.rows().windows(2).all(|w| w[0].signal < w[1].signal));
                    tags.extend(ramp.rows().iter().map(|r| r.signal as usize));
                }
                tags.sort_unstable();
                prop_assert_eq!(tags, (0..table.len()).collect::<Vec<usize>>());
            }

            /// Property: sorting gives a stable, non-decreasing permutation of the ramp
            #[test]
            fn prop_sort_is_stable_permutation(table in table_strategy()) {
                for ramp in group_by_setpoint(&table) {
                    let sorted = ramp.sorted_by_field();
                    prop_assert_eq!(sorted.len(), ramp.len());
                    prop_assert_eq!(sorted.is_empty(), ramp.is_empty());
                    prop_assert_eq!(sorted.setpoint, ramp.setpoint);

                    for w in sorted.rows().windows(2) {
                        prop_assert!(w[0].field <= w[1].field);
                        if w[0].field == w[1].field {
                            prop_assert!(w[0].signal < w[1].signal);
                        }
                    }

                    let mut before: Vec<usize> = ramp.rows().iter().map(|r| r.signal as usize).collect();
                    let mut after: Vec<usize> = sorted.rows().iter().map(|r| r.signal as usize).collect();
                    before.sort_unstable();
                    after.sort_unstable();
                    prop_assert_eq!(before, after);
                }
            }
        }
    }
}
