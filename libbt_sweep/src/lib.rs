//! # bt_sweep
//!
//! bt_sweep post-processes the transport measurements taken on superconducting samples
//! during temperature/magnetic-field sweeps ("2DBT" runs). It takes the tab-separated
//! measurement log written by the acquisition software, splits it into ramps (one field
//! sweep per temperature setpoint), and turns the raw four-point signal into a sheet
//! resistance using the Van der Pauw ln(2) correction. The result is either a 2D
//! resistance map (field × temperature) ready for a heat-map plot, a set of
//! resistance-vs-field curves ready for an overlay plot, or both.
//!
//! ## Installation
//!
//! The only method of install is from source. If you have not used Rust before, see the
//! [Rust docs](https://www.rust-lang.org/tools/install) for installation instructions.
//!
//! To build and install the CLI use `cargo install --path ./bt_sweep_cli` from the top
//! level bt_sweep repository.
//!
//! ## Configuration
//!
//! Runs are described by a YAML file. A template can be made with
//! `bt_sweep_cli new -p config.yml`. The format is as follows:
//!
//! ```yml
//! table_paths:
//! - /data/2023_02_15_A064/033/033_Data.txt
//! output_path: /data/2023_02_15_A064/plots
//! columns:
//!   setpoint: temp setpoint (K)
//!   probe_temperature: probe temp (K)
//!   field: field (T)
//!   signal: NF res
//! excitation_current: 0.0001
//! conversion_factor: 1.0e-6
//! unit_prefix: u
//! temperature_axis:
//!   start: 1.5
//!   end: 10.5
//!   step: 1.0
//! min_field: -0.5
//! max_field: 8.0
//! field_step: 0.05
//! temperature_order: ascending
//! make_grid: true
//! make_curves: false
//! require_full_coverage: false
//! no_data_marker: NaN
//! title: 2DBT Plot
//! n_threads: 1
//! ```
//!
//! - `table_paths`: products are named after the file stem, so no two tables may share one.
//! - `columns`: header names of the setpoint, probe temperature, field and signal columns.
//! A missing column fails the table.
//! - `excitation_current`: in Amps. `conversion_factor` scales the result to the unit
//! named by `unit_prefix` (1e-6 and `u` for micro-ohms per square).
//! - `min_field`, `max_field`, `field_step`: the field bins of the grid. The step must
//! divide the range, and give at most one million bins.
//! - `temperature_axis`: optional; only used for the extents of the grid. Without it the
//! extents come from the setpoints found in the data.
//! - `temperature_order`: `ascending` sorts the temperature steps numerically. `discovery`
//! keeps them in the order they first appear in the table.
//! - `require_full_coverage`: if true, a grid cell with no samples fails the table rather
//! than being written as `no_data_marker`.
//! - `n_threads`: the tables are divided amongst this many worker threads.
//!
//! ## Output
//!
//! For each table `<name>.txt` the following are written to `output_path`:
//!
//! ```text
//! <name>_grid.tsv   - field_lo, field_hi, one column of sheet resistance per setpoint
//! <name>_curves.tsv - setpoint, label, field, resistance; one line per sample
//! <name>.yml        - run summary: ramps (mean probe temperature, datapoints), unit, extents
//! ```
//!
//! Curve labels are the setpoint in Kelvin with at least one decimal, e.g. `2.0K`.
//! Grid lines are in bin order: bin 0 holds the highest fields. A bin holds fields in
//! `[lo, hi)`, the top bin also keeps samples exactly at `max_field`.
pub mod binning;
pub mod config;
pub mod curves;
pub mod error;
pub mod process;
pub mod ramp;
pub mod table;
pub mod worker_status;
pub mod writer;
