use std::sync::mpsc::Sender;

use super::binning::ResistanceGrid;
use super::config::Config;
use super::curves::{build_curves, ResistanceCurve};
use super::error::{ConfigError, ProcessorError};
use super::ramp::{group_by_setpoint, order_ramps, Ramp, RampSummary};
use super::table::MeasurementTable;
use super::worker_status::{Stage, WorkerStatus};
use super::writer::{GridSummary, ProductWriter, RunSummary};

/// Everything produced from one measurement table
#[derive(Debug, Clone)]
pub struct TableProducts {
    pub summary: RunSummary,
    pub grid: Option<ResistanceGrid>,
    pub curves: Option<Vec<ResistanceCurve>>,
}

fn report(
    tx: &Sender<WorkerStatus>,
    progress: f32,
    table_index: usize,
    worker_id: &usize,
    stage: Stage,
) -> Result<(), ProcessorError> {
    tx.send(WorkerStatus::new(progress, table_index, *worker_id, stage))?;
    Ok(())
}

/// Run the whole transform on one table of the config.
///
/// Load, group by setpoint, sort by field, then build the grid and/or curves requested by
/// the config and write them with the run summary. Each call is independent of any other.
pub fn process_table(
    config: &Config,
    table_index: usize,
    tx: &Sender<WorkerStatus>,
    worker_id: &usize,
) -> Result<TableProducts, ProcessorError> {
    let path = config
        .table_paths
        .get(table_index)
        .ok_or(ConfigError::BadTableIndex(table_index))?;
    let bins = config.field_bins()?;
    let conversion = config.sheet_resistance()?;
    let writer = ProductWriter::new(config, path)?;

    report(tx, 0.0, table_index, worker_id, Stage::Loading)?;
    let table = MeasurementTable::read(path, &config.columns).map_err(|source| {
        ProcessorError::TableError {
            path: path.clone(),
            source,
        }
    })?;

    report(tx, 0.25, table_index, worker_id, Stage::Grouping)?;
    let ramps = group_by_setpoint(&table);
    log::info!(
        "Found {} temperature setpoints in {} rows",
        ramps.len(),
        table.len()
    );
    let ramp_summaries: Vec<RampSummary> = ramps
        .iter()
        .map(|ramp| {
            let summary = ramp.summary();
            log::info!(
                "Setpoint {} K -- mean temp: {}, datapoints: {}",
                summary.setpoint,
                summary.mean_probe_temperature,
                summary.datapoints
            );
            summary
        })
        .collect();
    let sorted = order_ramps(
        ramps.iter().map(Ramp::sorted_by_field).collect(),
        config.temperature_order,
    );

    let mut summary = RunSummary::new(
        config,
        path,
        conversion.unit_label(),
        table.len(),
        ramp_summaries,
    )?;

    let grid = if config.make_grid {
        report(tx, 0.5, table_index, worker_id, Stage::Binning)?;
        let full_coverage = config.require_full_coverage;
        let grid = ResistanceGrid::build(&sorted, &bins, &conversion, full_coverage)
            .map_err(|source| ProcessorError::BinningError {
                path: path.clone(),
                source,
            })?;
        let (field_bins, temperature_steps) = grid.shape();
        let empty_cells = grid.empty_cells();
        if empty_cells > 0 {
            log::warn!(
                "{} of {} grid cells have no data and are written as '{}'",
                empty_cells,
                field_bins * temperature_steps,
                config.no_data_marker
            );
        }
        summary.grid = Some(GridSummary {
            field_bins,
            temperature_steps,
            empty_cells,
            extents: grid.extents(config.temperature_axis.as_ref()),
        });
        Some(grid)
    } else {
        None
    };

    let curves = if config.make_curves {
        report(tx, 0.65, table_index, worker_id, Stage::Curves)?;
        let curves = build_curves(&sorted, &conversion);
        summary.curves = Some(curves.len());
        Some(curves)
    } else {
        None
    };

    report(tx, 0.8, table_index, worker_id, Stage::Writing)?;
    if let Some(grid) = &grid {
        writer.write_grid(grid)?;
    }
    if let Some(curves) = &curves {
        writer.write_curves(curves)?;
    }
    writer.write_summary(&summary)?;

    report(tx, 1.0, table_index, worker_id, Stage::Done)?;
    Ok(TableProducts {
        summary,
        grid,
        curves,
    })
}

/// Process every table in the config, one after another.
pub fn process(
    config: Config,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
) -> Result<(), ProcessorError> {
    let all_tables = (0..config.table_paths.len()).collect();
    process_subset(config, tx, worker_id, all_tables)
}

/// Process a subset of tables (by index into `table_paths`)
pub fn process_subset(
    config: Config,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
    subset: Vec<usize>,
) -> Result<(), ProcessorError> {
    for table_index in subset {
        log::info!("Processing table {}...", table_index);
        process_table(&config, table_index, &tx, &worker_id)?;
        log::info!("Finished processing table {}.", table_index);
    }
    Ok(())
}

/// Divide the tables in to a set of subsets (per thread/worker)
pub fn create_subsets(config: &Config) -> Vec<Vec<usize>> {
    let mut subsets: Vec<Vec<usize>> = vec![Vec::new(); config.n_threads.max(1) as usize];
    let n_subsets = subsets.len();

    for idx in 0..config.table_paths.len() {
        subsets[idx % n_subsets].push(idx)
    }

    subsets
}
