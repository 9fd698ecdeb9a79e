//! # bt_sweep_cli
//!
//! Part of the bt_sweep crate family.
//!
//! Command line application which turns 2DBT measurement tables into sheet-resistance
//! grids and curves.
//!
//! ## Use
//!
//! Make a template configuration, fill it out, then run it:
//!
//! ```bash
//! bt_sweep_cli new -p config.yml
//! bt_sweep_cli -p config.yml
//! ```
use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use libbt_sweep::config::Config;
use libbt_sweep::error::{ConfigError, ProcessorError};
use libbt_sweep::process::{create_subsets, process_subset};
use libbt_sweep::worker_status::WorkerStatus;

const BAR_TEMPLATE: &str = "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {msg}";

fn make_template_config(path: &Path) -> Result<(), ConfigError> {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config)?;
    std::fs::write(path, yaml_str)?;
    Ok(())
}

/// A running worker: its thread, its tables and its progress bar
struct Worker {
    handle: JoinHandle<Result<(), ProcessorError>>,
    subset: Vec<usize>,
    bar: ProgressBar,
}

impl Worker {
    /// Overall progress of the worker, in percent of its tables
    fn update(&self, status: &WorkerStatus) {
        if let Some(position) = self.subset.iter().position(|t| *t == status.table_index) {
            let done = position as f32 + status.progress;
            self.bar
                .set_position((done / self.subset.len() as f32 * 100.0) as u64);
            self.bar
                .set_message(format!("table {} {}", status.table_index, status.stage));
        }
    }
}

fn main() {
    // Create a cli
    let matches = Command::new("bt_sweep_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .global(true)
                .help("Path to the configuration file"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        return;
    }

    // Parse the cli
    let config_path = match matches.get_one::<String>("path") {
        Some(p) => PathBuf::from(p),
        None => {
            log::error!("A configuration path is required (-p/--path)");
            return;
        }
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        match make_template_config(&config_path) {
            Ok(()) => log::info!("Done."),
            Err(e) => log::error!("{e}"),
        }
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path).and_then(|c| {
        c.validate()?;
        Ok(c)
    }) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("Tables: {}", config.table_paths.len());
    log::info!("Output Path: {}", config.output_path.to_string_lossy());
    log::info!(
        "Field: {} T to {} T in steps of {} T",
        config.min_field,
        config.max_field,
        config.field_step
    );
    log::info!(
        "Excitation current: {} A, Unit: {}Ω/□",
        config.excitation_current,
        config.unit_prefix
    );
    log::info!("Temperature order: {:?}", config.temperature_order);

    // Spawn the workers!
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    let mut workers: Vec<Worker> = Vec::new();
    for (idx, subset) in create_subsets(&config).into_iter().enumerate() {
        // Dont make empty workers
        if subset.is_empty() {
            continue;
        }
        let conf = config.clone();
        let worker_tx = tx.clone();
        let worker_subset = subset.clone();
        let bar = pb_manager.add(ProgressBar::new(100));
        bar.set_style(style.clone());
        let handle = std::thread::spawn(move || process_subset(conf, worker_tx, idx, worker_subset));
        workers.push(Worker {
            handle,
            subset,
            bar,
        });
    }
    drop(tx);

    let mut failed = false;
    while !workers.is_empty() {
        match rx.recv_timeout(Duration::from_millis(250)) {
            Ok(status) => {
                if let Some(worker) = workers
                    .iter()
                    .find(|w| w.subset.contains(&status.table_index))
                {
                    worker.update(&status);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => (),
            // Every worker dropped its sender; just wait for the threads to wrap up
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                std::thread::sleep(Duration::from_millis(50))
            }
        }

        let mut idx = 0;
        while idx < workers.len() {
            if workers[idx].handle.is_finished() {
                let worker = workers.remove(idx);
                worker.bar.finish();
                match worker.handle.join() {
                    Ok(Ok(())) => (),
                    Ok(Err(e)) => {
                        log::error!("Processing failed with error: {e}");
                        failed = true;
                    }
                    Err(_) => {
                        log::error!("Failed to join processing worker!");
                        failed = true;
                    }
                }
            } else {
                idx += 1;
            }
        }
    }

    if failed {
        log::warn!("Some tables were not processed, see the errors above.");
    } else {
        log::info!("Successfully processed all tables!");
    }
    log::info!("Done.");
}
