//! PionLT analysis: selection of coincidence pion events
//!
//!
//! # Introduction (for the physicist)
//!
//! This program reads the events of a replayed coincidence run, in which the
//! HMS detects the scattered electron and the SHMS detects the produced pion,
//! and selects candidate pion electroproduction events using the cuts of the
//! production run type.
//!
//! The selected events are sorted by RF timing: all events, events in the
//! prompt RF window, events in the random (accidental) RF windows, and prompt
//! events whose missing mass is compatible with the target. The resulting
//! tables are written out for plotting.
//!
//!
//! # Introduction (for the computer guy)
//!
//! The work is a one-shot batch job:
//!
//! * read the command line and check that every input is present
//! * load the event columns of the run
//! * load the cut definitions and the bounds that apply to the run
//! * compile every cut at once, so that misconfigurations stop the run before
//!   anything is written
//! * build each output category independently (possibly in parallel)
//! * write the results.
//!
//! Cuts are text, decided by configuration files rather than at build time.
//! They are compiled into a small tree of comparisons instead of being executed
//! as code.

#![warn(missing_docs)]

mod config;
mod cutexpr;
mod cuttable;
mod dataset;
mod error;
mod evcut;
mod expr;
mod numeric;
mod output;
mod pipeline;
mod scheduling;
mod schema;
mod target;

use eyre::WrapErr;

use crate::{
    config::Configuration,
    cuttable::CutTable,
    dataset::EventColumns,
    evcut::CutSet,
    pipeline::{FilterPipeline, CUT_NAMES},
};

use std::time::Instant;

/// We'll use eyre's type-erased result type throughout the application
type Result<T> = eyre::Result<T>;

/// This will act as our main function, with suitable error handling
fn main() -> Result<()> {
    // Diagnostics go to stderr, at info level unless RUST_LOG says otherwise
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // ### CONFIGURATION READOUT ###

    let cfg = Configuration::load().wrap_err("Failed to load the configuration")?;

    // Start the clock after configuration I/O
    let saved_time = Instant::now();

    // ### INPUT LOADING ###

    let columns = EventColumns::load_csv(&cfg.input, cfg.event_limit())?;
    let cut_table = CutTable::load(&CUT_NAMES, &cfg.cuts_file, &cfg.bounds_file, cfg.run)
        .wrap_err_with(|| format!("Failed to load the cuts of run {}", cfg.run))?;

    // All cuts are validated here, before any event is filtered
    let cuts = CutSet::compile(&cut_table, &columns).wrap_err("Failed to compile the cuts")?;

    // ### EVENT SELECTION ###

    let mm_window = cfg.target.missing_mass_window();
    let pipeline = FilterPipeline::new(&columns, &cuts, mm_window)?;
    let collections = pipeline.run();

    // Measure how much time has elapsed
    let elapsed_time = saved_time.elapsed();

    // ### RESULTS STORAGE ###

    output::dump_results(&cfg, mm_window, &collections, elapsed_time)
        .wrap_err("Failed to output the results")?;

    // ...and we're done
    println!("Processing Complete");
    Ok(())
}
