//! This module is in charge of outputting the filtered event tables to disk,
//! and a summary of the run to the standard output

use crate::{
    config::Configuration, cuttable::BoundPair, numeric::Float, pipeline::FilteredCollection,
    Result,
};

use eyre::WrapErr;
use serde::Serialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use std::{
    fmt::Display,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};

/// Contents of the analysed data file
#[derive(Serialize)]
struct AnalysedData<'a> {
    run: u32,
    max_events: i64,
    target: String,
    missing_mass_window: [Float; 2],
    created: String,
    tables: Vec<Table<'a>>,
}

/// One table of the analysed data file
///
/// NaN fields are written as `null`, as JSON has no representation for them.
///
#[derive(Serialize)]
struct Table<'a> {
    name: &'static str,
    columns: &'a [String],
    rows: &'a [Vec<Float>],
}

/// Write the filtered events to disk and print a summary on stdout
///
/// Returns the path of the analysed data file.
///
pub fn dump_results(
    cfg: &Configuration,
    mm_window: BoundPair,
    collections: &[FilteredCollection<'_>],
    elapsed_time: Duration,
) -> Result<PathBuf> {
    fs::create_dir_all(&cfg.output_dir).wrap_err_with(|| {
        format!("Failed to create output directory {}", cfg.output_dir.display())
    })?;

    // Compute a timestamp of when the run ended
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .wrap_err("Failed to format the current time")?;

    // Write all the tables into a single file
    let data_path = cfg.output_path();
    {
        let data = AnalysedData {
            run: cfg.run,
            max_events: cfg.max_events,
            target: cfg.target.to_string(),
            missing_mass_window: [mm_window.low, mm_window.high],
            created: timestamp,
            tables: collections
                .iter()
                .map(|collection| Table {
                    name: collection.name(),
                    columns: collection.header,
                    rows: &collection.rows,
                })
                .collect(),
        };
        let file = File::create(&data_path)
            .wrap_err_with(|| format!("Failed to create {}", data_path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &data)
            .wrap_err_with(|| format!("Failed to write {}", data_path.display()))?;
        writer.flush()?;
    }
    log::info!("Analysed data written to {}", data_path.display());

    // CSV files are large and slow to write, so they are only produced on demand
    if cfg.csv {
        for collection in collections {
            let csv_path = cfg
                .output_dir
                .join(format!("{}_{}.csv", collection.name(), cfg.run));
            write_csv(&csv_path, collection)
                .wrap_err_with(|| format!("Failed to write {}", csv_path.display()))?;
        }
    }

    // Print out the summary
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln_kv(&mut out, "Run number", cfg.run)?;
    if cfg.target.is_fallback() {
        writeln_kv(&mut out, "Target", format!("{} (unrecognized)", cfg.target))?;
    } else {
        writeln_kv(&mut out, "Target", &cfg.target)?;
    }
    writeln_kv(
        &mut out,
        "MM window (GeV)",
        format!("{} < MMpi < {}", mm_window.low, mm_window.high),
    )?;
    writeln!(out, " ---------------------------------------------")?;
    for collection in collections {
        if collection.is_empty() {
            log::warn!("No event passed the selection of {}", collection.name());
        }
        writeln_kv(&mut out, collection.name(), collection.len())?;
    }
    writeln!(out, " ---------------------------------------------")?;
    writeln_kv(&mut out, "Elapsed time (s)", elapsed_time.as_secs_f64())?;
    writeln_kv(&mut out, "Output file", data_path.display())?;

    Ok(data_path)
}

/// Write one category as a CSV file with a header row
fn write_csv(path: &Path, collection: &FilteredCollection<'_>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(collection.header)?;
    for row in &collection.rows {
        writer.write_record(row.iter().map(|value| value.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Key-value output that uses fixed-size columns for better readability
fn writeln_kv(out: &mut impl Write, key: &str, value: impl Display) -> io::Result<()> {
    writeln!(out, " {:<31}: {}", key, value)
}
