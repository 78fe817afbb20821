//! Mechanism for loading and sharing the analysis configuration

use crate::{target::Target, Result};

use clap::Parser;
use eyre::ensure;

use std::path::{Path, PathBuf};

/// Command line of the analysis
#[derive(Debug, Parser)]
#[command(name = "pionlt_analysis", version)]
#[command(about = "Select coincidence pion events of a replayed run and sort them by RF timing")]
struct Cli {
    /// Prefix of the replay file name
    rootfile_prefix: String,

    /// Run number
    run_number: u32,

    /// Number of events of the replay, -1 for all of them
    #[arg(allow_negative_numbers = true)]
    max_events: i64,

    /// Target type (LH2, LD2 or Dummy10cm), which sets the missing mass window
    target: String,

    /// Base directory of the analysis inputs and outputs
    #[arg(long, env = "UTILPATH", default_value = ".")]
    util_path: PathBuf,

    /// Replay CSV export [default: UTILPATH/ROOTfiles/Analysis/PionLT/PREFIX_RUN_MAXEVENTS.csv]
    #[arg(long)]
    input: Option<PathBuf>,

    /// Cut-definition file [default: UTILPATH/DB/CUTS/run_type/coin_prod.cuts]
    #[arg(long)]
    cuts: Option<PathBuf>,

    /// Run-dependent cut bounds [default: UTILPATH/DB/CUTS/coin_prod_bounds.csv]
    #[arg(long)]
    bounds: Option<PathBuf>,

    /// Output directory [default: UTILPATH/OUTPUT/Analysis/PionLT]
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Also write one CSV file per event category
    #[arg(long)]
    csv: bool,
}

/// Analysis configuration
#[derive(Debug)]
pub struct Configuration {
    /// Prefix of the replay file name
    pub rootfile_prefix: String,

    /// Run number
    pub run: u32,

    /// Number of events of the replay (-1 means all)
    pub max_events: i64,

    /// Target material
    pub target: Target,

    /// Replay CSV export
    pub input: PathBuf,

    /// Cut-definition file
    pub cuts_file: PathBuf,

    /// Run-dependent cut bounds
    pub bounds_file: PathBuf,

    /// Where the analysed data goes
    pub output_dir: PathBuf,

    /// Whether one CSV file per category should be written
    pub csv: bool,
}
//
impl Configuration {
    /// Load the configuration from the command line, check it, and print it out
    pub fn load() -> Result<Self> {
        let config = Self::from_cli(Cli::parse())?;
        config.check_files()?;
        config.print();
        Ok(config)
    }

    /// Resolve the command line into a configuration
    fn from_cli(cli: Cli) -> Result<Self> {
        ensure!(
            cli.max_events == -1 || cli.max_events > 0,
            "MaxEvents must be -1 (all events) or a positive number, got {}",
            cli.max_events
        );

        let util = cli.util_path;
        let input = cli.input.unwrap_or_else(|| {
            util.join("ROOTfiles/Analysis/PionLT").join(format!(
                "{}_{}_{}.csv",
                cli.rootfile_prefix, cli.run_number, cli.max_events
            ))
        });
        let cuts_file = cli
            .cuts
            .unwrap_or_else(|| util.join("DB/CUTS/run_type/coin_prod.cuts"));
        let bounds_file = cli
            .bounds
            .unwrap_or_else(|| util.join("DB/CUTS/coin_prod_bounds.csv"));
        let output_dir = cli
            .output_dir
            .unwrap_or_else(|| util.join("OUTPUT/Analysis/PionLT"));

        Ok(Configuration {
            rootfile_prefix: cli.rootfile_prefix,
            run: cli.run_number,
            max_events: cli.max_events,
            target: Target::parse(&cli.target),
            input,
            cuts_file,
            bounds_file,
            output_dir,
            csv: cli.csv,
        })
    }

    /// Make sure that every input file is present before doing any work
    fn check_files(&self) -> Result<()> {
        let check = |what: &str, path: &Path| -> Result<()> {
            ensure!(path.is_file(), "{} {} does not exist", what, path.display());
            Ok(())
        };
        check("Replay file", &self.input)?;
        check("Cut-definition file", &self.cuts_file)?;
        check("Cut bounds file", &self.bounds_file)?;
        Ok(())
    }

    /// Maximal number of events to be read, if limited
    pub fn event_limit(&self) -> Option<usize> {
        usize::try_from(self.max_events).ok()
    }

    /// Path of the analysed data file
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}_Analysed_Data.json",
            self.run, self.max_events
        ))
    }

    /// Display the configuration
    pub fn print(&self) {
        println!("ROOTfilePrefix : {}", self.rootfile_prefix);
        println!("RunNumber      : {}", self.run);
        println!("MaxEvents      : {}", self.max_events);
        println!("Target         : {}", self.target);
        println!("Input          : {}", self.input.display());
        println!("Cuts           : {}", self.cuts_file.display());
        println!("Bounds         : {}", self.bounds_file.display());
        println!("OutputDir      : {}", self.output_dir.display());
        println!("CSV output     : {}", self.csv);
    }
}
