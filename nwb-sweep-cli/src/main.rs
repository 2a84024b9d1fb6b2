//! NWB Sweep Reader CLI Application
//!
//! This is the command-line interface for the NWB sweep reader.
//! It uses the nwb-sweep-reader library and adds:
//! - Sweep listing and attribute dumps
//! - Sweep extraction to JSON
//! - Batch reports over many files (TXT/JSON)

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use nwb_sweep_reader::store::Storage;
use nwb_sweep_reader::{ReaderFactory, SweepReader};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod config;
mod report;

/// NWB Sweep Reader - Extract electrophysiology sweeps from NWB files
#[derive(Parser, Debug)]
#[command(name = "nwb-sweep-cli")]
#[command(about = "Extract electrophysiology sweeps from NWB files", long_about = None)]
#[command(version)]
#[command(group(ArgGroup::new("extract").args(["attrs", "sweep", "all"]).multiple(false)))]
struct Args {
    /// Path to the NWB file to read
    #[arg(short, long, value_name = "FILE")]
    nwb: Option<PathBuf>,

    /// List sweep names with their numbers and stimulus codes
    #[arg(long)]
    list: bool,

    /// Dump the attributes of one sweep entry as JSON (excludes --sweep and --all)
    #[arg(long, value_name = "NAME")]
    attrs: Option<String>,

    /// Sweep number to extract (can be repeated)
    #[arg(short, long, value_name = "N")]
    sweep: Vec<u64>,

    /// Summarize every sweep in the file
    #[arg(long)]
    all: bool,

    /// Output file for extracted data (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to configuration file (config.toml) - for batch processing
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

/// One extracted sweep as written by `--sweep`
#[derive(Serialize)]
struct ExtractedSweep {
    sweep_number: u64,
    #[serde(flatten)]
    data: nwb_sweep_reader::NormalizedSweep,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("NWB Sweep Reader CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using reader library v{}", nwb_sweep_reader::VERSION);

    if let Some(nwb_path) = &args.nwb {
        simple_mode(nwb_path, &args)?;
    } else if let Some(config_path) = &args.config {
        batch_mode(config_path)?;
    } else {
        // No arguments - show help
        println!("NWB Sweep Reader - No input specified");
        println!("\nQuick Start:");
        println!("  nwb-sweep-cli --nwb cell.nwb --list");
        println!("  nwb-sweep-cli --nwb cell.nwb --sweep 5 --output sweep_5.json");
        println!("\nFor batch processing:");
        println!("  nwb-sweep-cli --config config.toml");
        println!("\nUse --help for more options");
    }

    Ok(())
}

#[cfg(feature = "hdf5")]
fn open_storage() -> Result<Arc<dyn Storage>> {
    Ok(Arc::new(nwb_sweep_reader::store::Hdf5Storage))
}

#[cfg(not(feature = "hdf5"))]
fn open_storage() -> Result<Arc<dyn Storage>> {
    anyhow::bail!("This build cannot read NWB files; rebuild with `--features hdf5`")
}

/// Simple mode - read one file and print or write what was asked for
fn simple_mode(nwb_path: &Path, args: &Args) -> Result<()> {
    let factory = ReaderFactory::new(open_storage()?);
    let reader = factory
        .create(nwb_path)
        .with_context(|| format!("Failed to open {:?}", nwb_path))?;

    if args.list {
        println!("{} file, pipeline version {}", reader.dialect(), reader.pipeline_version());
        for name in reader.list_sweep_names()? {
            let number = reader.get_sweep_number(&name)?;
            let code = reader.get_stim_code(&name)?;
            println!("{:>6}  {:<20} {}", number, name, code);
        }
    }

    if let Some(name) = &args.attrs {
        let attrs = reader.sweep_attributes(name)?;
        emit(&serde_json::to_string_pretty(&attrs)?, args.output.as_deref())?;
    }

    if !args.sweep.is_empty() {
        let sweeps = args
            .sweep
            .iter()
            .map(|&number| {
                let data = reader.get_sweep_data(number)?;
                log::debug!("Sweep {}: {} samples", number, data.len());
                Ok(ExtractedSweep {
                    sweep_number: number,
                    data,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        emit(&serde_json::to_string(&sweeps)?, args.output.as_deref())?;
    }

    if args.all || (!args.list && args.attrs.is_none() && args.sweep.is_empty()) {
        let report = report::build_report(&reader)?;
        emit(&report::render_json(&report)?, args.output.as_deref())?;
    }

    Ok(())
}

/// Write to `output`, or stdout when no file was given
fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;
            log::info!("Wrote {:?}", path);
        }
        None => println!("{}", content),
    }
    Ok(())
}

/// Batch mode - one report per configured file, files processed in parallel
fn batch_mode(config_path: &Path) -> Result<()> {
    log::info!("Loading configuration from: {:?}", config_path);
    let config = config::load_config(config_path)?;
    log::debug!("Configuration loaded successfully");

    let factory = ReaderFactory::new(open_storage()?).with_config(config.reader.clone());
    let output_dir = config.output.output_dir();

    let results: Vec<(PathBuf, Result<PathBuf>)> = config
        .input
        .files
        .par_iter()
        .map(|file| {
            let result = factory
                .create(file)
                .map_err(anyhow::Error::from)
                .and_then(|reader| report::build_report(&reader))
                .and_then(|report| report::write_report(&report, config.output.format, &output_dir));
            (file.clone(), result)
        })
        .collect();

    let mut failed = 0;
    for (file, result) in &results {
        match result {
            Ok(path) => println!("✓ {:?} -> {:?}", file, path),
            Err(e) => {
                failed += 1;
                eprintln!("✗ {:?}: {:#}", file, e);
            }
        }
    }

    println!("\n{} of {} files processed", results.len() - failed, results.len());
    if failed > 0 {
        anyhow::bail!("{} files failed", failed);
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_one_document_per_invocation() {
        let args = Args::try_parse_from(["nwb-sweep-cli", "--nwb", "a.nwb", "-s", "1", "-s", "2"]).unwrap();
        assert_eq!(args.sweep, vec![1, 2]);

        let args = Args::try_parse_from(["nwb-sweep-cli", "--nwb", "a.nwb", "--list", "--attrs", "Sweep_1"]).unwrap();
        assert!(args.list);

        for conflicting in [
            vec!["nwb-sweep-cli", "--nwb", "a.nwb", "--attrs", "Sweep_1", "--sweep", "1", "-o", "out.json"],
            vec!["nwb-sweep-cli", "--nwb", "a.nwb", "--sweep", "1", "--all"],
            vec!["nwb-sweep-cli", "--nwb", "a.nwb", "--attrs", "Sweep_1", "--all"],
        ] {
            let err = Args::try_parse_from(conflicting).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
        }
    }
}
