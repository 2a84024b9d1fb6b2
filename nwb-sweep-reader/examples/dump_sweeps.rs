//! Standalone NWB sweep dump tool
//!
//! This tool opens an NWB file, reports which dialect it was written in and
//! prints a one-line summary for every sweep it contains.
//!
//! Usage:
//!   dump_sweeps <file.nwb> [--limit <count>] [--verbose]
//!
//! Example:
//!   RUST_LOG=debug dump_sweeps Ndnf-IRES2-dgCre_Ai14-256189.05.01.nwb --limit 10

use nwb_sweep_reader::{open_reader, NormalizedSweep, SweepReader};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

struct DumpStats {
    total_sweeps: usize,
    read_sweeps: usize,
    failed_sweeps: usize,
    total_samples: usize,
    stim_codes: HashMap<String, usize>,
}

impl DumpStats {
    fn new() -> Self {
        Self {
            total_sweeps: 0,
            read_sweeps: 0,
            failed_sweeps: 0,
            total_samples: 0,
            stim_codes: HashMap::new(),
        }
    }

    fn print_summary(&self) {
        println!("\n=== SWEEP SUMMARY ===");
        println!("Sweeps listed: {}", self.total_sweeps);
        println!("Sweeps read: {}", self.read_sweeps);
        println!("Sweeps failed: {}", self.failed_sweeps);
        println!("Total samples: {}", self.total_samples);

        if !self.stim_codes.is_empty() {
            println!("\nStimulus codes:");
            let mut sorted: Vec<_> = self.stim_codes.iter().collect();
            sorted.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
            for (code, count) in sorted {
                println!("  {}: {} sweeps", code, count);
            }
        }
    }
}

fn print_sweep(name: &str, number: u64, code: &str, sweep: &NormalizedSweep, verbose: bool) {
    println!(
        "{:>4} {:<16} {:<24} {:>8} samples @ {:>8.0} Hz  valid [{}, {}]  {}",
        number,
        name,
        code,
        sweep.len(),
        sweep.sampling_rate,
        sweep.index_range.0,
        sweep.index_range.1,
        sweep.stimulus_unit
    );

    if verbose {
        let response = sweep.valid_response();
        let (min, max) = response
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        println!("       duration {:.3}s, response range [{:.3}, {:.3}]", sweep.duration(), min, max);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <file.nwb> [--limit <count>] [--verbose]", args[0]);
        std::process::exit(1);
    }

    let nwb_file = PathBuf::from(&args[1]);
    let mut limit: Option<usize> = None;
    let mut verbose = false;

    // Parse arguments
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" => {
                i += 1;
                if i < args.len() {
                    limit = Some(args[i].parse()?);
                }
            }
            "--verbose" | "-v" => {
                verbose = true;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    let reader = open_reader(&nwb_file)?;

    println!("=== NWB Sweep Dump ===");
    println!("File: {:?}", nwb_file);
    println!("Dialect: {}", reader.dialect());
    println!("Pipeline version: {}", reader.pipeline_version());
    println!();

    let names = reader.list_sweep_names()?;
    let mut stats = DumpStats::new();
    stats.total_sweeps = names.len();

    for name in names.iter().take(limit.unwrap_or(usize::MAX)) {
        let result = reader.get_sweep_number(name).and_then(|number| {
            let code = reader.get_stim_code(name)?;
            let sweep = reader.get_sweep_data(number)?;
            Ok((number, code, sweep))
        });

        match result {
            Ok((number, code, sweep)) => {
                print_sweep(name, number, &code, &sweep, verbose);
                stats.read_sweeps += 1;
                stats.total_samples += sweep.len();
                *stats.stim_codes.entry(code).or_insert(0) += 1;
            }
            Err(e) => {
                eprintln!("Error reading {}: {}", name, e);
                stats.failed_sweeps += 1;
            }
        }
    }

    if let Some(max) = limit {
        if names.len() > max {
            println!("\n... (limit of {} sweeps reached)", max);
        }
    }

    stats.print_summary();

    Ok(())
}
