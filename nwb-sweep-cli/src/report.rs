//! Per-file sweep reports
//!
//! A report lists every sweep of one file with its identity and shape. Sweeps
//! that fail to read are reported individually so one bad sweep does not hide
//! the rest of the file.

use crate::config::OutputFormat;
use anyhow::{Context, Result};
use nwb_sweep_reader::{NormalizedSweep, StimulusUnit, SweepReader};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Shape and identity of one successfully read sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepSummary {
    pub name: String,
    pub sweep_number: u64,
    pub stim_code: String,
    pub samples: usize,
    pub sampling_rate: f64,
    pub duration_s: f64,
    pub stimulus_unit: StimulusUnit,
    pub index_range: (usize, usize),
}

impl SweepSummary {
    fn new(name: &str, sweep_number: u64, stim_code: String, sweep: &NormalizedSweep) -> Self {
        Self {
            name: name.to_string(),
            sweep_number,
            stim_code,
            samples: sweep.len(),
            sampling_rate: sweep.sampling_rate,
            duration_s: sweep.duration(),
            stimulus_unit: sweep.stimulus_unit,
            index_range: sweep.index_range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: PathBuf,
    pub dialect: String,
    pub pipeline_version: String,
    pub generated_at: String,
    pub sweeps: Vec<SweepSummary>,
    pub failures: Vec<SweepFailure>,
}

/// Read every sweep listed by `reader`
///
/// Only a failure to enumerate sweeps fails the whole report.
pub fn build_report<R: SweepReader + ?Sized>(reader: &R) -> Result<FileReport> {
    let names = reader
        .list_sweep_names()
        .with_context(|| format!("Failed to list sweeps of {:?}", reader.path()))?;

    let mut sweeps = Vec::new();
    let mut failures = Vec::new();

    for name in &names {
        let summary = reader.get_sweep_number(name).and_then(|number| {
            let stim_code = reader.get_stim_code(name)?;
            let sweep = reader.get_sweep_data(number)?;
            Ok(SweepSummary::new(name, number, stim_code, &sweep))
        });

        match summary {
            Ok(summary) => sweeps.push(summary),
            Err(e) => {
                log::warn!("Skipping {} in {:?}: {}", name, reader.path(), e.kind());
                failures.push(SweepFailure {
                    name: name.clone(),
                    error: e.kind().to_string(),
                });
            }
        }
    }

    log::info!(
        "{:?}: {} sweeps read, {} failed",
        reader.path(),
        sweeps.len(),
        failures.len()
    );

    Ok(FileReport {
        file: reader.path().to_path_buf(),
        dialect: reader.dialect().to_string(),
        pipeline_version: reader.pipeline_version().to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        sweeps,
        failures,
    })
}

pub fn render_json(report: &FileReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}

/// Plain text table, one line per sweep
pub fn render_txt(report: &FileReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "═══════════════════════════════════════════════");
    let _ = writeln!(out, "  Sweep Report: {}", report.file.display());
    let _ = writeln!(out, "═══════════════════════════════════════════════");
    let _ = writeln!(out, "Dialect:          {}", report.dialect);
    let _ = writeln!(out, "Pipeline version: {}", report.pipeline_version);
    let _ = writeln!(out, "Generated at:     {}", report.generated_at);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:>6}  {:<20} {:<24} {:>9} {:>10} {:>8}  {:<7} {}",
        "Sweep", "Name", "Stimulus", "Samples", "Rate (Hz)", "Dur (s)", "Unit", "Valid range"
    );
    for sweep in &report.sweeps {
        let _ = writeln!(
            out,
            "{:>6}  {:<20} {:<24} {:>9} {:>10.0} {:>8.3}  {:<7} [{}, {}]",
            sweep.sweep_number,
            sweep.name,
            sweep.stim_code,
            sweep.samples,
            sweep.sampling_rate,
            sweep.duration_s,
            sweep.stimulus_unit,
            sweep.index_range.0,
            sweep.index_range.1
        );
    }

    if !report.failures.is_empty() {
        let _ = writeln!(out, "\nFailed sweeps:");
        for failure in &report.failures {
            let _ = writeln!(out, "  {}: {}", failure.name, failure.error);
        }
    }

    let _ = writeln!(
        out,
        "\nTotal: {} sweeps, {} failed",
        report.sweeps.len() + report.failures.len(),
        report.failures.len()
    );
    out
}

/// Write `report` into `dir` as `<file stem>.<format>`, returning the path
pub fn write_report(report: &FileReport, format: OutputFormat, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

    let stem = report
        .file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    let path = dir.join(format!("{}.{}", stem, format.extension()));

    let content = match format {
        OutputFormat::Json => render_json(report)?,
        OutputFormat::Txt => render_txt(report),
    };
    fs::write(&path, content).with_context(|| format!("Failed to write report: {:?}", path))?;

    Ok(path)
}
