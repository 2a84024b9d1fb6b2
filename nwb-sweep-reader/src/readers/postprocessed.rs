//! Reader for NWB 1 files written by the processing pipeline
//!
//! The pipeline already split each sweep into the full `Sweep_<n>` epoch and
//! an optional `Experiment_<n>` epoch that excludes the initial test pulse and
//! any trailing samples recorded after the stimulus was aborted. Samples are
//! returned in mV and pA.

use super::base::{read_conversion, read_pipeline_version, read_stim_code, scale, BaseReader, V1_ACQUISITION_PATH};
use super::{sweep_number_token, ReadResult, SweepReader};
use crate::store::{Container, Storage};
use crate::types::{Dialect, NormalizedSweep, Result, StimulusUnit, SweepError};
use std::path::Path;
use std::sync::Arc;

const EPOCHS_PATH: &str = "/epochs";
const STIM_CODE_DATASET: &str = "aibs_stimulus_description";

/// Scale from SI volts to millivolts
const VOLTS_TO_MILLIVOLTS: f64 = 1e3;
/// Scale from SI amps to picoamps
const AMPS_TO_PICOAMPS: f64 = 1e12;

/// Reader for pipeline-processed NWB 1 files
#[derive(Debug, Clone)]
pub struct PostProcessedReader {
    base: BaseReader,
}

/// Inclusive index range of an epoch from its `idx_start` and `count`
fn epoch_range(file: &dyn Container, epoch: &str, sweep_number: u64) -> Result<(i64, i64)> {
    let start = file.read_i64(&format!("{}/stimulus/idx_start", epoch))?;
    let count = file.read_i64(&format!("{}/stimulus/count", epoch))?;
    if count < 1 {
        return Err(SweepError::InvalidSweepRange {
            sweep: sweep_number,
            reason: format!("{} has {} samples", epoch, count),
        });
    }
    let end = start
        .checked_add(count - 1)
        .ok_or_else(|| SweepError::InvalidSweepRange {
            sweep: sweep_number,
            reason: format!("{} ends past the last addressable sample", epoch),
        })?;
    Ok((start, end))
}

impl PostProcessedReader {
    pub fn new(path: &Path, storage: Arc<dyn Storage>) -> Self {
        Self {
            base: BaseReader::new(path, storage, V1_ACQUISITION_PATH),
        }
    }

    fn read_sweep(file: &dyn Container, sweep_number: u64) -> Result<NormalizedSweep> {
        let sweep = format!("{}/Sweep_{}", EPOCHS_PATH, sweep_number);
        if !file.is_group(&sweep) {
            return Err(SweepError::SweepNotFound(sweep_number));
        }

        let stimulus_data = format!("{}/stimulus/timeseries/data", sweep);
        let response_data = format!("{}/response/timeseries/data", sweep);

        let mut stimulus = file.read_f64s(&stimulus_data)?;
        let mut response = file.read_f64s(&response_data)?;

        let version = read_pipeline_version(file).unwrap_or_default();
        if version.applies_conversion() {
            stimulus = scale(stimulus, read_conversion(file, &stimulus_data)?);
            response = scale(response, read_conversion(file, &response_data)?);
        } else {
            log::debug!(
                "Pipeline version {} stored converted values, ignoring conversion factors",
                version
            );
        }

        let unit = match file.attr(&stimulus_data, "unit")? {
            Some(code) => StimulusUnit::from_unit_code(sweep_number, code.as_text().unwrap_or_default())?,
            None => StimulusUnit::Unknown,
        };

        let (response_scale, stimulus_scale) = match unit {
            StimulusUnit::Amps => (VOLTS_TO_MILLIVOLTS, AMPS_TO_PICOAMPS),
            StimulusUnit::Volts => (AMPS_TO_PICOAMPS, VOLTS_TO_MILLIVOLTS),
            StimulusUnit::Unknown => return Err(SweepError::UnknownStimulusUnit(sweep_number)),
        };
        let response = scale(response, response_scale);
        let stimulus = scale(stimulus, stimulus_scale);

        let sweep_range = epoch_range(file, &sweep, sweep_number)?;
        if sweep_range.0 != 0 {
            return Err(SweepError::InvalidSweepRange {
                sweep: sweep_number,
                reason: format!("full sweep starts at {} instead of 0", sweep_range.0),
            });
        }

        let experiment = format!("{}/Experiment_{}", EPOCHS_PATH, sweep_number);
        let (start, end) = if file.is_group(&experiment) {
            epoch_range(file, &experiment, sweep_number)?
        } else {
            log::debug!("Sweep {} has no experiment epoch, using the full sweep", sweep_number);
            sweep_range
        };
        let index_range = match (usize::try_from(start), usize::try_from(end)) {
            (Ok(start), Ok(end)) => (start, end),
            _ => {
                return Err(SweepError::InvalidSweepRange {
                    sweep: sweep_number,
                    reason: format!("negative index range ({}, {})", start, end),
                })
            }
        };

        let rate = file.attr_f64(&format!("{}/stimulus/timeseries/starting_time", sweep), "rate")?;

        NormalizedSweep::new(sweep_number, stimulus, response, unit, index_range, rate)
    }
}

impl SweepReader for PostProcessedReader {
    fn base(&self) -> &BaseReader {
        &self.base
    }

    fn dialect(&self) -> Dialect {
        Dialect::PostProcessed
    }

    fn get_sweep_data(&self, sweep_number: u64) -> ReadResult<NormalizedSweep> {
        log::debug!("Reading pipeline sweep {} from {:?}", sweep_number, self.base.path());
        self.base.with_file(|file| Self::read_sweep(file, sweep_number))
    }

    fn get_sweep_number(&self, sweep_name: &str) -> ReadResult<u64> {
        sweep_number_token(sweep_name, None).map_err(|e| e.in_file(self.base.path()))
    }

    fn get_stim_code(&self, sweep_name: &str) -> ReadResult<String> {
        self.base
            .with_file(|file| read_stim_code(file, &self.base.sweep_path(sweep_name), STIM_CODE_DATASET))
    }
}
