//! Reader for NWB 1 files written directly by the acquisition software
//!
//! Responses live under `/acquisition/timeseries/data_<n>_AD0` and stimuli
//! under `/stimulus/presentation/data_<n>_DA0`. Samples are already in their
//! final units. The valid range is derived from waveform shape through an
//! [`EpochDetector`].

use super::base::{read_stim_code, BaseReader, V1_ACQUISITION_PATH};
use super::{sweep_number_token, ReadResult, SweepReader};
use crate::config::ReaderConfig;
use crate::epochs::{EpochDetector, StimulusEpochDetector};
use crate::store::{AttrValue, Container, Storage};
use crate::types::{Dialect, NormalizedSweep, Result, StimulusUnit, SweepError};
use std::path::Path;
use std::sync::Arc;

const STIMULUS_PATH: &str = "/stimulus/presentation";
const STIM_CODE_DATASET: &str = "stimulus_description";

/// Recording mode named in a series' ancestry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClampMode {
    CurrentClamp,
    VoltageClamp,
}

fn ancestry_contains(ancestry: &AttrValue, kind: &str) -> bool {
    match ancestry {
        AttrValue::Text(text) => text.contains(kind),
        AttrValue::TextArray(entries) => entries.iter().any(|entry| entry == kind),
        _ => false,
    }
}

fn clamp_mode(ancestry: Option<&AttrValue>) -> Option<ClampMode> {
    let ancestry = ancestry?;
    if ancestry_contains(ancestry, "CurrentClampSeries") {
        Some(ClampMode::CurrentClamp)
    } else if ancestry_contains(ancestry, "VoltageClampSeries") {
        Some(ClampMode::VoltageClamp)
    } else {
        None
    }
}

/// Reader for raw acquisition NWB 1 files
#[derive(Clone)]
pub struct RawAcquisitionReader {
    base: BaseReader,
    detector: Arc<dyn EpochDetector>,
}

impl std::fmt::Debug for RawAcquisitionReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawAcquisitionReader")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl RawAcquisitionReader {
    pub fn new(path: &Path, storage: Arc<dyn Storage>, config: &ReaderConfig) -> Self {
        Self::with_detector(path, storage, Arc::new(StimulusEpochDetector::new(config)))
    }

    /// Use a custom epoch detector
    pub fn with_detector(path: &Path, storage: Arc<dyn Storage>, detector: Arc<dyn EpochDetector>) -> Self {
        Self {
            base: BaseReader::new(path, storage, V1_ACQUISITION_PATH),
            detector,
        }
    }

    fn read_sweep(&self, file: &dyn Container, sweep_number: u64) -> Result<NormalizedSweep> {
        let response_series = format!("{}/data_{:05}_AD0", V1_ACQUISITION_PATH, sweep_number);
        let stimulus_series = format!("{}/data_{:05}_DA0", STIMULUS_PATH, sweep_number);

        if !file.is_group(&response_series) {
            return Err(SweepError::SweepNotFound(sweep_number));
        }

        let response = file.read_f64s(&format!("{}/data", response_series))?;
        let rate = file.attr_f64(&format!("{}/starting_time", response_series), "rate")?;

        let stimulus_data = format!("{}/data", stimulus_series);
        let stimulus = file.read_f64s(&stimulus_data)?;

        let unit = match file.attr(&stimulus_data, "unit")? {
            Some(code) => StimulusUnit::from_unit_code(sweep_number, code.as_text().unwrap_or_default())?,
            None => StimulusUnit::Unknown,
        };

        let ancestry = file.attr(&response_series, "ancestry")?;
        let epoch = match clamp_mode(ancestry.as_ref()) {
            Some(ClampMode::CurrentClamp) => {
                log::debug!("Sweep {}: current clamp, detecting experiment epoch", sweep_number);
                self.detector.experiment_epoch(&stimulus, &response, rate)
            }
            Some(ClampMode::VoltageClamp) => {
                log::debug!("Sweep {}: voltage clamp, detecting sweep epoch", sweep_number);
                self.detector.sweep_epoch(&response)
            }
            None => return Err(SweepError::UnknownClampMode(sweep_number)),
        };
        let index_range = epoch.map_err(|reason| SweepError::EpochDetection {
            sweep: sweep_number,
            reason,
        })?;

        NormalizedSweep::new(sweep_number, stimulus, response, unit, index_range, rate)
    }
}

impl SweepReader for RawAcquisitionReader {
    fn base(&self) -> &BaseReader {
        &self.base
    }

    fn dialect(&self) -> Dialect {
        Dialect::RawAcquisition
    }

    fn get_sweep_data(&self, sweep_number: u64) -> ReadResult<NormalizedSweep> {
        log::debug!("Reading raw sweep {} from {:?}", sweep_number, self.base.path());
        self.base.with_file(|file| self.read_sweep(file, sweep_number))
    }

    fn get_sweep_number(&self, sweep_name: &str) -> ReadResult<u64> {
        sweep_number_token(sweep_name, Some(1)).map_err(|e| e.in_file(self.base.path()))
    }

    fn get_stim_code(&self, sweep_name: &str) -> ReadResult<String> {
        self.base
            .with_file(|file| read_stim_code(file, &self.base.sweep_path(sweep_name), STIM_CODE_DATASET))
    }
}
