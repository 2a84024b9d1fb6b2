//! Reader for NWB 2 files converted from ABF (Clampex) and DAT (PatchMaster)
//!
//! Series are grouped into sweeps by their `sweep_number` attribute and
//! classified by `neurodata_type`. ABF conversions carry two channels per
//! sweep; only channel 1 holds data, channel 5 records the feedback stimulus.

use super::base::{read_converted, read_sweep_attributes, trim_stim_code, BaseReader, V2_ACQUISITION_PATH};
use super::{ReadResult, SweepReader};
use crate::store::{join, Container, Storage};
use crate::types::{Dialect, NormalizedSweep, Result, StimulusUnit, SweepError};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

const EXPERIMENT_DESCRIPTION_PATH: &str = "/general/experiment_description";
const STIMULUS_PATH: &str = "/stimulus/presentation";

const RESPONSE_CHANNEL: i64 = 1;
const FEEDBACK_CHANNEL: i64 = 5;

/// Acquisition software the file was converted from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSource {
    /// PatchMaster `.dat`
    Dat,
    /// Clampex `.abf`
    Abf,
}

impl RawSource {
    /// Identify the source from the experiment description
    pub fn from_description(description: &str) -> Result<Self> {
        if description.starts_with("PatchMaster") {
            Ok(RawSource::Dat)
        } else if description.starts_with("Clampex") {
            Ok(RawSource::Abf)
        } else {
            Err(SweepError::UnrecognizedSource(description.to_string()))
        }
    }
}

/// Role of a series within a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeriesRole {
    Response,
    Stimulus,
}

fn series_role(neurodata_type: &str) -> Option<SeriesRole> {
    match neurodata_type {
        "VoltageClampSeries" | "CurrentClampSeries" | "IZeroClampSeries" => Some(SeriesRole::Response),
        "VoltageClampStimulusSeries" | "CurrentClampStimulusSeries" => Some(SeriesRole::Stimulus),
        _ => None,
    }
}

/// Channel metadata serialized into an ABF series description
#[derive(Debug, Deserialize)]
struct ChannelDescription {
    number: i64,
}

/// Stimulus fields latched from the stimulus series
struct StimulusSeries {
    samples: Vec<f64>,
    unit: StimulusUnit,
    rate: f64,
    index_range: (usize, usize),
}

/// Reader for converted NWB 2 files
#[derive(Debug, Clone)]
pub struct ConvertedReader {
    base: BaseReader,
}

impl ConvertedReader {
    pub fn new(path: &Path, storage: Arc<dyn Storage>) -> Self {
        Self {
            base: BaseReader::new(path, storage, V2_ACQUISITION_PATH),
        }
    }

    /// Series paths recorded for `sweep_number`, acquisition first
    fn sweep_series(file: &dyn Container, sweep_number: u64) -> Result<Vec<String>> {
        let mut series = Vec::new();
        for group in [V2_ACQUISITION_PATH, STIMULUS_PATH] {
            if !file.is_group(group) {
                continue;
            }
            for name in file.members(group)? {
                let path = join(group, &name);
                if !file.is_group(&path) {
                    continue;
                }
                let number = file
                    .attr(&path, "sweep_number")?
                    .and_then(|value| value.as_i64())
                    .and_then(|n| u64::try_from(n).ok());
                if number == Some(sweep_number) {
                    series.push(path);
                }
            }
        }
        Ok(series)
    }

    fn channel_number(file: &dyn Container, series: &str) -> Result<i64> {
        let description = file
            .attr(series, "description")?
            .ok_or_else(|| SweepError::MissingEntry(format!("{}@description", series)))?;
        let text = description
            .as_text()
            .ok_or_else(|| SweepError::malformed(series, "description is not text"))?;
        let channel: ChannelDescription = serde_json::from_str(text)
            .map_err(|e| SweepError::malformed(series, format!("invalid channel description: {}", e)))?;
        Ok(channel.number)
    }

    fn read_stimulus(file: &dyn Container, series: &str, sweep_number: u64) -> Result<StimulusSeries> {
        let data_path = join(series, "data");
        let samples = read_converted(file, &data_path)?;

        let unit_code = file
            .attr(&data_path, "unit")?
            .ok_or_else(|| SweepError::MissingEntry(format!("{}@unit", data_path)))?;
        let unit = StimulusUnit::from_unit_code(sweep_number, unit_code.as_text().unwrap_or_default())?;

        let rate = file.attr_f64(&join(series, "starting_time"), "rate")?;

        let last = samples.len().checked_sub(1).ok_or_else(|| SweepError::InvalidSweepRange {
            sweep: sweep_number,
            reason: format!("stimulus series {} has no samples", series),
        })?;

        Ok(StimulusSeries {
            samples,
            unit,
            rate,
            index_range: (0, last),
        })
    }

    fn read_sweep(file: &dyn Container, sweep_number: u64) -> Result<NormalizedSweep> {
        let description = file
            .read_opt(EXPERIMENT_DESCRIPTION_PATH)?
            .and_then(|value| value.as_text().map(str::to_string))
            .unwrap_or_default();
        let source = RawSource::from_description(&description)?;

        let series = Self::sweep_series(file, sweep_number)?;
        if series.is_empty() {
            return Err(SweepError::SweepNotFound(sweep_number));
        }

        let mut response: Option<Vec<f64>> = None;
        let mut stimulus: Option<StimulusSeries> = None;

        for path in &series {
            if source == RawSource::Abf {
                match Self::channel_number(file, path)? {
                    RESPONSE_CHANNEL => {}
                    FEEDBACK_CHANNEL => {
                        log::trace!("Skipping feedback channel series {}", path);
                        continue;
                    }
                    channel => {
                        return Err(SweepError::UnexpectedChannel {
                            sweep: sweep_number,
                            series: path.clone(),
                            channel,
                        })
                    }
                }
            }

            let kind = file
                .attr(path, "neurodata_type")?
                .and_then(|value| value.as_text().map(str::to_string))
                .unwrap_or_default();

            match series_role(&kind) {
                Some(SeriesRole::Response) => {
                    if response.is_some() {
                        return Err(SweepError::DuplicateResponseSeries(sweep_number));
                    }
                    log::debug!("Sweep {}: response from {} ({})", sweep_number, path, kind);
                    response = Some(read_converted(file, &join(path, "data"))?);
                }
                Some(SeriesRole::Stimulus) => {
                    if stimulus.is_some() {
                        return Err(SweepError::DuplicateStimulusSeries(sweep_number));
                    }
                    log::debug!("Sweep {}: stimulus from {} ({})", sweep_number, path, kind);
                    stimulus = Some(Self::read_stimulus(file, path, sweep_number)?);
                }
                None => {
                    return Err(SweepError::UnexpectedSeriesType {
                        sweep: sweep_number,
                        series: path.clone(),
                        kind,
                    })
                }
            }
        }

        let stimulus = stimulus.ok_or(SweepError::MissingStimulus(sweep_number))?;
        let response = response.ok_or(SweepError::MissingResponse(sweep_number))?;

        NormalizedSweep::new(
            sweep_number,
            stimulus.samples,
            response,
            stimulus.unit,
            stimulus.index_range,
            stimulus.rate,
        )
    }
}

impl SweepReader for ConvertedReader {
    fn base(&self) -> &BaseReader {
        &self.base
    }

    fn dialect(&self) -> Dialect {
        Dialect::Converted
    }

    fn get_sweep_data(&self, sweep_number: u64) -> ReadResult<NormalizedSweep> {
        log::debug!("Reading converted sweep {} from {:?}", sweep_number, self.base.path());
        self.base.with_file(|file| Self::read_sweep(file, sweep_number))
    }

    fn get_sweep_number(&self, sweep_name: &str) -> ReadResult<u64> {
        self.base.with_file(|file| {
            let path = self.base.sweep_path(sweep_name);
            let attrs = read_sweep_attributes(file, &path)?;
            attrs
                .get("sweep_number")
                .ok_or_else(|| SweepError::MissingEntry(format!("{}@sweep_number", path)))?
                .as_i64()
                .and_then(|n| u64::try_from(n).ok())
                .ok_or_else(|| SweepError::InvalidSweepName(sweep_name.to_string()))
        })
    }

    fn get_stim_code(&self, sweep_name: &str) -> ReadResult<String> {
        self.base.with_file(|file| {
            let path = self.base.sweep_path(sweep_name);
            let attrs = read_sweep_attributes(file, &path)?;
            let code = attrs
                .get("stimulus_description")
                .ok_or_else(|| SweepError::MissingEntry(format!("{}@stimulus_description", path)))?
                .as_text()
                .ok_or_else(|| SweepError::malformed(&path, "stimulus_description is not text"))?;
            Ok(trim_stim_code(code))
        })
    }
}
