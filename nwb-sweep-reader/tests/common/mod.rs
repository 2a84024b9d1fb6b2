//! Synthetic NWB files for each dialect
#![allow(dead_code)]

use nwb_sweep_reader::store::{MemoryFile, MemoryStorage};
use nwb_sweep_reader::{NwbReader, ReaderFactory};
use std::path::Path;
use std::sync::Arc;

pub const FILE: &str = "cell.nwb";

pub fn open(file: MemoryFile) -> (NwbReader, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new().with_file(FILE, file));
    let reader = ReaderFactory::new(storage.clone())
        .create(Path::new(FILE))
        .expect("fixture should select a reader");
    (reader, storage)
}

pub fn ramp(len: usize) -> Vec<f64> {
    (0..len).map(|i| i as f64).collect()
}

/// Empty NWB 2 file converted from the given acquisition software
pub fn converted_file(description: &str) -> MemoryFile {
    MemoryFile::new()
        .attr("/", "nwb_version", "2.1.0")
        .dataset("/general/experiment_description", description)
        .group("/acquisition")
        .group("/stimulus/presentation")
}

/// Add one series to a converted file
pub struct Series<'a> {
    pub group: &'a str,
    pub name: &'a str,
    pub sweep: i64,
    pub kind: &'a str,
    pub channel: Option<i64>,
    pub samples: Vec<f64>,
    pub conversion: f64,
    pub unit: &'a str,
    pub rate: f64,
}

impl<'a> Series<'a> {
    pub fn response(name: &'a str, sweep: i64, samples: Vec<f64>) -> Self {
        Self {
            group: "/acquisition",
            name,
            sweep,
            kind: "CurrentClampSeries",
            channel: Some(1),
            samples,
            conversion: 1.0,
            unit: "Volts",
            rate: 20000.0,
        }
    }

    pub fn stimulus(name: &'a str, sweep: i64, samples: Vec<f64>) -> Self {
        Self {
            group: "/stimulus/presentation",
            kind: "CurrentClampStimulusSeries",
            unit: "Amps",
            ..Self::response(name, sweep, samples)
        }
    }

    pub fn channel(mut self, channel: Option<i64>) -> Self {
        self.channel = channel;
        self
    }

    pub fn conversion(mut self, conversion: f64) -> Self {
        self.conversion = conversion;
        self
    }

    pub fn add_to(self, file: MemoryFile) -> MemoryFile {
        let path = format!("{}/{}", self.group, self.name);
        let data = format!("{}/data", path);
        let starting_time = format!("{}/starting_time", path);

        let mut file = file
            .attr(&path, "sweep_number", self.sweep)
            .attr(&path, "neurodata_type", self.kind)
            .attr(&path, "stimulus_description", "LongSquare_DA_0")
            .dataset(&data, self.samples)
            .attr(&data, "conversion", self.conversion)
            .attr(&data, "unit", self.unit)
            .dataset(&starting_time, 0.0)
            .attr(&starting_time, "rate", self.rate)
            .dataset(&format!("{}/electrode", path), "/general/intracellular_ephys/electrode_0");

        if let Some(channel) = self.channel {
            let description = format!(r#"{{"number": {}, "name": "IN {}"}}"#, channel, channel);
            file = file.attr(&path, "description", description.as_str());
        }
        file
    }
}

/// Clampex file with one response/stimulus pair per sweep number
pub fn clampex_file(sweeps: &[i64], samples: usize) -> MemoryFile {
    let mut file = converted_file("Clampex 10.7.0.3");
    for &sweep in sweeps {
        let response = format!("index_{:03}", sweep * 2);
        let stimulus = format!("index_{:03}", sweep * 2 + 1);
        file = Series::response(&response, sweep, ramp(samples)).add_to(file);
        file = Series::stimulus(&stimulus, sweep, vec![0.5; samples]).add_to(file);
    }
    file
}

/// Pipeline-processed NWB 1 file with `Sweep_<n>` entries
pub struct PipelineSweep {
    pub number: u64,
    pub stimulus: Vec<f64>,
    pub response: Vec<f64>,
    pub unit: Option<&'static str>,
    pub conversion: f64,
    pub experiment: Option<(i64, i64)>,
    pub rate: f64,
}

impl PipelineSweep {
    pub fn new(number: u64, len: usize) -> Self {
        Self {
            number,
            stimulus: vec![2.0; len],
            response: vec![-0.07; len],
            unit: Some("Amps"),
            conversion: 1.0,
            experiment: None,
            rate: 50000.0,
        }
    }

    pub fn add_to(self, file: MemoryFile) -> MemoryFile {
        let len = self.stimulus.len() as i64;
        let entry = format!("/acquisition/timeseries/Sweep_{}", self.number);
        let sweep = format!("/epochs/Sweep_{}", self.number);
        let stimulus_data = format!("{}/stimulus/timeseries/data", sweep);
        let response_data = format!("{}/response/timeseries/data", sweep);
        let starting_time = format!("{}/stimulus/timeseries/starting_time", sweep);

        let mut file = file
            .attr(&entry, "ancestry", vec!["TimeSeries", "PatchClampSeries", "CurrentClampSeries"])
            .dataset(&format!("{}/aibs_stimulus_description", entry), "C1LSCOARSE150216_DA_0")
            .dataset(&format!("{}/data", entry), self.response.clone())
            .dataset(&stimulus_data, self.stimulus)
            .attr(&stimulus_data, "conversion", self.conversion)
            .dataset(&response_data, self.response)
            .attr(&response_data, "conversion", self.conversion)
            .dataset(&format!("{}/stimulus/idx_start", sweep), 0i64)
            .dataset(&format!("{}/stimulus/count", sweep), len)
            .dataset(&starting_time, 0.0)
            .attr(&starting_time, "rate", self.rate);

        if let Some(unit) = self.unit {
            file = file.attr(&stimulus_data, "unit", unit);
        }
        if let Some((start, count)) = self.experiment {
            let experiment = format!("/epochs/Experiment_{}", self.number);
            file = file
                .dataset(&format!("{}/stimulus/idx_start", experiment), start)
                .dataset(&format!("{}/stimulus/count", experiment), count);
        }
        file
    }
}

pub fn pipeline_file(version: Option<&str>) -> MemoryFile {
    let file = MemoryFile::new().dataset("/nwb_version", "NWB-1.0.5");
    match version {
        Some(version) => file.dataset(
            "/general/generated_by",
            vec!["program", "ephys_pipeline", "version", version],
        ),
        None => file,
    }
}

/// Raw acquisition NWB 1 file with `data_<n>_AD0` entries
pub struct RawSweep {
    pub number: u64,
    pub ancestry: Vec<&'static str>,
    pub stimulus: Vec<f64>,
    pub response: Vec<f64>,
    pub unit: Option<&'static str>,
    pub rate: f64,
}

impl RawSweep {
    pub fn current_clamp(number: u64, stimulus: Vec<f64>, response: Vec<f64>) -> Self {
        Self {
            number,
            ancestry: vec!["TimeSeries", "PatchClampSeries", "CurrentClampSeries"],
            stimulus,
            response,
            unit: Some("Amps"),
            rate: 1000.0,
        }
    }

    pub fn voltage_clamp(number: u64, stimulus: Vec<f64>, response: Vec<f64>) -> Self {
        Self {
            ancestry: vec!["TimeSeries", "PatchClampSeries", "VoltageClampSeries"],
            unit: Some("Volts"),
            ..Self::current_clamp(number, stimulus, response)
        }
    }

    pub fn add_to(self, file: MemoryFile) -> MemoryFile {
        let response = format!("/acquisition/timeseries/data_{:05}_AD0", self.number);
        let stimulus_data = format!("/stimulus/presentation/data_{:05}_DA0/data", self.number);
        let starting_time = format!("{}/starting_time", response);

        let mut file = file
            .attr(&response, "ancestry", self.ancestry)
            .dataset(&format!("{}/stimulus_description", response), "EXTPSMOKET180424_DA_0")
            .dataset(&format!("{}/data", response), self.response)
            .dataset(&starting_time, 0.0)
            .attr(&starting_time, "rate", self.rate)
            .dataset(&stimulus_data, self.stimulus);

        if let Some(unit) = self.unit {
            file = file.attr(&stimulus_data, "unit", unit);
        }
        file
    }
}

pub fn raw_file() -> MemoryFile {
    MemoryFile::new().dataset("/nwb_version", "NWB-1.0.5")
}

/// Square pulse of `amplitude` over `[from, to)`
pub fn step(len: usize, from: usize, to: usize, amplitude: f64) -> Vec<f64> {
    (0..len)
        .map(|i| if i >= from && i < to { amplitude } else { 0.0 })
        .collect()
}

pub fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        let tolerance = 1e-9 * e.abs().max(1.0);
        assert!((a - e).abs() <= tolerance, "{} != {}", a, e);
    }
}
