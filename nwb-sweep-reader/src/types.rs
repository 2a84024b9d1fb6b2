//! Core types for the NWB sweep reader library
//!
//! This module defines the normalized sweep record that every reader returns,
//! the version and provenance descriptors derived from a file, and the error
//! taxonomy. Nothing here holds a file handle; all values are derived fresh on
//! each call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Result type for operations running inside an open file
pub type Result<T> = std::result::Result<T, SweepError>;

/// Major NWB schema version of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NwbMajor {
    V1,
    V2,
    Unknown,
}

impl fmt::Display for NwbMajor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NwbMajor::V1 => write!(f, "1"),
            NwbMajor::V2 => write!(f, "2"),
            NwbMajor::Unknown => write!(f, "unknown"),
        }
    }
}

/// Normalized version marker of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    /// Major schema version (or unknown)
    pub major: NwbMajor,
    /// Raw marker string as stored in the file, if one could be read
    pub full: Option<String>,
}

impl VersionDescriptor {
    /// Descriptor for a file without a recognizable marker
    pub fn unknown(full: Option<String>) -> Self {
        Self {
            major: NwbMajor::Unknown,
            full,
        }
    }
}

/// Version of the processing pipeline that produced a file
///
/// Parsed from free-form provenance metadata. Missing or malformed provenance
/// yields the default `(0, 0)`, which is a valid (degraded) value rather than
/// an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PipelineVersion {
    pub major: u32,
    pub minor: u32,
}

impl PipelineVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse `"<major>.<minor>[...]"`, returning `None` for anything else
    pub fn parse(version: &str) -> Option<Self> {
        let mut tokens = version.trim().split('.');
        let major = tokens.next()?.trim().parse().ok()?;
        let minor = tokens.next()?.trim().parse().ok()?;
        Some(Self { major, minor })
    }

    /// Whether stored conversion factors are trustworthy for this pipeline.
    ///
    /// Pipelines up to 1.0 wrote already-converted samples next to incorrect
    /// conversion metadata.
    pub fn applies_conversion(&self) -> bool {
        self.major > 1 || (self.major == 1 && self.minor > 0)
    }
}

impl fmt::Display for PipelineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Physical unit of the stimulus waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StimulusUnit {
    Amps,
    Volts,
    Unknown,
}

impl StimulusUnit {
    /// Resolve the short unit code ("A", "Amps", "V", "Volts", ...) of a
    /// sweep's stimulus
    pub fn from_unit_code(sweep: u64, code: &str) -> Result<Self> {
        if code.starts_with('A') {
            Ok(StimulusUnit::Amps)
        } else if code.starts_with('V') {
            Ok(StimulusUnit::Volts)
        } else {
            Err(SweepError::UnrecognizedUnit {
                sweep,
                code: code.to_string(),
            })
        }
    }
}

impl fmt::Display for StimulusUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StimulusUnit::Amps => write!(f, "Amps"),
            StimulusUnit::Volts => write!(f, "Volts"),
            StimulusUnit::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Schema dialect of a file, one per reader implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    /// NWB 2 files converted from ABF/DAT acquisitions
    Converted,
    /// NWB 1 files written by the processing pipeline
    PostProcessed,
    /// NWB 1 files written directly by the acquisition software
    RawAcquisition,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Converted => write!(f, "converted"),
            Dialect::PostProcessed => write!(f, "postprocessed"),
            Dialect::RawAcquisition => write!(f, "raw"),
        }
    }
}

/// One sweep in the uniform representation shared by all dialects
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSweep {
    /// Command waveform
    pub stimulus: Vec<f64>,
    /// Recorded waveform, same length as `stimulus`
    pub response: Vec<f64>,
    pub stimulus_unit: StimulusUnit,
    /// Inclusive `(start, end)` range of valid samples
    pub index_range: (usize, usize),
    /// Samples per second
    pub sampling_rate: f64,
}

impl NormalizedSweep {
    /// Assemble a sweep, enforcing the invariants every reader must honor
    pub fn new(
        sweep: u64,
        stimulus: Vec<f64>,
        response: Vec<f64>,
        stimulus_unit: StimulusUnit,
        index_range: (usize, usize),
        sampling_rate: f64,
    ) -> Result<Self> {
        if stimulus.len() != response.len() {
            return Err(SweepError::LengthMismatch {
                sweep,
                stimulus: stimulus.len(),
                response: response.len(),
            });
        }

        let (start, end) = index_range;
        if start > end || end >= stimulus.len() {
            return Err(SweepError::InvalidSweepRange {
                sweep,
                reason: format!(
                    "index range ({}, {}) outside {} samples",
                    start,
                    end,
                    stimulus.len()
                ),
            });
        }

        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            return Err(SweepError::InvalidSamplingRate {
                sweep,
                rate: sampling_rate,
            });
        }

        Ok(Self {
            stimulus,
            response,
            stimulus_unit,
            index_range,
            sampling_rate,
        })
    }

    /// Number of samples in each waveform
    pub fn len(&self) -> usize {
        self.stimulus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stimulus.is_empty()
    }

    /// Duration of the whole sweep in seconds
    pub fn duration(&self) -> f64 {
        self.len() as f64 / self.sampling_rate
    }

    /// Stimulus samples inside the valid index range
    pub fn valid_stimulus(&self) -> &[f64] {
        &self.stimulus[self.index_range.0..=self.index_range.1]
    }

    /// Response samples inside the valid index range
    pub fn valid_response(&self) -> &[f64] {
        &self.response[self.index_range.0..=self.index_range.1]
    }
}

/// Errors raised while reading a single file
///
/// Every kind is a data-integrity failure of the operation in progress; none
/// of them is transient.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("Unsupported or unknown NWB major version ({})", .full.as_deref().unwrap_or("none"))]
    UnsupportedVersion { full: Option<String> },

    #[error("Unknown sweep naming convention: {0:?}")]
    UnknownDialect(String),

    #[error("No sweep found for sweep number {0}")]
    SweepNotFound(u64),

    #[error("Unexpected channel number {channel} for series {series} (sweep {sweep})")]
    UnexpectedChannel {
        sweep: u64,
        series: String,
        channel: i64,
    },

    #[error("Unrecognized raw data source: {0:?}")]
    UnrecognizedSource(String),

    #[error("Unknown clamp mode for sweep {0}")]
    UnknownClampMode(u64),

    #[error("Unexpected series type {kind:?} for series {series} (sweep {sweep})")]
    UnexpectedSeriesType {
        sweep: u64,
        series: String,
        kind: String,
    },

    #[error("Unknown stimulus unit for sweep {0}")]
    UnknownStimulusUnit(u64),

    #[error("Stimulus unit {code:?} of sweep {sweep} not recognized")]
    UnrecognizedUnit { sweep: u64, code: String },

    #[error("Found multiple response series for sweep {0}")]
    DuplicateResponseSeries(u64),

    #[error("Found multiple stimulus series for sweep {0}")]
    DuplicateStimulusSeries(u64),

    #[error("Could not find a stimulus series for sweep {0}")]
    MissingStimulus(u64),

    #[error("Could not find a response series for sweep {0}")]
    MissingResponse(u64),

    #[error("Stimulus and response differ in length for sweep {sweep}: {stimulus} vs {response}")]
    LengthMismatch {
        sweep: u64,
        stimulus: usize,
        response: usize,
    },

    #[error("Invalid index range for sweep {sweep}: {reason}")]
    InvalidSweepRange { sweep: u64, reason: String },

    #[error("Invalid sampling rate {rate} for sweep {sweep}")]
    InvalidSamplingRate { sweep: u64, rate: f64 },

    #[error("Cannot derive a sweep number from name {0:?}")]
    InvalidSweepName(String),

    #[error("Epoch detection failed for sweep {sweep}: {reason}")]
    EpochDetection { sweep: u64, reason: String },

    #[error("Failed to open file: {0}")]
    Open(String),

    #[error("Missing entry: {0}")]
    MissingEntry(String),

    #[error("Malformed entry {path}: {reason}")]
    MalformedEntry { path: String, reason: String },
}

impl SweepError {
    /// Attach the file the error occurred in
    pub fn in_file(self, path: &Path) -> NwbError {
        NwbError {
            path: path.to_path_buf(),
            kind: self,
        }
    }

    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        SweepError::MalformedEntry {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Error returned by public reader operations, naming the offending file
#[derive(Debug, thiserror::Error)]
#[error("{}: {kind}", .path.display())]
pub struct NwbError {
    pub path: PathBuf,
    #[source]
    pub kind: SweepError,
}

impl NwbError {
    /// The violated invariant, for matching
    pub fn kind(&self) -> &SweepError {
        &self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_resolution() {
        assert_eq!(StimulusUnit::from_unit_code(1, "A").unwrap(), StimulusUnit::Amps);
        assert_eq!(StimulusUnit::from_unit_code(1, "Amps").unwrap(), StimulusUnit::Amps);
        assert_eq!(StimulusUnit::from_unit_code(1, "Volts").unwrap(), StimulusUnit::Volts);
        assert!(matches!(
            StimulusUnit::from_unit_code(7, "pA"),
            Err(SweepError::UnrecognizedUnit { sweep: 7, code }) if code == "pA"
        ));
        assert!(StimulusUnit::from_unit_code(1, "").is_err());
    }

    #[test]
    fn test_pipeline_version_parsing() {
        assert_eq!(PipelineVersion::parse("1.1"), Some(PipelineVersion::new(1, 1)));
        assert_eq!(PipelineVersion::parse("2.0.3"), Some(PipelineVersion::new(2, 0)));
        assert_eq!(PipelineVersion::parse("2"), None);
        assert_eq!(PipelineVersion::parse("one.two"), None);
        assert_eq!(PipelineVersion::default(), PipelineVersion::new(0, 0));
    }

    #[test]
    fn test_pipeline_version_conversion_gate() {
        assert!(!PipelineVersion::new(0, 0).applies_conversion());
        assert!(!PipelineVersion::new(1, 0).applies_conversion());
        assert!(PipelineVersion::new(1, 1).applies_conversion());
        assert!(PipelineVersion::new(2, 0).applies_conversion());
    }

    #[test]
    fn test_normalized_sweep_invariants() {
        let ok = NormalizedSweep::new(1, vec![0.0; 4], vec![1.0; 4], StimulusUnit::Amps, (0, 3), 10.0);
        assert!(ok.is_ok());

        let mismatch = NormalizedSweep::new(1, vec![0.0; 4], vec![1.0; 3], StimulusUnit::Amps, (0, 2), 10.0);
        assert!(matches!(mismatch, Err(SweepError::LengthMismatch { .. })));

        let out_of_range = NormalizedSweep::new(1, vec![0.0; 4], vec![1.0; 4], StimulusUnit::Amps, (0, 4), 10.0);
        assert!(matches!(out_of_range, Err(SweepError::InvalidSweepRange { .. })));

        let reversed = NormalizedSweep::new(1, vec![0.0; 4], vec![1.0; 4], StimulusUnit::Amps, (3, 1), 10.0);
        assert!(matches!(reversed, Err(SweepError::InvalidSweepRange { .. })));

        let bad_rate = NormalizedSweep::new(1, vec![0.0; 4], vec![1.0; 4], StimulusUnit::Amps, (0, 3), 0.0);
        assert!(matches!(bad_rate, Err(SweepError::InvalidSamplingRate { .. })));
    }

    #[test]
    fn test_valid_slices() {
        let sweep = NormalizedSweep::new(
            7,
            vec![0.0, 1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0, 7.0],
            StimulusUnit::Volts,
            (1, 2),
            2.0,
        )
        .unwrap();
        assert_eq!(sweep.valid_stimulus(), &[1.0, 2.0]);
        assert_eq!(sweep.valid_response(), &[5.0, 6.0]);
        assert_eq!(sweep.duration(), 2.0);
    }

    #[test]
    fn test_error_display_names_file() {
        let err = SweepError::SweepNotFound(3).in_file(Path::new("cell.nwb"));
        assert_eq!(err.to_string(), "cell.nwb: No sweep found for sweep number 3");
        assert!(matches!(err.kind(), SweepError::SweepNotFound(3)));
    }
}
