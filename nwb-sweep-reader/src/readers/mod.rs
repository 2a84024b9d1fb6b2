//! Dialect readers
//!
//! Each NWB dialect has its own reader; all of them implement [`SweepReader`].
//! [`NwbReader`] is the closed set the factory hands out, so callers never
//! need to know which dialect they are reading.

use crate::store::AttrValue;
use crate::types::{Dialect, NormalizedSweep, NwbError, PipelineVersion};
use std::collections::BTreeMap;
use std::path::Path;

pub mod base;
pub mod converted;
pub mod postprocessed;
pub mod raw;

pub use base::BaseReader;
pub use converted::ConvertedReader;
pub use postprocessed::PostProcessedReader;
pub use raw::RawAcquisitionReader;

/// Result type of public reader operations
pub type ReadResult<T> = std::result::Result<T, NwbError>;

/// Capability shared by all dialect readers
///
/// Every method opens the file, reads what it needs and closes the file
/// before returning.
pub trait SweepReader {
    /// Shared file access and metadata helpers
    fn base(&self) -> &BaseReader;

    /// Dialect handled by this reader
    fn dialect(&self) -> Dialect;

    /// Stimulus, response, unit, valid range and rate of one sweep
    fn get_sweep_data(&self, sweep_number: u64) -> ReadResult<NormalizedSweep>;

    /// Sweep number of a sweep entry
    fn get_sweep_number(&self, sweep_name: &str) -> ReadResult<u64>;

    /// Stimulus code of a sweep entry, without the `_DA_0` suffix
    fn get_stim_code(&self, sweep_name: &str) -> ReadResult<String>;

    /// All sweep entry names, in storage order
    fn list_sweep_names(&self) -> ReadResult<Vec<String>> {
        self.base().list_sweep_names()
    }

    /// Attributes and child datasets of a sweep entry
    fn sweep_attributes(&self, sweep_name: &str) -> ReadResult<BTreeMap<String, AttrValue>> {
        self.base().sweep_attributes(sweep_name)
    }

    /// Version of the producing pipeline, `(0, 0)` when unknown
    fn pipeline_version(&self) -> PipelineVersion {
        self.base().pipeline_version()
    }

    /// File this reader reads from
    fn path(&self) -> &Path {
        self.base().path()
    }
}

/// The reader selected for a file
#[derive(Debug, Clone)]
pub enum NwbReader {
    Converted(ConvertedReader),
    PostProcessed(PostProcessedReader),
    RawAcquisition(RawAcquisitionReader),
}

impl NwbReader {
    fn inner(&self) -> &dyn SweepReader {
        match self {
            NwbReader::Converted(reader) => reader,
            NwbReader::PostProcessed(reader) => reader,
            NwbReader::RawAcquisition(reader) => reader,
        }
    }
}

impl SweepReader for NwbReader {
    fn base(&self) -> &BaseReader {
        self.inner().base()
    }

    fn dialect(&self) -> Dialect {
        self.inner().dialect()
    }

    fn get_sweep_data(&self, sweep_number: u64) -> ReadResult<NormalizedSweep> {
        self.inner().get_sweep_data(sweep_number)
    }

    fn get_sweep_number(&self, sweep_name: &str) -> ReadResult<u64> {
        self.inner().get_sweep_number(sweep_name)
    }

    fn get_stim_code(&self, sweep_name: &str) -> ReadResult<String> {
        self.inner().get_stim_code(sweep_name)
    }
}

/// Parse the `index`-th `_`-separated token of a sweep name as a number
pub(crate) fn sweep_number_token(name: &str, index: Option<usize>) -> crate::types::Result<u64> {
    let tokens: Vec<&str> = name.split('_').collect();
    let token = match index {
        Some(i) => tokens.get(i),
        None => tokens.last(),
    };
    token
        .and_then(|t| t.parse::<u64>().ok())
        .ok_or_else(|| crate::types::SweepError::InvalidSweepName(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_number_token() {
        assert_eq!(sweep_number_token("Sweep_42", None).unwrap(), 42);
        assert_eq!(sweep_number_token("data_00007_AD0", Some(1)).unwrap(), 7);
        assert!(sweep_number_token("data_AD0", Some(1)).is_err());
        assert!(sweep_number_token("Sweep", None).is_err());
        assert!(sweep_number_token("Sweep_-1", None).is_err());
    }
}
