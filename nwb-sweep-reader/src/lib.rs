//! NWB Sweep Reader Library
//!
//! A stateless library that extracts electrophysiology sweeps from NWB files
//! in one uniform representation, whichever tool chain produced the file.
//!
//! # Architecture
//!
//! Three schema dialects are supported:
//! - NWB 2 files converted from Clampex (ABF) and PatchMaster (DAT) recordings
//! - NWB 1 files written by the processing pipeline (`Sweep_<n>` epochs)
//! - NWB 1 files written directly by the acquisition software (`data_<n>_AD0`)
//!
//! [`ReaderFactory`] inspects a file once, picks the matching reader and returns
//! it as an [`NwbReader`]. Every read afterwards opens the file, extracts one
//! sweep and closes the file again, so readers can be reused freely.
//!
//! The library does NOT:
//! - Write or modify files
//! - Filter signals or extract features
//! - Cache data across calls or batch over many files
//!
//! File access goes through the [`store::Storage`] trait. The HDF5 backend is
//! available with the `hdf5` feature; [`store::MemoryStorage`] holds synthetic
//! files.
//!
//! # Example Usage
//!
//! ```no_run
//! # #[cfg(feature = "hdf5")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use nwb_sweep_reader::{open_reader, SweepReader};
//! use std::path::Path;
//!
//! let reader = open_reader(Path::new("cell.nwb"))?;
//!
//! for name in reader.list_sweep_names()? {
//!     let number = reader.get_sweep_number(&name)?;
//!     let sweep = reader.get_sweep_data(number)?;
//!     println!(
//!         "{} ({}): {} samples at {} Hz, valid {:?}",
//!         name,
//!         reader.get_stim_code(&name)?,
//!         sweep.len(),
//!         sweep.sampling_rate,
//!         sweep.index_range
//!     );
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "hdf5"))]
//! # fn main() {}
//! ```

// Public modules
pub mod config;
pub mod epochs;
pub mod factory;
pub mod readers;
pub mod store;
pub mod types;
pub mod version;

// Re-export main types for convenience
pub use config::ReaderConfig;
pub use epochs::{EpochDetector, StimulusEpochDetector};
pub use factory::{classify_v1, ReaderFactory, V1Dialect};
pub use readers::{
    ConvertedReader, NwbReader, PostProcessedReader, RawAcquisitionReader, SweepReader,
};
pub use types::{
    Dialect, NormalizedSweep, NwbError, NwbMajor, PipelineVersion, StimulusUnit,
    SweepError, VersionDescriptor,
};
pub use version::detect_version;

#[cfg(feature = "hdf5")]
pub use factory::open_reader;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
