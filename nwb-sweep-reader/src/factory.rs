//! Reader selection
//!
//! The factory is the only place that looks at the version marker and the
//! sweep naming convention; the readers it builds never re-check the dialect.

use crate::config::ReaderConfig;
use crate::readers::base::V1_ACQUISITION_PATH;
use crate::readers::{ConvertedReader, NwbReader, PostProcessedReader, RawAcquisitionReader, SweepReader};
use crate::store::{Container, Storage};
use crate::types::{NwbError, NwbMajor, Result, SweepError};
use crate::version::detect_version;
use std::path::Path;
use std::sync::Arc;

/// Sub-dialects of NWB 1 files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum V1Dialect {
    /// Written by the acquisition software (`data_<n>_AD0` sweeps)
    Raw,
    /// Written by the processing pipeline (`Sweep_<n>` sweeps)
    PostProcessed,
}

/// Pick the NWB 1 sub-dialect from the name of the first sweep
pub fn classify_v1(file: &dyn Container) -> Result<V1Dialect> {
    let first = file.members(V1_ACQUISITION_PATH)?.into_iter().next().unwrap_or_default();
    let convention = first.split('_').next().unwrap_or_default();

    match convention {
        "data" => Ok(V1Dialect::Raw),
        "Sweep" => Ok(V1Dialect::PostProcessed),
        _ => Err(SweepError::UnknownDialect(first.clone())),
    }
}

/// Builds the reader matching a file's version and dialect
#[derive(Clone)]
pub struct ReaderFactory {
    storage: Arc<dyn Storage>,
    config: ReaderConfig,
}

impl ReaderFactory {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            config: ReaderConfig::default(),
        }
    }

    /// Builder method: set the configuration handed to created readers
    pub fn with_config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Inspect `path` and construct exactly one reader for it
    ///
    /// # Example
    /// ```
    /// use nwb_sweep_reader::store::{MemoryFile, MemoryStorage};
    /// use nwb_sweep_reader::{Dialect, ReaderFactory, SweepReader};
    /// use std::path::Path;
    /// use std::sync::Arc;
    ///
    /// let file = MemoryFile::new()
    ///     .dataset("/nwb_version", "NWB-1.0.5")
    ///     .group("/acquisition/timeseries/Sweep_1");
    /// let storage = Arc::new(MemoryStorage::new().with_file("cell.nwb", file));
    ///
    /// let reader = ReaderFactory::new(storage).create(Path::new("cell.nwb")).unwrap();
    /// assert_eq!(reader.dialect(), Dialect::PostProcessed);
    /// ```
    pub fn create(&self, path: &Path) -> std::result::Result<NwbReader, NwbError> {
        log::info!("Selecting reader for {:?}", path);

        let selected = {
            let file = self.storage.open(path).map_err(|e| e.in_file(path))?;
            self.select(file.as_ref(), path)
        };

        let reader = selected.map_err(|e| e.in_file(path))?;
        log::info!("Using {} reader for {:?}", reader.dialect(), path);
        Ok(reader)
    }

    fn select(&self, file: &dyn Container, path: &Path) -> Result<NwbReader> {
        let version = detect_version(file);
        log::debug!("NWB version of {:?}: {} ({:?})", path, version.major, version.full);

        match version.major {
            NwbMajor::V2 => Ok(NwbReader::Converted(ConvertedReader::new(
                path,
                Arc::clone(&self.storage),
            ))),
            NwbMajor::V1 => match classify_v1(file)? {
                V1Dialect::Raw => Ok(NwbReader::RawAcquisition(RawAcquisitionReader::new(
                    path,
                    Arc::clone(&self.storage),
                    &self.config,
                ))),
                V1Dialect::PostProcessed => Ok(NwbReader::PostProcessed(PostProcessedReader::new(
                    path,
                    Arc::clone(&self.storage),
                ))),
            },
            NwbMajor::Unknown => Err(SweepError::UnsupportedVersion { full: version.full }),
        }
    }
}

/// Open a file from disk with the HDF5 backend and default configuration
#[cfg(feature = "hdf5")]
pub fn open_reader(path: &Path) -> std::result::Result<NwbReader, NwbError> {
    ReaderFactory::new(Arc::new(crate::store::Hdf5Storage)).create(path)
}
