//! Behavior shared by all dialect readers

use crate::store::{join, AttrValue, Container, Storage};
use crate::types::{NwbError, PipelineVersion, Result, SweepError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Sweep collection of version 1 files
pub const V1_ACQUISITION_PATH: &str = "/acquisition/timeseries";
/// Sweep collection of version 2 files
pub const V2_ACQUISITION_PATH: &str = "/acquisition";
/// Flat key/value provenance array
pub const GENERATED_BY_PATH: &str = "/general/generated_by";

/// Suffix appended to stimulus codes by the acquisition software
const STIM_CODE_SUFFIX: &str = "_DA_0";

/// Child entries left out of flattened sweep attributes
const EXCLUDED_CHILDREN: [&str; 2] = ["data", "electrode"];

/// File location plus the storage used to open it
///
/// Holds no handle: every operation opens the file and releases it before
/// returning.
#[derive(Clone)]
pub struct BaseReader {
    path: PathBuf,
    storage: Arc<dyn Storage>,
    acquisition_path: &'static str,
}

impl std::fmt::Debug for BaseReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseReader")
            .field("path", &self.path)
            .field("acquisition_path", &self.acquisition_path)
            .finish()
    }
}

impl BaseReader {
    pub fn new(path: &Path, storage: Arc<dyn Storage>, acquisition_path: &'static str) -> Self {
        Self {
            path: path.to_path_buf(),
            storage,
            acquisition_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file, run `op`, and close the file on every exit path
    pub fn with_file<T>(
        &self,
        op: impl FnOnce(&dyn Container) -> Result<T>,
    ) -> std::result::Result<T, NwbError> {
        let file = self
            .storage
            .open(&self.path)
            .map_err(|e| e.in_file(&self.path))?;
        op(file.as_ref()).map_err(|e| e.in_file(&self.path))
    }

    /// Path of a sweep entry inside the acquisition group
    pub fn sweep_path(&self, sweep_name: &str) -> String {
        join(self.acquisition_path, sweep_name)
    }

    /// All sweep entries, in storage order
    pub fn list_sweep_names(&self) -> std::result::Result<Vec<String>, NwbError> {
        self.with_file(|file| file.members(self.acquisition_path))
    }

    /// Attributes of a sweep entry merged with its child datasets
    pub fn sweep_attributes(
        &self,
        sweep_name: &str,
    ) -> std::result::Result<BTreeMap<String, AttrValue>, NwbError> {
        self.with_file(|file| read_sweep_attributes(file, &self.sweep_path(sweep_name)))
    }

    /// Version of the pipeline that produced the file, `(0, 0)` if unknown
    pub fn pipeline_version(&self) -> PipelineVersion {
        let version = self
            .storage
            .open(&self.path)
            .ok()
            .and_then(|file| read_pipeline_version(file.as_ref()));

        match version {
            Some(version) => version,
            None => {
                log::warn!(
                    "No usable pipeline version in {:?}, assuming {}",
                    self.path,
                    PipelineVersion::default()
                );
                PipelineVersion::default()
            }
        }
    }
}

/// Flatten a sweep group: its attributes plus every child dataset except the
/// sample payload and the electrode reference
pub(crate) fn read_sweep_attributes(
    file: &dyn Container,
    sweep_path: &str,
) -> Result<BTreeMap<String, AttrValue>> {
    if !file.is_group(sweep_path) {
        return Err(SweepError::MissingEntry(sweep_path.to_string()));
    }

    let mut attrs = BTreeMap::new();
    for name in file.attr_names(sweep_path)? {
        if let Some(value) = file.attr(sweep_path, &name)? {
            attrs.insert(name, value);
        }
    }

    for child in file.members(sweep_path)? {
        if EXCLUDED_CHILDREN.contains(&child.as_str()) {
            continue;
        }
        let child_path = join(sweep_path, &child);
        if file.is_group(&child_path) {
            continue;
        }
        attrs.insert(child, file.read(&child_path)?);
    }

    Ok(attrs)
}

/// Scan the key/value provenance array for `version`
pub(crate) fn read_pipeline_version(file: &dyn Container) -> Option<PipelineVersion> {
    let entries = file.read_opt(GENERATED_BY_PATH).ok()??.to_text_vec()?;

    entries
        .chunks(2)
        .find(|pair| pair[0] == "version")
        .and_then(|pair| pair.get(1))
        .and_then(|value| PipelineVersion::parse(value))
}

/// Remove the acquisition software's trailing stimulus-code suffix
pub fn trim_stim_code(code: &str) -> String {
    code.strip_suffix(STIM_CODE_SUFFIX).unwrap_or(code).to_string()
}

/// Read a stimulus code stored as a child dataset of a sweep entry
pub(crate) fn read_stim_code(file: &dyn Container, sweep_path: &str, dataset: &str) -> Result<String> {
    let path = join(sweep_path, dataset);
    let value = file
        .read_opt(&path)?
        .ok_or_else(|| SweepError::MissingEntry(path.clone()))?;
    let code = value
        .as_text()
        .ok_or_else(|| SweepError::malformed(&path, "expected text"))?;
    Ok(trim_stim_code(code))
}

/// Sample array of a series scaled by its `conversion` attribute
pub(crate) fn read_converted(file: &dyn Container, data_path: &str) -> Result<Vec<f64>> {
    let samples = file.read_f64s(data_path)?;
    let conversion = read_conversion(file, data_path)?;
    Ok(scale(samples, conversion))
}

/// `conversion` attribute of a sample array, 1.0 when absent
pub(crate) fn read_conversion(file: &dyn Container, data_path: &str) -> Result<f64> {
    match file.attr(data_path, "conversion")? {
        Some(value) => value
            .as_f64()
            .ok_or_else(|| SweepError::malformed(data_path, "non-numeric conversion")),
        None => Ok(1.0),
    }
}

pub(crate) fn scale(mut samples: Vec<f64>, factor: f64) -> Vec<f64> {
    samples.iter_mut().for_each(|v| *v *= factor);
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryFile, MemoryStorage};

    fn reader(file: MemoryFile, acquisition: &'static str) -> (BaseReader, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new().with_file("cell.nwb", file));
        let base = BaseReader::new(Path::new("cell.nwb"), storage.clone(), acquisition);
        (base, storage)
    }

    #[test]
    fn test_list_sweep_names() {
        let file = MemoryFile::new()
            .group("/acquisition/timeseries/Sweep_5")
            .group("/acquisition/timeseries/Sweep_3");
        let (base, storage) = reader(file, V1_ACQUISITION_PATH);

        assert_eq!(base.list_sweep_names().unwrap(), vec!["Sweep_3", "Sweep_5"]);
        assert_eq!(storage.open_handles(), 0);
    }

    #[test]
    fn test_sweep_attributes_exclude_payload_and_electrode() {
        let file = MemoryFile::new()
            .attr("/acquisition/index_001", "sweep_number", 1i64)
            .attr("/acquisition/index_001", "neurodata_type", "CurrentClampSeries")
            .dataset("/acquisition/index_001/data", vec![1.0, 2.0])
            .dataset("/acquisition/index_001/electrode", "/general/electrode_0")
            .dataset("/acquisition/index_001/bias_current", 0.5)
            .group("/acquisition/index_001/starting_time_group");
        let (base, _) = reader(file, V2_ACQUISITION_PATH);

        let attrs = base.sweep_attributes("index_001").unwrap();
        assert_eq!(attrs.get("sweep_number"), Some(&AttrValue::Int(1)));
        assert_eq!(attrs.get("bias_current"), Some(&AttrValue::Float(0.5)));
        assert!(attrs.contains_key("neurodata_type"));
        assert!(!attrs.contains_key("data"));
        assert!(!attrs.contains_key("electrode"));
        assert!(!attrs.contains_key("starting_time_group"));
    }

    #[test]
    fn test_sweep_attributes_missing_sweep() {
        let (base, storage) = reader(MemoryFile::new().group("/acquisition"), V2_ACQUISITION_PATH);
        let err = base.sweep_attributes("nope").unwrap_err();
        assert!(matches!(err.kind(), SweepError::MissingEntry(_)));
        assert_eq!(storage.open_handles(), 0);
    }

    #[test]
    fn test_pipeline_version() {
        let file = MemoryFile::new().dataset(
            GENERATED_BY_PATH,
            vec!["program", "pipeline", "version", "1.1.3"],
        );
        let (base, _) = reader(file, V1_ACQUISITION_PATH);
        assert_eq!(base.pipeline_version(), PipelineVersion::new(1, 1));
    }

    #[test]
    fn test_pipeline_version_degrades_to_default() {
        let cases = vec![
            MemoryFile::new(),
            MemoryFile::new().dataset(GENERATED_BY_PATH, vec!["program", "pipeline"]),
            MemoryFile::new().dataset(GENERATED_BY_PATH, vec!["version", "x.y"]),
            MemoryFile::new().dataset(GENERATED_BY_PATH, vec!["version"]),
            MemoryFile::new().dataset(GENERATED_BY_PATH, vec!["version", "3"]),
            MemoryFile::new().dataset(GENERATED_BY_PATH, vec![1.0, 2.0]),
            // a value equal to "version" is not a key
            MemoryFile::new().dataset(GENERATED_BY_PATH, vec!["name", "version", "2.0", "x"]),
        ];
        for file in cases {
            let (base, _) = reader(file, V1_ACQUISITION_PATH);
            assert_eq!(base.pipeline_version(), PipelineVersion::default());
        }

        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let base = BaseReader::new(Path::new("absent.nwb"), storage, V1_ACQUISITION_PATH);
        assert_eq!(base.pipeline_version(), PipelineVersion::default());
    }

    #[test]
    fn test_trim_stim_code() {
        assert_eq!(trim_stim_code("C1LSCOARSE150216_DA_0"), "C1LSCOARSE150216");
        assert_eq!(trim_stim_code("C1LSCOARSE150216"), "C1LSCOARSE150216");
        assert_eq!(trim_stim_code("X_DA_0_DA_0"), "X_DA_0");
    }

    #[test]
    fn test_read_converted() {
        let file = MemoryFile::new()
            .dataset("/s/data", vec![1i64, 2, 3])
            .attr("/s/data", "conversion", 0.5)
            .dataset("/t/data", vec![1.0, 2.0]);
        let storage = MemoryStorage::new().with_file("f", file);
        let handle = storage.open(Path::new("f")).unwrap();

        assert_eq!(read_converted(handle.as_ref(), "/s/data").unwrap(), vec![0.5, 1.0, 1.5]);
        assert_eq!(read_converted(handle.as_ref(), "/t/data").unwrap(), vec![1.0, 2.0]);
    }
}
