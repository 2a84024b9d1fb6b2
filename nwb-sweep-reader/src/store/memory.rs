//! In-memory hierarchical store
//!
//! Holds synthetic files as a flat map of normalized paths to nodes. Used to
//! build fixtures for every dialect without an HDF5 library, and to observe
//! handle lifetimes: [`MemoryStorage::open_handles`] counts containers that
//! have been opened and not yet dropped.

use super::{AttrValue, Container, Storage};
use crate::types::{Result, SweepError};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum NodeKind {
    Group,
    Dataset(AttrValue),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    attrs: BTreeMap<String, AttrValue>,
}

impl Node {
    fn group() -> Self {
        Self {
            kind: NodeKind::Group,
            attrs: BTreeMap::new(),
        }
    }
}

/// A synthetic file: groups, datasets and attributes addressed by path
#[derive(Debug, Clone)]
pub struct MemoryFile {
    nodes: BTreeMap<String, Node>,
}

impl Default for MemoryFile {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    format!("/{}", parts.join("/"))
}

fn parent_of(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

impl MemoryFile {
    /// Empty file containing only the root group
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::group());
        Self { nodes }
    }

    fn ensure_parents(&mut self, path: &str) {
        let mut current = parent_of(path);
        while let Some(p) = current {
            self.nodes.entry(p.to_string()).or_insert_with(Node::group);
            current = parent_of(p);
        }
    }

    /// Builder method: add a group (and any missing parents)
    pub fn group(mut self, path: &str) -> Self {
        let path = normalize(path);
        self.ensure_parents(&path);
        self.nodes.entry(path).or_insert_with(Node::group);
        self
    }

    /// Builder method: add or replace a dataset
    pub fn dataset(mut self, path: &str, value: impl Into<AttrValue>) -> Self {
        let path = normalize(path);
        self.ensure_parents(&path);
        let attrs = self
            .nodes
            .remove(&path)
            .map(|node| node.attrs)
            .unwrap_or_default();
        self.nodes.insert(
            path,
            Node {
                kind: NodeKind::Dataset(value.into()),
                attrs,
            },
        );
        self
    }

    /// Builder method: set an attribute, creating a group at `path` if
    /// nothing exists there yet
    pub fn attr(mut self, path: &str, name: &str, value: impl Into<AttrValue>) -> Self {
        let path = normalize(path);
        self.ensure_parents(&path);
        self.nodes
            .entry(path)
            .or_insert_with(Node::group)
            .attrs
            .insert(name.to_string(), value.into());
        self
    }

    fn node(&self, path: &str) -> Result<&Node> {
        let path = normalize(path);
        self.nodes
            .get(&path)
            .ok_or(SweepError::MissingEntry(path))
    }
}

/// [`Storage`] over a set of [`MemoryFile`]s keyed by path
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: HashMap<PathBuf, Arc<MemoryFile>>,
    open_handles: Arc<AtomicUsize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: register a file under `path`
    pub fn with_file(mut self, path: impl Into<PathBuf>, file: MemoryFile) -> Self {
        self.insert(path, file);
        self
    }

    /// Register or replace a file
    pub fn insert(&mut self, path: impl Into<PathBuf>, file: MemoryFile) {
        self.files.insert(path.into(), Arc::new(file));
    }

    /// Number of containers currently open
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }
}

impl Storage for MemoryStorage {
    fn open(&self, path: &Path) -> Result<Box<dyn Container>> {
        let file = self
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| SweepError::Open(format!("no such file: {}", path.display())))?;

        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryHandle {
            file,
            open_handles: Arc::clone(&self.open_handles),
        }))
    }
}

struct MemoryHandle {
    file: Arc<MemoryFile>,
    open_handles: Arc<AtomicUsize>,
}

impl Drop for MemoryHandle {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Container for MemoryHandle {
    fn exists(&self, path: &str) -> bool {
        self.file.nodes.contains_key(&normalize(path))
    }

    fn is_group(&self, path: &str) -> bool {
        matches!(
            self.file.nodes.get(&normalize(path)),
            Some(Node {
                kind: NodeKind::Group,
                ..
            })
        )
    }

    fn members(&self, path: &str) -> Result<Vec<String>> {
        let path = normalize(path);
        match self.file.node(&path)?.kind {
            NodeKind::Group => {}
            NodeKind::Dataset(_) => return Err(SweepError::malformed(&path, "not a group")),
        }

        let prefix = if path == "/" { "/".to_string() } else { format!("{}/", path) };
        Ok(self
            .file
            .nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, _)| {
                let rest = &key[prefix.len()..];
                (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_string())
            })
            .collect())
    }

    fn attr_names(&self, path: &str) -> Result<Vec<String>> {
        Ok(self.file.node(path)?.attrs.keys().cloned().collect())
    }

    fn attr(&self, path: &str, name: &str) -> Result<Option<AttrValue>> {
        Ok(self.file.node(path)?.attrs.get(name).cloned())
    }

    fn read(&self, path: &str) -> Result<AttrValue> {
        match &self.file.node(path)?.kind {
            NodeKind::Dataset(value) => Ok(value.clone()),
            NodeKind::Group => Err(SweepError::malformed(path, "not a dataset")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> MemoryFile {
        MemoryFile::new()
            .dataset("/nwb_version", "NWB-1.0.5")
            .dataset("/acquisition/timeseries/Sweep_2/data", vec![1.0, 2.0])
            .attr("/acquisition/timeseries/Sweep_2/data", "unit", "Volts")
            .group("/acquisition/timeseries/Sweep_10")
            .attr("/", "nwb_version", "2.2.0")
    }

    #[test]
    fn test_members_are_sorted_direct_children() {
        let storage = MemoryStorage::new().with_file("a.nwb", sample_file());
        let file = storage.open(Path::new("a.nwb")).unwrap();

        assert_eq!(
            file.members("/acquisition/timeseries").unwrap(),
            vec!["Sweep_10".to_string(), "Sweep_2".to_string()]
        );
        assert_eq!(
            file.members("/").unwrap(),
            vec!["acquisition".to_string(), "nwb_version".to_string()]
        );
        assert!(file.members("/nwb_version").is_err());
    }

    #[test]
    fn test_datasets_and_attributes() {
        let storage = MemoryStorage::new().with_file("a.nwb", sample_file());
        let file = storage.open(Path::new("a.nwb")).unwrap();

        assert!(file.exists("acquisition/timeseries/Sweep_2/data"));
        assert!(file.is_group("/acquisition/timeseries/Sweep_2"));
        assert!(!file.is_group("/acquisition/timeseries/Sweep_2/data"));
        assert_eq!(
            file.read_f64s("/acquisition/timeseries/Sweep_2/data").unwrap(),
            vec![1.0, 2.0]
        );
        assert_eq!(
            file.attr("/acquisition/timeseries/Sweep_2/data", "unit").unwrap(),
            Some(AttrValue::from("Volts"))
        );
        assert_eq!(file.attr("/", "missing").unwrap(), None);
        assert!(matches!(
            file.attr("/nope", "unit"),
            Err(SweepError::MissingEntry(_))
        ));
        assert_eq!(file.read_opt("/nope").unwrap(), None);
    }

    #[test]
    fn test_handles_are_counted_until_dropped() {
        let storage = MemoryStorage::new().with_file("a.nwb", sample_file());
        {
            let _first = storage.open(Path::new("a.nwb")).unwrap();
            let _second = storage.open(Path::new("a.nwb")).unwrap();
            assert_eq!(storage.open_handles(), 2);
        }
        assert_eq!(storage.open_handles(), 0);
        assert!(matches!(
            storage.open(Path::new("missing.nwb")),
            Err(SweepError::Open(_))
        ));
        assert_eq!(storage.open_handles(), 0);
    }
}
