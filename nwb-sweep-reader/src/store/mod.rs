//! Hierarchical store access (HDF5, in-memory)
//!
//! Readers never talk to a file format directly. They open a [`Container`]
//! through a [`Storage`] at the start of each public operation and drop it
//! before returning, so no handle outlives a call.

use crate::types::{Result, SweepError};
use serde::Serialize;
use std::path::Path;

pub mod memory;

#[cfg(feature = "hdf5")]
pub mod hdf5;

pub use memory::{MemoryFile, MemoryStorage};

#[cfg(feature = "hdf5")]
pub use self::hdf5::Hdf5Storage;

/// A flat value read from a dataset or attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    TextArray(Vec<String>),
}

impl AttrValue {
    /// Scalar text, or the first element of a text array
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            AttrValue::TextArray(v) => v.first().map(String::as_str),
            _ => None,
        }
    }

    /// Scalar number, or the first element of a numeric array
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            AttrValue::IntArray(v) => v.first().map(|x| *x as f64),
            AttrValue::FloatArray(v) => v.first().copied(),
            _ => None,
        }
    }

    /// Integer value; floats are accepted only when they hold a whole number
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            AttrValue::IntArray(v) => v.first().copied(),
            AttrValue::Float(_) | AttrValue::FloatArray(_) => {
                let v = self.as_f64()?;
                (v.fract() == 0.0).then_some(v as i64)
            }
            _ => None,
        }
    }

    /// All numeric samples as floats
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            AttrValue::Int(v) => Some(vec![*v as f64]),
            AttrValue::Float(v) => Some(vec![*v]),
            AttrValue::IntArray(v) => Some(v.iter().map(|x| *x as f64).collect()),
            AttrValue::FloatArray(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// All text entries (a scalar counts as a one-element list)
    pub fn to_text_vec(&self) -> Option<Vec<String>> {
        match self {
            AttrValue::Text(s) => Some(vec![s.clone()]),
            AttrValue::TextArray(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(value: Vec<f64>) -> Self {
        AttrValue::FloatArray(value)
    }
}

impl From<Vec<i64>> for AttrValue {
    fn from(value: Vec<i64>) -> Self {
        AttrValue::IntArray(value)
    }
}

impl From<Vec<&str>> for AttrValue {
    fn from(value: Vec<&str>) -> Self {
        AttrValue::TextArray(value.into_iter().map(str::to_string).collect())
    }
}

/// One open file
///
/// Paths are absolute or relative to the root, with `/` separators.
pub trait Container {
    /// Whether a group or dataset exists at `path`
    fn exists(&self, path: &str) -> bool;

    /// Whether `path` names a group
    fn is_group(&self, path: &str) -> bool;

    /// Member names of a group, sorted by name
    fn members(&self, path: &str) -> Result<Vec<String>>;

    /// Attribute names of a group or dataset
    fn attr_names(&self, path: &str) -> Result<Vec<String>>;

    /// Attribute of a group or dataset; `Ok(None)` when the object exists
    /// without that attribute
    fn attr(&self, path: &str, name: &str) -> Result<Option<AttrValue>>;

    /// Contents of a dataset
    fn read(&self, path: &str) -> Result<AttrValue>;

    /// Read a dataset, or `None` when it does not exist
    fn read_opt(&self, path: &str) -> Result<Option<AttrValue>> {
        if self.exists(path) && !self.is_group(path) {
            self.read(path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Read a numeric dataset as floats
    fn read_f64s(&self, path: &str) -> Result<Vec<f64>> {
        self.read(path)?
            .to_f64_vec()
            .ok_or_else(|| SweepError::malformed(path, "expected numeric samples"))
    }

    /// Read a scalar number from a dataset
    fn read_f64(&self, path: &str) -> Result<f64> {
        self.read(path)?
            .as_f64()
            .ok_or_else(|| SweepError::malformed(path, "expected a number"))
    }

    /// Read a scalar integer from a dataset
    fn read_i64(&self, path: &str) -> Result<i64> {
        self.read(path)?
            .as_i64()
            .ok_or_else(|| SweepError::malformed(path, "expected an integer"))
    }

    /// Numeric attribute that must be present
    fn attr_f64(&self, path: &str, name: &str) -> Result<f64> {
        self.attr(path, name)?
            .ok_or_else(|| SweepError::MissingEntry(format!("{}@{}", path, name)))?
            .as_f64()
            .ok_or_else(|| SweepError::malformed(&format!("{}@{}", path, name), "expected a number"))
    }
}

/// Opens files as [`Container`]s
pub trait Storage: Send + Sync {
    /// Open `path` read-only. The handle is released when the box is dropped.
    fn open(&self, path: &Path) -> Result<Box<dyn Container>>;
}

/// Join a group path and a member name
pub(crate) fn join(parent: &str, child: &str) -> String {
    let parent = parent.trim_end_matches('/');
    if parent.is_empty() {
        format!("/{}", child)
    } else {
        format!("{}/{}", parent, child)
    }
}
