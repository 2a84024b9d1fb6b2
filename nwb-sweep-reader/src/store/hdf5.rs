//! HDF5 backend
//!
//! Reads NWB files through the HDF5 C library. Numeric datasets are converted
//! to `i64`/`f64` by the library; strings may be variable-length (UTF-8 or
//! ASCII) or fixed-length.

use super::{AttrValue, Container, Storage};
use crate::types::{Result, SweepError};
use hdf5::types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::File as H5File;
use std::path::Path;

/// Longest fixed-length string read from a file
const MAX_FIXED_STRING: usize = 1024;

/// [`Storage`] that opens files with the HDF5 library
#[derive(Debug, Default, Clone, Copy)]
pub struct Hdf5Storage;

impl Storage for Hdf5Storage {
    fn open(&self, path: &Path) -> Result<Box<dyn Container>> {
        if !path.exists() {
            return Err(SweepError::Open(format!("file not found: {:?}", path)));
        }

        let file = H5File::open(path)
            .map_err(|e| SweepError::Open(format!("failed to open {:?}: {}", path, e)))?;

        log::debug!("Opened HDF5 file {:?}", path);
        Ok(Box::new(Hdf5Container { file }))
    }
}

/// An open HDF5 file; the underlying handle closes on drop
struct Hdf5Container {
    file: H5File,
}

fn h5_err(path: &str, e: hdf5::Error) -> SweepError {
    SweepError::malformed(path, e.to_string())
}

impl Hdf5Container {
    /// Run `f` on the group or dataset at `path`
    fn with_location<T>(
        &self,
        path: &str,
        f: impl FnOnce(&hdf5::Location) -> hdf5::Result<T>,
    ) -> Result<T> {
        if !self.exists(path) {
            return Err(SweepError::MissingEntry(path.to_string()));
        }
        if let Ok(group) = self.file.group(path) {
            return f(&group).map_err(|e| h5_err(path, e));
        }
        let dataset = self.file.dataset(path).map_err(|e| h5_err(path, e))?;
        f(&dataset).map_err(|e| h5_err(path, e))
    }
}

impl Container for Hdf5Container {
    fn exists(&self, path: &str) -> bool {
        // H5Lexists fails on a missing intermediate group, so walk each prefix
        let mut prefix = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            prefix.push('/');
            prefix.push_str(part);
            if !self.file.link_exists(&prefix) {
                return false;
            }
        }
        true
    }

    fn is_group(&self, path: &str) -> bool {
        self.exists(path) && self.file.group(path).is_ok()
    }

    fn members(&self, path: &str) -> Result<Vec<String>> {
        let group = self.file.group(path).map_err(|e| {
            if self.exists(path) {
                h5_err(path, e)
            } else {
                SweepError::MissingEntry(path.to_string())
            }
        })?;
        let mut names = group.member_names().map_err(|e| h5_err(path, e))?;
        names.sort();
        Ok(names)
    }

    fn attr_names(&self, path: &str) -> Result<Vec<String>> {
        self.with_location(path, |loc| loc.attr_names())
    }

    fn attr(&self, path: &str, name: &str) -> Result<Option<AttrValue>> {
        let names = self.attr_names(path)?;
        if !names.iter().any(|n| n == name) {
            return Ok(None);
        }
        let location = format!("{}@{}", path, name);
        self.with_location(path, |loc| loc.attr(name))
            .and_then(|attr| read_value(&attr).map_err(|e| h5_err(&location, e)))
            .map(Some)
    }

    fn read(&self, path: &str) -> Result<AttrValue> {
        let dataset = self.file.dataset(path).map_err(|e| {
            if self.exists(path) {
                h5_err(path, e)
            } else {
                SweepError::MissingEntry(path.to_string())
            }
        })?;
        read_value(&dataset).map_err(|e| h5_err(path, e))
    }
}

/// Read a dataset or attribute into a flat value
fn read_value(container: &hdf5::Container) -> hdf5::Result<AttrValue> {
    let descriptor = container.dtype()?.to_descriptor()?;
    let scalar = container.ndim() == 0;

    match descriptor {
        TypeDescriptor::Integer(_)
        | TypeDescriptor::Unsigned(_)
        | TypeDescriptor::Boolean
        | TypeDescriptor::Enum(_) => {
            if scalar {
                Ok(AttrValue::Int(container.read_scalar::<i64>()?))
            } else {
                Ok(AttrValue::IntArray(container.read_raw::<i64>()?))
            }
        }
        TypeDescriptor::Float(_) => {
            if scalar {
                Ok(AttrValue::Float(container.read_scalar::<f64>()?))
            } else {
                Ok(AttrValue::FloatArray(container.read_raw::<f64>()?))
            }
        }
        TypeDescriptor::VarLenUnicode => {
            let values = container.read_raw::<VarLenUnicode>()?;
            Ok(text_value(scalar, values.iter().map(|s| s.as_str().to_string())))
        }
        TypeDescriptor::VarLenAscii => {
            let values = container.read_raw::<VarLenAscii>()?;
            Ok(text_value(scalar, values.iter().map(|s| s.as_str().to_string())))
        }
        TypeDescriptor::FixedAscii(_) => {
            let values = container.read_raw::<FixedAscii<MAX_FIXED_STRING>>()?;
            Ok(text_value(scalar, values.iter().map(|s| s.as_str().to_string())))
        }
        TypeDescriptor::FixedUnicode(_) => {
            let values = container.read_raw::<FixedUnicode<MAX_FIXED_STRING>>()?;
            Ok(text_value(scalar, values.iter().map(|s| s.as_str().to_string())))
        }
        other => Err(hdf5::Error::from(format!("unsupported datatype {:?}", other).as_str())),
    }
}

fn text_value(scalar: bool, values: impl Iterator<Item = String>) -> AttrValue {
    let mut values: Vec<String> = values
        .map(|s| s.trim_end_matches('\0').to_string())
        .collect();
    if scalar && values.len() == 1 {
        AttrValue::Text(values.remove(0))
    } else {
        AttrValue::TextArray(values)
    }
}
