//! NWB version detection
//!
//! Version 1 files store the marker as a root dataset, version 2 files as a
//! root attribute. Detection never fails: anything unrecognizable is reported
//! as [`NwbMajor::Unknown`] and the caller decides what to do with it.

use crate::store::Container;
use crate::types::{NwbMajor, VersionDescriptor};

/// Name of the version marker (dataset in v1, attribute in v2)
pub const VERSION_MARKER: &str = "nwb_version";

/// Inspect the version marker of an open file
pub fn detect_version(file: &dyn Container) -> VersionDescriptor {
    let dataset_path = format!("/{}", VERSION_MARKER);

    if file.exists(&dataset_path) {
        let full = match file.read(&dataset_path) {
            Ok(value) => value.as_text().map(str::to_string),
            Err(e) => {
                log::debug!("Unreadable version dataset: {}", e);
                None
            }
        };
        return match full {
            Some(version) if version.starts_with("NWB-1") => VersionDescriptor {
                major: NwbMajor::V1,
                full: Some(version),
            },
            other => VersionDescriptor::unknown(other),
        };
    }

    match file.attr("/", VERSION_MARKER) {
        Ok(Some(value)) => {
            let full = value.as_text().map(str::to_string);
            match full {
                Some(version) if version.starts_with('2') => VersionDescriptor {
                    major: NwbMajor::V2,
                    full: Some(version),
                },
                other => VersionDescriptor::unknown(other),
            }
        }
        Ok(None) => VersionDescriptor::unknown(None),
        Err(e) => {
            log::debug!("Unreadable version attribute: {}", e);
            VersionDescriptor::unknown(None)
        }
    }
}
