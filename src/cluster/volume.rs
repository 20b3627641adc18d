//! Volume mount validation
//!
//! Accepted form is `[SRC:]DEST[:MODE]`. SRC is either an absolute host path or
//! the name of a volume that already exists in the container runtime.

use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum VolumeError {
    #[error("Invalid volume mount '{0}': maximal 2 ':' allowed")]
    TooManySeparators(String),

    #[error("Invalid volume mount '{0}': SRC and DEST must not be empty")]
    EmptyPart(String),

    #[error("Invalid volume mount '{mount}': SRC ({src}) must be absolute path or name of existing volume")]
    InvalidSource { mount: String, src: String },

    #[error("Volume mount destination doesn't appear to be an absolute path: '{dest}' in '{mount}'")]
    RelativeDestination { mount: String, dest: String },

    #[error("Invalid volume mount '{mount}': unknown mode '{mode}' (expected 'ro' or 'rw')")]
    InvalidMode { mount: String, mode: String },
}

/// Named volumes known to the container runtime
pub trait VolumeLookup {
    fn volume_exists(&self, name: &str) -> bool;
}

/// Lookup used without a runtime connection: no named volume exists
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNamedVolumes;

impl VolumeLookup for NoNamedVolumes {
    fn volume_exists(&self, _name: &str) -> bool {
        false
    }
}

/// Validate a volume mount and return it in `SRC:DEST[:MODE]` form
pub fn validate_volume_mount(
    volumes: &dyn VolumeLookup,
    mount: &str,
) -> Result<String, VolumeError> {
    let parts: Vec<&str> = mount.split(':').collect();

    let (src, dest, mode) = match parts.as_slice() {
        [src] => (*src, *src, None),
        [src, dest] => (*src, *dest, None),
        [src, dest, mode] => (*src, *dest, Some(*mode)),
        _ => return Err(VolumeError::TooManySeparators(mount.to_string())),
    };

    if src.is_empty() || dest.is_empty() {
        return Err(VolumeError::EmptyPart(mount.to_string()));
    }

    if !Path::new(src).is_absolute() && !volumes.volume_exists(src) {
        return Err(VolumeError::InvalidSource {
            mount: mount.to_string(),
            src: src.to_string(),
        });
    }

    if !dest.starts_with('/') {
        return Err(VolumeError::RelativeDestination {
            mount: mount.to_string(),
            dest: dest.to_string(),
        });
    }

    match mode {
        None => Ok(format!("{}:{}", src, dest)),
        Some(mode @ ("ro" | "rw")) => Ok(format!("{}:{}:{}", src, dest, mode)),
        Some(mode) => Err(VolumeError::InvalidMode {
            mount: mount.to_string(),
            mode: mode.to_string(),
        }),
    }
}
