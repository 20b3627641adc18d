//! Cluster naming policy
//!
//! Cluster names end up in container host names, so they follow hostname rules
//! plus a length cap.

use thiserror::Error;

use super::MAX_CLUSTER_NAME_LEN;

#[derive(Error, Debug, PartialEq)]
pub enum NameError {
    #[error("Invalid cluster name: no name provided")]
    Empty,

    #[error("Invalid cluster name: '{0}' must not start or end with - (dash)")]
    DashAtEdge(String),

    #[error("Invalid cluster name: '{0}' contains characters other than 'Aa-Zz', '0-9' or '-'")]
    InvalidCharacters(String),

    #[error("Cluster name is too long ({0} > {max})", max = MAX_CLUSTER_NAME_LEN)]
    TooLong(usize),
}

/// Check a cluster name against the naming policy
pub fn check_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }

    if name.starts_with('-') || name.ends_with('-') {
        return Err(NameError::DashAtEdge(name.to_string()));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(NameError::InvalidCharacters(name.to_string()));
    }

    if name.len() > MAX_CLUSTER_NAME_LEN {
        return Err(NameError::TooLong(name.len()));
    }

    Ok(())
}
