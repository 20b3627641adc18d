//! Attachment maps - repeated `--volume` / `--port` flags grouped by resource
//!
//! Each entry maps a normalized resource spec to the node filter terms that
//! requested it. Entries keep the order in which a spec was first seen.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum AttachmentError {
    #[error("Same port mapping '{0}' can not be used for multiple nodes")]
    DuplicatePort(String),

    #[error("Can only apply port mapping '{0}' to one node filter, got {1}")]
    TooManyPortFilters(String, usize),
}

/// A resource spec and the filters selecting its target nodes
///
/// An empty filter list selects every candidate node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub spec: String,
    pub filters: Vec<String>,
}

/// Insertion-ordered map from resource spec to filter terms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttachmentMap {
    entries: Vec<Attachment>,
}

impl AttachmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, spec: &str) -> Option<&Attachment> {
        self.entries.iter().find(|a| a.spec == spec)
    }

    pub fn contains(&self, spec: &str) -> bool {
        self.get(spec).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a spec, merging filters into an existing entry
    ///
    /// Filters are unioned without duplicates; an occurrence without filters
    /// adds nothing to an existing entry.
    pub fn merge(&mut self, spec: String, filters: Vec<String>) {
        match self.entries.iter_mut().find(|a| a.spec == spec) {
            Some(existing) => {
                for filter in filters {
                    if !existing.filters.contains(&filter) {
                        existing.filters.push(filter);
                    }
                }
            }
            None => self.entries.push(Attachment { spec, filters }),
        }
    }

    /// Add a spec that must not be present yet
    pub fn insert_unique(&mut self, spec: String, filters: Vec<String>) -> Result<(), AttachmentError> {
        if self.contains(&spec) {
            return Err(AttachmentError::DuplicatePort(spec));
        }
        self.entries.push(Attachment { spec, filters });
        Ok(())
    }
}

impl<'a> IntoIterator for &'a AttachmentMap {
    type Item = &'a Attachment;
    type IntoIter = std::slice::Iter<'a, Attachment>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Fold validated volume flags into a map, merging repeated mounts
pub fn build_volume_map(volumes: impl IntoIterator<Item = (String, Vec<String>)>) -> AttachmentMap {
    let mut map = AttachmentMap::new();
    for (spec, filters) in volumes {
        map.merge(spec, filters);
    }
    map
}

/// Fold validated port flags into a map
///
/// A port mapping names at most one filter term and appears at most once.
pub fn build_port_map(
    ports: impl IntoIterator<Item = (String, Vec<String>)>,
) -> Result<AttachmentMap, AttachmentError> {
    let mut map = AttachmentMap::new();
    for (spec, filters) in ports {
        if filters.len() > 1 {
            return Err(AttachmentError::TooManyPortFilters(spec, filters.len()));
        }
        map.insert_unique(spec, filters)?;
    }
    Ok(map)
}
