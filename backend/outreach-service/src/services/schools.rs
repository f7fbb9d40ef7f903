/// School id -> display name lookup, loaded from a JSON data file
///
/// The file is a flat object: `{ "uga": "University of Georgia", ... }`.
/// Keys are matched case-insensitively.
use crate::error::{OutreachError, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct SchoolDirectory {
    names: HashMap<String, String>,
}

impl SchoolDirectory {
    pub fn from_map(names: HashMap<String, String>) -> Self {
        Self {
            names: names
                .into_iter()
                .map(|(id, name)| (id.trim().to_lowercase(), name))
                .collect(),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let names: HashMap<String, String> = serde_json::from_str(raw).map_err(|e| {
            OutreachError::Configuration(format!("Invalid school directory: {}", e))
        })?;
        Ok(Self::from_map(names))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            OutreachError::Configuration(format!(
                "Failed to read school directory {}: {}",
                path.display(),
                e
            ))
        })?;
        let directory = Self::from_json_str(&raw)?;
        info!(path = %path.display(), schools = directory.len(), "School directory loaded");
        Ok(directory)
    }

    pub fn get(&self, school_id: &str) -> Option<&str> {
        self.names
            .get(&school_id.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Display name for `school_id`, falling back to the id itself
    pub fn name_for<'a>(&'a self, school_id: &'a str) -> &'a str {
        self.get(school_id).unwrap_or(school_id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
