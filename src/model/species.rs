//! Species index-to-label mapping.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Bijective mapping from dense class indices to species labels.
///
/// Indices are exactly `0..N-1` for N species. The mapping is built once,
/// at model load or training time, and is immutable afterwards.
#[derive(Debug, Clone)]
pub struct SpeciesMap {
    labels: Vec<String>,
}

impl SpeciesMap {
    /// Build a mapping from an ordered list of species labels.
    ///
    /// Label at position `i` is assigned class index `i`.
    pub fn from_labels(labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::SpeciesMapInvalid {
                message: "species list is empty".to_string(),
            });
        }
        Ok(Self { labels })
    }

    /// Load a mapping from a JSON object of string-encoded integer keys to
    /// species names, e.g. `{"0": "lion", "1": "elephant"}`.
    ///
    /// Keys are coerced to integers and must form exactly `0..N-1`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::SpeciesMapRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let raw: HashMap<String, String> =
            serde_json::from_str(&contents).map_err(|e| Error::SpeciesMapParse {
                path: path.to_path_buf(),
                source: e,
            })?;

        let mut indexed: Vec<(usize, String)> = Vec::with_capacity(raw.len());
        for (key, label) in raw {
            let index = key.parse::<usize>().map_err(|_| Error::SpeciesMapInvalid {
                message: format!("key '{key}' is not a non-negative integer"),
            })?;
            indexed.push((index, label));
        }
        indexed.sort_by_key(|(index, _)| *index);

        if indexed.is_empty() {
            return Err(Error::SpeciesMapInvalid {
                message: "species mapping is empty".to_string(),
            });
        }

        for (expected, (index, _)) in indexed.iter().enumerate() {
            if *index != expected {
                return Err(Error::SpeciesMapInvalid {
                    message: format!(
                        "indices must be exactly 0..{}, found {index} where {expected} was expected",
                        indexed.len()
                    ),
                });
            }
        }

        Ok(Self {
            labels: indexed.into_iter().map(|(_, label)| label).collect(),
        })
    }

    /// Number of species classes.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the mapping is empty. Never true for a constructed map.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for a class index, if in range.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// All labels in class-index order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}
