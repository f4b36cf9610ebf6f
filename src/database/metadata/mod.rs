
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::chunker::Chunk;
use crate::{RagError, Result};

pub const METADATA_FILE_NAME: &str = "metadatas.json";

/// Chunk identity and text kept next to the vector index.
///
/// `ids` and `texts` are parallel arrays in index insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub ids: Vec<u64>,
    pub texts: Vec<String>,
    pub dim: usize,
}

impl Metadata {
    #[inline]
    pub fn from_chunks(chunks: &[Chunk], dim: usize) -> Self {
        Self {
            ids: chunks.iter().map(|c| c.id).collect(),
            texts: chunks.iter().map(|c| c.text.clone()).collect(),
            dim,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Check the parallel arrays line up and ids are unique
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.ids.len() != self.texts.len() {
            return Err(RagError::Index(format!(
                "Metadata has {} ids but {} texts",
                self.ids.len(),
                self.texts.len()
            )));
        }

        if self.dim == 0 {
            return Err(RagError::Index(
                "Metadata dimension must be positive".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.ids.len());
        if let Some(duplicate) = self.ids.iter().find(|id| !seen.insert(**id)) {
            return Err(RagError::Index(format!(
                "Metadata contains duplicate chunk id {}",
                duplicate
            )));
        }

        Ok(())
    }

    /// Rebuild chunk records in stored order
    #[inline]
    pub fn to_chunks(&self) -> Vec<Chunk> {
        self.ids
            .iter()
            .zip(&self.texts)
            .map(|(id, text)| Chunk {
                id: *id,
                text: text.clone(),
            })
            .collect()
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RagError::Index(format!(
                "Failed to read metadata file {}: {}",
                path.display(),
                e
            ))
        })?;

        let metadata: Self = serde_json::from_str(&content).map_err(|e| {
            RagError::Index(format!(
                "Failed to parse metadata file {}: {}",
                path.display(),
                e
            ))
        })?;
        metadata.validate()?;

        debug!(
            "Loaded metadata for {} chunks (dim {}) from {}",
            metadata.len(),
            metadata.dim,
            path.display()
        );
        Ok(metadata)
    }

    #[inline]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RagError::Index(format!("Failed to serialize metadata: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }
}
