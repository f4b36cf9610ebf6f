
use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::database::{INDEX_DIR_NAME, METADATA_FILE_NAME, Metadata, VectorStore};
use crate::embeddings::{Embedder, normalize_l2, same_model};
use crate::{RagError, Result};

/// A chunk returned for a query, with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub id: u64,
    pub text: String,
    pub score: f32,
}

/// Loaded index, metadata and the embedder that produced them.
///
/// Built once and never mutated, so it can be shared by reference with any
/// number of front ends.
pub struct Retriever<E: Embedder> {
    store: VectorStore,
    metadata: Metadata,
    positions: HashMap<u64, usize>,
    embedder: E,
}

impl<E: Embedder> Retriever<E> {
    /// Open `index_dir` as written by the index builder and verify the index
    /// and metadata describe the same chunks. The embedder must use the model
    /// the index was built with.
    #[inline]
    pub async fn open(index_dir: &Path, embedder: E) -> Result<Self> {
        let metadata = Metadata::load(index_dir.join(METADATA_FILE_NAME))?;
        let store = VectorStore::open(&index_dir.join(INDEX_DIR_NAME)).await?;

        let rows = store.count().await?;
        if rows != metadata.len() {
            return Err(RagError::Index(format!(
                "Index holds {} vectors but metadata lists {} chunks",
                rows,
                metadata.len()
            )));
        }

        if store.dimension() != metadata.dim {
            return Err(RagError::Index(format!(
                "Index dimension {} does not match metadata dimension {}",
                store.dimension(),
                metadata.dim
            )));
        }

        match store.embedding_model() {
            Some(recorded) if !same_model(recorded, embedder.model_name()) => {
                return Err(RagError::Embedding(format!(
                    "Index was built with embedding model '{}' but queries would be embedded with '{}'",
                    recorded,
                    embedder.model_name()
                )));
            }
            Some(_) => {}
            None => warn!(
                "Index at {} does not record its embedding model; assuming {}",
                index_dir.display(),
                embedder.model_name()
            ),
        }

        let positions = metadata
            .ids
            .iter()
            .enumerate()
            .map(|(position, id)| (*id, position))
            .collect();

        info!(
            "Loaded index with {} chunks (dim {}) from {}",
            rows,
            metadata.dim,
            index_dir.display()
        );

        Ok(Self {
            store,
            metadata,
            positions,
            embedder,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.metadata.dim
    }

    /// Top `k` chunks for `query`, most similar first
    #[inline]
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut vector = self
            .embedder
            .embed(query)
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;

        if vector.len() != self.metadata.dim {
            return Err(RagError::Embedding(format!(
                "Query embedding has dimension {} but the index has dimension {}",
                vector.len(),
                self.metadata.dim
            )));
        }
        normalize_l2(&mut vector);

        let hits = self.store.search(&vector, k).await?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(&position) = self.positions.get(&hit.id) else {
                warn!("Index returned chunk id {} missing from metadata", hit.id);
                continue;
            };
            results.push(RetrievedChunk {
                id: hit.id,
                text: self.metadata.texts[position].clone(),
                score: hit.score,
            });
        }

        debug!(
            "Retrieved {} chunks for query of {} chars",
            results.len(),
            query.len()
        );
        Ok(results)
    }
}
