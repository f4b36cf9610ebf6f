// Indexer module
// Embeds chunks offline and writes the vector index plus its metadata store


use std::path::{Path, PathBuf};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::chunker::{Chunk, load_chunks};
use crate::database::{EmbeddingRecord, INDEX_DIR_NAME, METADATA_FILE_NAME, Metadata, VectorStore};
use crate::embeddings::{Embedder, normalize_l2};
use crate::{RagError, Result};

const DEFAULT_BATCH_SIZE: usize = 64;

/// What a completed build wrote to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub chunks: usize,
    pub dim: usize,
    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
}

/// Turns a chunk list into a searchable index directory
pub struct IndexBuilder<'a, E: Embedder> {
    embedder: &'a E,
    batch_size: usize,
}

impl<'a, E: Embedder> IndexBuilder<'a, E> {
    #[inline]
    pub fn new(embedder: &'a E) -> Self {
        Self {
            embedder,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Number of chunk texts sent to the embedder at once
    #[inline]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Load a chunk file and build the index from it
    #[inline]
    pub async fn build_from_file(&self, chunks_path: &Path, out_dir: &Path) -> Result<BuildSummary> {
        let chunks = load_chunks(chunks_path)?;
        info!(
            "Loaded {} chunks from {}",
            chunks.len(),
            chunks_path.display()
        );
        self.build(&chunks, out_dir).await
    }

    /// Embed every chunk, then write `index.lance/` and `metadatas.json` into
    /// `out_dir`, replacing any previous build
    #[inline]
    pub async fn build(&self, chunks: &[Chunk], out_dir: &Path) -> Result<BuildSummary> {
        if chunks.is_empty() {
            return Err(RagError::Index(
                "No chunks to index; run the chunk step first".to_string(),
            ));
        }

        info!(
            "Embedding {} chunks with model {}",
            chunks.len(),
            self.embedder.model_name()
        );

        let vectors = self.embed_all(chunks)?;
        let dim = vectors.first().map_or(0, Vec::len);
        if dim == 0 {
            return Err(RagError::Embedding(
                "Embedding model returned empty vectors".to_string(),
            ));
        }

        let records = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddingRecord {
                id: chunk.id,
                vector,
            })
            .collect::<Vec<_>>();

        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

        let index_path = out_dir.join(INDEX_DIR_NAME);
        let store =
            VectorStore::create(&index_path, dim, self.embedder.model_name(), &records).await?;
        let rows = store.count().await?;

        let metadata = Metadata::from_chunks(chunks, dim);
        metadata.validate()?;
        if rows != metadata.len() {
            return Err(RagError::Index(format!(
                "Index holds {} rows but {} chunks were embedded",
                rows,
                metadata.len()
            )));
        }

        let metadata_path = out_dir.join(METADATA_FILE_NAME);
        metadata.save(&metadata_path)?;

        info!(
            "Built index of {} vectors (dim {}) in {}",
            rows,
            dim,
            out_dir.display()
        );

        Ok(BuildSummary {
            chunks: rows,
            dim,
            index_path,
            metadata_path,
        })
    }

    /// Embed chunk texts batch by batch and normalize each vector
    fn embed_all(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let bar = if console::user_attended_stderr() {
            ProgressBar::new(chunks.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding chunks")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let batch_vectors = self
                .embedder
                .embed_batch(&texts)
                .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;

            if batch_vectors.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "Embedder returned {} vectors for {} texts",
                    batch_vectors.len(),
                    batch.len()
                )));
            }

            for mut vector in batch_vectors {
                if let Some(first) = vectors.first() {
                    if vector.len() != first.len() {
                        return Err(RagError::Embedding(format!(
                            "Inconsistent embedding dimension: {} vs {}",
                            vector.len(),
                            first.len()
                        )));
                    }
                }
                normalize_l2(&mut vector);
                vectors.push(vector);
            }

            bar.inc(batch.len() as u64);
            debug!("Embedded {}/{} chunks", vectors.len(), chunks.len());
        }

        bar.finish_and_clear();
        Ok(vectors)
    }
}
