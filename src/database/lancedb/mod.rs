// LanceDB vector database module
// Flat exact inner-product search over normalized chunk embeddings

pub mod vector_store;

pub use vector_store::{INDEX_DIR_NAME, SearchHit, VectorStore};

/// One row of the similarity index: a chunk id and its unit-length vector
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub id: u64,
    pub vector: Vec<f32>,
}
