// Database module
// Dual artifact store: LanceDB for vectors, a JSON file for chunk metadata

pub mod lancedb;
pub mod metadata;

pub use self::lancedb::{EmbeddingRecord, INDEX_DIR_NAME, SearchHit, VectorStore};
pub use metadata::{METADATA_FILE_NAME, Metadata};
