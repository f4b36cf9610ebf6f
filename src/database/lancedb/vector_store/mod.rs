
use super::EmbeddingRecord;
use crate::RagError;
use crate::embeddings::dot;
use arrow::array::{Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatchIterator};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Directory name of the LanceDB dataset inside an index directory
pub const INDEX_DIR_NAME: &str = "index.lance";
const TABLE_NAME: &str = "chunks";
/// Schema metadata key holding the name of the model that produced the vectors
const EMBEDDING_MODEL_KEY: &str = "embedding_model";

/// Exact inner-product index over chunk embeddings.
///
/// Every row carries the chunk id next to its vector, so search results do
/// not depend on insertion order. The table schema records which embedding
/// model wrote the vectors.
pub struct VectorStore {
    #[expect(dead_code, reason = "keeps the dataset connection open for the table")]
    connection: Connection,
    table: Table,
    dimension: usize,
    embedding_model: Option<String>,
}

/// A single nearest-neighbor match
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Chunk id stored with the vector
    pub id: u64,
    /// Inner product with the query, cosine similarity for unit vectors
    pub score: f32,
}

impl VectorStore {
    /// Build a fresh index at `path`, replacing any previous one
    ///
    /// # Arguments
    /// * `path` - Dataset directory to create
    /// * `dimension` - Length every vector must have
    /// * `embedding_model` - Model that produced the vectors
    /// * `records` - Rows to insert, in chunk order
    #[inline]
    pub async fn create(
        path: &Path,
        dimension: usize,
        embedding_model: &str,
        records: &[EmbeddingRecord],
    ) -> Result<Self, RagError> {
        if records.is_empty() {
            return Err(RagError::Index(
                "Cannot build an index without vectors".to_string(),
            ));
        }

        if path.exists() {
            info!("Removing previous index at {}", path.display());
            std::fs::remove_dir_all(path).map_err(|e| {
                RagError::Index(format!(
                    "Failed to remove previous index at {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }
        std::fs::create_dir_all(path).map_err(|e| {
            RagError::Index(format!("Failed to create index directory: {}", e))
        })?;

        let connection = Self::connect(path).await?;
        let batch = create_record_batch(dimension, embedding_model, records)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);

        let table = connection
            .create_table(TABLE_NAME, reader)
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to create table: {}", e)))?;

        info!(
            "Created index with {} vectors of dimension {} from model {} at {}",
            records.len(),
            dimension,
            embedding_model,
            path.display()
        );

        Ok(Self {
            connection,
            table,
            dimension,
            embedding_model: Some(embedding_model.to_string()),
        })
    }

    /// Open an index previously written by [`VectorStore::create`]
    #[inline]
    pub async fn open(path: &Path) -> Result<Self, RagError> {
        if !path.is_dir() {
            return Err(RagError::Index(format!(
                "Index not found at {}",
                path.display()
            )));
        }

        let connection = Self::connect(path).await?;
        let table = connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to open table: {}", e)))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| RagError::Index(format!("Failed to get table schema: {}", e)))?;
        let dimension = detect_vector_dimension(&schema)?;
        let embedding_model = schema.metadata().get(EMBEDDING_MODEL_KEY).cloned();
        debug!(
            "Opened index at {} with vector dimension {} from model {:?}",
            path.display(),
            dimension,
            embedding_model
        );

        Ok(Self {
            connection,
            table,
            dimension,
            embedding_model,
        })
    }

    async fn connect(path: &Path) -> Result<Connection, RagError> {
        let uri = path.to_string_lossy();
        lancedb::connect(uri.as_ref())
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to connect to LanceDB: {}", e)))
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Model recorded when the index was built, if any
    #[inline]
    pub fn embedding_model(&self) -> Option<&str> {
        self.embedding_model.as_deref()
    }

    /// Number of vectors stored
    #[inline]
    pub async fn count(&self) -> Result<usize, RagError> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Index(format!("Failed to count rows: {}", e)))
    }

    /// Exact top-k search by inner product, best match first
    #[inline]
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, RagError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != self.dimension {
            return Err(RagError::Index(format!(
                "Query has dimension {} but the index has dimension {}",
                query.len(),
                self.dimension
            )));
        }

        debug!("Searching for {} nearest vectors", k);

        let mut results = self
            .table
            .vector_search(query)
            .map_err(|e| RagError::Index(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Dot)
            .bypass_vector_index()
            .limit(k)
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to execute search: {}", e)))?;

        let mut hits = Vec::with_capacity(k);
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| RagError::Index(format!("Failed to read result stream: {}", e)))?
        {
            hits.extend(parse_search_batch(&batch, query)?);
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);

        debug!("Search returned {} hits", hits.len());
        Ok(hits)
    }
}

fn create_schema(dimension: usize, embedding_model: &str) -> Arc<Schema> {
    let fields = vec![
        Field::new("id", DataType::Int64, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dimension as i32,
            ),
            false,
        ),
    ];
    let metadata = HashMap::from([(
        EMBEDDING_MODEL_KEY.to_string(),
        embedding_model.to_string(),
    )]);

    Arc::new(Schema::new_with_metadata(fields, metadata))
}

fn create_record_batch(
    dimension: usize,
    embedding_model: &str,
    records: &[EmbeddingRecord],
) -> Result<RecordBatch, RagError> {
    let mut ids = Vec::with_capacity(records.len());
    let mut flat_values = Vec::with_capacity(records.len() * dimension);

    for record in records {
        if record.vector.len() != dimension {
            return Err(RagError::Index(format!(
                "Vector for chunk {} has dimension {}, expected {}",
                record.id,
                record.vector.len(),
                dimension
            )));
        }
        let id = i64::try_from(record.id)
            .map_err(|_| RagError::Index(format!("Chunk id {} out of range", record.id)))?;
        ids.push(id);
        flat_values.extend_from_slice(&record.vector);
    }

    let field = Arc::new(Field::new("item", DataType::Float32, true));
    let vector_array = FixedSizeListArray::try_new(
        field,
        dimension as i32,
        Arc::new(Float32Array::from(flat_values)),
        None,
    )
    .map_err(|e| RagError::Index(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![Arc::new(Int64Array::from(ids)), Arc::new(vector_array)];

    RecordBatch::try_new(create_schema(dimension, embedding_model), arrays)
        .map_err(|e| RagError::Index(format!("Failed to create record batch: {}", e)))
}

/// Read the vector dimension from the table schema
fn detect_vector_dimension(schema: &Schema) -> Result<usize, RagError> {
    for field in schema.fields() {
        if field.name() == "vector" {
            if let DataType::FixedSizeList(_, size) = field.data_type() {
                return usize::try_from(*size)
                    .map_err(|_| RagError::Index(format!("Invalid vector dimension {}", size)));
            }
        }
    }

    Err(RagError::Index(
        "Could not find vector column or determine dimension".to_string(),
    ))
}

/// Turn a result batch into hits, scoring each row against the query
fn parse_search_batch(batch: &RecordBatch, query: &[f32]) -> Result<Vec<SearchHit>, RagError> {
    let ids = batch
        .column_by_name("id")
        .ok_or_else(|| RagError::Index("Missing id column".to_string()))?
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| RagError::Index("Invalid id column type".to_string()))?;

    let vectors = batch
        .column_by_name("vector")
        .ok_or_else(|| RagError::Index("Missing vector column".to_string()))?
        .as_any()
        .downcast_ref::<FixedSizeListArray>()
        .ok_or_else(|| RagError::Index("Invalid vector column type".to_string()))?;

    let mut hits = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let id = u64::try_from(ids.value(row))
            .map_err(|_| RagError::Index(format!("Negative chunk id {}", ids.value(row))))?;

        let row_values = vectors.value(row);
        let values = row_values
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| RagError::Index("Invalid vector element type".to_string()))?;

        hits.push(SearchHit {
            id,
            score: dot(values.values(), query),
        });
    }

    Ok(hits)
}
