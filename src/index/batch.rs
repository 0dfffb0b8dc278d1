/// Batch encoding of the whole collection into an embedding matrix
use super::{EmbeddingError, EmbeddingMatrix, EmbeddingProvider};
use crate::corpus::Collection;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Result of a corpus encoding run
#[derive(Debug)]
pub struct BatchResult {
    pub processed: usize,
    pub batches: usize,
    pub duration_ms: u64,
}

/// Encodes document texts in fixed-size batches.
///
/// Used when no precomputed embeddings are supplied: the matrix is built
/// once at startup and then treated as read-only.
pub struct BatchEncoder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl BatchEncoder {
    /// Create a new batch encoder
    ///
    /// # Arguments
    /// * `provider` - Embedding provider
    /// * `batch_size` - Number of documents to embed in one call
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
        }
    }

    /// Encode every document in collection order.
    ///
    /// Any batch failure aborts the run; a partially encoded matrix would
    /// misalign rows with collection positions.
    pub fn encode(
        &self,
        collection: &Collection,
    ) -> Result<(EmbeddingMatrix, BatchResult), EmbeddingError> {
        let start = Instant::now();
        let texts: Vec<String> = collection.iter().map(|d| d.embedding_text()).collect();

        info!(
            "Encoding {} documents with {} (batch size {})",
            texts.len(),
            self.provider.model_name(),
            self.batch_size
        );

        let mut rows = Vec::with_capacity(texts.len());
        let mut batches = 0;

        for chunk in texts.chunks(self.batch_size) {
            let embeddings = self.provider.embed_batch(chunk)?;
            if embeddings.len() != chunk.len() {
                return Err(EmbeddingError::GenerationError(format!(
                    "batch {} returned {} embeddings for {} texts",
                    batches,
                    embeddings.len(),
                    chunk.len()
                )));
            }
            rows.extend(embeddings);
            batches += 1;
            debug!("Encoded {}/{} documents", rows.len(), texts.len());
        }

        let matrix = if rows.is_empty() {
            EmbeddingMatrix::from_array(ndarray::Array2::zeros((0, self.provider.dimension())))
        } else {
            EmbeddingMatrix::from_rows(rows)?
        };

        let result = BatchResult {
            processed: matrix.len(),
            batches,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Encoded {} documents in {} batches ({}ms)",
            result.processed, result.batches, result.duration_ms
        );

        Ok((matrix, result))
    }
}
