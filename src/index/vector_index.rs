/// Dense embedding matrix for exhaustive cosine-similarity search
use super::{EmbeddingError, SearchHit};
use crate::corpus::Collection;
use crate::filtering::MetadataFilter;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::path::Path;

/// Added to every norm before dividing, so near-zero rows stay finite
const NORM_EPSILON: f32 = 1e-12;

/// Unit-normalized document embeddings, one row per collection position.
///
/// Since rows and query are unit vectors, cosine similarity is a single
/// matrix-vector product. All-zero rows are remembered and never match.
#[derive(Debug, Clone)]
pub struct EmbeddingMatrix {
    matrix: Array2<f32>,
    zero_rows: Vec<bool>,
}

impl EmbeddingMatrix {
    /// Build from an (N, D) array, normalizing each row
    pub fn from_array(mut matrix: Array2<f32>) -> Self {
        let mut zero_rows = Vec::with_capacity(matrix.nrows());
        for mut row in matrix.axis_iter_mut(Axis(0)) {
            let norm = l2_norm(row.view());
            zero_rows.push(norm == 0.0);
            row.mapv_inplace(|x| x / (norm + NORM_EPSILON));
        }

        let zero_count = zero_rows.iter().filter(|z| **z).count();
        if zero_count > 0 {
            tracing::warn!(
                "{} document embeddings are all-zero and will never match",
                zero_count
            );
        }

        Self { matrix, zero_rows }
    }

    /// Build from row vectors; every row must share one dimension
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, EmbeddingError> {
        let dimension = rows.first().map(Vec::len).unwrap_or(0);
        let count = rows.len();
        let mut flat = Vec::with_capacity(count * dimension);

        for row in rows {
            if row.len() != dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: dimension,
                    actual: row.len(),
                });
            }
            flat.extend(row);
        }

        let matrix = Array2::from_shape_vec((count, dimension), flat)
            .map_err(|e| EmbeddingError::InvalidInput(e.to_string()))?;
        Ok(Self::from_array(matrix))
    }

    /// Load precomputed rows stored as a JSON array of arrays, aligned
    /// with collection order
    pub fn load_json(path: &Path) -> Result<Self, EmbeddingError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EmbeddingError::Storage(format!("{}: {}", path.display(), e)))?;
        let rows: Vec<Vec<f32>> = serde_json::from_str(&content)
            .map_err(|e| EmbeddingError::Storage(format!("{}: {}", path.display(), e)))?;
        Self::from_rows(rows)
    }

    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }

    pub fn dimension(&self) -> usize {
        self.matrix.ncols()
    }

    /// Cosine similarity of a query against every row.
    ///
    /// All-zero rows (and every row, for an all-zero query) score
    /// negative infinity.
    pub fn similarities(&self, query: &[f32]) -> Result<Vec<f32>, EmbeddingError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        if query.len() != self.dimension() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension(),
                actual: query.len(),
            });
        }

        let query = Array1::from_vec(query.to_vec());
        let norm = l2_norm(query.view());
        if norm == 0.0 {
            return Ok(vec![f32::NEG_INFINITY; self.len()]);
        }
        let query = query / (norm + NORM_EPSILON);

        let scores = self.matrix.dot(&query);
        Ok(scores
            .iter()
            .zip(&self.zero_rows)
            .map(|(&score, &zero)| if zero { f32::NEG_INFINITY } else { score })
            .collect())
    }

    /// Top-K rows by similarity after filtering.
    ///
    /// Sorted by similarity descending; equal scores keep collection order.
    pub fn search(
        &self,
        collection: &Collection,
        query: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<SearchHit>, EmbeddingError> {
        let scores = self.similarities(query)?;

        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .enumerate()
            .filter(|(_, score)| score.is_finite())
            .filter(|&(index, _)| {
                collection
                    .get(index)
                    .map(|document| filter.matches(document))
                    .unwrap_or(false)
            })
            .map(|(index, score)| SearchHit { index, score })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }
}

fn l2_norm(v: ArrayView1<f32>) -> f32 {
    v.dot(&v).sqrt()
}
