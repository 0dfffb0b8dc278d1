//! Lexical and dense indexes over the movie collection
//!
//! Architecture:
//! - `KeywordIndex`: in-memory BM25 over title + plot
//! - `EmbeddingProvider` trait for the query/document encoder
//! - `EmbeddingMatrix`: exhaustive cosine similarity over unit-norm rows
//! - `BatchEncoder`: builds the matrix at startup when none is supplied
//! - `SearchIndex`: the immutable snapshot both scorers read from

mod batch;
mod keyword_index;
mod provider;
mod tokenizer;
mod vector_index;

pub use batch::{BatchEncoder, BatchResult};
pub use keyword_index::{Bm25Params, KeywordIndex};
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};
pub use tokenizer::tokenize;
pub use vector_index::EmbeddingMatrix;

use crate::config::CorpusConfig;
use crate::corpus::{load_collection, Collection};
use std::sync::Arc;
use tracing::info;

/// A scorer hit: collection position and scorer-specific raw score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub index: usize,
    pub score: f32,
}

/// Read-only state shared by every query: the collection plus both indexes
/// built over it. Replaced as a whole on reload, never mutated.
#[derive(Debug)]
pub struct SearchIndex {
    collection: Collection,
    keywords: KeywordIndex,
    vectors: EmbeddingMatrix,
}

impl SearchIndex {
    /// Build the keyword index and pair it with precomputed embeddings.
    ///
    /// The embedding matrix must have exactly one row per document.
    pub fn new(
        collection: Collection,
        vectors: EmbeddingMatrix,
        bm25: Bm25Params,
    ) -> Result<Self, EmbeddingError> {
        if vectors.len() != collection.len() {
            return Err(EmbeddingError::RowCountMismatch {
                rows: vectors.len(),
                documents: collection.len(),
            });
        }

        let keywords = KeywordIndex::build(&collection, bm25);

        Ok(Self {
            collection,
            keywords,
            vectors,
        })
    }

    /// Load the configured corpus and pair it with its embeddings: the
    /// precomputed rows when a path is configured, otherwise rows encoded
    /// now with `provider`.
    pub fn open(
        corpus: &CorpusConfig,
        bm25: Bm25Params,
        provider: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
    ) -> crate::Result<Self> {
        let collection = load_collection(&corpus.documents)?;

        let vectors = match &corpus.embeddings {
            Some(path) => {
                info!("Loading precomputed embeddings from {}", path.display());
                EmbeddingMatrix::load_json(path)?
            }
            None => BatchEncoder::new(provider.clone(), batch_size)
                .encode(&collection)?
                .0,
        };

        if !vectors.is_empty() && vectors.dimension() != provider.dimension() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: provider.dimension(),
                actual: vectors.dimension(),
            }
            .into());
        }

        Ok(Self::new(collection, vectors, bm25)?)
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn keywords(&self) -> &KeywordIndex {
        &self.keywords
    }

    pub fn vectors(&self) -> &EmbeddingMatrix {
        &self.vectors
    }
}
