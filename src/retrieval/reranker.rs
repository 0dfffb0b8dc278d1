//! Pairwise (query, passage) reranking of a candidate shortlist

use super::candidate::{RankedCandidate, RerankedCandidate};
use fastembed::{RerankInitOptions, RerankerModel, TextRerank};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum RerankError {
    #[error("Reranker initialization failed: {0}")]
    InitializationError(String),

    #[error("Reranking failed: {0}")]
    RerankingError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Scorer returned {actual} scores for {expected} pairs")]
    ScoreCountMismatch { expected: usize, actual: usize },

    #[error("Scorer returned non-finite score {score} for candidate {index}")]
    NonFiniteScore { index: usize, score: f32 },
}

/// Relevance scorer over (query, passage) pairs.
///
/// Returns one score per passage, in input order. Higher is more relevant.
pub trait PairwiseScorer: Send + Sync {
    fn score_pairs(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>, RerankError>;

    fn model_name(&self) -> &str;
}

/// Cross-encoder scorer backed by FastEmbed
pub struct CrossEncoderScorer {
    model: Arc<TextRerank>,
    model_name: String,
}

impl CrossEncoderScorer {
    /// Load a cross-encoder by name
    ///
    /// # Arguments
    /// * `model_name` - e.g. "BAAI/bge-reranker-base"
    pub fn new(model_name: &str) -> Result<Self, RerankError> {
        let model_kind = match model_name {
            "bge-reranker-base" | "BAAI/bge-reranker-base" => RerankerModel::BGERerankerBase,
            "bge-reranker-v2-m3" | "BAAI/bge-reranker-v2-m3" | "rozgo/bge-reranker-v2-m3" => {
                RerankerModel::BGERerankerV2M3
            }
            _ => {
                return Err(RerankError::InitializationError(format!(
                    "Unsupported reranker model: {}. Supported: bge-reranker-base, bge-reranker-v2-m3",
                    model_name
                )));
            }
        };

        info!("Initializing reranker model: {}", model_name);

        let init_options = RerankInitOptions::new(model_kind).with_show_download_progress(true);

        let model = TextRerank::try_new(init_options)
            .map_err(|e| RerankError::InitializationError(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            model_name: model_name.to_string(),
        })
    }

    /// Create scorer with default model
    pub fn with_default_model() -> Result<Self, RerankError> {
        Self::new("BAAI/bge-reranker-base")
    }
}

impl PairwiseScorer for CrossEncoderScorer {
    fn score_pairs(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>, RerankError> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let results = self
            .model
            .rerank(query, passages.to_vec(), false, Some(passages.len()))
            .map_err(|e| RerankError::RerankingError(e.to_string()))?;

        if results.len() != passages.len() {
            return Err(RerankError::ScoreCountMismatch {
                expected: passages.len(),
                actual: results.len(),
            });
        }

        // FastEmbed sorts by score; put scores back in input order
        let mut scores = vec![f32::NAN; passages.len()];
        for result in results {
            let slot = scores.get_mut(result.index).ok_or_else(|| {
                RerankError::RerankingError(format!(
                    "result index {} out of range for {} passages",
                    result.index,
                    passages.len()
                ))
            })?;
            *slot = result.score;
        }

        Ok(scores)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Reorders a shortlist by pairwise relevance.
///
/// The input order is kept as `original_rank` on every output record and
/// breaks ties between equal rerank scores.
#[derive(Clone)]
pub struct Reranker {
    scorer: Arc<dyn PairwiseScorer>,
    batch_size: usize,
}

impl Reranker {
    pub fn new(scorer: Arc<dyn PairwiseScorer>, batch_size: usize) -> Self {
        Self {
            scorer,
            batch_size: batch_size.max(1),
        }
    }

    pub fn model_name(&self) -> &str {
        self.scorer.model_name()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Score every candidate against `query` and sort descending.
    ///
    /// Empty input returns an empty list without calling the scorer. Any
    /// batch failure fails the whole call.
    pub fn rerank<C>(
        &self,
        query: &str,
        candidates: &[C],
        top_k: Option<usize>,
    ) -> Result<Vec<RerankedCandidate<C>>, RerankError>
    where
        C: RankedCandidate + Clone,
    {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        if query.trim().is_empty() {
            return Err(RerankError::InvalidInput(
                "Query cannot be empty".to_string(),
            ));
        }

        let passages: Vec<String> = candidates.iter().map(|c| c.document().passage()).collect();
        let mut scores = Vec::with_capacity(passages.len());

        for chunk in passages.chunks(self.batch_size) {
            let refs: Vec<&str> = chunk.iter().map(String::as_str).collect();
            let batch = self.scorer.score_pairs(query, &refs)?;
            if batch.len() != refs.len() {
                return Err(RerankError::ScoreCountMismatch {
                    expected: refs.len(),
                    actual: batch.len(),
                });
            }
            if let Some(offset) = batch.iter().position(|s| !s.is_finite()) {
                return Err(RerankError::NonFiniteScore {
                    index: scores.len() + offset,
                    score: batch[offset],
                });
            }
            scores.extend(batch);
        }

        let mut reranked: Vec<RerankedCandidate<C>> = candidates
            .iter()
            .zip(scores)
            .enumerate()
            .map(|(original_rank, (candidate, rerank_score))| RerankedCandidate {
                original_score: candidate.score(),
                candidate: candidate.clone(),
                rerank_score,
                original_rank,
            })
            .collect();

        reranked.sort_by(|a, b| b.rerank_score.total_cmp(&a.rerank_score));

        if let Some(k) = top_k {
            reranked.truncate(k);
        }

        debug!(
            "Reranked {} candidates with {}, kept {}",
            candidates.len(),
            self.scorer.model_name(),
            reranked.len()
        );

        Ok(reranked)
    }
}
