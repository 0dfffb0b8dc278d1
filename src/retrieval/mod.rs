//! Hybrid retrieval: lexical + vector scoring, rank fusion, reranking
//!
//! Both scorers see the same `MetadataFilter`, their ranked lists are
//! merged with weighted Reciprocal Rank Fusion (fixed or per-query
//! adaptive weights), and the fused shortlist can be reordered by a
//! pairwise cross-encoder.

mod candidate;
mod characterizer;
mod fusion;
mod hybrid;
mod reranker;

pub use candidate::{FusedCandidate, RankedCandidate, RerankedCandidate, ScoredCandidate, ScorerKind};
pub use characterizer::{CharacterizerConfig, QueryCharacterizer, QueryProfile};
pub use fusion::{
    reciprocal_rank_fusion, FusionEngine, FusionError, FusionOutcome, FusionWeights, WeightMode,
    DEFAULT_RRF_K,
};
pub use hybrid::{lexical_candidates, vector_candidates, HybridSearcher};
pub use reranker::{CrossEncoderScorer, PairwiseScorer, RerankError, Reranker};

use crate::filtering::MetadataFilter;
use serde::{Deserialize, Serialize};

/// What to do when one scorer fails during a fused query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the whole query
    #[default]
    Abort,
    /// Fuse the surviving scorer's list alone and report the degradation
    DegradeToSurvivor,
}

/// Fused search request
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Query text
    pub text: String,

    /// Maximum number of results
    pub limit: usize,

    /// Metadata constraints applied inside both scorers
    pub filter: MetadataFilter,

    /// Weight mode; the searcher's configured default when `None`
    pub weights: Option<WeightMode>,

    /// Rerank the fused shortlist
    pub rerank: bool,

    /// Scorer failure handling; the configured default when `None`
    pub failure_policy: Option<FailurePolicy>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, limit: usize) -> Self {
        Self {
            text: text.into(),
            limit,
            filter: MetadataFilter::none(),
            weights: None,
            rerank: false,
            failure_policy: None,
        }
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_weights(mut self, mode: WeightMode) -> Self {
        self.weights = Some(mode);
        self
    }

    pub fn with_rerank(mut self, rerank: bool) -> Self {
        self.rerank = rerank;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }
}

/// A scorer that failed while the query degraded to the other one
#[derive(Debug, Clone, Serialize)]
pub struct Degradation {
    pub failed: ScorerKind,
    pub reason: String,
}

/// Result of a fused search
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    /// Weights actually used for fusion
    pub weights: FusionWeights,
    /// Fused ranking, truncated to the query limit
    pub fused: Vec<FusedCandidate>,
    /// Reranked shortlist, present when reranking was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reranked: Option<Vec<RerankedCandidate<FusedCandidate>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<Degradation>,
}

impl SearchResponse {
    /// Final result ids in display order (reranked if available)
    pub fn ids(&self) -> Vec<&str> {
        match &self.reranked {
            Some(reranked) => reranked.iter().map(|r| r.doc_id()).collect(),
            None => self.fused.iter().map(|c| c.doc_id.as_str()).collect(),
        }
    }
}
