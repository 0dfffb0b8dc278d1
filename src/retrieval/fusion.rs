//! Weighted Reciprocal Rank Fusion of the lexical and vector rankings

use super::candidate::{FusedCandidate, ScoredCandidate, ScorerKind};
use super::characterizer::QueryCharacterizer;
use crate::corpus::Collection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Standard RRF damping constant
pub const DEFAULT_RRF_K: f32 = 60.0;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Invalid weights ({lexical}, {semantic}): weights must be finite and non-negative, and not both zero")]
    InvalidWeights { lexical: f32, semantic: f32 },

    #[error("Invalid RRF constant {0}: must be finite and non-negative")]
    InvalidRrfK(f32),
}

/// Per-scorer fusion weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub lexical: f32,
    pub semantic: f32,
}

impl FusionWeights {
    pub fn new(lexical: f32, semantic: f32) -> Result<Self, FusionError> {
        let valid = |w: f32| w.is_finite() && w >= 0.0;
        if !valid(lexical) || !valid(semantic) || lexical + semantic <= 0.0 {
            return Err(FusionError::InvalidWeights { lexical, semantic });
        }
        Ok(Self { lexical, semantic })
    }

    pub fn equal(weight: f32) -> Self {
        Self {
            lexical: weight,
            semantic: weight,
        }
    }

    fn for_scorer(&self, scorer: ScorerKind) -> f32 {
        match scorer {
            ScorerKind::Lexical => self.lexical,
            ScorerKind::Vector => self.semantic,
        }
    }
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self::equal(1.0)
    }
}

/// How the weight pair for a query is chosen
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightMode {
    Fixed(FusionWeights),
    /// Derived per query by the `QueryCharacterizer`
    Adaptive,
}

/// Fused ranking plus the weights that produced it
#[derive(Debug, Clone, Serialize)]
pub struct FusionOutcome {
    pub candidates: Vec<FusedCandidate>,
    pub weights: FusionWeights,
}

/// Combines two rank-ordered lists into one
#[derive(Debug, Clone)]
pub struct FusionEngine {
    rrf_k: f32,
    characterizer: QueryCharacterizer,
}

impl FusionEngine {
    pub fn new(rrf_k: f32, characterizer: QueryCharacterizer) -> Result<Self, FusionError> {
        if !rrf_k.is_finite() || rrf_k < 0.0 {
            return Err(FusionError::InvalidRrfK(rrf_k));
        }
        Ok(Self {
            rrf_k,
            characterizer,
        })
    }

    pub fn rrf_k(&self) -> f32 {
        self.rrf_k
    }

    pub fn characterizer(&self) -> &QueryCharacterizer {
        &self.characterizer
    }

    /// Resolve the weight pair for `query` under `mode`
    pub fn resolve_weights(&self, query: &str, mode: WeightMode) -> Result<FusionWeights, FusionError> {
        match mode {
            WeightMode::Fixed(w) => FusionWeights::new(w.lexical, w.semantic),
            WeightMode::Adaptive => Ok(self.characterizer.weights(query)),
        }
    }

    /// Fuse the two lists and keep the best `top_k`.
    ///
    /// Each list contributes `weight / (rrf_k + rank + 1)` for its 0-based
    /// rank; a document missing from a list gets nothing from it. Ties keep
    /// first-seen order, lexical list first. Ids that do not resolve in
    /// `collection` are dropped.
    pub fn fuse(
        &self,
        query: &str,
        lexical: &[ScoredCandidate],
        vector: &[ScoredCandidate],
        top_k: usize,
        mode: WeightMode,
        collection: &Collection,
    ) -> Result<FusionOutcome, FusionError> {
        let weights = self.resolve_weights(query, mode)?;
        let mut fused = reciprocal_rank_fusion(lexical, vector, weights, self.rrf_k);

        let before = fused.len();
        fused.retain_mut(|candidate| match collection.get_by_id(&candidate.doc_id) {
            Some(document) => {
                candidate.document = document.clone();
                true
            }
            None => {
                warn!(
                    "Dropping fused candidate '{}': not in current collection",
                    candidate.doc_id
                );
                false
            }
        });

        let unresolved = before - fused.len();
        fused.truncate(top_k);

        debug!(
            "Fused {} lexical + {} vector candidates into {} unique ({} unresolved), kept {}",
            lexical.len(),
            vector.len(),
            before,
            unresolved,
            fused.len()
        );

        Ok(FusionOutcome {
            candidates: fused,
            weights,
        })
    }
}

/// Weighted RRF over the two lists, sorted by fused score descending.
///
/// Keyed on document id. A document repeated inside one list only counts
/// at its best rank.
pub fn reciprocal_rank_fusion(
    lexical: &[ScoredCandidate],
    vector: &[ScoredCandidate],
    weights: FusionWeights,
    rrf_k: f32,
) -> Vec<FusedCandidate> {
    let mut fused: Vec<FusedCandidate> = Vec::with_capacity(lexical.len() + vector.len());
    let mut slots: HashMap<&str, usize> = HashMap::new();

    for (kind, list) in [(ScorerKind::Lexical, lexical), (ScorerKind::Vector, vector)] {
        let weight = weights.for_scorer(kind);

        for (rank, candidate) in list.iter().enumerate() {
            let slot = *slots.entry(candidate.doc_id.as_str()).or_insert_with(|| {
                fused.push(FusedCandidate {
                    doc_id: candidate.doc_id.clone(),
                    fused_score: 0.0,
                    first_seen: kind,
                    lexical_rank: None,
                    vector_rank: None,
                    document: candidate.document.clone(),
                });
                fused.len() - 1
            });

            let entry = &mut fused[slot];
            let rank_slot = match kind {
                ScorerKind::Lexical => &mut entry.lexical_rank,
                ScorerKind::Vector => &mut entry.vector_rank,
            };
            if rank_slot.is_some() {
                continue;
            }
            *rank_slot = Some(rank);
            entry.fused_score += weight / (rrf_k + rank as f32 + 1.0);
        }
    }

    // Stable: equal scores stay in first-seen order
    fused.sort_by(|a, b| b.fused_score.total_cmp(&a.fused_score));

    fused
}
