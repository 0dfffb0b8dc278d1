//! Typed result records for each pipeline stage

use crate::corpus::Document;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which scorer produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorerKind {
    Lexical,
    Vector,
}

impl fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScorerKind::Lexical => write!(f, "lexical"),
            ScorerKind::Vector => write!(f, "vector"),
        }
    }
}

/// Common view over candidates that can be reranked
pub trait RankedCandidate {
    fn doc_id(&self) -> &str;
    fn document(&self) -> &Document;
    /// Stage-specific score (raw scorer score or fused score)
    fn score(&self) -> f32;
}

/// Single-scorer result. The score is on the scorer's own scale and is not
/// comparable across scorers.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    /// Collection position
    pub index: usize,
    pub doc_id: String,
    pub score: f32,
    pub scorer: ScorerKind,
    pub document: Arc<Document>,
}

impl RankedCandidate for ScoredCandidate {
    fn doc_id(&self) -> &str {
        &self.doc_id
    }

    fn document(&self) -> &Document {
        &self.document
    }

    fn score(&self) -> f32 {
        self.score
    }
}

/// Rank-fused result.
///
/// `fused_score` only orders candidates within one query. Per-scorer ranks
/// are 0-based positions in the input lists, kept for diagnosis.
#[derive(Debug, Clone, Serialize)]
pub struct FusedCandidate {
    pub doc_id: String,
    pub fused_score: f32,
    /// Scorer whose list contributed this document first
    pub first_seen: ScorerKind,
    pub lexical_rank: Option<usize>,
    pub vector_rank: Option<usize>,
    pub document: Arc<Document>,
}

impl FusedCandidate {
    /// Whether both scorers ranked this document
    pub fn is_consensus(&self) -> bool {
        self.lexical_rank.is_some() && self.vector_rank.is_some()
    }
}

impl RankedCandidate for FusedCandidate {
    fn doc_id(&self) -> &str {
        &self.doc_id
    }

    fn document(&self) -> &Document {
        &self.document
    }

    fn score(&self) -> f32 {
        self.fused_score
    }
}

/// Reranked result with the pre-rerank position and score kept verbatim
#[derive(Debug, Clone, Serialize)]
pub struct RerankedCandidate<C> {
    pub candidate: C,
    pub rerank_score: f32,
    /// Index in the list handed to the reranker
    pub original_rank: usize,
    pub original_score: f32,
}

impl<C: RankedCandidate> RerankedCandidate<C> {
    pub fn doc_id(&self) -> &str {
        self.candidate.doc_id()
    }

    pub fn document(&self) -> &Document {
        self.candidate.document()
    }
}
