//! Hybrid search combining lexical and vector scoring

use super::candidate::{FusedCandidate, RankedCandidate, RerankedCandidate, ScoredCandidate, ScorerKind};
use super::characterizer::{CharacterizerConfig, QueryCharacterizer};
use super::fusion::{FusionEngine, FusionOutcome, FusionWeights, WeightMode};
use super::reranker::{CrossEncoderScorer, Reranker};
use super::{Degradation, FailurePolicy, SearchQuery, SearchResponse};
use crate::config::{Config, RetrievalConfig};
use crate::corpus::Collection;
use crate::error::{PlotError, Result};
use crate::filtering::MetadataFilter;
use crate::index::{EmbeddingError, EmbeddingProvider, FastEmbedProvider, SearchHit, SearchIndex};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Hybrid searcher over an immutable index snapshot.
///
/// Queries clone the current `Arc<SearchIndex>` and never hold the lock
/// while scoring, so `reload` can swap in a new snapshot at any time.
pub struct HybridSearcher {
    index: RwLock<Arc<SearchIndex>>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    fusion: FusionEngine,
    reranker: Option<Reranker>,
    rerank_candidates: usize,
    config: RetrievalConfig,
}

impl HybridSearcher {
    /// Create a new hybrid searcher without a reranker
    pub fn new(
        index: SearchIndex,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
        characterizer: CharacterizerConfig,
    ) -> Result<Self> {
        FusionWeights::new(config.lexical_weight, config.semantic_weight)?;
        let fusion = FusionEngine::new(config.rrf_k, QueryCharacterizer::new(characterizer)?)?;

        info!(
            "Hybrid searcher ready: {} documents, encoder {}, rrf_k={}",
            index.collection().len(),
            embedding_provider.model_name(),
            config.rrf_k
        );

        Ok(Self {
            index: RwLock::new(Arc::new(index)),
            embedding_provider,
            fusion,
            reranker: None,
            rerank_candidates: 0,
            config,
        })
    }

    /// Build the full pipeline from configuration: FastEmbed encoder,
    /// corpus and indexes, and the cross-encoder when reranking is enabled.
    /// Downloads models on first use.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider: Arc<dyn EmbeddingProvider> =
            Arc::new(FastEmbedProvider::new(&config.embedding.model)?);

        let index = SearchIndex::open(
            &config.corpus,
            config.lexical,
            provider.clone(),
            config.embedding.batch_size,
        )?;

        let searcher = Self::new(
            index,
            provider,
            config.retrieval.clone(),
            config.characterizer.clone(),
        )?;

        if !config.rerank.enabled {
            return Ok(searcher);
        }

        let scorer = CrossEncoderScorer::new(&config.rerank.model)?;
        let reranker = Reranker::new(Arc::new(scorer), config.rerank.batch_size);
        Ok(searcher.with_reranker(reranker, config.rerank.candidates_limit))
    }

    /// Attach a reranker that sees the top `candidates_limit` fused results
    pub fn with_reranker(mut self, reranker: Reranker, candidates_limit: usize) -> Self {
        info!(
            "Reranking enabled: {} (shortlist {})",
            reranker.model_name(),
            candidates_limit
        );
        self.reranker = Some(reranker);
        self.rerank_candidates = candidates_limit;
        self
    }

    pub fn has_reranker(&self) -> bool {
        self.reranker.is_some()
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn fusion(&self) -> &FusionEngine {
        &self.fusion
    }

    /// Current index snapshot
    pub async fn snapshot(&self) -> Arc<SearchIndex> {
        self.index.read().await.clone()
    }

    /// Atomically replace the index snapshot. In-flight queries finish on
    /// the snapshot they started with.
    pub async fn reload(&self, index: SearchIndex) {
        let documents = index.collection().len();
        let mut guard = self.index.write().await;
        *guard = Arc::new(index);
        info!("Swapped in new index snapshot ({} documents)", documents);
    }

    /// Top-K lexical candidates satisfying `filter`
    pub async fn search_lexical(
        &self,
        query: &str,
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<ScoredCandidate>> {
        filter.validate()?;
        let index = self.snapshot().await;
        self.run_lexical(index, query, top_k, filter).await
    }

    /// Top-K vector candidates satisfying `filter`
    pub async fn search_vector(
        &self,
        query: &str,
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<ScoredCandidate>> {
        filter.validate()?;
        let index = self.snapshot().await;
        self.run_vector(index, query, top_k, filter).await
    }

    /// Fuse two candidate lists against the current snapshot
    pub async fn fuse(
        &self,
        query: &str,
        lexical: &[ScoredCandidate],
        vector: &[ScoredCandidate],
        top_k: usize,
        mode: WeightMode,
    ) -> Result<FusionOutcome> {
        let index = self.snapshot().await;
        Ok(self
            .fusion
            .fuse(query, lexical, vector, top_k, mode, index.collection())?)
    }

    /// Rerank any candidate list with the configured reranker.
    ///
    /// An empty list is returned as-is, even without a reranker.
    pub fn rerank<C>(
        &self,
        query: &str,
        candidates: &[C],
        top_k: Option<usize>,
    ) -> Result<Vec<RerankedCandidate<C>>>
    where
        C: RankedCandidate + Clone,
    {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let reranker = self.require_reranker()?;
        Ok(reranker.rerank(query, candidates, top_k)?)
    }

    /// Full pipeline: both scorers in parallel, fusion, optional reranking
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let start = Instant::now();
        query.filter.validate()?;

        let mode = query.weights.unwrap_or_else(|| self.config.weight_mode());
        let policy = query.failure_policy.unwrap_or(self.config.failure_policy);
        let weights = self.fusion.resolve_weights(&query.text, mode)?;
        if query.rerank {
            self.require_reranker()?;
        }

        if query.limit == 0 {
            return Ok(SearchResponse {
                query: query.text.clone(),
                weights,
                fused: Vec::new(),
                reranked: query.rerank.then(Vec::new),
                degraded: None,
            });
        }

        let depth = self.config.candidate_depth(query.limit);
        let index = self.snapshot().await;

        let (lexical, vector) = tokio::join!(
            self.run_lexical(index.clone(), &query.text, depth, &query.filter),
            self.run_vector(index.clone(), &query.text, depth, &query.filter)
        );

        let (lexical, vector, degraded) = match (lexical, vector) {
            (Ok(lexical), Ok(vector)) => (lexical, vector, None),
            (Ok(lexical), Err(e)) if policy == FailurePolicy::DegradeToSurvivor => {
                (lexical, Vec::new(), Some(degrade(ScorerKind::Vector, &e)))
            }
            (Err(e), Ok(vector)) if policy == FailurePolicy::DegradeToSurvivor => {
                (Vec::new(), vector, Some(degrade(ScorerKind::Lexical, &e)))
            }
            (Err(e), _) | (_, Err(e)) => return Err(e),
        };

        let shortlist = if query.rerank {
            query.limit.max(self.rerank_candidates)
        } else {
            query.limit
        };

        let outcome = self.fusion.fuse(
            &query.text,
            &lexical,
            &vector,
            shortlist,
            WeightMode::Fixed(weights),
            index.collection(),
        )?;

        let reranked = if query.rerank {
            Some(self.rerank_blocking(&query.text, outcome.candidates.clone(), query.limit).await?)
        } else {
            None
        };

        let mut fused = outcome.candidates;
        fused.truncate(query.limit);

        info!(
            "Search '{}': {} lexical, {} vector, {} fused{} in {}ms",
            query.text,
            lexical.len(),
            vector.len(),
            fused.len(),
            if reranked.is_some() { ", reranked" } else { "" },
            start.elapsed().as_millis()
        );

        Ok(SearchResponse {
            query: query.text.clone(),
            weights: outcome.weights,
            fused,
            reranked,
            degraded,
        })
    }

    fn require_reranker(&self) -> Result<&Reranker> {
        self.reranker.as_ref().ok_or_else(|| {
            PlotError::Config("Reranking requested but no reranker is configured".to_string())
        })
    }

    async fn run_lexical(
        &self,
        index: Arc<SearchIndex>,
        query: &str,
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<ScoredCandidate>> {
        let query = query.to_string();
        let filter = filter.clone();

        tokio::task::spawn_blocking(move || lexical_candidates(&index, &query, top_k, &filter))
            .await
            .map_err(|e| task_failed(ScorerKind::Lexical, e))
    }

    async fn run_vector(
        &self,
        index: Arc<SearchIndex>,
        query: &str,
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<ScoredCandidate>> {
        let provider = self.embedding_provider.clone();
        let query = query.to_string();
        let filter = filter.clone();

        let candidates = tokio::task::spawn_blocking(move || {
            vector_candidates(&index, provider.as_ref(), &query, top_k, &filter)
        })
        .await
        .map_err(|e| task_failed(ScorerKind::Vector, e))??;

        Ok(candidates)
    }

    async fn rerank_blocking(
        &self,
        query: &str,
        candidates: Vec<FusedCandidate>,
        limit: usize,
    ) -> Result<Vec<RerankedCandidate<FusedCandidate>>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let reranker = self.require_reranker()?.clone();
        let query = query.to_string();

        let reranked = tokio::task::spawn_blocking(move || {
            reranker.rerank(&query, &candidates, Some(limit))
        })
        .await
        .map_err(|e| PlotError::Other(anyhow::anyhow!("rerank task failed: {}", e)))??;

        Ok(reranked)
    }
}

/// Lexical scorer over a snapshot: BM25 hits resolved to documents
pub fn lexical_candidates(
    index: &SearchIndex,
    query: &str,
    top_k: usize,
    filter: &MetadataFilter,
) -> Vec<ScoredCandidate> {
    let hits = index
        .keywords()
        .search(index.collection(), query, top_k, filter);
    debug!("Lexical scorer: {} hits for '{}'", hits.len(), query);
    resolve_hits(index.collection(), hits, ScorerKind::Lexical)
}

/// Vector scorer over a snapshot: encodes the query, then ranks by cosine.
///
/// A blank query returns nothing without calling the encoder.
pub fn vector_candidates(
    index: &SearchIndex,
    provider: &dyn EmbeddingProvider,
    query: &str,
    top_k: usize,
    filter: &MetadataFilter,
) -> std::result::Result<Vec<ScoredCandidate>, EmbeddingError> {
    if query.trim().is_empty() || top_k == 0 {
        return Ok(Vec::new());
    }

    let embedding = provider.embed(query)?;
    let hits = index
        .vectors()
        .search(index.collection(), &embedding, top_k, filter)?;
    debug!("Vector scorer: {} hits for '{}'", hits.len(), query);
    Ok(resolve_hits(index.collection(), hits, ScorerKind::Vector))
}

fn resolve_hits(collection: &Collection, hits: Vec<SearchHit>, scorer: ScorerKind) -> Vec<ScoredCandidate> {
    hits.into_iter()
        .filter_map(|hit| {
            let document = collection.get(hit.index)?.clone();
            Some(ScoredCandidate {
                index: hit.index,
                doc_id: document.id().to_string(),
                score: hit.score,
                scorer,
                document,
            })
        })
        .collect()
}

fn degrade(scorer: ScorerKind, error: &PlotError) -> Degradation {
    warn!(
        "{} scorer failed, continuing with the other scorer only: {}",
        scorer, error
    );
    Degradation {
        failed: scorer,
        reason: error.to_string(),
    }
}

fn task_failed(scorer: ScorerKind, error: tokio::task::JoinError) -> PlotError {
    PlotError::Other(anyhow::anyhow!("{} scorer task failed: {}", scorer, error))
}
