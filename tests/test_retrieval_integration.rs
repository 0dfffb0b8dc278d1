//! Integration tests: hybrid retrieval over a fixture movie collection
//!
//! Uses a deterministic bag-of-words encoder and a word-overlap pairwise
//! scorer so no model download is needed.

mod common;

use common::{searcher, BagOfWordsEncoder, CountingScorer};
use plotfindr::config::RetrievalConfig;
use plotfindr::filtering::MetadataFilter;
use plotfindr::index::{EmbeddingError, EmbeddingProvider};
use plotfindr::retrieval::{
    CharacterizerConfig, FailurePolicy, FusedCandidate, FusionWeights, HybridSearcher,
    PairwiseScorer, RerankError, Reranker, ScoredCandidate, ScorerKind, SearchQuery, WeightMode,
};
use plotfindr::PlotError;
use std::sync::Arc;

fn ids(candidates: &[ScoredCandidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.doc_id.as_str()).collect()
}

fn fused_ids(candidates: &[FusedCandidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.doc_id.as_str()).collect()
}

#[tokio::test]
async fn test_wizard_school_query() {
    let (searcher, _, _) = searcher();
    let query = "boy goes to wizard school";
    let none = MetadataFilter::none();

    let lexical = searcher.search_lexical(query, 5, &none).await.unwrap();
    let vector = searcher.search_vector(query, 5, &none).await.unwrap();
    assert!(!lexical.is_empty() && lexical.len() <= 5);
    assert!(!vector.is_empty() && vector.len() <= 5);
    println!("✓ lexical {:?}, vector {:?}", ids(&lexical), ids(&vector));

    let outcome = searcher
        .fuse(query, &lexical, &vector, 5, WeightMode::Fixed(FusionWeights::default()))
        .await
        .unwrap();

    assert!(!outcome.candidates.is_empty() && outcome.candidates.len() <= 5);
    for pair in outcome.candidates.windows(2) {
        assert!(pair[0].fused_score >= pair[1].fused_score);
    }

    // Both scorers agree on the reunion movie
    assert_eq!(outcome.candidates[0].doc_id, "106");
    assert!(outcome.candidates[0].is_consensus());
}

#[tokio::test]
async fn test_genre_filter_applies_everywhere() {
    let (searcher, _, _) = searcher();
    let query = "animated film";

    // Without the filter the documentary dominates lexically
    let unfiltered = searcher
        .search_lexical(query, 5, &MetadataFilter::none())
        .await
        .unwrap();
    assert_eq!(unfiltered[0].doc_id, "105");

    let filter = MetadataFilter::none().with_genre("Animation");
    let lexical = searcher.search_lexical(query, 5, &filter).await.unwrap();
    let vector = searcher.search_vector(query, 5, &filter).await.unwrap();
    let response = searcher
        .search(&SearchQuery::new(query, 5).with_filter(filter))
        .await
        .unwrap();

    let has_animation = |genres: &[String]| genres.iter().any(|g| g.eq_ignore_ascii_case("animation"));
    assert!(!lexical.is_empty());
    assert!(lexical.iter().all(|c| has_animation(c.document.genres())));
    assert!(vector.iter().all(|c| has_animation(c.document.genres())));
    assert!(response.fused.iter().all(|c| has_animation(c.document.genres())));
    assert!(!fused_ids(&response.fused).contains(&"105"));
}

#[tokio::test]
async fn test_year_range_excludes_older_movie() {
    let (searcher, _, _) = searcher();
    let query = "boy goes to wizard school";

    let unfiltered = searcher
        .search_lexical(query, 5, &MetadataFilter::none())
        .await
        .unwrap();
    assert_eq!(unfiltered[0].doc_id, "106");

    let filter = MetadataFilter::none().with_year_range(1990, 2010);
    let lexical = searcher.search_lexical(query, 10, &filter).await.unwrap();
    let vector = searcher.search_vector(query, 10, &filter).await.unwrap();
    let response = searcher
        .search(&SearchQuery::new(query, 10).with_filter(filter))
        .await
        .unwrap();

    for excluded in ["106", "102", "109"] {
        assert!(!ids(&lexical).contains(&excluded), "{excluded} in lexical");
        assert!(!ids(&vector).contains(&excluded), "{excluded} in vector");
        assert!(!fused_ids(&response.fused).contains(&excluded), "{excluded} in fused");
    }
    assert_eq!(lexical[0].doc_id, "101");
}

#[tokio::test]
async fn test_adaptive_weights() {
    let (searcher, _, _) = searcher();

    let year = searcher
        .search(&SearchQuery::new("1999", 5).with_weights(WeightMode::Adaptive))
        .await
        .unwrap();
    assert!(year.weights.lexical > year.weights.semantic);

    let narrative = searcher
        .search(
            &SearchQuery::new("a story about a family coping with loss after a tragedy", 5)
                .with_weights(WeightMode::Adaptive),
        )
        .await
        .unwrap();
    assert!(narrative.weights.semantic > narrative.weights.lexical);
    assert_eq!(narrative.ids()[0], "108");

    let total = narrative.weights.lexical + narrative.weights.semantic;
    assert!((total - 2.0).abs() < 1e-5);
}

#[tokio::test]
async fn test_rerank_empty_list_skips_scorer() {
    let (searcher, _, scorer) = searcher();

    let empty: Vec<FusedCandidate> = Vec::new();
    let reranked = searcher.rerank("anything", &empty, Some(5)).unwrap();
    assert!(reranked.is_empty());
    assert_eq!(scorer.calls(), 0);

    // A filter that matches nothing gives an empty shortlist too
    let response = searcher
        .search(
            &SearchQuery::new("wizard", 5)
                .with_filter(MetadataFilter::none().with_year(1900))
                .with_rerank(true),
        )
        .await
        .unwrap();
    assert!(response.fused.is_empty());
    assert_eq!(response.reranked.map(|r| r.len()), Some(0));
    assert_eq!(scorer.calls(), 0);
}

#[tokio::test]
async fn test_rerank_keeps_provenance() {
    let (searcher, _, scorer) = searcher();
    let query = "girl school witches magic";

    let outcome = searcher
        .fuse(
            query,
            &searcher.search_lexical(query, 10, &MetadataFilter::none()).await.unwrap(),
            &searcher.search_vector(query, 10, &MetadataFilter::none()).await.unwrap(),
            10,
            WeightMode::Fixed(FusionWeights::default()),
        )
        .await
        .unwrap();

    let reranked = searcher.rerank(query, &outcome.candidates, None).unwrap();
    assert_eq!(reranked.len(), outcome.candidates.len());
    for record in &reranked {
        let original = &outcome.candidates[record.original_rank];
        assert_eq!(original.doc_id, record.doc_id());
        assert_eq!(original.fused_score, record.original_score);
    }
    for pair in reranked.windows(2) {
        assert!(pair[0].rerank_score >= pair[1].rerank_score);
    }
    assert_eq!(reranked[0].doc_id(), "102");

    // Batch size 3
    let expected_calls = outcome.candidates.len().div_ceil(3);
    assert_eq!(scorer.calls(), expected_calls);
}

#[tokio::test]
async fn test_search_with_rerank_truncates_to_limit() {
    let (searcher, _, scorer) = searcher();

    let response = searcher
        .search(&SearchQuery::new("boy wizard school", 2).with_rerank(true))
        .await
        .unwrap();

    let reranked = response.reranked.as_ref().unwrap();
    assert_eq!(reranked.len(), 2);
    assert_eq!(response.fused.len(), 2);
    assert!(scorer.calls() > 0);
    assert!(scorer.pairs.load(std::sync::atomic::Ordering::SeqCst) > 2);
}

#[tokio::test]
async fn test_concurrent_queries_share_snapshot() {
    let (searcher, _, _) = searcher();
    let searcher = Arc::new(searcher);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let searcher = searcher.clone();
        handles.push(tokio::spawn(async move {
            let response = searcher
                .search(&SearchQuery::new("thieves rob casinos", 3))
                .await
                .unwrap();
            response.ids().into_iter().map(String::from).collect::<Vec<_>>()
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(results[0][0], "107");
}

/// Encodes the corpus fine but fails on every query
struct QueryFailingEncoder;

impl EmbeddingProvider for QueryFailingEncoder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::GenerationError("model unavailable".to_string()))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| BagOfWordsEncoder::vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        common::DIMENSION
    }

    fn model_name(&self) -> &str {
        "query-failing"
    }
}

fn failing_searcher(policy: FailurePolicy) -> (common::Fixture, HybridSearcher) {
    let fixture = common::write_corpus();
    let encoder: Arc<dyn EmbeddingProvider> = Arc::new(QueryFailingEncoder);
    let index = plotfindr::index::SearchIndex::open(
        &fixture.corpus,
        plotfindr::index::Bm25Params::default(),
        encoder.clone(),
        8,
    )
    .unwrap();

    let config = RetrievalConfig {
        failure_policy: policy,
        ..Default::default()
    };
    let searcher = HybridSearcher::new(index, encoder, config, CharacterizerConfig::default())
        .unwrap()
        .with_reranker(Reranker::new(CountingScorer::new(), 4), 10);
    (fixture, searcher)
}

#[tokio::test]
async fn test_encoder_failure_aborts_fused_query() {
    let (_fixture, searcher) = failing_searcher(FailurePolicy::Abort);

    let err = searcher
        .search(&SearchQuery::new("wizard school", 5))
        .await
        .unwrap_err();
    assert!(matches!(err, PlotError::Embedding(_)));
    assert!(err.is_external());

    // Lexical scoring has no external dependency
    let lexical = searcher
        .search_lexical("wizard school", 5, &MetadataFilter::none())
        .await
        .unwrap();
    assert!(!lexical.is_empty());
}

#[tokio::test]
async fn test_encoder_failure_degrades_when_asked() {
    let (_fixture, searcher) = failing_searcher(FailurePolicy::Abort);

    let response = searcher
        .search(
            &SearchQuery::new("wizard school", 5)
                .with_failure_policy(FailurePolicy::DegradeToSurvivor),
        )
        .await
        .unwrap();

    let degraded = response.degraded.as_ref().unwrap();
    assert_eq!(degraded.failed, ScorerKind::Vector);
    assert!(degraded.reason.contains("model unavailable"));
    assert!(!response.fused.is_empty());
    assert!(response
        .fused
        .iter()
        .all(|c| c.first_seen == ScorerKind::Lexical && c.vector_rank.is_none()));
}

#[tokio::test]
async fn test_configured_degrade_policy() {
    let (_fixture, searcher) = failing_searcher(FailurePolicy::DegradeToSurvivor);
    let response = searcher
        .search(&SearchQuery::new("wizard", 5))
        .await
        .unwrap();
    assert!(response.degraded.is_some());
}

#[tokio::test]
async fn test_encoder_called_once_per_fused_query() {
    let (searcher, encoder, _) = searcher();
    let before = encoder.calls.load(std::sync::atomic::Ordering::SeqCst);

    searcher
        .search(&SearchQuery::new("space toy cowboy", 3))
        .await
        .unwrap();

    let after = encoder.calls.load(std::sync::atomic::Ordering::SeqCst);
    assert_eq!(after - before, 1);
}

/// Pairwise scorer whose backing model is down
struct OfflineScorer;

impl PairwiseScorer for OfflineScorer {
    fn score_pairs(&self, _query: &str, _passages: &[&str]) -> Result<Vec<f32>, RerankError> {
        Err(RerankError::RerankingError("scorer offline".to_string()))
    }

    fn model_name(&self) -> &str {
        "offline"
    }
}

#[tokio::test]
async fn test_scorer_failure_surfaces_under_both_policies() {
    let fixture = common::write_corpus();
    let encoder = BagOfWordsEncoder::new();
    let index = common::build_index(&fixture, encoder.clone());
    let searcher = HybridSearcher::new(
        index,
        encoder,
        RetrievalConfig::default(),
        CharacterizerConfig::default(),
    )
    .unwrap()
    .with_reranker(Reranker::new(Arc::new(OfflineScorer), 4), 10);

    for policy in [FailurePolicy::Abort, FailurePolicy::DegradeToSurvivor] {
        let err = searcher
            .search(
                &SearchQuery::new("boy wizard school", 3)
                    .with_rerank(true)
                    .with_failure_policy(policy),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PlotError::Rerank(_)), "{:?}: {}", policy, err);
        assert!(err.is_external());
        assert!(err.to_string().contains("scorer offline"));
    }
}
