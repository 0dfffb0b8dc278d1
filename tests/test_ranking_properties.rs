//! Property tests for filtering, scoring, fusion and reranking invariants

use plotfindr::corpus::{Collection, Document};
use plotfindr::filtering::MetadataFilter;
use plotfindr::index::{Bm25Params, EmbeddingMatrix, KeywordIndex};
use plotfindr::retrieval::{
    reciprocal_rank_fusion, FusionWeights, PairwiseScorer, RerankError, Reranker, ScoredCandidate,
    ScorerKind,
};
use proptest::prelude::*;
use std::sync::Arc;

const GENRES: &[&str] = &["Drama", "Comedy", "Horror", "Animation"];
const COUNTRIES: &[&str] = &["France", "Japan", "India"];

fn arb_document(index: usize) -> impl Strategy<Value = Document> {
    (
        prop::option::of(1900i32..2030),
        prop::sample::subsequence(GENRES, 0..=GENRES.len()),
        prop::sample::subsequence(COUNTRIES, 0..=COUNTRIES.len()),
    )
        .prop_map(move |(year, genres, countries)| {
            let date = year.map(|y| format!("{y}-01-01")).unwrap_or_default();
            Document::new(
                format!("doc{index}"),
                format!("Movie {index}"),
                "plot",
                date,
                genres.iter().map(|g| g.to_string()).collect(),
                countries.iter().map(|c| c.to_string()).collect(),
            )
        })
}

fn arb_documents() -> impl Strategy<Value = Vec<Document>> {
    (1usize..30).prop_flat_map(|n| (0..n).map(arb_document).collect::<Vec<_>>())
}

fn arb_filter() -> impl Strategy<Value = MetadataFilter> {
    (
        prop::option::of(1900i32..2030),
        prop::option::of((1900i32..1970, 1970i32..2030)),
        prop::option::of(prop::sample::select(GENRES)),
        prop::option::of(prop::sample::select(COUNTRIES)),
    )
        .prop_map(|(year, range, genre, country)| MetadataFilter {
            year,
            year_range: range,
            genre: genre.map(|g| g.to_lowercase()),
            country: country.map(String::from),
        })
}

fn candidates(n: usize, scorer: ScorerKind) -> Vec<ScoredCandidate> {
    (0..n)
        .map(|i| ScoredCandidate {
            index: i,
            doc_id: format!("doc{i}"),
            score: (n - i) as f32,
            scorer,
            document: Arc::new(Document::new(format!("doc{i}"), "", "plot", "", vec![], vec![])),
        })
        .collect()
}

/// Returns the scores it was constructed with, in order
struct FixedScorer {
    scores: Vec<f32>,
}

impl PairwiseScorer for FixedScorer {
    fn score_pairs(&self, _query: &str, passages: &[&str]) -> Result<Vec<f32>, RerankError> {
        // Passages look like "plot i"; recover i to find its score
        Ok(passages
            .iter()
            .map(|p| {
                let i: usize = p.rsplit(' ').next().and_then(|s| s.parse().ok()).unwrap_or(0);
                self.scores[i]
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

proptest! {
    #[test]
    fn filtering_is_monotonic(docs in arb_documents(), base in arb_filter(), genre in prop::sample::select(GENRES)) {
        let count = |f: &MetadataFilter| docs.iter().filter(|d| f.matches(d)).count();

        prop_assert!(count(&base) <= docs.len());
        prop_assert!(count(&base) <= count(&MetadataFilter::none()));

        if base.genre.is_none() {
            let narrowed = base.clone().with_genre(genre);
            prop_assert!(count(&narrowed) <= count(&base));
        }
        if base.year.is_none() {
            prop_assert!(count(&base.clone().with_year(1999)) <= count(&base));
        }
    }

    #[test]
    fn term_presence_outranks_absence(extra in 0usize..5, filler in 1usize..6) {
        // Same length documents; only the first contains the query term
        let with_term = format!("{} ghost", "word ".repeat(filler));
        let without_term = format!("{} other", "word ".repeat(filler));
        let mut docs = vec![
            Document::new("a", "", without_term, "", vec![], vec![]),
            Document::new("b", "", with_term, "", vec![], vec![]),
        ];
        for i in 0..extra {
            docs.push(Document::new(format!("x{i}"), "", "unrelated text", "", vec![], vec![]));
        }
        let collection = Collection::new(docs).unwrap();
        let index = KeywordIndex::build(&collection, Bm25Params::default());

        let hits = index.search(&collection, "ghost", 10, &MetadataFilter::none());
        prop_assert_eq!(hits.first().map(|h| h.index), Some(1));
        prop_assert!(hits.iter().all(|h| h.index != 0));
    }

    #[test]
    fn self_similarity_is_one(row in prop::collection::vec(-10.0f32..10.0, 1..16)) {
        prop_assume!(row.iter().any(|v| v.abs() > 1e-3));
        let matrix = EmbeddingMatrix::from_rows(vec![row.clone()]).unwrap();
        let sims = matrix.similarities(&row).unwrap();
        prop_assert!((sims[0] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn self_fusion_preserves_order(n in 1usize..40, w in 0.1f32..5.0) {
        let list = candidates(n, ScorerKind::Lexical);
        let fused = reciprocal_rank_fusion(&list, &list, FusionWeights::equal(w), 60.0);

        let original: Vec<&str> = list.iter().map(|c| c.doc_id.as_str()).collect();
        let after: Vec<&str> = fused.iter().map(|c| c.doc_id.as_str()).collect();
        prop_assert_eq!(original, after);
    }

    #[test]
    fn single_list_documents_get_one_contribution(
        n in 2usize..30,
        lexical_weight in 0.0f32..3.0,
        semantic_weight in 0.1f32..3.0,
        c in 0.0f32..100.0,
    ) {
        let lexical = candidates(n, ScorerKind::Lexical);
        // The vector list only holds the first half
        let vector: Vec<ScoredCandidate> = candidates(n / 2, ScorerKind::Vector);
        let weights = FusionWeights::new(lexical_weight, semantic_weight).unwrap();

        let fused = reciprocal_rank_fusion(&lexical, &vector, weights, c);
        for candidate in fused.iter().filter(|f| f.vector_rank.is_none()) {
            let rank = candidate.lexical_rank.unwrap();
            let expected = lexical_weight / (c + rank as f32 + 1.0);
            prop_assert!((candidate.fused_score - expected).abs() < 1e-6);
        }
        prop_assert_eq!(fused.len(), n);
    }

    #[test]
    fn reranker_keeps_original_rank(scores in prop::collection::vec(-5.0f32..5.0, 0..25), batch in 1usize..8) {
        let n = scores.len();
        let input: Vec<ScoredCandidate> = (0..n)
            .map(|i| ScoredCandidate {
                index: i,
                doc_id: format!("doc{i}"),
                score: i as f32,
                scorer: ScorerKind::Vector,
                document: Arc::new(Document::new(format!("doc{i}"), "", format!("plot {i}"), "", vec![], vec![])),
            })
            .collect();

        let reranker = Reranker::new(Arc::new(FixedScorer { scores: scores.clone() }), batch);
        let output = reranker.rerank("query", &input, None).unwrap();

        prop_assert_eq!(output.len(), n);
        for record in &output {
            prop_assert_eq!(&input[record.original_rank].doc_id, &record.candidate.doc_id);
            prop_assert_eq!(record.rerank_score, scores[record.original_rank]);
        }
        for pair in output.windows(2) {
            prop_assert!(pair[0].rerank_score >= pair[1].rerank_score);
        }
    }
}
