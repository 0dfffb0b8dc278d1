//! Shared fixtures: a small movie corpus, a deterministic bag-of-words
//! encoder and a call-counting pairwise scorer.

#![allow(dead_code)]

use plotfindr::config::{CorpusConfig, RetrievalConfig};
use plotfindr::index::{Bm25Params, EmbeddingError, EmbeddingProvider, SearchIndex};
use plotfindr::retrieval::{CharacterizerConfig, HybridSearcher, PairwiseScorer, RerankError, Reranker};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub const DIMENSION: usize = 64;

/// Fixture movies in the merged-table layout
pub const MOVIES_JSON: &str = r#"[
  {"wiki_movie_id": 101, "movie_name": "Harry Potter and the Philosopher's Stone", "release_date": "2001-11-16",
   "summary": "An orphaned boy discovers he is a wizard and goes to Hogwarts, a school of witchcraft and wizardry.",
   "genres": ["Fantasy", "Adventure"], "countries": ["United Kingdom"]},
  {"wiki_movie_id": 102, "movie_name": "The Worst Witch", "release_date": "1986",
   "summary": "A clumsy girl attends a school for witches and learns magic.",
   "genres": ["Fantasy", "Family"], "countries": ["United Kingdom"]},
  {"wiki_movie_id": 103, "movie_name": "Toy Story", "release_date": "1995-11-22",
   "summary": "Animated toys come to life when their owner leaves the room, and a cowboy doll feels threatened by a new space toy.",
   "genres": ["Animation", "Comedy"], "countries": ["United States of America"]},
  {"wiki_movie_id": 104, "movie_name": "Spirited Away", "release_date": "2001-07-20",
   "summary": "A girl wanders into a world of spirits and works in a bathhouse to free her parents in this animated film.",
   "genres": ["animation", "Fantasy"], "countries": ["Japan"]},
  {"wiki_movie_id": 105, "movie_name": "Frames Per Second", "release_date": "1985-03-01",
   "summary": "An animated film about the animated film industry: animated film history and animated film studios.",
   "genres": ["Documentary"], "countries": ["United States of America"]},
  {"wiki_movie_id": 106, "movie_name": "Wizard School Reunion", "release_date": "1985",
   "summary": "A boy goes to wizard school. The boy wizard goes back to wizard school every year.",
   "genres": ["Fantasy"], "countries": ["Canada"]},
  {"wiki_movie_id": 107, "movie_name": "Ocean's Eleven", "release_date": "2001-12-07",
   "summary": "A crew of thieves plans to rob three Las Vegas casinos in one night.",
   "genres": ["Crime", "Thriller"], "countries": ["United States of America"]},
  {"wiki_movie_id": 108, "movie_name": "Ordinary People", "release_date": "1980-09-19",
   "summary": "A story about a family coping with loss after a tragedy, as a son struggles with grief.",
   "genres": ["Drama"], "countries": ["United States of America"]},
  {"wiki_movie_id": 109, "movie_name": "Lost Reel", "release_date": "unknown",
   "summary": "A young wizard boy searches for a lost school.",
   "genres": ["Fantasy"], "countries": []},
  {"wiki_movie_id": 110, "movie_name": "Untitled Project", "release_date": "2005",
   "summary": "", "genres": null, "countries": null}
]"#;

/// Hashes lowercase alphanumeric tokens into a fixed number of buckets
pub struct BagOfWordsEncoder {
    pub calls: AtomicUsize,
}

impl BagOfWordsEncoder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; DIMENSION];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 2)
        {
            let bucket = token
                .bytes()
                .fold(7u64, |h, b| h.wrapping_mul(31).wrapping_add(b as u64));
            v[(bucket % DIMENSION as u64) as usize] += 1.0;
        }
        v
    }
}

impl EmbeddingProvider for BagOfWordsEncoder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector(text))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        "bag-of-words"
    }
}

/// Scores passages by shared lowercase words with the query
pub struct CountingScorer {
    pub calls: AtomicUsize,
    pub pairs: AtomicUsize,
}

impl CountingScorer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            pairs: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PairwiseScorer for CountingScorer {
    fn score_pairs(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>, RerankError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pairs.fetch_add(passages.len(), Ordering::SeqCst);

        let query = query.to_lowercase();
        let words: Vec<&str> = query.split_whitespace().collect();
        Ok(passages
            .iter()
            .map(|p| {
                let p = p.to_lowercase();
                words.iter().filter(|w| p.contains(*w)).count() as f32
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "counting"
    }
}

/// Corpus file written into a temp dir that lives as long as the fixture
pub struct Fixture {
    pub dir: TempDir,
    pub corpus: CorpusConfig,
}

pub fn write_corpus() -> Fixture {
    let dir = TempDir::new().unwrap();
    let path: PathBuf = dir.path().join("movies.json");
    std::fs::write(&path, MOVIES_JSON).unwrap();

    Fixture {
        corpus: CorpusConfig {
            documents: vec![path],
            embeddings: None,
        },
        dir,
    }
}

pub fn build_index(fixture: &Fixture, encoder: Arc<BagOfWordsEncoder>) -> SearchIndex {
    SearchIndex::open(&fixture.corpus, Bm25Params::default(), encoder, 4).unwrap()
}

pub fn searcher() -> (HybridSearcher, Arc<BagOfWordsEncoder>, Arc<CountingScorer>) {
    let fixture = write_corpus();
    let encoder = BagOfWordsEncoder::new();
    let scorer = CountingScorer::new();

    let index = build_index(&fixture, encoder.clone());
    let searcher = HybridSearcher::new(
        index,
        encoder.clone(),
        RetrievalConfig::default(),
        CharacterizerConfig::default(),
    )
    .unwrap()
    .with_reranker(Reranker::new(scorer.clone(), 3), 10);

    (searcher, encoder, scorer)
}
