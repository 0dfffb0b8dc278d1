/// In-memory BM25 keyword index over the movie collection
use super::tokenizer::tokenize;
use super::SearchHit;
use crate::corpus::Collection;
use crate::filtering::MetadataFilter;
use ahash::{HashMap, HashMapExt};
use serde::{Deserialize, Serialize};

/// Smallest idf a matching term may carry. Keeps very common terms from
/// contributing zero or negative evidence on small corpora.
const MIN_IDF: f32 = 1e-3;

/// BM25 Okapi parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    /// Term-frequency saturation
    pub k1: f32,
    /// Length normalization strength (0 = none, 1 = full)
    pub b: f32,
    /// Fraction of the mean idf assigned to terms with non-positive idf
    pub epsilon: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

#[derive(Debug, Clone)]
struct Posting {
    doc: usize,
    term_frequency: u32,
}

/// BM25 keyword index.
///
/// Built once from a collection and read-only afterwards. Documents with an
/// empty plot summary are not indexed and can never be returned.
#[derive(Debug)]
pub struct KeywordIndex {
    postings: HashMap<String, Vec<Posting>>,
    idf: HashMap<String, f32>,
    doc_lengths: Vec<u32>,
    indexed: Vec<bool>,
    indexed_count: usize,
    average_doc_length: f32,
    params: Bm25Params,
}

impl KeywordIndex {
    /// Build the index for every document with a non-empty summary
    pub fn build(collection: &Collection, params: Bm25Params) -> Self {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lengths = vec![0u32; collection.len()];
        let mut indexed = vec![false; collection.len()];
        let mut indexed_count = 0usize;
        let mut total_length = 0u64;

        for (doc, document) in collection.iter().enumerate() {
            if document.summary().is_empty() {
                continue;
            }

            let tokens = tokenize(&document.passage());
            doc_lengths[doc] = tokens.len() as u32;
            indexed[doc] = true;
            indexed_count += 1;
            total_length += tokens.len() as u64;

            let mut frequencies: HashMap<&str, u32> = HashMap::new();
            for token in &tokens {
                *frequencies.entry(token.as_str()).or_insert(0) += 1;
            }

            for (term, term_frequency) in frequencies {
                postings.entry(term.to_string()).or_default().push(Posting {
                    doc,
                    term_frequency,
                });
            }
        }

        let average_doc_length = if indexed_count == 0 {
            0.0
        } else {
            total_length as f32 / indexed_count as f32
        };

        let idf = compute_idf(&postings, indexed_count, params.epsilon);

        tracing::info!(
            "Keyword index built: {} of {} documents indexed, {} terms, avg length {:.1}",
            indexed_count,
            collection.len(),
            postings.len(),
            average_doc_length
        );

        Self {
            postings,
            idf,
            doc_lengths,
            indexed,
            indexed_count,
            average_doc_length,
            params,
        }
    }

    /// Score every document against pre-tokenized query terms.
    ///
    /// Unindexed documents and documents sharing no term with the query
    /// score exactly zero. Repeated query terms contribute repeatedly.
    pub fn score_tokens(&self, query_tokens: &[String]) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.doc_lengths.len()];
        if self.indexed_count == 0 {
            return scores;
        }

        let Bm25Params { k1, b, .. } = self.params;

        for token in query_tokens {
            let (Some(postings), Some(&idf)) = (self.postings.get(token), self.idf.get(token))
            else {
                continue;
            };

            for posting in postings {
                let tf = posting.term_frequency as f32;
                let length_ratio = if self.average_doc_length > 0.0 {
                    self.doc_lengths[posting.doc] as f32 / self.average_doc_length
                } else {
                    0.0
                };
                let tf_norm = (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * length_ratio));
                scores[posting.doc] += idf * tf_norm;
            }
        }

        scores
    }

    /// Top-K documents for a raw query after filtering.
    ///
    /// Sorted by score descending; equal scores keep collection order.
    pub fn search(
        &self,
        collection: &Collection,
        query: &str,
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Vec<SearchHit> {
        let tokens = tokenize(query);
        if tokens.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let scores = self.score_tokens(&tokens);

        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .enumerate()
            .filter(|&(doc, score)| score > 0.0 && self.indexed[doc])
            .filter(|&(doc, _)| {
                collection
                    .get(doc)
                    .map(|document| filter.matches(document))
                    .unwrap_or(false)
            })
            .map(|(index, score)| SearchHit { index, score })
            .collect();

        // Stable sort keeps collection order among ties
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        hits
    }

    /// Whether the document at `index` participates in keyword scoring
    pub fn is_indexed(&self, index: usize) -> bool {
        self.indexed.get(index).copied().unwrap_or(false)
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.indexed_count
    }

    pub fn is_empty(&self) -> bool {
        self.indexed_count == 0
    }

    pub fn average_doc_length(&self) -> f32 {
        self.average_doc_length
    }

    pub fn idf(&self, term: &str) -> Option<f32> {
        self.idf.get(term).copied()
    }
}

/// Okapi idf with non-positive values replaced by `epsilon * mean idf`
fn compute_idf(
    postings: &HashMap<String, Vec<Posting>>,
    doc_count: usize,
    epsilon: f32,
) -> HashMap<String, f32> {
    let n = doc_count as f32;
    let mut idf = HashMap::with_capacity(postings.len());
    let mut idf_sum = 0.0f32;
    let mut negative = Vec::new();

    for (term, list) in postings {
        let df = list.len() as f32;
        let value = ((n - df + 0.5) / (df + 0.5)).ln();
        idf_sum += value;
        // Zero counts too: a term present in exactly half the corpus
        // would otherwise never score.
        if value <= 0.0 {
            negative.push(term.clone());
        }
        idf.insert(term.clone(), value);
    }

    if !idf.is_empty() {
        let floor = (epsilon * idf_sum / idf.len() as f32).max(MIN_IDF);
        for term in negative {
            idf.insert(term, floor);
        }
    }

    idf
}
