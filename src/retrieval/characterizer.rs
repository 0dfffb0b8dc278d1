//! Heuristic query characterization for adaptive fusion weights
//!
//! Short, keyword-like queries (years, names) lean on lexical matching;
//! long descriptive queries lean on the dense encoder. The thresholds and
//! marker words are tuning constants, all overridable through
//! `CharacterizerConfig`.

use super::fusion::FusionWeights;
use crate::error::{PlotError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

const DEFAULT_MARKERS: &[&str] = &[
    "about",
    "story",
    "follows",
    "because",
    "after",
    "when",
    "while",
    "who",
    "discovers",
    "struggles",
];

/// Tunable constants for the query characterizer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterizerConfig {
    /// Queries with at most this many tokens get the short-query boost
    pub short_query_max_tokens: usize,
    /// Queries with at least this many tokens get the long-query boost
    pub long_query_min_tokens: usize,
    pub short_query_boost: f32,
    /// Boost for a token matching `numeral_pattern` (bare numerals, years)
    pub numeral_boost: f32,
    pub numeral_pattern: String,
    /// Boost for a capitalized token that does not start a sentence
    pub proper_noun_boost: f32,
    pub long_query_boost: f32,
    pub first_marker_boost: f32,
    /// Added for every marker after the first
    pub extra_marker_boost: f32,
    /// One-off bonus once a third marker is seen
    pub third_marker_bonus: f32,
    /// Added to both signals so neither weight can reach zero
    pub baseline: f32,
    /// Sum of the two output weights
    pub total_weight: f32,
    pub narrative_markers: Vec<String>,
}

impl Default for CharacterizerConfig {
    fn default() -> Self {
        Self {
            short_query_max_tokens: 5,
            long_query_min_tokens: 12,
            short_query_boost: 1.0,
            numeral_boost: 1.0,
            numeral_pattern: r"^\d+$".to_string(),
            proper_noun_boost: 1.0,
            long_query_boost: 1.0,
            first_marker_boost: 1.0,
            extra_marker_boost: 0.5,
            third_marker_bonus: 0.5,
            baseline: 0.5,
            total_weight: 2.0,
            narrative_markers: DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Signals and resulting weights for one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryProfile {
    pub token_count: usize,
    pub lexical_signal: f32,
    pub semantic_signal: f32,
    pub marker_count: usize,
    pub weights: FusionWeights,
}

/// Maps a raw query string to a lexical/semantic weight pair
#[derive(Debug, Clone)]
pub struct QueryCharacterizer {
    config: CharacterizerConfig,
    numeral: Regex,
    markers: HashSet<String>,
}

impl QueryCharacterizer {
    pub fn new(config: CharacterizerConfig) -> Result<Self> {
        let numeral = Regex::new(&config.numeral_pattern).map_err(|e| {
            PlotError::InvalidConfigValue {
                path: "characterizer.numeral_pattern".to_string(),
                message: format!("Invalid regex: {}", e),
            }
        })?;

        if !(config.baseline.is_finite() && config.baseline > 0.0) {
            return Err(PlotError::InvalidConfigValue {
                path: "characterizer.baseline".to_string(),
                message: format!("Baseline must be greater than 0, got {}", config.baseline),
            });
        }

        let markers = config
            .narrative_markers
            .iter()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();

        Ok(Self {
            config,
            numeral,
            markers,
        })
    }

    pub fn config(&self) -> &CharacterizerConfig {
        &self.config
    }

    /// Compute both signals and the normalized weight pair
    pub fn characterize(&self, query: &str) -> QueryProfile {
        let tokens: Vec<&str> = query.split_whitespace().collect();
        let cfg = &self.config;

        let mut lexical = 0.0;
        if !tokens.is_empty() && tokens.len() <= cfg.short_query_max_tokens {
            lexical += cfg.short_query_boost;
        }
        if tokens.iter().any(|t| self.numeral.is_match(strip_punctuation(t))) {
            lexical += cfg.numeral_boost;
        }
        if has_inner_capital(&tokens) {
            lexical += cfg.proper_noun_boost;
        }

        let mut semantic = 0.0;
        if tokens.len() >= cfg.long_query_min_tokens {
            semantic += cfg.long_query_boost;
        }

        let marker_count = tokens
            .iter()
            .filter(|t| self.markers.contains(&strip_punctuation(t).to_lowercase()))
            .count();
        if marker_count >= 1 {
            semantic += cfg.first_marker_boost;
            semantic += cfg.extra_marker_boost * (marker_count - 1) as f32;
        }
        if marker_count >= 3 {
            semantic += cfg.third_marker_bonus;
        }

        let weights = self.normalize(lexical, semantic);

        debug!(
            "Characterized query ({} tokens, {} markers): lexical={:.2} semantic={:.2} -> {:.3}/{:.3}",
            tokens.len(),
            marker_count,
            lexical,
            semantic,
            weights.lexical,
            weights.semantic
        );

        QueryProfile {
            token_count: tokens.len(),
            lexical_signal: lexical,
            semantic_signal: semantic,
            marker_count,
            weights,
        }
    }

    /// Weight pair only
    pub fn weights(&self, query: &str) -> FusionWeights {
        self.characterize(query).weights
    }

    fn normalize(&self, lexical: f32, semantic: f32) -> FusionWeights {
        let lexical = lexical + self.config.baseline;
        let semantic = semantic + self.config.baseline;
        let total = self.config.total_weight;
        let sum = lexical + semantic;

        if sum <= 0.0 || !sum.is_finite() {
            return FusionWeights::equal(total / 2.0);
        }

        FusionWeights {
            lexical: total * lexical / sum,
            semantic: total * semantic / sum,
        }
    }
}

fn strip_punctuation(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric())
}

/// Capitalized token that is not the first word of a sentence
fn has_inner_capital(tokens: &[&str]) -> bool {
    tokens.iter().enumerate().skip(1).any(|(i, token)| {
        let previous = tokens[i - 1];
        if previous.ends_with(['.', '!', '?']) {
            return false;
        }
        let word = strip_punctuation(token);
        word != "I"
            && word
                .chars()
                .next()
                .is_some_and(|c| c.is_alphabetic() && c.is_uppercase())
    })
}
