use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{PlotError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every problem found
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_corpus(config, &mut errors);
        Self::validate_lexical(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_characterizer(config, &mut errors);
        Self::validate_rerank(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PlotError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_corpus(config: &Config, errors: &mut Vec<ValidationError>) {
        // Existence is checked at load time; paths may be relative to the
        // working directory the search runs from.
        if config.corpus.documents.is_empty() {
            errors.push(ValidationError::new(
                "corpus.documents",
                "At least one document file is required",
            ));
        }

        if config
            .corpus
            .documents
            .iter()
            .any(|p| p.as_os_str().is_empty())
        {
            errors.push(ValidationError::new(
                "corpus.documents",
                "Document file paths cannot be empty",
            ));
        }
    }

    fn validate_lexical(config: &Config, errors: &mut Vec<ValidationError>) {
        let params = &config.lexical;
        if !(params.k1.is_finite() && params.k1 > 0.0) {
            errors.push(ValidationError::new(
                "lexical.k1",
                format!("k1 must be greater than 0, got {}", params.k1),
            ));
        }

        if !(0.0..=1.0).contains(&params.b) {
            errors.push(ValidationError::new(
                "lexical.b",
                format!("b must be between 0.0 and 1.0, got {}", params.b),
            ));
        }

        if !(params.epsilon.is_finite() && params.epsilon >= 0.0) {
            errors.push(ValidationError::new(
                "lexical.epsilon",
                format!("epsilon must be non-negative, got {}", params.epsilon),
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let retrieval = &config.retrieval;

        if !(retrieval.rrf_k.is_finite() && retrieval.rrf_k >= 0.0) {
            errors.push(ValidationError::new(
                "retrieval.rrf_k",
                format!("RRF constant must be non-negative, got {}", retrieval.rrf_k),
            ));
        }

        for (path, weight) in [
            ("retrieval.lexical_weight", retrieval.lexical_weight),
            ("retrieval.semantic_weight", retrieval.semantic_weight),
        ] {
            if !(weight.is_finite() && weight >= 0.0) {
                errors.push(ValidationError::new(
                    path,
                    format!("Weight must be finite and non-negative, got {}", weight),
                ));
            }
        }

        if retrieval.lexical_weight + retrieval.semantic_weight <= 0.0 {
            errors.push(ValidationError::new(
                "retrieval",
                "lexical_weight and semantic_weight cannot both be 0",
            ));
        }

        if retrieval.candidate_multiplier == 0 {
            errors.push(ValidationError::new(
                "retrieval.candidate_multiplier",
                "Candidate multiplier must be greater than 0",
            ));
        }
    }

    fn validate_characterizer(config: &Config, errors: &mut Vec<ValidationError>) {
        let cfg = &config.characterizer;

        if cfg.short_query_max_tokens >= cfg.long_query_min_tokens {
            errors.push(ValidationError::new(
                "characterizer.short_query_max_tokens",
                format!(
                    "Must be below long_query_min_tokens ({} >= {})",
                    cfg.short_query_max_tokens, cfg.long_query_min_tokens
                ),
            ));
        }

        if !(cfg.total_weight.is_finite() && cfg.total_weight > 0.0) {
            errors.push(ValidationError::new(
                "characterizer.total_weight",
                format!("Total weight must be greater than 0, got {}", cfg.total_weight),
            ));
        }

        for (path, value) in [
            ("characterizer.short_query_boost", cfg.short_query_boost),
            ("characterizer.numeral_boost", cfg.numeral_boost),
            ("characterizer.proper_noun_boost", cfg.proper_noun_boost),
            ("characterizer.long_query_boost", cfg.long_query_boost),
            ("characterizer.first_marker_boost", cfg.first_marker_boost),
            ("characterizer.extra_marker_boost", cfg.extra_marker_boost),
            ("characterizer.third_marker_bonus", cfg.third_marker_bonus),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                errors.push(ValidationError::new(
                    path,
                    format!("Must be finite and non-negative, got {}", value),
                ));
            }
        }

        // A zero baseline lets a one-sided query zero out the other scorer
        if !(cfg.baseline.is_finite() && cfg.baseline > 0.0) {
            errors.push(ValidationError::new(
                "characterizer.baseline",
                format!("Baseline must be greater than 0, got {}", cfg.baseline),
            ));
        }

        if let Err(e) = regex::Regex::new(&cfg.numeral_pattern) {
            errors.push(ValidationError::new(
                "characterizer.numeral_pattern",
                format!("Invalid regex: {}", e),
            ));
        }
    }

    fn validate_rerank(config: &Config, errors: &mut Vec<ValidationError>) {
        let rerank = &config.rerank;

        if rerank.batch_size == 0 {
            errors.push(ValidationError::new(
                "rerank.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if rerank.enabled && rerank.model.is_empty() {
            errors.push(ValidationError::new(
                "rerank.model",
                "Model name cannot be empty when reranking is enabled",
            ));
        }

        if rerank.enabled && rerank.candidates_limit == 0 {
            errors.push(ValidationError::new(
                "rerank.candidates_limit",
                "Shortlist size must be greater than 0 when reranking is enabled",
            ));
        }
    }
}
