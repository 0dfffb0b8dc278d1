//! Configuration management for plotfindr
//!
//! Every tuning constant of the pipeline lives here: BM25 parameters, the
//! RRF constant, default fusion weights, candidate depth, characterizer
//! thresholds and reranker settings. Loaded from TOML, then overridden by
//! `PLOTFINDR_SECTION__KEY` environment variables, then validated.

use crate::error::{PlotError, Result};
use crate::index::Bm25Params;
use crate::retrieval::{CharacterizerConfig, FailurePolicy, FusionWeights, WeightMode, DEFAULT_RRF_K};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

mod validator;

pub use validator::ConfigValidator;

pub const SCHEMA_VERSION: &str = "1.0.0";

const ENV_PREFIX: &str = "PLOTFINDR_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub lexical: Bm25Params,
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub characterizer: CharacterizerConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Where the movie collection comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// JSON / JSONL document files, concatenated in order
    pub documents: Vec<PathBuf>,
    /// Precomputed embedding rows aligned with collection order. When
    /// absent the matrix is encoded at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<PathBuf>,
}

/// Query/document encoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: usize,
}

/// Fusion and candidate-depth configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// RRF damping constant
    pub rrf_k: f32,
    pub lexical_weight: f32,
    pub semantic_weight: f32,
    /// Derive weights per query instead of using the fixed pair
    pub adaptive: bool,
    /// Per-scorer depth is `max(min_candidates, top_k * candidate_multiplier)`
    pub candidate_multiplier: usize,
    pub min_candidates: usize,
    pub failure_policy: FailurePolicy,
}

impl RetrievalConfig {
    /// Candidates requested from each scorer for a fused top-K query
    pub fn candidate_depth(&self, top_k: usize) -> usize {
        top_k
            .saturating_mul(self.candidate_multiplier)
            .max(self.min_candidates)
    }

    /// Weight mode used when a query does not pick one
    pub fn weight_mode(&self) -> WeightMode {
        if self.adaptive {
            WeightMode::Adaptive
        } else {
            WeightMode::Fixed(FusionWeights {
                lexical: self.lexical_weight,
                semantic: self.semantic_weight,
            })
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_k: DEFAULT_RRF_K,
            lexical_weight: 1.0,
            semantic_weight: 1.0,
            adaptive: false,
            candidate_multiplier: 5,
            min_candidates: 50,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

/// Cross-encoder reranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub enabled: bool,
    pub model: String,
    /// Fused shortlist size handed to the reranker
    pub candidates_limit: usize,
    pub batch_size: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "BAAI/bge-reranker-base".to_string(),
            candidates_limit: 50,
            batch_size: 16,
        }
    }
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_weight: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_weight: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_policy: Option<FailurePolicy>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PlotError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| PlotError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let config: Config = toml::from_str(&content)?;
        config.finalize(None)
    }

    /// Load from a file, or start from defaults when it does not exist.
    /// Either way env overrides and the profile are applied and the result
    /// is validated.
    pub fn load_or_default(path: &Path, profile: Option<&str>) -> Result<Self> {
        if path.exists() {
            return match profile {
                Some(profile) => Self::load_with_profile(path, profile),
                None => Self::load(path),
            };
        }

        tracing::warn!(
            "Config file not found, using defaults. Run 'plotfindr config init' to create one."
        );
        Self::default().finalize(profile)
    }

    fn finalize(mut self, profile: Option<&str>) -> Result<Self> {
        self.apply_env_overrides();
        if let Some(profile) = profile {
            self.apply_profile(profile)?;
        }
        ConfigValidator::validate(&self)?;
        Ok(self)
    }

    /// Save configuration to a file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PlotError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| PlotError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| PlotError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(model) = overrides.embedding_model {
            self.embedding.model = model;
        }
        if let Some(adaptive) = overrides.adaptive {
            self.retrieval.adaptive = adaptive;
        }
        if let Some(weight) = overrides.lexical_weight {
            self.retrieval.lexical_weight = weight;
        }
        if let Some(weight) = overrides.semantic_weight {
            self.retrieval.semantic_weight = weight;
        }
        if let Some(enabled) = overrides.rerank_enabled {
            self.rerank.enabled = enabled;
        }
        if let Some(policy) = overrides.failure_policy {
            self.retrieval.failure_policy = policy;
        }

        tracing::debug!("Applied profile '{}'", profile);
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: PLOTFINDR_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "CORPUS__EMBEDDINGS" => {
                self.corpus.embeddings = Some(PathBuf::from(value));
            }
            "LEXICAL__K1" => self.lexical.k1 = parse_env(path, value)?,
            "LEXICAL__B" => self.lexical.b = parse_env(path, value)?,
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            "EMBEDDING__BATCH_SIZE" => self.embedding.batch_size = parse_env(path, value)?,
            "RETRIEVAL__RRF_K" => self.retrieval.rrf_k = parse_env(path, value)?,
            "RETRIEVAL__LEXICAL_WEIGHT" => self.retrieval.lexical_weight = parse_env(path, value)?,
            "RETRIEVAL__SEMANTIC_WEIGHT" => {
                self.retrieval.semantic_weight = parse_env(path, value)?
            }
            "RETRIEVAL__ADAPTIVE" => self.retrieval.adaptive = parse_env(path, value)?,
            "RETRIEVAL__FAILURE_POLICY" => {
                self.retrieval.failure_policy = match value {
                    "abort" => FailurePolicy::Abort,
                    "degrade_to_survivor" | "degrade" => FailurePolicy::DegradeToSurvivor,
                    _ => {
                        return Err(PlotError::InvalidConfigValue {
                            path: path.to_string(),
                            message: format!(
                                "Expected 'abort' or 'degrade_to_survivor', got '{}'",
                                value
                            ),
                        })
                    }
                };
            }
            "RERANK__ENABLED" => self.rerank.enabled = parse_env(path, value)?,
            "RERANK__MODEL" => {
                self.rerank.model = value.to_string();
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| PlotError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("plotfindr").join("config.toml"))
    }
}

fn parse_env<T: FromStr>(path: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| PlotError::InvalidConfigValue {
        path: path.to_string(),
        message: format!(
            "Cannot parse '{}' as {}",
            value,
            std::any::type_name::<T>()
        ),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            corpus: CorpusConfig {
                documents: vec![PathBuf::from("data/movies.json")],
                embeddings: None,
            },
            lexical: Bm25Params::default(),
            embedding: EmbeddingConfig {
                model: "all-MiniLM-L6-v2".to_string(),
                batch_size: 32,
            },
            retrieval: RetrievalConfig::default(),
            characterizer: CharacterizerConfig::default(),
            rerank: RerankConfig::default(),
            profiles: HashMap::new(),
        }
    }
}
