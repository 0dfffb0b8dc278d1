//! CLI command definitions and parsing
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "plotfindr",
    version,
    about = "Find movies by describing their plot",
    long_about = "plotfindr ranks a movie collection against a free-text plot description using \
                  BM25, dense embeddings, or a weighted rank fusion of both, with optional \
                  metadata filters and cross-encoder reranking."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/plotfindr/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which scorer(s) rank the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchMethod {
    /// Lexical BM25 only
    Bm25,
    /// Dense embeddings only
    Dense,
    /// Rank fusion of both
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the collection by plot description
    Search {
        /// Plot description or keywords
        #[arg(short, long)]
        query: String,

        /// Ranking method
        #[arg(short, long, value_enum, default_value = "hybrid")]
        method: SearchMethod,

        /// Number of results to return
        #[arg(short = 'k', long, default_value = "10")]
        top_k: usize,

        /// Only movies released in this year
        #[arg(long)]
        year: Option<i32>,

        /// Only movies released between MIN and MAX (inclusive)
        #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
        year_range: Option<Vec<i32>>,

        /// Only movies with this genre
        #[arg(long)]
        genre: Option<String>,

        /// Only movies from this country
        #[arg(long)]
        country: Option<String>,

        /// Derive fusion weights from the query text
        #[arg(long, conflicts_with_all = ["lexical_weight", "semantic_weight"])]
        adaptive: bool,

        /// Fixed weight for the BM25 ranking
        #[arg(long)]
        lexical_weight: Option<f32>,

        /// Fixed weight for the dense ranking
        #[arg(long)]
        semantic_weight: Option<f32>,

        /// Rerank the shortlist with a cross-encoder
        #[arg(long)]
        rerank: bool,

        /// Keep going with one scorer if the other fails
        #[arg(long)]
        degrade: bool,

        /// Profile to apply (e.g., "precise", "fast")
        #[arg(short, long)]
        profile: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section (e.g., "retrieval")
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
