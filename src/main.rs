use plotfindr::cli::{Cli, Commands, ConfigAction, OutputFormat, SearchMethod};
use plotfindr::config::Config;
use plotfindr::error::{PlotError, Result};
use plotfindr::filtering::MetadataFilter;
use plotfindr::retrieval::{
    FailurePolicy, FusionWeights, HybridSearcher, RankedCandidate, SearchQuery, WeightMode,
};
use serde::Serialize;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Search {
            query,
            method,
            top_k,
            year,
            year_range,
            genre,
            country,
            adaptive,
            lexical_weight,
            semantic_weight,
            rerank,
            degrade,
            profile,
            format,
        } => {
            let mut config = load_config(cli.config, profile)?;
            if rerank {
                config.rerank.enabled = true;
            }

            let filter = build_filter(year, year_range, genre, country)?;
            let mode = weight_mode(&config, adaptive, lexical_weight, semantic_weight)?;

            let options = SearchOptions {
                method,
                top_k,
                filter,
                mode,
                rerank,
                degrade,
                format,
            };
            cmd_search(&config, &query, options).await?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "plotfindr=debug" } else { "plotfindr=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

struct SearchOptions {
    method: SearchMethod,
    top_k: usize,
    filter: MetadataFilter,
    mode: WeightMode,
    rerank: bool,
    degrade: bool,
    format: OutputFormat,
}

/// One printed result line
#[derive(Debug, Serialize)]
struct ResultRow {
    rank: usize,
    id: String,
    title: String,
    year: Option<i32>,
    score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    rerank_score: Option<f32>,
    preview: String,
}

impl ResultRow {
    fn new<C: RankedCandidate>(rank: usize, candidate: &C, rerank_score: Option<f32>) -> Self {
        let document = candidate.document();
        Self {
            rank,
            id: candidate.doc_id().to_string(),
            title: document.display_title().to_string(),
            year: document.release_year(),
            score: candidate.score(),
            rerank_score,
            preview: document.preview(100),
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchOutput {
    query: String,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    weights: Option<FusionWeights>,
    #[serde(skip_serializing_if = "Option::is_none")]
    degraded: Option<String>,
    results: Vec<ResultRow>,
}

async fn cmd_search(config: &Config, query: &str, options: SearchOptions) -> Result<()> {
    let searcher = HybridSearcher::from_config(config)?;
    let shortlist = if options.rerank {
        options.top_k.max(config.rerank.candidates_limit)
    } else {
        options.top_k
    };

    let mut output = SearchOutput {
        query: query.to_string(),
        method: format!("{:?}", options.method).to_lowercase(),
        weights: None,
        degraded: None,
        results: Vec::new(),
    };

    match options.method {
        SearchMethod::Bm25 | SearchMethod::Dense => {
            let candidates = if options.method == SearchMethod::Bm25 {
                searcher
                    .search_lexical(query, shortlist, &options.filter)
                    .await?
            } else {
                searcher
                    .search_vector(query, shortlist, &options.filter)
                    .await?
            };

            output.results = if options.rerank {
                searcher
                    .rerank(query, &candidates, Some(options.top_k))?
                    .iter()
                    .enumerate()
                    .map(|(i, r)| ResultRow::new(i + 1, &r.candidate, Some(r.rerank_score)))
                    .collect()
            } else {
                candidates
                    .iter()
                    .take(options.top_k)
                    .enumerate()
                    .map(|(i, c)| ResultRow::new(i + 1, c, None))
                    .collect()
            };
        }
        SearchMethod::Hybrid => {
            let mut request = SearchQuery::new(query, options.top_k)
                .with_filter(options.filter)
                .with_weights(options.mode)
                .with_rerank(options.rerank);
            if options.degrade {
                request = request.with_failure_policy(FailurePolicy::DegradeToSurvivor);
            }

            let response = searcher.search(&request).await?;
            output.weights = Some(response.weights);
            output.degraded = response
                .degraded
                .as_ref()
                .map(|d| format!("{} scorer failed: {}", d.failed, d.reason));

            output.results = match &response.reranked {
                Some(reranked) => reranked
                    .iter()
                    .enumerate()
                    .map(|(i, r)| ResultRow::new(i + 1, &r.candidate, Some(r.rerank_score)))
                    .collect(),
                None => response
                    .fused
                    .iter()
                    .enumerate()
                    .map(|(i, c)| ResultRow::new(i + 1, c, None))
                    .collect(),
            };
        }
    }

    match options.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&output).map_err(|e| PlotError::Json {
                source: e,
                context: "Failed to serialize search results".to_string(),
            })?;
            println!("{}", json);
        }
        OutputFormat::Table => print_table(&output),
    }

    Ok(())
}

fn print_table(output: &SearchOutput) {
    println!("Query: {} ({})", output.query, output.method);
    if let Some(weights) = &output.weights {
        println!(
            "Weights: lexical {:.3}, semantic {:.3}",
            weights.lexical, weights.semantic
        );
    }
    if let Some(degraded) = &output.degraded {
        println!("⚠ Degraded: {}", degraded);
    }

    if output.results.is_empty() {
        println!("\nNo matching movies");
        return;
    }

    println!();
    for row in &output.results {
        let year = row
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "----".to_string());
        let score = match row.rerank_score {
            Some(rerank) => format!("{:.4} (was {:.4})", rerank, row.score),
            None => format!("{:.4}", row.score),
        };
        println!("{:>3}. {} ({}) [{}]  {}", row.rank, row.title, year, row.id, score);
        println!("     {}", row.preview);
    }
}

fn build_filter(
    year: Option<i32>,
    year_range: Option<Vec<i32>>,
    genre: Option<String>,
    country: Option<String>,
) -> Result<MetadataFilter> {
    let mut filter = MetadataFilter::none();
    if let Some(year) = year {
        filter = filter.with_year(year);
    }
    if let Some(range) = year_range {
        match range.as_slice() {
            [min, max] => filter = filter.with_year_range(*min, *max),
            _ => {
                return Err(PlotError::InvalidFilter(
                    "--year-range takes exactly two years".to_string(),
                ))
            }
        }
    }
    if let Some(genre) = genre {
        filter = filter.with_genre(genre);
    }
    if let Some(country) = country {
        filter = filter.with_country(country);
    }
    filter.validate()?;
    Ok(filter)
}

fn weight_mode(
    config: &Config,
    adaptive: bool,
    lexical_weight: Option<f32>,
    semantic_weight: Option<f32>,
) -> Result<WeightMode> {
    if adaptive {
        return Ok(WeightMode::Adaptive);
    }
    if lexical_weight.is_none() && semantic_weight.is_none() {
        return Ok(config.retrieval.weight_mode());
    }

    let weights = FusionWeights::new(
        lexical_weight.unwrap_or(config.retrieval.lexical_weight),
        semantic_weight.unwrap_or(config.retrieval.semantic_weight),
    )?;
    Ok(WeightMode::Fixed(weights))
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path, None)?;
            let value = serde_json::to_value(&config).map_err(|e| PlotError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;

            let value = match section {
                Some(section) => value.get(&section).cloned().ok_or_else(|| {
                    PlotError::Config(format!("Unknown config section: {}", section))
                })?,
                None => value,
            };

            let json = serde_json::to_string_pretty(&value).map_err(|e| PlotError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
            println!("  Documents: {}", config.corpus.documents.len());
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    Config::load_or_default(&path, profile.as_deref())
}
