use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use movie_etl::config::Config;
use movie_etl::constants;
use movie_etl::infra::ReqwestHttp;
use movie_etl::logging;
use movie_etl::observability::metrics;
use movie_etl::pipeline::processing::enrich::{Enricher, OmdbEnricher, SampleScope};
use movie_etl::pipeline::{Pipeline, PipelineConfig, PipelineResult};
use movie_etl::storage::{SqliteStorage, Storage};
use std::path::PathBuf;
use tracing::{error, warn};

#[derive(Parser)]
#[command(name = "movie_etl")]
#[command(about = "Clean, summarize, enrich and load movie metadata and ratings")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to config.toml (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Movies file (overrides config)
    #[arg(long)]
    movies: Option<PathBuf>,
    /// Ratings file (overrides config)
    #[arg(long)]
    ratings: Option<PathBuf>,
    /// Movies with fewer ratings than this are flagged
    #[arg(long)]
    threshold: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: load, transform, summarize, enrich, persist
    Run {
        #[command(flatten)]
        input: InputArgs,
        /// SQLite database file (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Number of movies to enrich, taken from the top of the file
        #[arg(long, conflicts_with = "all")]
        sample_size: Option<usize>,
        /// Enrich every movie (one lookup per movie)
        #[arg(long)]
        all: bool,
        /// Stop after enrichment without writing to the database
        #[arg(long)]
        skip_persist: bool,
        /// Write a Prometheus text snapshot of run metrics to this file
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },
    /// Load, transform and summarize only. No network, no writes
    Stats {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Look up a single title against the metadata service
    Lookup {
        #[arg(long)]
        title: String,
    },
}

fn apply_input_overrides(config: &mut Config, input: &InputArgs) {
    if let Some(p) = &input.movies {
        config.input.movies_path = p.clone();
    }
    if let Some(p) = &input.ratings {
        config.input.ratings_path = p.clone();
    }
    if let Some(t) = input.threshold {
        config.analysis.low_count_threshold = t;
    }
}

fn build_enricher(config: &Config) -> anyhow::Result<OmdbEnricher> {
    let http = ReqwestHttp::new(config.omdb.timeout()).context("Failed to build HTTP client")?;
    let enricher = OmdbEnricher::new(
        Box::new(http),
        &config.omdb.base_url,
        config.omdb.api_key().map(str::to_string),
    )?;
    Ok(enricher)
}

fn print_run_report(result: &PipelineResult) {
    let e = &result.enrichment;
    println!("🔎 Enrichment: {} attempted, {} succeeded, {} failed", e.attempted, e.succeeded, e.failed());
    for (kind, count) in &e.failures {
        println!("   - {kind}: {count}");
    }

    if result.tables_written.is_empty() {
        println!("💾 Persistence skipped");
    } else {
        for (table, rows) in &result.tables_written {
            println!("💾 {table}: {rows} rows");
        }
    }
    let secs = (result.finished_at - result.started_at).num_milliseconds() as f64 / 1000.0;
    println!("✅ ETL completed in {secs:.2}s (run {})", result.run_id);
}

fn run(
    mut config: Config,
    input: InputArgs,
    db: Option<PathBuf>,
    sample_size: Option<usize>,
    all: bool,
    skip_persist: bool,
    metrics_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Err(e) = metrics::init() {
        warn!("{}", e);
    }

    apply_input_overrides(&mut config, &input);
    if let Some(path) = db {
        config.database.path = path;
    }
    if let Some(n) = sample_size {
        config.omdb.sample_size = n;
    }
    config.validate()?;

    let mut pipeline_config = PipelineConfig::from_config(&config);
    if all {
        pipeline_config.sample = SampleScope::All;
    }

    let enricher = build_enricher(&config)?;
    if !enricher.has_api_key() {
        println!("⚠️  No OMDb API key set ({}); enrichment fields will be empty", constants::OMDB_API_KEY_ENV);
    }

    let analysis = Pipeline::analyze(&pipeline_config).context("Pipeline failed")?;
    println!("{}", analysis.summary.render());

    // Opened only once the inputs have loaded, so a bad input leaves no file behind
    let mut store = if skip_persist {
        None
    } else {
        Some(SqliteStorage::open(&config.database.path)?)
    };

    let result = Pipeline::complete(
        &pipeline_config,
        analysis,
        &enricher,
        store.as_mut().map(|s| s as &mut dyn Storage),
    )
    .context("Pipeline failed")?;

    if let Some(store) = store {
        store.close()?;
    }

    print_run_report(&result);

    if let Some(path) = metrics_out {
        metrics::write_snapshot(&path)
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    }
    if let Ok(url) = std::env::var(constants::PUSHGATEWAY_URL_ENV) {
        if !url.trim().is_empty() {
            metrics::push_snapshot(&url, &result.run_id.to_string());
        }
    }
    Ok(())
}

fn stats(mut config: Config, input: InputArgs) -> anyhow::Result<()> {
    apply_input_overrides(&mut config, &input);
    config.validate()?;
    let analysis = Pipeline::analyze(&PipelineConfig::from_config(&config))?;
    println!("{}", analysis.summary.render());
    println!("📊 {} movies, {} ratings", analysis.movies.len(), analysis.ratings.len());
    Ok(())
}

fn lookup(config: Config, title: &str) -> anyhow::Result<()> {
    let enricher = build_enricher(&config)?;
    match enricher.lookup(title) {
        Ok(details) => {
            let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
            println!("🎬 {title}");
            println!("   Director:  {}", show(&details.director));
            println!("   Plot:      {}", show(&details.plot));
            println!("   BoxOffice: {}", show(&details.box_office));
        }
        Err(failure) => {
            println!("⚠️  Lookup for {title:?} failed ({}): {}", failure.kind(), failure);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let outcome = match cli.command {
        Commands::Run {
            input,
            db,
            sample_size,
            all,
            skip_persist,
            metrics_out,
        } => run(config, input, db, sample_size, all, skip_persist, metrics_out),
        Commands::Stats { input } => stats(config, input),
        Commands::Lookup { title } => lookup(config, &title),
    };

    if let Err(e) = &outcome {
        error!("{:#}", e);
    }
    outcome
}
