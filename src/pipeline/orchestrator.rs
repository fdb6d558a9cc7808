use crate::config::{Config, MovieColumns, RatingColumns};
use crate::constants::{ENRICHED_MOVIES_TABLE, MOVIES_TABLE, RATINGS_TABLE};
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::ingestion::{load_movies, load_ratings};
use crate::pipeline::processing::aggregate::AggregateSummary;
use crate::pipeline::processing::enrich::{enrich_sample, Enricher, EnrichmentReport, SampleScope};
use crate::pipeline::processing::transform::{transform_movies, transform_ratings};
use crate::storage::Storage;
use crate::types::{MovieRecord, RatingRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, info_span};
use uuid::Uuid;

/// Everything a run needs, resolved from config and CLI overrides.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub movies_path: PathBuf,
    pub ratings_path: PathBuf,
    pub movie_columns: MovieColumns,
    pub rating_columns: RatingColumns,
    pub sample: SampleScope,
    pub low_count_threshold: usize,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            movies_path: config.input.movies_path.clone(),
            ratings_path: config.input.ratings_path.clone(),
            movie_columns: config.input.movie_columns.clone(),
            rating_columns: config.input.rating_columns.clone(),
            sample: SampleScope::First(config.omdb.sample_size),
            low_count_threshold: config.analysis.low_count_threshold,
        }
    }
}

/// Cleaned tables plus their summary, before enrichment. Carries the run id
/// so the later stages log under the same span.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub movies: Vec<MovieRecord>,
    pub ratings: Vec<RatingRecord>,
    pub summary: AggregateSummary,
}

/// Result of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub movies_loaded: usize,
    pub ratings_loaded: usize,
    pub summary: AggregateSummary,
    pub enrichment: EnrichmentReport,
    /// (table, rows) in write order; empty when persistence was skipped
    pub tables_written: Vec<(String, usize)>,
}

pub struct Pipeline;

impl Pipeline {
    /// Loader, Transformer and Aggregator. No network, no writes.
    pub fn analyze(config: &PipelineConfig) -> Result<Analysis> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = info_span!("pipeline", run_id = %run_id);
        let _enter = span.enter();
        info!("Starting pipeline run");

        let raw_movies = {
            let _span = info_span!("load", file = "movies").entered();
            load_movies(&config.movies_path, &config.movie_columns)?
        };
        metrics::loader::rows_loaded("movies", raw_movies.len());

        let raw_ratings = {
            let _span = info_span!("load", file = "ratings").entered();
            load_ratings(&config.ratings_path, &config.rating_columns)?
        };
        metrics::loader::rows_loaded("ratings", raw_ratings.len());

        let (movies, ratings) = {
            let _span = info_span!("transform").entered();
            (transform_movies(raw_movies), transform_ratings(raw_ratings)?)
        };

        let summary = {
            let _span = info_span!("aggregate").entered();
            AggregateSummary::compute(&movies, &ratings, config.low_count_threshold)
        };
        info!(
            "Aggregated {} ratings over {} movies and {} users; {} movies below {} ratings",
            summary.total_ratings,
            summary.ratings_per_movie.len(),
            summary.ratings_per_user.len(),
            summary.low_count_total(),
            summary.low_count_threshold
        );

        Ok(Analysis {
            run_id,
            started_at,
            movies,
            ratings,
            summary,
        })
    }

    /// Enricher and Persister over an existing analysis. With `storage` set
    /// to `None` nothing is written.
    pub fn complete(
        config: &PipelineConfig,
        analysis: Analysis,
        enricher: &dyn Enricher,
        storage: Option<&mut dyn Storage>,
    ) -> Result<PipelineResult> {
        let span = info_span!("pipeline", run_id = %analysis.run_id);
        let _enter = span.enter();

        let enrichment = {
            let _span = info_span!("enrich").entered();
            enrich_sample(enricher, &analysis.movies, config.sample)
        };

        let mut tables_written = Vec::new();
        match storage {
            Some(store) => {
                let _span = info_span!("persist").entered();
                let n = store.replace_movies(&analysis.movies)?;
                tables_written.push((MOVIES_TABLE.to_string(), n));
                let n = store.replace_ratings(&analysis.ratings)?;
                tables_written.push((RATINGS_TABLE.to_string(), n));
                let n = store.replace_enriched_movies(&enrichment.records)?;
                tables_written.push((ENRICHED_MOVIES_TABLE.to_string(), n));
            }
            None => info!("Persistence skipped"),
        }

        info!("Pipeline finished");
        Ok(PipelineResult {
            run_id: analysis.run_id,
            started_at: analysis.started_at,
            finished_at: Utc::now(),
            movies_loaded: analysis.movies.len(),
            ratings_loaded: analysis.ratings.len(),
            summary: analysis.summary,
            enrichment,
            tables_written,
        })
    }

    /// Run the complete pipeline in one call.
    pub fn run(
        config: &PipelineConfig,
        enricher: &dyn Enricher,
        storage: Option<&mut dyn Storage>,
    ) -> Result<PipelineResult> {
        let analysis = Self::analyze(config)?;
        Self::complete(config, analysis, enricher, storage)
    }
}
