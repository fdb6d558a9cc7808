use super::Storage;
use crate::error::Result;
use crate::types::{EnrichedMovieRecord, MovieRecord, RatingRecord};
use tracing::debug;

/// In-memory storage implementation for development/testing
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    pub movies: Vec<MovieRecord>,
    pub ratings: Vec<RatingRecord>,
    pub enriched_movies: Vec<EnrichedMovieRecord>,
    /// Number of replace calls received, across all tables
    pub replace_calls: usize,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for InMemoryStorage {
    fn replace_movies(&mut self, movies: &[MovieRecord]) -> Result<usize> {
        self.movies = movies.to_vec();
        self.replace_calls += 1;
        debug!("Replaced movies with {} rows", movies.len());
        Ok(movies.len())
    }

    fn replace_ratings(&mut self, ratings: &[RatingRecord]) -> Result<usize> {
        self.ratings = ratings.to_vec();
        self.replace_calls += 1;
        debug!("Replaced ratings with {} rows", ratings.len());
        Ok(ratings.len())
    }

    fn replace_enriched_movies(&mut self, records: &[EnrichedMovieRecord]) -> Result<usize> {
        self.enriched_movies = records.to_vec();
        self.replace_calls += 1;
        debug!("Replaced enriched_movies with {} rows", records.len());
        Ok(records.len())
    }
}
