//! Persistence of the pipeline's output tables.
//!
//! Every write is a full replace: whatever the table held before is discarded.

pub mod in_memory;
pub mod schema;
pub mod sqlite;

pub use in_memory::InMemoryStorage;
pub use sqlite::SqliteStorage;

use crate::error::Result;
use crate::types::{EnrichedMovieRecord, MovieRecord, RatingRecord};

/// Storage trait for the three output tables. Each method returns the number
/// of rows written.
pub trait Storage {
    fn replace_movies(&mut self, movies: &[MovieRecord]) -> Result<usize>;
    fn replace_ratings(&mut self, ratings: &[RatingRecord]) -> Result<usize>;
    fn replace_enriched_movies(&mut self, records: &[EnrichedMovieRecord]) -> Result<usize>;
}
