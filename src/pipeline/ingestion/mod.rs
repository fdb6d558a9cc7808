// Pipeline ingestion: reading the delimited input files

pub mod loader;

pub use loader::{load_movies, load_ratings};
