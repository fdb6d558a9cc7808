/// Table names in the relational store. Each is rewritten in full on every run.
pub const MOVIES_TABLE: &str = "movies";
pub const RATINGS_TABLE: &str = "ratings";
pub const ENRICHED_MOVIES_TABLE: &str = "enriched_movies";

// Defaults used when config.toml omits a value
pub const DEFAULT_MOVIES_PATH: &str = "data/movies.csv";
pub const DEFAULT_RATINGS_PATH: &str = "data/ratings.csv";
pub const DEFAULT_DATABASE_PATH: &str = "movie_pipeline.db";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_OMDB_BASE_URL: &str = "http://www.omdbapi.com/";

/// Only the first N movies are sent to the lookup service unless asked otherwise.
pub const DEFAULT_SAMPLE_SIZE: usize = 10;

/// Movies with strictly fewer ratings than this are flagged as low-count.
pub const DEFAULT_LOW_COUNT_THRESHOLD: usize = 5;

pub const GENRE_DELIMITER: char = '|';
pub const RATING_HISTOGRAM_BINS: usize = 10;

pub const OMDB_API_KEY_ENV: &str = "OMDB_API_KEY";
pub const PUSHGATEWAY_URL_ENV: &str = "ETL_PUSHGATEWAY_URL";
