use serde::{Deserialize, Serialize};

/// A movie row as read from the input file, before any derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMovie {
    pub id: i64,
    /// Raw title, usually with the release year embedded: "Toy Story (1995)"
    pub title: String,
    /// `|`-delimited genres; `None` when the cell was empty
    pub genres: Option<String>,
}

/// A rating row as read from the input file. The rating stays textual until
/// it is coerced by the transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRating {
    pub user_id: i64,
    pub movie_id: i64,
    pub rating: String,
    pub timestamp: Option<i64>,
}

/// A movie with its derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: i64,
    pub title: String,
    pub genres: Option<String>,
    pub year: Option<i32>,
    pub clean_title: String,
    pub genres_list: Vec<String>,
    /// "1990s" style label; present exactly when `year` is
    pub decade: Option<String>,
}

/// A rating after coercion. No bounds check is applied to `rating`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub user_id: i64,
    pub movie_id: i64,
    pub rating: f64,
    pub timestamp: Option<i64>,
}

/// Fields obtained from the external metadata service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub director: Option<String>,
    pub plot: Option<String>,
    pub box_office: Option<String>,
}

/// A sampled movie merged with whatever the lookup returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedMovieRecord {
    pub movie: MovieRecord,
    pub details: MovieDetails,
}

impl EnrichedMovieRecord {
    pub fn new(movie: MovieRecord, details: MovieDetails) -> Self {
        Self { movie, details }
    }

    /// The record written when a lookup fails or is never attempted.
    pub fn without_details(movie: MovieRecord) -> Self {
        Self::new(movie, MovieDetails::default())
    }
}
