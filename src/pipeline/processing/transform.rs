//! Derived fields for movies and rating coercion.
//!
//! Every derivation is a pure per-row function so the pipeline can apply them
//! in a single pass and tests can exercise them directly.

use crate::constants::GENRE_DELIMITER;
use crate::error::{EtlError, Result};
use crate::types::{MovieRecord, RatingRecord, RawMovie, RawRating};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

/// Four ASCII digits enclosed in parentheses, anywhere in the title. `\d` is
/// Unicode-aware and would match digits `i32::from_str` cannot parse.
static YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([0-9]{4})\)").expect("year pattern is valid"));

/// Year embedded in the title as "(YYYY)". Only the first match counts.
pub fn extract_year(title: &str) -> Option<i32> {
    YEAR_PATTERN
        .captures(title)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// The title with its first "(YYYY)" group removed, trimmed.
pub fn clean_title(title: &str) -> String {
    YEAR_PATTERN.replace(title, "").trim().to_string()
}

/// Split the genres field on `|`. Absent input yields an empty list.
pub fn split_genres(genres: Option<&str>) -> Vec<String> {
    match genres {
        Some(g) => g.split(GENRE_DELIMITER).map(str::to_string).collect(),
        None => Vec::new(),
    }
}

/// "1990s" for 1994. Floor division, so negative years still bucket downwards.
pub fn decade_label(year: i32) -> String {
    format!("{}s", year.div_euclid(10) * 10)
}

/// Parse a rating as floating point. No range check is applied.
pub fn coerce_rating(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

pub fn transform_movie(raw: RawMovie) -> MovieRecord {
    let year = extract_year(&raw.title);
    let clean_title = clean_title(&raw.title);
    let genres_list = split_genres(raw.genres.as_deref());
    let decade = year.map(decade_label);

    MovieRecord {
        id: raw.id,
        title: raw.title,
        genres: raw.genres,
        year,
        clean_title,
        genres_list,
        decade,
    }
}

#[instrument(skip_all, fields(rows = movies.len()))]
pub fn transform_movies(movies: Vec<RawMovie>) -> Vec<MovieRecord> {
    let out: Vec<MovieRecord> = movies.into_iter().map(transform_movie).collect();
    let without_year = out.iter().filter(|m| m.year.is_none()).count();
    debug!("Derived fields for {} movies ({} without a year)", out.len(), without_year);
    out
}

/// Coerce every rating. The first unparseable value aborts with its row index.
#[instrument(skip_all, fields(rows = ratings.len()))]
pub fn transform_ratings(ratings: Vec<RawRating>) -> Result<Vec<RatingRecord>> {
    ratings
        .into_iter()
        .enumerate()
        .map(|(row, raw)| {
            let rating = coerce_rating(&raw.rating).ok_or_else(|| EtlError::TypeConversion {
                row,
                value: raw.rating.clone(),
            })?;
            Ok(RatingRecord {
                user_id: raw.user_id,
                movie_id: raw.movie_id,
                rating,
                timestamp: raw.timestamp,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_movie(title: &str, genres: Option<&str>) -> RawMovie {
        RawMovie {
            id: 1,
            title: title.to_string(),
            genres: genres.map(str::to_string),
        }
    }

    #[test]
    fn toy_story_example() {
        let movie = transform_movie(raw_movie(
            "Toy Story (1995)",
            Some("Adventure|Animation|Children"),
        ));
        assert_eq!(movie.clean_title, "Toy Story");
        assert_eq!(movie.year, Some(1995));
        assert_eq!(movie.decade.as_deref(), Some("1990s"));
        assert_eq!(movie.genres_list, vec!["Adventure", "Animation", "Children"]);
        assert_eq!(movie.title, "Toy Story (1995)");
    }

    #[test]
    fn title_without_year_has_no_year_or_decade() {
        let movie = transform_movie(raw_movie("Babylon 5", Some("Sci-Fi")));
        assert_eq!(movie.year, None);
        assert_eq!(movie.decade, None);
        assert_eq!(movie.clean_title, "Babylon 5");
    }

    #[test]
    fn only_first_parenthesized_year_is_used() {
        let title = "Love (2015) (2016)";
        assert_eq!(extract_year(title), Some(2015));
        assert_eq!(clean_title(title), "Love  (2016)");
    }

    #[test]
    fn non_year_groups_are_skipped() {
        let title = "City of Lost Children, The (Cité des enfants perdus, La) (1995)";
        assert_eq!(extract_year(title), Some(1995));
        assert_eq!(
            clean_title(title),
            "City of Lost Children, The (Cité des enfants perdus, La)"
        );
    }

    #[test]
    fn partial_year_tokens_do_not_match() {
        assert_eq!(extract_year("Blade Runner (19825)"), None);
        assert_eq!(extract_year("Blade Runner (982)"), None);
        assert_eq!(extract_year("Blade Runner 1982"), None);
        assert_eq!(extract_year("Blade Runner (1982 )"), None);
        assert_eq!(clean_title("Blade Runner (19825)"), "Blade Runner (19825)");
    }

    #[test]
    fn non_ascii_digits_are_not_years() {
        assert_eq!(extract_year("Film (\u{661}\u{669}\u{669}\u{665})"), None);
        assert_eq!(
            clean_title("Film (\u{661}\u{669}\u{669}\u{665})"),
            "Film (\u{661}\u{669}\u{669}\u{665})"
        );

        let fullwidth_first = "Film (\u{FF11}\u{FF19}\u{FF19}\u{FF15}) (1995)";
        assert_eq!(extract_year(fullwidth_first), Some(1995));
        assert_eq!(
            clean_title(fullwidth_first),
            "Film (\u{FF11}\u{FF19}\u{FF19}\u{FF15})"
        );
    }

    #[test]
    fn clean_title_trims_whitespace() {
        assert_eq!(clean_title("  Heat (1995)  "), "Heat");
        assert_eq!(clean_title("(1995) Heat"), "Heat");
    }

    #[test]
    fn decade_is_floor_of_year() {
        assert_eq!(decade_label(1994), "1990s");
        assert_eq!(decade_label(2005), "2000s");
        assert_eq!(decade_label(2000), "2000s");
        assert_eq!(decade_label(1899), "1890s");
        for year in 1000..2100 {
            assert_eq!(decade_label(year), format!("{}s", (year / 10) * 10));
        }
    }

    #[test]
    fn genres_round_trip_through_delimiter() {
        for original in ["Drama", "Action|Crime|Thriller", "(no genres listed)", "A||B"] {
            let list = split_genres(Some(original));
            assert_eq!(list.join("|"), original);
        }
        assert!(split_genres(None).is_empty());
    }

    #[test]
    fn ratings_are_coerced_without_bounds_checks() {
        let raw = vec![
            RawRating {
                user_id: 1,
                movie_id: 10,
                rating: "4".to_string(),
                timestamp: Some(964982703),
            },
            RawRating {
                user_id: 2,
                movie_id: 10,
                rating: "17.5".to_string(),
                timestamp: None,
            },
        ];
        let out = transform_ratings(raw).unwrap();
        assert_eq!(out[0].rating, 4.0);
        assert_eq!(out[0].timestamp, Some(964982703));
        assert_eq!(out[1].rating, 17.5);
    }

    #[test]
    fn unparseable_rating_is_type_conversion() {
        let raw = vec![
            RawRating {
                user_id: 1,
                movie_id: 10,
                rating: "3.5".to_string(),
                timestamp: None,
            },
            RawRating {
                user_id: 1,
                movie_id: 11,
                rating: "great".to_string(),
                timestamp: None,
            },
        ];
        match transform_ratings(raw) {
            Err(EtlError::TypeConversion { row, value }) => {
                assert_eq!(row, 1);
                assert_eq!(value, "great");
            }
            other => panic!("expected TypeConversion, got {other:?}"),
        }
    }
}
