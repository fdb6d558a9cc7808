use crate::config::{MovieColumns, RatingColumns};
use crate::error::{EtlError, Result};
use crate::types::{RawMovie, RawRating};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Reads the movies file. Required columns: id, title, genres.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_movies<P: AsRef<Path>>(path: P, columns: &MovieColumns) -> Result<Vec<RawMovie>> {
    let path = path.as_ref();
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();
    let index = HeaderIndex::new(path, &headers);

    let id_idx = index.require(&columns.id)?;
    let title_idx = index.require(&columns.title)?;
    let genres_idx = index.require(&columns.genres)?;

    let mut movies = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| csv_error(path, e))?;
        let line = line_of(&record);

        let id = parse_int(path, line, &columns.id, field(&record, id_idx))?;
        let title = field(&record, title_idx).to_string();
        let genres = non_empty(field(&record, genres_idx));

        movies.push(RawMovie { id, title, genres });
    }

    info!("Loaded {} movies", movies.len());
    Ok(movies)
}

/// Reads the ratings file. Required columns: user id, movie id, rating.
/// The timestamp column is optional and so is each of its cells.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_ratings<P: AsRef<Path>>(path: P, columns: &RatingColumns) -> Result<Vec<RawRating>> {
    let path = path.as_ref();
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();
    let index = HeaderIndex::new(path, &headers);

    let user_idx = index.require(&columns.user_id)?;
    let movie_idx = index.require(&columns.movie_id)?;
    let rating_idx = index.require(&columns.rating)?;
    let timestamp_idx = index.find(&columns.timestamp);
    if timestamp_idx.is_none() {
        debug!("No '{}' column; timestamps will be absent", columns.timestamp);
    }

    let mut ratings = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| csv_error(path, e))?;
        let line = line_of(&record);

        let user_id = parse_int(path, line, &columns.user_id, field(&record, user_idx))?;
        let movie_id = parse_int(path, line, &columns.movie_id, field(&record, movie_idx))?;
        let rating = field(&record, rating_idx).trim().to_string();
        let timestamp = match timestamp_idx.map(|i| field(&record, i).trim()) {
            Some(raw) if !raw.is_empty() => Some(parse_int(path, line, &columns.timestamp, raw)?),
            _ => None,
        };

        ratings.push(RawRating {
            user_id,
            movie_id,
            rating,
            timestamp,
        });
    }

    info!("Loaded {} ratings", ratings.len());
    Ok(ratings)
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => EtlError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => EtlError::Io(e),
    })?;
    Ok(ReaderBuilder::new().has_headers(true).from_reader(file))
}

struct HeaderIndex<'a> {
    path: &'a Path,
    headers: &'a StringRecord,
}

impl<'a> HeaderIndex<'a> {
    fn new(path: &'a Path, headers: &'a StringRecord) -> Self {
        Self { path, headers }
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.find(name).ok_or_else(|| EtlError::Parse {
            path: self.path.to_path_buf(),
            line: 1,
            message: format!("missing required column '{name}'"),
        })
    }
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn parse_int(path: &Path, line: u64, column: &str, raw: &str) -> Result<i64> {
    raw.trim().parse::<i64>().map_err(|_| EtlError::Parse {
        path: path.to_path_buf(),
        line,
        message: format!("column '{column}' expected an integer, got {raw:?}"),
    })
}

/// Unequal field counts come back from the reader as csv errors; report them
/// against the file and line like any other malformed row.
fn csv_error(path: &Path, err: csv::Error) -> EtlError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    let malformed_row = matches!(
        err.kind(),
        csv::ErrorKind::UnequalLengths { .. } | csv::ErrorKind::Utf8 { .. }
    );
    if malformed_row {
        EtlError::Parse {
            path: PathBuf::from(path),
            line,
            message: err.to_string(),
        }
    } else {
        EtlError::Csv(err)
    }
}
