use super::schema::{TableRow, TableSchema};
use super::Storage;
use crate::error::{EtlError, Result};
use crate::observability::metrics;
use crate::types::{EnrichedMovieRecord, MovieRecord, RatingRecord};
use rusqlite::{params_from_iter, Connection};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// File-backed SQLite store. The connection lives as long as this value;
/// call [`SqliteStorage::close`] to release it and observe close errors.
pub struct SqliteStorage {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path).map_err(|source| EtlError::Database {
            path: path.clone(),
            source,
        })?;
        info!("Opened SQLite store at {}", path.display());
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop and recreate `schema`'s table, then insert `rows`, all in one
    /// transaction. Either the new contents land or the old ones stay.
    #[instrument(skip(self, schema, rows), fields(table = schema.name, rows = rows.len()))]
    fn replace_table<T: TableRow>(&mut self, schema: &'static TableSchema, rows: &[T]) -> Result<usize> {
        let started = Instant::now();
        let storage_err = |e: rusqlite::Error| EtlError::storage(schema.name, e);

        let tx = self.conn.transaction().map_err(storage_err)?;
        tx.execute(&schema.drop_sql(), []).map_err(storage_err)?;
        tx.execute(&schema.create_sql(), []).map_err(storage_err)?;
        {
            let mut stmt = tx.prepare(&schema.insert_sql()).map_err(storage_err)?;
            for row in rows {
                stmt.execute(params_from_iter(row.to_values()))
                    .map_err(storage_err)?;
            }
        }
        tx.commit().map_err(storage_err)?;

        let secs = started.elapsed().as_secs_f64();
        metrics::storage::rows_written(schema.name, rows.len());
        metrics::storage::replace_duration(schema.name, secs);
        debug!("Replaced table {} with {} rows in {:.3}s", schema.name, rows.len(), secs);
        Ok(rows.len())
    }

    pub fn row_count(&self, table: &str) -> Result<i64> {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| row.get(0))
            .map_err(|e| EtlError::storage(table, e))
    }

    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.conn
            .close()
            .map_err(|(_, source)| EtlError::Database { path, source })
    }
}

impl Storage for SqliteStorage {
    fn replace_movies(&mut self, movies: &[MovieRecord]) -> Result<usize> {
        self.replace_table(MovieRecord::schema(), movies)
    }

    fn replace_ratings(&mut self, ratings: &[RatingRecord]) -> Result<usize> {
        self.replace_table(RatingRecord::schema(), ratings)
    }

    fn replace_enriched_movies(&mut self, records: &[EnrichedMovieRecord]) -> Result<usize> {
        self.replace_table(EnrichedMovieRecord::schema(), records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::transform::transform_movie;
    use crate::types::{MovieDetails, RawMovie};
    use tempfile::TempDir;

    fn movie(id: i64, title: &str, genres: Option<&str>) -> MovieRecord {
        transform_movie(RawMovie {
            id,
            title: title.to_string(),
            genres: genres.map(str::to_string),
        })
    }

    #[test]
    fn writes_movies_with_derived_columns() {
        let dir = TempDir::new().unwrap();
        let mut store = SqliteStorage::open(dir.path().join("out.db")).unwrap();
        store
            .replace_movies(&[movie(1, "Toy Story (1995)", Some("Adventure|Animation")), movie(2, "Untitled", None)])
            .unwrap();

        let (clean, year, decade, list): (String, Option<i64>, Option<String>, String) = store
            .conn
            .query_row(
                "SELECT clean_title, year, decade, genres_list FROM movies WHERE id = 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .unwrap();
        assert_eq!(clean, "Toy Story");
        assert_eq!(year, Some(1995));
        assert_eq!(decade.as_deref(), Some("1990s"));
        assert_eq!(list, "[\"Adventure\",\"Animation\"]");

        let (year, genres): (Option<i64>, Option<String>) = store
            .conn
            .query_row("SELECT year, genres FROM movies WHERE id = 2", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(year, None);
        assert_eq!(genres, None);
    }

    #[test]
    fn second_replace_discards_first() {
        let dir = TempDir::new().unwrap();
        let mut store = SqliteStorage::open(dir.path().join("out.db")).unwrap();
        let first: Vec<RatingRecord> = (0..5)
            .map(|i| RatingRecord { user_id: i, movie_id: 1, rating: 3.0, timestamp: None })
            .collect();
        let second = vec![RatingRecord { user_id: 9, movie_id: 2, rating: 0.5, timestamp: Some(1) }];

        store.replace_ratings(&first).unwrap();
        assert_eq!(store.row_count("ratings").unwrap(), 5);
        store.replace_ratings(&second).unwrap();
        assert_eq!(store.row_count("ratings").unwrap(), 1);

        let user: i64 = store
            .conn
            .query_row("SELECT user_id FROM ratings", [], |r| r.get(0))
            .unwrap();
        assert_eq!(user, 9);
    }

    #[test]
    fn enriched_table_has_detail_columns() {
        let dir = TempDir::new().unwrap();
        let mut store = SqliteStorage::open(dir.path().join("nested/dir/out.db")).unwrap();
        let record = EnrichedMovieRecord::new(
            movie(1, "Heat (1995)", Some("Action")),
            MovieDetails {
                director: Some("Michael Mann".to_string()),
                plot: None,
                box_office: Some("$67,436,818".to_string()),
            },
        );
        assert_eq!(store.replace_enriched_movies(&[record]).unwrap(), 1);
        let (director, plot): (Option<String>, Option<String>) = store
            .conn
            .query_row("SELECT director, plot FROM enriched_movies", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(director.as_deref(), Some("Michael Mann"));
        assert_eq!(plot, None);
        store.close().unwrap();
    }

    #[test]
    fn empty_table_is_still_created() {
        let dir = TempDir::new().unwrap();
        let mut store = SqliteStorage::open(dir.path().join("out.db")).unwrap();
        store.replace_ratings(&[]).unwrap();
        assert_eq!(store.row_count("ratings").unwrap(), 0);
    }

    #[test]
    fn missing_table_count_names_table() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStorage::open(dir.path().join("out.db")).unwrap();
        let err = store.row_count("nope").unwrap_err();
        assert!(matches!(err, EtlError::Storage { ref table, .. } if table == "nope"));
    }
}
