//! Table layouts for the relational store.
//!
//! Columns mirror the in-memory records; `genres_list` is stored as a JSON
//! array since SQLite has no list type.

use crate::constants::{ENRICHED_MOVIES_TABLE, MOVIES_TABLE, RATINGS_TABLE};
use crate::types::{EnrichedMovieRecord, MovieRecord, RatingRecord};
use rusqlite::types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
}

impl Column {
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self { name, column_type }
    }
}

#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl TableSchema {
    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS \"{}\"", self.name)
    }

    pub fn create_sql(&self) -> String {
        let cols: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("\"{}\" {}", c.name, c.column_type.sql_type()))
            .collect();
        format!("CREATE TABLE \"{}\" ({})", self.name, cols.join(", "))
    }

    pub fn insert_sql(&self) -> String {
        let names: Vec<String> = self.columns.iter().map(|c| format!("\"{}\"", c.name)).collect();
        let placeholders: Vec<String> = (1..=self.columns.len()).map(|i| format!("?{i}")).collect();
        format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            self.name,
            names.join(", "),
            placeholders.join(", ")
        )
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }
}

const MOVIE_COLUMNS: [Column; 7] = [
    Column::new("id", ColumnType::Integer),
    Column::new("title", ColumnType::Text),
    Column::new("genres", ColumnType::Text),
    Column::new("year", ColumnType::Integer),
    Column::new("clean_title", ColumnType::Text),
    Column::new("genres_list", ColumnType::Text),
    Column::new("decade", ColumnType::Text),
];

pub static MOVIES: TableSchema = TableSchema {
    name: MOVIES_TABLE,
    columns: &MOVIE_COLUMNS,
};

pub static RATINGS: TableSchema = TableSchema {
    name: RATINGS_TABLE,
    columns: &[
        Column::new("user_id", ColumnType::Integer),
        Column::new("movie_id", ColumnType::Integer),
        Column::new("rating", ColumnType::Real),
        Column::new("timestamp", ColumnType::Integer),
    ],
};

pub static ENRICHED_MOVIES: TableSchema = TableSchema {
    name: ENRICHED_MOVIES_TABLE,
    columns: &[
        MOVIE_COLUMNS[0],
        MOVIE_COLUMNS[1],
        MOVIE_COLUMNS[2],
        MOVIE_COLUMNS[3],
        MOVIE_COLUMNS[4],
        MOVIE_COLUMNS[5],
        MOVIE_COLUMNS[6],
        Column::new("director", ColumnType::Text),
        Column::new("plot", ColumnType::Text),
        Column::new("box_office", ColumnType::Text),
    ],
};

/// A record that can be written as one row of a table.
pub trait TableRow {
    fn schema() -> &'static TableSchema;
    fn to_values(&self) -> Vec<Value>;
}

fn text(value: &Option<String>) -> Value {
    value.clone().map(Value::Text).unwrap_or(Value::Null)
}

fn movie_values(movie: &MovieRecord) -> Vec<Value> {
    let genres_list = serde_json::to_string(&movie.genres_list).unwrap_or_else(|_| "[]".to_string());
    vec![
        Value::Integer(movie.id),
        Value::Text(movie.title.clone()),
        text(&movie.genres),
        movie.year.map(|y| Value::Integer(y as i64)).unwrap_or(Value::Null),
        Value::Text(movie.clean_title.clone()),
        Value::Text(genres_list),
        text(&movie.decade),
    ]
}

impl TableRow for MovieRecord {
    fn schema() -> &'static TableSchema {
        &MOVIES
    }

    fn to_values(&self) -> Vec<Value> {
        movie_values(self)
    }
}

impl TableRow for RatingRecord {
    fn schema() -> &'static TableSchema {
        &RATINGS
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.user_id),
            Value::Integer(self.movie_id),
            Value::Real(self.rating),
            self.timestamp.map(Value::Integer).unwrap_or(Value::Null),
        ]
    }
}

impl TableRow for EnrichedMovieRecord {
    fn schema() -> &'static TableSchema {
        &ENRICHED_MOVIES
    }

    fn to_values(&self) -> Vec<Value> {
        let mut values = movie_values(&self.movie);
        values.push(text(&self.details.director));
        values.push(text(&self.details.plot));
        values.push(text(&self.details.box_office));
        values
    }
}
