use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Input file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Malformed input in {} (line {line}): {message}", path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("CSV reader failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Rating at row {row} is not a number: {value:?}")]
    TypeConversion { row: usize, value: String },

    #[error("Database error at {}: {source}", path.display())]
    Database {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Storage error on table '{table}': {source}")]
    Storage {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EtlError {
    pub fn storage(table: impl Into<String>, source: rusqlite::Error) -> Self {
        EtlError::Storage {
            table: table.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
