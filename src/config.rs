use crate::constants;
use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub database: DatabaseConfig,
    pub omdb: OmdbConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub movies_path: PathBuf,
    pub ratings_path: PathBuf,
    pub movie_columns: MovieColumns,
    pub rating_columns: RatingColumns,
}

/// Header names in the movies file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MovieColumns {
    pub id: String,
    pub title: String,
    pub genres: String,
}

/// Header names in the ratings file. `timestamp` may be missing from the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatingColumns {
    pub user_id: String,
    pub movie_id: String,
    pub rating: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OmdbConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub sample_size: usize,
    /// Unset means no timeout: a hung lookup blocks the run.
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub low_count_threshold: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            movies_path: PathBuf::from(constants::DEFAULT_MOVIES_PATH),
            ratings_path: PathBuf::from(constants::DEFAULT_RATINGS_PATH),
            movie_columns: MovieColumns::default(),
            rating_columns: RatingColumns::default(),
        }
    }
}

impl Default for MovieColumns {
    fn default() -> Self {
        Self {
            id: "movieId".to_string(),
            title: "title".to_string(),
            genres: "genres".to_string(),
        }
    }
}

impl Default for RatingColumns {
    fn default() -> Self {
        Self {
            user_id: "userId".to_string(),
            movie_id: "movieId".to_string(),
            rating: "rating".to_string(),
            timestamp: "timestamp".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(constants::DEFAULT_DATABASE_PATH),
        }
    }
}

impl Default for OmdbConfig {
    fn default() -> Self {
        Self {
            base_url: constants::DEFAULT_OMDB_BASE_URL.to_string(),
            api_key: None,
            sample_size: constants::DEFAULT_SAMPLE_SIZE,
            timeout_seconds: None,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            low_count_threshold: constants::DEFAULT_LOW_COUNT_THRESHOLD,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. A missing file at the default
    /// location falls back to built-in defaults; a missing file the caller
    /// named explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(constants::DEFAULT_CONFIG_PATH), false),
        };

        let mut config = if config_path.exists() {
            let config_content = fs::read_to_string(&config_path).map_err(|e| {
                EtlError::Config(format!(
                    "Failed to read config file '{}': {}",
                    config_path.display(),
                    e
                ))
            })?;
            info!("Loaded configuration from {}", config_path.display());
            Self::from_toml(&config_content)?
        } else if explicit {
            return Err(EtlError::Config(format!(
                "Config file '{}' does not exist",
                config_path.display()
            )));
        } else {
            debug!("No {} found, using defaults", config_path.display());
            Config::default()
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// `OMDB_API_KEY` overrides whatever the file says.
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(constants::OMDB_API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.omdb.api_key = Some(key.trim().to_string());
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.omdb.base_url.trim().is_empty() {
            return Err(EtlError::Config("omdb.base_url must not be empty".to_string()));
        }
        if self.analysis.low_count_threshold == 0 {
            return Err(EtlError::Config(
                "analysis.low_count_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl OmdbConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    /// The configured key, treating blanks as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}
