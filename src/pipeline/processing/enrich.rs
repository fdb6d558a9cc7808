use crate::app::ports::{HttpClientPort, HttpGetResult};
use crate::error::{EtlError, Result};
use crate::observability::metrics;
use crate::types::{EnrichedMovieRecord, MovieDetails, MovieRecord};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Why a lookup produced no details. Never fatal: the record is kept with
/// absent fields and the failure is tallied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupFailure {
    #[error("network error: {0}")]
    Network(String),

    #[error("service answered with HTTP {0}")]
    HttpStatus(u16),

    #[error("no match: {0}")]
    NotFound(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("no API key configured")]
    MissingApiKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    HttpStatus,
    NotFound,
    MalformedResponse,
    MissingApiKey,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Network => "network",
            FailureKind::HttpStatus => "http_status",
            FailureKind::NotFound => "not_found",
            FailureKind::MalformedResponse => "malformed_response",
            FailureKind::MissingApiKey => "missing_api_key",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LookupFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            LookupFailure::Network(_) => FailureKind::Network,
            LookupFailure::HttpStatus(_) => FailureKind::HttpStatus,
            LookupFailure::NotFound(_) => FailureKind::NotFound,
            LookupFailure::MalformedResponse(_) => FailureKind::MalformedResponse,
            LookupFailure::MissingApiKey => FailureKind::MissingApiKey,
        }
    }
}

/// Looks up extra metadata for a clean title.
pub trait Enricher {
    fn lookup(&self, title: &str) -> std::result::Result<MovieDetails, LookupFailure>;
}

/// How much of the movie table to send to the lookup service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleScope {
    /// The first N movies in input order
    First(usize),
    All,
}

impl SampleScope {
    pub fn take<'a>(&self, movies: &'a [MovieRecord]) -> &'a [MovieRecord] {
        match *self {
            SampleScope::First(n) => &movies[..n.min(movies.len())],
            SampleScope::All => movies,
        }
    }
}

/// Wire shape of an OMDb title lookup. Only the fields we keep are declared.
#[derive(Debug, Deserialize)]
struct OmdbResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Director")]
    director: Option<String>,
    #[serde(rename = "Plot")]
    plot: Option<String>,
    #[serde(rename = "BoxOffice")]
    box_office: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

/// Title lookups against the OMDb API (`?t=<title>&apikey=<key>`).
pub struct OmdbEnricher {
    http: Box<dyn HttpClientPort>,
    base_url: Url,
    api_key: Option<String>,
}

impl OmdbEnricher {
    pub fn new(
        http: Box<dyn HttpClientPort>,
        base_url: &str,
        api_key: Option<String>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| EtlError::Config(format!("Invalid OMDb base URL '{base_url}': {e}")))?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn url_for(&self, title: &str, api_key: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("t", title)
            .append_pair("apikey", api_key);
        url
    }

    fn interpret(response: &HttpGetResult) -> std::result::Result<MovieDetails, LookupFailure> {
        match serde_json::from_slice::<OmdbResponse>(&response.bytes) {
            Ok(parsed) if parsed.response == "True" => Ok(MovieDetails {
                director: parsed.director,
                plot: parsed.plot,
                box_office: parsed.box_office,
            }),
            Ok(parsed) if parsed.response == "False" => Err(LookupFailure::NotFound(
                parsed.error.unwrap_or_else(|| "unknown reason".to_string()),
            )),
            Ok(parsed) => Err(LookupFailure::MalformedResponse(format!(
                "unexpected Response value {:?}",
                parsed.response
            ))),
            Err(_) if !response.is_success() => Err(LookupFailure::HttpStatus(response.status)),
            Err(e) => Err(LookupFailure::MalformedResponse(e.to_string())),
        }
    }
}

impl Enricher for OmdbEnricher {
    fn lookup(&self, title: &str) -> std::result::Result<MovieDetails, LookupFailure> {
        let api_key = self.api_key.as_deref().ok_or(LookupFailure::MissingApiKey)?;
        let url = self.url_for(title, api_key);

        let started = Instant::now();
        let response = self.http.get(&url).map_err(LookupFailure::Network);
        metrics::enrich::lookup_duration(started.elapsed().as_secs_f64());

        Self::interpret(&response?)
    }
}

/// Result of enriching a sample: one record per sampled movie, in input order,
/// plus a tally of what went wrong.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentReport {
    #[serde(skip)]
    pub records: Vec<EnrichedMovieRecord>,
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: BTreeMap<FailureKind, usize>,
}

impl EnrichmentReport {
    pub fn failed(&self) -> usize {
        self.failures.values().sum()
    }
}

/// Look up each sampled movie by its clean title, one call at a time.
#[instrument(skip_all, fields(scope = ?scope))]
pub fn enrich_sample(
    enricher: &dyn Enricher,
    movies: &[MovieRecord],
    scope: SampleScope,
) -> EnrichmentReport {
    let sample = scope.take(movies);
    let mut report = EnrichmentReport {
        records: Vec::with_capacity(sample.len()),
        ..Default::default()
    };

    for movie in sample {
        report.attempted += 1;
        match enricher.lookup(&movie.clean_title) {
            Ok(details) => {
                debug!(movie_id = movie.id, title = %movie.clean_title, "Enriched");
                metrics::enrich::lookup_succeeded();
                report.succeeded += 1;
                report
                    .records
                    .push(EnrichedMovieRecord::new(movie.clone(), details));
            }
            Err(failure) => {
                let kind = failure.kind();
                if kind == FailureKind::MissingApiKey {
                    debug!(movie_id = movie.id, "Skipping lookup: {}", failure);
                } else {
                    warn!(movie_id = movie.id, title = %movie.clean_title, kind = %kind, "Lookup failed: {}", failure);
                }
                metrics::enrich::lookup_failed(kind.as_str());
                *report.failures.entry(kind).or_insert(0) += 1;
                report
                    .records
                    .push(EnrichedMovieRecord::without_details(movie.clone()));
            }
        }
    }

    if report.failures.contains_key(&FailureKind::MissingApiKey) {
        warn!("No OMDb API key configured; enrichment fields left empty");
    }
    info!(
        "Enrichment finished: {} attempted, {} succeeded, {} failed",
        report.attempted,
        report.succeeded,
        report.failed()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::transform::transform_movie;
    use crate::types::RawMovie;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Canned HTTP client that records every URL it is asked for.
    struct FakeHttp {
        calls: Rc<RefCell<Vec<Url>>>,
        respond: Box<dyn Fn(&Url) -> std::result::Result<HttpGetResult, String>>,
    }

    fn ok_json(value: serde_json::Value) -> std::result::Result<HttpGetResult, String> {
        Ok(HttpGetResult {
            status: 200,
            bytes: serde_json::to_vec(&value).unwrap(),
            content_type: "application/json".to_string(),
        })
    }

    impl HttpClientPort for FakeHttp {
        fn get(&self, url: &Url) -> std::result::Result<HttpGetResult, String> {
            self.calls.borrow_mut().push(url.clone());
            (self.respond)(url)
        }
    }

    fn enricher_with<F>(respond: F) -> (OmdbEnricher, Rc<RefCell<Vec<Url>>>)
    where
        F: Fn(&Url) -> std::result::Result<HttpGetResult, String> + 'static,
    {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let http = FakeHttp {
            calls: Rc::clone(&calls),
            respond: Box::new(respond),
        };
        let enricher = OmdbEnricher::new(
            Box::new(http),
            "http://omdb.test/",
            Some("secret".to_string()),
        )
        .unwrap();
        (enricher, calls)
    }

    fn movies(n: i64) -> Vec<MovieRecord> {
        (1..=n)
            .map(|id| {
                transform_movie(RawMovie {
                    id,
                    title: format!("Movie {id} (1999)"),
                    genres: None,
                })
            })
            .collect()
    }

    #[test]
    fn success_extracts_three_fields() {
        let (enricher, calls) = enricher_with(|_| {
            ok_json(json!({
                "Title": "Toy Story",
                "Director": "John Lasseter",
                "Plot": "A cowboy doll is profoundly threatened...",
                "BoxOffice": "$223,225,679",
                "Response": "True"
            }))
        });
        let details = enricher.lookup("Toy Story").unwrap();
        assert_eq!(details.director.as_deref(), Some("John Lasseter"));
        assert_eq!(details.box_office.as_deref(), Some("$223,225,679"));

        let url = &calls.borrow()[0];
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            query,
            vec![
                ("t".to_string(), "Toy Story".to_string()),
                ("apikey".to_string(), "secret".to_string())
            ]
        );
    }

    #[test]
    fn success_with_missing_fields_maps_to_absent() {
        let (enricher, _) = enricher_with(|_| ok_json(json!({"Response": "True", "Plot": "N/A"})));
        let details = enricher.lookup("Obscure").unwrap();
        assert_eq!(details.director, None);
        assert_eq!(details.plot.as_deref(), Some("N/A"));
        assert_eq!(details.box_office, None);
    }

    #[test]
    fn non_success_response_is_not_found() {
        let (enricher, _) = enricher_with(|_| {
            ok_json(json!({"Response": "False", "Error": "Movie not found!"}))
        });
        assert_eq!(
            enricher.lookup("Nope"),
            Err(LookupFailure::NotFound("Movie not found!".to_string()))
        );
    }

    #[test]
    fn network_error_is_typed() {
        let (enricher, _) = enricher_with(|_| Err("connection refused".to_string()));
        assert_eq!(
            enricher.lookup("Heat"),
            Err(LookupFailure::Network("connection refused".to_string()))
        );
    }

    #[test]
    fn garbage_body_is_malformed_or_status() {
        let (enricher, _) = enricher_with(|_| {
            Ok(HttpGetResult {
                status: 200,
                bytes: b"<html>oops</html>".to_vec(),
                content_type: "text/html".to_string(),
            })
        });
        assert_eq!(enricher.lookup("Heat").unwrap_err().kind(), FailureKind::MalformedResponse);

        let (enricher, _) = enricher_with(|_| {
            Ok(HttpGetResult {
                status: 503,
                bytes: b"Service Unavailable".to_vec(),
                content_type: "text/plain".to_string(),
            })
        });
        assert_eq!(enricher.lookup("Heat"), Err(LookupFailure::HttpStatus(503)));
    }

    #[test]
    fn error_status_with_json_body_keeps_service_message() {
        let (enricher, _) = enricher_with(|_| {
            Ok(HttpGetResult {
                status: 401,
                bytes: br#"{"Response":"False","Error":"Invalid API key!"}"#.to_vec(),
                content_type: "application/json".to_string(),
            })
        });
        assert_eq!(
            enricher.lookup("Heat"),
            Err(LookupFailure::NotFound("Invalid API key!".to_string()))
        );
    }

    #[test]
    fn missing_api_key_makes_no_call() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let http = FakeHttp {
            calls: Rc::clone(&calls),
            respond: Box::new(|_| ok_json(json!({"Response": "True"}))),
        };
        let enricher = OmdbEnricher::new(Box::new(http), "http://omdb.test/", None).unwrap();
        let report = enrich_sample(&enricher, &movies(3), SampleScope::First(10));
        assert!(calls.borrow().is_empty());
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.failures.get(&FailureKind::MissingApiKey), Some(&3));
    }

    #[test]
    fn sample_is_bounded_and_ordered() {
        let (enricher, calls) = enricher_with(|url| {
            let title = url
                .query_pairs()
                .find(|(k, _)| k == "t")
                .map(|(_, v)| v.into_owned())
                .unwrap();
            if title == "Movie 2" {
                Err("timeout".to_string())
            } else {
                ok_json(json!({"Response": "True", "Director": format!("Director of {title}")}))
            }
        });
        let all = movies(25);
        let report = enrich_sample(&enricher, &all, SampleScope::First(10));

        assert_eq!(calls.borrow().len(), 10);
        assert_eq!(report.records.len(), 10);
        assert_eq!(report.attempted, 10);
        assert_eq!(report.succeeded, 9);
        assert_eq!(report.failures.get(&FailureKind::Network), Some(&1));

        let ids: Vec<i64> = report.records.iter().map(|r| r.movie.id).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
        assert_eq!(report.records[1].details, MovieDetails::default());
        assert_eq!(
            report.records[0].details.director.as_deref(),
            Some("Director of Movie 1")
        );
    }

    #[test]
    fn scope_larger_than_table_and_all() {
        let all = movies(4);
        assert_eq!(SampleScope::First(10).take(&all).len(), 4);
        assert_eq!(SampleScope::First(0).take(&all).len(), 0);
        assert_eq!(SampleScope::All.take(&all).len(), 4);
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let http = FakeHttp {
            calls: Rc::new(RefCell::new(Vec::new())),
            respond: Box::new(|_| Err("unused".to_string())),
        };
        assert!(matches!(
            OmdbEnricher::new(Box::new(http), "not a url", None),
            Err(EtlError::Config(_))
        ));
    }
}
