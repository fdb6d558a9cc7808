//! Count-based summary statistics over the rating set.
//!
//! Nothing here is persisted; the summary is rendered for the operator and
//! returned to the caller.

use crate::constants::RATING_HISTOGRAM_BINS;
use crate::types::{MovieRecord, RatingRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Descriptive statistics over a non-empty sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1). Undefined for a single observation.
    pub std: Option<f64>,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

/// Statistics over a distribution that may be empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Describe {
    NoData,
    Stats(DescriptiveStats),
}

impl Describe {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Describe::NoData;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let std = if n > 1 {
            let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            Some((ss / (n - 1) as f64).sqrt())
        } else {
            None
        };

        Describe::Stats(DescriptiveStats {
            count: n,
            mean,
            std,
            min: sorted[0],
            p25: quantile(&sorted, 0.25),
            p50: quantile(&sorted, 0.50),
            p75: quantile(&sorted, 0.75),
            max: sorted[n - 1],
        })
    }

    pub fn from_counts(counts: &BTreeMap<i64, usize>) -> Self {
        let values: Vec<f64> = counts.values().map(|&c| c as f64).collect();
        Self::from_values(&values)
    }

    pub fn stats(&self) -> Option<&DescriptiveStats> {
        match self {
            Describe::NoData => None,
            Describe::Stats(s) => Some(s),
        }
    }
}

/// Linear interpolation between closest ranks. `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// One bar of the rating histogram, covering `[lower, upper)`; the last bin is closed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width bins spanning the observed rating range.
pub fn rating_histogram(ratings: &[RatingRecord], bins: usize) -> Vec<HistogramBin> {
    let finite: Vec<f64> = ratings
        .iter()
        .map(|r| r.rating)
        .filter(|r| r.is_finite())
        .collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // A single distinct value still gets a usable range
    let (lo, hi) = if min == max { (min - 0.5, max + 0.5) } else { (min, max) };
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0usize; bins];
    for value in finite {
        let idx = (((value - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: lo + width * i as f64,
            upper: lo + width * (i + 1) as f64,
            count,
        })
        .collect()
}

/// Movie count per decade label, sorted by label. Movies without a decade are skipped.
pub fn movies_per_decade(movies: &[MovieRecord]) -> BTreeMap<String, usize> {
    let mut out = BTreeMap::new();
    for decade in movies.iter().filter_map(|m| m.decade.as_ref()) {
        *out.entry(decade.clone()).or_insert(0) += 1;
    }
    out
}

pub fn count_by<F>(ratings: &[RatingRecord], key: F) -> BTreeMap<i64, usize>
where
    F: Fn(&RatingRecord) -> i64,
{
    let mut counts = BTreeMap::new();
    for rating in ratings {
        *counts.entry(key(rating)).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateSummary {
    pub total_ratings: usize,
    pub ratings_per_movie: BTreeMap<i64, usize>,
    pub ratings_per_user: BTreeMap<i64, usize>,
    pub movie_stats: Describe,
    pub user_stats: Describe,
    pub low_count_threshold: usize,
    /// Movie ids with strictly fewer ratings than the threshold, ascending
    pub low_count_movies: Vec<i64>,
    pub movies_per_decade: BTreeMap<String, usize>,
    pub rating_histogram: Vec<HistogramBin>,
}

impl AggregateSummary {
    pub fn compute(movies: &[MovieRecord], ratings: &[RatingRecord], threshold: usize) -> Self {
        let ratings_per_movie = count_by(ratings, |r| r.movie_id);
        let ratings_per_user = count_by(ratings, |r| r.user_id);
        let movie_stats = Describe::from_counts(&ratings_per_movie);
        let user_stats = Describe::from_counts(&ratings_per_user);
        let low_count_movies = ratings_per_movie
            .iter()
            .filter(|&(_, &count)| count < threshold)
            .map(|(&id, _)| id)
            .collect();

        Self {
            total_ratings: ratings.len(),
            ratings_per_movie,
            ratings_per_user,
            movie_stats,
            user_stats,
            low_count_threshold: threshold,
            low_count_movies,
            movies_per_decade: movies_per_decade(movies),
            rating_histogram: rating_histogram(ratings, RATING_HISTOGRAM_BINS),
        }
    }

    pub fn low_count_total(&self) -> usize {
        self.low_count_movies.len()
    }

    /// Human-readable report for stdout.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("Ratings per movie summary:\n");
        render_describe(&mut out, &self.movie_stats);
        out.push('\n');

        let _ = writeln!(
            out,
            "Movies with less than {} ratings: {}\n",
            self.low_count_threshold,
            self.low_count_total()
        );

        out.push_str("Ratings per user summary:\n");
        render_describe(&mut out, &self.user_stats);
        out.push('\n');

        out.push_str("Rating distribution:\n");
        if self.rating_histogram.is_empty() {
            out.push_str("  (no data)\n");
        }
        for bin in &self.rating_histogram {
            let _ = writeln!(out, "  [{:>6.2}, {:>6.2})  {}", bin.lower, bin.upper, bin.count);
        }
        out.push('\n');

        out.push_str("Movies per decade:\n");
        if self.movies_per_decade.is_empty() {
            out.push_str("  (no data)\n");
        }
        for (decade, count) in &self.movies_per_decade {
            let _ = writeln!(out, "  {decade:<7} {count}");
        }
        out
    }
}

fn render_describe(out: &mut String, describe: &Describe) {
    match describe {
        Describe::NoData => out.push_str("  (no data)\n"),
        Describe::Stats(s) => {
            let std = s
                .std
                .map(|v| format!("{v:.6}"))
                .unwrap_or_else(|| "NaN".to_string());
            let _ = writeln!(out, "  count  {:.6}", s.count as f64);
            let _ = writeln!(out, "  mean   {:.6}", s.mean);
            let _ = writeln!(out, "  std    {std}");
            let _ = writeln!(out, "  min    {:.6}", s.min);
            let _ = writeln!(out, "  25%    {:.6}", s.p25);
            let _ = writeln!(out, "  50%    {:.6}", s.p50);
            let _ = writeln!(out, "  75%    {:.6}", s.p75);
            let _ = writeln!(out, "  max    {:.6}", s.max);
        }
    }
}
