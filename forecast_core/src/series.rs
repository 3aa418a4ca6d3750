//! Univariate time series and the repository holding the current one

use crate::error::{ForecastError, Result};
use crate::frequency::Frequency;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use series_math::stationarity::{adf_test, AdfResult};
use series_math::stats;
use std::sync::{Arc, RwLock};

/// Shortest series any model will be fitted on
pub const MIN_OBSERVATIONS: usize = 10;

/// An ordered sequence of timestamped observations
///
/// Timestamps are strictly increasing and every value is finite. A series
/// is never mutated after construction; loads replace it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    label: String,
    timestamps: Vec<NaiveDateTime>,
    values: Vec<f64>,
}

/// Descriptive information about a series
#[derive(Debug, Clone, Serialize)]
pub struct SeriesSummary {
    pub label: String,
    pub length: usize,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub frequency: Frequency,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Unit root test on the raw values, when enough data is present
    pub stationarity: Option<AdfResult>,
}

impl Series {
    /// Create a series, validating ordering and values
    pub fn new(label: impl Into<String>, timestamps: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::Data(format!(
                "Got {} timestamps for {} values",
                timestamps.len(),
                values.len()
            )));
        }
        if values.is_empty() {
            return Err(ForecastError::Data("Series is empty".to_string()));
        }
        if let Some(pos) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ForecastError::Data(format!(
                "Timestamps must be strictly increasing: {} is followed by {}",
                timestamps[pos],
                timestamps[pos + 1]
            )));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::Data(format!(
                "Value at position {} is not finite",
                pos
            )));
        }

        Ok(Self {
            label: label.into(),
            timestamps,
            values,
        })
    }

    /// Create a series from date strings (see [`parse_timestamp`])
    pub fn from_strings<S: AsRef<str>>(label: impl Into<String>, dates: &[S], values: Vec<f64>) -> Result<Self> {
        let timestamps = dates
            .iter()
            .map(|d| parse_timestamp(d.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(label, timestamps, values)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Last observation time
    pub fn last_timestamp(&self) -> NaiveDateTime {
        // Construction guarantees at least one observation
        self.timestamps[self.timestamps.len() - 1]
    }

    /// The most recent `n` observations, or the whole series if shorter
    pub fn tail(&self, n: usize) -> Series {
        let start = self.len().saturating_sub(n);
        Series {
            label: self.label.clone(),
            timestamps: self.timestamps[start..].to_vec(),
            values: self.values[start..].to_vec(),
        }
    }

    /// Inferred sampling frequency
    pub fn frequency(&self) -> Frequency {
        Frequency::infer(&self.timestamps)
    }

    /// Timestamps for the `horizon` steps after the last observation
    pub fn future_timestamps(&self, horizon: usize) -> Vec<NaiveDateTime> {
        self.frequency()
            .future_timestamps(self.last_timestamp(), horizon)
    }

    /// Midnight of the first observation's date; origin of the day axis
    pub fn origin(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.timestamps[0].date(), NaiveTime::MIN)
    }

    /// Fractional days since [`Series::origin`]
    pub fn day_offsets(&self) -> Vec<f64> {
        self.offsets_of(&self.timestamps)
    }

    /// Fractional days from [`Series::origin`] to each of `times`
    pub fn offsets_of(&self, times: &[NaiveDateTime]) -> Vec<f64> {
        let origin = self.origin();
        times
            .iter()
            .map(|t| (*t - origin).num_seconds() as f64 / 86_400.0)
            .collect()
    }

    /// Observation times rendered as ISO strings
    pub fn date_strings(&self) -> Vec<String> {
        format_timestamps(&self.timestamps)
    }

    /// Descriptive statistics
    pub fn summary(&self) -> SeriesSummary {
        let min = self.values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        SeriesSummary {
            label: self.label.clone(),
            length: self.len(),
            start: self.timestamps[0],
            end: self.last_timestamp(),
            frequency: self.frequency(),
            mean: stats::mean(&self.values),
            std_dev: stats::std_dev(&self.values),
            min,
            max,
            stationarity: adf_test(&self.values, None).ok(),
        }
    }
}

/// Render timestamps as `YYYY-MM-DD` when all fall on midnight, otherwise with a time part.
pub fn format_timestamps(timestamps: &[NaiveDateTime]) -> Vec<String> {
    let date_only = timestamps
        .iter()
        .all(|t| t.num_seconds_from_midnight() == 0);
    let format = if date_only {
        "%Y-%m-%d"
    } else {
        "%Y-%m-%dT%H:%M:%S"
    };
    timestamps
        .iter()
        .map(|t| t.format(format).to_string())
        .collect()
}

/// Parse an ISO-like date or date-time string.
///
/// Accepts RFC 3339, `YYYY-MM-DD[ T]HH:MM:SS[.fff]`, `YYYY-MM-DD`,
/// `YYYY/MM/DD`, `MM/DD/YYYY` and `YYYYMMDD`.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(dt);
            }
        }
    }
    Err(ForecastError::Data(format!("Unrecognized date: '{}'", raw)))
}

/// Holds the currently loaded series
///
/// Readers take an `Arc` snapshot and never hold the lock while fitting.
#[derive(Debug, Default)]
pub struct SeriesRepository {
    current: RwLock<Option<Arc<Series>>>,
}

impl SeriesRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current series, returning the new snapshot
    pub fn replace(&self, series: Series) -> Arc<Series> {
        let snapshot = Arc::new(series);
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// The current series, if one has been loaded
    pub fn snapshot(&self) -> Option<Arc<Series>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daily(n: usize) -> Series {
        let dates: Vec<String> = (0..n)
            .map(|i| {
                (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64))
                    .to_string()
            })
            .collect();
        let values = (0..n).map(|i| i as f64).collect();
        Series::from_strings("TEST", &dates, values).unwrap()
    }

    #[test]
    fn test_rejects_unordered_and_duplicate_timestamps() {
        let result = Series::from_strings("X", &["2024-01-02", "2024-01-01"], vec![1.0, 2.0]);
        assert!(matches!(result, Err(ForecastError::Data(_))));

        let result = Series::from_strings("X", &["2024-01-01", "2024-01-01"], vec![1.0, 2.0]);
        assert!(matches!(result, Err(ForecastError::Data(_))));
    }

    #[test]
    fn test_rejects_bad_values_and_lengths() {
        assert!(Series::from_strings("X", &["2024-01-01"], vec![f64::NAN]).is_err());
        assert!(Series::from_strings("X", &["2024-01-01"], vec![1.0, 2.0]).is_err());
        let empty: [&str; 0] = [];
        assert!(Series::from_strings("X", &empty, vec![]).is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        for raw in ["2024-03-05", "2024/03/05", "03/05/2024", "20240305", "2024-03-05T00:00:00Z"] {
            assert_eq!(parse_timestamp(raw).unwrap(), expected, "{}", raw);
        }
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_tail_and_future() {
        let series = daily(20);
        let tail = series.tail(5);
        assert_eq!(tail.len(), 5);
        assert_eq!(tail.values()[0], 15.0);
        assert_eq!(series.tail(100).len(), 20);

        let future = series.future_timestamps(2);
        assert_eq!(future[0].date().to_string(), "2024-01-21");
        assert_eq!(series.date_strings()[0], "2024-01-01");
    }

    #[test]
    fn test_repository_replaces_snapshot() {
        let repo = SeriesRepository::new();
        assert!(repo.snapshot().is_none());

        let first = repo.replace(daily(10));
        let held = repo.snapshot().unwrap();
        repo.replace(daily(12));

        // An earlier snapshot is unaffected by later loads
        assert_eq!(held.len(), 10);
        assert!(Arc::ptr_eq(&first, &held));
        assert_eq!(repo.snapshot().unwrap().len(), 12);
    }
}
