//! Series loaders: CSV files and synthetic samples

use crate::error::{ForecastError, Result};
use crate::series::{parse_timestamp, Series};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

/// Label given to uploaded CSV data
pub const CSV_LABEL: &str = "CSV_DATA";

/// Seed used by the sample generators unless the caller supplies one
pub const DEFAULT_SEED: u64 = 42;

/// Column names recognised as the date column, in priority order
const DATE_COLUMNS: [&str; 3] = ["date", "timestamp", "time"];

/// Load a series from a CSV file on disk
pub fn load_csv<P: AsRef<Path>>(path: P, label: &str) -> Result<Series> {
    let file = File::open(path)?;
    let df = CsvReader::new(file)
        .infer_schema(None)
        .has_header(true)
        .finish()?;
    series_from_frame(&df, label)
}

/// Load a series from CSV bytes, e.g. an uploaded file
pub fn parse_csv_bytes(bytes: Vec<u8>, label: &str) -> Result<Series> {
    let df = CsvReader::new(Cursor::new(bytes))
        .infer_schema(None)
        .has_header(true)
        .finish()?;
    series_from_frame(&df, label)
}

/// Pick the date and value columns, drop incomplete rows and sort by date.
///
/// The date column is the first one named `date`, `timestamp` or `time`
/// (any case), otherwise the first column. The value column is the first
/// numeric column other than the date column.
fn series_from_frame(df: &DataFrame, label: &str) -> Result<Series> {
    let columns = df.get_columns();
    let date_column = DATE_COLUMNS
        .iter()
        .find_map(|wanted| {
            columns
                .iter()
                .find(|c| c.name().eq_ignore_ascii_case(wanted))
        })
        .or_else(|| columns.first())
        .ok_or_else(|| ForecastError::Data("CSV has no columns".to_string()))?;

    let value_column = columns
        .iter()
        .filter(|c| c.name() != date_column.name())
        .find(|c| c.dtype().is_numeric())
        .ok_or_else(|| ForecastError::Data("CSV has no numeric value column".to_string()))?;

    let dates = date_column.cast(&DataType::Utf8)?;
    let values = value_column.cast(&DataType::Float64)?;

    let mut rows: Vec<(NaiveDateTime, f64)> = Vec::with_capacity(df.height());
    for (date, value) in dates.utf8()?.into_iter().zip(values.f64()?.into_iter()) {
        match (date, value) {
            (Some(date), Some(value)) if value.is_finite() => {
                rows.push((parse_timestamp(date)?, value));
            }
            _ => continue,
        }
    }
    if rows.is_empty() {
        return Err(ForecastError::Data(
            "CSV contains no complete rows".to_string(),
        ));
    }

    rows.sort_by_key(|(ts, _)| *ts);
    if let Some(pair) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(ForecastError::Data(format!(
            "Duplicate timestamp {} in CSV",
            pair[0].0
        )));
    }

    let (timestamps, values): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
    tracing::debug!(
        rows = timestamps.len(),
        date_column = date_column.name(),
        value_column = value_column.name(),
        "parsed CSV series"
    );
    Series::new(label, timestamps, values)
}

/// Built-in synthetic datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    /// Daily 2020-2024, linear trend with an annual cycle
    #[default]
    Trend,
    /// Monthly 2010-2023 growth rate with a business cycle
    Economic,
    /// Daily 2021-2024 temperature with annual and weekly cycles
    Temperature,
}

impl FromStr for SampleKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "trend" | "sample" | "default" => Ok(SampleKind::Trend),
            "economic" => Ok(SampleKind::Economic),
            "temperature" => Ok(SampleKind::Temperature),
            other => Err(ForecastError::InvalidConfig(format!(
                "Unknown sample kind '{}'",
                other
            ))),
        }
    }
}

/// Generate a sample series; the same seed always yields the same data.
pub fn generate_sample(kind: SampleKind, seed: u64) -> Result<Series> {
    let mut rng = StdRng::seed_from_u64(seed);
    match kind {
        SampleKind::Trend => {
            let dates = daily_range(ymd(2020, 1, 1)?, ymd(2024, 1, 1)?);
            let noise = Normal::new(0.0, 10.0).map_err(distribution_error)?;
            let trend = linspace(100.0, 200.0, dates.len());
            let values = trend
                .iter()
                .enumerate()
                .map(|(i, level)| {
                    level + 20.0 * (2.0 * PI * i as f64 / 365.25).sin() + noise.sample(&mut rng)
                })
                .collect();
            Series::new("SAMPLE", dates, values)
        }
        SampleKind::Economic => {
            let dates = month_ends(ymd(2010, 1, 31)?, ymd(2023, 12, 31)?);
            let noise = Normal::new(0.0, 0.1).map_err(distribution_error)?;
            let trend = linspace(2.5, 3.2, dates.len());
            let values = trend
                .iter()
                .enumerate()
                .map(|(i, level)| {
                    let t = i as f64;
                    level
                        + 0.5 * (2.0 * PI * t / 96.0).sin()
                        + 0.2 * (2.0 * PI * t / 12.0).sin()
                        + noise.sample(&mut rng)
                })
                .collect();
            Series::new("ECONOMIC", dates, values)
        }
        SampleKind::Temperature => {
            let dates = daily_range(ymd(2021, 1, 1)?, ymd(2024, 1, 1)?);
            let noise = Normal::new(0.0, 3.0).map_err(distribution_error)?;
            let values = (0..dates.len())
                .map(|i| {
                    let t = i as f64;
                    15.0 + 0.02 * t / 365.0
                        + 15.0 * (2.0 * PI * t / 365.25 - PI / 2.0).sin()
                        + 2.0 * (2.0 * PI * t / 7.0).sin()
                        + noise.sample(&mut rng)
                })
                .collect();
            Series::new("TEMPERATURE", dates, values)
        }
    }
}

fn distribution_error(err: rand_distr::NormalError) -> ForecastError {
    ForecastError::Data(format!("Invalid noise distribution: {}", err))
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ForecastError::Data(format!("Invalid date {}-{}-{}", year, month, day)))
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    NaiveDateTime::new(date, chrono::NaiveTime::MIN)
}

/// Inclusive daily range
fn daily_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDateTime> {
    let days = (end - start).num_days().max(0);
    (0..=days)
        .map(|i| midnight(start + Duration::days(i)))
        .collect()
}

/// Inclusive range of month-end dates
fn month_ends(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDateTime> {
    let mut out = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());
    loop {
        let next_first = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        };
        let Some(last_day) = next_first.and_then(|d| d.pred_opt()) else {
            break;
        };
        if last_day > end {
            break;
        }
        out.push(midnight(last_day));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    out
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}
