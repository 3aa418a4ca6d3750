//! Sampling frequency inference and future timestamp generation

use chrono::{Datelike, Duration, Months, NaiveDateTime, Weekday};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

const MINUTE: i64 = 60;
const HOUR: i64 = 3_600;
const DAY: i64 = 86_400;

/// Sampling frequency of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Minutely,
    Hourly,
    Daily,
    /// Daily observations that skip weekends
    BusinessDaily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    /// Any other regular spacing
    Fixed { seconds: i64 },
}

impl Frequency {
    /// Infer the frequency from the most common gap between timestamps.
    ///
    /// Ties go to the shorter gap. Fewer than two timestamps read as daily.
    pub fn infer(timestamps: &[NaiveDateTime]) -> Self {
        if timestamps.len() < 2 {
            return Frequency::Daily;
        }

        let gaps: Vec<i64> = timestamps
            .windows(2)
            .map(|w| (w[1] - w[0]).num_seconds())
            .collect();
        let mut counts: HashMap<i64, usize> = HashMap::new();
        for &gap in &gaps {
            *counts.entry(gap).or_insert(0) += 1;
        }
        let modal = counts
            .iter()
            .max_by(|(ga, ca), (gb, cb)| ca.cmp(cb).then(gb.cmp(ga)))
            .map(|(gap, _)| *gap)
            .unwrap_or(DAY);

        match modal {
            MINUTE => Frequency::Minutely,
            HOUR => Frequency::Hourly,
            DAY => {
                let weekdays_only = timestamps
                    .iter()
                    .all(|ts| !matches!(ts.weekday(), Weekday::Sat | Weekday::Sun));
                let long_gaps = gaps.iter().filter(|&&g| g > DAY).count();
                if weekdays_only && long_gaps * 10 >= gaps.len() {
                    Frequency::BusinessDaily
                } else {
                    Frequency::Daily
                }
            }
            g if g == 7 * DAY => Frequency::Weekly,
            g if (28 * DAY..=31 * DAY).contains(&g) => Frequency::Monthly,
            g if (89 * DAY..=92 * DAY).contains(&g) => Frequency::Quarterly,
            g if (365 * DAY..=366 * DAY).contains(&g) => Frequency::Yearly,
            seconds => Frequency::Fixed {
                seconds: seconds.max(1),
            },
        }
    }

    /// Typical seasonal cycle length in observations
    pub fn default_seasonal_period(&self) -> Option<usize> {
        match self {
            Frequency::Minutely => Some(60),
            Frequency::Hourly => Some(24),
            Frequency::Daily => Some(7),
            Frequency::BusinessDaily => Some(5),
            Frequency::Weekly => Some(52),
            Frequency::Monthly => Some(12),
            Frequency::Quarterly => Some(4),
            Frequency::Yearly | Frequency::Fixed { .. } => None,
        }
    }

    /// Nominal spacing in days, used to decide which seasonalities are observable
    pub fn nominal_days(&self) -> f64 {
        match self {
            Frequency::Minutely => 1.0 / 1440.0,
            Frequency::Hourly => 1.0 / 24.0,
            Frequency::Daily | Frequency::BusinessDaily => 1.0,
            Frequency::Weekly => 7.0,
            Frequency::Monthly => 30.4375,
            Frequency::Quarterly => 91.3125,
            Frequency::Yearly => 365.25,
            Frequency::Fixed { seconds } => *seconds as f64 / DAY as f64,
        }
    }

    /// The `horizon` timestamps following `last`.
    ///
    /// Calendar frequencies step from `last` as an anchor so month ends do not drift.
    pub fn future_timestamps(&self, last: NaiveDateTime, horizon: usize) -> Vec<NaiveDateTime> {
        match self {
            Frequency::Monthly | Frequency::Quarterly | Frequency::Yearly => {
                let step = match self {
                    Frequency::Monthly => 1,
                    Frequency::Quarterly => 3,
                    _ => 12,
                };
                (1..=horizon as u32)
                    .map(|k| add_months(last, k * step))
                    .collect()
            }
            Frequency::BusinessDaily => {
                let mut out = Vec::with_capacity(horizon);
                let mut current = last;
                while out.len() < horizon {
                    current += Duration::days(1);
                    if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                        out.push(current);
                    }
                }
                out
            }
            other => {
                let step = Duration::seconds(other.step_seconds());
                (1..=horizon as i32).map(|k| last + step * k).collect()
            }
        }
    }

    fn step_seconds(&self) -> i64 {
        match self {
            Frequency::Minutely => MINUTE,
            Frequency::Hourly => HOUR,
            Frequency::Weekly => 7 * DAY,
            Frequency::Fixed { seconds } => *seconds,
            _ => DAY,
        }
    }
}

/// Month arithmetic that keeps month-end anchors at month end
fn add_months(anchor: NaiveDateTime, months: u32) -> NaiveDateTime {
    let is_month_end = (anchor + Duration::days(1)).month() != anchor.month();
    let shifted = anchor
        .checked_add_months(Months::new(months))
        .unwrap_or(anchor + Duration::days(30 * i64::from(months)));
    if !is_month_end {
        return shifted;
    }
    // Roll forward to the last day of the target month
    let mut end = shifted;
    while (end + Duration::days(1)).month() == end.month() {
        end += Duration::days(1);
    }
    end
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Minutely => write!(f, "minutely"),
            Frequency::Hourly => write!(f, "hourly"),
            Frequency::Daily => write!(f, "daily"),
            Frequency::BusinessDaily => write!(f, "business_daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Quarterly => write!(f, "quarterly"),
            Frequency::Yearly => write!(f, "yearly"),
            Frequency::Fixed { seconds } => write!(f, "every {}s", seconds),
        }
    }
}
