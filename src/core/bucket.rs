//! Downsampling of a dense daily series into labeled day/week/month points.

use crate::core::history::NetWorthPoint;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Granularity::Day => "day",
                Granularity::Week => "week",
                Granularity::Month => "month",
            }
        )
    }
}

impl FromStr for Granularity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "d" => Ok(Granularity::Day),
            "week" | "w" => Ok(Granularity::Week),
            "month" | "m" => Ok(Granularity::Month),
            _ => Err(anyhow::anyhow!("Invalid granularity: {}", s)),
        }
    }
}

/// The Sunday starting the week containing `date`.
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

fn day_label(date: NaiveDate) -> String {
    date.format("%-d %b").to_string()
}

fn month_label(date: NaiveDate) -> String {
    date.format("%b %y").to_string()
}

/// Compresses a daily series to one representative point per bucket.
///
/// The representative of a week or month bucket is its last chronological
/// point; accumulation is order-independent, so the input need not be
/// sorted. Output is ordered by bucket key.
pub fn aggregate(series: &[NetWorthPoint], granularity: Granularity) -> Vec<NetWorthPoint> {
    match granularity {
        Granularity::Day => {
            let mut points: Vec<NetWorthPoint> = series
                .iter()
                .map(|p| NetWorthPoint {
                    label: Some(day_label(p.date)),
                    ..p.clone()
                })
                .collect();
            points.sort_by_key(|p| p.date);
            points
        }
        Granularity::Week => {
            let mut buckets: BTreeMap<NaiveDate, NetWorthPoint> = BTreeMap::new();
            for point in series {
                let key = week_start(point.date);
                let replace = buckets
                    .get(&key)
                    .is_none_or(|existing| point.date >= existing.date);
                if replace {
                    buckets.insert(
                        key,
                        NetWorthPoint {
                            label: Some(day_label(key)),
                            ..point.clone()
                        },
                    );
                }
            }
            buckets.into_values().collect()
        }
        Granularity::Month => {
            let mut buckets: BTreeMap<(i32, u32), NetWorthPoint> = BTreeMap::new();
            for point in series {
                let key = (point.date.year(), point.date.month());
                let replace = buckets
                    .get(&key)
                    .is_none_or(|existing| point.date >= existing.date);
                if replace {
                    buckets.insert(
                        key,
                        NetWorthPoint {
                            label: Some(month_label(point.date)),
                            ..point.clone()
                        },
                    );
                }
            }
            buckets.into_values().collect()
        }
    }
}

/// Week downsampling aligned to "today" for chart rendering: snap `today` to
/// the most recent Sunday, walk backward `weeks_back` weeks, and pick the
/// data point nearest each target Sunday within a 7-day tolerance.
///
/// This intentionally produces different bucket boundaries than
/// `aggregate(.., Week)`: buckets are centered on target Sundays instead of
/// spanning Sunday-to-Saturday windows. Targets with no point in tolerance
/// are skipped.
pub fn aggregate_weeks_anchored(
    series: &[NetWorthPoint],
    weeks_back: u32,
    today: NaiveDate,
) -> Vec<NetWorthPoint> {
    let anchor = week_start(today);
    let mut points = Vec::new();

    for offset in (0..=weeks_back).rev() {
        let target = anchor - Duration::days(7 * offset as i64);
        let nearest = series
            .iter()
            .map(|p| ((p.date - target).num_days().abs(), p))
            .filter(|(distance, _)| *distance <= 7)
            .min_by_key(|(distance, p)| (*distance, p.date));
        if let Some((_, point)) = nearest {
            points.push(NetWorthPoint {
                label: Some(day_label(target)),
                ..point.clone()
            });
        }
    }

    points
}
