//! Pure transformations from repository records to chart-ready series.
//!
//! None of these functions keep state between calls: the same input always gives the same
//! output.

use crate::models::{DaysOfWeek, HistogramRecord, VariationRow};
use crate::pattern::OdPattern;

use serde::Serialize;
use time::macros::format_description;
use time::{Date, Month};

/// Width of the centered smoothing window
pub const SMOOTHING_WINDOW: usize = 7;

/// Colour used to grey out the open-ended histogram bucket
pub const OVERFLOW_COLOR: &str = "#B3B3B3";

/// Number of x axis labels to aim for
const AXIS_LABELS: usize = 15;

/// Smooth a series with a centered moving average.
///
/// Values closer than half a window to either end are returned unchanged.
pub fn smooth(values: &[f64]) -> Vec<f64> {
    let half = SMOOTHING_WINDOW / 2;
    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            if i < half || i + half >= values.len() {
                *value
            } else {
                values[i - half..=i + half].iter().sum::<f64>() / SMOOTHING_WINDOW as f64
            }
        })
        .collect()
}

/// Months of the traffic dataset, `2008-12` to `2013-04` inclusive.
pub fn traffic_calendar() -> Vec<String> {
    let mut year = 2008;
    let mut month = Month::December;
    let mut calendar = Vec::new();
    loop {
        calendar.push(format!("{year}-{:02}", u8::from(month)));
        if (year, month) == (2013, Month::April) {
            return calendar;
        }
        if month == Month::December {
            year += 1;
        }
        month = month.next();
    }
}

/// Parse a `YYYY-MM` month label.
fn parse_month(label: &str) -> Option<(i32, Month)> {
    let format = format_description!("[year]-[month]-[day]");
    let date = Date::parse(&format!("{label}-01"), &format).ok()?;
    Some((date.year(), date.month()))
}

/// Values of one calendar year.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct YearBucket {
    pub year: i32,
    /// `(month index 0-11, value)` pairs in calendar order
    pub points: Vec<(usize, f64)>,
}

/// Group monthly values by calendar year.
///
/// A new bucket starts each time the year changes while scanning the calendar. Values past the
/// end of the shorter input are ignored, as are malformed labels.
///
/// # Arguments
///
/// * `calendar`: `YYYY-MM` labels in order
/// * `values`: Value for each month of the calendar
pub fn bucket_by_year<S: AsRef<str>>(calendar: &[S], values: &[f64]) -> Vec<YearBucket> {
    let mut buckets: Vec<YearBucket> = Vec::new();
    for (label, value) in calendar.iter().zip(values) {
        let Some((year, month)) = parse_month(label.as_ref()) else {
            continue;
        };
        let index = usize::from(u8::from(month)) - 1;
        match buckets.last_mut() {
            Some(bucket) if bucket.year == year => bucket.points.push((index, *value)),
            _ => buckets.push(YearBucket {
                year,
                points: vec![(index, *value)],
            }),
        }
    }
    buckets
}

/// Kind of histogram, which decides how buckets are labelled.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HistogramKind {
    /// Buckets of one week, labelled `i-(i+1)`
    AdvancePurchase,
    /// Buckets of one day, labelled `i`
    TripDuration,
}

impl HistogramKind {
    fn label(self, index: usize) -> String {
        match self {
            Self::AdvancePurchase => format!("{}-{}", index, index + 1),
            Self::TripDuration => index.to_string(),
        }
    }
}

/// One histogram bucket ready for display.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistogramBin {
    pub label: String,
    pub value: f64,
    /// Share of all requests, in percent with one decimal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_percent: Option<f64>,
    /// Whether this is the open-ended last bucket
    pub overflow: bool,
}

/// Label histogram buckets.
///
/// The last bucket is open-ended and labelled `(n-1)+`.
///
/// # Arguments
///
/// * `values`: Bucket values
/// * `kind`: Kind of histogram
/// * `total`: Total number of requests, used for shares. Shares are omitted unless positive.
pub fn histogram_bins(values: &[f64], kind: HistogramKind, total: f64) -> Vec<HistogramBin> {
    let last = values.len().saturating_sub(1);
    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let overflow = i == last;
            HistogramBin {
                label: if overflow {
                    format!("{last}+")
                } else {
                    kind.label(i)
                },
                value: *value,
                share_percent: share_percent(*value, total),
                overflow,
            }
        })
        .collect()
}

/// Range of trip durations, in days, compatible with the observed weekend departure and return
/// days.
///
/// Returns `(min, max)`; the range is empty when `min > max`.
pub fn weekend_range(departure_days: DaysOfWeek, return_days: DaysOfWeek) -> (usize, usize) {
    let missing = |days: DaysOfWeek, day: u8| usize::from(!days.contains(day));
    let no_thursday = missing(departure_days, 4);
    let no_friday = missing(departure_days, 5);
    let no_saturday = missing(departure_days, 6);
    let max = 4 - no_thursday - (no_thursday & no_friday) - missing(return_days, 1);
    let min = 1 + no_saturday + (no_saturday & no_friday) + missing(return_days, 0);
    (min, max)
}

/// Keep the bins of a weekend-only trip duration histogram that fall in the [weekend_range].
pub fn weekend_trim<T: Clone>(
    bins: &[T],
    departure_days: DaysOfWeek,
    return_days: DaysOfWeek,
) -> Vec<T> {
    let (min, max) = weekend_range(departure_days, return_days);
    if min > max || min >= bins.len() {
        return vec![];
    }
    bins[min..=max.min(bins.len() - 1)].to_vec()
}

/// One bar of a variation ranking.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VariationPoint {
    /// O&D code
    pub category: String,
    /// Delta in percent
    pub y: f64,
    pub value_period1: f64,
    pub value_period2: f64,
    pub market: String,
}

/// The first `n` rows of a variation ranking, in order.
pub fn top_variations(rows: &[VariationRow], n: usize, market_name: &str) -> Vec<VariationPoint> {
    rows.iter()
        .take(n)
        .map(|row| VariationPoint {
            category: row.ond_code.clone(),
            y: row.delta_percent,
            value_period1: row.value_period1,
            value_period2: row.value_period2,
            market: market_name.to_string(),
        })
        .collect()
}

/// Name to display for a market code.
pub fn market_display_name(code: &str) -> &str {
    match code {
        "TU" => "TUI France",
        "TS" => "TUI Web",
        "TB" => "TUI B2B",
        _ => code,
    }
}

/// Title suffix naming the O&D, e.g. ` from PAR to NYC`.
///
/// Only given for a single O&D, and only for the sides that are not wildcards.
pub fn ond_filter_label(onds: &[OdPattern]) -> String {
    let mut label = String::new();
    if let [ond] = onds {
        if ond.origin.chars().count() == 3 {
            label.push_str(&format!(" from {}", ond.origin));
        }
        if ond.destination.chars().count() == 3 {
            label.push_str(&format!(" to {}", ond.destination));
        }
    }
    label
}

/// Period description of an advance purchase histogram.
pub fn advance_purchase_period_label(record: &HistogramRecord) -> String {
    let descriptor = &record.descriptor;
    match (
        &descriptor.first_day,
        &descriptor.last_day,
        &descriptor.period,
        descriptor.ptype,
    ) {
        (Some(first_day), Some(last_day), _, _) => {
            let weekend = if record.weekend_only {
                " (weekend only)"
            } else {
                ""
            };
            format!("{first_day}/{last_day}{weekend}")
        }
        (_, _, Some(period), Some(ptype)) => format!("{period} ({})", ptype.full_name()),
        _ => String::new(),
    }
}

/// Period description of a trip duration histogram.
pub fn trip_duration_period_label(record: &HistogramRecord) -> String {
    let period = record.descriptor.period.as_deref().unwrap_or_default();
    if record.weekend_only {
        format!("{period} (weekend only)")
    } else if let Some(ptype) = record.descriptor.ptype {
        format!("{period} ({})", ptype.full_name())
    } else {
        period.to_string()
    }
}

/// Share of `value` in `total`, in percent rounded to one decimal.
pub fn share_percent(value: f64, total: f64) -> Option<f64> {
    if total > 0.0 {
        Some((1000.0 * value / total).round() / 10.0)
    } else {
        None
    }
}

/// Short form of a count: values above 1000 in thousands with one decimal.
pub fn compact_count(value: f64) -> String {
    if value > 1000.0 {
        format!("{}K", (value * 10.0 / 1000.0).round() / 10.0)
    } else {
        format!("{}", value.round())
    }
}

/// Show every `label_step`-th x axis label.
pub fn label_step(len: usize) -> usize {
    len / AXIS_LABELS
}

/// Day of the week of a `YYYY-MM-DD` label.
pub fn weekday_name(label: &str) -> Option<String> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(label, &format)
        .ok()
        .map(|date| date.weekday().to_string())
}
