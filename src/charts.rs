//! Chart descriptions for the rendering front-end.
//!
//! Each builder takes a record and view options and returns `None` when there is nothing to
//! draw, in which case the front-end keeps whatever it showed before.

use crate::models::{HistogramRecord, SearchEvolutionRecord, TrafficRecord, VariationRecord};
use crate::repository::EvolutionBasis;
use crate::transform::{self, HistogramKind, OVERFLOW_COLOR};

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Number of variations shown in a ranking
pub const TOP_VARIATIONS: usize = 10;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn default_smoothing() -> bool {
    true
}

/// View parameters of a chart
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ChartOptions {
    /// Title prefix
    #[serde(default)]
    pub title: String,
    /// Smooth time series
    #[serde(default = "default_smoothing")]
    pub smoothing: bool,
    /// Variation ranking to show
    #[serde(default)]
    pub data_name: Option<String>,
}

impl Default for ChartOptions {
    fn default() -> Self {
        ChartOptions {
            title: String::new(),
            smoothing: default_smoothing(),
            data_name: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChartType {
    Area,
    Column,
    Spline,
}

/// A chart axis.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Axis {
    pub title: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    /// Show every n-th label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_step: Option<usize>,
}

/// A data point.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Point {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<usize>,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    pub tooltip: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<Point>,
}

/// Everything the front-end needs to draw a chart.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Chart {
    pub chart_type: ChartType,
    pub title: String,
    pub subtitle: String,
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub series: Vec<Series>,
}

/// Searches over time by search or travel date.
pub fn time_evolution_chart(
    record: &SearchEvolutionRecord,
    basis: EvolutionBasis,
    options: &ChartOptions,
) -> Option<Chart> {
    if record.time_evolution.is_empty() {
        return None;
    }
    let title = format!(
        "{}{} by {} date ({})",
        options.title,
        transform::ond_filter_label(&record.onds),
        basis,
        record.market
    );
    let categories: Vec<String> = record
        .time_evolution
        .iter()
        .map(|point| point.label.clone())
        .collect();
    let raw: Vec<f64> = record.time_evolution.iter().map(|point| point.value).collect();
    let values = if options.smoothing {
        transform::smooth(&raw)
    } else {
        raw
    };
    let points = categories
        .iter()
        .zip(values)
        .map(|(label, y)| {
            let weekday = transform::weekday_name(label)
                .map(|weekday| format!(" ({weekday})"))
                .unwrap_or_default();
            Point {
                y,
                tooltip: format!("{label}{weekday}: {}", transform::compact_count(y)),
                ..Default::default()
            }
        })
        .collect();
    let basis_name = match basis {
        EvolutionBasis::Search => "Search",
        EvolutionBasis::Travel => "Travel",
    };
    Some(Chart {
        chart_type: ChartType::Area,
        title,
        subtitle: "Sources: Fare search".to_string(),
        x_axis: Axis {
            title: format!("{basis_name} Day"),
            label_step: Some(transform::label_step(categories.len())),
            categories,
        },
        y_axis: Axis {
            title: "Number of Searches".to_string(),
            ..Default::default()
        },
        series: vec![Series {
            name: "time evolution".to_string(),
            points,
        }],
    })
}

/// Monthly traffic, one series per year.
pub fn traffic_chart(record: &TrafficRecord) -> Option<Chart> {
    if record.is_error || record.traffics.is_empty() {
        return None;
    }
    let series = transform::bucket_by_year(&transform::traffic_calendar(), &record.traffics)
        .into_iter()
        .map(|bucket| Series {
            name: bucket.year.to_string(),
            points: bucket
                .points
                .into_iter()
                .map(|(month, y)| Point {
                    x: Some(month),
                    y,
                    tooltip: format!(
                        "{} {}: {}",
                        MONTHS[month],
                        bucket.year,
                        transform::compact_count(y)
                    ),
                    ..Default::default()
                })
                .collect(),
        })
        .collect();
    Some(Chart {
        chart_type: ChartType::Spline,
        title: "Traffic year over year".to_string(),
        subtitle: format!(
            "{} - {} ({})",
            record.origin, record.destination, record.level
        ),
        x_axis: Axis {
            categories: MONTHS.iter().map(|month| month.to_string()).collect(),
            ..Default::default()
        },
        y_axis: Axis {
            title: "Monthly traffic (seats)".to_string(),
            ..Default::default()
        },
        series,
    })
}

/// Highest fare search variations between two months.
pub fn variations_chart(record: &VariationRecord, options: &ChartOptions) -> Option<Chart> {
    let rows = record.rows(options.data_name.as_deref()?);
    if rows.is_empty() {
        return None;
    }
    let points = transform::top_variations(&rows, TOP_VARIATIONS, &record.market_name);
    let comparison = format!(
        "{} compared to {}",
        record.first_period_label, record.second_period_label
    );
    Some(Chart {
        chart_type: ChartType::Column,
        title: format!(
            "{} ({})",
            options.title,
            transform::market_display_name(&record.market)
        ),
        subtitle: format!("Sources: Fare search ({comparison})"),
        x_axis: Axis {
            categories: points.iter().map(|point| point.category.clone()).collect(),
            ..Default::default()
        },
        y_axis: Axis {
            title: "Fare search variation (%)".to_string(),
            ..Default::default()
        },
        series: vec![Series {
            name: comparison,
            points: points
                .iter()
                .map(|point| Point {
                    y: point.y,
                    tooltip: format!(
                        "{}: \u{394} {}% ({} / {})",
                        point.category, point.y, point.value_period1, point.value_period2
                    ),
                    ..Default::default()
                })
                .collect(),
        }],
    })
}

fn histogram_series(name: &str, bins: &[transform::HistogramBin], unit: &str) -> Series {
    Series {
        name: name.to_string(),
        points: bins
            .iter()
            .map(|bin| {
                let share = bin
                    .share_percent
                    .map(|share| format!(" ({share}%)"))
                    .unwrap_or_default();
                Point {
                    y: bin.value,
                    color: bin.overflow.then_some(OVERFLOW_COLOR),
                    tooltip: format!(
                        "{} {unit}: {}{share}",
                        bin.label,
                        transform::compact_count(bin.value)
                    ),
                    ..Default::default()
                }
            })
            .collect(),
    }
}

/// Weeks between search and departure.
pub fn advance_purchase_chart(record: &HistogramRecord, options: &ChartOptions) -> Option<Chart> {
    if record.histogram.is_empty() {
        return None;
    }
    let bins = transform::histogram_bins(
        &record.histogram,
        HistogramKind::AdvancePurchase,
        record.total_requests,
    );
    let period = transform::advance_purchase_period_label(record);
    Some(Chart {
        chart_type: ChartType::Column,
        title: format!(
            "{}{} ({})",
            options.title,
            transform::ond_filter_label(&record.onds),
            record.market
        ),
        subtitle: format!("Sources: Fare search - {period}"),
        x_axis: Axis {
            title: "Weeks".to_string(),
            categories: bins.iter().map(|bin| bin.label.clone()).collect(),
            ..Default::default()
        },
        y_axis: Axis {
            title: "Average Number Of Daily Searches".to_string(),
            ..Default::default()
        },
        series: vec![histogram_series(&period, &bins, "weeks")],
    })
}

/// Days between departure and return, restricted to plausible weekend trips when the period is
/// weekend only.
pub fn trip_duration_chart(record: &HistogramRecord, options: &ChartOptions) -> Option<Chart> {
    if record.histogram.is_empty() {
        return None;
    }
    let mut bins = transform::histogram_bins(
        &record.histogram,
        HistogramKind::TripDuration,
        record.total_requests,
    );
    if record.weekend_only {
        bins = transform::weekend_trim(&bins, record.departure_days, record.return_days);
    }
    let market = if record.market.is_empty() {
        String::new()
    } else {
        format!(" ({})", record.market)
    };
    let period = transform::trip_duration_period_label(record);
    Some(Chart {
        chart_type: ChartType::Column,
        title: format!(
            "{}{}{market}",
            options.title,
            transform::ond_filter_label(&record.onds)
        ),
        subtitle: format!("Sources: Fare search - {period}"),
        x_axis: Axis {
            title: "Days".to_string(),
            categories: bins.iter().map(|bin| bin.label.clone()).collect(),
            ..Default::default()
        },
        y_axis: Axis {
            title: "Number Of Daily Searches".to_string(),
            ..Default::default()
        },
        series: vec![histogram_series(&period, &bins, "days")],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Level, TimeSeriesPoint};
    use crate::pattern::OdPattern;
    use std::collections::BTreeMap;

    fn options(title: &str) -> ChartOptions {
        ChartOptions {
            title: title.to_string(),
            ..Default::default()
        }
    }

    fn evolution() -> SearchEvolutionRecord {
        SearchEvolutionRecord {
            market: "FR".to_string(),
            onds: vec![OdPattern::new("PAR", "*")],
            time_evolution: (1..=20)
                .map(|day| TimeSeriesPoint::new(&format!("2013-01-{day:02}"), f64::from(day)))
                .collect(),
            ..Default::default()
        }
    }

    fn histogram(values: Vec<f64>) -> HistogramRecord {
        HistogramRecord {
            market: "FR".to_string(),
            onds: vec![OdPattern::new("PAR", "NYC")],
            histogram: values,
            total_requests: 100.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_time_evolution_chart() {
        let chart =
            time_evolution_chart(&evolution(), EvolutionBasis::Search, &options("Searches"))
                .unwrap();
        assert_eq!("Searches from PAR by search date (FR)", chart.title);
        assert_eq!("Search Day", chart.x_axis.title);
        assert_eq!(Some(1), chart.x_axis.label_step);
        assert_eq!(20, chart.series[0].points.len());
        // Smoothed by default.
        assert_eq!(5.0, chart.series[0].points[4].y);
        assert_eq!(
            "2013-01-07 (Monday): 7",
            chart.series[0].points[6].tooltip
        );
    }

    #[test]
    fn test_time_evolution_chart_unsmoothed() {
        let mut record = evolution();
        record.time_evolution[4].value = 100.0;
        let options = ChartOptions {
            smoothing: false,
            ..Default::default()
        };
        let chart = time_evolution_chart(&record, EvolutionBasis::Travel, &options).unwrap();
        assert_eq!(100.0, chart.series[0].points[4].y);
        assert!(chart.title.ends_with("by travel date (FR)"));
    }

    #[test]
    fn test_time_evolution_chart_empty() {
        let record = SearchEvolutionRecord::default();
        assert!(time_evolution_chart(&record, EvolutionBasis::Search, &options("x")).is_none());
    }

    #[test]
    fn test_chart_idempotent() {
        let record = evolution();
        let a = time_evolution_chart(&record, EvolutionBasis::Search, &options("Searches"));
        let b = time_evolution_chart(&record, EvolutionBasis::Search, &options("Searches"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_traffic_chart() {
        let record = TrafficRecord {
            origin: "PAR".to_string(),
            destination: "NYC".to_string(),
            level: Level::City,
            traffics: vec![1500.0; 13],
            ..Default::default()
        };
        let chart = traffic_chart(&record).unwrap();
        assert_eq!("Traffic year over year", chart.title);
        assert_eq!("Monthly traffic (seats)", chart.y_axis.title);
        assert_eq!(12, chart.x_axis.categories.len());
        assert_eq!(2, chart.series.len());
        assert_eq!("2008", chart.series[0].name);
        assert_eq!(Some(11), chart.series[0].points[0].x);
        assert_eq!("Dec 2008: 1.5K", chart.series[0].points[0].tooltip);
        assert_eq!(12, chart.series[1].points.len());
    }

    #[test]
    fn test_traffic_chart_error() {
        let record = TrafficRecord {
            traffics: vec![1.0],
            is_error: true,
            ..Default::default()
        };
        assert!(traffic_chart(&record).is_none());
        assert!(traffic_chart(&TrafficRecord::default()).is_none());
    }

    #[test]
    fn test_variations_chart() {
        let rows: Vec<serde_json::Value> = (0..12)
            .map(|i| serde_json::json!([format!("O{i:02}"), 10, 15, 50]))
            .collect();
        let record = VariationRecord {
            first_period_label: "2013-01".to_string(),
            second_period_label: "2013-02".to_string(),
            market: "TU".to_string(),
            market_name: "TUI France".to_string(),
            rankings: BTreeMap::from([("by_origin".to_string(), serde_json::Value::Array(rows))]),
        };
        let mut options = options("Origins with highest variations");
        assert!(variations_chart(&record, &options).is_none());
        options.data_name = Some("by_origin".to_string());
        let chart = variations_chart(&record, &options).unwrap();
        assert_eq!("Origins with highest variations (TUI France)", chart.title);
        assert_eq!(
            "Sources: Fare search (2013-01 compared to 2013-02)",
            chart.subtitle
        );
        assert_eq!(10, chart.series[0].points.len());
        assert_eq!("O00", chart.x_axis.categories[0]);
        assert_eq!("O09", chart.x_axis.categories[9]);
    }

    #[test]
    fn test_advance_purchase_chart() {
        let mut record = histogram(vec![10.0, 20.0, 70.0]);
        record.descriptor.period = Some("2013-01".to_string());
        record.descriptor.ptype = Some(crate::models::PeriodType::Month);
        let chart = advance_purchase_chart(&record, &options("Advance purchase")).unwrap();
        assert_eq!("Advance purchase from PAR to NYC (FR)", chart.title);
        assert_eq!("Sources: Fare search - 2013-01 (Month)", chart.subtitle);
        assert_eq!(vec!["0-1", "1-2", "2+"], chart.x_axis.categories);
        let points = &chart.series[0].points;
        assert_eq!(None, points[0].color);
        assert_eq!(Some(OVERFLOW_COLOR), points[2].color);
        assert_eq!("2+ weeks: 70 (70%)", points[2].tooltip);
    }

    #[test]
    fn test_trip_duration_chart_weekend_only() {
        let mut record = histogram((0..10).map(f64::from).collect());
        record.weekend_only = true;
        record.departure_days = [5, 6].into_iter().collect();
        record.return_days = [0, 1].into_iter().collect();
        let chart = trip_duration_chart(&record, &options("Trip duration")).unwrap();
        assert_eq!(vec!["1", "2", "3"], chart.x_axis.categories);
        assert_eq!(3, chart.series[0].points.len());
        assert_eq!("Trip duration from PAR to NYC (FR)", chart.title);
    }

    #[test]
    fn test_trip_duration_chart_no_market() {
        let mut record = histogram(vec![1.0, 2.0]);
        record.market = String::new();
        record.onds = vec![];
        let chart = trip_duration_chart(&record, &options("Trip duration")).unwrap();
        assert_eq!("Trip duration", chart.title);
        assert_eq!(vec!["0", "1+"], chart.x_axis.categories);
    }

    #[test]
    fn test_histogram_chart_empty() {
        let record = histogram(vec![]);
        assert!(advance_purchase_chart(&record, &options("x")).is_none());
        assert!(trip_duration_chart(&record, &options("x")).is_none());
    }

    #[test]
    fn test_chart_json() {
        let chart = traffic_chart(&TrafficRecord {
            traffics: vec![1.0],
            ..Default::default()
        })
        .unwrap();
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!("spline", json["chart_type"]);
        assert_eq!(11, json["series"][0]["points"][0]["x"]);
        assert!(json["series"][0]["points"][0].get("color").is_none());
    }
}
