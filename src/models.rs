//! Data types and associated functions and methods
//!
//! Records are deserialised from repository responses. Queries are the typed parameter sets sent
//! to the repository; their [QueryParams] form is also what a
//! [FilterFingerprint](crate::filter::FilterFingerprint) is made of.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::pattern::OdPattern;

/// Level of detail of traffic data
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Level {
    /// Aggregated per city
    #[default]
    City,
    /// Per airport
    #[serde(alias = "airp")]
    Airport,
}

impl Level {
    /// Level as sent to the repository: the first four letters, lower case.
    pub fn wire_code(self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Airport => "airp",
        }
    }
}

/// One labelled value of a time series.
// NOTE: In serde, structs can be deserialised from sequences or maps. The repository sends
// `[label, value]` pairs.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    /// Date-like label, e.g. `2013-02-14`
    pub label: String,
    /// Value at that date
    pub value: f64,
}

impl TimeSeriesPoint {
    /// Return a new TimeSeriesPoint object.
    pub fn new(label: &str, value: f64) -> Self {
        TimeSeriesPoint {
            label: label.to_string(),
            value,
        }
    }
}

/// Number of fare searches over time for a market and set of O&Ds.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SearchEvolutionRecord {
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub onds: Vec<OdPattern>,
    #[serde(default)]
    pub time_evolution: Vec<TimeSeriesPoint>,
    #[serde(default)]
    pub day_distribution: serde_json::Value,
}

/// Monthly air traffic between an origin and a destination.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct TrafficRecord {
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub level: Level,
    /// Monthly values aligned to [traffic_calendar](crate::transform::traffic_calendar)
    #[serde(default)]
    pub traffics: Vec<f64>,
    #[serde(default)]
    pub airline_traffics: serde_json::Value,
    /// Set by the repository when no traffic could be computed
    #[serde(default)]
    pub is_error: bool,
}

/// One row of a variation ranking.
///
/// Deserialised from `[ond_code, value_period1, value_period2, delta_percent]`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct VariationRow {
    pub ond_code: String,
    pub value_period1: f64,
    pub value_period2: f64,
    pub delta_percent: f64,
}

impl VariationRow {
    /// Return a new VariationRow object.
    pub fn new(ond_code: &str, value_period1: f64, value_period2: f64, delta_percent: f64) -> Self {
        VariationRow {
            ond_code: ond_code.to_string(),
            value_period1,
            value_period2,
            delta_percent,
        }
    }
}

/// Fare search variations between two periods.
///
/// A record may carry several rankings (e.g. by origin and by destination); each is a named list
/// of rows selected with [VariationRecord::rows].
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct VariationRecord {
    #[serde(rename = "fmonth", default)]
    pub first_period_label: String,
    #[serde(rename = "smonth", default)]
    pub second_period_label: String,
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub market_name: String,
    #[serde(flatten)]
    pub rankings: BTreeMap<String, serde_json::Value>,
}

impl VariationRecord {
    /// Rows of the ranking called `data_name`.
    ///
    /// A missing or malformed ranking yields no rows.
    pub fn rows(&self, data_name: &str) -> Vec<VariationRow> {
        self.rankings
            .get(data_name)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }
}

/// Granularity of a histogram period
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PeriodType {
    #[serde(rename = "y")]
    Year,
    #[serde(rename = "q")]
    Quarter,
    #[serde(rename = "m")]
    Month,
    #[serde(rename = "w")]
    Week,
}

impl PeriodType {
    /// Name shown to users.
    pub fn full_name(self) -> &'static str {
        match self {
            Self::Year => "Year",
            Self::Quarter => "Quarter",
            Self::Month => "Month",
            Self::Week => "Week",
        }
    }
}

/// Period a histogram was computed over.
///
/// Either an explicit day range or a named period with its granularity.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PeriodDescriptor {
    #[serde(default)]
    pub first_day: Option<String>,
    #[serde(default)]
    pub last_day: Option<String>,
    #[serde(default)]
    pub ptype: Option<PeriodType>,
    #[serde(default)]
    pub period: Option<String>,
}

/// Set of days of the week, Sunday = 0 .. Saturday = 6.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(from = "DaysRepr", into = "Vec<u8>")]
pub struct DaysOfWeek(u8);

impl DaysOfWeek {
    /// Whether `day` (0-6) is in the set.
    pub fn contains(self, day: u8) -> bool {
        day < 7 && self.0 & (1 << day) != 0
    }

    fn insert(&mut self, day: u8) {
        if day < 7 {
            self.0 |= 1 << day;
        }
    }
}

impl FromIterator<u8> for DaysOfWeek {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut days = DaysOfWeek::default();
        for day in iter {
            days.insert(day);
        }
        days
    }
}

impl From<DaysOfWeek> for Vec<u8> {
    fn from(days: DaysOfWeek) -> Self {
        (0..7).filter(|day| days.contains(*day)).collect()
    }
}

/// Wire forms of a day set: a digit string (`"056"`) or a list of digits or digit strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum DaysRepr {
    Text(String),
    List(Vec<DayRepr>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DayRepr {
    Number(u8),
    Text(String),
}

fn digits(text: &str) -> impl Iterator<Item = u8> + '_ {
    text.chars()
        .filter_map(|c| c.to_digit(10))
        .filter_map(|d| u8::try_from(d).ok())
}

impl From<DaysRepr> for DaysOfWeek {
    fn from(repr: DaysRepr) -> Self {
        match repr {
            DaysRepr::Text(text) => digits(&text).collect(),
            DaysRepr::List(items) => items
                .iter()
                .flat_map(|item| match item {
                    DayRepr::Number(day) => vec![*day],
                    DayRepr::Text(text) => digits(text).collect(),
                })
                .collect(),
        }
    }
}

/// Advance purchase or trip duration histogram.
///
/// The last bucket of `histogram` is open-ended.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct HistogramRecord {
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub onds: Vec<OdPattern>,
    #[serde(flatten)]
    pub descriptor: PeriodDescriptor,
    #[serde(default)]
    pub weekend_only: bool,
    /// Days of the week on which departures were observed
    #[serde(rename = "dep_day", default)]
    pub departure_days: DaysOfWeek,
    /// Days of the week on which returns were observed
    #[serde(rename = "ret_day", default)]
    pub return_days: DaysOfWeek,
    #[serde(alias = "advance_purchase", alias = "trip_duration", default)]
    pub histogram: Vec<f64>,
    /// Total number of requests
    #[serde(rename = "nb_req", default)]
    pub total_requests: f64,
}

/// Advance purchase histogram, in weeks.
pub type AdvancePurchaseRecord = HistogramRecord;

/// Trip duration histogram, in days.
pub type TripDurationRecord = HistogramRecord;

/// Conversion of a query into repository request parameters.
pub trait QueryParams {
    /// Ordered `(name, value)` pairs.
    fn params(&self) -> Vec<(&'static str, String)>;
}

/// Query for fare search records.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchQuery {
    pub market: String,
    /// Comma separated O&D patterns
    pub onds: String,
}

impl QueryParams for SearchQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        vec![("market", self.market.clone()), ("onds", self.onds.clone())]
    }
}

/// Query for traffic records.
#[derive(Clone, PartialEq)]
pub struct TrafficQuery {
    pub origin: String,
    pub destination: String,
    pub level: Level,
    pub month: String,
    pub auth_token: String,
}

impl fmt::Debug for TrafficQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrafficQuery")
            .field("origin", &self.origin)
            .field("destination", &self.destination)
            .field("level", &self.level)
            .field("month", &self.month)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

impl QueryParams for TrafficQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("origin", self.origin.clone()),
            ("destination", self.destination.clone()),
            ("level", self.level.wire_code().to_string()),
            ("month", self.month.clone()),
            ("auth_token", self.auth_token.clone()),
        ]
    }
}

/// Query for a variation ranking between two months.
#[derive(Clone, Debug, PartialEq)]
pub struct VariationQuery {
    pub market: String,
    /// Earlier month
    pub fmonth: String,
    /// Later month
    pub smonth: String,
}

impl QueryParams for VariationQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("market", self.market.clone()),
            ("fmonth", self.fmonth.clone()),
            ("smonth", self.smonth.clone()),
        ]
    }
}

/// Query for advance purchase and trip duration histograms.
#[derive(Clone, Debug, PartialEq)]
pub struct HistogramQuery {
    pub market: String,
    pub onds: String,
    /// Period to compute over; the repository picks a default when absent
    pub period: Option<String>,
}

impl QueryParams for HistogramQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("market", self.market.clone()), ("onds", self.onds.clone())];
        if let Some(period) = &self.period {
            params.push(("period", period.clone()));
        }
        params
    }
}
