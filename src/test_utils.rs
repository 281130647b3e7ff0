use crate::error::InsightsError;
use crate::models::*;
use crate::pattern::OdPattern;
use crate::repository::{EvolutionBasis, Repository};
use crate::transform;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

/// How a [FakeRepository] answers.
#[derive(Clone, Copy, Debug)]
enum Mode {
    /// Return canned records built from the query
    Echo,
    /// Return no data
    Empty,
    /// Never answer
    Hang,
    /// Fail with an upstream status
    Status(u16),
}

/// In-memory repository returning canned records.
#[derive(Debug)]
pub(crate) struct FakeRepository {
    mode: Mutex<Mode>,
    calls: AtomicUsize,
}

impl Default for FakeRepository {
    fn default() -> Self {
        Self::with_mode(Mode::Echo)
    }
}

impl FakeRepository {
    fn with_mode(mode: Mode) -> Self {
        FakeRepository {
            mode: Mutex::new(mode),
            calls: AtomicUsize::new(0),
        }
    }

    /// A repository without any data.
    pub(crate) fn empty() -> Self {
        Self::with_mode(Mode::Empty)
    }

    /// A repository that never answers.
    pub(crate) fn hanging() -> Self {
        Self::with_mode(Mode::Hang)
    }

    /// Make subsequent calls fail with an upstream status.
    pub(crate) fn fail_with_status(&self, status: u16) {
        *self.mode.lock().unwrap() = Mode::Status(status);
    }

    /// Number of calls made so far.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer<T>(&self, record: impl FnOnce() -> T) -> Result<Option<T>, InsightsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mode = *self.mode.lock().unwrap();
        match mode {
            Mode::Echo => Ok(Some(record())),
            Mode::Empty => Ok(None),
            Mode::Hang => std::future::pending().await,
            Mode::Status(status) => Err(InsightsError::UpstreamStatus { status }),
        }
    }
}

fn parse_onds(onds: &str) -> Vec<OdPattern> {
    onds.split(',').filter_map(|ond| ond.parse().ok()).collect()
}

/// Ten days of searches with values 1..=10.
pub(crate) fn get_test_time_evolution() -> Vec<TimeSeriesPoint> {
    (1..=10)
        .map(|day| TimeSeriesPoint::new(&format!("2013-01-{day:02}"), day as f64))
        .collect()
}

/// Twelve variation rows with decreasing deltas.
pub(crate) fn get_test_variation_rows() -> serde_json::Value {
    let rows: Vec<serde_json::Value> = (0..12)
        .map(|i| serde_json::json!([format!("O{i:02}"), 10.0, 10.0 + i as f64, 10.0 * i as f64]))
        .collect();
    serde_json::Value::Array(rows)
}

/// A histogram record with five buckets summing to 100 requests.
pub(crate) fn get_test_histogram(query: &HistogramQuery) -> HistogramRecord {
    HistogramRecord {
        market: query.market.clone(),
        onds: parse_onds(&query.onds),
        descriptor: PeriodDescriptor {
            period: query.period.clone(),
            ptype: query.period.as_ref().map(|_| PeriodType::Month),
            ..Default::default()
        },
        weekend_only: false,
        departure_days: DaysOfWeek::default(),
        return_days: DaysOfWeek::default(),
        histogram: vec![10.0, 20.0, 30.0, 25.0, 15.0],
        total_requests: 100.0,
    }
}

#[async_trait]
impl Repository for FakeRepository {
    async fn find_time_evolution(
        &self,
        _basis: EvolutionBasis,
        query: &SearchQuery,
    ) -> Result<Option<SearchEvolutionRecord>, InsightsError> {
        self.answer(|| SearchEvolutionRecord {
            market: query.market.clone(),
            onds: parse_onds(&query.onds),
            time_evolution: get_test_time_evolution(),
            day_distribution: serde_json::Value::Null,
        })
        .await
    }

    async fn find_traffic(
        &self,
        query: &TrafficQuery,
    ) -> Result<Option<TrafficRecord>, InsightsError> {
        self.answer(|| TrafficRecord {
            origin: query.origin.clone(),
            destination: query.destination.clone(),
            level: query.level,
            traffics: (0..transform::traffic_calendar().len())
                .map(|i| 1000.0 + i as f64)
                .collect(),
            airline_traffics: serde_json::Value::Null,
            is_error: false,
        })
        .await
    }

    async fn find_variations(
        &self,
        query: &VariationQuery,
    ) -> Result<Option<VariationRecord>, InsightsError> {
        self.answer(|| VariationRecord {
            first_period_label: query.fmonth.clone(),
            second_period_label: query.smonth.clone(),
            market: query.market.clone(),
            market_name: transform::market_display_name(&query.market).to_string(),
            rankings: BTreeMap::from([("by_origin".to_string(), get_test_variation_rows())]),
        })
        .await
    }

    async fn find_advance_purchase(
        &self,
        query: &HistogramQuery,
    ) -> Result<Option<HistogramRecord>, InsightsError> {
        self.answer(|| get_test_histogram(query)).await
    }

    async fn find_trip_duration(
        &self,
        query: &HistogramQuery,
    ) -> Result<Option<HistogramRecord>, InsightsError> {
        self.answer(|| get_test_histogram(query)).await
    }
}
