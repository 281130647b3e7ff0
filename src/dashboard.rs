//! A dashboard session: every analysis controller behind one filter.

use crate::analysis::{
    AdvancePurchase, Analysis, AnalysisKind, Traffic, TripDuration, Variations,
};
use crate::charts::{self, Chart, ChartOptions};
use crate::controller::{maybe_fetch, FetchOutcome, FetchTicket, QueryController, Status};
use crate::error::InsightsError;
use crate::export;
use crate::filter::{FilterState, FilterUpdate};
use crate::models::{
    HistogramQuery, HistogramRecord, TrafficQuery, TrafficRecord, VariationQuery, VariationRecord,
};
use crate::pattern;
use crate::patterns::{PatternsController, PatternsOutcomes, PatternsTickets};
use crate::repository::{EvolutionBasis, Repository};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

/// Tickets issued by a [Dashboard] update.
#[derive(Debug, Default)]
pub struct DashboardTickets {
    patterns: PatternsTickets,
    traffic: Option<FetchTicket<TrafficQuery>>,
    variations: Option<FetchTicket<VariationQuery>>,
    advance_purchase: Option<FetchTicket<HistogramQuery>>,
    trip_duration: Option<FetchTicket<HistogramQuery>>,
}

impl DashboardTickets {
    /// Number of fetches to run
    pub fn len(&self) -> usize {
        [
            self.patterns.search.is_some(),
            self.patterns.travel.is_some(),
            self.traffic.is_some(),
            self.variations.is_some(),
            self.advance_purchase.is_some(),
            self.trip_duration.is_some(),
        ]
        .into_iter()
        .filter(|issued| *issued)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcomes of running [DashboardTickets].
#[derive(Debug)]
pub struct DashboardOutcomes {
    patterns: PatternsOutcomes,
    traffic: Option<FetchOutcome<TrafficRecord>>,
    variations: Option<FetchOutcome<VariationRecord>>,
    advance_purchase: Option<FetchOutcome<HistogramRecord>>,
    trip_duration: Option<FetchOutcome<HistogramRecord>>,
}

/// State of one analysis
#[derive(Debug, Serialize)]
pub struct AnalysisStatus {
    pub analysis: AnalysisKind,
    pub filter_valid: bool,
    pub is_loading: bool,
    pub status: Status,
    /// Digest of the current filter fingerprint
    pub fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisStatus {
    fn new<A: Analysis>(analysis: AnalysisKind, controller: &QueryController<A>) -> Self {
        AnalysisStatus {
            analysis,
            filter_valid: controller.filter_valid(),
            is_loading: controller.is_loading(),
            status: controller.status(),
            fingerprint: controller.fingerprint().digest(),
            error: controller.last_error().map(str::to_string),
        }
    }
}

/// State of a whole dashboard
#[derive(Debug, Serialize)]
pub struct DashboardStatus {
    /// Whether any analysis is loading
    pub is_loading: bool,
    pub market: String,
    pub markets: Vec<String>,
    /// Resolved O&D patterns
    pub onds: String,
    pub analyses: Vec<AnalysisStatus>,
    /// Why the market and O&D patterns are not valid, if they are not
    pub validation_errors: Vec<String>,
}

/// All controllers of one analyst's dashboard.
pub struct Dashboard {
    patterns: PatternsController,
    traffic: QueryController<Traffic>,
    variations: QueryController<Variations>,
    advance_purchase: QueryController<AdvancePurchase>,
    trip_duration: QueryController<TripDuration>,
    validation_errors: Vec<String>,
}

impl Dashboard {
    /// Return a new Dashboard.
    ///
    /// # Arguments
    ///
    /// * `repository`: Data store shared by all analyses
    /// * `fetch_timeout`: Maximum duration of a fetch
    pub fn new(repository: Arc<dyn Repository>, fetch_timeout: Duration) -> Self {
        Dashboard {
            patterns: PatternsController::new(repository.clone(), fetch_timeout),
            traffic: QueryController::new(repository.clone(), fetch_timeout),
            variations: QueryController::new(repository.clone(), fetch_timeout),
            advance_purchase: QueryController::new(repository.clone(), fetch_timeout),
            trip_duration: QueryController::new(repository, fetch_timeout),
            validation_errors: vec![],
        }
    }

    /// Apply a filter update to every analysis.
    ///
    /// Only analyses whose fingerprint changed get a ticket.
    pub fn update(&mut self, update: &FilterUpdate) -> DashboardTickets {
        if let Some(markets) = &update.markets {
            self.patterns.set_markets(markets.clone());
        }
        if let Some(favorites) = &update.favorites {
            self.patterns.set_favorites(favorites.clone());
        }
        if let Some(selection) = &update.ond_selection {
            self.patterns.select(selection.clone());
        }
        if let Some(market) = &update.market {
            self.patterns.set_market(market);
        }
        let market = self.patterns.market().to_string();
        let onds = self.patterns.onds();
        self.validation_errors = pattern::explain(&market, &onds);

        let change = |filter: &mut FilterState| {
            update.apply(filter);
            filter.market.clone_from(&market);
            filter.onds.clone_from(&onds);
        };
        DashboardTickets {
            patterns: self.patterns.update(change),
            traffic: self.traffic.update(change),
            variations: self.variations.update(change),
            advance_purchase: self.advance_purchase.update(change),
            trip_duration: self.trip_duration.update(change),
        }
    }

    /// Run all fetches concurrently.
    ///
    /// The returned future does not borrow the dashboard.
    pub fn fetch(
        &self,
        tickets: DashboardTickets,
    ) -> impl Future<Output = DashboardOutcomes> + Send + 'static {
        let patterns = self.patterns.fetch(tickets.patterns);
        let traffic = tickets.traffic.map(|ticket| self.traffic.fetch(ticket));
        let variations = tickets
            .variations
            .map(|ticket| self.variations.fetch(ticket));
        let advance_purchase = tickets
            .advance_purchase
            .map(|ticket| self.advance_purchase.fetch(ticket));
        let trip_duration = tickets
            .trip_duration
            .map(|ticket| self.trip_duration.fetch(ticket));
        async move {
            let (patterns, traffic, variations, advance_purchase, trip_duration) = tokio::join!(
                patterns,
                maybe_fetch(traffic),
                maybe_fetch(variations),
                maybe_fetch(advance_purchase),
                maybe_fetch(trip_duration)
            );
            DashboardOutcomes {
                patterns,
                traffic,
                variations,
                advance_purchase,
                trip_duration,
            }
        }
    }

    /// Apply fetch outcomes. Outcomes that are no longer current are discarded.
    pub fn apply(&mut self, outcomes: DashboardOutcomes) {
        self.patterns.apply(outcomes.patterns);
        if let Some(outcome) = outcomes.traffic {
            self.traffic.apply(outcome);
        }
        if let Some(outcome) = outcomes.variations {
            self.variations.apply(outcome);
        }
        if let Some(outcome) = outcomes.advance_purchase {
            self.advance_purchase.apply(outcome);
        }
        if let Some(outcome) = outcomes.trip_duration {
            self.trip_duration.apply(outcome);
        }
    }

    /// Whether any analysis is loading
    pub fn is_loading(&self) -> bool {
        self.patterns.is_loading()
            || self.traffic.is_loading()
            || self.variations.is_loading()
            || self.advance_purchase.is_loading()
            || self.trip_duration.is_loading()
    }

    pub fn status(&self) -> DashboardStatus {
        DashboardStatus {
            is_loading: self.is_loading(),
            market: self.patterns.market().to_string(),
            markets: self.patterns.markets().to_vec(),
            onds: self.patterns.onds(),
            analyses: vec![
                AnalysisStatus::new(AnalysisKind::SearchPeriod, self.patterns.search()),
                AnalysisStatus::new(AnalysisKind::TravelPeriod, self.patterns.travel()),
                AnalysisStatus::new(AnalysisKind::Traffic, &self.traffic),
                AnalysisStatus::new(AnalysisKind::Variations, &self.variations),
                AnalysisStatus::new(AnalysisKind::AdvancePurchase, &self.advance_purchase),
                AnalysisStatus::new(AnalysisKind::TripDuration, &self.trip_duration),
            ],
            validation_errors: self.validation_errors.clone(),
        }
    }

    /// Chart of an analysis, or `None` when there is nothing to draw.
    pub fn chart(&self, kind: AnalysisKind, options: &ChartOptions) -> Option<Chart> {
        match kind {
            AnalysisKind::SearchPeriod => self.patterns.search().record().and_then(|record| {
                charts::time_evolution_chart(record, EvolutionBasis::Search, options)
            }),
            AnalysisKind::TravelPeriod => self.patterns.travel().record().and_then(|record| {
                charts::time_evolution_chart(record, EvolutionBasis::Travel, options)
            }),
            AnalysisKind::Traffic => self.traffic.record().and_then(charts::traffic_chart),
            AnalysisKind::Variations => self
                .variations
                .record()
                .and_then(|record| charts::variations_chart(record, options)),
            AnalysisKind::AdvancePurchase => self
                .advance_purchase
                .record()
                .and_then(|record| charts::advance_purchase_chart(record, options)),
            AnalysisKind::TripDuration => self
                .trip_duration
                .record()
                .and_then(|record| charts::trip_duration_chart(record, options)),
        }
    }

    /// Exported table of an analysis, or `None` when there is no data.
    pub fn export(
        &self,
        kind: AnalysisKind,
        options: &ChartOptions,
    ) -> Result<Option<String>, InsightsError> {
        let table = match kind {
            AnalysisKind::SearchPeriod => self
                .patterns
                .search()
                .record()
                .map(export::time_evolution_table),
            AnalysisKind::TravelPeriod => self
                .patterns
                .travel()
                .record()
                .map(export::time_evolution_table),
            AnalysisKind::Traffic => self.traffic.record().and_then(export::traffic_table),
            AnalysisKind::Variations => {
                match (self.variations.record(), options.data_name.as_deref()) {
                    (Some(record), Some(data_name)) => Some(export::variations_table(
                        record,
                        &options.title,
                        data_name,
                    )),
                    _ => None,
                }
            }
            AnalysisKind::AdvancePurchase => self
                .advance_purchase
                .record()
                .map(export::advance_purchase_table),
            AnalysisKind::TripDuration => self
                .trip_duration
                .record()
                .map(export::trip_duration_table),
        };
        table.map(|table| table.render()).transpose()
    }
}
