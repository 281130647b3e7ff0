//! Analyses offered by the dashboard.
//!
//! An [Analysis] ties a filter to a repository query: it decides when a filter is complete enough
//! to fetch, which filter fields reach the repository and how to fetch its record.

use crate::error::InsightsError;
use crate::filter::FilterState;
use crate::models::{
    HistogramQuery, HistogramRecord, QueryParams, SearchEvolutionRecord, SearchQuery,
    TrafficQuery, TrafficRecord, VariationQuery, VariationRecord,
};
use crate::pattern;
use crate::repository::{EvolutionBasis, Repository};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// A dataset of the dashboard.
#[async_trait]
pub trait Analysis: Send + Sync + 'static {
    /// Typed repository query
    type Query: QueryParams + Clone + std::fmt::Debug + Send + Sync + 'static;
    /// Record returned by the repository
    type Record: std::fmt::Debug + Send + Sync + 'static;

    /// Analysis name, used in fingerprints, logs and metrics
    const NAME: &'static str;

    /// Whether the filter is complete enough to fetch.
    fn is_valid(filter: &FilterState) -> bool;

    /// Project the filter onto the repository query.
    fn query(filter: &FilterState) -> Self::Query;

    /// Fetch the record for a query.
    async fn fetch(
        repository: &dyn Repository,
        query: &Self::Query,
    ) -> Result<Option<Self::Record>, InsightsError>;
}

/// Analysis identifiers as used in URLs
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AnalysisKind {
    SearchPeriod,
    TravelPeriod,
    Traffic,
    Variations,
    AdvancePurchase,
    TripDuration,
}

impl AnalysisKind {
    /// Every analysis, in dashboard order
    pub const ALL: [AnalysisKind; 6] = [
        Self::SearchPeriod,
        Self::TravelPeriod,
        Self::Traffic,
        Self::Variations,
        Self::AdvancePurchase,
        Self::TripDuration,
    ];
}

fn search_query(filter: &FilterState) -> SearchQuery {
    SearchQuery {
        market: filter.market.clone(),
        onds: filter.onds.clone(),
    }
}

fn histogram_query(filter: &FilterState) -> HistogramQuery {
    HistogramQuery {
        market: filter.market.clone(),
        onds: filter.onds.clone(),
        period: filter.period.clone(),
    }
}

/// Fare searches by date of search.
pub struct SearchPeriod;

#[async_trait]
impl Analysis for SearchPeriod {
    type Query = SearchQuery;
    type Record = SearchEvolutionRecord;

    const NAME: &'static str = "search-period";

    fn is_valid(filter: &FilterState) -> bool {
        pattern::validate(&filter.market, &filter.onds)
    }

    fn query(filter: &FilterState) -> SearchQuery {
        search_query(filter)
    }

    async fn fetch(
        repository: &dyn Repository,
        query: &SearchQuery,
    ) -> Result<Option<SearchEvolutionRecord>, InsightsError> {
        repository
            .find_time_evolution(EvolutionBasis::Search, query)
            .await
    }
}

/// Fare searches by date of travel.
pub struct TravelPeriod;

#[async_trait]
impl Analysis for TravelPeriod {
    type Query = SearchQuery;
    type Record = SearchEvolutionRecord;

    const NAME: &'static str = "travel-period";

    fn is_valid(filter: &FilterState) -> bool {
        pattern::validate(&filter.market, &filter.onds)
    }

    fn query(filter: &FilterState) -> SearchQuery {
        search_query(filter)
    }

    async fn fetch(
        repository: &dyn Repository,
        query: &SearchQuery,
    ) -> Result<Option<SearchEvolutionRecord>, InsightsError> {
        repository
            .find_time_evolution(EvolutionBasis::Travel, query)
            .await
    }
}

/// Monthly air traffic.
pub struct Traffic;

#[async_trait]
impl Analysis for Traffic {
    type Query = TrafficQuery;
    type Record = TrafficRecord;

    const NAME: &'static str = "traffic";

    fn is_valid(filter: &FilterState) -> bool {
        filter.origin.chars().count() > 2
            && filter.destination.chars().count() > 2
            && filter.auth_token.chars().count() > 5
    }

    fn query(filter: &FilterState) -> TrafficQuery {
        TrafficQuery {
            origin: filter.origin.to_uppercase(),
            destination: filter.destination.to_uppercase(),
            level: filter.level,
            month: filter.month.clone(),
            auth_token: filter.auth_token.clone(),
        }
    }

    async fn fetch(
        repository: &dyn Repository,
        query: &TrafficQuery,
    ) -> Result<Option<TrafficRecord>, InsightsError> {
        repository.find_traffic(query).await
    }
}

/// Fare search variations between two months.
pub struct Variations;

#[async_trait]
impl Analysis for Variations {
    type Query = VariationQuery;
    type Record = VariationRecord;

    const NAME: &'static str = "variations";

    fn is_valid(filter: &FilterState) -> bool {
        !filter.market.is_empty()
            && !filter.first_month.is_empty()
            && !filter.second_month.is_empty()
    }

    fn query(filter: &FilterState) -> VariationQuery {
        // `YYYY-MM` orders lexically.
        let (fmonth, smonth) = if filter.first_month <= filter.second_month {
            (&filter.first_month, &filter.second_month)
        } else {
            (&filter.second_month, &filter.first_month)
        };
        VariationQuery {
            market: filter.market.clone(),
            fmonth: fmonth.clone(),
            smonth: smonth.clone(),
        }
    }

    async fn fetch(
        repository: &dyn Repository,
        query: &VariationQuery,
    ) -> Result<Option<VariationRecord>, InsightsError> {
        repository.find_variations(query).await
    }
}

/// Weeks between search and departure.
pub struct AdvancePurchase;

#[async_trait]
impl Analysis for AdvancePurchase {
    type Query = HistogramQuery;
    type Record = HistogramRecord;

    const NAME: &'static str = "advance-purchase";

    fn is_valid(filter: &FilterState) -> bool {
        pattern::validate(&filter.market, &filter.onds)
    }

    fn query(filter: &FilterState) -> HistogramQuery {
        histogram_query(filter)
    }

    async fn fetch(
        repository: &dyn Repository,
        query: &HistogramQuery,
    ) -> Result<Option<HistogramRecord>, InsightsError> {
        repository.find_advance_purchase(query).await
    }
}

/// Days between departure and return.
pub struct TripDuration;

#[async_trait]
impl Analysis for TripDuration {
    type Query = HistogramQuery;
    type Record = HistogramRecord;

    const NAME: &'static str = "trip-duration";

    fn is_valid(filter: &FilterState) -> bool {
        pattern::validate(&filter.market, &filter.onds)
    }

    fn query(filter: &FilterState) -> HistogramQuery {
        histogram_query(filter)
    }

    async fn fetch(
        repository: &dyn Repository,
        query: &HistogramQuery,
    ) -> Result<Option<HistogramRecord>, InsightsError> {
        repository.find_trip_duration(query).await
    }
}
