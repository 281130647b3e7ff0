//! Access to the upstream analytics data store.

use crate::error::InsightsError;
use crate::models::{
    HistogramQuery, HistogramRecord, QueryParams, SearchEvolutionRecord, SearchQuery,
    TrafficQuery, TrafficRecord, VariationQuery, VariationRecord,
};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use strum_macros::Display;
use url::Url;

/// Date a search time evolution is keyed on
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum EvolutionBasis {
    /// Date the search was made
    Search,
    /// Date of the searched travel
    Travel,
}

impl EvolutionBasis {
    /// Repository resource holding evolutions for this basis.
    pub fn resource(self) -> &'static str {
        match self {
            Self::Search => "ss_time_evolutions",
            Self::Travel => "st_time_evolutions",
        }
    }
}

/// Upstream data store.
///
/// Each method returns `Ok(None)` when the store has no data for the query.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Find the fare search time evolution for a market and O&D patterns.
    async fn find_time_evolution(
        &self,
        basis: EvolutionBasis,
        query: &SearchQuery,
    ) -> Result<Option<SearchEvolutionRecord>, InsightsError>;

    /// Find the monthly traffic between an origin and a destination.
    async fn find_traffic(
        &self,
        query: &TrafficQuery,
    ) -> Result<Option<TrafficRecord>, InsightsError>;

    /// Find the fare search variations between two months.
    async fn find_variations(
        &self,
        query: &VariationQuery,
    ) -> Result<Option<VariationRecord>, InsightsError>;

    /// Find the advance purchase histogram.
    async fn find_advance_purchase(
        &self,
        query: &HistogramQuery,
    ) -> Result<Option<HistogramRecord>, InsightsError>;

    /// Find the trip duration histogram.
    async fn find_trip_duration(
        &self,
        query: &HistogramQuery,
    ) -> Result<Option<HistogramRecord>, InsightsError>;
}

/// REST repository.
///
/// Issues `GET <base>/<resource>?<params>` and reads the first element of the `<resource>` array
/// of the JSON response body.
#[derive(Debug)]
pub struct HttpRepository {
    base_url: Url,
    reqwest_client: reqwest::Client,
}

impl HttpRepository {
    /// Create a new REST repository.
    ///
    /// # Arguments
    ///
    /// * `base_url`: Base URL of the data store API. A trailing `/` is added when missing.
    pub fn new(base_url: &Url) -> Self {
        let mut base_url = base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            reqwest_client: reqwest::Client::new(),
        }
    }

    /// URL of a repository resource.
    fn resource_url(&self, resource: &str) -> Result<Url, InsightsError> {
        self.base_url
            .join(resource)
            .map_err(|error| InsightsError::ServerConfig {
                reason: format!("invalid repository URL for {resource}: {error}"),
            })
    }

    /// Fetch a resource and decode its first record.
    ///
    /// # Arguments
    ///
    /// * `resource`: Name of the resource, also the key of the record array in the response
    /// * `query`: Query parameters
    #[tracing::instrument(level = "DEBUG", skip(self, query))]
    async fn find_first<T, Q>(&self, resource: &str, query: &Q) -> Result<Option<T>, InsightsError>
    where
        T: DeserializeOwned,
        Q: QueryParams,
    {
        let url = self.resource_url(resource)?;
        let response = self
            .reqwest_client
            .get(url)
            .query(&query.params())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(InsightsError::UpstreamStatus {
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        first_record(resource, &body)
    }
}

/// Decode the first element of the `resource` array of a response body.
fn first_record<T: DeserializeOwned>(
    resource: &str,
    body: &[u8],
) -> Result<Option<T>, InsightsError> {
    let mut document: serde_json::Value = serde_json::from_slice(body)?;
    match document
        .get_mut(resource)
        .and_then(|records| records.as_array_mut())
        .filter(|records| !records.is_empty())
    {
        Some(records) => Ok(Some(serde_json::from_value(records.swap_remove(0))?)),
        None => Ok(None),
    }
}

#[async_trait]
impl Repository for HttpRepository {
    async fn find_time_evolution(
        &self,
        basis: EvolutionBasis,
        query: &SearchQuery,
    ) -> Result<Option<SearchEvolutionRecord>, InsightsError> {
        self.find_first(basis.resource(), query).await
    }

    async fn find_traffic(
        &self,
        query: &TrafficQuery,
    ) -> Result<Option<TrafficRecord>, InsightsError> {
        self.find_first("traffics", query).await
    }

    async fn find_variations(
        &self,
        query: &VariationQuery,
    ) -> Result<Option<VariationRecord>, InsightsError> {
        self.find_first("search_variations", query).await
    }

    async fn find_advance_purchase(
        &self,
        query: &HistogramQuery,
    ) -> Result<Option<HistogramRecord>, InsightsError> {
        self.find_first("advance_purchases", query).await
    }

    async fn find_trip_duration(
        &self,
        query: &HistogramQuery,
    ) -> Result<Option<HistogramRecord>, InsightsError> {
        self.find_first("trip_durations", query).await
    }
}
