//! Reactive query controller.
//!
//! A [QueryController] owns the filter of one [Analysis] and the most recent record fetched for
//! it. Filter changes go through [QueryController::update], which recomputes the filter
//! fingerprint and validity and hands out a [FetchTicket] only when new data is needed. The
//! ticket is turned into a `'static` future by [QueryController::fetch], so callers may drop any
//! lock around the controller while the fetch runs, and the outcome is handed back to
//! [QueryController::apply], which discards it unless it is still current.

use crate::analysis::Analysis;
use crate::error::InsightsError;
use crate::filter::{FilterFingerprint, FilterState};
use crate::metrics::{FETCHES_ISSUED, FETCH_OUTCOMES};
use crate::repository::Repository;

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use strum_macros::Display;
use tracing::{event, Level};

/// Lifecycle of a controller
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Status {
    /// No valid filter seen yet
    Idle,
    /// The filter does not pass the analysis gate
    Invalid,
    /// A fetch for the current filter is in flight
    Loading,
    /// Data for the current filter is available
    Loaded,
    /// The last fetch failed or timed out
    Failed,
}

/// What happened to a fetch outcome handed to [QueryController::apply]
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum Applied {
    /// The record replaced the snapshot
    Applied,
    /// The filter changed since the fetch was issued
    Stale,
    /// The fetch failed; the previous snapshot is kept
    Failed,
}

/// Permission to fetch data for one fingerprint.
#[derive(Debug)]
pub struct FetchTicket<Q> {
    fingerprint: FilterFingerprint,
    query: Q,
}

impl<Q> FetchTicket<Q> {
    /// Fingerprint the ticket was issued for
    pub fn fingerprint(&self) -> &FilterFingerprint {
        &self.fingerprint
    }
}

/// Result of running a [FetchTicket].
#[derive(Debug)]
pub struct FetchOutcome<R> {
    fingerprint: FilterFingerprint,
    result: Result<Option<R>, InsightsError>,
}

/// A record together with the fingerprint it was fetched for.
///
/// `record` is `None` when the repository had no data.
#[derive(Debug)]
pub struct Snapshot<R> {
    pub fingerprint: FilterFingerprint,
    pub record: Option<R>,
}

/// Controller for one analysis.
pub struct QueryController<A: Analysis> {
    repository: Arc<dyn Repository>,
    fetch_timeout: Duration,
    filter: FilterState,
    filter_valid: bool,
    fingerprint: FilterFingerprint,
    pending: Option<FilterFingerprint>,
    snapshot: Option<Arc<Snapshot<A::Record>>>,
    status: Status,
    last_error: Option<String>,
    analysis: PhantomData<fn() -> A>,
}

impl<A: Analysis> QueryController<A> {
    /// Return a new, idle QueryController.
    ///
    /// # Arguments
    ///
    /// * `repository`: Data store to fetch from
    /// * `fetch_timeout`: Maximum duration of a fetch
    pub fn new(repository: Arc<dyn Repository>, fetch_timeout: Duration) -> Self {
        let filter = FilterState::default();
        let fingerprint = FilterFingerprint::new(A::NAME, &A::query(&filter));
        QueryController {
            repository,
            fetch_timeout,
            filter,
            filter_valid: false,
            fingerprint,
            pending: None,
            snapshot: None,
            status: Status::Idle,
            last_error: None,
            analysis: PhantomData,
        }
    }

    /// Change the filter.
    ///
    /// Returns a ticket when the change requires a fetch: the filter just became valid or its
    /// fingerprint changed while valid, and the snapshot does not already match the new
    /// fingerprint. While valid and unchanged, the fetch in flight stays the only one.
    pub fn update<F>(&mut self, change: F) -> Option<FetchTicket<A::Query>>
    where
        F: FnOnce(&mut FilterState),
    {
        change(&mut self.filter);
        let was_valid = self.filter_valid;
        self.filter_valid = A::is_valid(&self.filter);
        let query = A::query(&self.filter);
        let fingerprint = FilterFingerprint::new(A::NAME, &query);
        let changed = fingerprint != self.fingerprint;
        self.fingerprint = fingerprint;

        if !self.filter_valid {
            self.pending = None;
            self.status = Status::Invalid;
            return None;
        }
        if was_valid && !changed {
            return None;
        }
        if self.is_loaded(&self.fingerprint) {
            self.pending = None;
            self.status = Status::Loaded;
            return None;
        }

        event!(Level::DEBUG, analysis = A::NAME, fingerprint = ?self.fingerprint, "fetch issued");
        FETCHES_ISSUED.with_label_values(&[A::NAME]).inc();
        self.pending = Some(self.fingerprint.clone());
        self.status = Status::Loading;
        Some(FetchTicket {
            fingerprint: self.fingerprint.clone(),
            query,
        })
    }

    /// Run a fetch under the configured timeout.
    ///
    /// The returned future does not borrow the controller.
    pub fn fetch(
        &self,
        ticket: FetchTicket<A::Query>,
    ) -> impl Future<Output = FetchOutcome<A::Record>> + Send + 'static {
        let repository = Arc::clone(&self.repository);
        let fetch_timeout = self.fetch_timeout;
        async move {
            let fetch = A::fetch(repository.as_ref(), &ticket.query);
            let result = match tokio::time::timeout(fetch_timeout, fetch).await {
                Ok(result) => result,
                Err(_) => Err(InsightsError::FetchTimeout {
                    analysis: A::NAME,
                    seconds: fetch_timeout.as_secs(),
                }),
            };
            FetchOutcome {
                fingerprint: ticket.fingerprint,
                result,
            }
        }
    }

    /// Apply the outcome of a fetch.
    ///
    /// The outcome is discarded unless its fingerprint is both the current one and the one in
    /// flight. On failure the previous snapshot is kept.
    pub fn apply(&mut self, outcome: FetchOutcome<A::Record>) -> Applied {
        let current = self.filter_valid
            && outcome.fingerprint == self.fingerprint
            && self.pending.as_ref() == Some(&outcome.fingerprint);
        let applied = if !current {
            event!(Level::DEBUG, analysis = A::NAME, fingerprint = ?outcome.fingerprint, "discarding stale fetch result");
            Applied::Stale
        } else {
            self.pending = None;
            match outcome.result {
                Ok(record) => {
                    self.snapshot = Some(Arc::new(Snapshot {
                        fingerprint: outcome.fingerprint,
                        record,
                    }));
                    self.status = Status::Loaded;
                    self.last_error = None;
                    Applied::Applied
                }
                Err(error) => {
                    event!(Level::WARN, analysis = A::NAME, "fetch failed: {}", error);
                    self.status = Status::Failed;
                    self.last_error = Some(error.to_string());
                    Applied::Failed
                }
            }
        };
        FETCH_OUTCOMES
            .with_label_values(&[A::NAME, &applied.to_string()])
            .inc();
        applied
    }

    /// Fetch and apply in one step.
    pub async fn refresh(&mut self, ticket: FetchTicket<A::Query>) -> Applied {
        let outcome = self.fetch(ticket).await;
        self.apply(outcome)
    }

    fn is_loaded(&self, fingerprint: &FilterFingerprint) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|snapshot| snapshot.fingerprint == *fingerprint)
    }

    /// Current filter
    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Whether the filter passes the analysis gate
    pub fn filter_valid(&self) -> bool {
        self.filter_valid
    }

    /// Whether data for a valid filter is still awaited
    pub fn is_loading(&self) -> bool {
        self.status == Status::Loading
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn fingerprint(&self) -> &FilterFingerprint {
        &self.fingerprint
    }

    /// Message of the last failed fetch, cleared by the next successful one
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Most recent snapshot. It may belong to an earlier filter if the last fetch failed.
    pub fn snapshot(&self) -> Option<Arc<Snapshot<A::Record>>> {
        self.snapshot.clone()
    }

    /// Record of the most recent snapshot, if the repository had data.
    pub fn record(&self) -> Option<&A::Record> {
        self.snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.record.as_ref())
    }
}

/// Await a fetch, if there is one.
pub async fn maybe_fetch<F: Future>(fetch: Option<F>) -> Option<F::Output> {
    match fetch {
        Some(fetch) => Some(fetch.await),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{SearchPeriod, Traffic};
    use crate::test_utils::FakeRepository;

    fn controller(repository: &Arc<FakeRepository>) -> QueryController<SearchPeriod> {
        QueryController::new(repository.clone(), Duration::from_secs(5))
    }

    fn set_onds(market: &str, onds: &str) -> impl FnOnce(&mut FilterState) {
        let market = market.to_string();
        let onds = onds.to_string();
        move |filter| {
            filter.market = market;
            filter.onds = onds;
        }
    }

    #[test]
    fn test_new_is_idle() {
        let repository = Arc::new(FakeRepository::default());
        let controller = controller(&repository);
        assert_eq!(Status::Idle, controller.status());
        assert!(!controller.is_loading());
        assert!(controller.snapshot().is_none());
    }

    #[test]
    fn test_invalid_filter_no_fetch() {
        let repository = Arc::new(FakeRepository::default());
        let mut controller = controller(&repository);
        assert!(controller.update(set_onds("FR", "PA-*")).is_none());
        assert_eq!(Status::Invalid, controller.status());
        assert!(!controller.filter_valid());
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn test_valid_filter_fetches() {
        let repository = Arc::new(FakeRepository::default());
        let mut controller = controller(&repository);
        let ticket = controller.update(set_onds("FR", "PAR-*")).unwrap();
        assert!(controller.is_loading());
        assert_eq!(controller.fingerprint(), ticket.fingerprint());
        assert_eq!(Applied::Applied, controller.refresh(ticket).await);
        assert!(!controller.is_loading());
        assert_eq!(Status::Loaded, controller.status());
        assert_eq!("FR", controller.record().unwrap().market);
        assert_eq!(1, repository.calls());
    }

    #[tokio::test]
    async fn test_cosmetic_change_no_fetch() {
        let repository = Arc::new(FakeRepository::default());
        let mut controller = controller(&repository);
        let ticket = controller.update(set_onds("FR", "PAR-*")).unwrap();
        controller.refresh(ticket).await;
        assert!(controller
            .update(|filter| filter.title = "Searches".to_string())
            .is_none());
        assert!(controller
            .update(|filter| filter.origin = "LON".to_string())
            .is_none());
        assert_eq!(Status::Loaded, controller.status());
        assert_eq!(1, repository.calls());
    }

    #[test]
    fn test_ticket_sequence() {
        let repository = Arc::new(FakeRepository::default());
        let mut controller = controller(&repository);
        assert!(controller.update(set_onds("FR", "PAR-*")).is_some());
        assert!(controller.update(set_onds("FR", "PA")).is_none());
        // Back to the valid filter: the earlier ticket was cancelled by the invalid filter.
        assert!(controller.update(set_onds("FR", "PAR-*")).is_some());
        assert!(controller.update(set_onds("FR", "LON-*")).is_some());
        assert!(controller.update(set_onds("FR", "LON-*")).is_none());
        assert!(controller.is_loading());
    }

    #[tokio::test]
    async fn test_stale_result_discarded() {
        let repository = Arc::new(FakeRepository::default());
        let mut controller = controller(&repository);
        let first = controller.update(set_onds("FR", "PAR-*")).unwrap();
        let second = controller.update(set_onds("DE", "PAR-*")).unwrap();
        let first_outcome = controller.fetch(first).await;
        let second_outcome = controller.fetch(second).await;
        assert_eq!(Applied::Stale, controller.apply(first_outcome));
        assert!(controller.is_loading());
        assert!(controller.snapshot().is_none());
        assert_eq!(Applied::Applied, controller.apply(second_outcome));
        assert_eq!("DE", controller.record().unwrap().market);
    }

    #[tokio::test]
    async fn test_result_after_invalid_discarded() {
        let repository = Arc::new(FakeRepository::default());
        let mut controller = controller(&repository);
        let ticket = controller.update(set_onds("FR", "PAR-*")).unwrap();
        controller.update(set_onds("", "PAR-*"));
        let outcome = controller.fetch(ticket).await;
        assert_eq!(Applied::Stale, controller.apply(outcome));
        assert_eq!(Status::Invalid, controller.status());
        assert!(controller.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_invalid_then_valid_same_fingerprint_no_refetch() {
        let repository = Arc::new(FakeRepository::default());
        let mut controller = controller(&repository);
        let ticket = controller.update(set_onds("FR", "PAR-*")).unwrap();
        controller.refresh(ticket).await;
        controller.update(set_onds("FR", "PAR"));
        assert_eq!(Status::Invalid, controller.status());
        assert!(controller.update(set_onds("FR", "PAR-*")).is_none());
        assert_eq!(Status::Loaded, controller.status());
        assert_eq!(1, repository.calls());
    }

    #[tokio::test]
    async fn test_timeout_clears_loading() {
        let repository = Arc::new(FakeRepository::hanging());
        let mut controller: QueryController<SearchPeriod> =
            QueryController::new(repository.clone(), Duration::from_millis(10));
        let ticket = controller.update(set_onds("FR", "PAR-*")).unwrap();
        assert_eq!(Applied::Failed, controller.refresh(ticket).await);
        assert!(!controller.is_loading());
        assert_eq!(Status::Failed, controller.status());
        assert_eq!(
            Some("timed out fetching search-period data after 0s"),
            controller.last_error()
        );
    }

    #[tokio::test]
    async fn test_failure_keeps_snapshot() {
        let repository = Arc::new(FakeRepository::default());
        let mut controller = controller(&repository);
        let ticket = controller.update(set_onds("FR", "PAR-*")).unwrap();
        controller.refresh(ticket).await;
        repository.fail_with_status(503);
        let ticket = controller.update(set_onds("FR", "LON-*")).unwrap();
        assert_eq!(Applied::Failed, controller.refresh(ticket).await);
        assert_eq!(Status::Failed, controller.status());
        let snapshot = controller.snapshot().unwrap();
        assert_eq!("FR", snapshot.record.as_ref().unwrap().market);
        assert_eq!(
            vec!["PAR-*".to_string()],
            snapshot
                .record
                .as_ref()
                .unwrap()
                .onds
                .iter()
                .map(|ond| ond.to_string())
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_absent_data_is_loaded() {
        let repository = Arc::new(FakeRepository::empty());
        let mut controller: QueryController<Traffic> =
            QueryController::new(repository.clone(), Duration::from_secs(5));
        let ticket = controller
            .update(|filter| {
                filter.origin = "par".to_string();
                filter.destination = "nyc".to_string();
                filter.auth_token = "token-123".to_string();
            })
            .unwrap();
        assert_eq!(Applied::Applied, controller.refresh(ticket).await);
        assert_eq!(Status::Loaded, controller.status());
        assert!(controller.snapshot().is_some());
        assert!(controller.record().is_none());
    }
}
