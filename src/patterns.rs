//! Search patterns: fare searches by search date and by travel date, side by side.

use crate::analysis::{SearchPeriod, TravelPeriod};
use crate::controller::{maybe_fetch, Applied, FetchOutcome, FetchTicket, QueryController};
use crate::filter::FilterState;
use crate::models::{SearchEvolutionRecord, SearchQuery};
use crate::pattern::WILDCARD;
use crate::repository::Repository;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A saved, named list of O&D patterns.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
pub struct Favorite {
    #[validate(length(min = 1, message = "favorite name must not be empty"))]
    pub name: String,
    pub onds: Vec<String>,
}

fn wildcard() -> String {
    WILDCARD.to_string()
}

/// How the O&D patterns of the search analyses are chosen.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OndSelection {
    /// A single origin and destination
    Specify {
        #[serde(default = "wildcard")]
        origin: String,
        #[serde(default = "wildcard")]
        destination: String,
    },
    /// The patterns of a saved favorite
    Favorite(String),
}

impl Default for OndSelection {
    fn default() -> Self {
        OndSelection::Specify {
            origin: wildcard(),
            destination: wildcard(),
        }
    }
}

/// Tickets issued by a [PatternsController] update.
#[derive(Debug, Default)]
pub struct PatternsTickets {
    pub search: Option<FetchTicket<SearchQuery>>,
    pub travel: Option<FetchTicket<SearchQuery>>,
}

impl PatternsTickets {
    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.travel.is_none()
    }
}

/// Outcomes of running [PatternsTickets].
#[derive(Debug, Default)]
pub struct PatternsOutcomes {
    search: Option<FetchOutcome<SearchEvolutionRecord>>,
    travel: Option<FetchOutcome<SearchEvolutionRecord>>,
}

/// Composite controller over the search period and travel period evolutions.
///
/// Market and O&D patterns always reach both sub-controllers together.
pub struct PatternsController {
    search: QueryController<SearchPeriod>,
    travel: QueryController<TravelPeriod>,
    market: String,
    markets: Vec<String>,
    selection: OndSelection,
    favorites: Vec<Favorite>,
}

impl PatternsController {
    /// Return a new PatternsController.
    pub fn new(repository: Arc<dyn Repository>, fetch_timeout: Duration) -> Self {
        PatternsController {
            search: QueryController::new(repository.clone(), fetch_timeout),
            travel: QueryController::new(repository, fetch_timeout),
            market: String::new(),
            markets: vec![],
            selection: OndSelection::default(),
            favorites: vec![],
        }
    }

    /// Set the markets available to the analyst. The first one is selected if no market is.
    pub fn set_markets(&mut self, markets: Vec<String>) {
        if self.market.is_empty() {
            if let Some(first) = markets.first() {
                self.market.clone_from(first);
            }
        }
        self.markets = markets;
    }

    /// Replace the saved favorites. A selected favorite that no longer exists is deselected.
    pub fn set_favorites(&mut self, favorites: Vec<Favorite>) {
        self.favorites = favorites;
        if let OndSelection::Favorite(name) = &self.selection {
            if !self.favorites.iter().any(|favorite| favorite.name == *name) {
                self.selection = OndSelection::default();
            }
        }
    }

    pub fn set_market(&mut self, market: &str) {
        self.market = market.to_string();
    }

    pub fn select(&mut self, selection: OndSelection) {
        self.selection = selection;
    }

    /// O&D patterns of the current selection, comma separated.
    ///
    /// An unknown favorite gives no patterns.
    pub fn onds(&self) -> String {
        match &self.selection {
            OndSelection::Specify {
                origin,
                destination,
            } => format!("{origin}-{destination}"),
            OndSelection::Favorite(name) => self
                .favorites
                .iter()
                .find(|favorite| favorite.name == *name)
                .map(|favorite| favorite.onds.join(",").to_uppercase())
                .unwrap_or_default(),
        }
    }

    pub fn market(&self) -> &str {
        &self.market
    }

    pub fn markets(&self) -> &[String] {
        &self.markets
    }

    pub fn selection(&self) -> &OndSelection {
        &self.selection
    }

    /// Apply a filter change to both sub-controllers.
    ///
    /// The market and O&D patterns are then set from this controller's own market and
    /// selection.
    pub fn update<F>(&mut self, change: F) -> PatternsTickets
    where
        F: Fn(&mut FilterState),
    {
        let market = self.market.clone();
        let onds = self.onds();
        let forward = |filter: &mut FilterState| {
            change(filter);
            filter.market.clone_from(&market);
            filter.onds.clone_from(&onds);
        };
        PatternsTickets {
            search: self.search.update(forward),
            travel: self.travel.update(forward),
        }
    }

    /// Run both fetches concurrently.
    pub fn fetch(
        &self,
        tickets: PatternsTickets,
    ) -> impl Future<Output = PatternsOutcomes> + Send + 'static {
        let search = tickets.search.map(|ticket| self.search.fetch(ticket));
        let travel = tickets.travel.map(|ticket| self.travel.fetch(ticket));
        async move {
            let (search, travel) = tokio::join!(maybe_fetch(search), maybe_fetch(travel));
            PatternsOutcomes { search, travel }
        }
    }

    /// Apply fetch outcomes to the sub-controllers.
    pub fn apply(&mut self, outcomes: PatternsOutcomes) -> Vec<Applied> {
        let mut applied = vec![];
        if let Some(outcome) = outcomes.search {
            applied.push(self.search.apply(outcome));
        }
        if let Some(outcome) = outcomes.travel {
            applied.push(self.travel.apply(outcome));
        }
        applied
    }

    /// Whether either evolution is still loading
    pub fn is_loading(&self) -> bool {
        self.search.is_loading() || self.travel.is_loading()
    }

    pub fn search(&self) -> &QueryController<SearchPeriod> {
        &self.search
    }

    pub fn travel(&self) -> &QueryController<TravelPeriod> {
        &self.travel
    }
}
