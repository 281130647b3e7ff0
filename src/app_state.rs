use crate::cli::CommandLineArgs;
use crate::dashboard::Dashboard;
use crate::error::InsightsError;
use crate::repository::{HttpRepository, Repository};

use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashMap;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// A dashboard shared between the requests of one session.
pub type SharedDashboard = Arc<Mutex<Dashboard>>;

/// Shared application state passed to each request handler.
pub struct AppState {
    /// Command line arguments.
    pub args: CommandLineArgs,

    /// Travel data repository shared by all sessions.
    pub repository: Arc<dyn Repository>,

    /// Maximum duration of a repository fetch.
    pub fetch_timeout: Duration,

    // Dashboard sessions by ID.
    sessions: RwLock<HashMap<Uuid, SharedDashboard>>,
}

impl AppState {
    /// Create and return an [AppState] fetching from the configured HTTP repository.
    pub fn new(args: &CommandLineArgs) -> Self {
        let repository = Arc::new(HttpRepository::new(&args.repository_url));
        Self::with_repository(args, repository)
    }

    /// Create and return an [AppState] fetching from `repository`.
    pub fn with_repository(args: &CommandLineArgs, repository: Arc<dyn Repository>) -> Self {
        Self {
            args: args.clone(),
            repository,
            fetch_timeout: Duration::from_secs(args.fetch_timeout),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a new dashboard session and return its ID.
    pub async fn create_session(&self) -> Uuid {
        let id = Uuid::new_v4();
        let dashboard = Dashboard::new(self.repository.clone(), self.fetch_timeout);
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(dashboard)));
        tracing::debug!(%id, "created session");
        id
    }

    /// Return the dashboard of a session.
    pub async fn session(&self, id: Uuid) -> Result<SharedDashboard, InsightsError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(InsightsError::SessionNotFound { id })
    }

    /// End a session.
    pub async fn remove_session(&self, id: Uuid) -> Result<(), InsightsError> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                tracing::debug!(%id, "removed session");
                Ok(())
            }
            None => Err(InsightsError::SessionNotFound { id }),
        }
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeRepository;
    use clap::Parser;

    fn state() -> AppState {
        let args = CommandLineArgs::parse_from(["travel-insights"]);
        AppState::with_repository(&args, Arc::new(FakeRepository::default()))
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let state = state();
        let id = state.create_session().await;
        assert!(state.session(id).await.is_ok());
        state.remove_session(id).await.unwrap();
        assert!(matches!(
            state.session(id).await,
            Err(InsightsError::SessionNotFound { id: missing }) if missing == id
        ));
    }

    #[tokio::test]
    async fn test_remove_unknown_session() {
        let state = state();
        assert!(state.remove_session(Uuid::new_v4()).await.is_err());
    }

    #[test]
    fn test_fetch_timeout_from_args() {
        let args = CommandLineArgs::parse_from(["travel-insights", "--fetch-timeout", "5"]);
        let state = AppState::with_repository(&args, Arc::new(FakeRepository::default()));
        assert_eq!(Duration::from_secs(5), state.fetch_timeout);
    }
}
