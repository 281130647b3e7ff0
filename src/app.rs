use crate::analysis::AnalysisKind;
use crate::app_state::{AppState, SharedAppState};
use crate::charts::ChartOptions;
use crate::cli::CommandLineArgs;
use crate::dashboard::DashboardStatus;
use crate::error::InsightsError;
use crate::filter::FilterUpdate;
use crate::metrics;
use crate::validated_json::ValidatedJson;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower::Layer;
use tower::ServiceBuilder;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// The [Router] wrapped in path normalisation
pub type Service = NormalizePath<Router>;

/// Body of a session creation response
#[derive(Debug, Deserialize, Serialize)]
pub struct SessionCreated {
    pub id: Uuid,
}

/// Returns a [Service] fetching from the repository configured in `args`.
pub fn service(args: &CommandLineArgs) -> Service {
    service_with_state(Arc::new(AppState::new(args)))
}

/// Returns a [Service] over existing application state.
pub fn service_with_state(state: SharedAppState) -> Service {
    // Trailing slashes are trimmed before routing.
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

pub fn router(state: SharedAppState) -> Router {
    fn v1() -> Router<SharedAppState> {
        Router::new()
            .route("/sessions", post(create_session))
            .route("/sessions/:id", delete(delete_session))
            .route("/sessions/:id/filter", patch(update_filter))
            .route("/sessions/:id/status", get(status))
            .route("/sessions/:id/charts/:analysis", get(chart))
            .route("/sessions/:id/export/:analysis", get(export))
            .layer(
                ServiceBuilder::new().layer(
                    TraceLayer::new_for_http()
                        .on_request(metrics::request_counter)
                        .on_response(metrics::record_response_metrics),
                ),
            )
    }

    Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/v1", v1())
        .with_state(state)
}

async fn create_session(State(state): State<SharedAppState>) -> impl IntoResponse {
    let id = state.create_session().await;
    (StatusCode::CREATED, Json(SessionCreated { id }))
}

async fn delete_session(
    State(state): State<SharedAppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, InsightsError> {
    state.remove_session(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Apply a filter update, run the fetches it makes due and return the resulting status.
///
/// The session is not locked while fetches run. Results that a concurrent update has made stale
/// are discarded when applied.
#[tracing::instrument(level = "DEBUG", skip(state, update))]
async fn update_filter(
    State(state): State<SharedAppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(update): ValidatedJson<FilterUpdate>,
) -> Result<Json<DashboardStatus>, InsightsError> {
    let dashboard = state.session(id).await?;
    let fetch = {
        let mut dashboard = dashboard.lock().await;
        let tickets = dashboard.update(&update);
        tracing::debug!(fetches = tickets.len(), "filter updated");
        dashboard.fetch(tickets)
    };
    let outcomes = fetch.await;
    let mut dashboard = dashboard.lock().await;
    dashboard.apply(outcomes);
    Ok(Json(dashboard.status()))
}

async fn status(
    State(state): State<SharedAppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DashboardStatus>, InsightsError> {
    let dashboard = state.session(id).await?;
    let status = dashboard.lock().await.status();
    Ok(Json(status))
}

async fn chart(
    State(state): State<SharedAppState>,
    Path((id, analysis)): Path<(Uuid, AnalysisKind)>,
    Query(options): Query<ChartOptions>,
) -> Result<Response, InsightsError> {
    let dashboard = state.session(id).await?;
    let chart = dashboard.lock().await.chart(analysis, &options);
    Ok(match chart {
        Some(chart) => Json(chart).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

async fn export(
    State(state): State<SharedAppState>,
    Path((id, analysis)): Path<(Uuid, AnalysisKind)>,
    Query(options): Query<ChartOptions>,
) -> Result<Response, InsightsError> {
    let dashboard = state.session(id).await?;
    let table = dashboard.lock().await.export(analysis, &options)?;
    Ok(match table {
        Some(table) => (
            [(&header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.to_string())],
            table,
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}
