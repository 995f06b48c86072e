// GET handlers. Window errors are the caller's (400); missing data is 404; store failures 500.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::AppState;
use crate::models::{GroupReport, NodeReport, PodReport};
use crate::service::{QueryError, Reading};

#[derive(Debug, Default, Deserialize)]
pub(super) struct WindowQuery {
    window: Option<String>,
}

impl WindowQuery {
    fn window(&self) -> Option<&str> {
        self.window.as_deref()
    }
}

pub(super) enum ApiError {
    Query(QueryError),
    NotFound(String),
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        ApiError::Query(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Query(QueryError::Window(e)) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Query(QueryError::Store(e)) => {
                tracing::error!(error = %e, operation = "query", "store query failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to read metrics".to_string(),
                )
            }
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("no data for {what}")),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn found<T>(reading: Option<T>, what: String) -> ApiResult<T> {
    reading.map(Json).ok_or(ApiError::NotFound(what))
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub(super) async fn list_nodes(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Vec<Reading<NodeReport>>> {
    Ok(Json(state.service.nodes(q.window()).await?))
}

pub(super) async fn get_node(
    State(state): State<AppState>,
    Path(node): Path<String>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Reading<NodeReport>> {
    let reading = state.service.node(&node, q.window()).await?;
    found(reading, format!("node {node}"))
}

pub(super) async fn node_pods(
    State(state): State<AppState>,
    Path(node): Path<String>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Vec<Reading<PodReport>>> {
    Ok(Json(state.service.pods_on_node(&node, q.window()).await?))
}

pub(super) async fn list_pods(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Vec<Reading<PodReport>>> {
    Ok(Json(state.service.pods(q.window()).await?))
}

pub(super) async fn get_pod(
    State(state): State<AppState>,
    Path(pod): Path<String>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Reading<PodReport>> {
    let reading = state.service.pod(&pod, q.window()).await?;
    found(reading, format!("pod {pod}"))
}

pub(super) async fn list_namespaces(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Vec<Reading<GroupReport>>> {
    Ok(Json(state.service.namespaces(q.window()).await?))
}

pub(super) async fn get_namespace(
    State(state): State<AppState>,
    Path(ns): Path<String>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Reading<GroupReport>> {
    let reading = state.service.namespace(&ns, q.window()).await?;
    found(reading, format!("namespace {ns}"))
}

pub(super) async fn namespace_pods(
    State(state): State<AppState>,
    Path(ns): Path<String>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Vec<Reading<PodReport>>> {
    Ok(Json(state.service.namespace_pods(&ns, q.window()).await?))
}

pub(super) async fn list_deployments(
    State(state): State<AppState>,
    Path(ns): Path<String>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Vec<Reading<GroupReport>>> {
    Ok(Json(state.service.deployments(&ns, q.window()).await?))
}

pub(super) async fn get_deployment(
    State(state): State<AppState>,
    Path((ns, deployment)): Path<(String, String)>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Reading<GroupReport>> {
    let reading = state
        .service
        .deployment(&ns, &deployment, q.window())
        .await?;
    found(reading, format!("deployment {ns}/{deployment}"))
}

pub(super) async fn deployment_pods(
    State(state): State<AppState>,
    Path((ns, deployment)): Path<(String, String)>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Vec<Reading<PodReport>>> {
    Ok(Json(
        state
            .service
            .deployment_pods(&ns, &deployment, q.window())
            .await?,
    ))
}

pub(super) async fn node_workloads(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Vec<Reading<GroupReport>>> {
    Ok(Json(state.service.node_workloads(q.window()).await?))
}
