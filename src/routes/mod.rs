// HTTP routes. Every /api read accepts an optional ?window=<n><s|m|h>.

mod http;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};

use crate::service::MetricsService;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) service: Arc<MetricsService>,
}

pub fn app(service: Arc<MetricsService>) -> Router {
    let state = AppState { service };
    Router::new()
        .route("/version", get(http::version_handler))
        .route("/api/nodes", get(http::list_nodes))
        .route("/api/nodes/{node}", get(http::get_node))
        .route("/api/nodes/{node}/pods", get(http::node_pods))
        .route("/api/pods", get(http::list_pods))
        .route("/api/pods/{pod}", get(http::get_pod))
        .route("/api/namespaces", get(http::list_namespaces))
        .route("/api/namespaces/{ns}", get(http::get_namespace))
        .route("/api/namespaces/{ns}/pods", get(http::namespace_pods))
        .route("/api/namespaces/{ns}/deployments", get(http::list_deployments))
        .route(
            "/api/namespaces/{ns}/deployments/{deployment}",
            get(http::get_deployment),
        )
        .route(
            "/api/namespaces/{ns}/deployments/{deployment}/pods",
            get(http::deployment_pods),
        )
        .route("/api/workloads/nodes", get(http::node_workloads))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
