//! HTTP edge: the three `/configfiles/...` routes, turning requests into
//! [`QueryPipeline::handle`] calls and responses back into raw, properly
//! content-typed bodies.
//!
//! Deliberately returns raw bodies rather than a JSON-envelope response
//! type, since these three routes have format-dependent content types and
//! empty-body errors.

use crate::error::AppError;
use crate::pipeline::{PipelineRequest, QueryPipeline, RequestMode};
use axum::extract::{ConnectInfo, Path, Query, Request as AxumRequest, State};
use axum::http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Header carrying the per-request correlation id, propagated from an
/// inbound request or minted fresh.
static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

async fn request_id_middleware(mut request: AxumRequest, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request
        .headers_mut()
        .insert(REQUEST_ID_HEADER.clone(), HeaderValue::from_str(&request_id).unwrap());

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(REQUEST_ID_HEADER.clone(), HeaderValue::from_str(&request_id).unwrap());
    response
}

/// Shared application state, constructed once in `main` and cloned (cheap,
/// `Arc`-backed) into every request.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<QueryPipeline>,
}

#[derive(Debug, Deserialize)]
pub struct ConfigFileQuery {
    #[serde(rename = "dataCenter", default)]
    data_center: Option<String>,
    #[serde(default)]
    ip: Option<String>,
    #[serde(default)]
    label: Option<String>,
}

async fn dispatch(
    state: &AppState,
    mode: RequestMode,
    app_id: String,
    cluster_name: String,
    namespace: String,
    query: ConfigFileQuery,
    peer: SocketAddr,
) -> Result<Response, AppError> {
    let client_ip = query
        .ip
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| peer.ip().to_string());

    let req = PipelineRequest {
        mode,
        app_id,
        cluster_name,
        namespace,
        data_center: query.data_center.unwrap_or_default(),
        client_ip,
        client_label: query.label.unwrap_or_default(),
    };

    let rendered = state.pipeline.handle(req).await?;
    Ok((
        [(CONTENT_TYPE, rendered.content_type)],
        rendered.body,
    )
        .into_response())
}

async fn plain_handler(
    State(state): State<AppState>,
    Path((app_id, cluster_name, namespace)): Path<(String, String, String)>,
    Query(query): Query<ConfigFileQuery>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Result<Response, AppError> {
    dispatch(
        &state,
        RequestMode::Plain,
        app_id,
        cluster_name,
        namespace,
        query,
        peer,
    )
    .await
}

async fn json_handler(
    State(state): State<AppState>,
    Path((app_id, cluster_name, namespace)): Path<(String, String, String)>,
    Query(query): Query<ConfigFileQuery>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Result<Response, AppError> {
    dispatch(
        &state,
        RequestMode::Json,
        app_id,
        cluster_name,
        namespace,
        query,
        peer,
    )
    .await
}

async fn raw_handler(
    State(state): State<AppState>,
    Path((app_id, cluster_name, namespace)): Path<(String, String, String)>,
    Query(query): Query<ConfigFileQuery>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Result<Response, AppError> {
    dispatch(
        &state,
        RequestMode::Raw,
        app_id,
        cluster_name,
        namespace,
        query,
        peer,
    )
    .await
}

async fn health_check() -> &'static str {
    "ok"
}

/// Builds the complete router: the three config-file routes plus an
/// unauthenticated health check, with request-id, tracing, and CORS
/// layered on top as cross-cutting middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/configfiles/json/:app_id/:cluster_name/:namespace",
            get(json_handler),
        )
        .route(
            "/configfiles/raw/:app_id/:cluster_name/:namespace",
            get(raw_handler),
        )
        .route(
            "/configfiles/:app_id/:cluster_name/:namespace",
            get(plain_handler),
        )
        .route("/health", get(health_check))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheEngine;
    use crate::collaborators::{DefaultWatchKeyDeriver, InMemoryGrayRules, InMemoryResolver};
    use crate::watch_index::WatchIndex;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let resolver = Arc::new(InMemoryResolver::new());
        let mut cfg = BTreeMap::new();
        cfg.insert("k".to_string(), "v".to_string());
        resolver.seed("app1", "default", "ns1", "", cfg);

        let watch_index = Arc::new(WatchIndex::new());
        let cache = CacheEngine::new(1024 * 1024, Duration::from_secs(1800), watch_index.clone());
        let pipeline = QueryPipeline::new(
            cache,
            watch_index,
            resolver,
            Arc::new(InMemoryGrayRules::new()),
            Arc::new(DefaultWatchKeyDeriver),
        );

        AppState {
            pipeline: Arc::new(pipeline),
        }
    }

    fn request_with_peer(uri: &str) -> Request<Body> {
        let mut request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let peer: SocketAddr = "127.0.0.1:1234".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        request
    }

    #[tokio::test]
    async fn plain_route_returns_properties_body() {
        let app = create_router(test_state());

        let response = app
            .oneshot(request_with_peer("/configfiles/app1/default/ns1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain;charset=UTF-8"
        );
    }

    #[tokio::test]
    async fn missing_namespace_returns_404() {
        let app = create_router(test_state());

        let response = app
            .oneshot(request_with_peer("/configfiles/app1/default/missing"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
