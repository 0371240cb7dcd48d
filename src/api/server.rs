use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{MatchedPath, Request};
use axum::middleware::{Next, from_fn};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::api::handler::*;
use crate::api::middleware::cors;
use crate::constants::{MATCH_BY_ID_ROUTE, MATCHES_ROUTE};
use crate::db::prelude::*;
use crate::util::env::Config;

pub type JsonResult<T> = core::result::Result<Json<T>, RouteError>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MatchStore>,
    /// Answer 404 for updates/deletes aimed at ids that do not exist.
    pub strict_existence_checking: bool,
}

/// Builds the application router over `state`.
pub fn router(state: Arc<AppState>, cors_layer: CorsLayer) -> Router {
    Router::new()
        .route("/", get(|| async { Response::new(Body::empty()) }))
        .route(MATCHES_ROUTE, get(list_matches).post(create_match))
        .route(MATCH_BY_ID_ROUTE, put(update_match).delete(delete_match))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method();
                let uri = req.uri();

                let matched_path = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|matched| matched.as_str());

                tracing::debug_span!("api_request", ?method, ?uri, ?matched_path)
            }),
        )
        .layer(from_fn(log_route_errors))
        .layer(cors_layer)
        .with_state(state)
}

/// Logs any `RouteError` a handler stashed in the response extensions.
#[instrument(skip(request, next), fields(uri = %request.uri()))]
async fn log_route_errors(request: Request, next: Next) -> Response {
    let res = next.run(request).await;
    if let Some(err) = res.extensions().get::<Arc<RouteError>>() {
        tracing::error!(error = ?err, "error occurred inside route handler");
    }

    res
}

/// Binds the API port and serves until ctrl-c.
#[instrument(skip_all, fields(port = config.server_api_port))]
pub async fn start_server(config: &Config, store: Arc<dyn MatchStore>) -> std::io::Result<()> {
    let state = Arc::new(AppState {
        store,
        strict_existence_checking: config.strict_existence_checking,
    });
    let app = router(state, cors(&config.cors_allow_origins));

    let socket_addr = SocketAddr::new(
        IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
        config.server_api_port,
    );
    let listener = tokio::net::TcpListener::bind(socket_addr).await?;

    tracing::info!(
        server_url = %format!("http://127.0.0.1:{}", socket_addr.port()),
        strict_existence_checking = config.strict_existence_checking,
        "server ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = ?e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutting down");
        })
        .await
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("match {0} not found")]
    NotFound(i64),

    /// `context` is what the caller gets to see; `source` only reaches the log.
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl RouteError {
    /// Wraps a store failure behind a generic, caller-facing message.
    pub fn store(context: &'static str) -> impl FnOnce(StoreError) -> RouteError {
        move |source| RouteError::Store { context, source }
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let status = match &self {
            RouteError::Validation(_) => StatusCode::BAD_REQUEST,
            RouteError::NotFound(_) => StatusCode::NOT_FOUND,
            RouteError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let error = match &self {
            RouteError::Store { context, .. } => context.to_string(),
            other => other.to_string(),
        };

        let mut response = (status, Json(ErrorResponse { error })).into_response();
        if let RouteError::Store { .. } = self {
            response.extensions_mut().insert(Arc::new(self));
        }

        response
    }
}
