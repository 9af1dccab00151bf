use axum::{
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};

use crate::LagMonitor;

#[derive(Serialize)]
struct ErrorBody {
    error_code: u16,
    message: String,
}

pub fn router(engine: LagMonitor) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_headers([
        header::ORIGIN,
        HeaderName::from_static("x-requested-with"),
        header::CONTENT_TYPE,
        header::ACCEPT,
    ]);

    Router::new()
        .route("/monitor/refresh", get(refresh))
        .route("/consumergroups", get(consumer_groups))
        .route("/consumers/{consumer}/lag", get(consumer_lag))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(engine)
}

pub async fn start_http_server(
    engine: LagMonitor,
    addr: &str,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP API listening on http://{}", addr);

    axum::serve(listener, router(engine))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn refresh(State(engine): State<LagMonitor>) -> Response {
    tracing::trace!("refresh requested over http");
    match engine.refresh.refresh().await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            let body = ErrorBody {
                error_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                message: e.to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

async fn consumer_groups(State(engine): State<LagMonitor>) -> impl IntoResponse {
    let keys = engine.cache.keys();
    tracing::debug!(?keys, "returned keys");
    Json(keys)
}

async fn consumer_lag(
    State(engine): State<LagMonitor>,
    Path(consumer): Path<String>,
) -> Response {
    match engine.cache.get(&consumer) {
        Some(records) => Json(records).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
