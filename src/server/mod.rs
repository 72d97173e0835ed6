//! HTTP surface of the gateway.
//!
//! # Endpoints
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | GET | `/install` | Start an install |
//! | GET | `/install/callback` | Complete an install and bind a session |
//! | GET | `/resources` | One page of products (session required) |
//! | GET | `/resources/count` | Product count (session required) |
//! | POST | `/logout` | Destroy the bound session |
//! | GET | `/health` | Liveness |
//! | GET | `/health/ready` | Readiness |

mod error;
pub mod routes;
pub mod session;
mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::config::CALLBACK_PATH;

pub use error::AppError;
pub use session::BoundSession;
pub use state::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/health/ready", get(routes::health::readiness))
        .route("/install", get(routes::install::begin))
        .route(CALLBACK_PATH, get(routes::install::callback))
        .route("/resources", get(routes::resources::list))
        .route("/resources/count", get(routes::resources::count))
        .route("/logout", post(routes::logout::logout))
        .layer(
            // Query strings carry codes and signatures, so only the path is recorded.
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
