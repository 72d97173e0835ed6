//! Session-authenticated resource endpoints.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::clients::{PageRequest, ResourceProxy};
use crate::server::session::BoundSession;
use crate::server::{AppError, AppState};

/// Query parameters of `GET /resources`.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    page: Option<String>,
    #[serde(rename = "pageSize")]
    page_size: Option<String>,
}

/// Returns one page of products for the bound shop.
#[tracing::instrument(skip_all)]
pub async fn list(
    State(state): State<AppState>,
    BoundSession(session): BoundSession,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, AppError> {
    let request = PageRequest::parse(params.page.as_deref(), params.page_size.as_deref())?;
    tracing::debug!(
        shop = %session.shop,
        page = request.page(),
        page_size = request.page_size(),
        "Proxying product page"
    );
    let products = ResourceProxy::new(state.http(), &session)
        .fetch_page(request)
        .await?;
    Ok(Json(products))
}

/// Returns the product count for the bound shop.
#[tracing::instrument(skip_all)]
pub async fn count(
    State(state): State<AppState>,
    BoundSession(session): BoundSession,
) -> Result<Json<Value>, AppError> {
    tracing::debug!(shop = %session.shop, "Proxying product count");
    let count = ResourceProxy::new(state.http(), &session).fetch_count().await?;
    Ok(Json(count))
}
