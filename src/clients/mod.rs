//! HTTP client types for upstream platform calls.
//!
//! # Overview
//!
//! - [`HttpClient`]: Shared async client with timeouts and base URI resolution
//! - [`ResourceProxy`]: Session-authenticated product reads
//! - [`PageRequest`]: Validated paging parameters
//! - [`HttpError`]: Unified error type for upstream failures

mod errors;
mod http_client;
mod resources;

pub use errors::{HttpError, HttpResponseError};
pub use http_client::{HttpClient, ACCESS_TOKEN_HEADER, GATEWAY_VERSION};
pub use resources::{
    PageRequest, PageRequestError, ResourceProxy, PRODUCTS_COUNT_PATH, PRODUCTS_PATH,
};
