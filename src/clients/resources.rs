//! Authenticated resource proxy.
//!
//! [`ResourceProxy`] forwards read requests for the shop's product catalog to
//! the upstream admin API using the access token of a bound session. Payloads
//! are passed through unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! use shop_auth_gateway::clients::{PageRequest, ResourceProxy};
//!
//! let proxy = ResourceProxy::new(&client, &session);
//! let products = proxy.fetch_page(PageRequest::default()).await?;
//! let count = proxy.fetch_count().await?;
//! ```

use serde_json::Value;
use thiserror::Error;

use crate::auth::Session;
use crate::clients::{HttpClient, HttpError};

/// Upstream path of the paged product listing.
pub const PRODUCTS_PATH: &str = "/admin/products.json";

/// Upstream path of the product count.
pub const PRODUCTS_COUNT_PATH: &str = "/admin/products/count.json";

/// Key of the resource array in the upstream listing response.
const RESOURCE_KEY: &str = "products";

/// Rejected paging parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PageRequestError {
    /// A paging value is not a positive integer.
    #[error("{name} must be a positive integer")]
    NotPositive {
        /// The offending query parameter.
        name: &'static str,
    },

    /// The page size exceeds what the upstream serves.
    #[error("pageSize must not exceed {max}")]
    TooLarge {
        /// The largest accepted page size.
        max: u32,
    },
}

/// A validated page of the resource listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Page size used when none is requested.
    pub const DEFAULT_PAGE_SIZE: u32 = 10;

    /// Largest page size the upstream serves.
    pub const MAX_PAGE_SIZE: u32 = 250;

    /// Creates a page request.
    ///
    /// # Errors
    ///
    /// Returns [`PageRequestError`] if either value is zero or the page size
    /// exceeds [`PageRequest::MAX_PAGE_SIZE`].
    pub const fn new(page: u32, page_size: u32) -> Result<Self, PageRequestError> {
        if page == 0 {
            return Err(PageRequestError::NotPositive { name: "page" });
        }
        if page_size == 0 {
            return Err(PageRequestError::NotPositive { name: "pageSize" });
        }
        if page_size > Self::MAX_PAGE_SIZE {
            return Err(PageRequestError::TooLarge {
                max: Self::MAX_PAGE_SIZE,
            });
        }
        Ok(Self { page, page_size })
    }

    /// Parses raw `page` and `pageSize` query values, applying defaults for
    /// absent or blank values.
    ///
    /// # Errors
    ///
    /// Returns [`PageRequestError`] for non-numeric, zero, negative or
    /// oversized values.
    pub fn parse(page: Option<&str>, page_size: Option<&str>) -> Result<Self, PageRequestError> {
        let page = parse_positive("page", page, 1)?;
        let page_size = parse_positive("pageSize", page_size, Self::DEFAULT_PAGE_SIZE)?;
        Self::new(page, page_size)
    }

    /// The 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// The number of items per page.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

fn parse_positive(name: &'static str, raw: Option<&str>, default: u32) -> Result<u32, PageRequestError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(default),
        Some(value) => value
            .parse::<u32>()
            .map_err(|_| PageRequestError::NotPositive { name }),
    }
}

/// Proxies resource reads for one bound session.
pub struct ResourceProxy<'a> {
    client: &'a HttpClient,
    session: &'a Session,
}

impl<'a> ResourceProxy<'a> {
    /// Creates a proxy acting with `session`'s shop and token.
    #[must_use]
    pub const fn new(client: &'a HttpClient, session: &'a Session) -> Self {
        Self { client, session }
    }

    /// Fetches one page of products and returns the upstream array unchanged.
    ///
    /// # Errors
    ///
    /// Returns the upstream [`HttpError`], or [`HttpError::InvalidBody`] when
    /// the response has no `products` array.
    pub async fn fetch_page(&self, request: PageRequest) -> Result<Value, HttpError> {
        let mut body = self
            .client
            .get_json(
                &self.session.shop,
                &self.session.access_token,
                PRODUCTS_PATH,
                &[
                    ("limit", request.page_size().to_string()),
                    ("page", request.page().to_string()),
                ],
            )
            .await?;

        match body.get_mut(RESOURCE_KEY).map(Value::take) {
            Some(items @ Value::Array(_)) => Ok(items),
            _ => Err(HttpError::InvalidBody {
                reason: format!("response has no '{RESOURCE_KEY}' array"),
            }),
        }
    }

    /// Fetches the product count and returns the upstream body unchanged.
    ///
    /// # Errors
    ///
    /// Returns the upstream [`HttpError`].
    pub async fn fetch_count(&self) -> Result<Value, HttpError> {
        self.client
            .get_json(
                &self.session.shop,
                &self.session.access_token,
                PRODUCTS_COUNT_PATH,
                &[],
            )
            .await
    }
}
