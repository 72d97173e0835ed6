//! Authentication types for the install gateway.
//!
//! # Overview
//!
//! - [`Session`]: The browser session bound after a successful install
//! - [`oauth`]: The install handshake (authorization URL, callback validation,
//!   token exchange)
//!
//! # Install Flow
//!
//! ```rust,ignore
//! use shop_auth_gateway::auth::oauth::{begin_auth, validate_auth_callback, CallbackContext};
//!
//! // 1. Generate authorization URL and state
//! let result = begin_auth(&config, &shop);
//! // Set the state cookie and redirect to result.auth_url
//!
//! // 2. Handle callback and bind a session
//! let ctx = CallbackContext::new(&config, &client, &pool);
//! let session = validate_auth_callback(&ctx, &query, cookie_state).await?;
//! ```

pub mod oauth;
mod session;

pub use session::Session;
