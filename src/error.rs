//! Configuration error types for the install gateway.
//!
//! All configuration constructors return `Result<T, ConfigError>` to enable
//! fail-fast validation at startup. Error messages are designed to be clear
//! and actionable, since they are usually read by whoever deploys the app.
//!
//! # Example
//!
//! ```rust
//! use shop_auth_gateway::{ApiKey, ConfigError};
//!
//! let result = ApiKey::new("");
//! assert!(matches!(result, Err(ConfigError::EmptyApiKey)));
//! ```

use thiserror::Error;

/// Errors that can occur while building or loading the gateway configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// API key cannot be empty.
    #[error("API key cannot be empty. Please provide the app's public client identifier.")]
    EmptyApiKey,

    /// API secret key cannot be empty.
    #[error("API secret key cannot be empty. Please provide the app's shared secret.")]
    EmptyApiSecretKey,

    /// Shop domain is invalid.
    #[error("Invalid shop domain '{domain}'. Expected a host name such as 'my-store.myshopify.com'.")]
    InvalidShopDomain {
        /// The invalid domain that was provided.
        domain: String,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// Host URL is invalid.
    #[error("Invalid host URL '{url}'. Please provide a valid URL with scheme (e.g., 'https://myapp.example.com').")]
    InvalidHostUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// A required environment variable is not set.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// The variable name.
        name: &'static str,
    },

    /// An environment variable is set but cannot be parsed.
    #[error("Invalid value for environment variable {name}: '{value}'")]
    InvalidEnvVar {
        /// The variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}
