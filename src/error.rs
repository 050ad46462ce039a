//! Unified error handling for the tfs-tools library.
//!
//! ## Error Categories
//!
//! - [`ApiError`]: Errors from TFS REST API interactions
//! - [`ConfigError`]: Errors from configuration loading and validation
//!
//! The build waiter never surfaces these to its caller directly: every
//! [`ApiError`] collapses to [`crate::wait::PollOutcome::Failed`] and only its
//! message is kept for diagnostics.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tfs_tools::error::{ApiError, TfsError};
//!
//! fn example() -> Result<(), TfsError> {
//!     // Errors are automatically converted via From trait
//!     Err(ApiError::Unauthorized)?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the tfs-tools library.
#[derive(Error, Debug)]
pub enum TfsError {
    /// An error occurred while talking to the TFS REST API.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// An error occurred while loading or validating configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A generic error for cases not covered by specific error types.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Errors that can occur when interacting with the TFS REST API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced an HTTP response (DNS, connect, TLS, timeout).
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server rejected the credential (401 or 403).
    #[error("Unauthorized: the server rejected the supplied credential")]
    Unauthorized,

    /// The requested resource was not found (404).
    #[error("Resource not found: {resource}")]
    NotFound {
        /// The URL path that was requested.
        resource: String,
    },

    /// The API returned some other non-success response.
    #[error("API request failed with status {status}: {message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Body text returned by the server, if any.
        message: String,
    },

    /// The response body was not the JSON shape we expected.
    #[error("Failed to decode response from {resource}: {message}")]
    Decode {
        /// The URL path that was requested.
        resource: String,
        /// Description of the decode failure.
        message: String,
    },

    /// The response decoded but lacked a field the caller narrows to.
    #[error("Response from {resource} has no '{field}' field")]
    MissingField {
        /// The URL path that was requested.
        resource: String,
        /// Name of the absent JSON field.
        field: &'static str,
    },

    /// A request URL could not be built from the connection settings.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Maps an HTTP status (and its body text) onto the taxonomy.
    pub fn from_status(status: reqwest::StatusCode, resource: &str, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => ApiError::Unauthorized,
            404 => ApiError::NotFound {
                resource: resource.to_string(),
            },
            code => ApiError::RequestFailed {
                status: code,
                message: body,
            },
        }
    }
}

/// Errors that can occur during configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required configuration field is missing.
    #[error("{field} is required (use --{field}, {env_var} env var, or config file)")]
    MissingRequired {
        /// Name of the missing field.
        field: String,
        /// Environment variable name for this field.
        env_var: String,
    },

    /// Failed to read the configuration file.
    #[error("Failed to read config file at {path}: {message}")]
    FileReadError {
        /// Path to the config file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Failed to parse the configuration file.
    #[error("Failed to parse config file at {path}: {message}")]
    ParseError {
        /// Path to the config file.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// An invalid value was provided for a configuration field.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Name of the field with invalid value.
        field: String,
        /// Description of why the value is invalid.
        message: String,
    },

    /// Failed to create config directory.
    #[error("Failed to create config directory at {path}: {message}")]
    DirectoryCreationError {
        /// Path where directory creation failed.
        path: PathBuf,
        /// Error message.
        message: String,
    },
}

/// Type alias for Results using ApiError.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    /// # API Error Display
    ///
    /// Tests that API errors display correctly formatted messages.
    ///
    /// ## Test Scenario
    /// - Creates various ApiError variants
    /// - Tests their Display implementation
    ///
    /// ## Expected Outcome
    /// - Each error variant produces a clear, informative message
    #[test]
    fn test_api_error_display() {
        let unauthorized = ApiError::Unauthorized;
        assert!(unauthorized.to_string().contains("Unauthorized"));

        let not_found = ApiError::NotFound {
            resource: "/tfs/DefaultCollection/Fabrikam/_apis/build/builds/7".to_string(),
        };
        assert!(not_found.to_string().contains("builds/7"));

        let request_failed = ApiError::RequestFailed {
            status: 500,
            message: "Internal Server Error".to_string(),
        };
        assert!(request_failed.to_string().contains("500"));
        assert!(request_failed.to_string().contains("Internal Server Error"));

        let missing = ApiError::MissingField {
            resource: "/builds/7".to_string(),
            field: "status",
        };
        assert!(missing.to_string().contains("'status'"));
    }

    /// # Status Code Mapping
    ///
    /// Tests that HTTP status codes map onto the right ApiError variants.
    ///
    /// ## Test Scenario
    /// - Maps 401, 403, 404 and 500 responses
    ///
    /// ## Expected Outcome
    /// - Auth rejections become Unauthorized, 404 becomes NotFound,
    ///   everything else keeps its status and body
    #[test]
    fn test_from_status_mapping() {
        use reqwest::StatusCode;

        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, "/x", String::new()),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, "/x", String::new()),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, "/x", String::new()),
            ApiError::NotFound { resource } if resource == "/x"
        ));
        match ApiError::from_status(StatusCode::BAD_GATEWAY, "/x", "upstream".to_string()) {
            ApiError::RequestFailed { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    /// # Config Error Display
    ///
    /// Tests that Config errors display correctly formatted messages.
    ///
    /// ## Test Scenario
    /// - Creates a MissingRequired error
    ///
    /// ## Expected Outcome
    /// - The message names the flag and the environment variable
    #[test]
    fn test_config_error_display() {
        let missing = ConfigError::MissingRequired {
            field: "collection-url".to_string(),
            env_var: "TFS_TOOLS_COLLECTION_URL".to_string(),
        };
        let msg = missing.to_string();
        assert!(msg.contains("--collection-url"));
        assert!(msg.contains("TFS_TOOLS_COLLECTION_URL"));
    }

    /// # Error Conversion
    ///
    /// Tests that errors convert correctly through the From trait.
    ///
    /// ## Expected Outcome
    /// - Both error families convert into TfsError
    #[test]
    fn test_error_conversion() {
        let tfs_error: TfsError = ApiError::Unauthorized.into();
        assert!(matches!(tfs_error, TfsError::Api(_)));

        let tfs_error: TfsError = ConfigError::InvalidValue {
            field: "api-version".to_string(),
            message: "must not be empty".to_string(),
        }
        .into();
        assert!(matches!(tfs_error, TfsError::Config(_)));
    }
}
