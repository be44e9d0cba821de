//! Error type shared by every Photo-z Server operation.

use std::path::PathBuf;

use crate::catalog::CatalogError;
use crate::config::ConfigError;

/// Error type for Photo-z Server operations.
#[derive(Debug, thiserror::Error)]
pub enum PzError {
    /// Missing or invalid token, or the product is restricted
    #[error("Access denied (status {status}): {message}")]
    Access { status: u16, message: String },
    /// Unknown id, tag, handle or internal name
    #[error("Not found: {0}")]
    NotFound(String),
    /// Host unreachable, timed out, or the transport failed mid-request
    #[error("Network error: {0}")]
    Network(String),
    /// Local file could not be written or read
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Server returned a non-success status other than 401/403/404
    #[error("Server error (status {status}): {message}")]
    Server { status: u16, message: String },
    /// Failed to parse a response body
    #[error("Parse error: {0}")]
    Parse(String),
    /// Filter key not accepted by the endpoint
    #[error("Invalid filter key '{key}'. Valid filter keys are: {}", valid.join(", "))]
    InvalidFilter { key: String, valid: Vec<String> },
    /// Product is not simple tabular data
    #[error("Product {product} is of type '{product_type}', which is not tabular; use download_product() instead")]
    UnsupportedProduct {
        product: String,
        product_type: String,
    },
    /// Product exists but is not of the requested type
    #[error("Product {product} is a '{actual}', not a '{expected}'")]
    WrongProductType {
        product: String,
        expected: String,
        actual: String,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl PzError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PzError::Io {
            path: path.into(),
            source,
        }
    }

    /// Build the error matching a non-success HTTP status.
    pub(crate) fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => PzError::Access { status, message },
            404 => PzError::NotFound(message),
            _ => PzError::Server { status, message },
        }
    }

    /// True for errors caused by missing or rejected credentials.
    pub fn is_access(&self) -> bool {
        matches!(self, PzError::Access { .. })
    }

    /// True for unknown ids, tags, handles and internal names.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PzError::NotFound(_))
    }
}

impl From<ureq::Error> for PzError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => {
                PzError::from_status(status, format!("HTTP status {status}"))
            }
            other => PzError::Network(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for PzError {
    fn from(err: serde_json::Error) -> Self {
        PzError::Parse(err.to_string())
    }
}

/// Standard Result type for Photo-z Server operations.
pub type Result<T> = std::result::Result<T, PzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(PzError::from_status(401, "no token".into()).is_access());
        assert!(PzError::from_status(403, "forbidden".into()).is_access());
        assert!(PzError::from_status(404, "gone".into()).is_not_found());
        assert!(matches!(
            PzError::from_status(500, "boom".into()),
            PzError::Server { status: 500, .. }
        ));
    }

    #[test]
    fn test_invalid_filter_message_lists_keys() {
        let err = PzError::InvalidFilter {
            key: "colour".into(),
            valid: vec!["release".into(), "search".into()],
        };
        assert_eq!(
            err.to_string(),
            "Invalid filter key 'colour'. Valid filter keys are: release, search"
        );
    }
}
