//! Request-level error taxonomy.

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

/// Every way a request can fail to produce an asset.
///
/// Client-caused variants are expected and resolved into their status code
/// locally; `Internal` is anything else and always becomes an opaque 500.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateExceeded { retry_after: Duration },

    #[error("asset not found")]
    AssetNotFound,

    #[error("request path escapes the content root")]
    PathTraversalAttempt,

    #[error("internal fault: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::RateExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            // Traversal is deliberately indistinguishable from a missing file.
            AppError::AssetNotFound | AppError::PathTraversalAttempt => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            // ENOENT, ENOTDIR and ENAMETOOLONG all mean no such asset.
            ErrorKind::NotFound | ErrorKind::NotADirectory | ErrorKind::InvalidFilename => {
                AppError::AssetNotFound
            }
            _ => AppError::Internal(err.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn traversal_and_missing_share_a_status() {
        assert_eq!(AppError::PathTraversalAttempt.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::AssetNotFound.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn io_errors_split_into_missing_and_internal() {
        let missing: AppError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(missing, AppError::AssetNotFound));

        let too_long: AppError = io::Error::new(io::ErrorKind::InvalidFilename, "long").into();
        assert!(matches!(too_long, AppError::AssetNotFound));

        let denied: AppError = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert!(matches!(denied, AppError::Internal(_)));
    }
}
