//! Unified error type for the config-file serving cache.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Top-level error type returned by the core pipeline and its collaborators.
#[derive(Debug, Error)]
pub enum AppError {
    /// The resolver returned no configuration for the requested tuple.
    #[error("configuration not found: {0}")]
    NotFound(String),

    /// The resolved configuration could not be rendered in the requested format.
    #[error("render error: {0}")]
    RenderError(String),

    /// The external config resolver failed.
    #[error("resolver error: {0}")]
    ResolverError(String),

    /// The release message bus reported a failure.
    #[error("message bus error: {0}")]
    MessageBusError(String),

    /// Configuration (environment) could not be loaded.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // NotFound/RenderError carry an empty body per the HTTP contract;
        // the client is expected to retry rather than parse an error payload.
        let status = match self {
            AppError::NotFound(_) | AppError::RenderError(_) => StatusCode::NOT_FOUND,
            AppError::ResolverError(_) => StatusCode::BAD_GATEWAY,
            AppError::MessageBusError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        status.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode as SC;

    #[test]
    fn not_found_maps_to_404() {
        let resp = AppError::NotFound("app1+default+ns1".into()).into_response();
        assert_eq!(resp.status(), SC::NOT_FOUND);
    }

    #[test]
    fn resolver_error_maps_to_502() {
        let resp = AppError::ResolverError("timeout".into()).into_response();
        assert_eq!(resp.status(), SC::BAD_GATEWAY);
    }
}
