use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Network or HTTP-layer failure talking to a provider.
    Transport(String),
    /// Provider reported invalid or expired credentials.
    Credential(String),
    /// Provider returned a top-level error that is not about credentials.
    Rejected(String),
    /// Operation the provider structurally cannot perform.
    Capability(String),
    /// Bad request error (invalid input).
    BadRequest(String),
    /// Resource not found error.
    NotFound(String),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// The innermost error, with every context layer stripped.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for failures of the provider call itself (network, HTTP or credentials).
    pub fn is_transport(&self) -> bool {
        matches!(
            self.root(),
            AppError::Transport(_) | AppError::Credential(_) | AppError::Rejected(_)
        )
    }

    pub fn is_capability(&self) -> bool {
        matches!(self.root(), AppError::Capability(_))
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    ///
    /// Provider messages (credential, rejection, capability) are passed through verbatim.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Transport(msg) => write!(f, "Transport error: {}", msg),
            AppError::Credential(msg) => write!(f, "{}", msg),
            AppError::Rejected(msg) => write!(f, "{}", msg),
            AppError::Capability(msg) => write!(f, "{}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Verification failures keep the `Error` status in the body so that HTTP
    /// callers see the same shape as library callers.
    fn into_response(self) -> Response {
        let status = match self.root() {
            AppError::Transport(_) | AppError::Rejected(_) => StatusCode::BAD_GATEWAY,
            AppError::Credential(msg) => {
                tracing::warn!("Provider rejected credentials: {}", msg);
                StatusCode::BAD_GATEWAY
            }
            AppError::Capability(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "status": "Error", "error": "Internal server error" })),
                )
                    .into_response();
            }
            AppError::WithContext { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "status": "Error",
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that produces the context message.
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}
