use http::StatusCode;
use thiserror::Error;

/// Unified error type for the node registry and selection engine
#[derive(Error, Debug)]
pub enum RotaError {
    // Registry errors
    #[error("Subscription not found: {id}")]
    SubscriptionNotFound { id: String },

    #[error("Node not found: {key}")]
    NodeNotFound { key: String },

    // Selection errors
    #[error("No available proxy")]
    NoAvailableProxy,

    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Persistence errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for Rota operations
pub type Result<T> = std::result::Result<T, RotaError>;

impl RotaError {
    /// Get the HTTP status code the request layer should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            RotaError::InvalidRequest(_) | RotaError::InvalidConfig(_) => {
                StatusCode::BAD_REQUEST
            }

            // 401 Unauthorized
            RotaError::Unauthorized => StatusCode::UNAUTHORIZED,

            // 404 Not Found
            RotaError::SubscriptionNotFound { .. } | RotaError::NodeNotFound { .. } => {
                StatusCode::NOT_FOUND
            }

            // 503 Service Unavailable
            RotaError::NoAvailableProxy => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            RotaError::Io(_) | RotaError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    pub(crate) fn subscription_not_found(id: &str) -> Self {
        RotaError::SubscriptionNotFound { id: id.to_string() }
    }

    pub(crate) fn node_not_found(key: &str) -> Self {
        RotaError::NodeNotFound {
            key: key.to_string(),
        }
    }
}
