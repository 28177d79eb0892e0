use serde::Serialize;

/// A required endpoint or credential is missing or malformed.
///
/// Raised before any network attempt; retrying is pointless until the
/// environment changes.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// The QA search or recommendation call failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },
    #[error("{endpoint} returned status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

/// The record store failed to answer a lookup or accept a browse row.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LookupError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("record store request on {collection} failed: {message}")]
    Request { collection: String, message: String },
    #[error("record store returned status {status} for {collection}: {body}")]
    Status {
        collection: String,
        status: u16,
        body: String,
    },
    #[error("failed to decode records from {collection}: {message}")]
    Decode { collection: String, message: String },
}

/// User-facing error published on a session.
///
/// Transport details stay in the logs; presentation only sees these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SessionError {
    #[error("{0} is not configured")]
    NotConfigured(String),
    #[error("the service is unavailable, please try again later")]
    Unavailable,
}

impl From<&TransportError> for SessionError {
    fn from(err: &TransportError) -> Self {
        match err {
            TransportError::Configuration(ConfigurationError::Missing(key))
            | TransportError::Configuration(ConfigurationError::Invalid { key, .. }) => {
                Self::NotConfigured((*key).to_string())
            }
            _ => Self::Unavailable,
        }
    }
}
