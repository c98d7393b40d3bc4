use serde::Deserialize;
use thiserror::Error;

/// Failure of a single catalog request, as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(String),
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl CatalogError {
    /// Classifies a non-2xx response. The server's `message` wins over the generic text.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|body| body.message)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| format!("request failed with status {status}"));

        match status {
            404 => Self::NotFound(message),
            400 | 422 => Self::Validation(message),
            _ => Self::Api { status, message },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network(_) => None,
            Self::Api { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::Validation(_) => Some(400),
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
