use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid api base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("server rejected request with status {status}: {}", body.message)]
    Rejected { status: u16, body: ApiError },
    #[error("malformed server response: {0}")]
    MalformedResponse(String),
}

impl GatewayError {
    pub fn rejected(status: u16, body: ApiError) -> Self {
        Self::Rejected {
            status,
            body: body.with_status_fallback(status),
        }
    }

    /// Message the backend wants shown to the user, if it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { body, .. } if !body.message.trim().is_empty() => {
                Some(body.message.trim())
            }
            _ => None,
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Rejected { body, .. } => Some(body.code),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::MalformedResponse(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}
