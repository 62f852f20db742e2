use std::time::Duration;

use exam_client::GatewayError;
use thiserror::Error;

use crate::auto_submit::SessionState;

const LOAD_FAILURE_MESSAGE: &str = "Failed to load exam. Please try again later.";
const LOAD_FAILURE_REDIRECT: Duration = Duration::from_secs(3);

/// Fatal to the attempt: the host shows a full-screen error and redirects.
#[derive(Debug, Error)]
pub enum SessionLoadError {
    #[error("exam could not be fetched: {0}")]
    Fetch(#[from] GatewayError),
    #[error("exam data is malformed: {0}")]
    Malformed(String),
}

impl SessionLoadError {
    pub fn user_message(&self) -> String {
        match self {
            SessionLoadError::Fetch(err) => err
                .server_message()
                .unwrap_or(LOAD_FAILURE_MESSAGE)
                .to_string(),
            SessionLoadError::Malformed(_) => LOAD_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn redirect_after(&self) -> Duration {
        LOAD_FAILURE_REDIRECT
    }
}

/// Why a submit request was refused before anything was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitRejected {
    #[error("exam authors cannot attempt their own exam")]
    NotPermitted,
    #[error("submission is not available in state {}", .0.as_str())]
    NotMonitoring(SessionState),
    #[error("the exam session has been closed")]
    TornDown,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    #[error("question {index} does not exist (exam has {count} questions)")]
    NoSuchQuestion { index: usize, count: usize },
    #[error("'{option}' is not an option of question {index}")]
    NoSuchOption { index: usize, option: String },
    #[error("answers can no longer be changed")]
    Frozen,
    #[error("exam authors cannot answer their own exam")]
    NotPermitted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::{ApiError, ErrorCode};

    #[test]
    fn load_failure_prefers_the_server_message() {
        let err = SessionLoadError::from(GatewayError::rejected(
            403,
            ApiError::new(ErrorCode::Unknown, "You have already attempted this exam"),
        ));
        assert_eq!(err.user_message(), "You have already attempted this exam");
        assert_eq!(err.redirect_after(), Duration::from_secs(3));
    }

    #[test]
    fn load_failure_falls_back_to_generic_text() {
        let err = SessionLoadError::from(GatewayError::Transport("dns".into()));
        assert_eq!(err.user_message(), LOAD_FAILURE_MESSAGE);
        let err = SessionLoadError::Malformed("no questions".into());
        assert_eq!(err.user_message(), LOAD_FAILURE_MESSAGE);
    }
}
