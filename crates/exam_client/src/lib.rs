use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Response};
use shared::{
    domain::{ExamId, Role},
    error::{ApiError, ErrorCode},
    protocol::{ExamDetail, SubmitExamRequest, SubmitExamResponse},
};
use tracing::{debug, info, warn};
use url::Url;

pub mod error;

pub use error::GatewayError;

const SUBMIT_PATH: &str = "api/exams/submit";
const EXAMS_PATH: &str = "api/exams/";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Credentials issued by the auth service. The token is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub token: String,
    pub role: Role,
}

impl AuthContext {
    pub fn new(token: impl Into<String>, role: Role) -> Self {
        Self {
            token: token.into(),
            role,
        }
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("token", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

#[async_trait]
pub trait ExamSource: Send + Sync {
    async fn fetch_exam(
        &self,
        auth: &AuthContext,
        exam_id: &ExamId,
    ) -> Result<ExamDetail, GatewayError>;
}

/// Sends one finished attempt to the backend. Implementations perform exactly
/// one request per call and never retry.
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(
        &self,
        auth: &AuthContext,
        request: &SubmitExamRequest,
    ) -> Result<SubmitExamResponse, GatewayError>;
}

pub struct HttpExamApi {
    http: Client,
    base_url: Url,
}

impl HttpExamApi {
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|err| GatewayError::InvalidBaseUrl {
                url: format!("{}{path}", self.base_url),
                reason: err.to_string(),
            })
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, GatewayError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).map_err(|err| GatewayError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(GatewayError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: "expected an http(s) base url".to_string(),
        });
    }
    Ok(url)
}

async fn rejection(response: Response) -> GatewayError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_else(|err| {
        debug!(status, error = %err, "error response body unreadable");
        String::new()
    });
    let body = serde_json::from_str::<ApiError>(&text).unwrap_or_else(|_| {
        debug!(status, "error response without json body");
        ApiError::new(ErrorCode::Unknown, "")
    });
    GatewayError::rejected(status, body)
}

#[async_trait]
impl ExamSource for HttpExamApi {
    async fn fetch_exam(
        &self,
        auth: &AuthContext,
        exam_id: &ExamId,
    ) -> Result<ExamDetail, GatewayError> {
        let url = self.endpoint(&format!("{EXAMS_PATH}{exam_id}"))?;
        let response = self.http.get(url).bearer_auth(&auth.token).send().await?;
        if !response.status().is_success() {
            let err = rejection(response).await;
            warn!(exam_id = %exam_id, error = %err, "exam fetch rejected");
            return Err(err);
        }
        let exam: ExamDetail = response.json().await?;
        debug!(
            exam_id = %exam.id,
            questions = exam.questions.len(),
            duration_minutes = exam.duration,
            "fetched exam"
        );
        Ok(exam)
    }
}

#[async_trait]
impl SubmissionGateway for HttpExamApi {
    async fn submit(
        &self,
        auth: &AuthContext,
        request: &SubmitExamRequest,
    ) -> Result<SubmitExamResponse, GatewayError> {
        let url = self.endpoint(SUBMIT_PATH)?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&auth.token)
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            let err = rejection(response).await;
            warn!(exam_id = %request.exam_id, error = %err, "submission rejected");
            return Err(err);
        }
        // Any 2xx means the attempt was recorded; the body is informational.
        let body = match response.text().await {
            Ok(text) if text.trim().is_empty() => SubmitExamResponse::default(),
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|err| {
                debug!(error = %err, "submission accepted with a non-json body");
                SubmitExamResponse::default()
            }),
            Err(err) => {
                debug!(error = %err, "submission accepted but body was unreadable");
                SubmitExamResponse::default()
            }
        };
        info!(
            exam_id = %request.exam_id,
            auto_submitted = request.auto_submitted,
            duration_secs = request.duration,
            "submission accepted"
        );
        Ok(body)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
