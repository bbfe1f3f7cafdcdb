use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::domain::{ApplicationId, Attachment, LoanDecision, LoanSubmission};
use crate::config::BackendConfig;

/// Operations the dashboard needs from the backing store.
///
/// Reads return the raw JSON payload; shaping it into [`LoanApplication`] records is the
/// repository's job so that every backend gets the same integrity checks.
///
/// [`LoanApplication`]: super::domain::LoanApplication
#[async_trait]
pub trait LoanBackend: Send + Sync {
    async fn all_applications(&self) -> Result<Value, BackendError>;
    async fn user_applications(&self, user_id: &str) -> Result<Value, BackendError>;
    async fn update_status(
        &self,
        application_id: &ApplicationId,
        decision: LoanDecision,
    ) -> Result<(), BackendError>;
    async fn disburse(&self, application_id: &ApplicationId, amount: f64)
        -> Result<(), BackendError>;
    async fn apply(&self, user_id: &str, submission: &LoanSubmission) -> Result<(), BackendError>;
}

/// Error enumeration for backing-store calls.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status {
        url: String,
        status: u16,
        message: Option<String>,
    },
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("`{segment}` cannot be used as a path segment under {base_url}")]
    InvalidPath { base_url: String, segment: String },
}

impl BackendError {
    /// Human-readable message supplied by the backing store, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// `reqwest` implementation of [`LoanBackend`] speaking the loan service's REST API.
#[derive(Debug, Clone)]
pub struct HttpLoanBackend {
    http: Client,
    base_url: String,
}

impl HttpLoanBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(BackendError::Client)?;
        Ok(Self::with_client(http, &config.base_url))
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join `segments` onto the base URL, percent-encoding each one so identifiers can
    /// never add segments, a query, or a fragment of their own.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let invalid = |segment: &str| BackendError::InvalidPath {
            base_url: self.base_url.clone(),
            segment: segment.to_string(),
        };

        if let Some(segment) = segments
            .iter()
            .find(|segment| matches!(segment.trim(), "" | "." | ".."))
        {
            return Err(invalid(segment));
        }

        let mut url = Url::parse(&self.base_url).map_err(|_| invalid(""))?;
        url.path_segments_mut()
            .map_err(|_| invalid(""))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, url: &Url) -> Result<Response, BackendError> {
        let url = url.to_string();
        let response = request
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_server_message(&body);
        warn!(%url, status = status.as_u16(), ?message, "backing store rejected request");
        Err(BackendError::Status {
            url,
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json(&self, segments: &[&str]) -> Result<Value, BackendError> {
        let url = self.endpoint(segments)?;
        debug!(%url, "fetching applications");
        let response = self.send(self.http.get(url.clone()), &url).await?;
        response
            .json::<Value>()
            .await
            .map_err(|source| BackendError::Decode {
                url: url.to_string(),
                source,
            })
    }
}

#[async_trait]
impl LoanBackend for HttpLoanBackend {
    async fn all_applications(&self) -> Result<Value, BackendError> {
        self.get_json(&["api", "loans", "all"]).await
    }

    async fn user_applications(&self, user_id: &str) -> Result<Value, BackendError> {
        self.get_json(&["api", "loans", "user", user_id]).await
    }

    async fn update_status(
        &self,
        application_id: &ApplicationId,
        decision: LoanDecision,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&["api", "loans", "update-status", application_id.as_str()])?;
        debug!(%url, status = decision.as_str(), "updating application status");
        let request = self
            .http
            .put(url.clone())
            .query(&[("status", decision.as_str())]);
        self.send(request, &url).await?;
        Ok(())
    }

    async fn disburse(
        &self,
        application_id: &ApplicationId,
        amount: f64,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&["api", "disbursements", "disburse", application_id.as_str()])?;
        debug!(%url, amount, "disbursing loan");
        let request = self
            .http
            .post(url.clone())
            .query(&[("amount", amount.to_string())]);
        self.send(request, &url).await?;
        Ok(())
    }

    async fn apply(&self, user_id: &str, submission: &LoanSubmission) -> Result<(), BackendError> {
        let url = self.endpoint(&["api", "loans", "apply"])?;
        debug!(%url, user_id, "submitting loan application");
        let form = submission_form(user_id, submission)?;
        self.send(self.http.post(url.clone()).multipart(form), &url).await?;
        Ok(())
    }
}

fn submission_form(user_id: &str, submission: &LoanSubmission) -> Result<Form, BackendError> {
    let mut form = Form::new()
        .text("name", submission.name.clone())
        .text("profession", submission.profession.clone())
        .text("purpose", submission.purpose.clone())
        .text("loanAmount", submission.loan_amount.to_string())
        .text("creditScore", submission.credit_score.to_string())
        .text("userId", user_id.to_string());

    if let Some(attachment) = &submission.pf_account_pdf {
        form = form.part("pfAccountPdf", attachment_part(attachment)?);
    }
    if let Some(attachment) = &submission.salary_slip {
        form = form.part("salarySlip", attachment_part(attachment)?);
    }

    Ok(form)
}

fn attachment_part(attachment: &Attachment) -> Result<Part, BackendError> {
    Part::bytes(attachment.bytes.clone())
        .file_name(attachment.file_name.clone())
        .mime_str(attachment.content_type.as_ref())
        .map_err(BackendError::Client)
}

/// Pull `message` out of a JSON error body.
fn extract_server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = value.get("message")?.as_str()?.trim();
    (!message.is_empty()).then(|| message.to_string())
}
