use crate::error::DialogueError;
use anyhow::Context;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use rehearsal_types::{
    CvSections, ErrorBody, HealthBody, InterviewReplyBody, InterviewRequest, QuickReviewBody,
    SectionRecord, Turn,
};
use reqwest::{Client, Response, StatusCode};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
/// Generation can be slow; the service itself allows its model call 90 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

const INTERVIEW_PATH: &str = "/mock-interview";
const QUICK_REVIEW_PATH: &str = "/quick-review";
const PARSE_CV_PATH: &str = "/parse-cv";

/// A normalized reply from the interview service.
///
/// `feedback` is passed through as the service sent it; deciding whether its
/// presence is acceptable is the controller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextTurn {
    pub next_question: String,
    pub feedback: Option<String>,
}

impl NextTurn {
    pub fn question(question: &str) -> Self {
        Self {
            next_question: question.to_string(),
            feedback: None,
        }
    }

    pub fn with_feedback(mut self, feedback: &str) -> Self {
        self.feedback = Some(feedback.to_string());
        self
    }
}

// The controller depends on this trait rather than on the HTTP client, so the
// dispatcher can be exercised with `MockInterviewService` in tests.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InterviewService: Send + Sync {
    /// Asks for the next question given the section and the full history so far.
    /// No retries happen here. `timeout` overrides the implementation's default
    /// for this call only; running out of time is `ServiceUnavailable`.
    async fn request_next(
        &self,
        section: &SectionRecord,
        history: &[Turn],
        timeout: Option<Duration>,
    ) -> Result<NextTurn, DialogueError>;
}

pub struct ClientConfig {
    base_url: String,
    timeout: Duration,
}

pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP client for the interview service and its companion endpoints
/// (quick review, CV parsing, health).
pub struct HttpInterviewClient {
    client: Client,
    base_url: String,
}

impl HttpInterviewClient {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Five-ish bullet points summarizing a section, for a quick refresher.
    pub async fn quick_review(&self, section: &SectionRecord) -> Result<Vec<String>, DialogueError> {
        let response = self
            .client
            .post(self.url(QUICK_REVIEW_PATH))
            .json(section)
            .send()
            .await
            .map_err(transport_error)?;
        let text = read_success_body(response).await?;
        let body: QuickReviewBody = serde_json::from_str(&text)
            .map_err(|e| DialogueError::InvalidResponse(format!("malformed quick review: {e}")))?;
        Ok(body.points)
    }

    /// Uploads a PDF CV and returns the sections the service extracted from it.
    pub async fn parse_cv(&self, path: &Path) -> anyhow::Result<CvSections> {
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            anyhow::bail!("Only PDF files are accepted: {}", path.display());
        }

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read CV file: {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("cv.pdf")
            .to_string();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(PARSE_CV_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        let text = read_success_body(response).await?;
        let sections: CvSections =
            serde_json::from_str(&text).context("Failed to parse CV sections from the service")?;
        tracing::info!("Parsed {} CV sections from {}", sections.len(), path.display());
        Ok(sections)
    }

    pub async fn health(&self) -> Result<(), DialogueError> {
        let response = self
            .client
            .get(self.url("/"))
            .send()
            .await
            .map_err(transport_error)?;
        let text = read_success_body(response).await?;
        let body: HealthBody = serde_json::from_str(&text)
            .map_err(|e| DialogueError::InvalidResponse(format!("malformed health reply: {e}")))?;
        if body.is_ok() {
            Ok(())
        } else {
            Err(DialogueError::ServiceUnavailable(format!(
                "service reports status '{}'",
                body.status
            )))
        }
    }
}

#[async_trait]
impl InterviewService for HttpInterviewClient {
    async fn request_next(
        &self,
        section: &SectionRecord,
        history: &[Turn],
        timeout: Option<Duration>,
    ) -> Result<NextTurn, DialogueError> {
        let request = InterviewRequest::new(section.clone(), history.to_vec());
        tracing::debug!(
            continuation = request.is_continuation(),
            turns = history.len(),
            ?timeout,
            "requesting next interview question"
        );

        let mut builder = self.client.post(self.url(INTERVIEW_PATH)).json(&request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder
            .send()
            .await
            .map_err(transport_error)?;
        let text = read_success_body(response).await?;
        parse_reply(&text)
    }
}

/// Turns a success body into a `NextTurn`, insisting on a non-empty question.
pub fn parse_reply(text: &str) -> Result<NextTurn, DialogueError> {
    let body: InterviewReplyBody = serde_json::from_str(text)
        .map_err(|e| DialogueError::InvalidResponse(format!("malformed reply: {e}")))?;
    let next_question = body
        .next_question
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| DialogueError::InvalidResponse("reply has no next_question".to_string()))?;
    Ok(NextTurn {
        next_question,
        feedback: body.feedback,
    })
}

fn transport_error(e: reqwest::Error) -> DialogueError {
    if e.is_timeout() {
        tracing::warn!("interview service timed out: {}", e);
        DialogueError::ServiceUnavailable(format!("request timed out: {e}"))
    } else {
        tracing::warn!("interview service transport failure: {}", e);
        DialogueError::ServiceUnavailable(e.to_string())
    }
}

/// Reads the body, converting a non-success status into `RemoteError`.
async fn read_success_body(response: Response) -> Result<String, DialogueError> {
    let status = response.status();
    let text = response.text().await.map_err(transport_error)?;
    if status.is_success() {
        Ok(text)
    } else {
        let message = remote_message(status, &text);
        tracing::warn!(%status, "interview service rejected the request: {}", message);
        Err(DialogueError::RemoteError(message))
    }
}

/// The human-readable message of an error response: FastAPI's `detail` when the
/// body has one, otherwise the body itself, otherwise the status text.
fn remote_message(status: StatusCode, body: &str) -> String {
    if let Ok(error) = serde_json::from_str::<ErrorBody>(body) {
        return error.message();
    }
    if !body.trim().is_empty() {
        return body.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}
