use crate::section::SectionRecord;
use crate::turn::Turn;

/// `POST /mock-interview` request body.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InterviewRequest {
    pub section: SectionRecord,
    #[serde(default)]
    pub history: Vec<Turn>,
}

impl InterviewRequest {
    pub fn new(section: SectionRecord, history: Vec<Turn>) -> Self {
        Self { section, history }
    }

    /// The first request of a session carries no history.
    pub fn is_continuation(&self) -> bool {
        !self.history.is_empty()
    }
}

/// `POST /mock-interview` success body, as sent by the service.
///
/// Both fields are optional here so that a reply missing `next_question` can be
/// reported as an invalid response instead of a generic decode failure.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct InterviewReplyBody {
    #[serde(default)]
    pub next_question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// Error body of a non-success response. FastAPI reports `{"detail": ...}`,
/// where `detail` is usually a string but can be a validation error list.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let request = InterviewRequest::new(
            SectionRecord::new("Project X", "Built a caching layer"),
            vec![Turn::new("Tell me about Project X").with_answer("I built a cache")],
        );

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "section": {"title": "Project X", "text": "Built a caching layer"},
                "history": [{
                    "question": "Tell me about Project X",
                    "answer": "I built a cache",
                    "feedback": null
                }]
            })
        );
        assert!(request.is_continuation());
    }

    #[test]
    fn test_reply_without_feedback() {
        let reply: InterviewReplyBody =
            serde_json::from_str(r#"{"next_question": "Tell me about Project X"}"#).unwrap();
        assert_eq!(reply.next_question.as_deref(), Some("Tell me about Project X"));
        assert!(reply.feedback.is_none());
    }

    #[test]
    fn test_error_body_message() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"detail": "AI API key not configured."}"#).unwrap();
        assert_eq!(body.message(), "AI API key not configured.");

        let body: ErrorBody = serde_json::from_str(r#"{"detail": [{"loc": ["body"]}]}"#).unwrap();
        assert_eq!(body.message(), r#"[{"loc":["body"]}]"#);
    }
}
