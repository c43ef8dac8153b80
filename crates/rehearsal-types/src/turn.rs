/// One question/answer/feedback unit of an interview.
///
/// `answer` and `feedback` serialize as `null` while absent; the interview
/// service expects the keys to be present.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Turn {
    pub question: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl Turn {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: None,
            feedback: None,
        }
    }

    pub fn with_answer(mut self, answer: &str) -> Self {
        self.answer = Some(answer.to_string());
        self
    }

    pub fn with_feedback(mut self, feedback: &str) -> Self {
        self.feedback = Some(feedback.to_string());
        self
    }

    pub fn is_answered(&self) -> bool {
        self.answer.is_some()
    }

    pub fn has_feedback(&self) -> bool {
        self.feedback.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unanswered_turn_serializes_nulls() {
        let turn = Turn::new("Tell me about Project X");
        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(
            value,
            json!({"question": "Tell me about Project X", "answer": null, "feedback": null})
        );
    }

    #[test]
    fn test_turn_survives_the_wire() {
        let turn = Turn::new("What was the biggest challenge?")
            .with_answer("Cache invalidation")
            .with_feedback("Good detail on design trade-offs.");

        let text = serde_json::to_string(&turn).unwrap();
        let parsed: Turn = serde_json::from_str(&text).unwrap();

        assert_eq!(parsed, turn);
    }

    #[test]
    fn test_missing_optional_keys_default_to_none() {
        let parsed: Turn = serde_json::from_str(r#"{"question": "Why Rust?"}"#).unwrap();
        assert_eq!(parsed, Turn::new("Why Rust?"));
        assert!(!parsed.is_answered());
        assert!(!parsed.has_feedback());
    }
}
