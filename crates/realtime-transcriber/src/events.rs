//! Wire events of a transcription-only realtime session.
//!
//! Only the events this crate sends or acts on are modelled; everything else the
//! server emits deserializes to `ServerEvent::Other`.

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "transcription_session.update")]
    TranscriptionSessionUpdate(TranscriptionSessionUpdateEvent),
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend(InputAudioBufferAppendEvent),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "close")]
    Close { reason: Option<String> },
    #[serde(rename = "error")]
    Error(ErrorEvent),
    #[serde(rename = "conversation.item.input_audio_transcription.delta")]
    TranscriptionDelta(TranscriptionDeltaEvent),
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted(TranscriptionCompletedEvent),
    #[serde(rename = "conversation.item.input_audio_transcription.failed")]
    TranscriptionFailed(TranscriptionFailedEvent),
    #[serde(other)]
    Other,
}

/// `transcription_session.update` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TranscriptionSessionUpdateEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    event_id: Option<String>,
    session: TranscriptionSession,
}

impl TranscriptionSessionUpdateEvent {
    pub fn new(session: TranscriptionSession) -> Self {
        Self {
            event_id: None,
            session,
        }
    }

    pub fn session(&self) -> &TranscriptionSession {
        &self.session
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TranscriptionSession {
    input_audio_format: String,
    input_audio_transcription: InputAudioTranscription,
    turn_detection: TurnDetection,
}

impl TranscriptionSession {
    /// PCM16 input transcribed with `model`, segmented by server-side VAD.
    pub fn new(model: &str, language: Option<&str>) -> Self {
        Self {
            input_audio_format: "pcm16".to_string(),
            input_audio_transcription: InputAudioTranscription {
                model: model.to_string(),
                language: language.map(str::to_string),
            },
            turn_detection: TurnDetection::default(),
        }
    }

    pub fn model(&self) -> &str {
        &self.input_audio_transcription.model
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InputAudioTranscription {
    model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold (0.0 to 1.0).
        threshold: f32,
        /// Audio kept before detected speech, in milliseconds.
        prefix_padding_ms: u32,
        /// Silence that ends an utterance, in milliseconds.
        silence_duration_ms: u32,
    },
}

impl Default for TurnDetection {
    // Answers are spoken in full sentences with pauses, so utterances end on a
    // longer silence than a conversational default.
    fn default() -> Self {
        Self::ServerVad {
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 700,
        }
    }
}

/// `input_audio_buffer.append` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InputAudioBufferAppendEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    event_id: Option<String>,
    /// Base64 encoded PCM16 audio.
    audio: String,
}

impl InputAudioBufferAppendEvent {
    pub fn new(audio: String) -> Self {
        Self {
            event_id: None,
            audio,
        }
    }

    pub fn audio(&self) -> &str {
        &self.audio
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorDetails {
    #[serde(rename = "type")]
    error_type: String,
    #[serde(default)]
    code: Option<String>,
    message: String,
}

impl ErrorDetails {
    pub fn error_type(&self) -> &str {
        &self.error_type
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// `error` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorEvent {
    #[serde(default)]
    event_id: Option<String>,
    error: ErrorDetails,
}

impl ErrorEvent {
    pub fn error(&self) -> &ErrorDetails {
        &self.error
    }
}

/// `conversation.item.input_audio_transcription.delta` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TranscriptionDeltaEvent {
    item_id: String,
    #[serde(default)]
    delta: String,
}

impl TranscriptionDeltaEvent {
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn delta(&self) -> &str {
        &self.delta
    }
}

/// `conversation.item.input_audio_transcription.completed` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TranscriptionCompletedEvent {
    item_id: String,
    transcript: String,
}

impl TranscriptionCompletedEvent {
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }
}

/// `conversation.item.input_audio_transcription.failed` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TranscriptionFailedEvent {
    item_id: String,
    error: ErrorDetails,
}

impl TranscriptionFailedEvent {
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn error(&self) -> &ErrorDetails {
        &self.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_update_wire_shape() {
        let event = ClientEvent::TranscriptionSessionUpdate(TranscriptionSessionUpdateEvent::new(
            TranscriptionSession::new("gpt-4o-transcribe", Some("en")),
        ));

        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], "transcription_session.update");
        assert_eq!(value["session"]["input_audio_format"], "pcm16");
        assert_eq!(
            value["session"]["input_audio_transcription"],
            json!({"model": "gpt-4o-transcribe", "language": "en"})
        );
        assert_eq!(value["session"]["turn_detection"]["type"], "server_vad");
        assert!(value.get("event_id").is_none());
    }

    #[test]
    fn test_parse_transcription_events() {
        let delta: ServerEvent = serde_json::from_value(json!({
            "type": "conversation.item.input_audio_transcription.delta",
            "event_id": "event_1",
            "item_id": "item_1",
            "content_index": 0,
            "delta": "I led"
        }))
        .unwrap();
        assert!(matches!(&delta, ServerEvent::TranscriptionDelta(d) if d.delta() == "I led"));

        let completed: ServerEvent = serde_json::from_value(json!({
            "type": "conversation.item.input_audio_transcription.completed",
            "event_id": "event_2",
            "item_id": "item_1",
            "content_index": 0,
            "transcript": "I led the team."
        }))
        .unwrap();
        assert!(matches!(
            &completed,
            ServerEvent::TranscriptionCompleted(c) if c.transcript() == "I led the team."
        ));
    }

    #[test]
    fn test_parse_error_and_unknown_events() {
        let error: ServerEvent = serde_json::from_value(json!({
            "type": "error",
            "event_id": "event_3",
            "error": {"type": "invalid_request_error", "code": "invalid_api_key", "message": "Incorrect API key"}
        }))
        .unwrap();
        match error {
            ServerEvent::Error(e) => {
                assert_eq!(e.error().message(), "Incorrect API key");
                assert_eq!(e.error().code(), Some("invalid_api_key"));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let unknown: ServerEvent = serde_json::from_value(json!({
            "type": "input_audio_buffer.speech_started",
            "event_id": "event_4",
            "audio_start_ms": 120,
            "item_id": "item_2"
        }))
        .unwrap();
        assert!(matches!(unknown, ServerEvent::Other));
    }
}
