use crate::error::DialogueError;
use tokio::sync::mpsc;

/// Identifies one start/stop span of speech capture. Events from an earlier span
/// are dropped.
pub type CaptureId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptSegment {
    /// Preview of the utterance in progress; replaced by the next result.
    Interim(String),
    /// A finished utterance, appended to the captured text.
    Final(String),
    /// The source broke down and will emit nothing more for this capture.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEvent {
    pub capture: CaptureId,
    pub segment: TranscriptSegment,
}

impl TranscriptEvent {
    pub fn interim(capture: CaptureId, text: &str) -> Self {
        Self {
            capture,
            segment: TranscriptSegment::Interim(text.to_string()),
        }
    }

    pub fn finalized(capture: CaptureId, text: &str) -> Self {
        Self {
            capture,
            segment: TranscriptSegment::Final(text.to_string()),
        }
    }

    pub fn failed(capture: CaptureId, reason: &str) -> Self {
        Self {
            capture,
            segment: TranscriptSegment::Failed(reason.to_string()),
        }
    }
}

/// A platform speech-to-text capability.
///
/// `begin` starts emitting `TranscriptEvent`s tagged with `capture` into `sink`
/// until `end` is called. Implementations run their own tasks or threads; the
/// adapter only owns the start/stop pairing.
pub trait SpeechSource: Send {
    fn is_available(&self) -> bool;

    fn begin(
        &mut self,
        capture: CaptureId,
        sink: mpsc::UnboundedSender<TranscriptEvent>,
    ) -> anyhow::Result<()>;

    fn end(&mut self);
}

/// Stand-in used when the platform offers no speech capability.
#[derive(Debug, Default)]
pub struct UnavailableSpeech;

impl SpeechSource for UnavailableSpeech {
    fn is_available(&self) -> bool {
        false
    }

    fn begin(
        &mut self,
        _capture: CaptureId,
        _sink: mpsc::UnboundedSender<TranscriptEvent>,
    ) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("no speech-to-text capability is configured"))
    }

    fn end(&mut self) {}
}

/// Joins two pieces of transcript, inserting a single space only when neither
/// side already provides whitespace at the seam.
pub fn join_text(head: &str, tail: &str) -> String {
    if head.is_empty() {
        return tail.to_string();
    }
    if tail.is_empty() {
        return head.to_string();
    }
    let seam_has_space = head.ends_with(char::is_whitespace) || tail.starts_with(char::is_whitespace);
    if seam_has_space {
        format!("{head}{tail}")
    } else {
        format!("{head} {tail}")
    }
}

/// Owns a `SpeechSource` and turns its event stream into a growing text value.
///
/// Idle until `start`, capturing until `stop`.
pub struct TranscriptionAdapter {
    source: Box<dyn SpeechSource>,
    sink: mpsc::UnboundedSender<TranscriptEvent>,
    capture: CaptureId,
    capturing: bool,
    finalized: String,
    interim: String,
}

impl TranscriptionAdapter {
    /// Events produced by `source` are delivered through `sink`; whoever holds the
    /// receiving end passes them back into `apply`.
    pub fn new(source: Box<dyn SpeechSource>, sink: mpsc::UnboundedSender<TranscriptEvent>) -> Self {
        Self {
            source,
            sink,
            capture: 0,
            capturing: false,
            finalized: String::new(),
            interim: String::new(),
        }
    }

    /// An adapter with no speech capability behind it.
    pub fn unavailable() -> Self {
        let (sink, _) = mpsc::unbounded_channel();
        Self::new(Box::new(UnavailableSpeech), sink)
    }

    pub fn is_available(&self) -> bool {
        self.source.is_available()
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Clears the buffer and begins a new capture. No-op while capturing.
    pub fn start(&mut self) -> Result<(), DialogueError> {
        if self.capturing {
            return Ok(());
        }
        if !self.source.is_available() {
            return Err(DialogueError::CapabilityUnavailable(
                "no speech-to-text capability is available".to_string(),
            ));
        }
        self.finalized.clear();
        self.interim.clear();
        self.capture += 1;
        self.source
            .begin(self.capture, self.sink.clone())
            .map_err(|e| DialogueError::CapabilityUnavailable(format!("{e:#}")))?;
        self.capturing = true;
        tracing::debug!(capture = self.capture, "speech capture started");
        Ok(())
    }

    /// Ends the capture and hands back everything captured so far. The buffer is
    /// empty afterwards.
    ///
    /// While capturing, only finalized segments accumulate. On stop the trailing
    /// interim preview is kept as well: `SpeechSource::end` tears the stream
    /// down without waiting, so the finalization of the last utterance never
    /// arrives and the preview is all that is left of it.
    pub fn stop(&mut self) -> String {
        if self.capturing {
            self.source.end();
            self.capturing = false;
            tracing::debug!(capture = self.capture, "speech capture stopped");
        }
        let text = self.text();
        self.finalized.clear();
        self.interim.clear();
        text
    }

    /// Current captured text: finalized segments followed by the interim preview.
    pub fn text(&self) -> String {
        join_text(&self.finalized, &self.interim)
    }

    /// Applies an event from the source. Returns `Ok(true)` when the text changed.
    ///
    /// A `Failed` segment leaves the adapter idle with the text captured so far
    /// still buffered, and is reported as `CapabilityUnavailable`.
    pub fn apply(&mut self, event: TranscriptEvent) -> Result<bool, DialogueError> {
        if !self.capturing || event.capture != self.capture {
            tracing::debug!(
                capture = event.capture,
                current = self.capture,
                "dropping transcript event from an inactive capture"
            );
            return Ok(false);
        }
        match event.segment {
            TranscriptSegment::Interim(text) => {
                let text = text.trim();
                if text == self.interim {
                    return Ok(false);
                }
                self.interim = text.to_string();
                Ok(true)
            }
            TranscriptSegment::Final(text) => {
                let text = text.trim();
                let had_interim = !self.interim.is_empty();
                self.interim.clear();
                if text.is_empty() {
                    return Ok(had_interim);
                }
                self.finalized = join_text(&self.finalized, text);
                Ok(true)
            }
            TranscriptSegment::Failed(reason) => {
                tracing::warn!(capture = self.capture, "speech capture failed: {}", reason);
                self.source.end();
                self.capturing = false;
                Err(DialogueError::CapabilityUnavailable(reason))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records begin/end calls so tests can check the start/stop pairing.
    #[derive(Clone, Default)]
    pub(crate) struct FakeSpeech {
        pub(crate) calls: Arc<Mutex<Vec<String>>>,
    }

    impl SpeechSource for FakeSpeech {
        fn is_available(&self) -> bool {
            true
        }

        fn begin(
            &mut self,
            capture: CaptureId,
            _sink: mpsc::UnboundedSender<TranscriptEvent>,
        ) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(format!("begin {capture}"));
            Ok(())
        }

        fn end(&mut self) {
            self.calls.lock().unwrap().push("end".to_string());
        }
    }

    fn adapter() -> (TranscriptionAdapter, FakeSpeech) {
        let fake = FakeSpeech::default();
        let (sink, _rx) = mpsc::unbounded_channel();
        (TranscriptionAdapter::new(Box::new(fake.clone()), sink), fake)
    }

    #[test]
    fn test_join_text() {
        assert_eq!(join_text("", "team"), "team");
        assert_eq!(join_text("I led the", ""), "I led the");
        assert_eq!(join_text("I led the", " team"), "I led the team");
        assert_eq!(join_text("I led the", "team"), "I led the team");
        assert_eq!(join_text("I led the ", "team"), "I led the team");
    }

    #[test]
    fn test_interim_is_superseded_not_concatenated() {
        let (mut adapter, _) = adapter();
        adapter.start().unwrap();

        assert!(adapter.apply(TranscriptEvent::interim(1, "I")).unwrap());
        assert!(adapter.apply(TranscriptEvent::interim(1, "I led")).unwrap());
        assert_eq!(adapter.text(), "I led");

        assert!(adapter.apply(TranscriptEvent::finalized(1, "I led the")).unwrap());
        assert_eq!(adapter.text(), "I led the");

        adapter.apply(TranscriptEvent::interim(1, "team")).unwrap();
        assert_eq!(adapter.text(), "I led the team");
        adapter.apply(TranscriptEvent::finalized(1, "team of four")).unwrap();
        assert_eq!(adapter.text(), "I led the team of four");
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let (mut adapter, fake) = adapter();
        adapter.start().unwrap();
        adapter.start().unwrap();
        assert!(adapter.is_capturing());

        adapter.apply(TranscriptEvent::finalized(1, "hello")).unwrap();
        assert_eq!(adapter.stop(), "hello");
        assert_eq!(adapter.stop(), "");
        assert!(!adapter.is_capturing());

        assert_eq!(*fake.calls.lock().unwrap(), vec!["begin 1", "end"]);
    }

    #[test]
    fn test_events_from_previous_capture_are_dropped() {
        let (mut adapter, _) = adapter();
        adapter.start().unwrap();
        adapter.stop();
        adapter.start().unwrap();

        assert!(!adapter.apply(TranscriptEvent::finalized(1, "stale")).unwrap());
        assert!(adapter.apply(TranscriptEvent::finalized(2, "fresh")).unwrap());
        assert_eq!(adapter.text(), "fresh");
    }

    #[test]
    fn test_events_while_idle_are_dropped() {
        let (mut adapter, _) = adapter();
        assert!(!adapter.apply(TranscriptEvent::finalized(0, "ghost")).unwrap());
        assert_eq!(adapter.text(), "");
    }

    #[test]
    fn test_stop_keeps_unfinished_interim() {
        let (mut adapter, _) = adapter();
        adapter.start().unwrap();
        adapter.apply(TranscriptEvent::finalized(1, "I led the")).unwrap();
        adapter.apply(TranscriptEvent::interim(1, "tea")).unwrap();
        adapter.apply(TranscriptEvent::interim(1, "team")).unwrap();
        assert_eq!(adapter.stop(), "I led the team");
        assert_eq!(adapter.text(), "");
    }

    #[test]
    fn test_failure_goes_idle_and_keeps_text() {
        let (mut adapter, fake) = adapter();
        adapter.start().unwrap();
        adapter.apply(TranscriptEvent::finalized(1, "partial")).unwrap();

        let err = adapter
            .apply(TranscriptEvent::failed(1, "socket closed"))
            .unwrap_err();
        assert_eq!(err, DialogueError::CapabilityUnavailable("socket closed".to_string()));
        assert!(!adapter.is_capturing());
        assert_eq!(adapter.stop(), "partial");
        assert_eq!(*fake.calls.lock().unwrap(), vec!["begin 1", "end"]);
    }

    #[test]
    fn test_unavailable_adapter_refuses_to_start() {
        let mut adapter = TranscriptionAdapter::unavailable();
        assert!(!adapter.is_available());
        let err = adapter.start().unwrap_err();
        assert!(matches!(err, DialogueError::CapabilityUnavailable(_)));
        assert!(!adapter.is_capturing());
    }
}
