use crate::client::{Config, connect_with_config};
use crate::events::{ServerEvent, TranscriptionSession};
use crate::microphone::{INPUT_CHUNK_SIZE, Microphone};
use rehearsal_core::transcription::{CaptureId, SpeechSource, TranscriptEvent, TranscriptSegment};
use rehearsal_native_utils::audio::{ChunkedResampler, REALTIME_API_PCM16_SAMPLE_RATE, encode_pcm16};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const CHANNEL_CAPACITY: usize = 1024;

/// Folds transcription events into `TranscriptEvent`s for one capture.
///
/// Deltas are accumulated per item and surfaced together as the interim
/// preview; a completed item becomes a final segment.
pub struct TranscriptAssembler {
    capture: CaptureId,
    pending: Vec<(String, String)>,
}

impl TranscriptAssembler {
    pub fn new(capture: CaptureId) -> Self {
        Self {
            capture,
            pending: Vec::new(),
        }
    }

    /// Maps one server event to the transcript event it implies, if any.
    pub fn apply(&mut self, event: ServerEvent) -> Option<TranscriptEvent> {
        match event {
            ServerEvent::TranscriptionDelta(delta) => {
                match self.pending.iter_mut().find(|(id, _)| id == delta.item_id()) {
                    Some((_, text)) => text.push_str(delta.delta()),
                    None => self
                        .pending
                        .push((delta.item_id().to_string(), delta.delta().to_string())),
                }
                Some(TranscriptEvent::interim(self.capture, &self.interim()))
            }
            ServerEvent::TranscriptionCompleted(completed) => {
                self.pending.retain(|(id, _)| id != completed.item_id());
                Some(TranscriptEvent::finalized(
                    self.capture,
                    completed.transcript(),
                ))
            }
            ServerEvent::TranscriptionFailed(failed) => {
                tracing::warn!(
                    item = failed.item_id(),
                    "transcription of an utterance failed: {}",
                    failed.error().message()
                );
                self.pending.retain(|(id, _)| id != failed.item_id());
                Some(TranscriptEvent::interim(self.capture, &self.interim()))
            }
            ServerEvent::Error(error) => Some(TranscriptEvent::failed(
                self.capture,
                error.error().message(),
            )),
            ServerEvent::Close { reason } => {
                let reason = reason
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "transcription connection closed".to_string());
                Some(TranscriptEvent::failed(self.capture, &reason))
            }
            ServerEvent::Other => None,
        }
    }

    fn interim(&self) -> String {
        self.pending
            .iter()
            .map(|(_, text)| text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

struct ActiveCapture {
    microphone: Microphone,
    task: JoinHandle<()>,
}

/// Speech-to-text backed by the microphone and a realtime transcription session.
///
/// Every `begin` opens the microphone and a fresh connection; `end` tears both
/// down.
pub struct RealtimeSpeech {
    config: Arc<Config>,
    device: Option<String>,
    runtime: Handle,
    active: Option<ActiveCapture>,
}

impl RealtimeSpeech {
    /// Must be called from within a Tokio runtime.
    pub fn new(config: Config, device: Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            config: Arc::new(config),
            device,
            runtime: Handle::try_current()?,
            active: None,
        })
    }
}

impl SpeechSource for RealtimeSpeech {
    fn is_available(&self) -> bool {
        true
    }

    fn begin(
        &mut self,
        capture: CaptureId,
        sink: mpsc::UnboundedSender<TranscriptEvent>,
    ) -> anyhow::Result<()> {
        self.end();
        let (audio_tx, audio_rx) = mpsc::channel::<Vec<f32>>(CHANNEL_CAPACITY);
        let microphone = Microphone::start(self.device.as_deref(), audio_tx)?;
        let resampler = ChunkedResampler::new(
            microphone.sample_rate(),
            REALTIME_API_PCM16_SAMPLE_RATE,
            INPUT_CHUNK_SIZE,
        )?;
        let task = self.runtime.spawn(stream_capture(
            self.config.clone(),
            capture,
            audio_rx,
            resampler,
            sink,
        ));
        self.active = Some(ActiveCapture { microphone, task });
        Ok(())
    }

    fn end(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.task.abort();
            active.microphone.stop();
        }
    }
}

impl Drop for RealtimeSpeech {
    fn drop(&mut self) {
        self.end();
    }
}

async fn stream_capture(
    config: Arc<Config>,
    capture: CaptureId,
    mut audio_rx: mpsc::Receiver<Vec<f32>>,
    mut resampler: ChunkedResampler,
    sink: mpsc::UnboundedSender<TranscriptEvent>,
) {
    let fail = |reason: String| {
        let _ = sink.send(TranscriptEvent::failed(capture, &reason));
    };

    let (client, mut server_rx) = match connect_with_config(CHANNEL_CAPACITY, &config).await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::error!("Failed to connect to realtime transcription: {:#}", e);
            fail(format!("could not reach the transcription service: {e}"));
            return;
        }
    };
    let session = TranscriptionSession::new(config.model(), config.language());
    if let Err(e) = client.update_session(session).await {
        fail(format!("could not configure transcription: {e}"));
        return;
    }

    let mut assembler = TranscriptAssembler::new(capture);
    loop {
        tokio::select! {
            audio = audio_rx.recv() => {
                let Some(audio) = audio else {
                    fail("microphone stream ended".to_string());
                    return;
                };
                let resampled = resampler.push(&audio);
                if resampled.is_empty() {
                    continue;
                }
                if let Err(e) = client.append_input_audio_buffer(encode_pcm16(&resampled)).await {
                    fail(format!("could not stream audio: {e}"));
                    return;
                }
            }
            event = server_rx.recv() => {
                let Some(event) = event else {
                    fail("transcription connection closed".to_string());
                    return;
                };
                let Some(transcript) = assembler.apply(event) else {
                    continue;
                };
                let failed = matches!(transcript.segment, TranscriptSegment::Failed(_));
                if sink.send(transcript).is_err() || failed {
                    return;
                }
            }
        }
    }
}
