use crate::events::{
    ClientEvent, InputAudioBufferAppendEvent, ServerEvent, TranscriptionSession,
    TranscriptionSessionUpdateEvent,
};
use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

mod config;
mod consts;
mod utils;

pub use config::{Config, ConfigBuilder};

pub type ClientTx = mpsc::Sender<ClientEvent>;
pub type ServerRx = mpsc::Receiver<ServerEvent>;

/// Sending half of a realtime transcription connection.
///
/// A writer task serializes `ClientEvent`s onto the socket and a reader task
/// decodes server messages into the `ServerRx` returned by `connect_with_config`.
/// The reader always finishes with `ServerEvent::Close`, even on a read error.
pub struct Client {
    c_tx: ClientTx,
}

impl Client {
    async fn send_client_event(&self, event: ClientEvent) -> Result<()> {
        self.c_tx
            .send(event)
            .await
            .map_err(|_| anyhow::anyhow!("connection is closed"))
    }

    pub async fn update_session(&self, session: TranscriptionSession) -> Result<()> {
        let event =
            ClientEvent::TranscriptionSessionUpdate(TranscriptionSessionUpdateEvent::new(session));
        self.send_client_event(event).await
    }

    /// Appends base64 encoded PCM16 audio to the input buffer.
    pub async fn append_input_audio_buffer(&self, audio: String) -> Result<()> {
        let event = ClientEvent::InputAudioBufferAppend(InputAudioBufferAppendEvent::new(audio));
        self.send_client_event(event).await
    }
}

/// Opens the WebSocket described by `config`.
pub async fn connect_with_config(capacity: usize, config: &Config) -> Result<(Client, ServerRx)> {
    let request = utils::build_request(config)?;
    let (ws_stream, _) = tokio_tungstenite::connect_async(request).await?;
    tracing::info!("Connected to realtime transcription endpoint");

    let (mut write, mut read) = ws_stream.split();
    let (c_tx, mut c_rx) = mpsc::channel::<ClientEvent>(capacity);
    let (s_tx, s_rx) = mpsc::channel::<ServerEvent>(capacity);

    tokio::spawn(async move {
        while let Some(event) = c_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        tracing::error!("failed to send message: {}", e);
                        break;
                    }
                }
                Err(e) => tracing::error!("failed to serialize event: {}", e),
            }
        }
        // Client dropped: close the socket politely.
        if let Err(e) = write.close().await {
            tracing::debug!("failed to close socket: {}", e);
        }
    });

    tokio::spawn(async move {
        let mut close_reason = None;
        while let Some(message) = read.next().await {
            let message = match message {
                Ok(message) => message,
                Err(e) => {
                    tracing::error!("failed to read message: {}", e);
                    close_reason = Some(e.to_string());
                    break;
                }
            };
            match message {
                Message::Text(text) => match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(ServerEvent::Other) => {
                        let json = serde_json::from_str::<serde_json::Value>(&text);
                        let event_type = json
                            .as_ref()
                            .ok()
                            .and_then(|v| v.get("type"))
                            .and_then(|v| v.as_str())
                            .unwrap_or("unknown");
                        tracing::trace!("ignoring server event: {}", event_type);
                    }
                    Ok(event) => {
                        if s_tx.send(event).await.is_err() {
                            tracing::debug!("server event receiver dropped");
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to deserialize event: {}, text=> {:?}", e, text);
                    }
                },
                Message::Binary(bin) => {
                    tracing::warn!("unexpected binary message: {} bytes", bin.len());
                }
                Message::Close(frame) => {
                    tracing::info!("connection closed: {:?}", frame);
                    close_reason = frame.map(|f| f.reason.to_string());
                    break;
                }
                _ => {}
            }
        }
        let _ = s_tx
            .send(ServerEvent::Close {
                reason: close_reason,
            })
            .await;
    });

    Ok((Client { c_tx }, s_rx))
}
