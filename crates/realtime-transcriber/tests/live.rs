//! Runs against the live OpenAI endpoint. Needs `OPENAI_API_KEY`.
//!
//! cargo test -p rehearsal-transcriber --test live -- --ignored

use rehearsal_native_utils::audio::encode_pcm16;
use rehearsal_transcriber::events::{ServerEvent, TranscriptionSession};
use rehearsal_transcriber::{Config, connect_with_config};
use std::time::Duration;

#[tokio::test]
#[ignore]
async fn test_live_session_accepts_configuration_and_audio() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::new();
    let (client, mut server_rx) = connect_with_config(64, &config).await?;

    client
        .update_session(TranscriptionSession::new(config.model(), Some("en")))
        .await?;
    // 100ms of silence at 24kHz.
    client.append_input_audio_buffer(encode_pcm16(&[0.0; 2400])).await?;

    if let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(3), server_rx.recv()).await {
        assert!(
            !matches!(event, ServerEvent::Error(_) | ServerEvent::Close { .. }),
            "unexpected event: {event:?}"
        );
    }
    Ok(())
}
