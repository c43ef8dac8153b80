use anyhow::Context;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FrameCount, StreamConfig};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;

/// Frames per callback requested from the input device.
pub const INPUT_CHUNK_SIZE: usize = 1024;

/// A running microphone stream delivering mono `f32` audio.
///
/// `cpal::Stream` cannot leave the thread that built it, so the stream lives on
/// a dedicated thread until the `Microphone` is stopped or dropped.
pub struct Microphone {
    sample_rate: f64,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Microphone {
    /// Opens `device_name` (or the default input) and starts streaming into
    /// `audio_tx`. Returns once the stream is playing or has failed to start.
    pub fn start(device_name: Option<&str>, audio_tx: mpsc::Sender<Vec<f32>>) -> anyhow::Result<Self> {
        let device_name = device_name.map(str::to_string);
        let (ready_tx, ready_rx) = std_mpsc::channel::<anyhow::Result<f64>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("microphone".to_string())
            .spawn(move || {
                let stream = match open_stream(device_name.as_deref(), audio_tx) {
                    Ok((stream, sample_rate)) => {
                        let _ = ready_tx.send(Ok(sample_rate));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Blocks until stop is requested or the handle is dropped.
                let _ = stop_rx.recv();
                drop(stream);
                tracing::debug!("microphone stream closed");
            })
            .context("Failed to spawn microphone thread")?;

        let sample_rate = ready_rx
            .recv()
            .context("Microphone thread exited before starting")??;

        Ok(Self {
            sample_rate,
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("microphone thread panicked");
            }
        }
    }
}

impl Drop for Microphone {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_stream(
    device_name: Option<&str>,
    audio_tx: mpsc::Sender<Vec<f32>>,
) -> anyhow::Result<(cpal::Stream, f64)> {
    let input = rehearsal_native_utils::device::get_or_default_input(device_name)
        .context("Failed to get audio input device")?;
    tracing::info!("Using input device: {:?}", input.name()?);

    let default_config = input
        .default_input_config()
        .context("Failed to get default input config")?;
    let input_config = StreamConfig {
        channels: default_config.channels(),
        sample_rate: default_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(FrameCount::from(INPUT_CHUNK_SIZE as u32)),
    };
    let channel_count = input_config.channels as usize;
    tracing::debug!("Input stream config: {:?}", &input_config);

    let input_data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
        let audio = rehearsal_native_utils::audio::downmix(data, channel_count);
        if let Err(e) = audio_tx.try_send(audio) {
            tracing::warn!("Dropping microphone audio: {}", e);
        }
    };

    let stream = input.build_input_stream(
        &input_config,
        input_data_fn,
        move |err| tracing::error!("An error occurred on input stream: {}", err),
        None,
    )?;
    stream.play()?;
    Ok((stream, input_config.sample_rate.0 as f64))
}
