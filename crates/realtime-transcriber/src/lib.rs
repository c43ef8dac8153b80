mod client;
pub mod events;
pub mod microphone;
mod source;

pub use client::{Client, Config, ConfigBuilder, ServerRx, connect_with_config};
pub use source::{RealtimeSpeech, TranscriptAssembler};
