use base64::Engine;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use std::collections::VecDeque;

/// Sample rate the realtime transcription endpoint expects for `pcm16` input.
pub const REALTIME_API_PCM16_SAMPLE_RATE: f64 = 24000.0;

/// Creates a mono resampler converting `in_sampling_rate` to `out_sampling_rate`,
/// consuming `chunk_size` frames per call.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

/// Averages interleaved frames down to a single channel.
pub fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Encodes samples in [-1.0, 1.0] as little-endian PCM16, base64 encoded.
pub fn encode_pcm16(samples: &[f32]) -> String {
    base64::engine::general_purpose::STANDARD.encode(samples.to_binary())
}

/// Converts audio samples to their little-endian PCM16 byte layout.
pub trait ToBinary {
    fn to_binary(&self) -> Vec<u8>;
}

impl ToBinary for [f32] {
    fn to_binary(&self) -> Vec<u8> {
        self.iter()
            .flat_map(|&sample| {
                let v = (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                v.to_le_bytes()
            })
            .collect()
    }
}

/// Buffers microphone audio and resamples it in the fixed-size chunks the
/// resampler requires.
pub struct ChunkedResampler {
    resampler: FastFixedIn<f32>,
    chunk_size: usize,
    buffer: VecDeque<f32>,
}

impl ChunkedResampler {
    pub fn new(in_sampling_rate: f64, out_sampling_rate: f64, chunk_size: usize) -> anyhow::Result<Self> {
        Ok(Self {
            resampler: create_resampler(in_sampling_rate, out_sampling_rate, chunk_size)?,
            chunk_size,
            buffer: VecDeque::with_capacity(chunk_size * 2),
        })
    }

    /// Adds mono samples and returns whatever full chunks could be resampled.
    /// A remainder shorter than one chunk stays buffered for the next call.
    pub fn push(&mut self, samples: &[f32]) -> Vec<f32> {
        self.buffer.extend(samples);
        let mut resampled = Vec::new();
        while self.buffer.len() >= self.chunk_size {
            let chunk: Vec<f32> = self.buffer.drain(..self.chunk_size).collect();
            match self.resampler.process(&[chunk.as_slice()], None) {
                Ok(out) => {
                    if let Some(channel) = out.first() {
                        resampled.extend_from_slice(channel);
                    }
                }
                Err(e) => tracing::warn!("Failed to resample audio chunk: {}", e),
            }
        }
        resampled
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.resampler.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_averages_frames() {
        let stereo = [0.5, -0.5, 1.0, 0.0];
        assert_eq!(downmix(&stereo, 2), vec![0.0, 0.5]);
        assert_eq!(downmix(&stereo, 1), stereo.to_vec());
    }

    #[test]
    fn test_encode_pcm16_little_endian_and_clamped() {
        let encoded = encode_pcm16(&[0.0, 0.5, 2.0, -2.0]);
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        let values: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(values, vec![0, 16384, i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_chunked_resampler_holds_partial_chunk() {
        let mut resampler = ChunkedResampler::new(48000.0, 24000.0, 480).unwrap();

        assert!(resampler.push(&[0.0; 300]).is_empty());
        assert_eq!(resampler.buffered(), 300);

        let out = resampler.push(&[0.0; 300]);
        assert!(!out.is_empty());
        assert_eq!(resampler.buffered(), 120);

        resampler.reset();
        assert_eq!(resampler.buffered(), 0);
    }
}
