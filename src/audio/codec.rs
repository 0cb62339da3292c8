//! PCM codec utilities
//!
//! Pure, stateless conversions between raw linear PCM samples and the
//! base64 transport representation used on the agent channel. Samples are
//! signed 16-bit little-endian throughout.

use base64::Engine;

use crate::error::{Result, SessionError};

/// Pack i16 samples into little-endian PCM bytes.
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Unpack little-endian PCM bytes into i16 samples.
///
/// A trailing odd byte is dropped; transport frames are always built from
/// whole samples.
pub fn bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect()
}

/// Encode i16 samples as base64 PCM for the transport.
pub fn encode_pcm(samples: &[i16]) -> String {
    base64::engine::general_purpose::STANDARD.encode(samples_to_bytes(samples))
}

/// Decode base64 transport PCM back into i16 samples.
pub fn decode_pcm(data: &str) -> Result<Vec<i16>> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| SessionError::Audio(format!("invalid base64 PCM: {e}")))?;
    Ok(bytes_to_samples(&bytes))
}

/// Convert f32 samples in [-1.0, 1.0] to i16.
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s * 32768.0).clamp(-32768.0, 32767.0) as i16)
        .collect()
}

/// Convert i16 samples to f32 in [-1.0, 1.0].
pub fn i16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| f32::from(s) / 32768.0).collect()
}

/// Duration in seconds of a mono sample block at the given rate.
pub fn duration_secs(sample_count: usize, sample_rate: u32) -> f64 {
    sample_count as f64 / f64::from(sample_rate)
}

/// Resample a mono i16 block by linear interpolation.
///
/// Used to bring 16 kHz capture frames up to the 24 kHz recording rate
/// before mixing; rates are not required to be integer multiples.
pub fn resample_linear(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = f64::from(from_rate) / f64::from(to_rate);
    let out_len = (samples.len() as f64 / ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let idx = pos as usize;
        let frac = pos - idx as f64;

        let a = f64::from(samples[idx.min(samples.len() - 1)]);
        let b = f64::from(samples[(idx + 1).min(samples.len() - 1)]);
        let interpolated = a + (b - a) * frac;

        out.push(interpolated.round().clamp(-32768.0, 32767.0) as i16);
    }

    out
}
