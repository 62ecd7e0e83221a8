//! Chunk codec
//!
//! Stateless conversions between float sample buffers, 16-bit PCM,
//! little-endian bytes and the base64 text carried on the wire.

use base64::Engine;

/// Errors raised while decoding wire audio
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),
    #[error("odd PCM byte count: {0}")]
    OddByteCount(usize),
}

/// Convert float samples in [-1, 1] to signed 16-bit PCM, clamping out-of-range input
pub fn float_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| {
            let s = if s.is_nan() { 0.0 } else { s.clamp(-1.0, 1.0) };
            if s < 0.0 {
                (s * 32768.0) as i16
            } else {
                (s * 32767.0) as i16
            }
        })
        .collect()
}

pub fn pcm16_to_float(samples: &[i16]) -> Vec<f32> {
    samples
        .iter()
        .map(|&s| {
            if s < 0 {
                s as f32 / 32768.0
            } else {
                s as f32 / 32767.0
            }
        })
        .collect()
}

pub fn pcm16_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

pub fn bytes_to_pcm16(bytes: &[u8]) -> Result<Vec<i16>, CodecError> {
    if bytes.len() % 2 != 0 {
        return Err(CodecError::OddByteCount(bytes.len()));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn decode_base64(text: &str) -> Result<Vec<u8>, CodecError> {
    base64::engine::general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|e| CodecError::InvalidBase64(e.to_string()))
}

/// Encode 16-bit samples as wire text
pub fn encode_pcm16(samples: &[i16]) -> String {
    encode_base64(&pcm16_to_bytes(samples))
}

/// Decode wire text back to 16-bit samples
pub fn decode_pcm16(text: &str) -> Result<Vec<i16>, CodecError> {
    bytes_to_pcm16(&decode_base64(text)?)
}

/// Float samples straight to wire text
pub fn encode_chunk(samples: &[f32]) -> String {
    encode_pcm16(&float_to_pcm16(samples))
}

/// Wire text straight to float samples
pub fn decode_chunk(text: &str) -> Result<Vec<f32>, CodecError> {
    Ok(pcm16_to_float(&decode_pcm16(text)?))
}
