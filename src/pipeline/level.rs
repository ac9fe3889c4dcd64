//! Level metering for S16 PCM buffers.

use serde::{Deserialize, Serialize};

use crate::error::SinkError;

/// One RMS measurement for one buffer that reached the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelReport {
    /// Zero-based index of the buffer within the stream
    pub buffer_index: u64,
    /// Samples in the buffer
    pub samples: usize,
    /// Root mean square of the normalized samples (0.0 to 1.0)
    pub rms: f64,
}

/// Root mean square of S16 samples normalized by `i16::MAX`.
///
/// Returns `None` for an empty buffer.
pub fn rms_s16(samples: &[i16]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let sum: f64 = samples
        .iter()
        .map(|sample| {
            let f = f64::from(*sample) / f64::from(i16::MAX);
            f * f
        })
        .sum();

    Some((sum / samples.len() as f64).sqrt())
}

/// Interpret a mapped native-endian byte buffer as S16 samples.
pub fn samples_from_bytes(bytes: &[u8]) -> Result<Vec<i16>, SinkError> {
    if bytes.len() % 2 != 0 {
        return Err(SinkError::Pipeline {
            src: "sink".to_string(),
            error: "Failed to interprete buffer as S16 PCM".to_string(),
            debug: Some(format!("odd buffer length {}", bytes.len())),
        });
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_ne_bytes([pair[0], pair[1]]))
        .collect())
}
