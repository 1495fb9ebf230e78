//! Final output encoding.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use voiceclean_audio_model::AudioStream;
use voiceclean_common::config::TARGET_SAMPLE_RATE;
use voiceclean_common::error::{VoicecleanError, VoicecleanResult};
use voiceclean_processing_core::resample::resample;

use crate::wav::{write_wav, WavEncoding};

/// What an encode produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeSummary {
    pub path: PathBuf,
    pub bytes: u64,
    pub duration_ms: u64,
}

/// Writes streams as 16-bit PCM WAV at a fixed rate.
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    sample_rate: u32,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(TARGET_SAMPLE_RATE)
    }
}

impl Encoder {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Encode `stream` to `path`. Zero-length streams produce a valid,
    /// header-only WAV.
    pub fn encode(&self, stream: &AudioStream, path: &Path) -> VoicecleanResult<EncodeSummary> {
        let converted;
        let stream = if stream.sample_rate() == self.sample_rate {
            stream
        } else {
            tracing::debug!(
                from = stream.sample_rate(),
                to = self.sample_rate,
                "Resampling before encode"
            );
            converted = resample(stream, self.sample_rate)
                .map_err(|e| VoicecleanError::encode(path, e.to_string()))?;
            &converted
        };

        let bytes = write_wav(stream, path, WavEncoding::Pcm16)?;
        let summary = EncodeSummary {
            path: path.to_path_buf(),
            bytes,
            duration_ms: stream.duration_ms(),
        };
        tracing::info!(
            path = %summary.path.display(),
            bytes = summary.bytes,
            duration_ms = summary.duration_ms,
            "Encoded output"
        );
        Ok(summary)
    }
}
