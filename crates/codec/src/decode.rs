//! Decoding and normalization to the canonical stream format.

use std::path::Path;

use voiceclean_audio_model::AudioStream;
use voiceclean_common::error::{VoicecleanError, VoicecleanResult};
use voiceclean_processing_core::resample::{downmix_to_mono, resample};

use crate::ffmpeg::{command_exists, normalize_args, run_tool};
use crate::wav::{read_wav, write_wav, WavEncoding};

/// Something that can turn an input file into a canonical WAV.
pub trait DecodeBackend: Send + Sync {
    /// Backend name for logs and reports.
    fn name(&self) -> &str;

    /// Whether the backend can run on this system.
    fn is_available(&self) -> bool;

    /// Whether this backend should handle `input`.
    fn accepts(&self, input: &Path) -> bool;

    /// Decode `input`, write mono PCM at `sample_rate` to `output`, and return it.
    fn normalize(&self, input: &Path, output: &Path, sample_rate: u32) -> VoicecleanResult<AudioStream>;
}

/// Reads WAV inputs directly, downmixing and resampling in-process.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeWavDecoder;

impl DecodeBackend for NativeWavDecoder {
    fn name(&self) -> &str {
        "native-wav"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn accepts(&self, input: &Path) -> bool {
        input
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("wav"))
            .unwrap_or(false)
    }

    fn normalize(&self, input: &Path, output: &Path, sample_rate: u32) -> VoicecleanResult<AudioStream> {
        let source = read_wav(input)?;
        let mono = downmix_to_mono(&source).map_err(|e| VoicecleanError::decode(input, e.to_string()))?;
        let stream = resample(&mono, sample_rate).map_err(|e| VoicecleanError::decode(input, e.to_string()))?;
        write_wav(&stream, output, WavEncoding::Pcm16)?;
        // Read back so the in-memory stream matches the normalized file exactly.
        read_wav(output)
    }
}

/// Transcodes arbitrary containers with `ffmpeg`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegDecoder;

impl DecodeBackend for FfmpegDecoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_available(&self) -> bool {
        command_exists("ffmpeg")
    }

    fn accepts(&self, _input: &Path) -> bool {
        true
    }

    fn normalize(&self, input: &Path, output: &Path, sample_rate: u32) -> VoicecleanResult<AudioStream> {
        if !self.is_available() {
            return Err(VoicecleanError::decode(
                input,
                "ffmpeg was not found in PATH; it is required for non-WAV inputs",
            ));
        }
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let args = normalize_args(input, output, sample_rate, 1);
        run_tool("ffmpeg", &args).map_err(|e| VoicecleanError::decode(input, format!("{e:#}")))?;
        read_wav(output)
    }
}

/// Decode `input` into a 48 kHz-style canonical mono stream, writing the
/// normalized WAV to `output`. The source file is never modified.
///
/// WAV inputs that `hound` can parse take the native path; everything else
/// (and WAV variants `hound` rejects) goes through ffmpeg.
pub fn normalize(input: &Path, output: &Path, sample_rate: u32) -> VoicecleanResult<AudioStream> {
    if !input.exists() {
        return Err(VoicecleanError::FileNotFound {
            path: input.to_path_buf(),
        });
    }

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        sample_rate,
        "Normalizing input"
    );

    let native = NativeWavDecoder;
    if native.accepts(input) {
        match native.normalize(input, output, sample_rate) {
            Ok(stream) => return Ok(stream),
            Err(VoicecleanError::Decode { message, .. }) => {
                tracing::debug!(%message, "Native WAV decode failed, falling back to ffmpeg");
            }
            Err(other) => return Err(other),
        }
    }

    let ffmpeg = FfmpegDecoder;
    let stream = ffmpeg.normalize(input, output, sample_rate)?;
    tracing::info!(
        backend = ffmpeg.name(),
        duration_ms = stream.duration_ms(),
        "Input normalized"
    );
    Ok(stream)
}
