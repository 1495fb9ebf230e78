//! WAV reading and writing via `hound`.

use std::io::Read;
use std::path::{Path, PathBuf};

use voiceclean_audio_model::AudioStream;
use voiceclean_common::error::{VoicecleanError, VoicecleanResult};

/// On-disk sample encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavEncoding {
    /// 16-bit signed integer PCM. Canonical output format.
    Pcm16,
    /// 32-bit float. Used for intermediate segment files to avoid requantizing.
    Float32,
}

/// Read a WAV file into a stream. Any failure is a decode error.
pub fn read_wav(path: &Path) -> VoicecleanResult<AudioStream> {
    let file = std::fs::File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            VoicecleanError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            VoicecleanError::decode(path, format!("Failed to open WAV file: {e}"))
        }
    })?;
    read_wav_from(std::io::BufReader::new(file), path)
}

/// Read WAV data from any reader. `label` names the source in errors.
pub fn read_wav_from<R: Read>(reader: R, label: &Path) -> VoicecleanResult<AudioStream> {
    let mut wav_reader = hound::WavReader::new(reader)
        .map_err(|e| VoicecleanError::decode(label, format!("Failed to parse WAV file: {e}")))?;

    let spec = wav_reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => wav_reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                VoicecleanError::decode(label, format!("Failed to read WAV samples: {e}"))
            })?,
        hound::SampleFormat::Int => {
            let scale = int_full_scale(spec.bits_per_sample);
            wav_reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| {
                    VoicecleanError::decode(label, format!("Failed to read WAV samples: {e}"))
                })?
        }
    };

    AudioStream::new(spec.sample_rate, spec.channels, samples)
        .map_err(|e| VoicecleanError::decode(label, e.to_string()))
}

/// Write a stream as WAV, returning the number of bytes written.
///
/// Data goes to a sibling `.partial` file that is renamed over `path` once
/// the header is finalized.
pub fn write_wav(stream: &AudioStream, path: &Path, encoding: WavEncoding) -> VoicecleanResult<u64> {
    let encode_err = |msg: String| VoicecleanError::encode(path, msg);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| encode_err(format!("Failed to create {}: {e}", parent.display())))?;
    }

    let (bits_per_sample, sample_format) = match encoding {
        WavEncoding::Pcm16 => (16, hound::SampleFormat::Int),
        WavEncoding::Float32 => (32, hound::SampleFormat::Float),
    };
    let spec = hound::WavSpec {
        channels: stream.channel_count(),
        sample_rate: stream.sample_rate(),
        bits_per_sample,
        sample_format,
    };

    let partial = partial_path(path);
    let result = write_samples(stream, &partial, spec, encoding)
        .map_err(|e| encode_err(format!("Failed to write WAV data: {e}")))
        .and_then(|()| {
            std::fs::rename(&partial, path)
                .map_err(|e| encode_err(format!("Failed to move WAV into place: {e}")))
        });
    if let Err(err) = result {
        let _ = std::fs::remove_file(&partial);
        return Err(err);
    }

    let bytes = std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| encode_err(format!("Failed to stat written WAV: {e}")))?;
    tracing::debug!(
        path = %path.display(),
        bytes,
        duration_ms = stream.duration_ms(),
        "Wrote WAV"
    );
    Ok(bytes)
}

fn write_samples(
    stream: &AudioStream,
    path: &Path,
    spec: hound::WavSpec,
    encoding: WavEncoding,
) -> Result<(), hound::Error> {
    let mut writer = hound::WavWriter::create(path, spec)?;
    match encoding {
        WavEncoding::Pcm16 => {
            for s in stream.samples() {
                writer.write_sample(f32_to_i16(*s))?;
            }
        }
        WavEncoding::Float32 => {
            for s in stream.samples() {
                writer.write_sample(*s)?;
            }
        }
    }
    writer.finalize()
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

fn int_full_scale(bits: u16) -> f32 {
    (1u64 << (bits.clamp(1, 32) - 1)) as f32
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}
