//! In-memory PCM audio streams.

use std::ops::Range;

use voiceclean_common::error::VoicecleanError;

/// Errors raised when building or combining streams.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamError {
    #[error("Invalid stream format: {message}")]
    InvalidFormat { message: String },

    #[error(
        "Stream format mismatch: expected {expected_rate} Hz x{expected_channels}, got {actual_rate} Hz x{actual_channels}"
    )]
    FormatMismatch {
        expected_rate: u32,
        expected_channels: u16,
        actual_rate: u32,
        actual_channels: u16,
    },
}

impl From<StreamError> for VoicecleanError {
    fn from(err: StreamError) -> Self {
        VoicecleanError::processing(err.to_string())
    }
}

/// Sample representation held in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// 32-bit float, nominal range [-1.0, 1.0].
    F32,
}

/// An ordered sequence of interleaved PCM samples.
///
/// Rate and channel count never change for a given stream; operations that
/// would change them return a new stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioStream {
    sample_rate: u32,
    channels: u16,
    samples: Vec<f32>,
}

impl AudioStream {
    /// Build a stream from interleaved samples.
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Result<Self, StreamError> {
        if sample_rate == 0 {
            return Err(StreamError::InvalidFormat {
                message: "sample rate must be greater than 0".to_string(),
            });
        }
        if channels == 0 {
            return Err(StreamError::InvalidFormat {
                message: "channel count must be greater than 0".to_string(),
            });
        }
        if samples.len() % channels as usize != 0 {
            return Err(StreamError::InvalidFormat {
                message: format!(
                    "{} samples do not divide into {} channels",
                    samples.len(),
                    channels
                ),
            });
        }
        Ok(Self {
            sample_rate,
            channels,
            samples,
        })
    }

    /// Single-channel stream.
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Result<Self, StreamError> {
        Self::new(sample_rate, 1, samples)
    }

    /// Zero-length stream with the given format.
    pub fn empty(sample_rate: u32, channels: u16) -> Result<Self, StreamError> {
        Self::new(sample_rate, channels, Vec::new())
    }

    /// Digital silence of the given duration.
    pub fn silence(sample_rate: u32, channels: u16, duration_ms: u64) -> Result<Self, StreamError> {
        let frames = ms_to_frame(duration_ms, sample_rate);
        Self::new(sample_rate, channels, vec![0.0; frames * channels as usize])
    }

    /// Build from one sample vector per channel. All channels must be the same length.
    pub fn from_channels(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, StreamError> {
        let count = channels.len();
        if count == 0 || count > u16::MAX as usize {
            return Err(StreamError::InvalidFormat {
                message: format!("unsupported channel count {count}"),
            });
        }
        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(StreamError::InvalidFormat {
                message: "channels have different lengths".to_string(),
            });
        }
        let mut samples = Vec::with_capacity(frames * count);
        for frame in 0..frames {
            for channel in &channels {
                samples.push(channel[frame]);
            }
        }
        Self::new(sample_rate, count as u16, samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> u16 {
        self.channels
    }

    pub fn sample_format(&self) -> SampleFormat {
        SampleFormat::F32
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Number of frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in milliseconds, rounded up so a trailing partial millisecond counts.
    pub fn duration_ms(&self) -> u64 {
        let frames = self.frames() as u64;
        let rate = self.sample_rate as u64;
        (frames * 1000).div_ceil(rate)
    }

    /// Frame index at which millisecond `ms` starts (not clamped).
    pub fn ms_to_frame(&self, ms: u64) -> usize {
        ms_to_frame(ms, self.sample_rate)
    }

    /// Frame range covering `[start_ms, end_ms)`, clamped to the stream.
    pub fn frame_range_ms(&self, start_ms: u64, end_ms: u64) -> Range<usize> {
        let frames = self.frames();
        let start = self.ms_to_frame(start_ms).min(frames);
        let end = self.ms_to_frame(end_ms).min(frames).max(start);
        start..end
    }

    /// Copy a frame range into a new stream with the same format.
    pub fn slice_frames(&self, range: Range<usize>) -> AudioStream {
        let ch = self.channels as usize;
        let end = range.end.min(self.frames());
        let start = range.start.min(end);
        AudioStream {
            sample_rate: self.sample_rate,
            channels: self.channels,
            samples: self.samples[start * ch..end * ch].to_vec(),
        }
    }

    /// Copy `[start_ms, end_ms)` into a new stream with the same format.
    pub fn slice_ms(&self, start_ms: u64, end_ms: u64) -> AudioStream {
        self.slice_frames(self.frame_range_ms(start_ms, end_ms))
    }

    /// Samples of one channel, de-interleaved.
    pub fn channel(&self, index: u16) -> Vec<f32> {
        self.samples
            .iter()
            .skip(index as usize)
            .step_by(self.channels as usize)
            .copied()
            .collect()
    }

    /// Whether `other` has the same rate and channel count.
    pub fn same_format(&self, other: &AudioStream) -> bool {
        self.sample_rate == other.sample_rate && self.channels == other.channels
    }

    /// Apply `f` to every sample, keeping the format.
    pub fn map_samples(self, f: impl Fn(f32) -> f32) -> AudioStream {
        AudioStream {
            sample_rate: self.sample_rate,
            channels: self.channels,
            samples: self.samples.into_iter().map(f).collect(),
        }
    }

    /// Concatenate streams in order. The first stream fixes the format.
    pub fn concat<I>(sample_rate: u32, channels: u16, parts: I) -> Result<AudioStream, StreamError>
    where
        I: IntoIterator<Item = AudioStream>,
    {
        let mut out = AudioStream::empty(sample_rate, channels)?;
        for part in parts {
            if !out.same_format(&part) {
                return Err(StreamError::FormatMismatch {
                    expected_rate: out.sample_rate,
                    expected_channels: out.channels,
                    actual_rate: part.sample_rate,
                    actual_channels: part.channels,
                });
            }
            out.samples.extend(part.samples);
        }
        Ok(out)
    }

    /// Peak absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}

/// Frame index at which millisecond `ms` starts for the given rate.
pub fn ms_to_frame(ms: u64, sample_rate: u32) -> usize {
    (ms as u128 * sample_rate as u128 / 1000) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_format() {
        assert!(AudioStream::new(0, 1, vec![]).is_err());
        assert!(AudioStream::new(48_000, 0, vec![]).is_err());
        assert!(AudioStream::new(48_000, 2, vec![0.0; 3]).is_err());
        assert!(AudioStream::new(48_000, 2, vec![0.0; 4]).is_ok());
    }

    #[test]
    fn test_duration_rounds_partial_millisecond_up() {
        let s = AudioStream::mono(48_000, vec![0.0; 48_000]).unwrap();
        assert_eq!(s.duration_ms(), 1000);

        let s = AudioStream::mono(48_000, vec![0.0; 48_001]).unwrap();
        assert_eq!(s.duration_ms(), 1001);

        let s = AudioStream::mono(44_100, vec![0.0; 441]).unwrap();
        assert_eq!(s.duration_ms(), 10);

        assert_eq!(AudioStream::empty(48_000, 1).unwrap().duration_ms(), 0);
    }

    #[test]
    fn test_slice_ms_is_clamped() {
        let s = AudioStream::mono(1000, (0..100).map(|i| i as f32).collect()).unwrap();
        let slice = s.slice_ms(10, 20);
        assert_eq!(slice.frames(), 10);
        assert_eq!(slice.samples()[0], 10.0);

        let tail = s.slice_ms(90, 500);
        assert_eq!(tail.frames(), 10);

        let none = s.slice_ms(200, 300);
        assert!(none.is_empty());
        assert_eq!(none.sample_rate(), 1000);
    }

    #[test]
    fn test_stereo_channels_roundtrip() {
        let s = AudioStream::from_channels(8000, vec![vec![1.0, 2.0], vec![-1.0, -2.0]]).unwrap();
        assert_eq!(s.samples(), &[1.0, -1.0, 2.0, -2.0]);
        assert_eq!(s.frames(), 2);
        assert_eq!(s.channel(1), vec![-1.0, -2.0]);
    }

    #[test]
    fn test_concat_checks_format() {
        let a = AudioStream::mono(16_000, vec![0.1; 10]).unwrap();
        let b = AudioStream::mono(16_000, vec![0.2; 5]).unwrap();
        let joined = AudioStream::concat(16_000, 1, vec![a.clone(), b]).unwrap();
        assert_eq!(joined.frames(), 15);

        let other = AudioStream::mono(48_000, vec![0.2; 5]).unwrap();
        let err = AudioStream::concat(16_000, 1, vec![a, other]).unwrap_err();
        assert!(matches!(err, StreamError::FormatMismatch { .. }));
    }

    #[test]
    fn test_silence_length() {
        let s = AudioStream::silence(48_000, 1, 250).unwrap();
        assert_eq!(s.frames(), 12_000);
        assert_eq!(s.peak(), 0.0);
    }
}
