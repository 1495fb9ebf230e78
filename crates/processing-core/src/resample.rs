//! Linear-interpolation sample rate conversion.

use voiceclean_audio_model::{AudioStream, StreamError};

/// Frames produced when converting `frames` from `from_rate` to `to_rate`.
pub fn resampled_len(frames: usize, from_rate: u32, to_rate: u32) -> usize {
    if from_rate == to_rate {
        return frames;
    }
    let num = frames as u128 * to_rate as u128;
    num.div_ceil(from_rate as u128) as usize
}

/// Resample one channel to exactly `out_len` samples.
///
/// Output sample `i` reads the input at position `i * from_rate / to_rate`,
/// interpolating between neighbours and holding the last sample past the end.
pub fn resample_channel(samples: &[f32], from_rate: u32, to_rate: u32, out_len: usize) -> Vec<f32> {
    if samples.is_empty() {
        return vec![0.0; out_len];
    }
    if from_rate == to_rate && out_len == samples.len() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            if source_idx >= last {
                return samples[last];
            }
            let fraction = source_pos - source_idx as f64;
            let left = samples[source_idx] as f64;
            let right = samples[source_idx + 1] as f64;
            (left + (right - left) * fraction) as f32
        })
        .collect()
}

/// Resample a stream to `to_rate`, channel by channel.
pub fn resample(stream: &AudioStream, to_rate: u32) -> Result<AudioStream, StreamError> {
    let out_len = resampled_len(stream.frames(), stream.sample_rate(), to_rate);
    resample_to_frames(stream, to_rate, out_len)
}

/// Resample a stream to `to_rate` with an exact output frame count.
pub fn resample_to_frames(
    stream: &AudioStream,
    to_rate: u32,
    out_frames: usize,
) -> Result<AudioStream, StreamError> {
    if stream.sample_rate() == to_rate && stream.frames() == out_frames {
        return Ok(stream.clone());
    }
    let channels: Vec<Vec<f32>> = (0..stream.channel_count())
        .map(|c| resample_channel(&stream.channel(c), stream.sample_rate(), to_rate, out_frames))
        .collect();
    AudioStream::from_channels(to_rate, channels)
}

/// Average all channels into one.
pub fn downmix_to_mono(stream: &AudioStream) -> Result<AudioStream, StreamError> {
    let channels = stream.channel_count() as usize;
    if channels == 1 {
        return Ok(stream.clone());
    }
    let mono: Vec<f32> = stream
        .samples()
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    AudioStream::mono(stream.sample_rate(), mono)
}
