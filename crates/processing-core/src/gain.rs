//! Fixed gain.

use voiceclean_audio_model::AudioStream;

use crate::silence::dbfs_to_amplitude;

/// Scale every sample by `gain_db`, clamping to full scale.
pub fn apply_gain(stream: AudioStream, gain_db: f64) -> AudioStream {
    if gain_db == 0.0 {
        return stream;
    }
    let factor = dbfs_to_amplitude(gain_db) as f32;
    let out = stream.map_samples(|s| (s * factor).clamp(-1.0, 1.0));
    tracing::debug!(gain_db, peak = out.peak(), "Applied gain");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_gain_is_identity() {
        let stream = AudioStream::mono(48_000, vec![0.3, -0.2]).unwrap();
        assert_eq!(apply_gain(stream.clone(), 0.0), stream);
    }

    #[test]
    fn test_plus_six_db_roughly_doubles() {
        let stream = AudioStream::mono(48_000, vec![0.1, -0.1]).unwrap();
        let out = apply_gain(stream, 6.0);
        assert!((out.samples()[0] - 0.1995).abs() < 1e-3);
        assert!((out.samples()[1] + 0.1995).abs() < 1e-3);
    }

    #[test]
    fn test_gain_clips_at_full_scale() {
        let stream = AudioStream::mono(48_000, vec![0.9, -0.9]).unwrap();
        let out = apply_gain(stream, 20.0);
        assert_eq!(out.samples(), &[1.0, -1.0]);
        assert_eq!(out.frames(), 2);
    }
}
