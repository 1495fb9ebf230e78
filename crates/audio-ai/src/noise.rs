//! Built-in noise gate.
//!
//! Estimates a noise floor from the quietest 10 ms frames of the input and
//! attenuates every frame that stays within `gate_threshold_db` of it. Frame
//! gains are smoothed and ramped per sample so the gate never clicks.

use voiceclean_common::config::NoiseGateConfig;
use voiceclean_common::error::{VoicecleanError, VoicecleanResult};
use voiceclean_processing_core::silence::amplitude_to_dbfs;

use crate::enhancer::{Enhancer, SegmentEnhanceError};

const FRAME_MS: u32 = 10;

/// Fraction of the gap to the target gain closed per frame.
const GAIN_SMOOTHING: f32 = 0.5;

/// Floor-tracking noise gate.
#[derive(Debug, Clone)]
pub struct NoiseGate {
    config: NoiseGateConfig,
}

impl NoiseGate {
    pub fn new(config: NoiseGateConfig) -> VoicecleanResult<Self> {
        if !(0.0..=1.0).contains(&config.strength) {
            return Err(VoicecleanError::invalid_config(format!(
                "noise_gate.strength must be within 0..=1, got {}",
                config.strength
            )));
        }
        if !(0.0..=1.0).contains(&config.floor_percentile) {
            return Err(VoicecleanError::invalid_config(format!(
                "noise_gate.floor_percentile must be within 0..=1, got {}",
                config.floor_percentile
            )));
        }
        if !config.gate_threshold_db.is_finite() || config.gate_threshold_db < 0.0 {
            return Err(VoicecleanError::invalid_config(format!(
                "noise_gate.gate_threshold_db must be a non-negative number, got {}",
                config.gate_threshold_db
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &NoiseGateConfig {
        &self.config
    }

    /// Per-frame loudness in dBFS.
    fn frame_levels(samples: &[f32], frame_len: usize) -> Vec<f64> {
        samples
            .chunks(frame_len)
            .map(|frame| {
                let energy: f64 = frame.iter().map(|s| (*s as f64).powi(2)).sum();
                amplitude_to_dbfs((energy / frame.len() as f64).sqrt())
            })
            .collect()
    }

    /// Level at `floor_percentile` among the frame levels.
    fn noise_floor(&self, levels: &[f64]) -> f64 {
        let mut sorted = levels.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let pos = (self.config.floor_percentile * (sorted.len() - 1) as f64).floor() as usize;
        sorted[pos.min(sorted.len() - 1)]
    }

    fn frame_gains(&self, levels: &[f64]) -> Vec<f32> {
        let threshold = self.noise_floor(levels) + self.config.gate_threshold_db;
        let closed = (1.0 - self.config.strength) as f32;

        let mut current = 1.0f32;
        levels
            .iter()
            .map(|level| {
                let target = if *level <= threshold { closed } else { 1.0 };
                // Open immediately so speech onsets are never clipped.
                current = if target > current {
                    target
                } else {
                    current + (target - current) * GAIN_SMOOTHING
                };
                current
            })
            .collect()
    }
}

impl Enhancer for NoiseGate {
    fn name(&self) -> &str {
        "noise-gate"
    }

    fn enhance(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<f32>, SegmentEnhanceError> {
        if samples.is_empty() || self.config.strength == 0.0 {
            return Ok(samples.to_vec());
        }

        let frame_len = ((sample_rate * FRAME_MS / 1000) as usize).max(1);
        let levels = Self::frame_levels(samples, frame_len);
        let gains = self.frame_gains(&levels);

        let mut out = Vec::with_capacity(samples.len());
        let mut previous = gains[0];
        for (frame, gain) in samples.chunks(frame_len).zip(&gains) {
            let step = (gain - previous) / frame.len() as f32;
            for (i, sample) in frame.iter().enumerate() {
                out.push(sample * (previous + step * (i + 1) as f32));
            }
            previous = *gain;
        }
        Ok(out)
    }
}
