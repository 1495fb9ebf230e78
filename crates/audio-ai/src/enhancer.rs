//! The enhancement function seam.

use std::path::PathBuf;

use voiceclean_audio_model::{SegmentMismatch, StreamError};
use voiceclean_common::config::{EnhancerConfig, EnhancerKind};
use voiceclean_common::error::{VoicecleanError, VoicecleanResult};

use crate::command::CommandEnhancer;
use crate::noise::NoiseGate;

/// Why one segment could not be enhanced.
///
/// Recovered at the adapter boundary: the segment is skipped and the run
/// carries on with the others.
#[derive(Debug, thiserror::Error)]
pub enum SegmentEnhanceError {
    #[error("enhancer failed: {message}")]
    Enhancer { message: String },

    #[error("enhancer returned {actual} samples for {expected} input samples")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("enhancer produced a non-finite sample at position {position}")]
    NonFinite { position: usize },

    #[error("enhanced segment does not match its source: {0}")]
    Mismatch(#[from] SegmentMismatch),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("segment I/O failed for {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("enhancer panicked: {message}")]
    Panicked { message: String },

    #[error("cancelled before processing")]
    Cancelled,
}

impl SegmentEnhanceError {
    pub fn enhancer(msg: impl Into<String>) -> Self {
        Self::Enhancer {
            message: msg.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            message: msg.into(),
        }
    }
}

/// An opaque audio enhancement function.
///
/// Implementations take one channel of samples and return the same number of
/// enhanced samples at the same rate. A single instance is shared by all
/// workers of a run.
pub trait Enhancer: Send + Sync {
    /// Enhancer name for logs and reports.
    fn name(&self) -> &str;

    /// Rate the enhancer works at. `None` accepts the stream rate as-is.
    fn sample_rate(&self) -> Option<u32> {
        None
    }

    /// Whether the enhancer can run on this system.
    fn is_available(&self) -> bool {
        true
    }

    /// Enhance one channel sampled at `sample_rate`.
    fn enhance(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<f32>, SegmentEnhanceError>;
}

/// Identity enhancement.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl Enhancer for Passthrough {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn enhance(&self, samples: &[f32], _sample_rate: u32) -> Result<Vec<f32>, SegmentEnhanceError> {
        Ok(samples.to_vec())
    }
}

/// Load the configured enhancer once for a run.
///
/// Fails with [`VoicecleanError::Enhancer`] when it is unavailable, so no
/// segment work starts against a missing model.
pub fn build_enhancer(config: &EnhancerConfig) -> VoicecleanResult<Box<dyn Enhancer>> {
    let enhancer: Box<dyn Enhancer> = match config.kind {
        EnhancerKind::Passthrough => Box::new(Passthrough),
        EnhancerKind::NoiseGate => Box::new(NoiseGate::new(config.noise_gate.clone())?),
        EnhancerKind::Command => Box::new(CommandEnhancer::new(config.command.clone())?),
    };

    if !enhancer.is_available() {
        return Err(VoicecleanError::enhancer(format!(
            "{} enhancer is not available on this system",
            enhancer.name()
        )));
    }

    tracing::info!(
        enhancer = enhancer.name(),
        sample_rate = ?enhancer.sample_rate(),
        "Enhancer loaded"
    );
    Ok(enhancer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voiceclean_common::config::CommandEnhancerConfig;

    #[test]
    fn test_passthrough_is_identity() {
        let input = [0.1, -0.2, 0.3];
        assert_eq!(Passthrough.enhance(&input, 48_000).unwrap(), input.to_vec());
    }

    #[test]
    fn test_build_default_enhancer() {
        let enhancer = build_enhancer(&EnhancerConfig::default()).unwrap();
        assert_eq!(enhancer.name(), "noise-gate");
    }

    #[test]
    fn test_build_missing_command_fails() {
        let config = EnhancerConfig {
            kind: EnhancerKind::Command,
            command: CommandEnhancerConfig {
                program: "voiceclean-no-such-denoiser".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = build_enhancer(&config).err().unwrap();
        assert!(matches!(err, VoicecleanError::Enhancer { .. }), "{err}");
    }

    #[test]
    fn test_build_rejects_bad_strength() {
        let mut config = EnhancerConfig::default();
        config.noise_gate.strength = 1.5;
        let err = build_enhancer(&config).err().unwrap();
        assert!(matches!(err, VoicecleanError::InvalidConfig { .. }));
    }
}
