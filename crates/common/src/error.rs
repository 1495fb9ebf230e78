//! Error types shared across voiceclean crates.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Pipeline stage an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Configure,
    Decode,
    Segment,
    Enhance,
    Reassemble,
    TrimSilence,
    Gain,
    Encode,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Configure => "configure",
            Stage::Decode => "decode",
            Stage::Segment => "segment",
            Stage::Enhance => "enhance",
            Stage::Reassemble => "reassemble",
            Stage::TrimSilence => "trim_silence",
            Stage::Gain => "gain",
            Stage::Encode => "encode",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for voiceclean operations.
#[derive(Debug, thiserror::Error)]
pub enum VoicecleanError {
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Audio stream is empty")]
    EmptyStream,

    #[error("Incomplete segment sequence: {} of {expected} segments missing (indices {})", .missing.len(), format_indices(.missing))]
    IncompleteSequence { expected: usize, missing: Vec<usize> },

    #[error("No segments to reassemble")]
    EmptySet,

    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Processing error: {message}")]
    Processing { message: String },

    #[error("Enhancer error: {message}")]
    Enhancer { message: String },

    #[error("Run cancelled")]
    Cancelled,

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using VoicecleanError.
pub type VoicecleanResult<T> = Result<T, VoicecleanError>;

impl VoicecleanError {
    pub fn decode(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn encode(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Encode {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: msg.into(),
        }
    }

    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing {
            message: msg.into(),
        }
    }

    pub fn enhancer(msg: impl Into<String>) -> Self {
        Self::Enhancer {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// The stage this error aborts, when it is tied to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Decode { .. } | Self::FileNotFound { .. } => Some(Stage::Decode),
            Self::EmptyStream => Some(Stage::Segment),
            Self::IncompleteSequence { .. } | Self::EmptySet => Some(Stage::Reassemble),
            Self::Encode { .. } => Some(Stage::Encode),
            Self::InvalidConfig { .. } => Some(Stage::Configure),
            Self::Enhancer { .. } | Self::Cancelled => Some(Stage::Enhance),
            Self::Processing { .. }
            | Self::Unsupported { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => None,
        }
    }

    /// Segment indices missing from an incomplete sequence.
    pub fn missing_indices(&self) -> &[usize] {
        match self {
            Self::IncompleteSequence { missing, .. } => missing,
            _ => &[],
        }
    }
}

fn format_indices(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_sequence_names_missing_indices() {
        let err = VoicecleanError::IncompleteSequence {
            expected: 5,
            missing: vec![1, 3],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 of 5"), "{msg}");
        assert!(msg.contains("indices 1, 3"), "{msg}");
        assert_eq!(err.missing_indices(), &[1, 3]);
        assert_eq!(err.stage(), Some(Stage::Reassemble));
    }

    #[test]
    fn test_stage_attribution() {
        assert_eq!(
            VoicecleanError::decode("a.m4a", "corrupt").stage(),
            Some(Stage::Decode)
        );
        assert_eq!(VoicecleanError::EmptyStream.stage(), Some(Stage::Segment));
        assert_eq!(
            VoicecleanError::encode("/x.wav", "disk full").stage(),
            Some(Stage::Encode)
        );
        assert_eq!(
            VoicecleanError::invalid_config("bad").stage(),
            Some(Stage::Configure)
        );
        assert_eq!(VoicecleanError::processing("x").stage(), None);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::TrimSilence.to_string(), "trim_silence");
        let json = serde_json::to_string(&Stage::Reassemble).unwrap();
        assert_eq!(json, "\"reassemble\"");
    }
}
