//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{VoicecleanError, VoicecleanResult};

/// Canonical sample rate of every normalized and encoded stream.
pub const TARGET_SAMPLE_RATE: u32 = 48_000;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where per-job working directories are created.
    pub work_dir: PathBuf,

    /// Pipeline knobs (segmenting, trimming, gain).
    pub pipeline: PipelineConfig,

    /// Enhancement function selection.
    pub enhancer: EnhancerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Values consumed by a pipeline run. A job takes a snapshot of this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Segment length for the enhancement fan-out.
    pub segment_length_ms: u64,

    /// Minimum length of a low-energy span to count as silence.
    pub min_silence_len_ms: u64,

    /// Loudness at or below which audio is considered silent (dBFS).
    pub silence_threshold_dbfs: f64,

    /// Silence retained at each edge of a non-silent chunk.
    pub keep_silence_ms: u64,

    /// Whether to run the silence trimmer after reassembly.
    pub remove_silence: bool,

    /// Gain applied to the final stream (dB). Zero disables the stage.
    pub gain_db: f64,

    /// Worker threads for the enhancement fan-out. Zero picks a default.
    pub workers: usize,

    /// Output sample rate. Fixed; present so snapshots are self-describing.
    pub sample_rate: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segment_length_ms: 60_000,
            min_silence_len_ms: 500,
            silence_threshold_dbfs: -40.0,
            keep_silence_ms: 100,
            remove_silence: true,
            gain_db: 0.0,
            workers: 0,
            sample_rate: TARGET_SAMPLE_RATE,
        }
    }
}

impl PipelineConfig {
    pub const MIN_SILENCE_LEN_RANGE_MS: std::ops::RangeInclusive<u64> = 100..=1000;
    pub const SILENCE_THRESHOLD_RANGE_DBFS: std::ops::RangeInclusive<f64> = -100.0..=0.0;
    pub const GAIN_RANGE_DB: std::ops::RangeInclusive<f64> = -40.0..=40.0;

    /// Reject out-of-domain values before any work starts.
    pub fn validate(&self) -> VoicecleanResult<()> {
        if self.segment_length_ms == 0 {
            return Err(VoicecleanError::invalid_config(
                "segment_length_ms must be greater than 0",
            ));
        }
        if !Self::MIN_SILENCE_LEN_RANGE_MS.contains(&self.min_silence_len_ms) {
            return Err(VoicecleanError::invalid_config(format!(
                "min_silence_len_ms must be within 100..=1000, got {}",
                self.min_silence_len_ms
            )));
        }
        if !Self::SILENCE_THRESHOLD_RANGE_DBFS.contains(&self.silence_threshold_dbfs) {
            return Err(VoicecleanError::invalid_config(format!(
                "silence_threshold_dbfs must be within -100..=0, got {}",
                self.silence_threshold_dbfs
            )));
        }
        if !Self::GAIN_RANGE_DB.contains(&self.gain_db) {
            return Err(VoicecleanError::invalid_config(format!(
                "gain_db must be within -40..=40, got {}",
                self.gain_db
            )));
        }
        if self.sample_rate != TARGET_SAMPLE_RATE {
            return Err(VoicecleanError::invalid_config(format!(
                "sample_rate is fixed at {TARGET_SAMPLE_RATE}, got {}",
                self.sample_rate
            )));
        }
        Ok(())
    }

    /// Worker count to use, resolving zero to the available parallelism (capped at 4).
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get().min(4))
            .unwrap_or(1)
    }
}

/// Which enhancement function to load for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnhancerKind {
    /// Identity; useful to exercise the pipeline without denoising.
    Passthrough,
    /// Built-in noise gate.
    NoiseGate,
    /// External denoiser program.
    Command,
}

impl std::str::FromStr for EnhancerKind {
    type Err = VoicecleanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passthrough" | "none" => Ok(Self::Passthrough),
            "noise-gate" => Ok(Self::NoiseGate),
            "command" => Ok(Self::Command),
            other => Err(VoicecleanError::invalid_config(format!(
                "Unknown enhancer: {other}. Use: passthrough, noise-gate, command"
            ))),
        }
    }
}

/// Enhancement function configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    pub kind: EnhancerKind,
    pub noise_gate: NoiseGateConfig,
    pub command: CommandEnhancerConfig,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            kind: EnhancerKind::NoiseGate,
            noise_gate: NoiseGateConfig::default(),
            command: CommandEnhancerConfig::default(),
        }
    }
}

/// Built-in noise gate settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseGateConfig {
    /// Suppression strength [0.0, 1.0].
    pub strength: f64,

    /// Margin above the estimated noise floor below which frames are gated (dB).
    pub gate_threshold_db: f64,

    /// Fraction of quietest frames used to estimate the noise floor.
    pub floor_percentile: f64,
}

impl Default for NoiseGateConfig {
    fn default() -> Self {
        Self {
            strength: 0.8,
            gate_threshold_db: 6.0,
            floor_percentile: 0.1,
        }
    }
}

/// External denoiser program settings.
///
/// Arguments may contain `{input}`, `{output}`, and `{output_dir}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandEnhancerConfig {
    pub program: String,
    pub args: Vec<String>,
    pub sample_rate: u32,
}

impl Default for CommandEnhancerConfig {
    fn default() -> Self {
        Self {
            program: "deep-filter".to_string(),
            args: vec![
                "{input}".to_string(),
                "--output-dir".to_string(),
                "{output_dir}".to_string(),
            ],
            sample_rate: TARGET_SAMPLE_RATE,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "voiceclean=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            pipeline: PipelineConfig::default(),
            enhancer: EnhancerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        Self::try_load_from(config_path).unwrap_or_else(|e| {
            tracing::warn!("{}", e);
            Self::default()
        })
    }

    /// Load config from an explicit path. A missing file yields defaults;
    /// an unreadable or unparsable one is an error.
    pub fn try_load_from(config_path: &std::path::Path) -> VoicecleanResult<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(config_path).map_err(|e| {
            VoicecleanError::invalid_config(format!(
                "Failed to read config at {:?}: {}",
                config_path, e
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            VoicecleanError::invalid_config(format!(
                "Failed to parse config at {:?}: {}",
                config_path, e
            ))
        })
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("voiceclean").join("config.json")
}

/// Default root for job working directories.
fn default_work_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("voiceclean").join("jobs")
}
