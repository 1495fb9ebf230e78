//! Job report written next to the job's artifacts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use voiceclean_codec::EncodeSummary;
use voiceclean_common::config::PipelineConfig;
use voiceclean_common::error::VoicecleanResult;
use voiceclean_common::Stage;

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Failed,
    Cancelled,
}

/// A segment that did not make it through enhancement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSegment {
    pub index: usize,
    pub reason: String,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub input: PathBuf,
    pub job_dir: PathBuf,
    pub started_at: String,
    pub status: JobStatus,
    pub enhancer: String,
    pub config: PipelineConfig,
    pub input_duration_ms: Option<u64>,
    pub segment_count: usize,
    pub enhanced_count: usize,
    pub skipped: Vec<SkippedSegment>,
    pub denoised_duration_ms: Option<u64>,
    pub output: Option<EncodeSummary>,
    pub failed_stage: Option<Stage>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl JobReport {
    pub fn skipped_indices(&self) -> Vec<usize> {
        self.skipped.iter().map(|s| s.index).collect()
    }

    pub fn to_json(&self) -> VoicecleanResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> VoicecleanResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> VoicecleanResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_json_shape() {
        let report = JobReport {
            input: PathBuf::from("memo.m4a"),
            job_dir: PathBuf::from("/jobs/20240101_000000_memo"),
            started_at: "2024-01-01T00:00:00+00:00".to_string(),
            status: JobStatus::Failed,
            enhancer: "noise-gate".to_string(),
            config: PipelineConfig::default(),
            input_duration_ms: Some(300_000),
            segment_count: 5,
            enhanced_count: 4,
            skipped: vec![SkippedSegment {
                index: 3,
                reason: "enhancer failed: boom".to_string(),
            }],
            denoised_duration_ms: None,
            output: None,
            failed_stage: Some(Stage::Reassemble),
            error: Some("Incomplete segment sequence".to_string()),
            elapsed_ms: 10,
        };

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["failed_stage"], "reassemble");
        assert_eq!(json["skipped"][0]["index"], 3);
        assert_eq!(report.skipped_indices(), vec![3]);
    }
}
