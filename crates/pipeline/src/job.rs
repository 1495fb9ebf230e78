//! One pipeline run, from input file to cleaned output.

use std::path::{Path, PathBuf};

use voiceclean_audio_ai::{build_enhancer, Enhancer, SegmentEnhanceError};
use voiceclean_audio_model::{AudioStream, EnhancedSegment, JobLayout, SegmentInfo};
use voiceclean_codec::wav::{write_wav, WavEncoding};
use voiceclean_codec::{normalize, EncodeSummary, Encoder};
use voiceclean_common::clock::RunClock;
use voiceclean_common::config::{AppConfig, EnhancerConfig, PipelineConfig};
use voiceclean_common::error::{VoicecleanError, VoicecleanResult};
use voiceclean_common::Stage;
use voiceclean_processing_core::gain::apply_gain;
use voiceclean_processing_core::{Reassembler, Segmenter, SilenceParams, SilenceTrimmer};

use crate::cancel::CancelToken;
use crate::fanout::{enhance_segments, SegmentTask};
use crate::report::{JobReport, JobStatus, SkippedSegment};

/// Progress callback for pipeline runs.
pub type ProgressCallback = Box<dyn Fn(PipelineProgress) + Send>;

/// Progress report emitted at stage transitions and per finished segment.
#[derive(Debug, Clone)]
pub struct PipelineProgress {
    pub state: JobState,
    /// Segments that finished enhancement (successfully or not).
    pub segments_done: usize,
    pub segments_total: usize,
}

/// Lifecycle of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Job created but not started.
    Created,
    Decoding,
    Segmenting,
    Enhancing,
    Reassembling,
    TrimmingSilence,
    ApplyingGain,
    Encoding,
    /// Output written.
    Completed,
    /// A stage failed; no output was written.
    Failed,
    /// Stopped through the cancel token.
    Cancelled,
}

impl JobState {
    fn stage(self) -> Option<Stage> {
        match self {
            JobState::Decoding => Some(Stage::Decode),
            JobState::Segmenting => Some(Stage::Segment),
            JobState::Enhancing => Some(Stage::Enhance),
            JobState::Reassembling => Some(Stage::Reassemble),
            JobState::TrimmingSilence => Some(Stage::TrimSilence),
            JobState::ApplyingGain => Some(Stage::Gain),
            JobState::Encoding => Some(Stage::Encode),
            JobState::Created | JobState::Completed | JobState::Failed | JobState::Cancelled => {
                None
            }
        }
    }
}

/// One input file, one configuration snapshot, one working directory.
pub struct PipelineJob {
    input: PathBuf,
    work_dir: PathBuf,
    pipeline: PipelineConfig,
    enhancer: EnhancerConfig,
    clock: RunClock,
    state: JobState,
    layout: Option<JobLayout>,
    progress: Option<ProgressCallback>,
    segments_total: usize,
    segments_done: usize,
    failed_stage: Option<Stage>,
}

/// Everything the run learned, kept for the report whether or not it succeeds.
#[derive(Default)]
struct RunRecord {
    enhancer: String,
    input_duration_ms: Option<u64>,
    enhanced_count: usize,
    skipped: Vec<SkippedSegment>,
    denoised_duration_ms: Option<u64>,
    output: Option<EncodeSummary>,
}

impl PipelineJob {
    /// Snapshot `config` for a run over `input`.
    pub fn new(input: impl Into<PathBuf>, config: &AppConfig) -> Self {
        Self::with_clock(input, config, RunClock::start())
    }

    /// Like [`PipelineJob::new`] with a fixed clock (deterministic names).
    pub fn with_clock(input: impl Into<PathBuf>, config: &AppConfig, clock: RunClock) -> Self {
        Self {
            input: input.into(),
            work_dir: config.work_dir.clone(),
            pipeline: config.pipeline.clone(),
            enhancer: config.enhancer.clone(),
            clock,
            state: JobState::Created,
            layout: None,
            progress: None,
            segments_total: 0,
            segments_done: 0,
            failed_stage: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.pipeline
    }

    /// Stage a failed or cancelled run stopped in, as written to its report.
    pub fn failed_stage(&self) -> Option<Stage> {
        self.failed_stage
    }

    /// Working directory layout, once the job directory exists.
    pub fn layout(&self) -> Option<&JobLayout> {
        self.layout.as_ref()
    }

    /// Load the configured enhancer and run.
    pub fn run(&mut self, cancel: &CancelToken) -> VoicecleanResult<JobReport> {
        self.check_startable()?;
        let enhancer = match build_enhancer(&self.enhancer) {
            Ok(enhancer) => enhancer,
            Err(err) => {
                self.state = JobState::Failed;
                self.failed_stage = err.stage();
                return Err(err);
            }
        };
        self.run_with_enhancer(enhancer.as_ref(), cancel)
    }

    /// Run with an already loaded enhancer.
    ///
    /// On failure the job directory and every artifact produced so far stay on
    /// disk, a report with the failing stage is written, and no output file
    /// exists.
    pub fn run_with_enhancer(
        &mut self,
        enhancer: &dyn Enhancer,
        cancel: &CancelToken,
    ) -> VoicecleanResult<JobReport> {
        self.check_startable()?;

        tracing::info!(
            input = %self.input.display(),
            enhancer = enhancer.name(),
            segment_length_ms = self.pipeline.segment_length_ms,
            remove_silence = self.pipeline.remove_silence,
            gain_db = self.pipeline.gain_db,
            "Starting pipeline job"
        );

        let mut record = RunRecord {
            enhancer: enhancer.name().to_string(),
            ..Default::default()
        };

        match self.execute(enhancer, cancel, &mut record) {
            Ok(()) => {
                self.set_state(JobState::Completed);
                let report = self.report(JobStatus::Succeeded, record, None);
                self.save_report(&report);
                tracing::info!(
                    output = ?report.output.as_ref().map(|o| o.path.display().to_string()),
                    elapsed_ms = report.elapsed_ms,
                    "Pipeline job completed"
                );
                Ok(report)
            }
            Err(err) => {
                let failed_in = self.state;
                let (status, stage) = if matches!(err, VoicecleanError::Cancelled) {
                    self.state = JobState::Cancelled;
                    (JobStatus::Cancelled, failed_in.stage())
                } else {
                    self.state = JobState::Failed;
                    (JobStatus::Failed, err.stage().or(failed_in.stage()))
                };
                self.failed_stage = stage;
                tracing::error!(stage = ?stage, error = %err, "Pipeline job failed");
                let report = self.report(status, record, Some((stage, &err)));
                self.save_report(&report);
                Err(err)
            }
        }
    }

    fn check_startable(&self) -> VoicecleanResult<()> {
        if self.state != JobState::Created {
            return Err(VoicecleanError::processing("Job already started"));
        }
        Ok(())
    }

    fn execute(
        &mut self,
        enhancer: &dyn Enhancer,
        cancel: &CancelToken,
        record: &mut RunRecord,
    ) -> VoicecleanResult<()> {
        self.pipeline.validate()?;
        let segmenter = Segmenter::new(self.pipeline.segment_length_ms)?;
        if !self.input.is_file() {
            return Err(VoicecleanError::FileNotFound {
                path: self.input.clone(),
            });
        }

        let layout = JobLayout::create(&self.work_dir, &self.input, &self.clock.timestamp())?;
        tracing::info!(job_dir = %layout.root().display(), "Created job directory");
        self.layout = Some(layout.clone());

        self.set_state(JobState::Decoding);
        let stream = normalize(&self.input, &layout.normalized_path(), self.pipeline.sample_rate)?;
        record.input_duration_ms = Some(stream.duration_ms());
        self.check_cancel(cancel)?;

        self.set_state(JobState::Segmenting);
        let tasks = write_segments(&segmenter, &stream, &layout)?;
        drop(stream);
        self.segments_total = tasks.len();
        self.check_cancel(cancel)?;

        self.set_state(JobState::Enhancing);
        let enhanced = self.enhance(tasks, enhancer, cancel, record);
        self.check_cancel(cancel)?;

        self.set_state(JobState::Reassembling);
        let denoised = Reassembler::new(self.segments_total).reassemble(enhanced)?;
        record.denoised_duration_ms = Some(denoised.duration_ms());

        let encoder = Encoder::new(self.pipeline.sample_rate);
        let denoised_path = layout.denoised_path();
        let denoised_summary = encoder.encode(&denoised, &denoised_path)?;

        let trimmed = self.pipeline.remove_silence;
        let gained = self.pipeline.gain_db != 0.0;
        if !trimmed && !gained {
            record.output = Some(denoised_summary);
            return Ok(());
        }

        let mut stream = denoised;
        if trimmed {
            self.set_state(JobState::TrimmingSilence);
            stream = SilenceTrimmer::new(SilenceParams::from(&self.pipeline)).trim(&stream)?;
        }
        if gained {
            self.set_state(JobState::ApplyingGain);
            stream = apply_gain(stream, self.pipeline.gain_db);
        }

        self.set_state(JobState::Encoding);
        record.output = Some(encoder.encode(&stream, &layout.output_path(trimmed, gained))?);
        Ok(())
    }

    fn enhance(
        &mut self,
        tasks: Vec<SegmentTask>,
        enhancer: &dyn Enhancer,
        cancel: &CancelToken,
        record: &mut RunRecord,
    ) -> Vec<EnhancedSegment> {
        let workers = self.pipeline.effective_workers();
        let total = self.segments_total;
        let progress = self.progress.as_ref();
        let mut done = 0usize;

        let outcomes = enhance_segments(tasks, enhancer, workers, cancel, |_| {
            done += 1;
            if let Some(cb) = progress {
                cb(PipelineProgress {
                    state: JobState::Enhancing,
                    segments_done: done,
                    segments_total: total,
                });
            }
        });
        self.segments_done = done;

        let mut enhanced = Vec::with_capacity(outcomes.len());
        let mut failed = 0usize;
        for outcome in outcomes {
            match outcome.result {
                Ok(segment) => enhanced.push(segment),
                Err(err) => {
                    if !matches!(err, SegmentEnhanceError::Cancelled) {
                        failed += 1;
                    }
                    record.skipped.push(SkippedSegment {
                        index: outcome.index,
                        reason: err.to_string(),
                    });
                }
            }
        }
        record.skipped.sort_by_key(|s| s.index);
        record.enhanced_count = enhanced.len();

        if !record.skipped.is_empty() {
            tracing::warn!(
                failed,
                skipped = record.skipped.len(),
                total,
                "Some segments were not enhanced"
            );
        }
        enhanced
    }

    fn check_cancel(&self, cancel: &CancelToken) -> VoicecleanResult<()> {
        if cancel.is_cancelled() {
            tracing::warn!(state = ?self.state, "Cancellation requested");
            return Err(VoicecleanError::Cancelled);
        }
        Ok(())
    }

    fn set_state(&mut self, state: JobState) {
        tracing::info!(state = ?state, "Pipeline stage");
        self.state = state;
        if let Some(cb) = &self.progress {
            cb(PipelineProgress {
                state,
                segments_done: self.segments_done,
                segments_total: self.segments_total,
            });
        }
    }

    fn report(
        &self,
        status: JobStatus,
        record: RunRecord,
        failure: Option<(Option<Stage>, &VoicecleanError)>,
    ) -> JobReport {
        JobReport {
            input: self.input.clone(),
            job_dir: self
                .layout
                .as_ref()
                .map(|l| l.root().to_path_buf())
                .unwrap_or_default(),
            started_at: self.clock.started_rfc3339(),
            status,
            enhancer: record.enhancer,
            config: self.pipeline.clone(),
            input_duration_ms: record.input_duration_ms,
            segment_count: self.segments_total,
            enhanced_count: record.enhanced_count,
            skipped: record.skipped,
            denoised_duration_ms: record.denoised_duration_ms,
            output: record.output,
            failed_stage: failure.and_then(|(stage, _)| stage),
            error: failure.map(|(_, err)| err.to_string()),
            elapsed_ms: self.clock.elapsed_ms(),
        }
    }

    fn save_report(&self, report: &JobReport) {
        let Some(layout) = &self.layout else {
            return;
        };
        if let Err(e) = report.save(&layout.report_path()) {
            tracing::warn!(error = %e, "Failed to write job report");
        }
    }
}

/// Split `stream` and write each segment to the job's segment directory.
fn write_segments(
    segmenter: &Segmenter,
    stream: &AudioStream,
    layout: &JobLayout,
) -> VoicecleanResult<Vec<SegmentTask>> {
    let segments = segmenter.split(stream)?;
    tracing::info!(
        count = segments.len(),
        segment_length_ms = segmenter.segment_length_ms(),
        "Segmented stream"
    );

    segments
        .into_iter()
        .map(|segment| {
            let info: SegmentInfo = segment.info();
            let source = layout.segment_path(info.index);
            // Float keeps segment samples bit-exact until reassembly.
            write_wav(&segment.data, &source, WavEncoding::Float32)?;
            Ok(SegmentTask {
                info,
                source,
                target: layout.enhanced_segment_path(info.index),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use voiceclean_audio_ai::Passthrough;

    fn config(work_dir: &Path) -> AppConfig {
        AppConfig {
            work_dir: work_dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_config_fails_before_creating_job_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir.path().join("jobs"));
        config.pipeline.min_silence_len_ms = 50;

        let mut job = PipelineJob::new(dir.path().join("in.wav"), &config);
        let err = job.run_with_enhancer(&Passthrough, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, VoicecleanError::InvalidConfig { .. }));
        assert_eq!(job.state(), JobState::Failed);
        assert!(job.layout().is_none());
        assert!(!dir.path().join("jobs").exists());
    }

    #[test]
    fn test_missing_input_is_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = PipelineJob::new(dir.path().join("nope.m4a"), &config(dir.path()));
        let err = job.run_with_enhancer(&Passthrough, &CancelToken::new()).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Decode));
    }

    #[test]
    fn test_job_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = PipelineJob::new(dir.path().join("nope.wav"), &config(dir.path()));
        let _ = job.run_with_enhancer(&Passthrough, &CancelToken::new());
        assert!(job.run_with_enhancer(&Passthrough, &CancelToken::new()).is_err());
    }

    #[test]
    fn test_cancelled_run_reports_stage_it_stopped_in() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("memo.wav");
        let stream = AudioStream::mono(48_000, vec![0.25; 4_800]).unwrap();
        write_wav(&stream, &input, WavEncoding::Pcm16).unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let mut job = PipelineJob::new(&input, &config(&dir.path().join("jobs")));
        let err = job.run_with_enhancer(&Passthrough, &cancel).unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Enhance));
        assert_eq!(job.failed_stage(), Some(Stage::Decode));
        let report = JobReport::load(&job.layout().unwrap().report_path()).unwrap();
        assert_eq!(report.failed_stage, job.failed_stage());
    }

    #[test]
    fn test_successful_run_has_no_failed_stage() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("memo.wav");
        let stream = AudioStream::mono(48_000, vec![0.25; 4_800]).unwrap();
        write_wav(&stream, &input, WavEncoding::Pcm16).unwrap();

        let mut job = PipelineJob::new(&input, &config(&dir.path().join("jobs")));
        job.run_with_enhancer(&Passthrough, &CancelToken::new()).unwrap();
        assert_eq!(job.failed_stage(), None);
    }

    #[test]
    fn test_state_stage_mapping() {
        assert_eq!(JobState::Enhancing.stage(), Some(Stage::Enhance));
        assert_eq!(JobState::Completed.stage(), None);
    }
}
