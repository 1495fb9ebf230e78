//! Bounded worker pool for per-segment enhancement.
//!
//! Segment tasks go into a crossbeam queue drained by `workers` scoped
//! threads. Each worker reads a segment file, enhances it, writes the
//! enhanced file, and reports an outcome tagged with the segment index.
//! Completion order is arbitrary; only the index matters downstream.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

use crossbeam_channel::bounded;
use voiceclean_audio_ai::{Enhancer, EnhancerAdapter, SegmentEnhanceError};
use voiceclean_audio_model::{EnhancedSegment, Segment, SegmentInfo};
use voiceclean_codec::wav::{read_wav, write_wav, WavEncoding};

use crate::cancel::CancelToken;

/// One unit of enhancement work.
#[derive(Debug, Clone)]
pub struct SegmentTask {
    pub info: SegmentInfo,
    /// Segment WAV to read.
    pub source: PathBuf,
    /// Where the enhanced WAV goes.
    pub target: PathBuf,
}

/// Result of one task.
#[derive(Debug)]
pub struct SegmentOutcome {
    pub index: usize,
    pub result: Result<EnhancedSegment, SegmentEnhanceError>,
}

/// Enhance every task on a pool of `workers` threads.
///
/// `on_outcome` runs on the calling thread as outcomes arrive. Failed
/// segments are logged and returned as errors; they never stop the others.
/// A panic inside the enhancer is caught per segment and reported as
/// [`SegmentEnhanceError::Panicked`]. Once `cancel` is set, tasks not yet
/// started come back as [`SegmentEnhanceError::Cancelled`].
pub fn enhance_segments(
    tasks: Vec<SegmentTask>,
    enhancer: &dyn Enhancer,
    workers: usize,
    cancel: &CancelToken,
    mut on_outcome: impl FnMut(&SegmentOutcome),
) -> Vec<SegmentOutcome> {
    let total = tasks.len();
    if total == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, total);

    let (task_tx, task_rx) = bounded::<SegmentTask>(total);
    let (outcome_tx, outcome_rx) = bounded::<SegmentOutcome>(total);
    for task in tasks {
        // Capacity equals the task count, so this never blocks.
        let _ = task_tx.send(task);
    }
    drop(task_tx);

    tracing::info!(segments = total, workers, enhancer = enhancer.name(), "Enhancing segments");

    let adapter = EnhancerAdapter::new(enhancer);
    let mut outcomes = Vec::with_capacity(total);

    std::thread::scope(|scope| {
        for worker in 0..workers {
            let task_rx = task_rx.clone();
            let outcome_tx = outcome_tx.clone();
            scope.spawn(move || {
                for task in task_rx.iter() {
                    let index = task.info.index;
                    let result = if cancel.is_cancelled() {
                        Err(SegmentEnhanceError::Cancelled)
                    } else {
                        tracing::debug!(worker, segment = index, "Worker took segment");
                        catch_unwind(AssertUnwindSafe(|| process_task(&adapter, &task)))
                            .unwrap_or_else(|payload| {
                                Err(SegmentEnhanceError::Panicked {
                                    message: panic_message(payload.as_ref()),
                                })
                            })
                    };
                    if outcome_tx.send(SegmentOutcome { index, result }).is_err() {
                        break;
                    }
                }
            });
        }
        drop(outcome_tx);

        for outcome in outcome_rx.iter() {
            match &outcome.result {
                Ok(_) => tracing::debug!(segment = outcome.index, "Segment done"),
                Err(SegmentEnhanceError::Cancelled) => {
                    tracing::debug!(segment = outcome.index, "Segment cancelled")
                }
                Err(err) => tracing::warn!(
                    segment = outcome.index,
                    error = %err,
                    "Segment enhancement failed, skipping"
                ),
            }
            on_outcome(&outcome);
            outcomes.push(outcome);
        }
    });

    outcomes
}

fn process_task(
    adapter: &EnhancerAdapter<'_>,
    task: &SegmentTask,
) -> Result<EnhancedSegment, SegmentEnhanceError> {
    let data = read_wav(&task.source).map_err(|e| SegmentEnhanceError::io(&task.source, e.to_string()))?;
    let segment = Segment::from_info(task.info, data);
    let enhanced = adapter.enhance(segment)?;
    write_wav(enhanced.data(), &task.target, WavEncoding::Float32)
        .map_err(|e| SegmentEnhanceError::io(&task.target, e.to_string()))?;
    Ok(enhanced)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use voiceclean_audio_ai::Passthrough;
    use voiceclean_audio_model::AudioStream;

    fn write_tasks(dir: &std::path::Path, count: usize) -> Vec<SegmentTask> {
        (0..count)
            .map(|index| {
                let source = dir.join(format!("s_part{}.wav", index + 1));
                let target = dir.join(format!("s_part{}_denoised.wav", index + 1));
                let stream = AudioStream::mono(48_000, vec![index as f32 / 10.0; 480]).unwrap();
                write_wav(&stream, &source, WavEncoding::Float32).unwrap();
                SegmentTask {
                    info: SegmentInfo {
                        index,
                        start_offset_ms: index as u64 * 10,
                        duration_ms: 10,
                    },
                    source,
                    target,
                }
            })
            .collect()
    }

    struct FailOn(usize);

    impl Enhancer for FailOn {
        fn name(&self) -> &str {
            "fail-on"
        }

        fn enhance(&self, samples: &[f32], _: u32) -> Result<Vec<f32>, SegmentEnhanceError> {
            // Segment content encodes its index.
            if (samples[0] * 10.0).round() as usize == self.0 {
                return Err(SegmentEnhanceError::enhancer("boom"));
            }
            Ok(samples.to_vec())
        }
    }

    #[test]
    fn test_all_segments_enhanced_and_written() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = write_tasks(dir.path(), 6);
        let targets: Vec<_> = tasks.iter().map(|t| t.target.clone()).collect();

        let seen = AtomicUsize::new(0);
        let outcomes = enhance_segments(tasks, &Passthrough, 3, &CancelToken::new(), |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(outcomes.len(), 6);
        assert_eq!(seen.load(Ordering::SeqCst), 6);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        assert!(targets.iter().all(|t| t.exists()));
    }

    #[test]
    fn test_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = write_tasks(dir.path(), 5);
        let outcomes = enhance_segments(tasks, &FailOn(3), 2, &CancelToken::new(), |_| {});

        let mut failed: Vec<usize> = outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.index)
            .collect();
        failed.sort_unstable();
        assert_eq!(failed, vec![3]);
        assert!(!dir.path().join("s_part4_denoised.wav").exists());
        assert!(dir.path().join("s_part5_denoised.wav").exists());
    }

    struct PanicOn(usize);

    impl Enhancer for PanicOn {
        fn name(&self) -> &str {
            "panic-on"
        }

        fn enhance(&self, samples: &[f32], _: u32) -> Result<Vec<f32>, SegmentEnhanceError> {
            if (samples[0] * 10.0).round() as usize == self.0 {
                panic!("model state corrupted");
            }
            Ok(samples.to_vec())
        }
    }

    #[test]
    fn test_enhancer_panic_skips_only_that_segment() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = write_tasks(dir.path(), 4);
        let outcomes = enhance_segments(tasks, &PanicOn(1), 2, &CancelToken::new(), |_| {});

        assert_eq!(outcomes.len(), 4);
        let panicked = outcomes.iter().find(|o| o.index == 1).unwrap();
        match &panicked.result {
            Err(SegmentEnhanceError::Panicked { message }) => {
                assert!(message.contains("model state corrupted"), "{message}")
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(outcomes.iter().filter(|o| o.result.is_ok()).count(), 3);
        assert!(!dir.path().join("s_part2_denoised.wav").exists());
        assert!(dir.path().join("s_part4_denoised.wav").exists());
    }

    #[test]
    fn test_missing_source_is_segment_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut tasks = write_tasks(dir.path(), 2);
        std::fs::remove_file(&tasks[1].source).unwrap();
        tasks.reverse();

        let outcomes = enhance_segments(tasks, &Passthrough, 1, &CancelToken::new(), |_| {});
        let failed = outcomes.iter().find(|o| o.index == 1).unwrap();
        assert!(matches!(failed.result, Err(SegmentEnhanceError::Io { .. })));
    }

    #[test]
    fn test_cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = write_tasks(dir.path(), 4);
        let cancel = CancelToken::new();
        cancel.cancel();

        let outcomes = enhance_segments(tasks, &Passthrough, 2, &cancel, |_| {});
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o.result, Err(SegmentEnhanceError::Cancelled))));
    }

    #[test]
    fn test_no_tasks() {
        assert!(enhance_segments(Vec::new(), &Passthrough, 4, &CancelToken::new(), |_| {}).is_empty());
    }
}
