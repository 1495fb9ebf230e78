//! Rebuild output from an existing segments directory.
//!
//! Used after a partial failure: once the missing segments have been
//! re-enhanced by hand (or the enhancer fixed and rerun), the enhanced files
//! already on disk are merged without redoing any work.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use voiceclean_audio_model::{
    segment_index_from_name, AudioStream, EnhancedSegment, Segment, SegmentInfo,
};
use voiceclean_codec::wav::read_wav;
use voiceclean_codec::{EncodeSummary, Encoder};
use voiceclean_common::config::PipelineConfig;
use voiceclean_common::error::{VoicecleanError, VoicecleanResult};
use voiceclean_processing_core::gain::apply_gain;
use voiceclean_processing_core::natural::natural_sort;
use voiceclean_processing_core::{Reassembler, SilenceParams, SilenceTrimmer};

use crate::report::SkippedSegment;

/// Enhanced segment files found in a directory.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Segment count implied by the files present.
    pub expected: usize,
    /// `(index, path)` in natural file-name order.
    pub enhanced: Vec<(usize, PathBuf)>,
    /// Raw segment files by index.
    pub sources: BTreeMap<usize, PathBuf>,
}

/// What a merge produced.
#[derive(Debug, Clone)]
pub struct MergeSummary {
    pub expected: usize,
    pub merged: usize,
    pub failed: Vec<SkippedSegment>,
    pub output: EncodeSummary,
}

/// List enhanced segments (`*_part<N><suffix>.wav`) under `dir`.
///
/// `expected` covers both raw and enhanced files, so a trailing segment
/// whose enhanced file was never written still counts as missing.
pub fn discover_enhanced(dir: &Path, suffix: &str) -> VoicecleanResult<Discovery> {
    if !dir.is_dir() {
        return Err(VoicecleanError::FileNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    natural_sort(&mut names);

    let mut discovery = Discovery::default();
    for name in names {
        if let Some(index) = segment_index_from_name(&name, suffix) {
            discovery.enhanced.push((index, dir.join(&name)));
        } else if let Some(index) = segment_index_from_name(&name, "") {
            discovery.sources.insert(index, dir.join(&name));
        }
    }

    let max_enhanced = discovery.enhanced.iter().map(|(i, _)| i + 1).max();
    let max_source = discovery.sources.keys().next_back().map(|i| i + 1);
    discovery.expected = max_enhanced.max(max_source).unwrap_or(0);

    tracing::debug!(
        dir = %dir.display(),
        enhanced = discovery.enhanced.len(),
        sources = discovery.sources.len(),
        expected = discovery.expected,
        "Discovered segment files"
    );
    Ok(discovery)
}

/// Merge the enhanced segments in `dir` into `output`, then apply the
/// configured trim and gain.
///
/// Zero-byte or unreadable files count as failed segments, so a merge with
/// any of them fails with `IncompleteSequence` instead of silently producing
/// shorter audio.
pub fn merge_segments_dir(
    dir: &Path,
    suffix: &str,
    output: &Path,
    config: &PipelineConfig,
) -> VoicecleanResult<MergeSummary> {
    config.validate()?;
    let discovery = discover_enhanced(dir, suffix)?;

    let mut loaded: Vec<(usize, AudioStream)> = Vec::with_capacity(discovery.enhanced.len());
    let mut failed = Vec::new();
    for (index, path) in &discovery.enhanced {
        match load_enhanced(path, discovery.sources.get(index)) {
            Ok(stream) => loaded.push((*index, stream)),
            Err(reason) => {
                tracing::warn!(segment = *index, path = %path.display(), %reason, "Unusable enhanced segment");
                failed.push(SkippedSegment {
                    index: *index,
                    reason,
                });
            }
        }
    }

    loaded.sort_by_key(|(index, _)| *index);
    let mut offset_ms = 0u64;
    let mut segments: Vec<EnhancedSegment> = Vec::with_capacity(loaded.len());
    for (index, stream) in loaded {
        let info = SegmentInfo {
            index,
            start_offset_ms: offset_ms,
            duration_ms: stream.duration_ms(),
        };
        offset_ms += info.duration_ms;
        let enhanced = Segment::from_info(info, stream.clone())
            .into_enhanced(stream)
            .map_err(|e| VoicecleanError::processing(e.to_string()))?;
        segments.push(enhanced);
    }

    let merged = segments.len();
    let mut stream = Reassembler::new(discovery.expected).reassemble(segments)?;

    let trimmed = config.remove_silence;
    if trimmed {
        stream = SilenceTrimmer::new(SilenceParams::from(config)).trim(&stream)?;
    }
    stream = apply_gain(stream, config.gain_db);

    let output = Encoder::new(config.sample_rate).encode(&stream, output)?;
    tracing::info!(
        merged,
        expected = discovery.expected,
        trimmed,
        output = %output.path.display(),
        "Merged segments"
    );

    Ok(MergeSummary {
        expected: discovery.expected,
        merged,
        failed,
        output,
    })
}

/// Read an enhanced file, checking it against its raw segment when present.
fn load_enhanced(path: &Path, source: Option<&PathBuf>) -> Result<AudioStream, String> {
    let bytes = std::fs::metadata(path).map(|m| m.len()).map_err(|e| e.to_string())?;
    if bytes == 0 {
        return Err("zero-byte file".to_string());
    }
    let stream = read_wav(path).map_err(|e| e.to_string())?;
    if stream.is_empty() {
        return Err("file holds no audio".to_string());
    }

    if let Some(source) = source {
        let original = read_wav(source).map_err(|e| format!("raw segment unreadable: {e}"))?;
        if original.frames() != stream.frames() || original.sample_rate() != stream.sample_rate() {
            return Err(format!(
                "does not match raw segment ({} frames at {} Hz vs {} at {} Hz)",
                stream.frames(),
                stream.sample_rate(),
                original.frames(),
                original.sample_rate()
            ));
        }
    }
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voiceclean_audio_model::ENHANCED_SUFFIX;
    use voiceclean_codec::wav::{write_wav, WavEncoding};

    fn write_part(dir: &Path, part: usize, suffix: &str, value: f32, frames: usize) {
        let stream = AudioStream::mono(48_000, vec![value; frames]).unwrap();
        let name = format!("memo_part{part}{suffix}.wav");
        write_wav(&stream, &dir.join(name), WavEncoding::Float32).unwrap();
    }

    fn no_trim() -> PipelineConfig {
        PipelineConfig {
            remove_silence: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_discovery_uses_natural_order() {
        let dir = tempfile::tempdir().unwrap();
        for part in [10, 2, 9, 1] {
            write_part(dir.path(), part, ENHANCED_SUFFIX, 0.1, 48);
        }
        let discovery = discover_enhanced(dir.path(), ENHANCED_SUFFIX).unwrap();
        let order: Vec<usize> = discovery.enhanced.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 8, 9]);
        assert_eq!(discovery.expected, 10);
    }

    #[test]
    fn test_merge_orders_by_index_not_name() {
        let dir = tempfile::tempdir().unwrap();
        // 12 parts so that lexicographic order (1, 10, 11, 12, 2, ...) differs.
        for part in 1..=12 {
            write_part(dir.path(), part, ENHANCED_SUFFIX, part as f32 / 100.0, 480);
        }
        let out = dir.path().join("merged.wav");
        let summary = merge_segments_dir(dir.path(), ENHANCED_SUFFIX, &out, &no_trim()).unwrap();
        assert_eq!(summary.merged, 12);

        let merged = read_wav(&out).unwrap();
        assert_eq!(merged.frames(), 12 * 480);
        for part in 0..12 {
            let sample = merged.samples()[part * 480];
            let expected = (part + 1) as f32 / 100.0;
            assert!((sample - expected).abs() < 1e-3, "part {part}: {sample}");
        }
    }

    #[test]
    fn test_zero_byte_file_is_failed_segment() {
        let dir = tempfile::tempdir().unwrap();
        for part in 1..=3 {
            write_part(dir.path(), part, "", 0.2, 480);
        }
        write_part(dir.path(), 1, ENHANCED_SUFFIX, 0.2, 480);
        std::fs::write(dir.path().join("memo_part2_denoised.wav"), b"").unwrap();
        write_part(dir.path(), 3, ENHANCED_SUFFIX, 0.2, 480);

        let out = dir.path().join("merged.wav");
        let err = merge_segments_dir(dir.path(), ENHANCED_SUFFIX, &out, &no_trim()).unwrap_err();
        assert_eq!(err.missing_indices(), &[1]);
        assert!(!out.exists());
    }

    #[test]
    fn test_trailing_enhanced_file_never_written() {
        let dir = tempfile::tempdir().unwrap();
        for part in 1..=4 {
            write_part(dir.path(), part, "", 0.2, 480);
        }
        for part in 1..=3 {
            write_part(dir.path(), part, ENHANCED_SUFFIX, 0.2, 480);
        }
        let err = merge_segments_dir(
            dir.path(),
            ENHANCED_SUFFIX,
            &dir.path().join("merged.wav"),
            &no_trim(),
        )
        .unwrap_err();
        assert_eq!(err.missing_indices(), &[3]);
    }

    #[test]
    fn test_enhanced_length_must_match_raw() {
        let dir = tempfile::tempdir().unwrap();
        write_part(dir.path(), 1, "", 0.2, 480);
        write_part(dir.path(), 1, ENHANCED_SUFFIX, 0.2, 400);
        let err = merge_segments_dir(
            dir.path(),
            ENHANCED_SUFFIX,
            &dir.path().join("merged.wav"),
            &no_trim(),
        )
        .unwrap_err();
        assert_eq!(err.missing_indices(), &[] as &[usize]);
        assert!(matches!(err, VoicecleanError::EmptySet));
    }

    #[test]
    fn test_missing_dir() {
        let err = discover_enhanced(Path::new("/definitely/not/here"), ENHANCED_SUFFIX).unwrap_err();
        assert!(matches!(err, VoicecleanError::FileNotFound { .. }));
    }
}
