//! Silence detection and trimming.
//!
//! Loudness is measured as the RMS of a `min_silence_len_ms` window sliding
//! in 1 ms steps. Every window start at or below the threshold is silent;
//! overlapping or touching silent windows merge into one [`SilenceSpan`].
//! Trimming keeps the non-silent chunks, widened by `keep_silence_ms` on each
//! side, and deletes the rest.

use serde::{Deserialize, Serialize};
use voiceclean_audio_model::{AudioStream, SilenceSpan};
use voiceclean_common::config::PipelineConfig;
use voiceclean_common::error::VoicecleanResult;

/// Silence trimming parameters.
///
/// Not validated here; `PipelineConfig::validate` bounds them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SilenceParams {
    pub min_silence_len_ms: u64,
    pub silence_threshold_dbfs: f64,
    pub keep_silence_ms: u64,
}

impl Default for SilenceParams {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for SilenceParams {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            min_silence_len_ms: config.min_silence_len_ms,
            silence_threshold_dbfs: config.silence_threshold_dbfs,
            keep_silence_ms: config.keep_silence_ms,
        }
    }
}

/// Convert dBFS to a linear amplitude (full scale = 1.0).
pub fn dbfs_to_amplitude(dbfs: f64) -> f64 {
    10f64.powf(dbfs / 20.0)
}

/// Convert a linear RMS amplitude to dBFS. Digital silence is `-inf`.
pub fn amplitude_to_dbfs(amplitude: f64) -> f64 {
    if amplitude <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * amplitude.log10()
    }
}

/// RMS loudness of a whole stream in dBFS.
pub fn rms_dbfs(stream: &AudioStream) -> f64 {
    if stream.is_empty() {
        return f64::NEG_INFINITY;
    }
    let energy: f64 = stream.samples().iter().map(|s| (*s as f64).powi(2)).sum();
    amplitude_to_dbfs((energy / stream.samples().len() as f64).sqrt())
}

/// Detects silence spans and removes them from streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilenceTrimmer {
    params: SilenceParams,
}

impl SilenceTrimmer {
    pub fn new(params: SilenceParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SilenceParams {
        &self.params
    }

    /// Maximal spans whose windowed loudness stays at or below the threshold.
    pub fn detect_silence(&self, stream: &AudioStream) -> Vec<SilenceSpan> {
        let total_ms = stream.duration_ms();
        let window = self.params.min_silence_len_ms;
        if window == 0 || total_ms < window {
            return Vec::new();
        }

        let (energy, counts) = prefix_energy_per_ms(stream, total_ms);
        let threshold = dbfs_to_amplitude(self.params.silence_threshold_dbfs);
        let threshold_sq = threshold * threshold;

        let mut spans = Vec::new();
        let mut current: Option<(u64, u64)> = None;
        for start in 0..=(total_ms - window) {
            let end = (start + window) as usize;
            let start_idx = start as usize;
            let n = counts[end] - counts[start_idx];
            let mean_sq = if n == 0 {
                0.0
            } else {
                (energy[end] - energy[start_idx]).max(0.0) / n as f64
            };
            if mean_sq > threshold_sq {
                continue;
            }
            current = match current {
                Some((first, prev)) if start <= prev + window => Some((first, start)),
                Some((first, prev)) => {
                    spans.push(SilenceSpan::new(first, prev + window));
                    Some((start, start))
                }
                None => Some((start, start)),
            };
        }
        if let Some((first, prev)) = current {
            spans.push(SilenceSpan::new(first, prev + window));
        }
        spans
    }

    /// Complement of the silence spans over `[0, duration)`, as `(start_ms, end_ms)`.
    pub fn detect_nonsilent(&self, stream: &AudioStream) -> Vec<(u64, u64)> {
        let total_ms = stream.duration_ms();
        let spans = self.detect_silence(stream);
        nonsilent_ranges(&spans, total_ms)
    }

    /// Non-silent chunks widened by `keep_silence_ms`, clipped to the stream,
    /// with overlapping neighbours meeting at the midpoint of their overlap.
    pub fn chunk_ranges(&self, stream: &AudioStream) -> Vec<(u64, u64)> {
        let total_ms = stream.duration_ms();
        let nonsilent = self.detect_nonsilent(stream);
        pad_ranges(&nonsilent, self.params.keep_silence_ms, total_ms)
    }

    /// The padded non-silent chunks as separate streams.
    pub fn split(&self, stream: &AudioStream) -> Vec<AudioStream> {
        self.chunk_ranges(stream)
            .into_iter()
            .map(|(start, end)| stream.slice_ms(start, end))
            .collect()
    }

    /// Concatenate the padded non-silent chunks, deleting everything else.
    ///
    /// A stream that is silent throughout becomes an empty stream.
    pub fn trim(&self, stream: &AudioStream) -> VoicecleanResult<AudioStream> {
        let chunks = self.split(stream);
        let kept = chunks.len();
        let out = AudioStream::concat(stream.sample_rate(), stream.channel_count(), chunks)?;
        tracing::debug!(
            input_ms = stream.duration_ms(),
            output_ms = out.duration_ms(),
            chunks = kept,
            "Trimmed silence"
        );
        Ok(out)
    }
}

/// Prefix sums of squared samples and sample counts at each millisecond boundary.
fn prefix_energy_per_ms(stream: &AudioStream, total_ms: u64) -> (Vec<f64>, Vec<u64>) {
    let channels = stream.channel_count() as usize;
    let samples = stream.samples();
    let frames = stream.frames();

    let mut energy = Vec::with_capacity(total_ms as usize + 1);
    let mut counts = Vec::with_capacity(total_ms as usize + 1);
    energy.push(0.0f64);
    counts.push(0u64);

    let mut acc = 0.0f64;
    let mut count = 0u64;
    for ms in 0..total_ms {
        let start = stream.ms_to_frame(ms).min(frames);
        let end = stream.ms_to_frame(ms + 1).min(frames);
        for s in &samples[start * channels..end * channels] {
            acc += (*s as f64) * (*s as f64);
        }
        count += ((end - start) * channels) as u64;
        energy.push(acc);
        counts.push(count);
    }
    (energy, counts)
}

fn nonsilent_ranges(spans: &[SilenceSpan], total_ms: u64) -> Vec<(u64, u64)> {
    if spans.is_empty() {
        return if total_ms > 0 {
            vec![(0, total_ms)]
        } else {
            Vec::new()
        };
    }

    let mut ranges = Vec::new();
    let mut prev_end = 0u64;
    for span in spans {
        if span.start_ms > prev_end {
            ranges.push((prev_end, span.start_ms));
        }
        prev_end = prev_end.max(span.end_ms);
    }
    if prev_end < total_ms {
        ranges.push((prev_end, total_ms));
    }
    ranges
}

fn pad_ranges(ranges: &[(u64, u64)], keep_ms: u64, total_ms: u64) -> Vec<(u64, u64)> {
    let keep = keep_ms as i64;
    let mut padded: Vec<(i64, i64)> = ranges
        .iter()
        .map(|&(start, end)| (start as i64 - keep, end as i64 + keep))
        .collect();

    for i in 1..padded.len() {
        let last_end = padded[i - 1].1;
        let next_start = padded[i].0;
        if next_start < last_end {
            let mid = (last_end + next_start).div_euclid(2);
            padded[i - 1].1 = mid;
            padded[i].0 = mid;
        }
    }

    padded
        .into_iter()
        .map(|(start, end)| {
            let start = start.clamp(0, total_ms as i64) as u64;
            let end = end.clamp(0, total_ms as i64) as u64;
            (start, end.max(start))
        })
        .filter(|(start, end)| end > start)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const RATE: u32 = 48_000;

    /// Square wave at ±0.5 (about -6 dBFS) for loud blocks, zeros for silent ones.
    fn blocks(pattern: &[(bool, u64)]) -> AudioStream {
        let mut samples = Vec::new();
        for &(loud, ms) in pattern {
            let frames = (ms * RATE as u64 / 1000) as usize;
            samples.extend((0..frames).map(|i| {
                if !loud {
                    0.0
                } else if i % 2 == 0 {
                    0.5
                } else {
                    -0.5
                }
            }));
        }
        AudioStream::mono(RATE, samples).unwrap()
    }

    fn trimmer(min: u64, thresh: f64, keep: u64) -> SilenceTrimmer {
        SilenceTrimmer::new(SilenceParams {
            min_silence_len_ms: min,
            silence_threshold_dbfs: thresh,
            keep_silence_ms: keep,
        })
    }

    #[test]
    fn test_dbfs_conversions() {
        assert!((dbfs_to_amplitude(-40.0) - 0.01).abs() < 1e-12);
        assert!((amplitude_to_dbfs(0.1) + 20.0).abs() < 1e-9);
        assert_eq!(amplitude_to_dbfs(0.0), f64::NEG_INFINITY);
        let loud = blocks(&[(true, 100)]);
        assert!((rms_dbfs(&loud) - amplitude_to_dbfs(0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_fully_silent_stream_trims_to_empty() {
        let quiet = AudioStream::mono(RATE, vec![0.001; (5 * RATE) as usize]).unwrap();
        assert_eq!(quiet.duration_ms(), 5_000);

        let t = trimmer(500, -40.0, 100);
        assert_eq!(t.detect_silence(&quiet), vec![SilenceSpan::new(0, 5_000)]);
        let out = t.trim(&quiet).unwrap();
        assert_eq!(out.duration_ms(), 0);
        assert_eq!(out.sample_rate(), RATE);
    }

    #[test]
    fn test_interior_spans_keep_padding_on_both_edges() {
        let stream = blocks(&[
            (true, 1_000),
            (false, 600),
            (true, 1_400),
            (false, 1_000),
            (true, 1_000),
        ]);
        let t = trimmer(500, -40.0, 100);

        assert_eq!(
            t.detect_silence(&stream),
            vec![SilenceSpan::new(1_000, 1_600), SilenceSpan::new(3_000, 4_000)]
        );
        assert_eq!(
            t.chunk_ranges(&stream),
            vec![(0, 1_100), (1_500, 3_100), (3_900, 5_000)]
        );

        let out = t.trim(&stream).unwrap();
        assert_eq!(out.duration_ms(), 3_800);

        // Each span is reduced to 100 ms kept on each side: 200 ms of zeros.
        let zeros = longest_zero_runs(&out);
        assert_eq!(zeros, vec![200 * 48, 200 * 48]);
    }

    fn longest_zero_runs(stream: &AudioStream) -> Vec<usize> {
        let mut runs = Vec::new();
        let mut run = 0usize;
        for s in stream.samples() {
            if *s == 0.0 {
                run += 1;
            } else if run > 0 {
                runs.push(run);
                run = 0;
            }
        }
        if run > 0 {
            runs.push(run);
        }
        runs
    }

    #[test]
    fn test_short_gaps_are_kept() {
        let stream = blocks(&[(true, 1_000), (false, 300), (true, 1_000)]);
        let t = trimmer(500, -40.0, 100);
        assert!(t.detect_silence(&stream).is_empty());
        assert_eq!(t.trim(&stream).unwrap(), stream);
    }

    #[test]
    fn test_lead_and_trail_silence_clipped_to_keep() {
        let stream = blocks(&[(false, 2_000), (true, 500), (false, 2_000)]);
        let t = trimmer(500, -40.0, 100);
        assert_eq!(t.chunk_ranges(&stream), vec![(1_900, 2_600)]);
        assert_eq!(t.trim(&stream).unwrap().duration_ms(), 700);
    }

    #[test]
    fn test_overlapping_padding_meets_at_midpoint() {
        let stream = blocks(&[(true, 1_000), (false, 500), (true, 1_000)]);
        let t = trimmer(500, -40.0, 400);
        assert_eq!(
            t.chunk_ranges(&stream),
            vec![(0, 1_250), (1_250, 2_500)]
        );
        assert_eq!(t.trim(&stream).unwrap(), stream);
    }

    #[test]
    fn test_stream_shorter_than_window_is_untouched() {
        let stream = AudioStream::mono(RATE, vec![0.0; 4_800]).unwrap();
        let t = trimmer(500, -40.0, 100);
        assert!(t.detect_silence(&stream).is_empty());
        assert_eq!(t.trim(&stream).unwrap(), stream);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // Constant 0.01 is exactly -40 dBFS.
        let stream = AudioStream::mono(RATE, vec![0.01; RATE as usize]).unwrap();
        assert_eq!(trimmer(500, -40.0, 0).detect_silence(&stream).len(), 1);
        assert!(trimmer(500, -41.0, 0).detect_silence(&stream).is_empty());
    }

    proptest! {
        #[test]
        fn prop_trimming_is_idempotent(
            pattern in prop::collection::vec((any::<bool>(), 1u64..150), 1..12),
            keep in 0u64..200,
        ) {
            let pattern: Vec<(bool, u64)> = pattern.into_iter().map(|(l, d)| (l, d * 10)).collect();
            let stream = blocks(&pattern);
            let t = trimmer(500, -40.0, keep);

            let once = t.trim(&stream).unwrap();
            let twice = t.trim(&once).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
