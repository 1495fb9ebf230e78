//! Fixed-length segmentation.
//!
//! A stream of `total` ms is cut into `ceil(total / L)` segments. Segment `i`
//! covers `[i*L, min((i+1)*L, total))`; its frames start at the frame of
//! `i*L` and the last segment runs to the final frame, so concatenating the
//! segments gives back the source sample-for-sample.

use voiceclean_audio_model::{AudioStream, Segment};
use voiceclean_common::error::{VoicecleanError, VoicecleanResult};

/// Splits streams into contiguous, non-overlapping segments.
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    segment_length_ms: u64,
}

impl Segmenter {
    /// Default segment length (one minute).
    pub const DEFAULT_SEGMENT_LENGTH_MS: u64 = 60_000;

    pub fn new(segment_length_ms: u64) -> VoicecleanResult<Self> {
        if segment_length_ms == 0 {
            return Err(VoicecleanError::invalid_config(
                "segment_length_ms must be greater than 0",
            ));
        }
        Ok(Self { segment_length_ms })
    }

    pub fn segment_length_ms(&self) -> u64 {
        self.segment_length_ms
    }

    /// Number of segments a stream of `total_duration_ms` yields.
    pub fn segment_count(&self, total_duration_ms: u64) -> usize {
        total_duration_ms.div_ceil(self.segment_length_ms) as usize
    }

    /// Split `stream` into segments covering it exactly.
    pub fn split(&self, stream: &AudioStream) -> VoicecleanResult<Vec<Segment>> {
        let total_ms = stream.duration_ms();
        if total_ms == 0 {
            return Err(VoicecleanError::EmptyStream);
        }

        let count = self.segment_count(total_ms);
        let frames = stream.frames();
        let mut segments = Vec::with_capacity(count);

        for index in 0..count {
            let start_ms = index as u64 * self.segment_length_ms;
            let end_ms = ((index as u64 + 1) * self.segment_length_ms).min(total_ms);
            let start_frame = stream.ms_to_frame(start_ms);
            let end_frame = if index + 1 == count {
                frames
            } else {
                stream.ms_to_frame(end_ms)
            };

            segments.push(Segment {
                index,
                start_offset_ms: start_ms,
                duration_ms: end_ms - start_ms,
                data: stream.slice_frames(start_frame..end_frame),
            });
        }

        tracing::debug!(
            total_ms,
            segment_length_ms = self.segment_length_ms,
            segments = segments.len(),
            "Split stream into segments"
        );

        Ok(segments)
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self {
            segment_length_ms: Self::DEFAULT_SEGMENT_LENGTH_MS,
        }
    }
}
