//! Ordered reassembly of enhanced segments.
//!
//! Segments arrive in whatever order the workers finish. They are put back
//! in order by their `index` only; arrival order and file names play no part.

use std::collections::BTreeSet;

use voiceclean_audio_model::{AudioStream, EnhancedSegment};
use voiceclean_common::error::{VoicecleanError, VoicecleanResult};

/// Concatenates a complete, dense set of enhanced segments.
#[derive(Debug, Clone, Copy)]
pub struct Reassembler {
    expected: usize,
}

impl Reassembler {
    /// `expected` is the number of segments the source was split into.
    pub fn new(expected: usize) -> Self {
        Self { expected }
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Indices in `0..expected` that are not present in `present`.
    pub fn missing_indices(&self, present: impl IntoIterator<Item = usize>) -> Vec<usize> {
        let present: BTreeSet<usize> = present.into_iter().collect();
        (0..self.expected).filter(|i| !present.contains(i)).collect()
    }

    /// Sort by index and concatenate into one stream.
    ///
    /// Fails with `EmptySet` when nothing was supplied and with
    /// `IncompleteSequence` when any index in `0..expected` is absent.
    pub fn reassemble(&self, mut segments: Vec<EnhancedSegment>) -> VoicecleanResult<AudioStream> {
        if segments.is_empty() {
            return Err(VoicecleanError::EmptySet);
        }

        segments.sort_by_key(|s| s.index());

        if let Some(stray) = segments.iter().find(|s| s.index() >= self.expected) {
            return Err(VoicecleanError::processing(format!(
                "segment index {} is outside the expected range 0..{}",
                stray.index(),
                self.expected
            )));
        }
        if let Some(pair) = segments.windows(2).find(|p| p[0].index() == p[1].index()) {
            return Err(VoicecleanError::processing(format!(
                "segment index {} supplied more than once",
                pair[0].index()
            )));
        }

        let missing = self.missing_indices(segments.iter().map(|s| s.index()));
        if !missing.is_empty() {
            tracing::warn!(
                expected = self.expected,
                present = segments.len(),
                ?missing,
                "Refusing to reassemble incomplete segment sequence"
            );
            return Err(VoicecleanError::IncompleteSequence {
                expected: self.expected,
                missing,
            });
        }

        for pair in segments.windows(2) {
            if pair[0].start_offset_ms() + pair[0].duration_ms() != pair[1].start_offset_ms() {
                return Err(VoicecleanError::processing(format!(
                    "segments {} and {} are not adjacent ({}+{} ms vs {} ms)",
                    pair[0].index(),
                    pair[1].index(),
                    pair[0].start_offset_ms(),
                    pair[0].duration_ms(),
                    pair[1].start_offset_ms()
                )));
            }
        }

        let first = segments[0].data();
        let (rate, channels) = (first.sample_rate(), first.channel_count());
        let stream = AudioStream::concat(
            rate,
            channels,
            segments.into_iter().map(EnhancedSegment::into_data),
        )?;

        tracing::debug!(
            segments = self.expected,
            duration_ms = stream.duration_ms(),
            "Reassembled segments"
        );
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::Segmenter;
    use proptest::prelude::*;
    use voiceclean_audio_model::Segment;

    fn identity(segment: Segment) -> EnhancedSegment {
        let data = segment.data.clone();
        segment.into_enhanced(data).unwrap()
    }

    fn source(frames: usize) -> AudioStream {
        AudioStream::mono(1000, (0..frames).map(|i| i as f32).collect()).unwrap()
    }

    #[test]
    fn test_order_comes_from_index_not_arrival() {
        let stream = source(12_000);
        let mut enhanced: Vec<EnhancedSegment> = Segmenter::new(1000)
            .unwrap()
            .split(&stream)
            .unwrap()
            .into_iter()
            .map(identity)
            .collect();
        // 9, 10, 2, ... mimics lexicographic file order
        enhanced.swap(2, 9);
        enhanced.swap(3, 10);
        enhanced.reverse();

        let out = Reassembler::new(12).reassemble(enhanced).unwrap();
        assert_eq!(out, stream);
    }

    #[test]
    fn test_missing_index_is_named() {
        let stream = source(5_000);
        let enhanced: Vec<EnhancedSegment> = Segmenter::new(1000)
            .unwrap()
            .split(&stream)
            .unwrap()
            .into_iter()
            .filter(|s| s.index != 3)
            .map(identity)
            .collect();

        let err = Reassembler::new(5).reassemble(enhanced).unwrap_err();
        match err {
            VoicecleanError::IncompleteSequence { expected, missing } => {
                assert_eq!(expected, 5);
                assert_eq!(missing, vec![3]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_trailing_segments_missing() {
        let stream = source(3_000);
        let enhanced: Vec<EnhancedSegment> = Segmenter::new(1000)
            .unwrap()
            .split(&stream)
            .unwrap()
            .into_iter()
            .map(identity)
            .collect();
        let err = Reassembler::new(5).reassemble(enhanced).unwrap_err();
        assert_eq!(err.missing_indices(), &[3, 4]);
    }

    #[test]
    fn test_empty_set() {
        let err = Reassembler::new(3).reassemble(Vec::new()).unwrap_err();
        assert!(matches!(err, VoicecleanError::EmptySet));
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let stream = source(2_000);
        let mut enhanced: Vec<EnhancedSegment> = Segmenter::new(1000)
            .unwrap()
            .split(&stream)
            .unwrap()
            .into_iter()
            .map(identity)
            .collect();
        enhanced.push(enhanced[1].clone());
        let err = Reassembler::new(2).reassemble(enhanced).unwrap_err();
        assert!(matches!(err, VoicecleanError::Processing { .. }));
    }

    proptest! {
        #[test]
        fn prop_identity_reassembly_is_left_inverse(
            samples in prop::collection::vec(-1.0f32..1.0, 1..6_000),
            length_ms in 1u64..1_500,
            seed in any::<u64>(),
        ) {
            let stream = AudioStream::mono(8_000, samples).unwrap();
            let segments = Segmenter::new(length_ms).unwrap().split(&stream).unwrap();
            let count = segments.len();
            let mut enhanced: Vec<EnhancedSegment> = segments.into_iter().map(identity).collect();
            let len = enhanced.len();
            enhanced.rotate_left((seed as usize) % len);

            let out = Reassembler::new(count).reassemble(enhanced).unwrap();
            prop_assert_eq!(out, stream);
        }
    }
}
