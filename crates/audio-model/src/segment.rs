//! Indexed slices of a stream, before and after enhancement.

use serde::{Deserialize, Serialize};

use crate::stream::AudioStream;

/// Position of a segment within its source stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentInfo {
    /// 0-based, dense position in the source.
    pub index: usize,
    pub start_offset_ms: u64,
    pub duration_ms: u64,
}

impl SegmentInfo {
    pub fn end_offset_ms(&self) -> u64 {
        self.start_offset_ms + self.duration_ms
    }
}

/// A bounded, contiguous slice of a source stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub index: usize,
    pub start_offset_ms: u64,
    pub duration_ms: u64,
    pub data: AudioStream,
}

/// Why an enhanced stream cannot stand in for its source segment.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SegmentMismatch {
    #[error("sample rate changed from {expected} Hz to {actual} Hz")]
    SampleRate { expected: u32, actual: u32 },

    #[error("channel count changed from {expected} to {actual}")]
    Channels { expected: u16, actual: u16 },

    #[error("frame count changed from {expected} to {actual}")]
    Frames { expected: usize, actual: usize },
}

impl Segment {
    pub fn from_info(info: SegmentInfo, data: AudioStream) -> Self {
        Self {
            index: info.index,
            start_offset_ms: info.start_offset_ms,
            duration_ms: info.duration_ms,
            data,
        }
    }

    pub fn info(&self) -> SegmentInfo {
        SegmentInfo {
            index: self.index,
            start_offset_ms: self.start_offset_ms,
            duration_ms: self.duration_ms,
        }
    }

    pub fn end_offset_ms(&self) -> u64 {
        self.start_offset_ms + self.duration_ms
    }

    /// Replace the segment's samples with enhanced ones.
    ///
    /// Rate, channel count, and frame count must match the source exactly.
    pub fn into_enhanced(self, data: AudioStream) -> Result<EnhancedSegment, SegmentMismatch> {
        if data.sample_rate() != self.data.sample_rate() {
            return Err(SegmentMismatch::SampleRate {
                expected: self.data.sample_rate(),
                actual: data.sample_rate(),
            });
        }
        if data.channel_count() != self.data.channel_count() {
            return Err(SegmentMismatch::Channels {
                expected: self.data.channel_count(),
                actual: data.channel_count(),
            });
        }
        if data.frames() != self.data.frames() {
            return Err(SegmentMismatch::Frames {
                expected: self.data.frames(),
                actual: data.frames(),
            });
        }
        Ok(EnhancedSegment {
            info: self.info(),
            data,
        })
    }
}

/// A segment whose samples passed through the enhancer.
///
/// Only constructible through [`Segment::into_enhanced`], so duration and
/// format always match the source segment.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancedSegment {
    info: SegmentInfo,
    data: AudioStream,
}

impl EnhancedSegment {
    pub fn index(&self) -> usize {
        self.info.index
    }

    pub fn info(&self) -> SegmentInfo {
        self.info
    }

    pub fn start_offset_ms(&self) -> u64 {
        self.info.start_offset_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.info.duration_ms
    }

    pub fn data(&self) -> &AudioStream {
        &self.data
    }

    pub fn into_data(self) -> AudioStream {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(frames: usize) -> Segment {
        Segment {
            index: 2,
            start_offset_ms: 2000,
            duration_ms: 1000,
            data: AudioStream::mono(frames as u32, vec![0.5; frames]).unwrap(),
        }
    }

    #[test]
    fn test_into_enhanced_keeps_identity() {
        let seg = segment(100);
        let enhanced = seg
            .into_enhanced(AudioStream::mono(100, vec![0.1; 100]).unwrap())
            .unwrap();
        assert_eq!(enhanced.index(), 2);
        assert_eq!(enhanced.start_offset_ms(), 2000);
        assert_eq!(enhanced.duration_ms(), 1000);
        assert_eq!(enhanced.data().samples()[0], 0.1);
    }

    #[test]
    fn test_into_enhanced_rejects_changed_duration() {
        let err = segment(100)
            .into_enhanced(AudioStream::mono(100, vec![0.1; 99]).unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            SegmentMismatch::Frames {
                expected: 100,
                actual: 99
            }
        );
    }

    #[test]
    fn test_into_enhanced_rejects_changed_format() {
        let err = segment(100)
            .into_enhanced(AudioStream::mono(200, vec![0.1; 100]).unwrap())
            .unwrap_err();
        assert!(matches!(err, SegmentMismatch::SampleRate { .. }));

        let err = segment(100)
            .into_enhanced(AudioStream::new(100, 2, vec![0.1; 200]).unwrap())
            .unwrap_err();
        assert!(matches!(err, SegmentMismatch::Channels { .. }));
    }
}
