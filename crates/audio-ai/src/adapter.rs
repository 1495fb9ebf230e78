//! Applies an enhancer to a segment without changing its shape.

use voiceclean_audio_model::{AudioStream, EnhancedSegment, Segment};
use voiceclean_processing_core::resample::{resample, resample_to_frames};

use crate::enhancer::{Enhancer, SegmentEnhanceError};

/// Bridges a segment to an [`Enhancer`].
///
/// The segment is converted to the enhancer's rate, enhanced channel by
/// channel, converted back to exactly the source frame count, and turned into
/// an [`EnhancedSegment`] through the checked conversion.
#[derive(Clone, Copy)]
pub struct EnhancerAdapter<'a> {
    enhancer: &'a dyn Enhancer,
}

impl<'a> EnhancerAdapter<'a> {
    pub fn new(enhancer: &'a dyn Enhancer) -> Self {
        Self { enhancer }
    }

    pub fn enhancer(&self) -> &'a dyn Enhancer {
        self.enhancer
    }

    pub fn enhance(&self, segment: Segment) -> Result<EnhancedSegment, SegmentEnhanceError> {
        let source_rate = segment.data.sample_rate();
        let source_frames = segment.data.frames();
        let working_rate = self.enhancer.sample_rate().unwrap_or(source_rate);

        let working = resample(&segment.data, working_rate)?;

        let mut channels = Vec::with_capacity(working.channel_count() as usize);
        for c in 0..working.channel_count() {
            let input = working.channel(c);
            let output = self.enhancer.enhance(&input, working_rate)?;
            if output.len() != input.len() {
                return Err(SegmentEnhanceError::LengthMismatch {
                    expected: input.len(),
                    actual: output.len(),
                });
            }
            if let Some(position) = output.iter().position(|s| !s.is_finite()) {
                return Err(SegmentEnhanceError::NonFinite { position });
            }
            channels.push(output);
        }

        let enhanced = AudioStream::from_channels(working_rate, channels)?;
        let restored = resample_to_frames(&enhanced, source_rate, source_frames)?;

        tracing::debug!(
            segment = segment.index,
            enhancer = self.enhancer.name(),
            frames = source_frames,
            "Segment enhanced"
        );
        Ok(segment.into_enhanced(restored)?)
    }
}
