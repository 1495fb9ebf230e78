//! voiceclean Audio Model
//!
//! Defines the data contracts passed between pipeline stages:
//! - **AudioStream:** interleaved PCM with a fixed rate and channel count
//! - **Segment / EnhancedSegment:** indexed slices of a stream, before and after enhancement
//! - **SilenceSpan:** a detected low-energy region
//! - **JobLayout:** the per-job working directory and its file names
//!
//! Time is expressed in whole milliseconds. Millisecond `m` starts at frame
//! `floor(m * sample_rate / 1000)`.

pub mod segment;
pub mod span;
pub mod stream;
pub mod workdir;

pub use segment::*;
pub use span::*;
pub use stream::*;
pub use workdir::*;
