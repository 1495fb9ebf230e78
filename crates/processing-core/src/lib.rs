//! voiceclean Processing Core
//!
//! The stream transformations of the cleaning pipeline:
//! - **Segmenter:** split a stream into fixed-length, contiguous segments
//! - **Reassembler:** put enhanced segments back together by index
//! - **Silence Trimmer:** drop interior silence, keeping padding around speech
//! - **Gain:** fixed dB gain with clipping
//! - **Resampling:** linear-interpolation rate conversion
//!
//! This crate is pure computation with no I/O.
//! All inputs are data; all outputs are data.

pub mod gain;
pub mod natural;
pub mod reassembler;
pub mod resample;
pub mod segmenter;
pub mod silence;

pub use natural::natural_cmp;
pub use reassembler::Reassembler;
pub use segmenter::Segmenter;
pub use silence::{SilenceParams, SilenceTrimmer};
