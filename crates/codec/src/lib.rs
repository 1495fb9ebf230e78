//! voiceclean Codec
//!
//! Gets audio in and out of the pipeline's canonical form.
//!
//! # Flow
//!
//! ```text
//! input.m4a ──► ffmpeg ──┐
//!                        ├──► <stem>.wav (48 kHz mono) ──► AudioStream
//! input.wav ──► hound ───┘
//!
//! AudioStream ──► resample (if needed) ──► 16-bit PCM WAV ──► output.wav
//! ```
//!
//! Every file is written under a temporary name and renamed into place, so a
//! half-written file never carries a final name.

pub mod decode;
pub mod encode;
pub mod ffmpeg;
pub mod wav;

pub use decode::{normalize, DecodeBackend, FfmpegDecoder, NativeWavDecoder};
pub use encode::{EncodeSummary, Encoder};
pub use wav::{read_wav, write_wav, WavEncoding};
