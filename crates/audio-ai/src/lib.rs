//! voiceclean Audio Enhancement
//!
//! Pluggable enhancement functions and the adapter that applies one to a
//! segment without ever changing its duration or format:
//! - **Passthrough:** identity, for exercising the pipeline
//! - **Noise gate:** built-in floor-tracking gate
//! - **Command:** external denoiser program such as `deep-filter`

pub mod adapter;
pub mod command;
pub mod enhancer;
pub mod noise;

pub use adapter::EnhancerAdapter;
pub use command::CommandEnhancer;
pub use enhancer::{build_enhancer, Enhancer, Passthrough, SegmentEnhanceError};
pub use noise::NoiseGate;
