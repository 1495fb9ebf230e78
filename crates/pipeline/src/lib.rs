//! voiceclean Pipeline
//!
//! Runs one job from input file to cleaned output. Each job owns an
//! exclusive working directory and leaves every intermediate artifact in it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      PipelineJob                          │
//! │                                                           │
//! │  decode ─► segment ─► ┌─────────────────┐ ─► reassemble   │
//! │                       │ worker pool (N) │        │        │
//! │                       │ enhance segment │        ▼        │
//! │                       └─────────────────┘   trim ─► gain  │
//! │                                                  │        │
//! │                                                  ▼        │
//! │                                               encode      │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │  <TS>_<stem>/  segments, enhanced, output, report    │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod cancel;
pub mod fanout;
pub mod job;
pub mod recover;
pub mod report;

pub use cancel::CancelToken;
pub use job::*;
pub use recover::{discover_enhanced, merge_segments_dir, MergeSummary};
pub use report::{JobReport, JobStatus, SkippedSegment};
