//! Run clock and timestamp utilities.
//!
//! Every job is stamped with the UTC wall-clock time it started. The stamp
//! names the job directory and the output files so repeated runs on the same
//! input never collide.

use std::time::Instant;

use chrono::{DateTime, Utc};

/// Format used for run timestamps in file and directory names.
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A clock anchored to the start of a pipeline run.
#[derive(Debug, Clone)]
pub struct RunClock {
    started: Instant,
    started_wall: DateTime<Utc>,
}

impl RunClock {
    /// Create a clock anchored to now.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            started_wall: Utc::now(),
        }
    }

    /// Create a clock from a known wall-clock start (deterministic naming in tests).
    pub fn from_wall(started_wall: DateTime<Utc>) -> Self {
        Self {
            started: Instant::now(),
            started_wall,
        }
    }

    /// `YYYYMMDD_HHMMSS` stamp of the run start (UTC).
    pub fn timestamp(&self) -> String {
        format_run_timestamp(&self.started_wall)
    }

    /// Wall-clock start as RFC 3339.
    pub fn started_rfc3339(&self) -> String {
        self.started_wall.to_rfc3339()
    }

    /// Milliseconds elapsed since the run started.
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Seconds elapsed since the run started.
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

/// Format a UTC instant as a run timestamp.
pub fn format_run_timestamp(at: &DateTime<Utc>) -> String {
    at.format(RUN_TIMESTAMP_FORMAT).to_string()
}

/// Current UTC time as a run timestamp.
pub fn run_timestamp() -> String {
    format_run_timestamp(&Utc::now())
}
