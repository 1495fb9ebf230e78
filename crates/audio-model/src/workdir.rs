//! Per-job working directory layout.
//!
//! ```text
//! <work_dir>/<TS>_<stem>/
//!   <stem>.wav                                normalized input
//!   <stem>_chopped/<stem>_part<N>.wav         segment N (N = index + 1)
//!   <stem>_chopped/<stem>_part<N>_denoised.wav
//!   <stem>_denoised_<TS>.wav                  reassembled
//!   <stem>_denoised_trimmed_<TS>.wav          silence-trimmed
//!   report.json
//! ```

use std::path::{Path, PathBuf};

/// Suffix of the directory that holds segment files.
pub const SEGMENTS_DIR_SUFFIX: &str = "_chopped";
/// Suffix marking an enhanced segment and the reassembled output.
pub const ENHANCED_SUFFIX: &str = "_denoised";
/// Suffix marking the silence-trimmed output.
pub const TRIMMED_SUFFIX: &str = "_trimmed";
/// Suffix marking a gain-adjusted output.
pub const GAIN_SUFFIX: &str = "_gain";
/// Marker preceding the 1-based part number in segment file names.
pub const PART_MARKER: &str = "_part";

const REPORT_FILE: &str = "report.json";

/// Error raised while creating a job directory.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<LayoutError> for voiceclean_common::error::VoicecleanError {
    fn from(err: LayoutError) -> Self {
        match err {
            LayoutError::Io { source, .. } => Self::Io(source),
        }
    }
}

/// File names of one job's artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLayout {
    root: PathBuf,
    stem: String,
    timestamp: String,
}

impl JobLayout {
    /// Describe a layout rooted at an existing directory.
    pub fn from_root(root: impl Into<PathBuf>, stem: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            stem: stem.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Create an exclusive job directory `<work_dir>/<timestamp>_<stem>`.
    ///
    /// If that directory already exists (two jobs in the same second), a
    /// `-2`, `-3`, ... suffix is appended until creation succeeds.
    pub fn create(work_dir: &Path, input: &Path, timestamp: &str) -> Result<Self, LayoutError> {
        std::fs::create_dir_all(work_dir).map_err(|e| LayoutError::Io {
            path: work_dir.to_path_buf(),
            source: e,
        })?;

        let stem = file_stem(input);
        let base = format!("{timestamp}_{stem}");
        let mut attempt = 1u32;
        loop {
            let name = if attempt == 1 {
                base.clone()
            } else {
                format!("{base}-{attempt}")
            };
            let root = work_dir.join(name);
            match std::fs::create_dir(&root) {
                Ok(()) => {
                    let layout = Self::from_root(root, stem, timestamp);
                    let segments_dir = layout.segments_dir();
                    std::fs::create_dir_all(&segments_dir).map_err(|e| LayoutError::Io {
                        path: segments_dir,
                        source: e,
                    })?;
                    return Ok(layout);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(LayoutError::Io { path: root, source: e }),
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Normalized input WAV.
    pub fn normalized_path(&self) -> PathBuf {
        self.root.join(format!("{}.wav", self.stem))
    }

    pub fn segments_dir(&self) -> PathBuf {
        self.root.join(format!("{}{SEGMENTS_DIR_SUFFIX}", self.stem))
    }

    pub fn segment_path(&self, index: usize) -> PathBuf {
        self.segments_dir().join(segment_file_name(&self.stem, index, ""))
    }

    pub fn enhanced_segment_path(&self, index: usize) -> PathBuf {
        self.segments_dir()
            .join(segment_file_name(&self.stem, index, ENHANCED_SUFFIX))
    }

    /// Reassembled (denoised) stream.
    pub fn denoised_path(&self) -> PathBuf {
        self.root
            .join(format!("{}{ENHANCED_SUFFIX}_{}.wav", self.stem, self.timestamp))
    }

    /// Silence-trimmed stream.
    pub fn trimmed_path(&self) -> PathBuf {
        self.root.join(format!(
            "{}{ENHANCED_SUFFIX}{TRIMMED_SUFFIX}_{}.wav",
            self.stem, self.timestamp
        ))
    }

    /// Final output for the stages that ran after reassembly.
    pub fn output_path(&self, trimmed: bool, gained: bool) -> PathBuf {
        let mut suffix = String::from(ENHANCED_SUFFIX);
        if trimmed {
            suffix.push_str(TRIMMED_SUFFIX);
        }
        if gained {
            suffix.push_str(GAIN_SUFFIX);
        }
        self.root
            .join(format!("{}{suffix}_{}.wav", self.stem, self.timestamp))
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join(REPORT_FILE)
    }
}

/// Base name of a file without its extension; `audio` when there is none.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "audio".to_string())
}

/// `<stem>_part<index + 1><suffix>.wav`
pub fn segment_file_name(stem: &str, index: usize, suffix: &str) -> String {
    format!("{stem}{PART_MARKER}{}{suffix}.wav", index + 1)
}

/// Parse the 0-based segment index out of a segment file name.
///
/// The name must end in `<PART_MARKER><digits><suffix>.wav`. Returns `None`
/// for anything else, including part number 0.
pub fn segment_index_from_name(name: &str, suffix: &str) -> Option<usize> {
    let rest = name.strip_suffix(".wav")?.strip_suffix(suffix)?;
    let marker = rest.rfind(PART_MARKER)?;
    let digits = &rest[marker + PART_MARKER.len()..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<usize>().ok()?.checked_sub(1)
}
