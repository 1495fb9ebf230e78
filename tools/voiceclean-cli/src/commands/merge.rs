//! Rebuild output from the enhanced segments of an earlier job.

use std::path::PathBuf;

use voiceclean_common::config::PipelineConfig;
use voiceclean_pipeline::merge_segments_dir;

pub fn run(
    segments_dir: PathBuf,
    output: PathBuf,
    suffix: String,
    config: PipelineConfig,
) -> anyhow::Result<()> {
    println!("Merging segments in: {}", segments_dir.display());

    let summary = merge_segments_dir(&segments_dir, &suffix, &output, &config).map_err(|e| {
        let missing = e.missing_indices();
        if !missing.is_empty() {
            let parts: Vec<String> = missing.iter().map(|i| (i + 1).to_string()).collect();
            println!("  Missing segments (part numbers): {}", parts.join(", "));
        }
        anyhow::anyhow!("Merge failed: {e}")
    })?;

    for failed in &summary.failed {
        println!("  [WARN] part {}: {}", failed.index + 1, failed.reason);
    }
    println!(
        "Merged {}/{} segments into {} ({:.1}s)",
        summary.merged,
        summary.expected,
        summary.output.path.display(),
        summary.output.duration_ms as f64 / 1000.0
    );
    Ok(())
}
