//! Silence trimming on its own.

use std::path::PathBuf;

use voiceclean_codec::{read_wav, Encoder};
use voiceclean_common::config::PipelineConfig;
use voiceclean_processing_core::{SilenceParams, SilenceTrimmer};

pub fn run(input: PathBuf, output: PathBuf, config: PipelineConfig) -> anyhow::Result<()> {
    config.validate()?;
    let stream = read_wav(&input)?;
    let params = SilenceParams::from(&config);

    println!("Trimming: {}", input.display());
    println!(
        "  Min silence: {} ms, threshold: {} dBFS, keep: {} ms",
        params.min_silence_len_ms, params.silence_threshold_dbfs, params.keep_silence_ms
    );

    let trimmer = SilenceTrimmer::new(params);
    let spans = trimmer.detect_silence(&stream);
    let trimmed = trimmer.trim(&stream)?;
    let summary = Encoder::new(config.sample_rate).encode(&trimmed, &output)?;

    println!("  Silence spans: {}", spans.len());
    println!(
        "Done: {} ({:.1}s -> {:.1}s)",
        summary.path.display(),
        stream.duration_ms() as f64 / 1000.0,
        summary.duration_ms as f64 / 1000.0
    );
    Ok(())
}
