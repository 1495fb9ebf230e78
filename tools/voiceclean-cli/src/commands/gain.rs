//! Fixed gain on its own.

use std::path::PathBuf;

use voiceclean_codec::{read_wav, Encoder};
use voiceclean_common::config::PipelineConfig;
use voiceclean_processing_core::gain::apply_gain;

pub fn run(input: PathBuf, output: PathBuf, db: f64) -> anyhow::Result<()> {
    let config = PipelineConfig {
        gain_db: db,
        ..Default::default()
    };
    config.validate()?;

    let stream = read_wav(&input)?;
    let before = stream.peak();
    let gained = apply_gain(stream, db);
    let summary = Encoder::new(config.sample_rate).encode(&gained, &output)?;

    println!(
        "Applied {db:+.1} dB: peak {before:.3} -> {:.3}, wrote {}",
        gained.peak(),
        summary.path.display()
    );
    Ok(())
}
