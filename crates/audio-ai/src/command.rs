//! External denoiser programs.

use std::path::{Path, PathBuf};

use voiceclean_audio_model::AudioStream;
use voiceclean_codec::ffmpeg::{command_exists, run_tool};
use voiceclean_codec::wav::{read_wav, write_wav, WavEncoding};
use voiceclean_common::config::CommandEnhancerConfig;
use voiceclean_common::error::{VoicecleanError, VoicecleanResult};
use voiceclean_processing_core::resample::{downmix_to_mono, resample_to_frames, resampled_len};

use crate::enhancer::{Enhancer, SegmentEnhanceError};

const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{output}";
const OUTPUT_DIR_PLACEHOLDER: &str = "{output_dir}";

/// Runs an external program once per channel of each segment.
///
/// The channel is written to a scratch WAV, the program is invoked with the
/// placeholders in its arguments substituted, and its output WAV is read
/// back. Programs that only accept an output directory (like `deep-filter`)
/// must leave exactly one WAV in it.
#[derive(Debug, Clone)]
pub struct CommandEnhancer {
    config: CommandEnhancerConfig,
}

impl CommandEnhancer {
    pub fn new(config: CommandEnhancerConfig) -> VoicecleanResult<Self> {
        if config.program.trim().is_empty() {
            return Err(VoicecleanError::invalid_config(
                "enhancer.command.program must not be empty",
            ));
        }
        if config.sample_rate == 0 {
            return Err(VoicecleanError::invalid_config(
                "enhancer.command.sample_rate must be greater than 0",
            ));
        }
        if !config.args.iter().any(|a| a.contains(INPUT_PLACEHOLDER)) {
            return Err(VoicecleanError::invalid_config(
                "enhancer.command.args must reference {input}",
            ));
        }
        Ok(Self { config })
    }

    fn substitute(&self, input: &Path, output: &Path, output_dir: &Path) -> Vec<String> {
        self.config
            .args
            .iter()
            .map(|arg| {
                arg.replace(OUTPUT_DIR_PLACEHOLDER, &output_dir.display().to_string())
                    .replace(OUTPUT_PLACEHOLDER, &output.display().to_string())
                    .replace(INPUT_PLACEHOLDER, &input.display().to_string())
            })
            .collect()
    }

    /// The file the program produced: `output` itself, or the only WAV in `output_dir`.
    fn locate_output(output: &Path, output_dir: &Path) -> Result<PathBuf, SegmentEnhanceError> {
        if output.is_file() {
            return Ok(output.to_path_buf());
        }
        let entries = std::fs::read_dir(output_dir)
            .map_err(|e| SegmentEnhanceError::io(output_dir, e.to_string()))?;
        let mut wavs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("wav"))
                    .unwrap_or(false)
            })
            .collect();
        match wavs.len() {
            1 => Ok(wavs.remove(0)),
            0 => Err(SegmentEnhanceError::enhancer(
                "program exited successfully but wrote no WAV output",
            )),
            n => Err(SegmentEnhanceError::enhancer(format!(
                "program wrote {n} WAV files; expected exactly one"
            ))),
        }
    }
}

impl Enhancer for CommandEnhancer {
    fn name(&self) -> &str {
        &self.config.program
    }

    fn sample_rate(&self) -> Option<u32> {
        Some(self.config.sample_rate)
    }

    fn is_available(&self) -> bool {
        let program = Path::new(&self.config.program);
        if program.components().count() > 1 {
            program.is_file()
        } else {
            command_exists(&self.config.program)
        }
    }

    fn enhance(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<f32>, SegmentEnhanceError> {
        let scratch = tempfile::Builder::new()
            .prefix("voiceclean-enhance-")
            .tempdir()
            .map_err(|e| SegmentEnhanceError::io(std::env::temp_dir(), e.to_string()))?;
        let input = scratch.path().join("segment.wav");
        let output_dir = scratch.path().join("enhanced");
        let output = output_dir.join("segment.wav");
        std::fs::create_dir_all(&output_dir)
            .map_err(|e| SegmentEnhanceError::io(&output_dir, e.to_string()))?;

        let stream = AudioStream::mono(sample_rate, samples.to_vec())?;
        write_wav(&stream, &input, WavEncoding::Pcm16)
            .map_err(|e| SegmentEnhanceError::io(&input, e.to_string()))?;

        let args = self.substitute(&input, &output, &output_dir);
        run_tool(&self.config.program, &args)
            .map_err(|e| SegmentEnhanceError::enhancer(format!("{e:#}")))?;

        let produced = Self::locate_output(&output, &output_dir)?;
        let enhanced =
            read_wav(&produced).map_err(|e| SegmentEnhanceError::io(&produced, e.to_string()))?;
        let enhanced = downmix_to_mono(&enhanced)?;

        // Only rate drift is corrected here; length drift is the adapter's call.
        let enhanced = if enhanced.sample_rate() == sample_rate {
            enhanced
        } else {
            let frames = resampled_len(enhanced.frames(), enhanced.sample_rate(), sample_rate);
            resample_to_frames(&enhanced, sample_rate, frames)?
        };
        Ok(enhanced.into_samples())
    }
}
