//! voiceclean CLI: command-line interface for the voice cleaning pipeline.
//!
//! Usage:
//!   voiceclean process <INPUT>           Decode, denoise, trim, and encode a recording
//!   voiceclean merge <DIR> -o <OUT>      Rebuild output from an existing segments directory
//!   voiceclean trim <INPUT> -o <OUT>     Remove interior silence from a WAV
//!   voiceclean gain <INPUT> -o <OUT>     Apply a fixed gain to a WAV
//!   voiceclean check                     Check external tools and the configured enhancer

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use voiceclean_common::config::{config_file_path, AppConfig, PipelineConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "voiceclean",
    about = "Batch voice recording cleanup: denoise, trim silence, normalize",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/voiceclean/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Silence trimming overrides shared by several commands.
#[derive(Args, Debug, Clone, Default)]
pub struct SilenceArgs {
    /// Minimum silence length to remove (ms, 100..=1000)
    #[arg(long)]
    min_silence: Option<u64>,

    /// Silence threshold (dBFS, -100..=0)
    #[arg(long, allow_hyphen_values = true)]
    silence_threshold: Option<f64>,

    /// Silence kept around each non-silent chunk (ms)
    #[arg(long)]
    keep_silence: Option<u64>,
}

impl SilenceArgs {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(ms) = self.min_silence {
            config.min_silence_len_ms = ms;
        }
        if let Some(db) = self.silence_threshold {
            config.silence_threshold_dbfs = db;
        }
        if let Some(ms) = self.keep_silence {
            config.keep_silence_ms = ms;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full cleaning pipeline on a recording
    Process {
        /// Input audio file (any format ffmpeg can read; WAV natively)
        input: PathBuf,

        /// Directory for job working directories
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Segment length for enhancement (ms)
        #[arg(long)]
        segment_length: Option<u64>,

        #[command(flatten)]
        silence: SilenceArgs,

        /// Skip silence trimming
        #[arg(long)]
        no_trim: bool,

        /// Gain applied to the final output (dB)
        #[arg(long, allow_hyphen_values = true)]
        gain_db: Option<f64>,

        /// Worker threads for enhancement (0 = auto)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Enhancer: passthrough|noise-gate|command
        #[arg(long)]
        enhancer: Option<String>,

        /// Program for the command enhancer
        #[arg(long)]
        enhancer_program: Option<String>,

        /// Print the JSON job report
        #[arg(long)]
        report: bool,
    },

    /// Merge enhanced segments from an existing job into one output
    Merge {
        /// Segments directory (`<stem>_chopped`)
        segments_dir: PathBuf,

        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// Suffix that marks enhanced segment files
        #[arg(long, default_value = "_denoised")]
        suffix: String,

        #[command(flatten)]
        silence: SilenceArgs,

        /// Skip silence trimming
        #[arg(long)]
        no_trim: bool,

        /// Gain applied to the merged output (dB)
        #[arg(long, allow_hyphen_values = true)]
        gain_db: Option<f64>,
    },

    /// Remove interior silence from a WAV file
    Trim {
        /// Input WAV
        input: PathBuf,

        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        silence: SilenceArgs,
    },

    /// Apply a fixed gain to a WAV file
    Gain {
        /// Input WAV
        input: PathBuf,

        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// Gain in dB (-40..=40)
        #[arg(long, allow_hyphen_values = true)]
        db: f64,
    },

    /// Check external tools and the configured enhancer
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config_file_path);
    let (mut config, load_error) = match AppConfig::try_load_from(&config_path) {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // Initialize logging
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    voiceclean_common::logging::init_logging(&config.logging);
    if let Some(e) = load_error {
        tracing::warn!(error = %e, "Using default configuration");
    }
    tracing::debug!(config = %config_path.display(), "Configuration loaded");

    match cli.command {
        Commands::Process {
            input,
            work_dir,
            segment_length,
            silence,
            no_trim,
            gain_db,
            workers,
            enhancer,
            enhancer_program,
            report,
        } => {
            if let Some(dir) = work_dir {
                config.work_dir = dir;
            }
            if let Some(ms) = segment_length {
                config.pipeline.segment_length_ms = ms;
            }
            silence.apply(&mut config.pipeline);
            if no_trim {
                config.pipeline.remove_silence = false;
            }
            if let Some(db) = gain_db {
                config.pipeline.gain_db = db;
            }
            if let Some(n) = workers {
                config.pipeline.workers = n;
            }
            if let Some(kind) = enhancer {
                config.enhancer.kind = kind.parse()?;
            }
            if let Some(program) = enhancer_program {
                config.enhancer.command.program = program;
            }
            commands::process::run(input, config, report).await
        }
        Commands::Merge {
            segments_dir,
            output,
            suffix,
            silence,
            no_trim,
            gain_db,
        } => {
            silence.apply(&mut config.pipeline);
            if no_trim {
                config.pipeline.remove_silence = false;
            }
            if let Some(db) = gain_db {
                config.pipeline.gain_db = db;
            }
            commands::merge::run(segments_dir, output, suffix, config.pipeline)
        }
        Commands::Trim {
            input,
            output,
            silence,
        } => {
            silence.apply(&mut config.pipeline);
            commands::trim::run(input, output, config.pipeline)
        }
        Commands::Gain { input, output, db } => commands::gain::run(input, output, db),
        Commands::Check => commands::check::run(&config),
    }
}
