//! External transcoding through the `ffmpeg` binary.

use std::io::{BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::Context;

/// Whether `binary` resolves on `PATH` (or names an executable path).
///
/// The name is passed as a positional argument, never spliced into the
/// script, so spaces and shell metacharacters are taken literally.
pub fn command_exists(binary: &str) -> bool {
    if binary.is_empty() {
        return false;
    }
    Command::new("sh")
        .args(["-c", "command -v \"$0\" >/dev/null 2>&1", binary])
        .stdin(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Arguments that transcode `input` into canonical PCM WAV at `output`.
pub fn normalize_args(input: &Path, output: &Path, sample_rate: u32, channels: u16) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-nostdin".to_string(),
        "-y".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-vn".to_string(),
        "-ac".to_string(),
        channels.to_string(),
        "-ar".to_string(),
        sample_rate.to_string(),
        "-c:a".to_string(),
        "pcm_s16le".to_string(),
        "-f".to_string(),
        "wav".to_string(),
        output.display().to_string(),
    ]
}

/// Run a program to completion, returning its stderr on failure.
pub fn run_tool(program: &str, args: &[String]) -> anyhow::Result<()> {
    tracing::debug!(program, ?args, "Running external tool");
    let start = std::time::Instant::now();
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to start {program}"))?;

    let stderr = child
        .stderr
        .take()
        .with_context(|| format!("Failed to capture {program} stderr"))?;

    // Drain stderr concurrently so a chatty tool cannot block on a full pipe.
    let stderr_task = std::thread::spawn(move || -> String {
        let mut reader = BufReader::new(stderr);
        let mut output = String::new();
        match reader.read_to_string(&mut output) {
            Ok(_) => output,
            Err(err) => format!("<failed to read stderr: {err}>"),
        }
    });

    let status = child
        .wait()
        .with_context(|| format!("Failed to wait on {program}"))?;
    let stderr_output = stderr_task
        .join()
        .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

    tracing::debug!(
        program,
        elapsed_ms = start.elapsed().as_millis() as u64,
        success = status.success(),
        "External tool finished"
    );

    if !status.success() {
        anyhow::bail!(
            "{program} failed (status {}): {}",
            status,
            stderr_output.trim()
        );
    }
    Ok(())
}
