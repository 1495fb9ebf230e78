//! Run the full cleaning pipeline on one recording.

use std::path::PathBuf;

use voiceclean_common::config::AppConfig;
use voiceclean_common::error::VoicecleanError;
use voiceclean_pipeline::{CancelToken, JobState, PipelineJob, PipelineProgress};

pub async fn run(input: PathBuf, config: AppConfig, print_report: bool) -> anyhow::Result<()> {
    println!("Processing: {}", input.display());
    println!("  Work dir: {}", config.work_dir.display());
    println!("  Enhancer: {:?}", config.enhancer.kind);
    println!(
        "  Segments: {} ms, trim: {}, gain: {} dB",
        config.pipeline.segment_length_ms, config.pipeline.remove_silence, config.pipeline.gain_db
    );

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupt received, finishing in-flight segments...");
            on_interrupt.cancel();
        }
    });

    let progress_cb: Box<dyn Fn(PipelineProgress) + Send> = Box::new(|p| match p.state {
        JobState::Enhancing if p.segments_total > 0 => {
            print!(
                "\r  Enhancing: {}/{} segments  ",
                p.segments_done, p.segments_total
            );
        }
        JobState::Reassembling => println!(),
        _ => {}
    });

    let job_input = input.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut job = PipelineJob::new(job_input, &config).with_progress(progress_cb);
        let result = job.run(&cancel);
        let job_dir = job.layout().map(|l| l.root().to_path_buf());
        let failed_stage = job.failed_stage();
        (result, job_dir, failed_stage)
    })
    .await?;

    match result {
        (Ok(report), job_dir, _) => {
            if let Some(dir) = job_dir {
                println!("  Job dir: {}", dir.display());
            }
            if let Some(output) = &report.output {
                println!(
                    "Done: {} ({:.1}s, {} bytes)",
                    output.path.display(),
                    output.duration_ms as f64 / 1000.0,
                    output.bytes
                );
            }
            if print_report {
                println!("{}", report.to_json()?);
            }
            Ok(())
        }
        (Err(err), job_dir, failed_stage) => {
            println!();
            let stage = failed_stage
                .or_else(|| err.stage())
                .map(|s| s.to_string())
                .unwrap_or_else(|| "setup".to_string());
            tracing::debug!(stage = %stage, error = ?err, "Process command failed");
            println!("Processing failed at stage '{stage}': {err}");
            if let VoicecleanError::IncompleteSequence { missing, .. } = &err {
                let parts: Vec<String> = missing.iter().map(|i| (i + 1).to_string()).collect();
                println!("  Missing segments (part numbers): {}", parts.join(", "));
            }
            if let Some(dir) = job_dir {
                println!("  Job dir kept for inspection: {}", dir.display());
                println!("  Retry with: voiceclean merge <job dir>/<stem>_chopped -o <out.wav>");
            }
            Err(err.into())
        }
    }
}
