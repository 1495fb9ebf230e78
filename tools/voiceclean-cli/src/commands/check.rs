//! Check external tools and the configured enhancer.

use voiceclean_audio_ai::build_enhancer;
use voiceclean_codec::ffmpeg::command_exists;
use voiceclean_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("voiceclean System Check");
    println!("{}", "=".repeat(50));

    let path = config_file_path();
    if path.exists() {
        println!("[OK] Config: {}", path.display());
    } else {
        println!("[--] Config: defaults ({} not found)", path.display());
    }
    println!("     Work dir: {}", config.work_dir.display());

    match config.pipeline.validate() {
        Ok(()) => println!("[OK] Pipeline settings valid"),
        Err(e) => println!("[FAIL] {e}"),
    }

    let ffmpeg = command_exists("ffmpeg");
    if ffmpeg {
        println!("[OK] ffmpeg found (non-WAV inputs supported)");
    } else {
        println!("[WARN] ffmpeg not found: only WAV inputs can be decoded");
        println!("       Install ffmpeg to process m4a/mp3/ogg recordings");
    }

    let enhancer_ok = match build_enhancer(&config.enhancer) {
        Ok(enhancer) => {
            println!("[OK] Enhancer: {}", enhancer.name());
            true
        }
        Err(e) => {
            println!("[FAIL] Enhancer {:?}: {e}", config.enhancer.kind);
            false
        }
    };

    println!();
    if enhancer_ok {
        println!("voiceclean is ready.");
    } else {
        println!("The configured enhancer is unavailable. See above for fixes.");
    }
    Ok(())
}
