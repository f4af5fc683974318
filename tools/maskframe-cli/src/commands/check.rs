//! Check ffmpeg availability and output container support.

use maskframe_capture::ContainerFormat;
use maskframe_media::{command_exists, probe_encoders};

pub async fn run() -> anyhow::Result<()> {
    println!("Maskframe System Check");
    println!("{}", "=".repeat(50));

    let mut ready = true;
    for tool in ["ffmpeg", "ffprobe"] {
        if command_exists(tool) {
            println!("[OK] {tool} found");
        } else {
            println!("[MISSING] {tool} not found on PATH");
            ready = false;
        }
    }

    if command_exists("ffmpeg") {
        let support = probe_encoders()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list ffmpeg encoders: {e}"))?;
        println!();
        println!("Output containers (in priority order):");
        for format in ContainerFormat::PRIORITY {
            let (mark, note) = if support.supports(format) {
                ("OK", "")
            } else {
                ("--", " (encoder missing)")
            };
            println!("  [{mark}] {}{note}", format.mime_type());
        }
        if support.containers().is_empty() {
            ready = false;
        }
    }

    println!();
    if ready {
        println!("Maskframe is ready.");
    } else {
        println!("Some requirements are missing. Install ffmpeg with H.264/AAC or VP8/VP9 encoders.");
    }
    Ok(())
}
