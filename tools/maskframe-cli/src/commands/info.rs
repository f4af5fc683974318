//! Show source video information.

use std::path::PathBuf;

use maskframe_model::format_time;

pub async fn run(input: PathBuf) -> anyhow::Result<()> {
    let source = maskframe_media::probe_source(&input)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to probe {}: {e}", input.display()))?;

    println!("Source: {}", source.name());
    println!("{}", "=".repeat(50));
    println!("  Path: {}", source.path.display());
    println!("  Type: {}", source.mime);
    println!("  Size: {} bytes", source.size_bytes);
    println!("  Resolution: {}x{}", source.width, source.height);
    println!("  Frame rate: {:.3} fps", source.frame_rate);
    println!(
        "  Duration: {} ({:.3}s)",
        format_time(source.duration_secs),
        source.duration_secs
    );
    println!(
        "  Audio: {}",
        if source.has_audio { "yes" } else { "no" }
    );
    println!(
        "  Estimated bitrate: {:.2} Mbps",
        source.estimated_bitrate_bps() as f64 / 1_000_000.0
    );

    Ok(())
}
