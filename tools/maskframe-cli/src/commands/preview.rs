//! Render one masked frame to a PNG.

use std::path::{Path, PathBuf};

use maskframe_common::config::AppConfig;
use maskframe_filters::FrameBuffer;
use maskframe_media::{probe_source, snapshot_frame};

use super::{build_session, MaskArgs};

pub async fn run(
    config: &AppConfig,
    input: PathBuf,
    at: f64,
    masks: MaskArgs,
    overlay: bool,
    output: PathBuf,
) -> anyhow::Result<()> {
    let source = probe_source(&input)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to probe {}: {e}", input.display()))?;
    let mut session = build_session(config, source.clone(), &masks)?;
    let at = session.seek(at);

    let frame = snapshot_frame(&source, at)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to decode frame at {at:.2}s: {e}"))?;
    let rendered = session.render_preview(&frame, overlay);
    save_png(rendered, &output)?;

    println!(
        "[OK] Preview at {at:.2}s with {} mask(s) written to {}",
        session.masks().len(),
        output.display()
    );
    Ok(())
}

fn save_png(frame: FrameBuffer, path: &Path) -> anyhow::Result<()> {
    let (width, height) = frame.dimensions();
    let image = image::RgbaImage::from_raw(width as u32, height as u32, frame.into_raw())
        .ok_or_else(|| anyhow::anyhow!("Frame buffer does not match {width}x{height}"))?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))
}
