//! Validate a mask plan file.

use std::path::PathBuf;

use maskframe_common::config::AppConfig;
use maskframe_model::{MaskPlan, Size};

use super::print_rects;

pub async fn run(
    config: &AppConfig,
    path: PathBuf,
    size: Option<String>,
    input: Option<PathBuf>,
) -> anyhow::Result<()> {
    let plan = MaskPlan::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load mask plan: {e}"))?;

    println!("Validating: {}", path.display());
    println!(
        "  Effect: {} (intensity {}), remove audio: {}",
        plan.settings.mask_type, plan.settings.intensity, plan.settings.remove_audio
    );
    println!("  Rectangles: {}", plan.masks.len());
    if let Some(display) = plan.display {
        println!("  Drawn on: {}x{} display", display.width, display.height);
    }

    let native = match (size, input) {
        (Some(raw), _) => Some(parse_size(&raw)?),
        (None, Some(video)) => {
            let source = maskframe_media::probe_source(&video)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to probe {}: {e}", video.display()))?;
            let (width, height) = source.frame_size();
            Some(Size::new(width, height))
        }
        (None, None) => plan.display,
    };

    let Some(native) = native else {
        println!("  No frame size given; rectangles checked against the size threshold only");
        let outcome = plan.admit(Size::new(f64::MAX, f64::MAX), config.masking.min_mask_size);
        report(&outcome.masks, &outcome.discarded);
        return Ok(());
    };

    println!("  Native frame: {}x{}", native.width, native.height);
    let outcome = plan.admit(native, config.masking.min_mask_size);
    report(&outcome.masks, &outcome.discarded);
    Ok(())
}

fn report(kept: &maskframe_model::MaskSet, discarded: &[maskframe_model::Rect]) {
    println!();
    println!("[OK] {} mask(s) kept", kept.len());
    print_rects("kept", kept);
    if !discarded.is_empty() {
        println!("[WARN] {} mask(s) discarded (too small or outside the frame)", discarded.len());
        print_rects("discarded", discarded);
    }
}

/// Parse `WIDTHxHEIGHT`.
fn parse_size(raw: &str) -> anyhow::Result<Size> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow::anyhow!("Expected WIDTHxHEIGHT, got '{raw}'"))?;
    let width: f64 = w.trim().parse()?;
    let height: f64 = h.trim().parse()?;
    anyhow::ensure!(
        width > 0.0 && height > 0.0,
        "Frame size must be positive, got '{raw}'"
    );
    Ok(Size::new(width, height))
}
