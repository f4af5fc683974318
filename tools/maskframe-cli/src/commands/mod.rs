pub mod check;
pub mod info;
pub mod preview;
pub mod process;
pub mod validate;

use std::path::PathBuf;

use clap::Args;
use maskframe_capture::MaskerSession;
use maskframe_common::config::AppConfig;
use maskframe_model::{MaskPlan, MaskType, Rect, SourceVideo};

/// Mask selection shared by `process` and `preview`.
#[derive(Debug, Clone, Args)]
pub struct MaskArgs {
    /// Mask plan file (JSON) providing settings and rectangles
    #[arg(long)]
    pub masks: Option<PathBuf>,

    /// Extra rectangle in native pixels as x,y,width,height (repeatable)
    #[arg(long = "mask", value_name = "X,Y,W,H", value_parser = parse_rect_arg)]
    pub rects: Vec<Rect>,

    /// Effect: blur, pixelate or solid
    #[arg(long = "type", value_name = "TYPE", value_parser = parse_mask_type_arg)]
    pub mask_type: Option<MaskType>,

    /// Effect intensity (1-20)
    #[arg(long)]
    pub intensity: Option<u8>,

    /// Drop the audio track from the output
    #[arg(long)]
    pub remove_audio: bool,
}

fn parse_rect_arg(s: &str) -> Result<Rect, String> {
    s.parse::<Rect>().map_err(|e| e.to_string())
}

fn parse_mask_type_arg(s: &str) -> Result<MaskType, String> {
    s.parse::<MaskType>().map_err(|e| e.to_string())
}

/// Load `source` into a fresh session and apply masks in order: configured
/// defaults, then the plan file, then command-line flags.
pub fn build_session(
    config: &AppConfig,
    source: SourceVideo,
    args: &MaskArgs,
) -> anyhow::Result<MaskerSession> {
    let mut session = MaskerSession::from_config(config);
    session.load_source(source)?;

    if let Some(path) = &args.masks {
        let plan = MaskPlan::load(path)?;
        let discarded = session.apply_plan(&plan)?;
        for rect in discarded {
            tracing::warn!(?rect, plan = %path.display(), "Discarded mask from plan");
        }
    }

    for rect in &args.rects {
        if session
            .on_rectangle_drawn(rect.x, rect.y, rect.width, rect.height)
            .is_none()
        {
            tracing::warn!(
                ?rect,
                min_size = session.min_mask_size(),
                "Ignoring --mask: too small or outside the frame"
            );
        }
    }

    if let Some(mask_type) = args.mask_type {
        session.set_mask_type(mask_type);
    }
    if let Some(intensity) = args.intensity {
        let applied = session.set_intensity(intensity);
        if applied != intensity {
            tracing::warn!(requested = intensity, applied, "Intensity clamped");
        }
    }
    if args.remove_audio {
        session.set_remove_audio(true);
    }

    Ok(session)
}

/// Print a labelled rectangle list.
pub fn print_rects<'a>(label: &str, rects: impl IntoIterator<Item = &'a Rect>) {
    for (i, rect) in rects.into_iter().enumerate() {
        println!(
            "  {label} {i}: x={:.1} y={:.1} w={:.1} h={:.1}",
            rect.x, rect.y, rect.width, rect.height
        );
    }
}
