//! ffmpeg command lines for decoding, encoding and snapshots.

use std::collections::BTreeSet;
use std::path::Path;

use maskframe_capture::{ContainerFormat, ContainerKind, EncoderSettings};

/// Audio bitrate used for every container.
pub const AUDIO_BITRATE: &str = "128k";

/// Video and audio encoder names ffmpeg needs for `format`.
pub fn encoder_names(format: ContainerFormat) -> (&'static str, &'static str) {
    match format {
        ContainerFormat::Mp4H264Aac => ("libx264", "aac"),
        ContainerFormat::Mp4 => ("mpeg4", "aac"),
        ContainerFormat::WebmVp9Opus => ("libvpx-vp9", "libopus"),
        ContainerFormat::WebmVp8Vorbis => ("libvpx", "libvorbis"),
    }
}

/// Encoders reported by `ffmpeg -encoders`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncoderSupport {
    names: BTreeSet<String>,
}

impl EncoderSupport {
    /// Parse the listing printed by `ffmpeg -hide_banner -encoders`.
    ///
    /// Entries follow a `------` separator line as `FLAGS name description`.
    pub fn parse(listing: &str) -> Self {
        let names = listing
            .lines()
            .skip_while(|line| !line.trim_start().starts_with("---"))
            .skip(1)
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let _flags = fields.next()?;
                fields.next().map(str::to_string)
            })
            .collect();
        Self { names }
    }

    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            names: names.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn has(&self, encoder: &str) -> bool {
        self.names.contains(encoder)
    }

    /// Whether both encoders for `format` are present.
    pub fn supports(&self, format: ContainerFormat) -> bool {
        let (video, audio) = encoder_names(format);
        self.has(video) && self.has(audio)
    }

    /// Supported containers in negotiation order.
    pub fn containers(&self) -> Vec<ContainerFormat> {
        ContainerFormat::PRIORITY
            .into_iter()
            .filter(|f| self.supports(*f))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Decode `source` to raw RGBA frames on stdout at a constant `fps`.
pub fn decoder_args(source: &Path, fps: f64, realtime: bool) -> Vec<String> {
    let mut args = strings(&["-hide_banner", "-nostdin", "-v", "error"]);
    if realtime {
        args.push("-re".to_string());
    }
    args.push("-i".to_string());
    args.push(source.to_string_lossy().into_owned());
    args.extend(strings(&["-map", "0:v:0", "-an", "-vf"]));
    args.push(format!("fps={fps}"));
    args.extend(strings(&["-f", "rawvideo", "-pix_fmt", "rgba", "-"]));
    args
}

fn codec_args(format: ContainerFormat, with_audio: bool) -> Vec<String> {
    let (video, audio) = encoder_names(format);
    let mut args = strings(&["-c:v", video]);
    match format {
        ContainerFormat::Mp4H264Aac => {
            // yuv420p needs even dimensions.
            args.extend(strings(&[
                "-preset",
                "veryfast",
                "-pix_fmt",
                "yuv420p",
                "-vf",
                "pad=ceil(iw/2)*2:ceil(ih/2)*2",
            ]));
        }
        ContainerFormat::Mp4 | ContainerFormat::WebmVp9Opus | ContainerFormat::WebmVp8Vorbis => {
            args.extend(strings(&["-pix_fmt", "yuv420p"]));
        }
    }
    if with_audio {
        args.extend(strings(&["-c:a", audio, "-b:a", AUDIO_BITRATE]));
    }
    args
}

fn muxer_args(kind: ContainerKind) -> Vec<String> {
    match kind {
        // Fragmented so the muxer never seeks back on a pipe.
        ContainerKind::Mp4 => strings(&[
            "-f",
            "mp4",
            "-movflags",
            "frag_keyframe+empty_moov+default_base_moof",
        ]),
        ContainerKind::Webm => strings(&["-f", "webm"]),
    }
}

/// Encode raw RGBA frames from stdin, optionally muxing the first audio
/// track of `audio_source`, and stream the container to stdout.
pub fn encoder_args(settings: &EncoderSettings, audio_source: Option<&Path>) -> Vec<String> {
    let mut args = strings(&["-hide_banner", "-v", "error", "-f", "rawvideo", "-pix_fmt", "rgba"]);
    args.push("-s".to_string());
    args.push(format!("{}x{}", settings.width, settings.height));
    args.push("-r".to_string());
    args.push(settings.fps.to_string());
    args.extend(strings(&["-i", "-"]));

    let audio_source = audio_source.filter(|_| settings.with_audio);
    match audio_source {
        Some(path) => {
            args.push("-i".to_string());
            args.push(path.to_string_lossy().into_owned());
            args.extend(strings(&["-map", "0:v:0", "-map", "1:a:0?", "-shortest"]));
        }
        None => args.extend(strings(&["-map", "0:v:0", "-an"])),
    }

    args.extend(codec_args(settings.container, audio_source.is_some()));
    args.push("-b:v".to_string());
    args.push(settings.bitrate_bps.max(1).to_string());
    args.extend(muxer_args(settings.container.kind()));
    args.push("-".to_string());
    args
}

/// Grab the frame at `secs` as raw RGBA.
pub fn snapshot_args(source: &Path, secs: f64) -> Vec<String> {
    let mut args = strings(&["-hide_banner", "-nostdin", "-v", "error", "-ss"]);
    args.push(format!("{:.3}", secs.max(0.0)));
    args.push("-i".to_string());
    args.push(source.to_string_lossy().into_owned());
    args.extend(strings(&[
        "-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgba", "-",
    ]));
    args
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    const LISTING: &str = "\
Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC
 V....D mpeg4                MPEG-4 part 2
 V....D libvpx-vp9           libvpx VP9 (codec vp9)
 A....D aac                  AAC (Advanced Audio Coding)
 A....D libopus              libopus Opus (codec opus)
";

    fn settings(container: ContainerFormat, with_audio: bool) -> EncoderSettings {
        EncoderSettings {
            container,
            width: 100,
            height: 60,
            fps: 30,
            bitrate_bps: 2_000_000,
            with_audio,
        }
    }

    fn position(args: &[String], value: &str) -> Option<usize> {
        args.iter().position(|a| a == value)
    }

    #[test]
    fn test_parse_encoder_listing() {
        let support = EncoderSupport::parse(LISTING);
        assert_eq!(support.len(), 5);
        assert!(support.has("libx264"));
        // Legend lines above the separator are not encoders.
        assert!(!support.has("="));
        assert_eq!(
            support.containers(),
            vec![
                ContainerFormat::Mp4H264Aac,
                ContainerFormat::Mp4,
                ContainerFormat::WebmVp9Opus
            ]
        );
        assert!(!support.supports(ContainerFormat::WebmVp8Vorbis));
    }

    #[test]
    fn test_empty_listing() {
        assert!(EncoderSupport::parse("ffmpeg: command not found").is_empty());
    }

    #[test]
    fn test_encoder_args_with_audio() {
        let src = PathBuf::from("/videos/in.mov");
        let args = encoder_args(&settings(ContainerFormat::Mp4H264Aac, true), Some(&src));

        let size = position(&args, "-s").unwrap();
        assert_eq!(args[size + 1], "100x60");
        assert!(args.iter().any(|a| a == "1:a:0?"));
        assert!(args.iter().any(|a| a == "libx264"));
        assert!(args.iter().any(|a| a == "aac"));
        let bitrate = position(&args, "-b:v").unwrap();
        assert_eq!(args[bitrate + 1], "2000000");
        let muxer = args.iter().rposition(|a| a == "-f").unwrap();
        assert_eq!(args[muxer + 1], "mp4");
        assert_eq!(args.last().map(String::as_str), Some("-"));
    }

    #[test]
    fn test_encoder_args_without_audio() {
        let src = PathBuf::from("/videos/in.mov");
        let args = encoder_args(&settings(ContainerFormat::WebmVp9Opus, false), Some(&src));
        assert!(args.iter().any(|a| a == "-an"));
        assert!(!args.iter().any(|a| a == "-c:a" || a == "libopus"));
        assert!(!args.iter().any(|a| a == "/videos/in.mov"));
        let muxer = args.iter().rposition(|a| a == "-f").unwrap();
        assert_eq!(args[muxer + 1], "webm");
    }

    #[test]
    fn test_decoder_args_pacing() {
        let src = PathBuf::from("clip.mp4");
        let paced = decoder_args(&src, 25.0, true);
        assert!(paced.iter().any(|a| a == "-re"));
        assert!(paced.iter().any(|a| a == "fps=25"));
        assert!(!decoder_args(&src, 25.0, false).iter().any(|a| a == "-re"));
    }

    #[test]
    fn test_snapshot_args() {
        let args = snapshot_args(&PathBuf::from("clip.mp4"), 1.25);
        let seek = position(&args, "-ss").unwrap();
        assert_eq!(args[seek + 1], "1.250");
        assert!(args.iter().any(|a| a == "-frames:v"));
    }
}
