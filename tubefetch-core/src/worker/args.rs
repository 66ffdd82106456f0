//! yt-dlp command-line construction.

use std::path::Path;

use crate::tools::ToolPaths;

use super::{DownloadRequest, FormatChoice};

/// Builds the full yt-dlp argument vector for a download request.
///
/// `--newline` keeps progress machine-readable (one status per line) and
/// `--ffmpeg-location` points yt-dlp at the provisioned ffmpeg so the
/// system PATH is never consulted.
pub fn build_args(request: &DownloadRequest, tools: &ToolPaths) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--newline".into(),
        "--no-playlist".into(),
        "--ffmpeg-location".into(),
        ffmpeg_location(&tools.ffmpeg),
        "-o".into(),
        format!("{}/%(title)s.%(ext)s", request.dest_dir.display()),
    ];

    match request.format {
        FormatChoice::VideoMp4 => {
            args.push("-f".into());
            args.push("bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".into());
            args.push("--merge-output-format".into());
            args.push("mp4".into());
        }
        FormatChoice::AudioMp3 => {
            args.push("-x".into());
            args.push("--audio-format".into());
            args.push("mp3".into());
            args.push("--audio-quality".into());
            args.push("0".into());
        }
    }

    args.push(request.url.clone());
    args
}

/// yt-dlp accepts either the binary or its directory; passing the directory
/// lets it pick up ffprobe sitting next to ffmpeg.
fn ffmpeg_location(ffmpeg: &Path) -> String {
    ffmpeg
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(ffmpeg)
        .display()
        .to_string()
}
