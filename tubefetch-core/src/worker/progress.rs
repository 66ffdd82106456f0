//! Classification of yt-dlp output lines.
//!
//! yt-dlp is invoked with `--newline`, so each stdout line is a complete
//! status record. This module turns those lines (and stderr `ERROR:` lines)
//! into structured events the worker forwards to the UI.

use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::error::DownloadError;

/// What a single yt-dlp stdout line means.
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    /// A `[download]` line carrying a percentage.
    Progress { percent: f32 },
    /// A post-processing step (merge, audio extraction).
    Processing { message: String },
    /// The destination file yt-dlp announced. Later announcements win, so
    /// the final value reflects the post-processed output.
    OutputPath(PathBuf),
    /// Anything else worth showing in the log verbatim.
    Other,
}

fn percent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([0-9]{1,3}(?:\.[0-9]+)?)%").expect("static pattern"))
}

/// Prefixes yt-dlp uses for post-processing stages.
const PROCESSING_PREFIXES: &[&str] = &["[ExtractAudio]", "[Merger]", "[ffmpeg]", "[VideoConvertor]"];

/// Classifies one stdout line from yt-dlp.
pub fn classify_line(line: &str) -> LineEvent {
    let trimmed = line.trim();

    if let Some(rest) = trimmed.strip_prefix("[download] Destination: ") {
        return LineEvent::OutputPath(PathBuf::from(rest.trim()));
    }

    if let Some(rest) = trimmed.strip_prefix("[ExtractAudio] Destination: ") {
        return LineEvent::OutputPath(PathBuf::from(rest.trim()));
    }

    if let Some(rest) = trimmed.strip_prefix("[Merger] Merging formats into ") {
        let path = rest.trim().trim_matches('"');
        return LineEvent::OutputPath(PathBuf::from(path));
    }

    if trimmed.starts_with("[download]") {
        if let Some(caps) = percent_re().captures(trimmed) {
            if let Ok(percent) = caps[1].parse::<f32>() {
                return LineEvent::Progress {
                    percent: percent.clamp(0.0, 100.0),
                };
            }
        }
        return LineEvent::Other;
    }

    if PROCESSING_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        return LineEvent::Processing {
            message: trimmed.to_string(),
        };
    }

    LineEvent::Other
}

/// Maps a yt-dlp `ERROR:` line to the error taxonomy.
///
/// Returns `None` for lines that are not errors at all.
pub fn classify_error_line(line: &str) -> Option<DownloadError> {
    let trimmed = line.trim();
    let detail = trimmed.strip_prefix("ERROR:")?.trim().to_string();

    let lower = detail.to_lowercase();

    if lower.contains("is not a valid url")
        || lower.contains("failed to resolve")
        || lower.contains("unable to download webpage")
        || lower.contains("name or service not known")
    {
        return Some(DownloadError::InvalidUrl(detail));
    }

    if lower.contains("unsupported url")
        || lower.contains("video unavailable")
        || lower.contains("private video")
        || lower.contains("not available in your country")
        || lower.contains("no video formats")
    {
        return Some(DownloadError::UnsupportedContent(detail));
    }

    // Generic tool error; the worker fills in the exit code once known.
    Some(DownloadError::ToolFailure {
        exit_code: 1,
        detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_download_percent() {
        let event = classify_line("[download]  42.3% of 10.00MiB at 1.00MiB/s ETA 00:05");
        assert_eq!(event, LineEvent::Progress { percent: 42.3 });

        let event = classify_line("[download] 100% of 10.00MiB in 00:10");
        assert_eq!(event, LineEvent::Progress { percent: 100.0 });
    }

    #[test]
    fn download_line_without_percent_is_other() {
        assert_eq!(
            classify_line("[download] Resuming download at byte 1024"),
            LineEvent::Other
        );
    }

    #[test]
    fn captures_destination_paths() {
        assert_eq!(
            classify_line("[download] Destination: downloads/My Video.mp4"),
            LineEvent::OutputPath(PathBuf::from("downloads/My Video.mp4"))
        );
        assert_eq!(
            classify_line("[ExtractAudio] Destination: downloads/Track.mp3"),
            LineEvent::OutputPath(PathBuf::from("downloads/Track.mp3"))
        );
        assert_eq!(
            classify_line("[Merger] Merging formats into \"downloads/Clip.mp4\""),
            LineEvent::OutputPath(PathBuf::from("downloads/Clip.mp4"))
        );
    }

    #[test]
    fn post_processing_lines() {
        match classify_line("[ffmpeg] Correcting container of \"x.mp4\"") {
            LineEvent::Processing { message } => assert!(message.starts_with("[ffmpeg]")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn error_line_invalid_url() {
        let err = classify_error_line("ERROR: [generic] 'htp:/x' is not a valid URL").unwrap();
        assert!(matches!(err, DownloadError::InvalidUrl(_)));
    }

    #[test]
    fn error_line_unsupported_content() {
        let err = classify_error_line("ERROR: Unsupported URL: https://example.com/page").unwrap();
        assert!(matches!(err, DownloadError::UnsupportedContent(_)));

        let err = classify_error_line("ERROR: [youtube] dQw4: Video unavailable").unwrap();
        assert!(matches!(err, DownloadError::UnsupportedContent(_)));
    }

    #[test]
    fn error_line_generic_is_tool_failure() {
        let err = classify_error_line("ERROR: Postprocessing: something broke").unwrap();
        match err {
            DownloadError::ToolFailure { detail, .. } => {
                assert!(detail.contains("Postprocessing"))
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn non_error_line_is_none() {
        assert!(classify_error_line("WARNING: slow connection").is_none());
        assert!(classify_error_line("[download] 10%").is_none());
    }

    #[test]
    fn percent_is_clamped() {
        let event = classify_line("[download] 250% of something weird");
        assert_eq!(event, LineEvent::Progress { percent: 100.0 });
    }
}
