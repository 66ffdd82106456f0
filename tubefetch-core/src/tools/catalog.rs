//! Tool catalog with hardcoded specifications.
//!
//! Static definitions for the two required external tools. yt-dlp publishes a
//! single-file binary per platform; ffmpeg is distributed as a platform
//! archive whose layout varies by builder, so the provisioner searches the
//! extracted tree for the executable.
//!
//! No stable checksums exist for the `latest` release channels used here, so
//! `sha256` is `None` and integrity falls back to the size sanity floor.

use super::types::{ExecutableNames, PlatformDownload, PlatformUrls, ToolId, ToolSpec};

// ============================================================================
// yt-dlp (external downloader)
// ============================================================================

const YT_DLP_URLS: PlatformUrls = PlatformUrls {
    linux_x64: Some(PlatformDownload::new(
        "https://github.com/yt-dlp/yt-dlp/releases/latest/download/yt-dlp_linux",
        None,
    )),
    linux_arm64: Some(PlatformDownload::new(
        "https://github.com/yt-dlp/yt-dlp/releases/latest/download/yt-dlp_linux_aarch64",
        None,
    )),
    macos_x64: Some(PlatformDownload::new(
        "https://github.com/yt-dlp/yt-dlp/releases/latest/download/yt-dlp_macos",
        None,
    )),
    macos_arm64: Some(PlatformDownload::new(
        "https://github.com/yt-dlp/yt-dlp/releases/latest/download/yt-dlp_macos",
        None,
    )),
    windows_x64: Some(PlatformDownload::new(
        "https://github.com/yt-dlp/yt-dlp/releases/latest/download/yt-dlp.exe",
        None,
    )),
};

const YT_DLP_SPEC: ToolSpec = ToolSpec {
    id: ToolId::YtDlp,
    display_name: "yt-dlp",
    description: "Command-line media downloader performing retrieval and format selection",
    urls: YT_DLP_URLS,
    executable: ExecutableNames {
        unix: "yt-dlp",
        windows: "yt-dlp.exe",
    },
    // The smallest published yt-dlp binary is well over 1 MB; anything below
    // is an error page or truncated transfer.
    min_size_bytes: 1_000_000,
};

// ============================================================================
// FFmpeg (media-processor)
// ============================================================================

const FFMPEG_URLS: PlatformUrls = PlatformUrls {
    linux_x64: Some(PlatformDownload::new(
        "https://johnvansickle.com/ffmpeg/releases/ffmpeg-release-amd64-static.tar.xz",
        None,
    )),
    linux_arm64: Some(PlatformDownload::new(
        "https://johnvansickle.com/ffmpeg/releases/ffmpeg-release-arm64-static.tar.xz",
        None,
    )),
    macos_x64: Some(PlatformDownload::new(
        "https://evermeet.cx/ffmpeg/getrelease/zip",
        None,
    )),
    macos_arm64: Some(PlatformDownload::new(
        "https://evermeet.cx/ffmpeg/getrelease/zip",
        None,
    )),
    windows_x64: Some(PlatformDownload::new(
        "https://www.gyan.dev/ffmpeg/builds/ffmpeg-release-essentials.zip",
        None,
    )),
};

const FFMPEG_SPEC: ToolSpec = ToolSpec {
    id: ToolId::Ffmpeg,
    display_name: "FFmpeg",
    description: "Media-processor used by yt-dlp for container merge and audio extraction",
    urls: FFMPEG_URLS,
    executable: ExecutableNames {
        unix: "ffmpeg",
        windows: "ffmpeg.exe",
    },
    min_size_bytes: 1_000_000,
};

// ============================================================================
// Catalog Access
// ============================================================================

/// Returns the specification for a specific tool.
pub fn get_tool_spec(id: ToolId) -> &'static ToolSpec {
    match id {
        ToolId::YtDlp => &YT_DLP_SPEC,
        ToolId::Ffmpeg => &FFMPEG_SPEC,
    }
}

/// Returns specifications for all required tools, in provisioning order.
pub fn get_all_tool_specs() -> Vec<&'static ToolSpec> {
    ToolId::all().iter().map(|id| get_tool_spec(*id)).collect()
}
