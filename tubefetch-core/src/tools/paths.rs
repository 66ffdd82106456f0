//! Path resolution for the tools and downloads directories.
//!
//! Both directories live next to the application executable (falling back to
//! the working directory when the executable location is unavailable):
//!
//! - `tools/` - provisioned external binaries
//! - `downloads/` - final media files, named by the downloader
//!
//! `resolve_in` is the pure resolver: given a tools directory, a tool, and a
//! platform it returns the expected executable path, carrying the platform's
//! suffix. It performs no I/O.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::catalog::get_tool_spec;
use super::types::{Platform, ToolId};

/// Subdirectory holding provisioned external binaries.
const TOOLS_DIR: &str = "tools";

/// Subdirectory receiving finished downloads.
const DOWNLOADS_DIR: &str = "downloads";

// ============================================================================
// Path Resolution
// ============================================================================

/// Returns the application root: the directory containing the executable,
/// or the working directory as a fallback.
pub fn app_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the path to the local tools directory.
pub fn tools_dir() -> PathBuf {
    app_root().join(TOOLS_DIR)
}

/// Returns the path to the downloads directory.
pub fn downloads_dir() -> PathBuf {
    app_root().join(DOWNLOADS_DIR)
}

/// Resolves the expected executable path for a tool inside a given tools
/// directory. Pure: no filesystem access, no network.
pub fn resolve_in(tools_dir: &Path, tool: ToolId, platform: Platform) -> PathBuf {
    tools_dir.join(get_tool_spec(tool).executable_name(platform))
}

/// Resolves the expected executable path under the default tools directory.
pub fn resolve(tool: ToolId, platform: Platform) -> PathBuf {
    resolve_in(&tools_dir(), tool, platform)
}

/// Ensures the tools and downloads directories exist.
///
/// # Errors
///
/// Returns an error if a directory cannot be created (e.g., permission issues).
pub fn ensure_dirs_exist() -> Result<()> {
    for dir in [tools_dir(), downloads_dir()] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tools_dir_is_under_app_root() {
        let root = app_root();
        let tools = tools_dir();
        assert!(tools.starts_with(&root));
        assert!(tools.ends_with(TOOLS_DIR));
    }

    #[test]
    fn test_downloads_dir_is_under_app_root() {
        let root = app_root();
        let downloads = downloads_dir();
        assert!(downloads.starts_with(&root));
        assert!(downloads.ends_with(DOWNLOADS_DIR));
    }

    #[test]
    fn test_resolve_posix_has_no_suffix() {
        let dir = PathBuf::from("/opt/app/tools");
        for platform in [
            Platform::LinuxX64,
            Platform::LinuxArm64,
            Platform::MacosX64,
            Platform::MacosArm64,
        ] {
            let path = resolve_in(&dir, ToolId::YtDlp, platform);
            assert_eq!(path, dir.join("yt-dlp"));

            let path = resolve_in(&dir, ToolId::Ffmpeg, platform);
            assert_eq!(path, dir.join("ffmpeg"));
        }
    }

    #[test]
    fn test_resolve_windows_has_exe_suffix() {
        let dir = PathBuf::from("C:\\app\\tools");
        let path = resolve_in(&dir, ToolId::YtDlp, Platform::WindowsX64);
        assert!(path.to_string_lossy().ends_with("yt-dlp.exe"));

        let path = resolve_in(&dir, ToolId::Ffmpeg, Platform::WindowsX64);
        assert!(path.to_string_lossy().ends_with("ffmpeg.exe"));
    }

    #[test]
    fn test_resolve_is_pure() {
        // Same inputs, same output; nothing is created on disk.
        let dir = PathBuf::from("/nonexistent/tools");
        let a = resolve_in(&dir, ToolId::Ffmpeg, Platform::LinuxX64);
        let b = resolve_in(&dir, ToolId::Ffmpeg, Platform::LinuxX64);
        assert_eq!(a, b);
        assert!(!dir.exists());
    }
}
