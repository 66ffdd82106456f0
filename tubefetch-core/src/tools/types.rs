//! Core types for external tool provisioning.
//!
//! This module defines the foundational types used across the provisioning
//! infrastructure: tool identifiers, platform detection, per-tool status, and
//! static tool specifications.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Tool Identifiers
// ============================================================================

/// Unique identifier for each external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolId {
    /// yt-dlp - the command-line media downloader.
    YtDlp,
    /// FFmpeg - container muxing and audio extraction.
    Ffmpeg,
}

impl ToolId {
    /// Returns all required tool IDs, in provisioning order.
    pub fn all() -> &'static [ToolId] {
        &[Self::YtDlp, Self::Ffmpeg]
    }

    /// Returns the lowercase string identifier for this tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YtDlp => "yt-dlp",
            Self::Ffmpeg => "ffmpeg",
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ToolId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yt-dlp" | "ytdlp" => Ok(Self::YtDlp),
            "ffmpeg" => Ok(Self::Ffmpeg),
            _ => Err(format!("Unknown tool: {}", s)),
        }
    }
}

// ============================================================================
// Platform Detection
// ============================================================================

/// Represents a supported platform (OS + architecture).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    LinuxX64,
    LinuxArm64,
    MacosX64,
    MacosArm64,
    WindowsX64,
}

impl Platform {
    /// Detects the current platform at compile time.
    ///
    /// Returns `None` if the platform is unsupported, which callers must
    /// surface as a fatal configuration error.
    pub fn detect() -> Option<Self> {
        #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
        {
            Some(Platform::LinuxX64)
        }
        #[cfg(all(target_os = "linux", target_arch = "aarch64"))]
        {
            Some(Platform::LinuxArm64)
        }
        #[cfg(all(target_os = "macos", target_arch = "x86_64"))]
        {
            Some(Platform::MacosX64)
        }
        #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
        {
            Some(Platform::MacosArm64)
        }
        #[cfg(all(target_os = "windows", target_arch = "x86_64"))]
        {
            Some(Platform::WindowsX64)
        }
        #[cfg(not(any(
            all(target_os = "linux", target_arch = "x86_64"),
            all(target_os = "linux", target_arch = "aarch64"),
            all(target_os = "macos", target_arch = "x86_64"),
            all(target_os = "macos", target_arch = "aarch64"),
            all(target_os = "windows", target_arch = "x86_64"),
        )))]
        {
            None
        }
    }

    /// True for platforms where executables need a permission bit set.
    pub fn is_posix(&self) -> bool {
        !matches!(self, Self::WindowsX64)
    }

    /// Returns a human-readable description of the platform.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::LinuxX64 => "Linux (x86_64)",
            Self::LinuxArm64 => "Linux (ARM64)",
            Self::MacosX64 => "macOS (Intel)",
            Self::MacosArm64 => "macOS (Apple Silicon)",
            Self::WindowsX64 => "Windows (x86_64)",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Tool Status / Provisioning State
// ============================================================================

/// Current state of one external tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolStatus {
    /// Not present in the tools directory.
    Missing,
    /// Currently being downloaded.
    Downloading {
        /// Progress percentage (0 to 100).
        percent: u8,
    },
    /// Present and executable.
    Ready { path: PathBuf },
    /// Provisioning failed.
    Failed { error: String },
    /// The tool has no artifact for this platform.
    UnsupportedPlatform,
}

impl ToolStatus {
    /// Returns true if the tool can be invoked.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Per-tool status map, reset each launch.
///
/// Owned by the controller, mutated only by the provisioner (single-writer
/// discipline behind a mutex); the UI reads it to decide whether download
/// requests may proceed.
#[derive(Debug, Clone)]
pub struct ProvisioningState {
    statuses: HashMap<ToolId, ToolStatus>,
}

impl Default for ProvisioningState {
    fn default() -> Self {
        let statuses = ToolId::all()
            .iter()
            .map(|id| (*id, ToolStatus::Missing))
            .collect();
        Self { statuses }
    }
}

impl ProvisioningState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tool: ToolId) -> &ToolStatus {
        // Default covers every ToolId, so the entry always exists.
        self.statuses.get(&tool).unwrap_or(&ToolStatus::Missing)
    }

    pub fn set(&mut self, tool: ToolId, status: ToolStatus) {
        self.statuses.insert(tool, status);
    }

    /// True once every required tool is ready.
    pub fn all_ready(&self) -> bool {
        ToolId::all().iter().all(|id| self.get(*id).is_ready())
    }

    /// Resolved executable paths, available only when everything is ready.
    pub fn tool_paths(&self) -> Option<ToolPaths> {
        let path_of = |id: ToolId| match self.get(id) {
            ToolStatus::Ready { path } => Some(path.clone()),
            _ => None,
        };
        Some(ToolPaths {
            yt_dlp: path_of(ToolId::YtDlp)?,
            ffmpeg: path_of(ToolId::Ffmpeg)?,
        })
    }
}

/// Resolved executable paths handed to the download worker.
///
/// Holding a `ToolPaths` is the proof that provisioning completed; a job may
/// only be dispatched with one in hand.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub yt_dlp: PathBuf,
    pub ffmpeg: PathBuf,
}

// ============================================================================
// Tool Specification
// ============================================================================

/// How a downloaded artifact is packaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// A bare executable, usable after a rename and chmod.
    Binary,
    /// ZIP archive (.zip)
    Zip,
    /// Gzip-compressed tar archive (.tar.gz, .tgz)
    TarGz,
    /// XZ-compressed tar archive (.tar.xz)
    TarXz,
}

impl ArtifactKind {
    /// Infers the artifact kind from a URL or filename.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_lowercase();
        if lower.ends_with(".zip") {
            Self::Zip
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Self::TarGz
        } else if lower.ends_with(".tar.xz") {
            Self::TarXz
        } else {
            Self::Binary
        }
    }

    /// Returns true if the artifact must be unpacked before use.
    pub fn requires_extraction(&self) -> bool {
        !matches!(self, Self::Binary)
    }
}

/// A platform-specific download entry with optional SHA256 checksum.
#[derive(Debug, Clone, Copy)]
pub struct PlatformDownload {
    /// The download URL.
    pub url: &'static str,
    /// Expected SHA256 hash (lowercase hex), or None to skip verification.
    pub sha256: Option<&'static str>,
}

impl PlatformDownload {
    pub const fn new(url: &'static str, sha256: Option<&'static str>) -> Self {
        Self { url, sha256 }
    }
}

/// Platform-specific download URLs for a tool.
#[derive(Debug, Clone)]
pub struct PlatformUrls {
    pub linux_x64: Option<PlatformDownload>,
    pub linux_arm64: Option<PlatformDownload>,
    pub macos_x64: Option<PlatformDownload>,
    pub macos_arm64: Option<PlatformDownload>,
    pub windows_x64: Option<PlatformDownload>,
}

impl PlatformUrls {
    /// Returns the download info for the given platform.
    pub fn get(&self, platform: Platform) -> Option<PlatformDownload> {
        match platform {
            Platform::LinuxX64 => self.linux_x64,
            Platform::LinuxArm64 => self.linux_arm64,
            Platform::MacosX64 => self.macos_x64,
            Platform::MacosArm64 => self.macos_arm64,
            Platform::WindowsX64 => self.windows_x64,
        }
    }
}

/// Platform-specific executable filenames (the `.exe` suffix lives here).
#[derive(Debug, Clone)]
pub struct ExecutableNames {
    pub unix: &'static str,
    pub windows: &'static str,
}

impl ExecutableNames {
    /// Returns the executable filename for the given platform.
    pub fn get(&self, platform: Platform) -> &'static str {
        if platform.is_posix() {
            self.unix
        } else {
            self.windows
        }
    }
}

/// Complete static specification of an external tool. Never mutated.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Unique identifier for this tool.
    pub id: ToolId,
    /// Human-readable display name.
    pub display_name: &'static str,
    /// Brief description of what the tool does.
    pub description: &'static str,
    /// Platform-specific download URLs.
    pub urls: PlatformUrls,
    /// Platform-specific executable filename.
    pub executable: ExecutableNames,
    /// Sanity floor: a downloaded artifact smaller than this is corrupt.
    pub min_size_bytes: u64,
}

impl ToolSpec {
    /// Returns the download info for the given platform.
    pub fn download_for(&self, platform: Platform) -> Option<PlatformDownload> {
        self.urls.get(platform)
    }

    /// Returns the artifact kind based on the URL for the given platform.
    pub fn artifact_kind(&self, platform: Platform) -> Option<ArtifactKind> {
        self.download_for(platform)
            .map(|d| ArtifactKind::from_url(d.url))
    }

    /// Returns the executable filename for the given platform.
    pub fn executable_name(&self, platform: Platform) -> &'static str {
        self.executable.get(platform)
    }
}
