//! Tool provisioner: makes sure yt-dlp and ffmpeg are present and runnable.
//!
//! On every launch the provisioner re-derives tool presence from the
//! filesystem. A tool already sitting at its resolved path is used as-is
//! with zero network traffic; otherwise its artifact is fetched into a
//! partial file, unpacked if it is an archive, and moved into place. Status
//! transitions are written to the shared [`ProvisioningState`] so the UI can
//! gate download requests on readiness.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::error::ProvisionError;
use crate::events::{EventSender, ProgressEvent};

use super::catalog::get_tool_spec;
use super::extract::{extract_archive, locate_executable, make_executable};
use super::fetch::fetch_artifact;
use super::paths;
use super::types::{Platform, ProvisioningState, ToolId, ToolPaths, ToolStatus};

/// Suffix for in-flight artifact downloads. A `.download` file is never
/// mistaken for a provisioned executable because resolved paths carry no
/// suffix on posix and `.exe` on Windows.
const PART_SUFFIX: &str = ".download";

/// Suffix for the scratch directory an archive is unpacked into.
const EXTRACT_SUFFIX: &str = "_extract";

pub struct ToolProvisioner {
    tools_dir: PathBuf,
    platform: Option<Platform>,
    state: Arc<Mutex<ProvisioningState>>,
}

impl ToolProvisioner {
    /// Creates a provisioner over the default tools directory.
    pub fn new(state: Arc<Mutex<ProvisioningState>>) -> Self {
        Self {
            tools_dir: paths::tools_dir(),
            platform: Platform::detect(),
            state,
        }
    }

    #[cfg(test)]
    fn with_tools_dir(
        tools_dir: PathBuf,
        platform: Option<Platform>,
        state: Arc<Mutex<ProvisioningState>>,
    ) -> Self {
        Self {
            tools_dir,
            platform,
            state,
        }
    }

    /// Ensures every required tool is ready, in catalog order.
    ///
    /// Stops at the first failure; the failed tool's status carries the
    /// error and the remaining tools stay `Missing`.
    pub async fn ensure_all(&self, events: &EventSender) -> Result<ToolPaths, ProvisionError> {
        let yt_dlp = self.ensure(ToolId::YtDlp, events).await?;
        let ffmpeg = self.ensure(ToolId::Ffmpeg, events).await?;

        let _ = events.send(ProgressEvent::provisioning(
            Some(100.0),
            "External tools ready",
        ));

        Ok(ToolPaths { yt_dlp, ffmpeg })
    }

    /// Ensures one tool is present and executable, returning its path.
    pub async fn ensure(
        &self,
        tool: ToolId,
        events: &EventSender,
    ) -> Result<PathBuf, ProvisionError> {
        let result = self.ensure_inner(tool, events).await;

        match &result {
            Ok(path) => {
                self.set_status(tool, ToolStatus::Ready { path: path.clone() });
            }
            Err(ProvisionError::UnsupportedPlatform) => {
                self.set_status(tool, ToolStatus::UnsupportedPlatform);
                let _ = events.send(ProgressEvent::error(format!(
                    "{} has no build for this platform",
                    get_tool_spec(tool).display_name
                )));
            }
            Err(e) => {
                self.set_status(
                    tool,
                    ToolStatus::Failed {
                        error: e.to_string(),
                    },
                );
                let _ = events.send(ProgressEvent::error(format!(
                    "Failed to provision {}: {}",
                    get_tool_spec(tool).display_name,
                    e
                )));
            }
        }

        result
    }

    async fn ensure_inner(
        &self,
        tool: ToolId,
        events: &EventSender,
    ) -> Result<PathBuf, ProvisionError> {
        let platform = self.platform.ok_or(ProvisionError::UnsupportedPlatform)?;
        let spec = get_tool_spec(tool);
        let target = paths::resolve_in(&self.tools_dir, tool, platform);

        // Fast path: already provisioned on a previous launch.
        if target.is_file() {
            info!("{} already present at {}", tool, target.display());
            make_executable(&target)
                .map_err(|e| ProvisionError::filesystem(format!("{:#}", e)))?;
            let _ = events.send(ProgressEvent::provisioning(
                None,
                format!("{} found, skipping download", spec.display_name),
            ));
            return Ok(target);
        }

        tokio::fs::create_dir_all(&self.tools_dir).await.map_err(|e| {
            ProvisionError::filesystem(format!(
                "Failed to create {}: {}",
                self.tools_dir.display(),
                e
            ))
        })?;

        let download = spec
            .download_for(platform)
            .ok_or(ProvisionError::UnsupportedPlatform)?;

        self.set_status(tool, ToolStatus::Downloading { percent: 0 });
        let _ = events.send(ProgressEvent::provisioning(
            Some(0.0),
            format!("Downloading {}...", spec.display_name),
        ));

        let part_path = self
            .tools_dir
            .join(format!("{}{}", tool.as_str(), PART_SUFFIX));

        // Throttle to whole-percent steps so the channel is not flooded
        // with one event per network chunk.
        let last_percent = AtomicU32::new(u32::MAX);
        fetch_artifact(
            download.url,
            &part_path,
            download.sha256,
            spec.min_size_bytes,
            |progress| {
                let Some(percent) = progress.percent else {
                    return;
                };
                let whole = percent.clamp(0.0, 100.0) as u32;
                if last_percent.swap(whole, Ordering::Relaxed) == whole {
                    return;
                }
                self.set_status(
                    tool,
                    ToolStatus::Downloading {
                        percent: whole as u8,
                    },
                );
                let _ = events.send(ProgressEvent::provisioning(
                    Some(whole as f32),
                    format!("Downloading {} ({}%)", spec.display_name, whole),
                ));
            },
        )
        .await?;

        let kind = spec
            .artifact_kind(platform)
            .ok_or(ProvisionError::UnsupportedPlatform)?;

        if kind.requires_extraction() {
            let _ = events.send(ProgressEvent::provisioning(
                None,
                format!("Unpacking {}...", spec.display_name),
            ));
            self.install_from_archive(tool, platform, &part_path, &target, kind)
                .await?;
        } else {
            tokio::fs::rename(&part_path, &target).await.map_err(|e| {
                ProvisionError::filesystem(format!(
                    "Failed to move {} into place: {}",
                    target.display(),
                    e
                ))
            })?;
        }

        make_executable(&target).map_err(|e| ProvisionError::filesystem(format!("{:#}", e)))?;

        info!("{} provisioned at {}", tool, target.display());
        let _ = events.send(ProgressEvent::provisioning(
            None,
            format!("{} ready", spec.display_name),
        ));

        Ok(target)
    }

    /// Unpacks an archive artifact and moves the tool executable (plus
    /// ffprobe, when shipped alongside ffmpeg) into the tools directory.
    async fn install_from_archive(
        &self,
        tool: ToolId,
        platform: Platform,
        part_path: &Path,
        target: &Path,
        kind: super::types::ArtifactKind,
    ) -> Result<(), ProvisionError> {
        let spec = get_tool_spec(tool);
        let extract_dir = self
            .tools_dir
            .join(format!("{}{}", tool.as_str(), EXTRACT_SUFFIX));

        // Stale scratch from an interrupted run.
        if extract_dir.exists() {
            let _ = tokio::fs::remove_dir_all(&extract_dir).await;
        }

        {
            let part_path = part_path.to_path_buf();
            let extract_dir = extract_dir.clone();
            tokio::task::spawn_blocking(move || extract_archive(&part_path, &extract_dir, kind))
                .await
                .map_err(|e| ProvisionError::filesystem(format!("Extraction task failed: {}", e)))?
                .map_err(|e| ProvisionError::corrupt(format!("{:#}", e)))?;
        }

        let exe_name = spec.executable_name(platform);
        let found = locate_executable(&extract_dir, exe_name).ok_or_else(|| {
            ProvisionError::corrupt(format!("Archive did not contain {}", exe_name))
        })?;

        tokio::fs::rename(&found, target).await.map_err(|e| {
            ProvisionError::filesystem(format!(
                "Failed to move {} into place: {}",
                target.display(),
                e
            ))
        })?;

        // ffmpeg archives usually bundle ffprobe; keep it next to ffmpeg so
        // yt-dlp can find both through --ffmpeg-location. Best-effort.
        if tool == ToolId::Ffmpeg {
            let probe_name = if platform.is_posix() {
                "ffprobe"
            } else {
                "ffprobe.exe"
            };
            if let Some(probe) = locate_executable(&extract_dir, probe_name) {
                let probe_target = self.tools_dir.join(probe_name);
                if tokio::fs::rename(&probe, &probe_target).await.is_ok() {
                    let _ = make_executable(&probe_target);
                } else {
                    warn!("Could not relocate ffprobe; continuing without it");
                }
            }
        }

        let _ = tokio::fs::remove_dir_all(&extract_dir).await;
        let _ = tokio::fs::remove_file(part_path).await;

        Ok(())
    }

    fn set_status(&self, tool: ToolId, status: ToolStatus) {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        guard.set(tool, status);
    }
}
