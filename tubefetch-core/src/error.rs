//! Error taxonomy for provisioning and download jobs.
//!
//! Both error families are recoverable: provisioning errors by re-running the
//! provisioner, download errors by retrying the job. They are converted into
//! terminal [`ProgressEvent`](crate::events::ProgressEvent)s at the worker
//! boundary and never unwind into the UI thread.

use thiserror::Error;

/// Errors raised while locating, fetching, or preparing an external tool.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Network failure: no connectivity, non-2xx response, or a disallowed
    /// download location.
    #[error("network failure: {0}")]
    Network(String),

    /// Write failure under the local tools directory.
    #[error("filesystem failure: {0}")]
    Filesystem(String),

    /// The downloaded artifact failed an integrity or sanity check.
    #[error("corrupt artifact: {0}")]
    CorruptArtifact(String),

    /// The host platform is not in the supported set. Fatal configuration
    /// error; no tool can be provisioned.
    #[error("unsupported platform")]
    UnsupportedPlatform,
}

impl ProvisionError {
    pub fn network(detail: impl std::fmt::Display) -> Self {
        Self::Network(detail.to_string())
    }

    pub fn filesystem(detail: impl std::fmt::Display) -> Self {
        Self::Filesystem(detail.to_string())
    }

    pub fn corrupt(detail: impl std::fmt::Display) -> Self {
        Self::CorruptArtifact(detail.to_string())
    }
}

/// Errors terminating a single download job.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DownloadError {
    /// The URL could not be parsed or resolved by the downloader.
    #[error("invalid or unreachable URL: {0}")]
    InvalidUrl(String),

    /// The content exists but cannot be downloaded (unavailable, private,
    /// region-blocked, or an unsupported site).
    #[error("unsupported or unavailable content: {0}")]
    UnsupportedContent(String),

    /// The downloader exited non-zero without a more specific diagnosis.
    #[error("downloader exited with code {exit_code}: {detail}")]
    ToolFailure { exit_code: i32, detail: String },

    /// The downloader binary was gone at invocation time. Provisioning
    /// succeeded earlier, so this indicates the tools directory was
    /// modified underneath us.
    #[error("external tool missing: {0}")]
    ToolMissing(String),

    /// The job was cancelled by the user.
    #[error("download cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provision_error_messages() {
        let e = ProvisionError::network("status 503");
        assert!(e.to_string().contains("network failure"));
        assert!(e.to_string().contains("503"));

        let e = ProvisionError::corrupt("archive too small");
        assert!(e.to_string().contains("corrupt artifact"));
    }

    #[test]
    fn download_error_messages() {
        let e = DownloadError::ToolFailure {
            exit_code: 1,
            detail: "boom".to_string(),
        };
        assert!(e.to_string().contains("code 1"));
        assert!(e.to_string().contains("boom"));

        assert_eq!(DownloadError::Cancelled.to_string(), "download cancelled");
    }
}
