//! TubeFetch core: tool provisioning and the download worker.
//!
//! The crate is UI-agnostic. A frontend creates a shared
//! [`ProvisioningState`](tools::ProvisioningState), runs the
//! [`ToolProvisioner`](tools::ToolProvisioner) once at startup, and then
//! dispatches [`DownloadRequest`](worker::DownloadRequest)s to
//! [`worker::run_job`], observing everything through the
//! [`events`] channel.

pub mod error;
pub mod events;
pub mod tools;
pub mod worker;

pub use error::{DownloadError, ProvisionError};
pub use events::{event_channel, EventReceiver, EventSender, Phase, ProgressEvent};
pub use tools::{Platform, ProvisioningState, ToolId, ToolPaths, ToolProvisioner, ToolStatus};
pub use worker::{cancel_pair, CancelHandle, DownloadRequest, FormatChoice};

/// Crate version, surfaced in the UI title bar.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
