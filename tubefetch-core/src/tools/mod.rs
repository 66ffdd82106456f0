//! External tool provisioning.
//!
//! The downloader shells out to two external programs, yt-dlp and ffmpeg,
//! which are fetched on first launch rather than assumed to be installed.
//! This module owns the whole lifecycle:
//!
//! - `types` - tool identifiers, platform detection, status tracking
//! - `catalog` - static per-platform download specifications
//! - `paths` - tools/downloads directory layout and executable resolution
//! - `fetch` - streaming artifact download with validation
//! - `extract` - archive unpacking and executable lookup
//! - `provisioner` - orchestrates the above into ensure/ensure_all

pub mod catalog;
pub mod extract;
pub mod fetch;
pub mod paths;
pub mod provisioner;
pub mod types;

pub use catalog::{get_all_tool_specs, get_tool_spec};
pub use provisioner::ToolProvisioner;
pub use types::{Platform, ProvisioningState, ToolId, ToolPaths, ToolSpec, ToolStatus};
