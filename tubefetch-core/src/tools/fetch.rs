//! Streaming artifact download with progress reporting and validation.
//!
//! Downloads tool artifacts using reqwest with a chunked body stream so the
//! UI can render intermediate progress. URLs are restricted to HTTPS and a
//! fixed allow-list of release hosts; payloads are hashed while streaming and
//! checked against an optional pinned SHA256 plus a minimum-size sanity floor.

use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::ProvisionError;

// ============================================================================
// URL Validation
// ============================================================================

/// Hosts tool artifacts may be fetched from.
const ALLOWED_DOMAINS: &[&str] = &[
    "github.com",
    "gyan.dev",
    "evermeet.cx",
    "johnvansickle.com",
];

/// Validates that a URL is safe for downloading.
///
/// Checks:
/// - URL scheme must be HTTPS
/// - Host must be in the allowed domain list (subdomains included)
fn validate_url(url_str: &str) -> Result<(), ProvisionError> {
    let url = Url::parse(url_str)
        .map_err(|e| ProvisionError::network(format!("Invalid URL {}: {}", url_str, e)))?;

    if url.scheme() != "https" {
        return Err(ProvisionError::network(format!(
            "URL must use HTTPS: {}",
            url_str
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| ProvisionError::network(format!("URL must have a host: {}", url_str)))?;

    let is_allowed = ALLOWED_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)));

    if !is_allowed {
        return Err(ProvisionError::network(format!(
            "Download domain not allowed: {}",
            host
        )));
    }

    Ok(())
}

// ============================================================================
// Fetch Progress
// ============================================================================

/// Progress information during an artifact download.
#[derive(Debug, Clone)]
pub struct FetchProgress {
    /// Bytes downloaded so far.
    pub bytes_downloaded: u64,
    /// Total bytes expected (if known from Content-Length header).
    pub total_bytes: Option<u64>,
    /// Progress percentage (0.0 to 100.0), or None if total is unknown.
    pub percent: Option<f32>,
}

impl FetchProgress {
    fn new(bytes_downloaded: u64, total_bytes: Option<u64>) -> Self {
        let percent = total_bytes.map(|total| {
            if total > 0 {
                (bytes_downloaded as f32 / total as f32) * 100.0
            } else {
                0.0
            }
        });

        Self {
            bytes_downloaded,
            total_bytes,
            percent,
        }
    }
}

// ============================================================================
// Fetch Function
// ============================================================================

/// Downloads a tool artifact to `dest` with streaming progress.
///
/// On checksum mismatch or an undersized payload the partial file is removed
/// so a failed fetch can never be mistaken for a ready tool.
///
/// # Errors
///
/// - [`ProvisionError::Network`] - disallowed URL, connection failure, or a
///   non-success status code.
/// - [`ProvisionError::Filesystem`] - the file cannot be created or written.
/// - [`ProvisionError::CorruptArtifact`] - SHA256 mismatch or fewer than
///   `min_size_bytes` bytes received.
pub async fn fetch_artifact<F>(
    url: &str,
    dest: &Path,
    expected_sha256: Option<&str>,
    min_size_bytes: u64,
    progress_cb: F,
) -> Result<u64, ProvisionError>
where
    F: Fn(FetchProgress),
{
    validate_url(url)?;
    fetch_stream(url, dest, expected_sha256, min_size_bytes, progress_cb).await
}

/// The streaming body of [`fetch_artifact`], past URL validation.
async fn fetch_stream<F>(
    url: &str,
    dest: &Path,
    expected_sha256: Option<&str>,
    min_size_bytes: u64,
    progress_cb: F,
) -> Result<u64, ProvisionError>
where
    F: Fn(FetchProgress),
{
    info!("Downloading {} to {}", url, dest.display());

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            ProvisionError::filesystem(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let client = http_client()?;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ProvisionError::network(format!("Failed to start download: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProvisionError::network(format!(
            "Download failed with status {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown error")
        )));
    }

    let total_bytes = response.content_length();
    debug!("Content-Length: {:?}", total_bytes);

    let mut file = File::create(dest).await.map_err(|e| {
        ProvisionError::filesystem(format!("Failed to create {}: {}", dest.display(), e))
    })?;

    // Stream the body while computing SHA256.
    let mut stream = response.bytes_stream();
    let mut bytes_downloaded: u64 = 0;
    let mut hasher = Sha256::new();

    progress_cb(FetchProgress::new(0, total_bytes));

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result
            .map_err(|e| ProvisionError::network(format!("Failed to read response: {}", e)))?;

        hasher.update(&chunk);

        file.write_all(&chunk).await.map_err(|e| {
            ProvisionError::filesystem(format!("Failed to write {}: {}", dest.display(), e))
        })?;

        bytes_downloaded += chunk.len() as u64;
        progress_cb(FetchProgress::new(bytes_downloaded, total_bytes));
    }

    file.flush()
        .await
        .map_err(|e| ProvisionError::filesystem(format!("Failed to flush file: {}", e)))?;
    drop(file);

    if bytes_downloaded < min_size_bytes {
        let _ = tokio::fs::remove_file(dest).await;
        return Err(ProvisionError::corrupt(format!(
            "Artifact is only {} bytes (expected at least {})",
            bytes_downloaded, min_size_bytes
        )));
    }

    if let Some(expected) = expected_sha256 {
        let actual_hex = format_sha256_hex(&hasher.finalize());
        if actual_hex != expected.to_lowercase() {
            let _ = tokio::fs::remove_file(dest).await;
            return Err(ProvisionError::corrupt(format!(
                "SHA256 mismatch: expected {}, got {}",
                expected, actual_hex
            )));
        }
        debug!("SHA256 verified: {}", actual_hex);
    }

    info!(
        "Download complete: {} bytes written to {}",
        bytes_downloaded,
        dest.display()
    );

    Ok(bytes_downloaded)
}

/// How long to wait for a connection before giving up. Bodies stream for
/// as long as they keep producing chunks, so only the connect is bounded.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

fn http_client() -> Result<reqwest::Client, ProvisionError> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| ProvisionError::network(format!("Failed to build HTTP client: {}", e)))
}

/// Formats a SHA256 hash as lowercase hex.
fn format_sha256_hex(hash: &[u8]) -> String {
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}
