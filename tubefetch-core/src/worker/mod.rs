//! Background download worker.
//!
//! A download job spawns yt-dlp as a child process, streams its stdout line
//! by line, and forwards classified progress over the event channel. Every
//! job emits exactly one terminal event (`Done` or `Error`); cancellation
//! kills the child and counts as an error terminal.

pub mod args;
pub mod progress;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::DownloadError;
use crate::events::{EventSender, ProgressEvent};
use crate::tools::ToolPaths;

use args::build_args;
use progress::{classify_error_line, classify_line, LineEvent};

// ============================================================================
// Request Types
// ============================================================================

/// Output format the user picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatChoice {
    /// Best available video and audio, merged into an MP4 container.
    VideoMp4,
    /// Audio only, extracted and re-encoded to MP3.
    AudioMp3,
}

impl FormatChoice {
    pub fn all() -> &'static [FormatChoice] {
        &[Self::VideoMp4, Self::AudioMp3]
    }

    /// Label shown in the format selector.
    pub fn label(&self) -> &'static str {
        match self {
            Self::VideoMp4 => "Best (Video & Audio MP4)",
            Self::AudioMp3 => "MP3 (Audio Only)",
        }
    }
}

impl fmt::Display for FormatChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One download job as submitted by the UI.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// The media page URL, passed to yt-dlp verbatim.
    pub url: String,
    pub format: FormatChoice,
    /// Directory the finished file lands in.
    pub dest_dir: PathBuf,
}

// ============================================================================
// Cancellation
// ============================================================================

/// UI-side handle that cancels a running job when triggered (or dropped).
pub struct CancelHandle(Option<oneshot::Sender<()>>);

impl CancelHandle {
    /// Requests cancellation. Idempotent; a no-op if the job already ended.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

/// Worker-side receiver for the cancel signal.
pub type CancelSignal = oneshot::Receiver<()>;

/// Creates a linked cancel handle and signal for one job.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = oneshot::channel();
    (CancelHandle(Some(tx)), rx)
}

// ============================================================================
// Job Runner
// ============================================================================

/// Runs one download job to completion.
///
/// Never panics and never returns early without a terminal event on
/// `events`; the UI relies on that to leave the busy state.
pub async fn run_job(
    request: DownloadRequest,
    tools: ToolPaths,
    events: EventSender,
    mut cancel: CancelSignal,
) {
    if request.url.trim().is_empty() {
        let _ = events.send(ProgressEvent::error(
            DownloadError::InvalidUrl("URL is empty".to_string()).to_string(),
        ));
        return;
    }

    if !tools.yt_dlp.is_file() {
        let _ = events.send(ProgressEvent::error(
            DownloadError::ToolMissing(tools.yt_dlp.display().to_string()).to_string(),
        ));
        return;
    }

    if let Err(e) = tokio::fs::create_dir_all(&request.dest_dir).await {
        let _ = events.send(ProgressEvent::error(format!(
            "Cannot create destination {}: {}",
            request.dest_dir.display(),
            e
        )));
        return;
    }

    let cmd_args = build_args(&request, &tools);
    info!("Starting yt-dlp for {}", request.url);
    debug!("yt-dlp args: {:?}", cmd_args);

    let mut child = match Command::new(&tools.yt_dlp)
        .args(&cmd_args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            let err = if e.kind() == std::io::ErrorKind::NotFound {
                DownloadError::ToolMissing(tools.yt_dlp.display().to_string())
            } else {
                DownloadError::ToolFailure {
                    exit_code: -1,
                    detail: format!("Failed to start yt-dlp: {}", e),
                }
            };
            let _ = events.send(ProgressEvent::error(err.to_string()));
            return;
        }
    };

    // stderr is drained on its own task so a chatty stderr can never
    // deadlock the stdout loop.
    let stderr_task = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut classified: Option<DownloadError> = None;
            let mut last_line: Option<String> = None;

            while let Ok(Some(line)) = lines.next_line().await {
                debug!("yt-dlp stderr: {}", line);
                if classified.is_none() {
                    classified = classify_error_line(&line);
                }
                if !line.trim().is_empty() {
                    last_line = Some(line.trim().to_string());
                }
            }

            (classified, last_line)
        })
    });

    let mut output_path: Option<PathBuf> = None;

    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            tokio::select! {
                _ = &mut cancel => {
                    kill_and_report_cancel(&mut child, &events).await;
                    return;
                }
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            handle_stdout_line(&line, &events, &mut output_path);
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!("Failed to read yt-dlp stdout: {}", e);
                            break;
                        }
                    }
                }
            }
        }
    }

    // stdout closed; the process is exiting (or already gone).
    let status = tokio::select! {
        _ = &mut cancel => {
            kill_and_report_cancel(&mut child, &events).await;
            return;
        }
        status = child.wait() => status,
    };

    let (stderr_error, stderr_last) = match stderr_task {
        Some(handle) => handle.await.unwrap_or((None, None)),
        None => (None, None),
    };

    match status {
        Ok(status) if status.success() => {
            info!("yt-dlp finished, output: {:?}", output_path);
            let event = match output_path {
                Some(path) => ProgressEvent::done(&path),
                None => ProgressEvent::done_message("Download complete"),
            };
            let _ = events.send(event);
        }
        Ok(status) => {
            let exit_code = status.code().unwrap_or(-1);
            let err = match stderr_error {
                Some(DownloadError::ToolFailure { detail, .. }) => {
                    DownloadError::ToolFailure { exit_code, detail }
                }
                Some(other) => other,
                None => DownloadError::ToolFailure {
                    exit_code,
                    detail: stderr_last
                        .unwrap_or_else(|| format!("yt-dlp exited with status {}", exit_code)),
                },
            };
            warn!("yt-dlp failed: {}", err);
            let _ = events.send(ProgressEvent::error(err.to_string()));
        }
        Err(e) => {
            let _ = events.send(ProgressEvent::error(format!(
                "Failed to wait for yt-dlp: {}",
                e
            )));
        }
    }
}

fn handle_stdout_line(line: &str, events: &EventSender, output_path: &mut Option<PathBuf>) {
    match classify_line(line) {
        LineEvent::Progress { percent } => {
            let _ = events.send(ProgressEvent::downloading(Some(percent), line.trim()));
        }
        LineEvent::Processing { message } => {
            let _ = events.send(ProgressEvent::processing(message));
        }
        LineEvent::OutputPath(path) => {
            *output_path = Some(path);
            let _ = events.send(ProgressEvent::downloading(None, line.trim()));
        }
        LineEvent::Other => {
            if !line.trim().is_empty() {
                let _ = events.send(ProgressEvent::downloading(None, line.trim()));
            }
        }
    }
}

async fn kill_and_report_cancel(child: &mut tokio::process::Child, events: &EventSender) {
    info!("Cancelling download job");
    if let Err(e) = child.kill().await {
        warn!("Failed to kill yt-dlp: {}", e);
    }
    let _ = events.send(ProgressEvent::error(DownloadError::Cancelled.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{event_channel, Phase};
    use std::time::Duration;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn fake_yt_dlp(dir: &std::path::Path, script_body: &str) -> ToolPaths {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", script_body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        ToolPaths {
            yt_dlp: path,
            ffmpeg: dir.join("ffmpeg"),
        }
    }

    fn request(dir: &std::path::Path) -> DownloadRequest {
        DownloadRequest {
            url: "https://youtu.be/abc123".to_string(),
            format: FormatChoice::VideoMp4,
            dest_dir: dir.join("downloads"),
        }
    }

    async fn collect_until_terminal(
        rx: &mut crate::events::EventReceiver,
    ) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("worker stalled")
                .expect("channel closed before terminal event");
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }

    #[test]
    fn format_labels() {
        assert_eq!(FormatChoice::VideoMp4.label(), "Best (Video & Audio MP4)");
        assert_eq!(FormatChoice::AudioMp3.label(), "MP3 (Audio Only)");
        assert_eq!(FormatChoice::all().len(), 2);
    }

    #[tokio::test]
    async fn empty_url_fails_fast() {
        let temp = TempDir::new().unwrap();
        let (tx, mut rx) = event_channel();
        let (_handle, cancel) = cancel_pair();

        let mut req = request(temp.path());
        req.url = "   ".to_string();
        let tools = ToolPaths {
            yt_dlp: temp.path().join("yt-dlp"),
            ffmpeg: temp.path().join("ffmpeg"),
        };

        run_job(req, tools, tx, cancel).await;

        let event = rx.try_recv().unwrap();
        assert_eq!(event.phase, Phase::Error);
        assert!(rx.try_recv().is_err(), "exactly one terminal event");
    }

    #[tokio::test]
    async fn missing_tool_is_reported() {
        let temp = TempDir::new().unwrap();
        let (tx, mut rx) = event_channel();
        let (_handle, cancel) = cancel_pair();

        let tools = ToolPaths {
            yt_dlp: temp.path().join("no-such-binary"),
            ffmpeg: temp.path().join("ffmpeg"),
        };

        run_job(request(temp.path()), tools, tx, cancel).await;

        let event = rx.try_recv().unwrap();
        assert_eq!(event.phase, Phase::Error);
        assert!(event.message.contains("tool missing"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_job_emits_progress_then_done() {
        let temp = TempDir::new().unwrap();
        let tools = fake_yt_dlp(
            temp.path(),
            concat!(
                "echo '[download] Destination: downloads/Video.mp4'\n",
                "echo '[download]  50.0% of 10.00MiB at 1.00MiB/s ETA 00:05'\n",
                "echo '[download] 100% of 10.00MiB in 00:10'\n",
                "echo '[Merger] Merging formats into \"downloads/Video.mp4\"'\n",
                "exit 0"
            ),
        );

        let (tx, mut rx) = event_channel();
        let (_handle, cancel) = cancel_pair();
        run_job(request(temp.path()), tools, tx, cancel).await;

        let events = collect_until_terminal(&mut rx).await;
        let last = events.last().unwrap();
        assert_eq!(last.phase, Phase::Done);
        assert!(last.message.contains("Video.mp4"));

        assert!(events
            .iter()
            .any(|e| e.phase == Phase::Downloading && e.percent == Some(50.0)));
        assert_eq!(
            events.iter().filter(|e| e.is_terminal()).count(),
            1,
            "exactly one terminal event"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn audio_job_done_path_has_mp3_extension() {
        let temp = TempDir::new().unwrap();
        let tools = fake_yt_dlp(
            temp.path(),
            concat!(
                "echo '[download] Destination: downloads/Track.webm'\n",
                "echo '[download] 100% of 4.00MiB in 00:04'\n",
                "echo '[ExtractAudio] Destination: downloads/Track.mp3'\n",
                "exit 0"
            ),
        );

        let mut req = request(temp.path());
        req.format = FormatChoice::AudioMp3;

        let (tx, mut rx) = event_channel();
        let (_handle, cancel) = cancel_pair();
        run_job(req, tools, tx, cancel).await;

        let events = collect_until_terminal(&mut rx).await;
        let last = events.last().unwrap();
        assert_eq!(last.phase, Phase::Done);
        assert!(last.message.ends_with(".mp3"), "message: {}", last.message);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_job_reports_classified_error() {
        let temp = TempDir::new().unwrap();
        let tools = fake_yt_dlp(
            temp.path(),
            concat!(
                "echo \"ERROR: [generic] 'xyz' is not a valid URL\" 1>&2\n",
                "exit 1"
            ),
        );

        let (tx, mut rx) = event_channel();
        let (_handle, cancel) = cancel_pair();
        run_job(request(temp.path()), tools, tx, cancel).await;

        let events = collect_until_terminal(&mut rx).await;
        let last = events.last().unwrap();
        assert_eq!(last.phase, Phase::Error);
        assert!(last.message.contains("not a valid URL"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unclassified_failure_carries_exit_code() {
        let temp = TempDir::new().unwrap();
        let tools = fake_yt_dlp(temp.path(), "echo 'something odd' 1>&2\nexit 3");

        let (tx, mut rx) = event_channel();
        let (_handle, cancel) = cancel_pair();
        run_job(request(temp.path()), tools, tx, cancel).await;

        let events = collect_until_terminal(&mut rx).await;
        let last = events.last().unwrap();
        assert_eq!(last.phase, Phase::Error);
        assert!(last.message.contains("3"), "message: {}", last.message);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancel_kills_job_with_single_terminal() {
        let temp = TempDir::new().unwrap();
        let tools = fake_yt_dlp(
            temp.path(),
            concat!(
                "echo '[download]   1.0% of 10.00MiB'\n",
                "sleep 30\n",
                "exit 0"
            ),
        );

        let (tx, mut rx) = event_channel();
        let (mut handle, cancel) = cancel_pair();

        let job = tokio::spawn(run_job(request(temp.path()), tools, tx, cancel));

        // Wait for the first progress line so the child is definitely up.
        let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.phase, Phase::Downloading);

        handle.cancel();
        tokio::time::timeout(Duration::from_secs(5), job)
            .await
            .expect("job did not stop after cancel")
            .unwrap();

        let events = collect_until_terminal(&mut rx).await;
        let last = events.last().unwrap();
        assert_eq!(last.phase, Phase::Error);
        assert!(last.message.to_lowercase().contains("cancel"));
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dropping_the_handle_cancels_the_job() {
        let temp = TempDir::new().unwrap();
        let tools = fake_yt_dlp(temp.path(), "sleep 30\nexit 0");

        let (tx, mut rx) = event_channel();
        let (handle, cancel) = cancel_pair();

        let job = tokio::spawn(run_job(request(temp.path()), tools, tx, cancel));
        drop(handle);

        tokio::time::timeout(Duration::from_secs(5), job)
            .await
            .expect("job did not stop after handle drop")
            .unwrap();

        let events = collect_until_terminal(&mut rx).await;
        assert_eq!(events.last().unwrap().phase, Phase::Error);
    }
}
