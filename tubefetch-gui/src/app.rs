//! Main application state and update loop.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use eframe::egui;
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

use tubefetch_core::tools::paths;
use tubefetch_core::worker::{self, cancel_pair, CancelHandle, DownloadRequest, FormatChoice};
use tubefetch_core::{
    event_channel, EventReceiver, EventSender, Phase, ProgressEvent, ProvisioningState, ToolPaths,
    ToolProvisioner,
};

use crate::ui;

/// Keep the log from growing without bound on long sessions.
const MAX_LOG_LINES: usize = 500;

/// Main application state.
pub struct TubefetchApp {
    /// Tokio runtime for async operations.
    pub runtime: Runtime,

    // -------------------------------------------------------------------------
    // Tool Provisioning
    // -------------------------------------------------------------------------
    /// Shared per-tool status, written by the provisioner.
    pub provisioning: Arc<Mutex<ProvisioningState>>,

    /// Resolved tool paths once provisioning completes.
    pub tool_paths: Option<ToolPaths>,

    /// Pending provisioning result receiver.
    provision_rx: Option<tokio::sync::oneshot::Receiver<Result<ToolPaths, String>>>,

    // -------------------------------------------------------------------------
    // Download Form
    // -------------------------------------------------------------------------
    /// Current URL input text.
    pub url_input: String,

    /// Selected output format.
    pub format: FormatChoice,

    /// Destination directory for finished files.
    pub dest_dir: PathBuf,

    /// Pending folder selection result receiver.
    folder_result_rx: Option<tokio::sync::oneshot::Receiver<Option<PathBuf>>>,

    // -------------------------------------------------------------------------
    // Job State
    // -------------------------------------------------------------------------
    /// Whether a download job is currently running.
    pub is_downloading: bool,

    /// Progress of the current phase (0-100), or None when indeterminate.
    pub progress: Option<f32>,

    /// Short label for the current phase, shown on the progress bar.
    pub phase_label: String,

    /// Activity log shown in the main panel.
    pub log: Vec<String>,

    /// Event sender handed to spawned jobs.
    event_tx: EventSender,

    /// Event receiver drained every frame.
    event_rx: EventReceiver,

    /// Cancel handle for the running job.
    cancel_handle: Option<CancelHandle>,

    // -------------------------------------------------------------------------
    // UI State
    // -------------------------------------------------------------------------
    /// Status message with its creation time.
    pub status_message: Option<(String, chrono::DateTime<chrono::Utc>)>,
}

impl TubefetchApp {
    /// Create a new application instance and kick off tool provisioning.
    pub fn new(cc: &eframe::CreationContext<'_>, runtime: Runtime) -> Self {
        info!("Initializing TubefetchApp");

        let mut style = (*cc.egui_ctx.style()).clone();
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        cc.egui_ctx.set_style(style);

        let (event_tx, event_rx) = event_channel();

        let mut app = Self {
            runtime,
            provisioning: Arc::new(Mutex::new(ProvisioningState::new())),
            tool_paths: None,
            provision_rx: None,
            url_input: String::new(),
            format: FormatChoice::VideoMp4,
            dest_dir: paths::downloads_dir(),
            folder_result_rx: None,
            is_downloading: false,
            progress: None,
            phase_label: String::new(),
            log: Vec::new(),
            event_tx,
            event_rx,
            cancel_handle: None,
            status_message: None,
        };

        app.start_provisioning();
        app
    }

    /// True once both tools are ready for use.
    pub fn tools_ready(&self) -> bool {
        self.tool_paths.is_some()
    }

    /// Kick off tool provisioning on the runtime.
    fn start_provisioning(&mut self) {
        if self.provision_rx.is_some() {
            return;
        }

        info!("Starting tool provisioning");
        self.set_status("Checking external tools...");

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.provision_rx = Some(rx);

        let state = Arc::clone(&self.provisioning);
        let events = self.event_tx.clone();

        self.runtime.spawn(async move {
            let provisioner = ToolProvisioner::new(state);
            let result = provisioner
                .ensure_all(&events)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(result);
        });
    }

    /// Check for provisioning completion.
    fn check_provisioning(&mut self) {
        if let Some(mut rx) = self.provision_rx.take() {
            match rx.try_recv() {
                Ok(Ok(tool_paths)) => {
                    info!("Tools provisioned: {:?}", tool_paths);
                    self.tool_paths = Some(tool_paths);
                    self.set_status("Tools ready");
                }
                Ok(Err(e)) => {
                    error!("Provisioning failed: {}", e);
                    self.set_status(&format!("Tool setup failed: {}", e));
                }
                Err(tokio::sync::oneshot::error::TryRecvError::Empty) => {
                    // Still waiting
                    self.provision_rx = Some(rx);
                }
                Err(tokio::sync::oneshot::error::TryRecvError::Closed) => {
                    warn!("Provisioning channel closed unexpectedly");
                    self.set_status("Tool setup failed unexpectedly");
                }
            }
        }
    }

    /// Start a download job for the current form state.
    pub fn start_download(&mut self) {
        let url = self.url_input.trim().to_string();
        if url.is_empty() {
            self.set_status("Enter a URL first");
            return;
        }

        if self.is_downloading {
            self.set_status("A download is already running");
            return;
        }

        let Some(tools) = self.tool_paths.clone() else {
            self.set_status("Tools are not ready yet");
            return;
        };

        info!("Starting download: {}", url);
        self.push_log(format!("Starting download: {}", url));
        self.progress = Some(0.0);
        self.phase_label = "Starting...".to_string();
        self.is_downloading = true;

        let request = DownloadRequest {
            url,
            format: self.format,
            dest_dir: self.dest_dir.clone(),
        };

        let (cancel_handle, cancel) = cancel_pair();
        self.cancel_handle = Some(cancel_handle);

        let events = self.event_tx.clone();
        self.runtime
            .spawn(async move { worker::run_job(request, tools, events, cancel).await });
    }

    /// Cancel the running download. The job reports its own terminal event.
    pub fn cancel_download(&mut self) {
        info!("Cancel requested");
        if let Some(mut handle) = self.cancel_handle.take() {
            handle.cancel();
        }
        self.set_status("Cancelling...");
    }

    /// Process events from provisioning and download jobs.
    pub fn process_events(&mut self, ctx: &egui::Context) {
        let mut drained = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            drained.push(event);
        }

        for event in drained {
            self.apply_event(event);
            ctx.request_repaint();
        }
    }

    fn apply_event(&mut self, event: ProgressEvent) {
        debug!(?event.phase, "Event: {}", event.message);
        self.push_log(event.message.clone());

        match event.phase {
            Phase::Provisioning => {
                self.phase_label = "Preparing tools".to_string();
                self.progress = event.percent;
            }
            Phase::Downloading => {
                self.phase_label = "Downloading".to_string();
                if event.percent.is_some() {
                    self.progress = event.percent;
                }
            }
            Phase::Processing => {
                self.phase_label = "Processing".to_string();
                self.progress = None;
            }
            Phase::Done => {
                self.phase_label = "Done".to_string();
                self.progress = Some(100.0);
                self.finish_job();
                self.set_status(&format!("Saved: {}", event.message));
            }
            Phase::Error => {
                self.phase_label = "Error".to_string();
                self.progress = Some(0.0);
                if self.is_downloading {
                    self.finish_job();
                }
                self.set_status(&format!("Error: {}", event.message));
            }
        }
    }

    fn finish_job(&mut self) {
        self.is_downloading = false;
        self.cancel_handle = None;
    }

    fn push_log(&mut self, line: String) {
        self.log.push(line);
        if self.log.len() > MAX_LOG_LINES {
            let excess = self.log.len() - MAX_LOG_LINES;
            self.log.drain(..excess);
        }
    }

    /// Set a status message.
    pub fn set_status(&mut self, msg: &str) {
        self.status_message = Some((msg.to_string(), chrono::Utc::now()));
    }

    /// Clear old status messages.
    pub fn clear_old_status(&mut self) {
        if let Some((_, time)) = &self.status_message {
            if chrono::Utc::now() - *time > chrono::Duration::seconds(8) {
                self.status_message = None;
            }
        }
    }

    /// Open a folder selection dialog asynchronously.
    pub fn open_folder_dialog(&mut self) {
        // Don't open another dialog if one is pending
        if self.folder_result_rx.is_some() {
            return;
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.folder_result_rx = Some(rx);

        self.runtime.spawn(async move {
            let folder = rfd::AsyncFileDialog::new()
                .pick_folder()
                .await
                .map(|f| f.path().to_path_buf());
            let _ = tx.send(folder);
        });
    }

    /// Check for folder selection completion.
    fn check_folder_selection(&mut self) {
        if let Some(mut rx) = self.folder_result_rx.take() {
            match rx.try_recv() {
                Ok(Some(folder)) => {
                    info!("Destination set to {}", folder.display());
                    self.dest_dir = folder.clone();
                    self.set_status(&format!("Saving to: {}", folder.display()));
                }
                Ok(None) => {
                    // User cancelled the dialog
                    debug!("Folder selection cancelled");
                }
                Err(tokio::sync::oneshot::error::TryRecvError::Empty) => {
                    // Still waiting
                    self.folder_result_rx = Some(rx);
                }
                Err(tokio::sync::oneshot::error::TryRecvError::Closed) => {
                    warn!("Folder selection channel closed unexpectedly");
                }
            }
        }
    }
}

impl eframe::App for TubefetchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for async completions
        self.check_provisioning();
        self.check_folder_selection();

        // Drain worker events
        self.process_events(ctx);
        self.clear_old_status();

        // Status bar at bottom
        egui::TopBottomPanel::bottom("status_panel")
            .max_height(24.0)
            .show(ctx, |ui| {
                ui::status::render(self, ui);
            });

        // Form and progress at the top
        egui::TopBottomPanel::top("controls_panel").show(ctx, |ui| {
            ui::controls::render(self, ui);
            ui::progress::render(self, ui);
            ui.add_space(4.0);
        });

        // Activity log fills the remaining space
        egui::CentralPanel::default().show(ctx, |ui| {
            ui::log::render(self, ui);
        });

        // Request repaint while background work is in flight
        if self.is_downloading || self.provision_rx.is_some() || self.folder_result_rx.is_some() {
            ctx.request_repaint();
        }
    }
}
