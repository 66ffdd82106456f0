//! TubeFetch GUI Application
//!
//! A desktop media downloader with a native interface, backed by yt-dlp
//! and ffmpeg which are provisioned automatically on first launch.

mod app;
mod ui;

use eframe::egui;

fn main() -> eframe::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tubefetch=debug".parse().unwrap())
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting TubeFetch v{}", tubefetch_core::VERSION);

    // Create tokio runtime for async operations
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let _guard = runtime.enter();

    // Window configuration
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([700.0, 520.0])
            .with_min_inner_size([560.0, 420.0])
            .with_title("TubeFetch - Media Downloader"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "TubeFetch",
        options,
        Box::new(|cc| Ok(Box::new(app::TubefetchApp::new(cc, runtime)))),
    )
}
