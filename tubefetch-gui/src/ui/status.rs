//! Status bar at the bottom of the window.

use eframe::egui::{self, RichText};
use tubefetch_core::{ToolId, ToolStatus};

use crate::app::TubefetchApp;
use crate::ui::colors;

/// Render the status bar: transient message on the left, per-tool state on
/// the right.
pub fn render(app: &TubefetchApp, ui: &mut egui::Ui) {
    let muted = colors::muted(ui.visuals());

    ui.horizontal(|ui| {
        if let Some((msg, _)) = &app.status_message {
            let color = if msg.starts_with("Error") || msg.contains("failed") {
                colors::ERROR
            } else {
                muted
            };
            ui.label(RichText::new(msg).size(11.0).color(color));
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let state = match app.provisioning.lock() {
                Ok(guard) => guard.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            };

            for tool in ToolId::all().iter().rev() {
                let (text, color) = match state.get(*tool) {
                    ToolStatus::Missing => ("missing".to_string(), muted),
                    ToolStatus::Downloading { percent } => {
                        (format!("downloading {}%", percent), muted)
                    }
                    ToolStatus::Ready { .. } => ("ready".to_string(), colors::SUCCESS),
                    ToolStatus::Failed { .. } => ("failed".to_string(), colors::ERROR),
                    ToolStatus::UnsupportedPlatform => ("unsupported".to_string(), colors::ERROR),
                };
                ui.label(
                    RichText::new(format!("{}: {}", tool, text))
                        .size(11.0)
                        .color(color),
                );
                ui.separator();
            }
        });
    });
}
