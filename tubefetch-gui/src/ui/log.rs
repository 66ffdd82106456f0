//! Scrolling activity log.

use eframe::egui::{self, RichText};

use crate::app::TubefetchApp;
use crate::ui::colors;

/// Render the activity log, pinned to the bottom as lines arrive.
pub fn render(app: &TubefetchApp, ui: &mut egui::Ui) {
    let bg = colors::log_bg(ui.visuals());
    let muted = colors::muted(ui.visuals());

    egui::Frame::none()
        .fill(bg)
        .inner_margin(egui::Margin::same(6.0))
        .rounding(4.0)
        .show(ui, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    if app.log.is_empty() {
                        ui.label(
                            RichText::new("Paste a URL and hit Download.")
                                .size(12.0)
                                .color(muted),
                        );
                        return;
                    }

                    for line in &app.log {
                        ui.label(RichText::new(line).monospace().size(11.0));
                    }
                });
        });
}
