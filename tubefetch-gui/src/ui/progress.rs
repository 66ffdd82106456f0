//! Progress bar for the current phase.

use eframe::egui;

use crate::app::TubefetchApp;

/// Render the progress bar. Hidden until the first job starts.
pub fn render(app: &TubefetchApp, ui: &mut egui::Ui) {
    if app.phase_label.is_empty() {
        return;
    }

    let (fraction, animate) = match app.progress {
        Some(percent) => (percent / 100.0, false),
        // Indeterminate phases (post-processing) pulse instead
        None => (1.0, app.is_downloading),
    };

    let bar = egui::ProgressBar::new(fraction)
        .text(match app.progress {
            Some(percent) => format!("{} {:.0}%", app.phase_label, percent),
            None => app.phase_label.clone(),
        })
        .animate(animate);

    ui.add(bar);
}
