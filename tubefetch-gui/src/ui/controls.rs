//! URL input, format selector, destination picker, and the action buttons.

use eframe::egui::{self, RichText};
use tubefetch_core::FormatChoice;

use crate::app::TubefetchApp;
use crate::ui::colors;

/// Render the download form.
pub fn render(app: &mut TubefetchApp, ui: &mut egui::Ui) {
    ui.add_space(6.0);

    ui.horizontal(|ui| {
        ui.label("URL:");
        let response = ui.add_sized(
            [ui.available_width() - 8.0, 22.0],
            egui::TextEdit::singleline(&mut app.url_input)
                .hint_text("https://www.youtube.com/watch?v=..."),
        );

        // Enter in the URL field starts the download
        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            app.start_download();
        }
    });

    ui.horizontal(|ui| {
        ui.label("Format:");
        egui::ComboBox::from_id_salt("format_choice")
            .selected_text(app.format.label())
            .show_ui(ui, |ui| {
                for format in FormatChoice::all() {
                    ui.selectable_value(&mut app.format, *format, format.label());
                }
            });

        ui.separator();

        ui.label("Save to:");
        let path_str = app.dest_dir.to_string_lossy();
        let display_path = abbreviate_path(&path_str, 40);
        ui.label(RichText::new(display_path).color(colors::muted(ui.visuals())));

        if ui.button("Choose...").clicked() {
            app.open_folder_dialog();
        }
    });

    ui.add_space(2.0);

    ui.horizontal(|ui| {
        if app.is_downloading {
            let cancel = egui::Button::new(RichText::new("Cancel").color(egui::Color32::WHITE))
                .fill(colors::ERROR);
            if ui.add(cancel).clicked() {
                app.cancel_download();
            }
        } else {
            let enabled = app.tools_ready() && !app.url_input.trim().is_empty();
            if ui
                .add_enabled(enabled, egui::Button::new("Download"))
                .clicked()
            {
                app.start_download();
            }

            if !app.tools_ready() {
                ui.label(
                    RichText::new("waiting for tools...")
                        .size(11.0)
                        .color(colors::muted(ui.visuals())),
                );
            }
        }
    });
}

/// Shortens a path for display, keeping its tail. The cut lands on a char
/// boundary so multibyte paths cannot slice mid-character.
fn abbreviate_path(path: &str, max_len: usize) -> String {
    if path.len() <= max_len {
        return path.to_string();
    }

    let mut cut = path.len().saturating_sub(max_len.saturating_sub(3));
    while cut < path.len() && !path.is_char_boundary(cut) {
        cut += 1;
    }
    format!("...{}", &path[cut..])
}
