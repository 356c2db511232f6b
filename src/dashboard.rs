//! Dashboard GUI
//!
//! Single window for entering or uploading text, choosing categories,
//! masking, and reviewing the highlighted result.

use std::path::PathBuf;
use std::time::Instant;

use eframe::egui;
use egui_phosphor::regular::*;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::category::CategoryRejected;
use crate::clipboard::ClipboardManager;
use crate::config::Config;
use crate::detection::MaskResponse;
use crate::error::ServiceError;
use crate::segment::SpanKind;
use crate::service::{FileUpload, HttpPiiClient, PiiService};
use crate::session::{MaskTicket, MaskingSession, UploadTicket};

/// Accepted document formats, as advertised to the user
pub const ACCEPTED_FORMATS: &str = "TXT, PDF, DOCX, CSV, XLSX";

/// Results coming back from background tasks
enum DashboardEvent {
    UploadSettled {
        ticket: UploadTicket,
        result: Result<String, ServiceError>,
    },
    MaskSettled {
        ticket: MaskTicket,
        result: Result<MaskResponse, ServiceError>,
    },
    Health(bool),
}

/// Dashboard application state
pub struct Dashboard {
    /// Session being edited
    session: MaskingSession,
    /// Masking service
    client: HttpPiiClient,
    /// Configuration
    config: Config,
    /// Runtime that network calls are spawned on
    runtime: Handle,
    events_tx: mpsc::UnboundedSender<DashboardEvent>,
    events_rx: mpsc::UnboundedReceiver<DashboardEvent>,
    /// Last health probe result, `None` until the first probe settles
    service_online: Option<bool>,
    /// Pending custom category label
    custom_category: String,
    /// Path typed into the open-file field
    file_path_input: String,
    /// When the masked text was last copied
    copied_at: Option<Instant>,
    clipboard_available: bool,
    /// Status message
    status_message: Option<(String, Instant)>,
}

impl Dashboard {
    /// Create a new dashboard and start polling service health
    pub fn new(
        ctx: &egui::Context,
        client: HttpPiiClient,
        config: Config,
        runtime: Handle,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let dashboard = Self {
            session: MaskingSession::new(),
            client,
            config,
            runtime,
            events_tx,
            events_rx,
            service_online: None,
            custom_category: String::new(),
            file_path_input: String::new(),
            copied_at: None,
            clipboard_available: ClipboardManager::is_available(),
            status_message: None,
        };
        dashboard.spawn_health_poll(ctx.clone());
        dashboard
    }

    /// Run the dashboard
    pub fn run(client: HttpPiiClient, config: Config, runtime: Handle) -> Result<(), eframe::Error> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([1100.0, 720.0])
                .with_min_inner_size([760.0, 520.0])
                .with_drag_and_drop(true)
                .with_title("PII Shield"),
            ..Default::default()
        };

        eframe::run_native(
            "PII Shield",
            options,
            Box::new(move |cc| {
                let mut fonts = egui::FontDefinitions::default();
                egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
                cc.egui_ctx.set_fonts(fonts);

                Ok(Box::new(Dashboard::new(&cc.egui_ctx, client, config, runtime)))
            }),
        )
    }

    fn show_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    fn spawn_health_poll(&self, ctx: egui::Context) {
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let interval = self.config.health_poll_interval();

        self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let online = client.is_available().await;
                if tx.send(DashboardEvent::Health(online)).is_err() {
                    break;
                }
                ctx.request_repaint();
            }
        });
    }

    fn start_upload(&mut self, ctx: &egui::Context, upload: FileUpload) {
        let ticket = self.session.begin_upload(upload.file_name.clone());
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let ctx = ctx.clone();

        self.runtime.spawn(async move {
            let result = client.extract_text(upload).await;
            let _ = tx.send(DashboardEvent::UploadSettled { ticket, result });
            ctx.request_repaint();
        });
    }

    fn start_upload_from_path(&mut self, ctx: &egui::Context, path: PathBuf) {
        match FileUpload::from_path(&path) {
            Ok(upload) => self.start_upload(ctx, upload),
            Err(e) => {
                warn!("Could not open {}: {:#}", path.display(), e);
                self.show_status(format!("Could not open file: {:#}", e));
            }
        }
    }

    fn start_mask(&mut self, ctx: &egui::Context) {
        // Validation failures are recorded on the session and shown inline
        let Ok(Some(ticket)) = self.session.begin_mask() else {
            return;
        };

        let text = ticket.text().to_string();
        let categories = ticket.categories().to_vec();
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let ctx = ctx.clone();

        self.runtime.spawn(async move {
            let result = client.mask(text, categories).await;
            let _ = tx.send(DashboardEvent::MaskSettled { ticket, result });
            ctx.request_repaint();
        });
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                DashboardEvent::UploadSettled { ticket, result } => {
                    self.session.finish_upload(ticket, result);
                }
                DashboardEvent::MaskSettled { ticket, result } => {
                    self.session.finish_mask(ticket, result);
                }
                DashboardEvent::Health(online) => {
                    if self.service_online != Some(online) {
                        info!("Masking service is {}", if online { "online" } else { "offline" });
                    }
                    self.service_online = Some(online);
                }
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if dropped.is_empty() {
            return;
        }
        if self.session.is_busy() {
            self.show_status("Wait for the current request to finish");
            return;
        }
        // Only the first file is used
        if let Some(file) = dropped.into_iter().next() {
            if let Some(bytes) = file.bytes {
                let name = if file.name.is_empty() { "dropped-file".to_string() } else { file.name };
                self.start_upload(ctx, FileUpload::new(name, bytes.to_vec()));
            } else if let Some(path) = file.path {
                self.start_upload_from_path(ctx, path);
            }
        }
    }
}

impl eframe::App for Dashboard {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match self.config.theme.as_str() {
            "light" => ctx.set_visuals(egui::Visuals::light()),
            "dark" => ctx.set_visuals(egui::Visuals::dark()),
            _ => {} // "system" - use default
        }

        self.drain_events();
        self.handle_dropped_files(ctx);

        // Clear old status messages
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() > std::time::Duration::from_secs(3) {
                self.status_message = None;
            }
        }
        if let Some(time) = self.copied_at {
            if time.elapsed() > self.config.copy_feedback() {
                self.copied_at = None;
            }
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.add_space(5.0);
            ui.horizontal(|ui| {
                ui.heading(format!("{} PII Shield", SHIELD_CHECK));

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let (color, text) = match self.service_online {
                        Some(true) => (egui::Color32::from_rgb(34, 197, 94), "Online"),
                        Some(false) => (egui::Color32::from_rgb(239, 68, 68), "Offline"),
                        None => (egui::Color32::GRAY, "Checking..."),
                    };
                    ui.label(text).on_hover_text(self.client.base_url());
                    ui.colored_label(color, CIRCLE);
                });
            });
            ui.add_space(5.0);
        });

        // Status bar
        if let Some((message, _)) = &self.status_message {
            egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(INFO);
                    ui.label(message);
                });
            });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.columns(2, |columns| {
                self.show_input_panel(&mut columns[0], ctx);
                self.show_output_panel(&mut columns[1]);
            });
        });

        // Keep the spinners and the copy feedback moving
        if self.session.is_loading() || self.session.is_uploading() || self.copied_at.is_some() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}

impl Dashboard {
    fn show_input_panel(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.heading(format!("{} Input", PENCIL_SIMPLE));
        ui.add_space(5.0);

        let mut text = self.session.source_text().to_string();
        egui::ScrollArea::vertical()
            .id_salt("input_scroll")
            .max_height(260.0)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let edit = egui::TextEdit::multiline(&mut text)
                    .hint_text("Paste or type text containing PII here...\n\nExample: My name is John Smith, email john@example.com, phone 138-1234-5678")
                    .desired_rows(12)
                    .desired_width(f32::INFINITY);
                if ui.add(edit).changed() {
                    self.session.set_source_text(text);
                }
            });

        ui.add_space(8.0);
        self.show_file_section(ui, ctx);

        ui.add_space(8.0);
        self.show_categories(ui);

        if let Some(message) = self.session.error_message() {
            ui.add_space(5.0);
            ui.colored_label(
                egui::Color32::from_rgb(239, 68, 68),
                format!("{} {}", WARNING, message),
            );
        }

        ui.add_space(8.0);
        let label = if self.session.is_loading() {
            format!("{} Analyzing...", SPINNER)
        } else {
            format!("{} Mask PII", SHIELD_CHECK)
        };
        let button = egui::Button::new(label).min_size(egui::vec2(ui.available_width(), 32.0));
        if ui.add_enabled(self.session.can_submit(), button).clicked() {
            self.start_mask(ctx);
        }
    }

    fn show_file_section(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        if let Some(name) = self.session.uploaded_file_name().map(str::to_string) {
            ui.horizontal(|ui| {
                ui.label(format!("{} {}", FILE_TEXT, name));
                if ui.small_button(X).on_hover_text("Remove file").clicked() {
                    self.session.remove_file();
                    self.file_path_input.clear();
                }
            });
            return;
        }

        let hovering = ctx.input(|i| !i.raw.hovered_files.is_empty()) && !self.session.is_busy();
        ui.group(|ui| {
            ui.set_width(ui.available_width());
            if hovering {
                ui.label(format!("{} Release to extract text", UPLOAD_SIMPLE));
            } else {
                ui.label(format!("{} Drop a file here or open one by path", UPLOAD_SIMPLE));
            }
            ui.small(ACCEPTED_FORMATS);

            ui.horizontal(|ui| {
                let edit = egui::TextEdit::singleline(&mut self.file_path_input)
                    .hint_text("/path/to/document.pdf")
                    .desired_width(ui.available_width() - 70.0);
                let response = ui.add(edit);
                let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

                let can_open = !self.file_path_input.trim().is_empty() && !self.session.is_busy();
                let clicked = ui.add_enabled(can_open, egui::Button::new("Open")).clicked();
                if can_open && (clicked || submitted) {
                    let path = PathBuf::from(self.file_path_input.trim());
                    self.start_upload_from_path(ctx, path);
                }
            });

            if self.session.is_uploading() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Extracting text...");
                });
            }
        });
    }

    fn show_categories(&mut self, ui: &mut egui::Ui) {
        let header = format!(
            "{} PII Categories ({} active)",
            SHIELD,
            self.session.categories().active_count()
        );

        egui::CollapsingHeader::new(header)
            .id_salt("categories")
            .default_open(true)
            .show(ui, |ui| {
                let mut toggled = None;
                ui.horizontal_wrapped(|ui| {
                    for category in self.session.categories().iter() {
                        let label = format!("{} {}", category_icon(&category.id), category.label);
                        if ui.selectable_label(category.active, label).clicked() {
                            toggled = Some(category.id.clone());
                        }
                    }
                });
                if let Some(id) = toggled {
                    self.session.toggle_category(&id);
                }

                ui.add_space(5.0);
                ui.horizontal(|ui| {
                    let edit = egui::TextEdit::singleline(&mut self.custom_category)
                        .hint_text("Add custom category...")
                        .desired_width(ui.available_width() - 70.0);
                    let response = ui.add(edit);
                    let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

                    if ui.button(format!("{} Add", PLUS)).clicked() || submitted {
                        self.add_custom_category();
                    }
                });
            });
    }

    fn add_custom_category(&mut self) {
        match self.session.add_category(&self.custom_category) {
            Ok(category) => {
                let message = format!("Added category: {}", category.label);
                self.custom_category.clear();
                self.show_status(message);
            }
            Err(CategoryRejected::Duplicate(id)) => {
                self.show_status(format!("Category '{}' already exists", id));
            }
            Err(CategoryRejected::Empty) => {}
        }
    }

    fn show_output_panel(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading(format!("{} Masked Output", LOCK));

            if self.session.masked_text().is_some() && self.clipboard_available {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let label = if self.copied_at.is_some() {
                        format!("{} Copied!", CHECK)
                    } else {
                        format!("{} Copy", COPY)
                    };
                    if ui.button(label).clicked() {
                        if let Some(text) = self.session.masked_text() {
                            ClipboardManager::set_text_background(&self.runtime, text);
                            self.copied_at = Some(Instant::now());
                        }
                    }
                });
            }
        });
        ui.add_space(5.0);

        let Some(spans) = self.session.output_spans() else {
            ui.add_space(40.0);
            ui.vertical_centered(|ui| {
                if self.session.is_loading() {
                    ui.spinner();
                    ui.label("Analyzing...");
                } else {
                    ui.heading(MAGNIFYING_GLASS);
                    ui.label("Masked output will appear here");
                    ui.small("Enter text and click \"Mask PII\" to start");
                }
            });
            return;
        };

        if self.session.is_output_stale() {
            ui.weak("Input changed since this result was produced");
        }

        let text_color = ui.visuals().text_color();
        let mut job = egui::text::LayoutJob::default();
        job.wrap.max_width = ui.available_width();
        for span in &spans {
            let format = match span.kind {
                SpanKind::Masked => egui::TextFormat {
                    font_id: egui::FontId::monospace(14.0),
                    color: egui::Color32::WHITE,
                    background: egui::Color32::from_rgb(185, 28, 28),
                    ..Default::default()
                },
                SpanKind::Plain => egui::TextFormat {
                    font_id: egui::FontId::proportional(14.0),
                    color: text_color,
                    ..Default::default()
                },
            };
            job.append(span.text, 0.0, format);
        }

        egui::ScrollArea::vertical()
            .id_salt("output_scroll")
            .max_height(420.0)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.label(job);
            });

        let tally = self.session.detection_tally();
        if !tally.is_empty() {
            ui.add_space(8.0);
            ui.horizontal_wrapped(|ui| {
                for (category, count) in &tally {
                    let badge = egui::RichText::new(format!("{} {}  {}", category_icon(category), category, count))
                        .background_color(ui.visuals().faint_bg_color)
                        .strong();
                    ui.label(badge);
                }
            });
        }
    }
}

/// Icon shown next to a category; custom categories get a tag
fn category_icon(id: &str) -> &'static str {
    match id {
        "name" => USER,
        "phone" => PHONE,
        "email" => ENVELOPE,
        "address" => MAP_PIN,
        "id_number" => IDENTIFICATION_CARD,
        "bank_card" => CREDIT_CARD,
        "social_media" => GLOBE,
        _ => TAG,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_icons() {
        assert_eq!(category_icon("email"), ENVELOPE);
        assert_eq!(category_icon("license plate"), TAG);
        assert_ne!(category_icon("name"), category_icon("phone"));
    }
}
