use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};

use crate::canvas::CanvasEvent;
use crate::engine::TemplateEngine;
use crate::error::AppError;
use crate::session::Session;
use crate::settings::Settings;
use crate::view;
use crate::worker::TemplateJob;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

pub struct TemplateApp {
    settings: Settings,
    engine: Arc<dyn TemplateEngine>,
    session: Session,

    texture: Option<egui::TextureHandle>,
    texture_revision: Option<u64>,

    status: String,
    job: Option<TemplateJob>,
}

impl TemplateApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: Settings,
        engine: Arc<dyn TemplateEngine>,
        initial_image: Option<PathBuf>,
    ) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let mut app = Self {
            settings,
            engine,
            session: Session::new(),
            texture: None,
            texture_revision: None,
            status: String::from("Load an image to start"),
            job: None,
        };
        if let Some(path) = initial_image {
            app.open_image(&path);
        }
        app
    }

    fn busy(&self) -> bool {
        self.job.is_some()
    }

    /// Re-upload the displayed raster when the session swapped it.
    fn ensure_texture(&mut self, ctx: &egui::Context) {
        let revision = self.session.display_revision();
        if self.texture_revision == Some(revision) {
            return;
        }
        self.texture = self.session.displayed_image().map(|img| {
            let size = [img.width() as usize, img.height() as usize];
            let color_image = egui::ColorImage::from_rgb(size, img.as_raw());
            ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR)
        });
        self.texture_revision = Some(revision);
    }

    // ── Actions ─────────────────────────────────────────────────────────────

    fn load_image(&mut self) {
        let Some(path) = FileDialog::new()
            .set_title("Select image")
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
        else {
            return;
        };
        self.open_image(&path);
    }

    fn open_image(&mut self, path: &Path) {
        match self.session.load_image(path) {
            Ok((w, h)) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.status = format!("Loaded image: {name}  size: {w}x{h}");
            }
            Err(err) => self.report_error("Load failed", &format!("Cannot load {}", path.display()), &err),
        }
    }

    fn preprocess(&mut self) {
        match self.session.preprocess() {
            Ok(()) => self.status = "Preprocessing done (CLAHE + gamma)".into(),
            Err(err) => self.report_error("Preprocessing failed", "Cannot preprocess the image", &err),
        }
    }

    fn polygon_completed(&mut self, points: Vec<crate::geometry::Vertex>) {
        match self.session.complete_polygon(points) {
            Ok(count) => self.status = format!("Polygon created with {count} points"),
            Err(err @ AppError::TooFewPoints { .. }) => warn("Invalid polygon", &err.to_string()),
            Err(err) => self.report_error("Polygon failed", "Cannot use this polygon", &err),
        }
    }

    fn clear_points(&mut self) {
        self.session.clear();
        self.status = "All points cleared".into();
    }

    fn export_coordinates(&mut self) {
        if !self.session.has_polygon() {
            warn("Nothing to export", "No coordinates to export");
            return;
        }
        let Some(path) = FileDialog::new()
            .set_title("Save coordinates")
            .add_filter("CSV", &["csv"])
            .add_filter("TXT", &["txt"])
            .save_file()
        else {
            return;
        };

        match self.session.export_coordinates(&path) {
            Ok(_) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                info("Done", &format!("Saved coordinate file: {name}"));
                self.status = format!("Exported coordinates to {name}");
            }
            Err(err) => self.report_error("Export failed", "Cannot export coordinates", &err),
        }
    }

    fn save_template(&mut self) {
        if self.busy() {
            warn("Busy", &AppError::Busy.to_string());
            return;
        }
        if !self.session.has_polygon() {
            warn("Nothing to save", &AppError::NoPolygon.to_string());
            return;
        }
        let Some(prefix) = FileDialog::new()
            .set_title("Template output prefix")
            .save_file()
        else {
            return;
        };

        let started = self
            .session
            .template_request(&self.settings, &prefix)
            .and_then(|request| TemplateJob::spawn(Arc::clone(&self.engine), request));
        match started {
            Ok(job) => {
                self.job = Some(job);
                self.status = "Generating template...".into();
            }
            Err(err) => self.report_error("Template failed", "Cannot start template generation", &err),
        }
    }

    fn poll_job(&mut self, ctx: &egui::Context) {
        let Some(job) = self.job.as_mut() else {
            return;
        };
        let Some(result) = job.poll() else {
            ctx.set_cursor_icon(egui::CursorIcon::Progress);
            ctx.request_repaint_after(Duration::from_millis(50));
            return;
        };

        // Controls come back whatever the outcome.
        self.job = None;
        match result {
            Ok(()) => {
                info("Done", "Template generated");
                self.status = "Template generated".into();
            }
            Err(err) => {
                log::error!("template generation failed: {err}");
                error("Template failed", &format!("Template generation failed:\n{err}"));
                self.status = format!("Template generation failed: {err}");
            }
        }
    }

    fn report_error(&mut self, title: &str, context: &str, err: &AppError) {
        log::error!("{context}: {err}");
        error(title, &format!("{context}:\n{err}"));
        self.status = format!("{context}: {err}");
    }
}

fn message(level: MessageLevel, title: &str, description: &str) {
    MessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(description)
        .set_buttons(MessageButtons::Ok)
        .show();
}

fn info(title: &str, description: &str) {
    message(MessageLevel::Info, title, description);
}

fn warn(title: &str, description: &str) {
    log::warn!("{description}");
    message(MessageLevel::Warning, title, description);
}

fn error(title: &str, description: &str) {
    message(MessageLevel::Error, title, description);
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for TemplateApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_job(ctx);
        self.ensure_texture(ctx);
        let idle = !self.busy();
        let has_image = self.session.has_image();
        let has_polygon = self.session.has_polygon();

        // Top toolbar
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.add_enabled(idle, egui::Button::new("Load image")).clicked() {
                    self.load_image();
                }
                if ui
                    .add_enabled(idle && has_image, egui::Button::new("Preprocess"))
                    .clicked()
                {
                    self.preprocess();
                }
                if ui
                    .add_enabled(idle && has_polygon, egui::Button::new("Save template"))
                    .clicked()
                {
                    self.save_template();
                }
                if ui
                    .add_enabled(idle && has_polygon, egui::Button::new("Export coordinates"))
                    .clicked()
                {
                    self.export_coordinates();
                }
                let has_points = has_polygon || !self.session.canvas.vertices().is_empty();
                if ui
                    .add_enabled(idle && has_image && has_points, egui::Button::new("Clear points"))
                    .clicked()
                {
                    self.clear_points();
                }
                ui.separator();
                ui.label(format!("Zoom: {:.0}%", self.session.canvas.zoom() * 100.0));
                let canvas = &self.session.canvas;
                if let Some(index) = canvas.selected() {
                    ui.label(format!("Selected: P{}", index + 1));
                } else if canvas.is_drawing() {
                    ui.label(format!("Drawing: {} points", canvas.vertices().len()));
                }
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(&self.status);
        });

        // Canvas
        egui::CentralPanel::default().show(ctx, |ui| {
            let event = view::show_canvas(ui, &mut self.session.canvas, self.texture.as_ref(), idle);
            if let Some(CanvasEvent::PolygonCompleted(points)) = event {
                self.polygon_completed(points);
            }
        });

        // The preview may have changed this frame.
        self.ensure_texture(ctx);
    }
}
