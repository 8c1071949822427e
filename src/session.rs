//! The state of one annotation session: the loaded image, the canvas, and
//! whatever was derived from the last completed polygon.
//!
//! Every user action is a method returning `Result`; a failed action leaves
//! the session as it was.

use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::canvas::Canvas;
use crate::engine::TemplateRequest;
use crate::error::{AppError, Result};
use crate::export::{self, CoordinateFormat};
use crate::geometry::Vertex;
use crate::mask;
use crate::preprocess;
use crate::settings::Settings;

pub struct Session {
    image_path: Option<PathBuf>,
    image: Option<RgbImage>,
    pub canvas: Canvas,

    polygon: Vec<Vertex>,
    preview: Option<RgbImage>,

    /// Bumped whenever the displayed raster changes.
    display_revision: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            image_path: None,
            image: None,
            canvas: Canvas::new(),
            polygon: Vec::new(),
            preview: None,
            display_revision: 0,
        }
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn has_polygon(&self) -> bool {
        !self.polygon.is_empty()
    }

    /// The preview once a polygon is completed, otherwise the image itself.
    pub fn displayed_image(&self) -> Option<&RgbImage> {
        self.preview.as_ref().or(self.image.as_ref())
    }

    pub fn display_revision(&self) -> u64 {
        self.display_revision
    }

    // ── Actions ─────────────────────────────────────────────────────────────

    pub fn load_image(&mut self, path: &Path) -> Result<(u32, u32)> {
        let image = image::open(path)?.to_rgb8();
        let size = image.dimensions();
        self.image_path = Some(path.to_path_buf());
        self.replace_image(image);
        log::info!("loaded {} ({}x{})", path.display(), size.0, size.1);
        Ok(size)
    }

    /// Replace the image wholesale and start a fresh annotation.
    pub fn replace_image(&mut self, image: RgbImage) {
        self.canvas.set_image(image.dimensions());
        self.image = Some(image);
        self.drop_polygon();
    }

    /// Enhance the current image. Any annotation in progress is discarded.
    pub fn preprocess(&mut self) -> Result<()> {
        let image = self.image.as_ref().ok_or(AppError::NoImage)?;
        let enhanced = preprocess::enhance(image);
        self.replace_image(enhanced);
        Ok(())
    }

    /// Accept a polygon from the canvas and derive its masked preview.
    pub fn complete_polygon(&mut self, polygon: Vec<Vertex>) -> Result<usize> {
        if polygon.len() < 3 {
            return Err(AppError::TooFewPoints {
                count: polygon.len(),
            });
        }
        let image = self.image.as_ref().ok_or(AppError::NoImage)?;

        let mask = mask::polygon_mask(image.width(), image.height(), &polygon);
        self.preview = Some(mask::preview_overlay(image, &mask));
        self.polygon = polygon;
        self.display_revision += 1;
        log::info!("polygon completed with {} points", self.polygon.len());
        Ok(self.polygon.len())
    }

    /// Drop every vertex and everything derived from them; zoom returns to 1.
    pub fn clear(&mut self) {
        self.canvas.reset();
        self.drop_polygon();
    }

    fn drop_polygon(&mut self) {
        self.polygon.clear();
        self.preview = None;
        self.display_revision += 1;
    }

    pub fn export_coordinates(&self, path: &Path) -> Result<CoordinateFormat> {
        if self.polygon.is_empty() {
            return Err(AppError::NoPolygon);
        }
        Ok(export::export_coordinates(path, &self.polygon)?)
    }

    pub fn template_request(&self, settings: &Settings, output_prefix: &Path) -> Result<TemplateRequest> {
        if self.polygon.is_empty() {
            return Err(AppError::NoPolygon);
        }
        let image_path = self.image_path.as_deref().ok_or(AppError::NoImage)?;
        Ok(TemplateRequest::new(
            settings,
            image_path,
            output_prefix,
            &self.polygon,
        ))
    }
}
