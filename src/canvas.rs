//! Polygon-editing canvas state.
//!
//! Everything here is plain data driven by [`Canvas`] methods, one per input
//! event, so the editing rules can be exercised without a window. The egui
//! glue that feeds events in and paints the [`Overlay`] lives in `view.rs`.

use crate::geometry::{self, DisplayRect, ScreenPoint, Vertex};

/// Radius of a vertex marker, in screen units.
pub const POINT_RADIUS: f32 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CanvasKey {
    Delete,
    Backspace,
    Escape,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CanvasEvent {
    /// The user closed the polygon; vertices are in draw order.
    PolygonCompleted(Vec<Vertex>),
}

// ── Canvas ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Canvas {
    image_size: Option<(u32, u32)>,
    viewport: DisplayRect,
    zoom: f32,
    display_rect: Option<DisplayRect>,

    vertices: Vec<Vertex>,
    selected: Option<usize>,
    drawing: bool,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            image_size: None,
            viewport: DisplayRect::new(0, 0, 0, 0),
            zoom: 1.0,
            display_rect: None,
            vertices: Vec::new(),
            selected: None,
            drawing: false,
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn display_rect(&self) -> Option<DisplayRect> {
        self.display_rect
    }

    /// Swap in a new image. Vertices, selection and zoom start over.
    pub fn set_image(&mut self, size: (u32, u32)) {
        self.image_size = Some(size);
        self.reset();
    }

    /// Resize the area the canvas is drawn into.
    pub fn set_viewport(&mut self, viewport: DisplayRect) {
        if self.viewport != viewport {
            self.viewport = viewport;
            self.update_display_rect();
        }
    }

    /// Drop all vertices and selection, and return to unit zoom.
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.selected = None;
        self.drawing = false;
        self.zoom = 1.0;
        self.update_display_rect();
    }

    fn update_display_rect(&mut self) {
        self.display_rect = self
            .image_size
            .map(|size| DisplayRect::centered(self.viewport, size, self.zoom));
    }

    pub fn map_to_image(&self, p: ScreenPoint) -> Option<Vertex> {
        let rect = self.display_rect?;
        let (w, h) = self.image_size?;
        geometry::screen_to_image(rect, self.zoom, p)
            .map(|v| Vertex::new(v.x.min(w as i32 - 1), v.y.min(h as i32 - 1)))
    }

    pub fn map_to_screen(&self, v: Vertex) -> Option<ScreenPoint> {
        self.display_rect
            .map(|rect| geometry::image_to_screen(rect, self.zoom, v))
    }

    // ── Input ───────────────────────────────────────────────────────────────

    pub fn wheel(&mut self, delta: f32) {
        let zoom = geometry::step_zoom(self.zoom, delta);
        if zoom != self.zoom {
            self.zoom = zoom;
            self.update_display_rect();
            log::trace!("zoom {:.3}", self.zoom);
        }
    }

    pub fn press(&mut self, button: PointerButton, pos: ScreenPoint) -> Option<CanvasEvent> {
        let point = self.map_to_image(pos)?;
        let hit = geometry::hit_test(&self.vertices, point);

        match button {
            PointerButton::Primary => {
                if let Some(index) = hit {
                    self.selected = Some(index);
                } else {
                    self.drawing = true;
                    self.vertices.push(point);
                    self.selected = None;
                }
                None
            }
            PointerButton::Secondary => {
                if let Some(index) = hit {
                    self.vertices.remove(index);
                    self.selected = None;
                    None
                } else if self.drawing && self.vertices.len() >= 3 {
                    self.drawing = false;
                    log::debug!("polygon closed with {} vertices", self.vertices.len());
                    Some(CanvasEvent::PolygonCompleted(self.vertices.clone()))
                } else {
                    None
                }
            }
        }
    }

    /// Append unconditionally, even on top of an existing vertex. The
    /// selection made by the preceding press is dropped.
    pub fn double_click(&mut self, pos: ScreenPoint) {
        if let Some(point) = self.map_to_image(pos) {
            self.vertices.push(point);
            self.selected = None;
        }
    }

    /// Drag the selected vertex, if any, to `pos`.
    pub fn pointer_moved(&mut self, pos: ScreenPoint) {
        let Some(index) = self.selected else {
            return;
        };
        if let Some(point) = self.map_to_image(pos) {
            if let Some(vertex) = self.vertices.get_mut(index) {
                *vertex = point;
            }
        }
    }

    pub fn key(&mut self, key: CanvasKey) {
        match key {
            CanvasKey::Delete | CanvasKey::Backspace => match self.selected.take() {
                Some(index) if index < self.vertices.len() => {
                    self.vertices.remove(index);
                }
                _ => {
                    self.vertices.pop();
                }
            },
            CanvasKey::Escape => self.selected = None,
        }
    }

    // ── Rendering ───────────────────────────────────────────────────────────

    /// Screen-space geometry for the current vertex list. Rebuilt on each call.
    pub fn overlay(&self) -> Overlay {
        let Some(rect) = self.display_rect else {
            return Overlay::default();
        };
        let project = |v: Vertex| geometry::image_to_screen(rect, self.zoom, v);

        let markers = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, &v)| Marker {
                center: project(v),
                selected: self.selected == Some(i),
                label: format!("P{}:{}", i + 1, v),
            })
            .collect();

        let mut edges: Vec<_> = self
            .vertices
            .windows(2)
            .map(|pair| (project(pair[0]), project(pair[1])))
            .collect();
        if !self.drawing && self.vertices.len() > 1 {
            let first = self.vertices[0];
            let last = self.vertices[self.vertices.len() - 1];
            edges.push((project(last), project(first)));
        }

        Overlay { markers, edges }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub center: ScreenPoint,
    pub selected: bool,
    pub label: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overlay {
    pub markers: Vec<Marker>,
    pub edges: Vec<(ScreenPoint, ScreenPoint)>,
}
