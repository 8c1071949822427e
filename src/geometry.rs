use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 10.0;
pub const ZOOM_IN_FACTOR: f32 = 1.25;
pub const ZOOM_OUT_FACTOR: f32 = 0.8;

/// Vertices closer than this (in image pixels) to a press are hit.
pub const HIT_RANGE: f64 = 12.0;

// ── Points ──────────────────────────────────────────────────────────────────

/// A polygon corner in image-pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vertex {
    pub x: i32,
    pub y: i32,
}

impl Vertex {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Vertex) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl std::fmt::Display for Vertex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// A position in the canvas widget, in whole logical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn from_egui(pos: egui::Pos2) -> Self {
        Self::new(pos.x.floor() as i32, pos.y.floor() as i32)
    }

    pub fn to_egui(self) -> egui::Pos2 {
        egui::pos2(self.x as f32, self.y as f32)
    }
}

// ── Display rect ────────────────────────────────────────────────────────────

/// Integer rectangle in screen space. Used both for the viewport and for the
/// area the zoomed image occupies inside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl DisplayRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_egui(rect: egui::Rect) -> Self {
        Self::new(
            rect.min.x.floor() as i32,
            rect.min.y.floor() as i32,
            rect.width().round() as i32,
            rect.height().round() as i32,
        )
    }

    pub fn to_egui(self) -> egui::Rect {
        egui::Rect::from_min_size(
            egui::pos2(self.x as f32, self.y as f32),
            egui::vec2(self.width as f32, self.height as f32),
        )
    }

    /// The rect an image of `image_size` occupies at `zoom`, centered in
    /// `viewport`. The offset is not clamped, so a zoomed image larger than
    /// the viewport starts left of / above it.
    pub fn centered(viewport: DisplayRect, image_size: (u32, u32), zoom: f32) -> Self {
        let width = (image_size.0 as f32 * zoom).round() as i32;
        let height = (image_size.1 as f32 * zoom).round() as i32;
        Self::new(
            viewport.x + (viewport.width - width).div_euclid(2),
            viewport.y + (viewport.height - height).div_euclid(2),
            width,
            height,
        )
    }

    pub fn contains(&self, p: ScreenPoint) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }
}

// ── Mapping ─────────────────────────────────────────────────────────────────

/// Convert a screen position to image space. `None` outside the image.
pub fn screen_to_image(rect: DisplayRect, zoom: f32, p: ScreenPoint) -> Option<Vertex> {
    if !rect.contains(p) {
        return None;
    }
    let x = (p.x - rect.x) as f32 / zoom;
    let y = (p.y - rect.y) as f32 / zoom;
    Some(Vertex::new(x as i32, y as i32))
}

/// Project an image-space vertex onto the screen.
pub fn image_to_screen(rect: DisplayRect, zoom: f32, v: Vertex) -> ScreenPoint {
    ScreenPoint::new(
        rect.x + (v.x as f32 * zoom) as i32,
        rect.y + (v.y as f32 * zoom) as i32,
    )
}

/// Apply one wheel step to `zoom`. A zero delta leaves it unchanged.
pub fn step_zoom(zoom: f32, delta: f32) -> f32 {
    let factor = if delta > 0.0 {
        ZOOM_IN_FACTOR
    } else if delta < 0.0 {
        ZOOM_OUT_FACTOR
    } else {
        return zoom;
    };
    (zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Index of the first vertex (in sequence order) within [`HIT_RANGE`] of `p`.
///
/// This is first-found, not nearest: with two vertices in range the earlier
/// one wins even if the later one is closer.
pub fn hit_test(vertices: &[Vertex], p: Vertex) -> Option<usize> {
    vertices.iter().position(|v| v.distance(p) < HIT_RANGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: DisplayRect = DisplayRect::new(0, 0, 800, 600);

    #[test]
    fn centered_rect_at_unit_zoom() {
        let rect = DisplayRect::centered(VIEWPORT, (100, 100), 1.0);
        assert_eq!(rect, DisplayRect::new(350, 250, 100, 100));
    }

    #[test]
    fn centered_rect_is_not_clamped() {
        let rect = DisplayRect::centered(VIEWPORT, (1000, 700), 1.0);
        assert_eq!(rect.x, -100);
        assert_eq!(rect.y, -50);
    }

    #[test]
    fn centered_rect_halves_odd_negative_slack_downwards() {
        let rect = DisplayRect::centered(DisplayRect::new(0, 0, 10, 10), (13, 13), 1.0);
        assert_eq!((rect.x, rect.y), (-2, -2));
    }

    #[test]
    fn centered_rect_follows_viewport_origin() {
        let viewport = DisplayRect::new(20, 40, 200, 100);
        let rect = DisplayRect::centered(viewport, (50, 50), 2.0);
        assert_eq!(rect, DisplayRect::new(70, 40, 100, 100));
    }

    #[test]
    fn scaled_size_rounds() {
        let rect = DisplayRect::centered(VIEWPORT, (15, 25), 0.1);
        assert_eq!((rect.width, rect.height), (2, 3));
    }

    #[test]
    fn screen_outside_image_maps_to_none() {
        let rect = DisplayRect::centered(VIEWPORT, (100, 100), 1.0);
        assert_eq!(screen_to_image(rect, 1.0, ScreenPoint::new(349, 260)), None);
        assert_eq!(screen_to_image(rect, 1.0, ScreenPoint::new(450, 260)), None);
        assert_eq!(
            screen_to_image(rect, 1.0, ScreenPoint::new(449, 349)),
            Some(Vertex::new(99, 99))
        );
    }

    #[test]
    fn mapping_truncates() {
        let rect = DisplayRect::new(0, 0, 250, 250);
        assert_eq!(
            screen_to_image(rect, 2.5, ScreenPoint::new(9, 24)),
            Some(Vertex::new(3, 9))
        );
        assert_eq!(
            image_to_screen(rect, 2.5, Vertex::new(3, 9)),
            ScreenPoint::new(7, 22)
        );
    }

    #[test]
    fn round_trip_is_exact_at_unit_zoom() {
        let rect = DisplayRect::centered(VIEWPORT, (320, 240), 1.0);
        for x in (rect.x..rect.x + rect.width).step_by(7) {
            for y in (rect.y..rect.y + rect.height).step_by(5) {
                let p = ScreenPoint::new(x, y);
                let v = screen_to_image(rect, 1.0, p).unwrap();
                assert_eq!(image_to_screen(rect, 1.0, v), p);
            }
        }
    }

    #[test]
    fn round_trip_stays_within_one_image_pixel() {
        let mut zoom = MIN_ZOOM;
        while zoom <= MAX_ZOOM {
            let rect = DisplayRect::centered(VIEWPORT, (200, 150), zoom);
            let tolerance = zoom.ceil().max(1.0) as i32;
            for x in (rect.x..rect.x + rect.width).step_by(3) {
                for y in (rect.y..rect.y + rect.height).step_by(3) {
                    let p = ScreenPoint::new(x, y);
                    let back = image_to_screen(rect, zoom, screen_to_image(rect, zoom, p).unwrap());
                    let (dx, dy) = (p.x - back.x, p.y - back.y);
                    assert!(
                        (-1..=tolerance).contains(&dx) && (-1..=tolerance).contains(&dy),
                        "zoom {zoom}: {p:?} came back as {back:?}"
                    );
                }
            }
            zoom *= 1.37;
        }
    }

    #[test]
    fn integral_zoom_maps_vertices_back_exactly() {
        for zoom in [1.0, 2.0, 3.0, 10.0] {
            let rect = DisplayRect::centered(VIEWPORT, (64, 48), zoom);
            for x in 0..64 {
                let v = Vertex::new(x, 47 - x.min(47));
                let p = image_to_screen(rect, zoom, v);
                assert_eq!(screen_to_image(rect, zoom, p), Some(v));
            }
        }
    }

    #[test]
    fn zoom_steps_multiply_and_clamp() {
        let zoom = step_zoom(step_zoom(step_zoom(1.0, 120.0), 120.0), -120.0);
        assert!((zoom - 1.25).abs() < 1e-6);

        let mut zoom = 1.0;
        for _ in 0..50 {
            zoom = step_zoom(zoom, 1.0);
        }
        assert_eq!(zoom, MAX_ZOOM);
        for _ in 0..50 {
            zoom = step_zoom(zoom, -1.0);
        }
        assert_eq!(zoom, MIN_ZOOM);
        assert_eq!(step_zoom(2.0, 0.0), 2.0);
    }

    #[test]
    fn hit_range_is_exclusive() {
        let vertices = [Vertex::new(0, 0)];
        assert_eq!(hit_test(&vertices, Vertex::new(11, 0)), Some(0));
        assert_eq!(hit_test(&vertices, Vertex::new(12, 0)), None);
        assert_eq!(hit_test(&vertices, Vertex::new(8, 8)), Some(0));
        assert_eq!(hit_test(&vertices, Vertex::new(9, 9)), None);
    }

    #[test]
    fn hit_test_prefers_first_in_order_over_nearest() {
        // The later vertex is closer to the press, but the earlier one is
        // still within range and wins.
        let vertices = [Vertex::new(0, 0), Vertex::new(10, 0)];
        assert_eq!(hit_test(&vertices, Vertex::new(9, 0)), Some(0));
    }
}
