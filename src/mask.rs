//! Raster products of a completed polygon: the binary region mask and the
//! translucent preview shown on the canvas.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_polygon_mut, Canvas};
use imageproc::point::Point;

use crate::geometry::Vertex;

pub const MASK_INSIDE: u8 = 255;
pub const PREVIEW_FILL: Rgb<u8> = Rgb([0, 150, 255]);
pub const PREVIEW_ALPHA: f32 = 0.3;

/// Image-sized mask: 255 inside the polygon (boundary included), 0 elsewhere.
pub fn polygon_mask(width: u32, height: u32, polygon: &[Vertex]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    fill_polygon(&mut mask, polygon, Luma([MASK_INSIDE]));
    mask
}

/// Blend [`PREVIEW_FILL`] over `base` inside the masked region.
pub fn preview_overlay(base: &RgbImage, mask: &GrayImage) -> RgbImage {
    let mut out = base.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        if mask.get_pixel(x, y).0[0] != MASK_INSIDE {
            continue;
        }
        for (channel, fill) in pixel.0.iter_mut().zip(PREVIEW_FILL.0) {
            let blended = *channel as f32 * (1.0 - PREVIEW_ALPHA) + fill as f32 * PREVIEW_ALPHA;
            *channel = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Fill a polygon into `canvas`, clipping to its bounds. Interior and outline
/// pixels are both set.
///
/// Repeated points are dropped first: a double click can leave a vertex on
/// top of its predecessor, and a closing point equal to the first is implied.
pub fn fill_polygon<C: Canvas>(canvas: &mut C, polygon: &[Vertex], color: C::Pixel) {
    let mut points: Vec<Point<i32>> = Vec::with_capacity(polygon.len());
    for v in polygon {
        let p = Point::new(v.x, v.y);
        if points.last() != Some(&p) {
            points.push(p);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    match points.as_slice() {
        [] => {}
        [p] => {
            let (w, h) = canvas.dimensions();
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < w && (p.y as u32) < h {
                canvas.draw_pixel(p.x as u32, p.y as u32, color);
            }
        }
        _ => draw_polygon_mut(canvas, &points, color),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inside_count(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p.0[0] == MASK_INSIDE).count()
    }

    #[test]
    fn square_mask_includes_boundary() {
        let square = [
            Vertex::new(2, 2),
            Vertex::new(7, 2),
            Vertex::new(7, 7),
            Vertex::new(2, 7),
        ];
        let mask = polygon_mask(10, 10, &square);
        assert_eq!(inside_count(&mask), 36);
        assert_eq!(mask.get_pixel(2, 2).0[0], MASK_INSIDE);
        assert_eq!(mask.get_pixel(7, 7).0[0], MASK_INSIDE);
        assert_eq!(mask.get_pixel(1, 2).0[0], 0);
        assert_eq!(mask.get_pixel(8, 8).0[0], 0);
    }

    #[test]
    fn triangle_mask_is_bounded_by_its_hull() {
        let triangle = [Vertex::new(10, 10), Vertex::new(90, 10), Vertex::new(90, 90)];
        let mask = polygon_mask(100, 100, &triangle);
        assert_eq!(mask.get_pixel(80, 20).0[0], MASK_INSIDE);
        assert_eq!(mask.get_pixel(20, 80).0[0], 0);
        assert_eq!(mask.get_pixel(50, 50).0[0], MASK_INSIDE);
        // Right triangle with legs of 81 pixels, diagonal included.
        assert_eq!(inside_count(&mask), 81 * 82 / 2);
    }

    #[test]
    fn polygon_outside_image_is_clipped() {
        let square = [
            Vertex::new(-5, -5),
            Vertex::new(4, -5),
            Vertex::new(4, 4),
            Vertex::new(-5, 4),
        ];
        let mask = polygon_mask(10, 10, &square);
        assert_eq!(inside_count(&mask), 25);
    }

    #[test]
    fn preview_blends_only_inside_mask() {
        let base = RgbImage::from_pixel(4, 4, Rgb([100, 100, 100]));
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(1, 1, Luma([MASK_INSIDE]));

        let preview = preview_overlay(&base, &mask);
        assert_eq!(preview.get_pixel(0, 0), &Rgb([100, 100, 100]));
        // 0.7 * 100 + 0.3 * (0, 150, 255)
        assert_eq!(preview.get_pixel(1, 1), &Rgb([70, 115, 147]));
    }

    #[test]
    fn repeated_points_do_not_change_the_mask() {
        let square = [
            Vertex::new(2, 2),
            Vertex::new(7, 2),
            Vertex::new(7, 2),
            Vertex::new(7, 7),
            Vertex::new(2, 7),
            Vertex::new(2, 2),
        ];
        let mask = polygon_mask(10, 10, &square);
        assert_eq!(inside_count(&mask), 36);
    }

    #[test]
    fn collapsed_polygon_marks_a_single_pixel() {
        let point = [Vertex::new(3, 4), Vertex::new(3, 4), Vertex::new(3, 4)];
        let mask = polygon_mask(10, 10, &point);
        assert_eq!(inside_count(&mask), 1);
        assert_eq!(mask.get_pixel(3, 4).0[0], MASK_INSIDE);

        let outside = [Vertex::new(-1, 4), Vertex::new(-1, 4), Vertex::new(-1, 4)];
        assert_eq!(inside_count(&polygon_mask(10, 10, &outside)), 0);
    }
}
