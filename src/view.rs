//! egui glue for the canvas: turns pointer, wheel and key input into
//! [`Canvas`] calls and paints the image with the vertex overlay.

use eframe::egui;

use crate::canvas::{Canvas, CanvasEvent, CanvasKey, Overlay, PointerButton, POINT_RADIUS};
use crate::geometry::{DisplayRect, ScreenPoint};

const BACKGROUND: egui::Color32 = egui::Color32::from_rgb(45, 45, 48);
const POINT_COLOR: egui::Color32 = egui::Color32::from_rgb(0, 255, 255);
const SELECTED_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 0, 0);
const LABEL_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 255, 0);
const EDGE_COLOR: egui::Color32 = egui::Color32::from_rgb(0, 200, 255);

const HINT: &str =
    "Left: add/select   Right: delete/complete   Delete: remove point   Esc: deselect   Wheel: zoom";

/// Draw the canvas into the remaining space of `ui` and feed it this frame's
/// input. `interactive` is false while a long operation is running.
pub fn show_canvas(
    ui: &mut egui::Ui,
    canvas: &mut Canvas,
    texture: Option<&egui::TextureHandle>,
    interactive: bool,
) -> Option<CanvasEvent> {
    let (response, painter) =
        ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
    let canvas_rect = response.rect;
    canvas.set_viewport(DisplayRect::from_egui(canvas_rect));

    let event = if interactive {
        handle_input(ui.ctx(), &response, canvas)
    } else {
        None
    };

    painter.rect_filled(canvas_rect, 0.0, BACKGROUND);

    if let (Some(tex), Some(rect)) = (texture, canvas.display_rect()) {
        painter.image(
            tex.id(),
            rect.to_egui(),
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );
    }

    let overlay = canvas.overlay();
    if !overlay.markers.is_empty() {
        draw_overlay(&painter, &overlay);
        painter.text(
            canvas_rect.min + egui::vec2(10.0, 20.0),
            egui::Align2::LEFT_BOTTOM,
            HINT,
            egui::FontId::proportional(13.0),
            egui::Color32::WHITE,
        );
    }

    event
}

fn handle_input(
    ctx: &egui::Context,
    response: &egui::Response,
    canvas: &mut Canvas,
) -> Option<CanvasEvent> {
    let mut event = None;
    let hovered = response.hovered();
    let rect = response.rect;

    // Raw events, so that every wheel notch and press is applied once, in order.
    let events = ctx.input(|i| i.events.clone());
    for ev in &events {
        match ev {
            egui::Event::MouseWheel { delta, .. } if hovered => {
                canvas.wheel(delta.y);
            }
            egui::Event::PointerButton {
                pos,
                button,
                pressed: true,
                ..
            } if rect.contains(*pos) => {
                let button = match button {
                    egui::PointerButton::Primary => PointerButton::Primary,
                    egui::PointerButton::Secondary => PointerButton::Secondary,
                    _ => continue,
                };
                if let Some(ev) = canvas.press(button, ScreenPoint::from_egui(*pos)) {
                    event = Some(ev);
                }
            }
            _ => {}
        }
    }

    if response.double_clicked_by(egui::PointerButton::Primary) {
        if let Some(pos) = response.interact_pointer_pos() {
            canvas.double_click(ScreenPoint::from_egui(pos));
        }
    }

    // Vertices follow the pointer only while the primary button is held.
    if response.dragged_by(egui::PointerButton::Primary) {
        if let Some(pos) = response.interact_pointer_pos() {
            canvas.pointer_moved(ScreenPoint::from_egui(pos));
        }
    }

    if !ctx.wants_keyboard_input() {
        ctx.input(|i| {
            if i.key_pressed(egui::Key::Delete) {
                canvas.key(CanvasKey::Delete);
            }
            if i.key_pressed(egui::Key::Backspace) {
                canvas.key(CanvasKey::Backspace);
            }
            if i.key_pressed(egui::Key::Escape) {
                canvas.key(CanvasKey::Escape);
            }
        });
    }

    event
}

fn draw_overlay(painter: &egui::Painter, overlay: &Overlay) {
    let edge_stroke = egui::Stroke::new(2.0, EDGE_COLOR);
    for (from, to) in &overlay.edges {
        painter.line_segment([from.to_egui(), to.to_egui()], edge_stroke);
    }

    for marker in &overlay.markers {
        let color = if marker.selected {
            SELECTED_COLOR
        } else {
            POINT_COLOR
        };
        let center = marker.center.to_egui();
        painter.circle(center, POINT_RADIUS, color, egui::Stroke::new(2.0, color));
        painter.text(
            center + egui::vec2(10.0, -8.0),
            egui::Align2::LEFT_BOTTOM,
            &marker.label,
            egui::FontId::proportional(13.0),
            LABEL_COLOR,
        );
    }
}
