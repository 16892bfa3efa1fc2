use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, pos2};

use taxonomy_explorer::render::Camera;

const BACKGROUND: Color32 = Color32::from_rgb(248, 250, 252);
const GRID_LINE: Color32 = Color32::from_rgba_premultiplied(24, 28, 34, 24);

pub(super) fn draw_background(painter: &Painter, rect: Rect, camera: Camera) {
    painter.rect_filled(rect, 0.0, BACKGROUND);

    let step = (0.1 * rect.width().min(rect.height()) / camera.ratio).clamp(24.0, 160.0);
    let origin = to_screen(rect, camera, pos2(0.5, 0.5));
    let stroke = Stroke::new(1.0, GRID_LINE);

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([pos2(x, rect.top()), pos2(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([pos2(rect.left(), y), pos2(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn to_screen(rect: Rect, camera: Camera, framed: Pos2) -> Pos2 {
    rect.min + camera.framed_to_viewport(framed, rect.size()).to_vec2()
}

/// On-screen radius for a node of the given style size.
pub(super) fn screen_radius(size: f32, camera: Camera) -> f32 {
    let zoom = (1.0 / camera.ratio.max(f32::EPSILON)).sqrt().clamp(0.3, 12.0);
    (size * 0.6 * zoom).max(1.0)
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    rect.expand(radius).contains(position)
}

fn outcode(rect: Rect, point: Pos2) -> u8 {
    let mut code = 0;
    if point.x < rect.left() {
        code |= 1;
    } else if point.x > rect.right() {
        code |= 2;
    }
    if point.y < rect.top() {
        code |= 4;
    } else if point.y > rect.bottom() {
        code |= 8;
    }
    code
}

/// Cohen-Sutherland clip test: does the segment cross `rect`?
pub(super) fn edge_visible(rect: Rect, mut start: Pos2, mut end: Pos2) -> bool {
    let mut code_start = outcode(rect, start);
    let mut code_end = outcode(rect, end);

    loop {
        if code_start | code_end == 0 {
            return true;
        }
        if code_start & code_end != 0 {
            return false;
        }

        let code = if code_start != 0 { code_start } else { code_end };
        let delta = end - start;
        let clipped = if code & 8 != 0 {
            pos2(start.x + delta.x * (rect.bottom() - start.y) / delta.y, rect.bottom())
        } else if code & 4 != 0 {
            pos2(start.x + delta.x * (rect.top() - start.y) / delta.y, rect.top())
        } else if code & 2 != 0 {
            pos2(rect.right(), start.y + delta.y * (rect.right() - start.x) / delta.x)
        } else {
            pos2(rect.left(), start.y + delta.y * (rect.left() - start.x) / delta.x)
        };

        if code == code_start {
            start = clipped;
            code_start = outcode(rect, start);
        } else {
            end = clipped;
            code_end = outcode(rect, end);
        }
    }
}
