use crate::theme::{LinearGradient, Rgb};
use eframe::egui::{
    self,
    epaint::{Mesh, Vertex},
    Color32, CornerRadius, Pos2, Rect, Rgba,
};

pub fn rgb_to_color32(color: Rgb) -> Color32 {
    Color32::from_rgb(color.r, color.g, color.b)
}

/// Paints `gradient` across `rect` the way a CSS `linear-gradient` with the
/// same angle would: 0deg runs bottom to top, 90deg left to right.
pub fn paint_linear_gradient(painter: &egui::Painter, rect: Rect, gradient: &LinearGradient) {
    let start = Color32::from_rgba_unmultiplied(
        gradient.color.r,
        gradient.color.g,
        gradient.color.b,
        (gradient.alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
    );
    let end = rgb_to_color32(gradient.fade_to);

    if rect.width() <= f32::EPSILON || rect.height() <= f32::EPSILON {
        painter.rect_filled(rect, CornerRadius::ZERO, end);
        return;
    }

    // Opaque base so translucent start stops blend over the fade color.
    painter.rect_filled(rect, CornerRadius::ZERO, end);

    let mut mesh = Mesh::default();
    tessellate_angled_gradient(&mut mesh, rect, gradient.angle_deg, start, end);
    painter.add(egui::Shape::mesh(mesh));
}

fn tessellate_angled_gradient(
    mesh: &mut Mesh,
    rect: Rect,
    angle_deg: u16,
    start: Color32,
    end: Color32,
) {
    let theta = (angle_deg as f32).to_radians();
    // CSS angles are clockwise from "up"; screen y grows downwards.
    let dir = egui::vec2(theta.sin(), -theta.cos());
    let half = rect.size() / 2.0;
    let half_len = (half.x * dir.x.abs() + half.y * dir.y.abs()).max(f32::EPSILON);
    let center = rect.center();

    let t_of = |p: Pos2| (((p - center).dot(dir) / half_len) + 1.0) / 2.0;

    let steps = gradient_steps(rect.width().max(rect.height()));

    // Subdivide into a grid so the per-vertex interpolation follows the
    // angled axis closely enough.
    let step_x = rect.width() / steps as f32;
    let step_y = rect.height() / steps as f32;
    for row in 0..=steps {
        for col in 0..=steps {
            let pos = Pos2::new(
                (rect.min.x + step_x * col as f32).min(rect.max.x),
                (rect.min.y + step_y * row as f32).min(rect.max.y),
            );
            push_vertex(mesh, pos, lerp_color(start, end, t_of(pos)));
        }
    }

    let stride = (steps + 1) as u32;
    for row in 0..steps as u32 {
        for col in 0..steps as u32 {
            let v0 = row * stride + col;
            let v1 = v0 + 1;
            let v2 = v0 + stride;
            let v3 = v2 + 1;
            mesh.add_triangle(v0, v2, v1);
            mesh.add_triangle(v1, v2, v3);
        }
    }
}

fn gradient_steps(length: f32) -> usize {
    const MAX_STEPS: usize = 32;
    let approx = (length.abs() / 16.0).ceil() as usize;
    approx.clamp(1, MAX_STEPS)
}

fn lerp_color(start: Color32, end: Color32, t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let a = Rgba::from(start);
    let b = Rgba::from(end);
    Color32::from(a * (1.0 - t) + b * t)
}

fn push_vertex(mesh: &mut Mesh, pos: Pos2, color: Color32) -> u32 {
    let idx = mesh.vertices.len() as u32;
    mesh.vertices.push(Vertex {
        pos,
        uv: Pos2::new(0.0, 0.0),
        color,
    });
    idx
}
