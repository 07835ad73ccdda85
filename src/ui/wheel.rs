use std::f32::consts::TAU;

use eframe::egui;

use crate::input::PointerState;
use crate::session::DisplayState;
use crate::theory::{ROMAN_NUMERALS, note_name};

const INNER_RADIUS: f32 = 0.35;
const SEGMENTS_PER_SLICE: usize = 12;

/// Where the wheel sits on screen.
#[derive(Debug, Clone, Copy)]
pub struct WheelGeometry {
    pub center: egui::Pos2,
    pub radius: f32,
}

impl WheelGeometry {
    pub fn from_rect(rect: egui::Rect) -> Self {
        Self {
            center: rect.center(),
            radius: rect.width().min(rect.height()) * 0.45,
        }
    }

    /// Screen position to wheel coordinates, x right and y down, each
    /// clamped to [-1, 1].
    pub fn normalize(&self, pos: egui::Pos2) -> (f64, f64) {
        let d = (pos - self.center) / self.radius;
        (d.x.clamp(-1.0, 1.0) as f64, d.y.clamp(-1.0, 1.0) as f64)
    }

    /// Clockwise from straight up, at a fraction of the radius.
    fn point(&self, angle: f32, fraction: f32) -> egui::Pos2 {
        let r = self.radius * fraction;
        self.center + egui::vec2(angle.sin() * r, -angle.cos() * r)
    }
}

/// Pointer state for this frame from the wheel's response.
pub fn pointer_state(response: &egui::Response, geometry: &WheelGeometry) -> PointerState {
    let Some(pos) = response.interact_pointer_pos().or(response.hover_pos()) else {
        return PointerState::default();
    };
    let (x, y) = geometry.normalize(pos);
    PointerState {
        x,
        y,
        down: response.is_pointer_button_down_on(),
    }
}

fn slice_color(chord_position: Option<usize>, highlighted: bool) -> egui::Color32 {
    let base = match chord_position {
        Some(0) => egui::Color32::from_rgb(220, 90, 80),
        Some(1) => egui::Color32::from_rgb(230, 180, 70),
        Some(2) => egui::Color32::from_rgb(90, 170, 220),
        Some(_) => egui::Color32::from_rgb(150, 110, 210),
        None => egui::Color32::from_rgb(45, 45, 50),
    };
    if highlighted && chord_position.is_none() {
        egui::Color32::from_rgb(70, 90, 80)
    } else {
        base
    }
}

pub fn paint(
    painter: &egui::Painter,
    geometry: &WheelGeometry,
    display: &DisplayState,
    stick: (f64, f64),
    deadzone: f64,
) {
    painter.rect_filled(painter.clip_rect(), 0.0, egui::Color32::from_rgb(30, 30, 30));

    let slices = display.scale.len();
    let step = TAU / slices as f32;

    for (i, &pc) in display.scale.iter().enumerate() {
        let highlighted = display.highlighted == Some(i);
        let chord_position = display.chord.iter().position(|&c| c == pc);
        let fill = slice_color(chord_position, highlighted);
        let outer = if highlighted { 1.04 } else { 1.0 };

        let start = i as f32 * step;
        for s in 0..SEGMENTS_PER_SLICE {
            let a0 = start + step * s as f32 / SEGMENTS_PER_SLICE as f32;
            let a1 = start + step * (s + 1) as f32 / SEGMENTS_PER_SLICE as f32;
            let quad = vec![
                geometry.point(a0, outer),
                geometry.point(a1, outer),
                geometry.point(a1, INNER_RADIUS),
                geometry.point(a0, INNER_RADIUS),
            ];
            painter.add(egui::Shape::convex_polygon(quad, fill, egui::Stroke::NONE));
        }

        painter.line_segment(
            [geometry.point(start, INNER_RADIUS), geometry.point(start, 1.0)],
            egui::Stroke::new(2.0, egui::Color32::from_rgb(20, 20, 20)),
        );

        let mid = start + step / 2.0;
        let text_color = if chord_position.is_some() {
            egui::Color32::BLACK
        } else {
            egui::Color32::WHITE
        };
        painter.text(
            geometry.point(mid, 0.75),
            egui::Align2::CENTER_CENTER,
            note_name(pc),
            egui::FontId::proportional(20.0),
            text_color,
        );
        painter.text(
            geometry.point(mid, 0.52),
            egui::Align2::CENTER_CENTER,
            ROMAN_NUMERALS[i % ROMAN_NUMERALS.len()],
            egui::FontId::proportional(12.0),
            text_color,
        );
    }

    painter.circle_stroke(
        geometry.center,
        geometry.radius * deadzone as f32,
        egui::Stroke::new(1.0, egui::Color32::from_rgb(100, 100, 100)),
    );

    let marker = geometry.center
        + egui::vec2(stick.0 as f32, stick.1 as f32) * geometry.radius;
    painter.circle_filled(marker, 6.0, egui::Color32::WHITE);
}
