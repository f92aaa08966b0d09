// Frame annotation - skeleton overlay and frame counter

use crate::models::pose::{KeypointSet, Skeleton};
use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Drawing style for the skeleton overlay and frame counter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OverlayStyle {
    /// Fill color of landmark markers (RGB)
    pub joint_color: [u8; 3],
    /// Color of the lines between connected landmarks (RGB)
    pub connection_color: [u8; 3],
    /// Line thickness in pixels
    pub thickness: u32,
    /// Landmark marker radius in pixels
    pub marker_radius: u32,
    /// Frame counter text color (RGB)
    pub label_color: [u8; 3],
    /// Frame counter glyph height in pixels
    pub label_scale: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            joint_color: [0, 255, 0],
            connection_color: [255, 0, 0],
            thickness: 2,
            marker_radius: 2,
            label_color: [255, 255, 255],
            label_scale: 16.0,
        }
    }
}

impl OverlayStyle {
    pub fn validate(&self) -> Result<(), String> {
        if self.thickness == 0 || self.thickness > 16 {
            return Err(format!(
                "Invalid line thickness: {}. Must be between 1 and 16",
                self.thickness
            ));
        }

        if self.marker_radius == 0 || self.marker_radius > 32 {
            return Err(format!(
                "Invalid marker radius: {}. Must be between 1 and 32",
                self.marker_radius
            ));
        }

        if !(self.label_scale.is_finite() && self.label_scale > 0.0) {
            return Err(format!(
                "Invalid label scale: {}. Must be greater than 0",
                self.label_scale
            ));
        }

        Ok(())
    }
}

/// Draw connections first, then joint markers on top
pub fn draw_skeleton(
    image: &mut RgbImage,
    keypoints: &KeypointSet,
    skeleton: &Skeleton,
    style: &OverlayStyle,
) {
    let (width, height) = image.dimensions();
    let connection_color = Rgb(style.connection_color);
    let joint_color = Rgb(style.joint_color);

    for &(from, to) in skeleton.connections {
        if let (Some(a), Some(b)) = (keypoints.get(from), keypoints.get(to)) {
            draw_thick_line(
                image,
                a.to_pixel(width, height),
                b.to_pixel(width, height),
                style.thickness,
                connection_color,
            );
        }
    }

    for keypoint in keypoints.iter() {
        let (x, y) = keypoint.to_pixel(width, height);
        if !(x.is_finite() && y.is_finite()) {
            continue;
        }
        draw_filled_circle_mut(
            image,
            (x.round() as i32, y.round() as i32),
            style.marker_radius as i32,
            joint_color,
        );
    }
}

/// Parallel one-pixel segments offset along the line normal
fn draw_thick_line(
    image: &mut RgbImage,
    start: (f32, f32),
    end: (f32, f32),
    thickness: u32,
    color: Rgb<u8>,
) {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let length = (dx * dx + dy * dy).sqrt();
    if !length.is_finite() {
        return;
    }

    let (nx, ny) = if length > f32::EPSILON {
        (-dy / length, dx / length)
    } else {
        (0.0, 0.0)
    };

    let center = (thickness as f32 - 1.0) / 2.0;
    for step in 0..thickness {
        let offset = step as f32 - center;
        draw_line_segment_mut(
            image,
            (start.0 + nx * offset, start.1 + ny * offset),
            (end.0 + nx * offset, end.1 + ny * offset),
            color,
        );
    }
}

/// Text of the burned-in frame counter
pub fn frame_label(frame_index: u64, total_frames: u64) -> String {
    format!("Frame: {}/{}", frame_index, total_frames)
}

/// Left margin and top of the frame counter
const LABEL_ORIGIN: (i32, i32) = (10, 6);

/// Burns text into frames with a TrueType font, or a built-in bitmap face
/// when no font file can be read.
pub struct FrameLabeler {
    font: Option<FontVec>,
}

impl FrameLabeler {
    pub fn new(font_path: &Path) -> Self {
        let font = match std::fs::read(font_path) {
            Ok(bytes) => match FontVec::try_from_vec(bytes) {
                Ok(font) => Some(font),
                Err(e) => {
                    tracing::warn!("Font {} is invalid ({}), using bitmap glyphs", font_path.display(), e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Font {} unreadable ({}), using bitmap glyphs", font_path.display(), e);
                None
            }
        };

        Self { font }
    }

    /// Labeler that always renders with the bitmap glyphs
    pub fn bitmap() -> Self {
        Self { font: None }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn draw(&self, image: &mut RgbImage, text: &str, style: &OverlayStyle) {
        let color = Rgb(style.label_color);
        let (x, y) = LABEL_ORIGIN;

        match &self.font {
            Some(font) => {
                draw_text_mut(image, color, x, y, PxScale::from(style.label_scale), font, text);
            }
            None => draw_bitmap_text(image, color, x, y, style.label_scale, text),
        }
    }
}

// ==============================================================================
// Bitmap glyphs (5x7, bit 4 is the leftmost column)
// ==============================================================================

const GLYPH_WIDTH: i32 = 5;
const GLYPH_HEIGHT: i32 = 7;

fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '/' => [0x01, 0x01, 0x02, 0x04, 0x08, 0x10, 0x10],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'r' => [0x00, 0x00, 0x16, 0x19, 0x10, 0x10, 0x10],
        'a' => [0x00, 0x00, 0x0E, 0x01, 0x0F, 0x11, 0x0F],
        'm' => [0x00, 0x00, 0x1A, 0x15, 0x15, 0x11, 0x11],
        'e' => [0x00, 0x00, 0x0E, 0x11, 0x1F, 0x10, 0x0E],
        _ => return None,
    };
    Some(rows)
}

fn draw_bitmap_text(image: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: f32, text: &str) {
    let cell = ((scale / GLYPH_HEIGHT as f32).round() as i32).max(1);
    let advance = (GLYPH_WIDTH + 1) * cell;

    for (i, c) in text.chars().enumerate() {
        let Some(rows) = glyph(c) else {
            continue;
        };
        let origin_x = x + i as i32 * advance;

        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (0x10 >> col) != 0 {
                    let rect = Rect::at(origin_x + col * cell, y + row as i32 * cell)
                        .of_size(cell as u32, cell as u32);
                    draw_filled_rect_mut(image, rect, color);
                }
            }
        }
    }
}
