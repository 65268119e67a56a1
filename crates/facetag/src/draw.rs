//! Frame annotation and buffer conversion for the display window.

use crate::font;
use facetag_core::{BoundingBox, Label};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

pub const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const BOX_THICKNESS: i32 = 2;
/// Height of the filled strip along the bottom edge of each box.
pub const LABEL_STRIP_HEIGHT: i32 = 35;
const LABEL_SCALE: i32 = 3;
const LABEL_INSET: i32 = 6;

/// Rectangle spanning the given edges, or `None` if it has no area.
pub fn rect_from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Option<Rect> {
    (right > left && bottom > top)
        .then(|| Rect::at(left, top).of_size((right - left) as u32, (bottom - top) as u32))
}

/// Set a pixel if it lies inside the image.
pub fn plot(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

pub fn draw_label(image: &mut RgbImage, text: &str, x: i32, y: i32, scale: i32, color: Rgb<u8>) {
    font::draw_text(text, x, y, scale, |px, py| plot(image, px, py, color));
}

/// Draw one face: box outline, label strip and name.
pub fn draw_face(image: &mut RgbImage, bbox: &BoundingBox, label: &Label) {
    let (top, right, bottom, left) = bbox.edges();

    for inset in 0..BOX_THICKNESS {
        if let Some(rect) = rect_from_edges(left + inset, top + inset, right - inset, bottom - inset) {
            draw_hollow_rect_mut(image, rect, BOX_COLOR);
        }
    }

    if let Some(strip) = rect_from_edges(left, bottom - LABEL_STRIP_HEIGHT, right, bottom) {
        draw_filled_rect_mut(image, strip, BOX_COLOR);
    }

    let text_top = bottom - LABEL_STRIP_HEIGHT + (LABEL_STRIP_HEIGHT - font::GLYPH_HEIGHT * LABEL_SCALE) / 2;
    draw_label(image, &label.to_string(), left + LABEL_INSET, text_top, LABEL_SCALE, TEXT_COLOR);
}

/// Annotate a full-resolution frame with every detection.
pub fn annotate<'a>(image: &mut RgbImage, faces: impl IntoIterator<Item = (BoundingBox, &'a Label)>) {
    for (bbox, label) in faces {
        draw_face(image, &bbox, label);
    }
}

/// Convert an RGB image to packed 0x00RRGGBB pixels for minifb.
pub fn rgb_to_argb(image: &RgbImage) -> Vec<u32> {
    image
        .pixels()
        .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
        .collect()
}
