//! Control strip below the video: name field, snapshot button, status line.

use crate::draw::{self, rect_from_edges};
use crate::font;
use facetag_core::{SnapshotError, SnapshotOutcome};
use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

pub const PANEL_HEIGHT: u32 = 64;
pub const BUTTON_TEXT: &str = "Snapshot!";
/// Longest name the field accepts, in characters.
pub const MAX_NAME_LEN: usize = 32;

const MARGIN: i32 = 8;
const ROW_HEIGHT: i32 = 22;
const TEXT_SCALE: i32 = 2;
const BUTTON_WIDTH: i32 = 130;

const PANEL_BG: Rgb<u8> = Rgb([32, 32, 32]);
const FIELD_BG: Rgb<u8> = Rgb([250, 250, 250]);
const FIELD_TEXT: Rgb<u8> = Rgb([0, 0, 0]);
const BUTTON_BG: Rgb<u8> = Rgb([70, 110, 200]);
const BUTTON_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const BORDER: Rgb<u8> = Rgb([140, 140, 140]);

/// Pixel geometry of the whole window.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    pub video_height: u32,
    pub field: Rect,
    pub button: Rect,
    pub status_origin: (i32, i32),
}

impl Layout {
    pub fn new(video_width: u32, video_height: u32) -> Self {
        let width = video_width.max(320);
        let top = video_height as i32 + MARGIN;
        let button_left = width as i32 - MARGIN - BUTTON_WIDTH;
        Self {
            width,
            height: video_height + PANEL_HEIGHT,
            video_height,
            field: Rect::at(MARGIN, top).of_size((button_left - 2 * MARGIN) as u32, ROW_HEIGHT as u32),
            button: Rect::at(button_left, top).of_size(BUTTON_WIDTH as u32, ROW_HEIGHT as u32),
            status_origin: (MARGIN, top + ROW_HEIGHT + MARGIN),
        }
    }

    pub fn button_contains(&self, x: f32, y: f32) -> bool {
        contains(&self.button, x, y)
    }
}

fn contains(rect: &Rect, x: f32, y: f32) -> bool {
    x >= rect.left() as f32
        && x <= rect.right() as f32
        && y >= rect.top() as f32
        && y <= rect.bottom() as f32
}

/// Single-line text input.
#[derive(Debug, Default, Clone)]
pub struct NameField {
    text: String,
}

impl NameField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a typed character. Control characters and input past
    /// [`MAX_NAME_LEN`] are ignored.
    pub fn push(&mut self, c: char) {
        if !c.is_control() && self.text.chars().count() < MAX_NAME_LEN {
            self.text.push(c);
        }
    }

    pub fn backspace(&mut self) {
        self.text.pop();
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Warning(String),
    Error(String),
}

impl Notice {
    pub fn from_snapshot(result: &Result<SnapshotOutcome, SnapshotError>) -> Self {
        match result {
            Ok(SnapshotOutcome::Added { name, .. }) => Notice::Info(format!("Added {name} to the gallery")),
            Ok(SnapshotOutcome::NoFace { path }) => Notice::Warning(format!(
                "No face found in {}; not added",
                path.file_name().map(|f| f.to_string_lossy()).unwrap_or_default()
            )),
            Err(SnapshotError::EmptyName) => Notice::Warning("Please enter a name first".to_string()),
            Err(e @ (SnapshotError::InvalidName(_) | SnapshotError::NoFrame)) => Notice::Warning(e.to_string()),
            Err(e) => Notice::Error(e.to_string()),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Notice::Info(s) | Notice::Warning(s) | Notice::Error(s) => s,
        }
    }

    fn color(&self) -> Rgb<u8> {
        match self {
            Notice::Info(_) => Rgb([140, 220, 140]),
            Notice::Warning(_) => Rgb([240, 200, 80]),
            Notice::Error(_) => Rgb([255, 100, 100]),
        }
    }
}

/// Render the window contents: the latest video frame on top, the control
/// strip below. Before the first frame the video area stays black.
pub fn compose(layout: &Layout, video: Option<&RgbImage>, field: &NameField, notice: Option<&Notice>) -> RgbImage {
    let mut canvas = RgbImage::new(layout.width, layout.height);
    if let Some(video) = video {
        imageops::replace(&mut canvas, video, 0, 0);
    }

    let panel_top = layout.video_height as i32;
    if let Some(panel) = rect_from_edges(0, panel_top, layout.width as i32, layout.height as i32) {
        draw_filled_rect_mut(&mut canvas, panel, PANEL_BG);
    }

    let text_inset = (ROW_HEIGHT - font::GLYPH_HEIGHT * TEXT_SCALE) / 2;

    draw_filled_rect_mut(&mut canvas, layout.field, FIELD_BG);
    draw_hollow_rect_mut(&mut canvas, layout.field, BORDER);
    let caret = format!("{}_", field.text());
    draw::draw_label(
        &mut canvas,
        &caret,
        layout.field.left() + text_inset,
        layout.field.top() + text_inset,
        TEXT_SCALE,
        FIELD_TEXT,
    );

    draw_filled_rect_mut(&mut canvas, layout.button, BUTTON_BG);
    let label_x = layout.button.left() + (layout.button.width() as i32 - font::text_width(BUTTON_TEXT, TEXT_SCALE)) / 2;
    draw::draw_label(
        &mut canvas,
        BUTTON_TEXT,
        label_x,
        layout.button.top() + text_inset,
        TEXT_SCALE,
        BUTTON_TEXT_COLOR,
    );

    if let Some(notice) = notice {
        let (x, y) = layout.status_origin;
        draw::draw_label(&mut canvas, notice.text(), x, y, TEXT_SCALE, notice.color());
    }

    canvas
}
