//! minifb window: video display, name entry and the snapshot button.

use crate::app::App;
use crate::draw;
use crate::panel::{self, Layout, NameField, Notice};
use anyhow::{Context, Result};
use facetag_core::FaceEngine;
use facetag_hw::VideoSource;
use image::RgbImage;
use minifb::{InputCallback, Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};
use std::sync::mpsc;

const WINDOW_TITLE: &str = "facetag - ESC to exit";
/// One tick roughly every 30 ms.
const TARGET_FPS: usize = 33;

/// Forwards typed characters from the window to the display loop.
struct CharSink(mpsc::Sender<char>);

impl InputCallback for CharSink {
    fn add_char(&mut self, uni_char: u32) {
        if let Some(c) = char::from_u32(uni_char) {
            // Receiver lives as long as the window
            let _ = self.0.send(c);
        }
    }
}

/// Run the display loop until the window is closed or Escape is pressed.
/// The video source is released on the way out, also on error.
pub fn run<V: VideoSource, E: FaceEngine>(app: &mut App<V, E>, video_width: u32, video_height: u32) -> Result<()> {
    let result = event_loop(app, video_width, video_height);
    app.shutdown();
    result
}

fn event_loop<V: VideoSource, E: FaceEngine>(app: &mut App<V, E>, video_width: u32, video_height: u32) -> Result<()> {
    let layout = Layout::new(video_width, video_height);
    let (width, height) = (layout.width as usize, layout.height as usize);

    let mut window = Window::new(WINDOW_TITLE, width, height, WindowOptions::default())
        .context("failed to open display window")?;
    window.set_target_fps(TARGET_FPS);

    let (tx, rx) = mpsc::channel();
    window.set_input_callback(Box::new(CharSink(tx)));

    tracing::info!(width, height, "display loop started");

    let mut field = NameField::new();
    let mut notice: Option<Notice> = None;
    let mut video: Option<RgbImage> = None;
    let mut mouse_was_down = false;

    while window.is_open() && !window.is_key_down(Key::Escape) {
        for c in rx.try_iter() {
            field.push(c);
        }
        if window
            .get_keys_pressed(KeyRepeat::Yes)
            .contains(&Key::Backspace)
        {
            field.backspace();
        }

        let mut trigger = window.is_key_pressed(Key::Enter, KeyRepeat::No)
            || window.is_key_pressed(Key::NumPadEnter, KeyRepeat::No);

        let mouse_down = window.get_mouse_down(MouseButton::Left);
        if mouse_down && !mouse_was_down {
            if let Some((x, y)) = window.get_mouse_pos(MouseMode::Discard) {
                trigger |= layout.button_contains(x, y);
            }
        }
        mouse_was_down = mouse_down;

        if trigger {
            notice = Some(app.submit_snapshot(&mut field));
        }

        if let Some(tick) = app.tick() {
            tracing::trace!(kind = ?tick.kind, "frame shown");
            video = Some(tick.annotated);
        }

        let canvas = panel::compose(&layout, video.as_ref(), &field, notice.as_ref());
        window
            .update_with_buffer(&draw::rgb_to_argb(&canvas), width, height)
            .context("failed to update display window")?;
    }

    tracing::info!("display loop finished");
    Ok(())
}
