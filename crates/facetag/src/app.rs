use crate::draw;
use crate::panel::{NameField, Notice};
use facetag_core::pipeline::TickKind;
use facetag_core::{take_snapshot, FaceEngine, Gallery, RecognitionLoop, SnapshotError, SnapshotOutcome};
use facetag_hw::VideoSource;
use image::RgbImage;
use std::path::PathBuf;

/// Result of one display tick that produced a frame.
pub struct Tick {
    pub kind: TickKind,
    /// Full-resolution RGB frame with boxes and labels drawn on.
    pub annotated: RgbImage,
}

/// Everything the display loop drives: the video source, the engine, the
/// gallery and the recognition state carried between ticks.
pub struct App<V: VideoSource, E: FaceEngine> {
    source: V,
    engine: E,
    gallery: Gallery,
    recognition: RecognitionLoop,
    output_dir: PathBuf,
    released: bool,
}

impl<V: VideoSource, E: FaceEngine> App<V, E> {
    pub fn new(source: V, engine: E, gallery: Gallery, output_dir: PathBuf) -> Self {
        Self {
            source,
            engine,
            gallery,
            recognition: RecognitionLoop::new(),
            output_dir,
            released: false,
        }
    }

    /// Pull one frame and run it through recognition. `None` when the source
    /// had nothing to offer; the caller keeps showing the previous frame.
    pub fn tick(&mut self) -> Option<Tick> {
        if self.released {
            return None;
        }
        let frame = self.source.read()?;
        let kind = self.recognition.process(&frame, &mut self.engine, &self.gallery);

        let mut annotated = frame.to_rgb();
        draw::annotate(&mut annotated, self.recognition.display_boxes());
        Some(Tick { kind, annotated })
    }

    /// Capture the most recent downsampled frame under `name`.
    pub fn snapshot(&mut self, name: &str) -> Result<SnapshotOutcome, SnapshotError> {
        let result = take_snapshot(
            name,
            self.recognition.last_small_frame(),
            &self.output_dir,
            &mut self.engine,
            &mut self.gallery,
        );
        if let Err(e) = &result {
            tracing::warn!(name, error = %e, "snapshot not taken");
        }
        result
    }

    /// Snapshot under the name typed into `field` and describe the result.
    /// The field is cleared once the attempt got as far as writing the file.
    pub fn submit_snapshot(&mut self, field: &mut NameField) -> Notice {
        let result = self.snapshot(field.text());
        let written = match &result {
            Ok(_) => true,
            Err(e) => e.file_written(),
        };
        if written {
            field.clear();
        }
        tracing::debug!(entries = self.gallery().len(), written, "snapshot handled");
        Notice::from_snapshot(&result)
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    /// Release the video source. Later calls do nothing.
    pub fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.source.release();
        tracing::info!(ticks = self.recognition.schedule().ticks(), "shut down");
    }
}
