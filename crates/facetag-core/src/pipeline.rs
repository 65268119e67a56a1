//! Per-frame recognition loop.
//!
//! Each tick downsamples the frame, converts it to RGB and, on active ticks
//! only, locates, encodes and labels faces against the gallery. Skipped ticks
//! keep showing the previous detections.

use crate::engine::{EngineError, FaceEngine};
use crate::gallery::Gallery;
use crate::types::{BoundingBox, Detection, Label};
use facetag_hw::Frame;
use image::RgbImage;

/// Scale applied to each frame before detection.
pub const DOWNSAMPLE_FACTOR: f32 = 0.25;
/// Scale applied to detection boxes before drawing on the full frame.
pub const UPSCALE_FACTOR: f32 = 1.0 / DOWNSAMPLE_FACTOR;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    /// Detection and encoding run on this tick.
    Active,
    /// Previous detections are reused.
    Skipped,
}

/// Tick counter deciding which ticks run detection: even ticks are active,
/// starting with the first.
#[derive(Debug, Default, Clone)]
pub struct FrameSchedule {
    ticks: u64,
}

impl FrameSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kind of the tick that `advance` will return next.
    pub fn peek(&self) -> TickKind {
        if self.ticks % 2 == 0 {
            TickKind::Active
        } else {
            TickKind::Skipped
        }
    }

    pub fn advance(&mut self) -> TickKind {
        let kind = self.peek();
        self.ticks += 1;
        kind
    }

    /// Ticks processed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// Locate and encode faces in `image`, then label each against `gallery`.
///
/// The engine must return one encoding per located face; anything else is
/// reported as [`EngineError::EncodingCountMismatch`].
pub fn recognize<E: FaceEngine + ?Sized>(
    image: &RgbImage,
    engine: &mut E,
    gallery: &Gallery,
) -> Result<Vec<Detection>, EngineError> {
    let faces = engine.locate(image)?;
    if faces.is_empty() {
        return Ok(Vec::new());
    }

    let encodings = engine.encode(image, &faces)?;
    if encodings.len() != faces.len() {
        return Err(EngineError::EncodingCountMismatch {
            faces: faces.len(),
            encodings: encodings.len(),
        });
    }

    let engine = &*engine;
    Ok(faces
        .into_iter()
        .zip(encodings.iter())
        .map(|(bbox, encoding)| Detection {
            bbox,
            label: Label::from(gallery.nearest(encoding, engine)),
        })
        .collect())
}

/// Recognition state carried across ticks.
#[derive(Default)]
pub struct RecognitionLoop {
    schedule: FrameSchedule,
    detections: Vec<Detection>,
    last_small: Option<RgbImage>,
}

impl RecognitionLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one tick on `frame`.
    ///
    /// An engine failure on an active tick is logged and leaves the tick
    /// with no detections.
    pub fn process<E: FaceEngine + ?Sized>(
        &mut self,
        frame: &Frame,
        engine: &mut E,
        gallery: &Gallery,
    ) -> TickKind {
        let small = frame.downsample(DOWNSAMPLE_FACTOR).to_rgb();
        let kind = self.schedule.advance();

        if kind == TickKind::Active {
            self.detections = match recognize(&small, engine, gallery) {
                Ok(detections) => detections,
                Err(e) => {
                    tracing::error!(error = %e, sequence = frame.sequence, "recognition failed");
                    Vec::new()
                }
            };
            tracing::trace!(
                sequence = frame.sequence,
                faces = self.detections.len(),
                known = self.detections.iter().filter(|d| d.label.is_known()).count(),
                "active tick"
            );
        }

        self.last_small = Some(small);
        kind
    }

    /// Current detections in downsampled coordinates.
    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    /// Current detections with boxes scaled back to full-frame coordinates.
    pub fn display_boxes(&self) -> impl Iterator<Item = (BoundingBox, &Label)> {
        self.detections
            .iter()
            .map(|d| (d.bbox.scaled(UPSCALE_FACTOR), &d.label))
    }

    /// The most recent downsampled, RGB-ordered frame.
    pub fn last_small_frame(&self) -> Option<&RgbImage> {
        self.last_small.as_ref()
    }

    pub fn schedule(&self) -> &FrameSchedule {
        &self.schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{face_image, StubEngine, ALICE, BOB};
    use crate::types::Embedding;
    use facetag_hw::ChannelOrder;
    use image::Rgb;

    fn frame_of(color: Rgb<u8>) -> Frame {
        Frame::from_rgb(face_image(640, 480, color), 0)
    }

    fn alice_gallery() -> Gallery {
        let mut gallery = Gallery::new();
        gallery.append("Alice", StubEngine::embedding_for(ALICE));
        gallery
    }

    #[test]
    fn test_schedule_alternates() {
        let mut schedule = FrameSchedule::new();
        let kinds: Vec<TickKind> = (0..4).map(|_| schedule.advance()).collect();
        assert_eq!(
            kinds,
            vec![TickKind::Active, TickKind::Skipped, TickKind::Active, TickKind::Skipped]
        );
        assert_eq!(schedule.ticks(), 4);
        assert_eq!(schedule.peek(), TickKind::Active);
    }

    #[test]
    fn test_known_face_labelled() {
        let mut engine = StubEngine::new();
        let mut lp = RecognitionLoop::new();
        lp.process(&frame_of(ALICE), &mut engine, &alice_gallery());

        assert_eq!(lp.detections().len(), 1);
        assert_eq!(lp.detections()[0].label, Label::Known("Alice".into()));
    }

    #[test]
    fn test_stranger_is_unknown() {
        let mut engine = StubEngine::new();
        let mut lp = RecognitionLoop::new();
        lp.process(&frame_of(BOB), &mut engine, &alice_gallery());

        assert_eq!(lp.detections().len(), 1);
        assert_eq!(lp.detections()[0].label, Label::Unknown);
    }

    #[test]
    fn test_empty_gallery_is_unknown() {
        let mut engine = StubEngine::new();
        let mut lp = RecognitionLoop::new();
        lp.process(&frame_of(ALICE), &mut engine, &Gallery::new());

        assert_eq!(lp.detections().len(), 1);
        assert_eq!(lp.detections()[0].label.to_string(), "Unknown");
    }

    #[test]
    fn test_no_face_no_detections() {
        let mut engine = StubEngine::new();
        let mut lp = RecognitionLoop::new();
        lp.process(&Frame::from_rgb(RgbImage::new(640, 480), 0), &mut engine, &alice_gallery());
        assert!(lp.detections().is_empty());
    }

    #[test]
    fn test_skipped_tick_reuses_detections() {
        let mut engine = StubEngine::new();
        let gallery = alice_gallery();
        let mut lp = RecognitionLoop::new();

        assert_eq!(lp.process(&frame_of(ALICE), &mut engine, &gallery), TickKind::Active);
        let first = lp.detections().to_vec();

        // Static scene: second tick identical, no engine call
        assert_eq!(lp.process(&frame_of(ALICE), &mut engine, &gallery), TickKind::Skipped);
        assert_eq!(lp.detections(), first.as_slice());
        assert_eq!(engine.locate_calls, 1);

        // Scene changes on a skipped tick: still the old result
        lp.process(&frame_of(ALICE), &mut engine, &gallery);
        assert_eq!(engine.locate_calls, 2);
        assert_eq!(lp.process(&frame_of(BOB), &mut engine, &gallery), TickKind::Skipped);
        assert_eq!(lp.detections()[0].label, Label::Known("Alice".into()));

        // Next active tick picks up the change
        assert_eq!(lp.process(&frame_of(BOB), &mut engine, &gallery), TickKind::Active);
        assert_eq!(lp.detections()[0].label, Label::Unknown);
        assert_eq!(engine.locate_calls, 3);
    }

    #[test]
    fn test_boxes_in_downsampled_coordinates_and_scaled_for_display() {
        let mut engine = StubEngine::new();
        let mut lp = RecognitionLoop::new();
        lp.process(&frame_of(ALICE), &mut engine, &alice_gallery());

        // 640x480 → 160x120; the 240px square becomes ~60px
        let small = &lp.detections()[0].bbox;
        assert!((small.width - 60.0).abs() <= 2.0, "width {}", small.width);
        assert!((small.x - 50.0).abs() <= 2.0, "x {}", small.x);

        let (big, label) = lp.display_boxes().next().unwrap();
        assert_eq!(big.x, small.x * 4.0);
        assert_eq!(big.width, small.width * 4.0);
        assert_eq!(label, &Label::Known("Alice".into()));
    }

    #[test]
    fn test_last_small_frame_is_rgb_and_downsampled() {
        let mut engine = StubEngine::new();
        let mut lp = RecognitionLoop::new();
        assert!(lp.last_small_frame().is_none());

        let mut frame = Frame::from_rgb(RgbImage::from_pixel(640, 480, Rgb([10, 20, 30])), 3);
        frame.order = ChannelOrder::Bgr;
        lp.process(&frame, &mut engine, &Gallery::new());

        let small = lp.last_small_frame().unwrap();
        assert_eq!(small.dimensions(), (160, 120));
        assert_eq!(small.get_pixel(0, 0), &Rgb([30, 20, 10]));
    }

    #[test]
    fn test_bgr_frame_is_swapped_before_detection() {
        // A frame tagged BGR holding Alice's colours reversed reads as Alice.
        let mut engine = StubEngine::new();
        let mut lp = RecognitionLoop::new();
        let reversed = Rgb([ALICE[2], ALICE[1], ALICE[0]]);
        let mut frame = frame_of(reversed);
        frame.order = ChannelOrder::Bgr;
        lp.process(&frame, &mut engine, &alice_gallery());
        assert_eq!(lp.detections()[0].label, Label::Known("Alice".into()));
    }

    struct ShortEngine;

    impl FaceEngine for ShortEngine {
        fn locate(&mut self, _: &RgbImage) -> Result<Vec<BoundingBox>, EngineError> {
            Ok(vec![
                BoundingBox { x: 0.0, y: 0.0, width: 1.0, height: 1.0, confidence: 1.0, landmarks: None };
                2
            ])
        }
        fn encode(&mut self, _: &RgbImage, _: &[BoundingBox]) -> Result<Vec<Embedding>, EngineError> {
            Ok(vec![Embedding::new(vec![0.0])])
        }
        fn match_threshold(&self) -> f32 {
            1.0
        }
    }

    #[test]
    fn test_encoding_count_mismatch_is_error() {
        let image = RgbImage::new(4, 4);
        let result = recognize(&image, &mut ShortEngine, &Gallery::new());
        assert!(matches!(
            result,
            Err(EngineError::EncodingCountMismatch { faces: 2, encodings: 1 })
        ));

        // The loop logs it and shows nothing for that tick
        let mut lp = RecognitionLoop::new();
        lp.process(&Frame::from_rgb(RgbImage::new(8, 8), 0), &mut ShortEngine, &Gallery::new());
        assert!(lp.detections().is_empty());
    }
}
