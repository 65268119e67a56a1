//! Deterministic stand-in for the ONNX engine.
//!
//! A "face" is any region whose brightest channel exceeds `FACE_LEVEL`; its
//! encoding is the mean colour of that region scaled to 0..1.

use crate::engine::{EngineError, FaceEngine};
use crate::types::{BoundingBox, Embedding};
use image::{Rgb, RgbImage};
use std::path::Path;

pub const ALICE: Rgb<u8> = Rgb([200, 30, 30]);
pub const BOB: Rgb<u8> = Rgb([30, 30, 200]);

const FACE_LEVEL: u8 = 100;

pub struct StubEngine {
    pub threshold: f32,
    pub locate_calls: usize,
}

impl StubEngine {
    pub fn new() -> Self {
        Self { threshold: 0.2, locate_calls: 0 }
    }

    pub fn embedding_for(color: Rgb<u8>) -> Embedding {
        Embedding::new(color.0.iter().map(|&c| c as f32 / 255.0).collect())
    }

    fn is_face(pixel: &Rgb<u8>) -> bool {
        pixel.0.iter().any(|&c| c > FACE_LEVEL)
    }
}

impl FaceEngine for StubEngine {
    fn locate(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, EngineError> {
        self.locate_calls += 1;
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, p) in image.enumerate_pixels() {
            if Self::is_face(p) {
                let (x0, y0, x1, y1) = bounds.unwrap_or((x, y, x, y));
                bounds = Some((x0.min(x), y0.min(y), x1.max(x), y1.max(y)));
            }
        }
        Ok(bounds
            .map(|(x0, y0, x1, y1)| BoundingBox {
                x: x0 as f32,
                y: y0 as f32,
                width: (x1 - x0 + 1) as f32,
                height: (y1 - y0 + 1) as f32,
                confidence: 1.0,
                landmarks: None,
            })
            .into_iter()
            .collect())
    }

    fn encode(&mut self, image: &RgbImage, faces: &[BoundingBox]) -> Result<Vec<Embedding>, EngineError> {
        Ok(faces
            .iter()
            .map(|face| {
                let mut sum = [0.0f32; 3];
                let mut count = 0.0f32;
                for y in face.y as u32..(face.y + face.height) as u32 {
                    for x in face.x as u32..(face.x + face.width) as u32 {
                        let p = image.get_pixel(x, y);
                        if Self::is_face(p) {
                            for c in 0..3 {
                                sum[c] += p[c] as f32;
                            }
                            count += 1.0;
                        }
                    }
                }
                Embedding::new(sum.iter().map(|s| s / count.max(1.0) / 255.0).collect())
            })
            .collect())
    }

    fn match_threshold(&self) -> f32 {
        self.threshold
    }
}

/// Black image with one solid square "face" in the middle.
pub fn face_image(width: u32, height: u32, color: Rgb<u8>) -> RgbImage {
    let mut image = RgbImage::new(width, height);
    let side = width.min(height) / 2;
    let (x0, y0) = ((width - side) / 2, (height - side) / 2);
    for y in y0..y0 + side {
        for x in x0..x0 + side {
            image.put_pixel(x, y, color);
        }
    }
    image
}

pub fn write_jpeg(dir: &Path, file_name: &str, image: &RgbImage) {
    image
        .save_with_format(dir.join(file_name), image::ImageFormat::Jpeg)
        .unwrap();
}
